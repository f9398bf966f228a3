//! Record store access.
//!
//! Every operation opens its own short-lived connection scoped to that one
//! logical step. No transaction spans a whole upload batch: each committed
//! insert is a valid Photo row on its own, so a crash mid-batch leaves a
//! consistent database even when the batch is only partially applied. The
//! per-operation connection also makes [`Store`] freely shareable across
//! concurrent request workers.

mod schema;

use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

pub use schema::SCHEMA;

/// Truthy value of the appointments.photos_taken flag.
pub const PHOTOS_TAKEN_YES: &str = "Yes";

/// Date and treatment type of an appointment, as read for validation and
/// denormalized onto photo rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentInfo {
    pub date: String,
    pub appt_type: String,
}

/// One row of the photos table, as enumerated by the lifecycle operations.
#[derive(Debug, Clone)]
pub struct PhotoRow {
    pub id: i64,
    pub client_id: i64,
    pub appointment_id: i64,
    pub appt_date: Option<String>,
    pub file_path: String,
    pub appt_type: Option<String>,
}

pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open a store backed by the SQLite file at `path`, creating parent
    /// directories as needed. The file itself is created lazily on first
    /// connection.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Create the tables this service touches if they are absent. A database
    /// already initialized by the desktop application is left untouched.
    pub fn initialize(&self) -> Result<()> {
        self.connect()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ========================================================================
    // Lookups (validation before any file processing)
    // ========================================================================

    pub fn client_name(&self, client_id: i64) -> Result<Option<String>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            "SELECT full_name FROM clients WHERE id = ?",
            [client_id],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(name) => Ok(Some(name)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn appointment_info(&self, appointment_id: i64) -> Result<Option<AppointmentInfo>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            "SELECT date, type FROM appointments WHERE id = ?",
            [appointment_id],
            |row| {
                Ok(AppointmentInfo {
                    date: row.get(0)?,
                    appt_type: row.get(1)?,
                })
            },
        );
        match result {
            Ok(info) => Ok(Some(info)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ========================================================================
    // Ingestion writes
    // ========================================================================

    /// Insert one Photo row for a successfully saved file.
    pub fn record_photo(
        &self,
        client_id: i64,
        appointment_id: i64,
        appt_date: &str,
        file_path: &Path,
        appt_type: &str,
    ) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO photos (client_id, appointment_id, appt_date, file_path, type)
            VALUES (?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                client_id,
                appointment_id,
                appt_date,
                file_path.to_string_lossy(),
                appt_type
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Flip the appointment's photos_taken flag to the truthy value. Called
    /// at most once per batch, only after at least one row was recorded.
    pub fn mark_photos_taken(&self, appointment_id: i64) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE appointments SET photos_taken = ? WHERE id = ?",
            rusqlite::params![PHOTOS_TAKEN_YES, appointment_id],
        )?;
        Ok(())
    }

    /// Point the client at its (possibly replaced) profile picture file.
    pub fn set_profile_picture(&self, client_id: i64, file_path: &Path) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE clients SET profile_picture = ? WHERE id = ?",
            rusqlite::params![file_path.to_string_lossy(), client_id],
        )?;
        Ok(())
    }

    // ========================================================================
    // Lifecycle (record synchronizer)
    // ========================================================================

    pub fn photos_for_appointment(&self, appointment_id: i64) -> Result<Vec<PhotoRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, client_id, appointment_id, appt_date, file_path, type
            FROM photos
            WHERE appointment_id = ?
            "#,
        )?;
        let rows = stmt
            .query_map([appointment_id], |row| {
                Ok(PhotoRow {
                    id: row.get(0)?,
                    client_id: row.get(1)?,
                    appointment_id: row.get(2)?,
                    appt_date: row.get(3)?,
                    file_path: row.get(4)?,
                    appt_type: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Propagate an appointment edit to the denormalized photo fields.
    /// Returns the number of rows touched.
    pub fn update_photos_for_appointment(
        &self,
        appointment_id: i64,
        new_date: &str,
        new_type: &str,
    ) -> Result<usize> {
        let conn = self.connect()?;
        let updated = conn.execute(
            "UPDATE photos SET appt_date = ?, type = ? WHERE appointment_id = ?",
            rusqlite::params![new_date, new_type, appointment_id],
        )?;
        Ok(updated)
    }

    pub fn delete_photos_for_appointment(&self, appointment_id: i64) -> Result<usize> {
        let conn = self.connect()?;
        let deleted = conn.execute(
            "DELETE FROM photos WHERE appointment_id = ?",
            [appointment_id],
        )?;
        Ok(deleted)
    }

    /// Delete the appointment row itself. Returns whether a row existed.
    pub fn delete_appointment(&self, appointment_id: i64) -> Result<bool> {
        let conn = self.connect()?;
        let deleted = conn.execute("DELETE FROM appointments WHERE id = ?", [appointment_id])?;
        Ok(deleted > 0)
    }

    // ========================================================================
    // Reads used by the desktop collaborator and tests
    // ========================================================================

    pub fn photos_taken(&self, appointment_id: i64) -> Result<Option<String>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            "SELECT photos_taken FROM appointments WHERE id = ?",
            [appointment_id],
            |row| row.get::<_, Option<String>>(0),
        );
        match result {
            Ok(flag) => Ok(flag),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn profile_picture(&self, client_id: i64) -> Result<Option<String>> {
        let conn = self.connect()?;
        let result = conn.query_row(
            "SELECT profile_picture FROM clients WHERE id = ?",
            [client_id],
            |row| row.get::<_, Option<String>>(0),
        );
        match result {
            Ok(path) => Ok(path),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn insert_client(&self, full_name: &str) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute("INSERT INTO clients (full_name) VALUES (?)", [full_name])?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_appointment(&self, client_id: i64, date: &str, appt_type: &str) -> Result<i64> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO appointments (client_id, date, type) VALUES (?, ?, ?)",
            rusqlite::params![client_id, date, appt_type],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, Store) {
        let tmp = TempDir::new().unwrap();
        let store = Store::open(tmp.path().join("records.db")).unwrap();
        store.initialize().unwrap();
        (tmp, store)
    }

    #[test]
    fn lookups_distinguish_missing_from_present() {
        let (_tmp, store) = store();
        assert_eq!(store.client_name(1).unwrap(), None);
        assert_eq!(store.appointment_info(1).unwrap(), None);

        let cid = store.insert_client("Jane Doe").unwrap();
        let aid = store.insert_appointment(cid, "04/17/2025", "Facial").unwrap();

        assert_eq!(store.client_name(cid).unwrap().as_deref(), Some("Jane Doe"));
        let info = store.appointment_info(aid).unwrap().unwrap();
        assert_eq!(info.date, "04/17/2025");
        assert_eq!(info.appt_type, "Facial");
    }

    #[test]
    fn photos_taken_defaults_to_no_and_flips_to_yes() {
        let (_tmp, store) = store();
        let cid = store.insert_client("Jane").unwrap();
        let aid = store.insert_appointment(cid, "04/17/2025", "Peel").unwrap();

        assert_eq!(store.photos_taken(aid).unwrap().as_deref(), Some("No"));
        store.mark_photos_taken(aid).unwrap();
        assert_eq!(store.photos_taken(aid).unwrap().as_deref(), Some("Yes"));
    }

    #[test]
    fn recorded_photos_carry_denormalized_fields() {
        let (tmp, store) = store();
        let cid = store.insert_client("Jane").unwrap();
        let aid = store.insert_appointment(cid, "04/17/2025", "Peel").unwrap();

        let path = tmp.path().join("a.jpg");
        store
            .record_photo(cid, aid, "04/17/2025", &path, "Peel")
            .unwrap();

        let rows = store.photos_for_appointment(aid).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].appt_date.as_deref(), Some("04/17/2025"));
        assert_eq!(rows[0].appt_type.as_deref(), Some("Peel"));
        assert_eq!(rows[0].file_path, path.to_string_lossy());
    }

    #[test]
    fn edit_propagation_touches_fields_not_identity() {
        let (tmp, store) = store();
        let cid = store.insert_client("Jane").unwrap();
        let aid = store.insert_appointment(cid, "04/17/2025", "Peel").unwrap();
        let id = store
            .record_photo(cid, aid, "04/17/2025", &tmp.path().join("a.jpg"), "Peel")
            .unwrap();

        let touched = store
            .update_photos_for_appointment(aid, "05/01/2025", "Laser")
            .unwrap();
        assert_eq!(touched, 1);

        let rows = store.photos_for_appointment(aid).unwrap();
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].appt_date.as_deref(), Some("05/01/2025"));
        assert_eq!(rows[0].appt_type.as_deref(), Some("Laser"));
        assert!(rows[0].file_path.ends_with("a.jpg"));
    }

    #[test]
    fn deletion_removes_rows_and_is_idempotent() {
        let (tmp, store) = store();
        let cid = store.insert_client("Jane").unwrap();
        let aid = store.insert_appointment(cid, "04/17/2025", "Peel").unwrap();
        store
            .record_photo(cid, aid, "04/17/2025", &tmp.path().join("a.jpg"), "Peel")
            .unwrap();

        assert_eq!(store.delete_photos_for_appointment(aid).unwrap(), 1);
        assert!(store.delete_appointment(aid).unwrap());

        // Repeat deletion is a no-op, not an error.
        assert_eq!(store.delete_photos_for_appointment(aid).unwrap(), 0);
        assert!(!store.delete_appointment(aid).unwrap());
    }

    #[test]
    fn profile_picture_is_overwritten_in_place() {
        let (tmp, store) = store();
        let cid = store.insert_client("Jane").unwrap();
        assert_eq!(store.profile_picture(cid).unwrap(), None);

        let path = tmp.path().join("Jane_id_1.png");
        store.set_profile_picture(cid, &path).unwrap();
        store.set_profile_picture(cid, &path).unwrap();
        assert_eq!(
            store.profile_picture(cid).unwrap(),
            Some(path.to_string_lossy().into_owned())
        );
    }
}
