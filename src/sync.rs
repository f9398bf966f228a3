//! Record synchronizer: keeps photo rows, files, and directories consistent
//! with appointment lifecycle events.
//!
//! These operations are invoked by the appointment-editing collaborator,
//! not by the ingestion server. Deletion removes files before rows: a crash
//! mid-operation then leaves orphaned rows, which are visible and repairable
//! from the desktop application, rather than orphaned files nothing tracks.

use anyhow::Result;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::db::Store;
use crate::storage;

/// Outcome of an appointment deletion, for the collaborator's confirmation
/// UI and for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeletionSummary {
    pub files_removed: usize,
    pub files_missing: usize,
    pub rows_removed: usize,
    pub appointment_removed: bool,
}

/// Propagate an appointment's edited date/type onto every associated photo
/// row's denormalized fields. File paths and row ids are untouched.
pub fn apply_appointment_change(
    store: &Store,
    appointment_id: i64,
    new_date: &str,
    new_type: &str,
) -> Result<usize> {
    let updated = store.update_photos_for_appointment(appointment_id, new_date, new_type)?;
    info!(appointment_id, updated, "synced photo rows with edited appointment");
    Ok(updated)
}

/// Remove everything belonging to an appointment: backing files first, then
/// the photo rows, then the appointment row itself.
///
/// Missing files are logged and skipped. Date directories left empty by the
/// removals are pruned; client-level directories are kept. Repeating the
/// deletion on an already-deleted appointment is a no-op.
pub fn apply_appointment_deletion(store: &Store, appointment_id: i64) -> Result<DeletionSummary> {
    let rows = store.photos_for_appointment(appointment_id)?;
    let mut summary = DeletionSummary::default();
    let mut touched_dirs: BTreeSet<PathBuf> = BTreeSet::new();

    for row in &rows {
        let path = Path::new(&row.file_path);
        match storage::remove_file(path) {
            Ok(true) => summary.files_removed += 1,
            Ok(false) => {
                summary.files_missing += 1;
                warn!(photo_id = row.id, path = %path.display(), "photo file already missing");
            }
            Err(e) => {
                // A file we cannot delete is logged and skipped; the row
                // still goes so the appointment disappears cleanly.
                warn!(photo_id = row.id, error = %e, "failed to delete photo file");
            }
        }
        if let Some(parent) = path.parent() {
            touched_dirs.insert(parent.to_path_buf());
        }
    }

    for dir in &touched_dirs {
        let _ = storage::prune_empty_dir(dir);
    }

    summary.rows_removed = store.delete_photos_for_appointment(appointment_id)?;
    summary.appointment_removed = store.delete_appointment(appointment_id)?;

    info!(
        appointment_id,
        files_removed = summary.files_removed,
        rows_removed = summary.rows_removed,
        "appointment deleted"
    );
    Ok(summary)
}
