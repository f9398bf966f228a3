//! Storage layout and collision handling for ingested photos.
//!
//! Appointment photos live under
//! `<photo-base>/<SanitizedName>_id_<client_id>/<MM-DD-YYYY>/`, a layout
//! chosen to stay human-readable when browsed outside the application.
//! Profile pictures live flat under the profile directory as
//! `<SanitizedName>_id_<client_id>.png`.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Sanitize a client name for use in directory and file names.
///
/// Characters outside alphanumerics, space, underscore, and hyphen become
/// underscores, then spaces collapse to underscores.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .replace(' ', "_")
}

/// Sanitize a client-supplied upload filename.
///
/// Strips any path components (both separator styles, since the capturing
/// device's OS is unknown), maps unsafe characters to underscores, and
/// refuses hidden/empty names.
pub fn sanitize_filename(raw: &str) -> String {
    let leaf = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(raw);

    let cleaned: String = leaf
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned
    }
}

/// Directory name for a client: `<SanitizedName>_id_<client_id>`.
pub fn client_dir_name(full_name: &str, client_id: i64) -> String {
    format!("{}_id_{}", sanitize_name(full_name), client_id)
}

/// Date directory name: separators normalized from `/` to `-`.
pub fn date_dir_name(raw_date: &str) -> String {
    raw_date.replace('/', "-")
}

/// Resolve (and create) the storage directory for one client/appointment.
pub fn appointment_dir(
    base: &Path,
    full_name: &str,
    client_id: i64,
    raw_date: &str,
) -> Result<PathBuf> {
    let dir = base
        .join(client_dir_name(full_name, client_id))
        .join(date_dir_name(raw_date));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create photo directory {dir:?}"))?;
    Ok(dir)
}

/// Write `bytes` into `dir` under `filename`, never overwriting.
///
/// The file is opened with `create_new`, so the existence check and the
/// create are one atomic step; a concurrent upload of the same name loses
/// the race and retries with the next numeric suffix (`a.jpg`, `a_1.jpg`,
/// `a_2.jpg`, ...).
pub fn save_unique(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    let (stem, ext) = match filename.rsplit_once('.') {
        Some((s, e)) if !s.is_empty() => (s.to_string(), Some(e.to_string())),
        _ => (filename.to_string(), None),
    };

    let mut counter = 0u32;
    loop {
        let candidate = match (counter, &ext) {
            (0, _) => filename.to_string(),
            (n, Some(e)) => format!("{stem}_{n}.{e}"),
            (n, None) => format!("{stem}_{n}"),
        };
        let path = dir.join(&candidate);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(bytes)
                    .with_context(|| format!("failed to write {path:?}"))?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                counter += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to create {path:?}"));
            }
        }
    }
}

/// Delete a file if present. Returns whether a file was actually removed;
/// a missing file is not an error.
pub fn remove_file(path: &Path) -> Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("failed to delete {path:?}")),
    }
}

/// Remove a date directory if it is empty. Returns whether it was removed.
///
/// Only the directory given is touched; the client-level directory above it
/// is kept even when empty, so the per-client structure stays readable
/// across appointments.
pub fn prune_empty_dir(dir: &Path) -> Result<bool> {
    match std::fs::remove_dir(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "removed empty photo directory");
            Ok(true)
        }
        // Non-empty or already gone: leave it be.
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn name_sanitization_maps_unsafe_chars_and_spaces() {
        assert_eq!(sanitize_name("Jane O'Neil-Smith"), "Jane_O_Neil-Smith");
        assert_eq!(sanitize_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(client_dir_name("Jo Ann", 12), "Jo_Ann_id_12");
    }

    #[test]
    fn filename_sanitization_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\pic.jpg"), "pic.jpg");
        assert_eq!(sanitize_filename(".hidden.jpg"), "hidden.jpg");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_filename(""), "photo");
        assert_eq!(sanitize_filename("..."), "photo");
    }

    #[test]
    fn date_separators_are_normalized() {
        assert_eq!(date_dir_name("04/17/2025"), "04-17-2025");
        assert_eq!(date_dir_name("04-17-2025"), "04-17-2025");
    }

    #[test]
    fn appointment_dir_is_created_on_demand() {
        let tmp = TempDir::new().unwrap();
        let dir = appointment_dir(tmp.path(), "Jane Doe", 5, "04/17/2025").unwrap();
        assert!(dir.is_dir());
        assert!(dir.ends_with("Jane_Doe_id_5/04-17-2025"));
    }

    #[test]
    fn save_unique_never_overwrites() {
        let tmp = TempDir::new().unwrap();
        let first = save_unique(tmp.path(), "a.jpg", b"one").unwrap();
        let second = save_unique(tmp.path(), "a.jpg", b"two").unwrap();
        let third = save_unique(tmp.path(), "a.jpg", b"three").unwrap();

        assert_eq!(first.file_name().unwrap(), "a.jpg");
        assert_eq!(second.file_name().unwrap(), "a_1.jpg");
        assert_eq!(third.file_name().unwrap(), "a_2.jpg");
        assert_eq!(std::fs::read(&first).unwrap(), b"one");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn save_unique_without_extension_appends_suffix() {
        let tmp = TempDir::new().unwrap();
        let first = save_unique(tmp.path(), "scan", b"x").unwrap();
        let second = save_unique(tmp.path(), "scan", b"y").unwrap();
        assert_eq!(first.file_name().unwrap(), "scan");
        assert_eq!(second.file_name().unwrap(), "scan_1");
    }

    #[test]
    fn remove_file_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("p.jpg");
        std::fs::write(&path, b"data").unwrap();
        assert!(remove_file(&path).unwrap());
        assert!(!remove_file(&path).unwrap());
    }

    #[test]
    fn prune_removes_only_empty_dirs() {
        let tmp = TempDir::new().unwrap();
        let date_dir = tmp.path().join("client_id_1").join("04-17-2025");
        std::fs::create_dir_all(&date_dir).unwrap();
        std::fs::write(date_dir.join("keep.jpg"), b"x").unwrap();

        assert!(!prune_empty_dir(&date_dir).unwrap());
        std::fs::remove_file(date_dir.join("keep.jpg")).unwrap();
        assert!(prune_empty_dir(&date_dir).unwrap());
        // The client directory above stays, even though it is now empty.
        assert!(tmp.path().join("client_id_1").is_dir());
        // Pruning an already-removed directory is a no-op.
        assert!(!prune_empty_dir(&date_dir).unwrap());
    }
}
