//! Image orientation normalization.
//!
//! Phones record the physical rotation of the camera in an EXIF tag and
//! leave the pixel data unrotated. Files stored that way display sideways
//! in any viewer that ignores the tag, so ingestion rewrites the pixels
//! upright once. Re-encoding drops the EXIF block entirely, which makes the
//! remaining orientation effectively identity.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Pixel rotation needed to undo a recorded EXIF orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Upside down (orientation 3).
    Half,
    /// Needs 90 degrees clockwise (orientation 6).
    QuarterCw,
    /// Needs 90 degrees counter-clockwise (orientation 8).
    QuarterCcw,
}

/// Map an EXIF orientation code to the pixel correction it requires.
///
/// Only the three non-identity codes seen from real capture devices are
/// recognized; mirrored variants (2, 4, 5, 7) and unknown values are
/// treated as "leave the file alone".
pub fn correction_for(orientation: u16) -> Option<Correction> {
    match orientation {
        3 => Some(Correction::Half),
        6 => Some(Correction::QuarterCw),
        8 => Some(Correction::QuarterCcw),
        _ => None,
    }
}

/// Read the EXIF orientation tag from an image file, if any.
pub fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    if let exif::Value::Short(ref v) = field.value {
        v.first().copied()
    } else {
        None
    }
}

/// Rewrite `path` in place with its pixels rotated upright.
///
/// Returns `Ok(true)` when the file was rotated, `Ok(false)` when no
/// correction was needed (no EXIF, corrupt EXIF, identity or unrecognized
/// orientation). Decode or re-encode failures are errors; the caller treats
/// them as non-fatal and keeps the file as uploaded.
pub fn normalize_orientation(path: &Path) -> Result<bool> {
    let Some(orientation) = read_orientation(path) else {
        debug!(path = %path.display(), "no EXIF orientation tag");
        return Ok(false);
    };
    let Some(correction) = correction_for(orientation) else {
        debug!(path = %path.display(), orientation, "orientation needs no correction");
        return Ok(false);
    };

    let img = image::open(path)
        .with_context(|| format!("failed to decode image {}", path.display()))?;
    let rotated = match correction {
        Correction::Half => img.rotate180(),
        Correction::QuarterCw => img.rotate90(),
        Correction::QuarterCcw => img.rotate270(),
    };
    rotated
        .save(path)
        .with_context(|| format!("failed to rewrite rotated image {}", path.display()))?;

    debug!(path = %path.display(), orientation, "orientation fixed");
    Ok(true)
}
