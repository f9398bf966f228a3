//! Provisioning: one-time upload links and their scannable encoding.
//!
//! The desktop application calls [`generate_upload_qr`] when the
//! practitioner wants a phone to upload photos. The URL's query parameters
//! are the entire credential (trusted-LAN assumption); no server-side token
//! state exists. The QR image is ephemeral and lives at a fixed staging
//! path, so each provisioning call replaces the prior code.

use anyhow::{Context, Result};
use qrcode::{Color, QrCode};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::net;

/// Fixed filename of the staged QR image inside the qrcodes directory.
const STAGED_QR_NAME: &str = "temp_qr_code.png";

/// Pixels per QR module and quiet-zone width in modules.
const MODULE_PIXELS: u32 = 8;
const QUIET_ZONE: u32 = 4;

/// What an upload link is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    /// Appointment-photo flow: photos land under the client/appointment
    /// directory and create Photo rows.
    Appointment { client_id: i64, appointment_id: i64 },
    /// Profile-picture flow: a single image overwriting the client's
    /// current profile picture.
    ProfilePicture { client_id: i64 },
}

/// Build the upload URL for a target, as served by the ingestion server.
pub fn upload_url(ip: IpAddr, port: u16, target: UploadTarget) -> String {
    match target {
        UploadTarget::Appointment {
            client_id,
            appointment_id,
        } => format!("http://{ip}:{port}/upload?cid={client_id}&aid={appointment_id}"),
        UploadTarget::ProfilePicture { client_id } => {
            format!("http://{ip}:{port}/upload_profile_pic?cid={client_id}")
        }
    }
}

/// Generate the QR code image for an upload target and write it to the
/// staging path, overwriting any previous code. Returns the image path.
pub fn generate_upload_qr(qr_dir: &Path, port: u16, target: UploadTarget) -> Result<PathBuf> {
    let url = upload_url(net::local_ip(), port, target);

    std::fs::create_dir_all(qr_dir)
        .with_context(|| format!("failed to create QR staging directory {qr_dir:?}"))?;
    let filepath = qr_dir.join(STAGED_QR_NAME);

    write_qr_png(&url, &filepath)?;
    info!(url = %url, path = %filepath.display(), "QR code generated");
    Ok(filepath)
}

/// Rasterize a QR code for `data` to a PNG at `path`.
fn write_qr_png(data: &str, path: &Path) -> Result<()> {
    let code = QrCode::new(data.as_bytes()).context("failed to encode QR code")?;
    let width = code.width() as u32;
    let colors = code.to_colors();

    let side = (width + 2 * QUIET_ZONE) * MODULE_PIXELS;
    let mut img = image::GrayImage::from_pixel(side, side, image::Luma([255u8]));

    for (i, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = (i as u32 % width + QUIET_ZONE) * MODULE_PIXELS;
        let my = (i as u32 / width + QUIET_ZONE) * MODULE_PIXELS;
        for dy in 0..MODULE_PIXELS {
            for dx in 0..MODULE_PIXELS {
                img.put_pixel(mx + dx, my + dy, image::Luma([0u8]));
            }
        }
    }

    img.save(path)
        .with_context(|| format!("failed to write QR image to {path:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    #[test]
    fn appointment_url_carries_both_ids() {
        let url = upload_url(
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            8000,
            UploadTarget::Appointment {
                client_id: 7,
                appointment_id: 42,
            },
        );
        assert_eq!(url, "http://192.168.1.20:8000/upload?cid=7&aid=42");
    }

    #[test]
    fn profile_url_carries_client_id_only() {
        let url = upload_url(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            8000,
            UploadTarget::ProfilePicture { client_id: 3 },
        );
        assert_eq!(url, "http://127.0.0.1:8000/upload_profile_pic?cid=3");
    }

    #[test]
    fn staged_qr_is_written_and_replaced() {
        let tmp = TempDir::new().unwrap();
        let first = generate_upload_qr(
            tmp.path(),
            8000,
            UploadTarget::ProfilePicture { client_id: 1 },
        )
        .unwrap();
        assert!(first.exists());
        let first_len = std::fs::metadata(&first).unwrap().len();

        // A second provisioning call for a different target overwrites the
        // same staging path.
        let second = generate_upload_qr(
            tmp.path(),
            8000,
            UploadTarget::Appointment {
                client_id: 123456,
                appointment_id: 654321,
            },
        )
        .unwrap();
        assert_eq!(first, second);
        assert!(second.exists());
        let second_len = std::fs::metadata(&second).unwrap().len();
        assert!(first_len > 0 && second_len > 0);
    }

    #[test]
    fn qr_png_decodes_as_an_image() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("code.png");
        write_qr_png("http://127.0.0.1:8000/upload?cid=1&aid=2", &path).unwrap();
        let img = image::open(&path).unwrap();
        assert!(img.width() > 0);
        assert_eq!(img.width(), img.height());
    }
}
