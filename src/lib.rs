//! LAN photo-ingestion service for clinic client records.
//!
//! A phone on the same network scans a QR code, opens the upload form it
//! points at, and posts photos straight into the practitioner's record
//! store. The desktop application embeds this crate: it calls
//! [`provision::generate_upload_qr`] to produce the code, runs the server
//! from the `clinisnap` binary (or [`server::router`] directly), and invokes
//! the [`sync`] operations when appointments are edited or deleted.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod net;
pub mod normalize;
pub mod provision;
pub mod server;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use db::Store;
pub use error::UploadError;
