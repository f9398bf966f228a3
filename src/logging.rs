//! Logging configuration.
//!
//! Startup, shutdown, and crash events go to a log file colocated with the
//! database, so the record store and its service history travel together
//! when the operator moves the data folder.

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system, writing to `upload_server.log` in the
/// given directory (normally the directory holding the database).
///
/// Log level can be controlled via the `CLINISNAP_LOG` environment variable:
/// - `CLINISNAP_LOG=debug` for verbose output
/// - `CLINISNAP_LOG=info` for standard output (default)
/// - `CLINISNAP_LOG=warn` for warnings and errors only
pub fn init(log_dir: &Path) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env("CLINISNAP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    std::fs::create_dir_all(log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "upload_server.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Store the guard in a static to prevent it from being dropped
    // This is safe because we only call init() once at startup
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(_guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Logging initialized at {:?}", log_dir);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn uncreatable_log_dir_is_reported_not_swallowed() {
        let tmp = TempDir::new().unwrap();
        // A plain file where a directory component is needed.
        let blocker = tmp.path().join("not_a_dir");
        std::fs::write(&blocker, b"occupied").unwrap();

        let result = init(&blocker.join("logs"));
        assert!(result.is_err());
    }
}
