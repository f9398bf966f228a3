//! Startup configuration.
//!
//! Two JSON documents locate everything: `config.json` in the user's data
//! folder names the data root, and `paths.json` inside that root names the
//! database file, photo base directory, and profile-picture directory. The
//! paths file is created with defaults when the data root exists but the
//! file does not; a missing config or data root is a hard error so the
//! operator can restore the folder and retry.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Default port the ingestion server binds to. The provisioning URL embeds
/// this, so the phone and the server must agree on it.
pub const DEFAULT_PORT: u16 = 8000;

/// Name of the user-level data folder under the home directory.
pub const DATA_DIR_NAME: &str = "ClinisnapData";

#[derive(Debug, Deserialize)]
struct RootConfig {
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DataPaths {
    database: PathBuf,
    photos: PathBuf,
    #[serde(default)]
    profile_pictures: Option<PathBuf>,
}

/// Immutable runtime configuration, resolved once at startup and passed by
/// reference into the server. Nothing here is mutated after load.
#[derive(Debug, Clone)]
pub struct Config {
    /// Data root named by `config.json`.
    pub data_dir: PathBuf,
    /// SQLite database file.
    pub database: PathBuf,
    /// Base directory for appointment photos.
    pub photos: PathBuf,
    /// Directory for profile pictures.
    pub profile_pictures: PathBuf,
    /// Staging directory for the ephemeral QR code image.
    pub qrcodes: PathBuf,
    /// Port the server binds to and the provisioning URL embeds.
    pub port: u16,
}

impl Config {
    /// Default location of `config.json`: `~/ClinisnapData/config.json`.
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME)
            .join("config.json")
    }

    /// Load configuration from the default `config.json` location.
    pub fn load(port: u16) -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_config_path(), port)
    }

    /// Load configuration from an explicit `config.json` path.
    ///
    /// Resolves the data root, then reads `paths.json` inside it, writing
    /// that file with defaults first if it is absent.
    pub fn load_from(config_path: &Path, port: u16) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::MissingConfig {
                path: config_path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(config_path)?;
        let root: RootConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::InvalidConfig {
                path: config_path.to_path_buf(),
                source,
            })?;

        let data_dir = root.data_dir.ok_or_else(|| ConfigError::MissingDataDir {
            path: config_path.to_path_buf(),
        })?;
        if !data_dir.exists() {
            return Err(ConfigError::DataDirNotFound { path: data_dir });
        }

        let paths = Self::load_or_create_paths(&data_dir)?;
        let profile_pictures = paths
            .profile_pictures
            .unwrap_or_else(|| data_dir.join("profile_pictures"));

        Ok(Self {
            qrcodes: data_dir.join("qrcodes"),
            database: paths.database,
            photos: paths.photos,
            profile_pictures,
            data_dir,
            port,
        })
    }

    fn load_or_create_paths(data_dir: &Path) -> Result<DataPaths, ConfigError> {
        let paths_path = data_dir.join("paths.json");

        if !paths_path.exists() {
            let defaults = DataPaths {
                database: data_dir.join("clinisnap.db"),
                photos: data_dir.join("images"),
                profile_pictures: Some(data_dir.join("profile_pictures")),
            };
            let content = serde_json::to_string_pretty(&defaults)?;
            std::fs::write(&paths_path, content)?;
            return Ok(defaults);
        }

        let content = std::fs::read_to_string(&paths_path)?;
        serde_json::from_str(&content).map_err(|source| ConfigError::InvalidConfig {
            path: paths_path,
            source,
        })
    }

    /// Directory the log file lives in: next to the database.
    pub fn log_dir(&self) -> PathBuf {
        self.database
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.data_dir.clone())
    }
}
