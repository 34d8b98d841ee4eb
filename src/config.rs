//! Configuration management for Scanvault.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default web server bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3030";

/// Environment variable that overrides the data directory.
pub const DATA_DIR_ENV: &str = "SCANVAULT_DATA_DIR";

/// Runtime settings, loaded from `{data_dir}/config.toml` when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base directory holding the database and uploaded files.
    pub data_dir: PathBuf,
    /// Tesseract language setting.
    pub ocr_language: String,
    /// Web server bind address (HOST:PORT).
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ocr_language: "eng".to_string(),
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

impl Settings {
    /// Load settings, resolving the data directory from (in order) the
    /// explicit override, the `SCANVAULT_DATA_DIR` environment variable,
    /// or the platform data directory.
    pub fn load(data_dir_override: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override);
        let config_path = data_dir.join("config.toml");

        let mut settings: Settings = if config_path.exists() {
            toml::from_str(&fs::read_to_string(&config_path)?)?
        } else {
            Settings::default()
        };

        // The resolved directory wins over whatever the file declares.
        settings.data_dir = data_dir;
        Ok(settings)
    }

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("scanvault.db")
    }

    /// Directory where uploaded blobs are stored.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Create the data and uploads directories if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(self.uploads_dir())
    }
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = data_dir_override {
        return expand_path(&dir);
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return expand_path(PathBuf::from(dir).as_path());
        }
    }
    default_data_dir()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scanvault")
}

fn expand_path(path: &std::path::Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
}
