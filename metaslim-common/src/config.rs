//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional TOML configuration file contents
///
/// Lowest-priority configuration tier; database settings and environment
/// variables override every field here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Root folder holding the local database
    pub root_folder: Option<String>,
    /// Gemini API key for the extraction client
    pub gemini_api_key: Option<String>,
    /// Firestore project id; presence selects the remote-backed store
    pub firestore_project_id: Option<String>,
    /// Firestore REST API key
    pub firestore_api_key: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read config failed ({}): {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse config failed ({}): {}", path.display(), e)))
    }

    /// Load the platform config file if it exists, defaults otherwise
    pub fn load_default() -> Self {
        match config_file_path() {
            Some(path) if path.exists() => Self::load(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config file: {}", e);
                Self::default()
            }),
            _ => Self::default(),
        }
    }
}

/// Platform configuration file location (~/.config/metaslim/config.toml on Linux)
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("metaslim").join("config.toml"))
}

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.root_folder {
        return PathBuf::from(path);
    }

    default_root_folder()
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/metaslim (or /var/lib/metaslim for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("metaslim"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/metaslim"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/metaslim
        dirs::data_dir()
            .map(|d| d.join("metaslim"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/metaslim"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\metaslim
        dirs::data_local_dir()
            .map(|d| d.join("metaslim"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\metaslim"))
    } else {
        PathBuf::from("./metaslim_data")
    }
}

/// Create the root folder if missing and return the database path inside it
pub fn ensure_root_folder(root: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(root)?;
    Ok(root.join("metaslim.db"))
}
