//! Configuration loading and data root resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file `root_folder` key
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is never fatal: callers get `None` and fall back
//! to compiled defaults with a warning.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the data root
pub const ROOT_FOLDER_ENV: &str = "CURTAIN_ROOT_FOLDER";

/// Environment variable naming an explicit config file
pub const CONFIG_FILE_ENV: &str = "CURTAIN_CONFIG";

/// Logging configuration shared by every Curtain binary
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level or EnvFilter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve the data root following the priority order above
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config_root: Option<&Path>,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        debug!("Root folder from command line: {}", path.display());
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            debug!("Root folder from {}: {}", env_var_name, path);
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = config_root {
        debug!("Root folder from config file: {}", path.display());
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Locate the config file: explicit path, then environment, then the user config dir
///
/// Returns `None` when no candidate exists on disk.
pub fn locate_config_file(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("curtain").join("config.toml"))?;
    user_config.exists().then_some(user_config)
}

/// Read and parse a TOML file
///
/// A missing file yields `Ok(None)`; a file that exists but fails to parse
/// is a configuration error.
pub fn read_toml_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Config file not found: {} (using defaults)", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Get OS-dependent default data root
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("curtain"))
        .unwrap_or_else(|| PathBuf::from("./curtain_data"))
}
