//! Configuration file discovery and loading
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. OS-dependent default location, only if the file exists
//!
//! An explicitly named file must exist and parse. A missing default file is
//! not an error: callers fall back to compiled defaults.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Application directory name under the platform config/data dirs
pub const APP_DIR_NAME: &str = "moodtunes";

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "MOODTUNES_CONFIG";

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
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

/// Where a config file path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    DefaultLocation,
}

/// Resolve which config file to read, if any
///
/// Returns `Ok(None)` when neither an explicit path nor a default file exists.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
) -> Result<Option<(PathBuf, ConfigSource)>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return require_exists(path.to_path_buf(), ConfigSource::CommandLine).map(Some);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return require_exists(PathBuf::from(path), ConfigSource::Environment).map(Some);
        }
    }

    // Priority 3: Default location (optional)
    match default_config_file() {
        Some(path) if path.exists() => Ok(Some((path, ConfigSource::DefaultLocation))),
        _ => Ok(None),
    }
}

fn require_exists(path: PathBuf, source: ConfigSource) -> Result<(PathBuf, ConfigSource)> {
    if path.exists() {
        Ok((path, source))
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )))
    }
}

/// Default config file: `<config_dir>/moodtunes/config.toml`
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("config.toml"))
}

/// OS-dependent data directory for MoodTunes
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("./moodtunes_data"))
}

/// Parse a TOML file into `T`
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e))
    })
}

/// Resolve and load a config file, falling back to `T::default()`
///
/// Explicit paths (CLI or environment) that are missing or malformed are
/// errors. A malformed default-location file is also an error; only its
/// absence falls back to defaults.
pub fn load_config_or_default<T>(cli_arg: Option<&Path>, env_var_name: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match resolve_config_path(cli_arg, env_var_name)? {
        Some((path, source)) => {
            let config = load_toml(&path)?;
            info!("Loaded configuration from {} ({:?})", path.display(), source);
            Ok(config)
        }
        None => {
            warn!("No config file found, using built-in defaults");
            Ok(T::default())
        }
    }
}

/// Treat blank strings as absent
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
