//! Configuration file discovery and loading
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/evp/config.toml`)
//!
//! A missing file is not fatal: callers get built-in defaults and a warning.
//! A file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform config directory
pub const APP_DIR: &str = "evp";

/// File name of the bootstrap configuration
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Resolve which configuration file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|p| p.exists())
}

/// Platform default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME));

    if cfg!(target_os = "linux") {
        // ~/.config/evp/config.toml first, then /etc/evp/config.toml
        if let Some(path) = user_config.as_ref().filter(|p| p.exists()) {
            return Some(path.clone());
        }
        let system_config = PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    user_config
}

/// Parse a TOML document into `T`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
}

/// Load `T` from `path`, falling back to `T::default()` when there is no file
pub fn load_toml_or_default<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No configuration file found, using built-in defaults");
        return Ok(T::default());
    };

    match std::fs::read_to_string(path) {
        Ok(content) => {
            info!("Loading configuration from {}", path.display());
            parse_toml(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Configuration file {} not found, using built-in defaults",
                path.display()
            );
            Ok(T::default())
        }
        Err(e) => Err(Error::Io(e)),
    }
}
