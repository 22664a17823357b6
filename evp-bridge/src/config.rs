//! Bootstrap configuration for evp-bridge
//!
//! Loaded once at startup from TOML. Settings sources, highest first:
//! 1. Command-line arguments / `EVP_*` environment variables
//! 2. TOML configuration file
//! 3. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::assets::DEFAULT_ASSET_ROOT;
use crate::engine::{MediaInfo, SimulatedEngineConfig};
use crate::error::Result;

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "EVP_CONFIG";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// HTTP server port
    pub port: u16,

    /// Address the HTTP server binds to
    pub bind_address: String,

    /// Root directory that asset names resolve against
    pub asset_root: String,

    pub logging: LoggingConfig,

    pub engine: EngineConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: "127.0.0.1".to_string(),
            asset_root: DEFAULT_ASSET_ROOT.to_string(),
            logging: LoggingConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Simulated engine settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Duration reported for media not otherwise known
    pub default_duration_ms: u64,
    pub default_width: u32,
    pub default_height: u32,

    /// Real-time clock tick driving playback
    pub tick_interval_ms: u64,

    pub buffer_ahead_ms: u64,

    /// Report readiness immediately after open
    pub auto_ready: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let defaults = SimulatedEngineConfig::default();
        Self {
            default_duration_ms: defaults.default_media.duration_ms,
            default_width: defaults.default_media.width,
            default_height: defaults.default_media.height,
            tick_interval_ms: 50,
            buffer_ahead_ms: defaults.buffer_ahead_ms,
            auto_ready: defaults.auto_ready,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn simulated(&self) -> SimulatedEngineConfig {
        SimulatedEngineConfig {
            default_media: MediaInfo::new(
                self.default_duration_ms,
                self.default_width,
                self.default_height,
            ),
            buffer_ahead_ms: self.buffer_ahead_ms,
            auto_ready: self.auto_ready,
        }
    }
}

fn default_port() -> u16 {
    5740
}

/// Command-line overrides applied on top of the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub asset_root: Option<String>,
    pub log_level: Option<String>,
}

impl BridgeConfig {
    /// Locate and load the configuration file (CLI path, then `EVP_CONFIG`,
    /// then the platform config directory)
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let path = evp_common::config::resolve_config_path(cli_path, CONFIG_ENV_VAR);
        Ok(evp_common::config::load_toml_or_default(path.as_deref())?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(root) = overrides.asset_root {
            self.asset_root = root;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }
}
