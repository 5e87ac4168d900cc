//! Bootstrap configuration for the settings registry and its diagnostics

use serde::Deserialize;
use std::path::PathBuf;

/// Default configuration file location.
///
/// Distributions should replace this with a distro-appropriate path.
pub const DEFAULT_CONFIG_PATH: &str = "/dev/null";

/// Registry bootstrap configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Program name used to tag diagnostics, e.g. "k2ksm-public"
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    /// INI file loaded by `SettingsRegistry::load`
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            config_path: default_config_path(),
            log: LogConfig::default(),
        }
    }
}

/// Diagnostics sink configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_level")]
    pub level: String,

    /// Write to standard error
    #[serde(default = "default_true")]
    pub stderr: bool,

    /// Also write to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            stderr: true,
            file: None,
        }
    }
}

fn default_name_prefix() -> String {
    "k2ksm".to_string()
}

fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
