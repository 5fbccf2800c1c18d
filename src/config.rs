//! Configuration module for the settings watcher.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the binary)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SW_` and use double underscores
//! to separate nested levels:
//! - `SW_WATCHER__QUIET_INTERVAL_MS=250` sets `watcher.quiet_interval_ms`
//! - `SW_PATHS__PERSISTENCE_DIRECTORY=/srv/settings` sets `paths.persistence_directory`
//! - `SW_LOGGING__DEFAULT=info` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::watcher::DEFAULT_QUIET_INTERVAL_MS;

/// Override key for the object map base directory.
pub const OBJECT_MAP_FOLDER: &str = "object_map_folder";
/// Override key for the base directory of the single-file settings.
pub const PERSISTENCE_DIRECTORY: &str = "persistence_directory";
/// Override key for the data collection configuration directory.
pub const DATA_COLLECTION_CONFIGURATION_DIRECTORY: &str = "data_collection_configuration_directory";

/// Default settings file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = "settings-watcher.toml";

/// Key/value view over process-wide configuration.
///
/// The resolver only ever asks for directory overrides; an absent or empty
/// value means "use the built-in default".
pub trait SettingsLookup: Send + Sync {
    fn get_setting(&self, key: &str) -> Option<String>;
}

impl SettingsLookup for HashMap<String, String> {
    fn get_setting(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Debounce behaviour
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Directory overrides for artifact resolution
    #[serde(default)]
    pub paths: PathsConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatcherConfig {
    /// Quiet interval between two events for the same path
    #[serde(default = "default_quiet_interval_ms")]
    pub quiet_interval_ms: u64,

    /// Suppress events that arrive within the quiet interval
    #[serde(default = "default_true")]
    pub filter_recent_events: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PathsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_map_folder: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_directory: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_collection_configuration_directory: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for every module
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `settings_watcher::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_quiet_interval_ms() -> u64 {
    DEFAULT_QUIET_INTERVAL_MS
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quiet_interval_ms: default_quiet_interval_ms(),
            filter_recent_events: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from defaults, `settings-watcher.toml` and `SW_` env vars.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file, still honouring env vars.
    ///
    /// A missing file is not an error; defaults and env vars apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            // Double underscore (__) separates nested levels
            .merge(Env::prefixed("SW_").split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file, refusing to overwrite unless `force`.
    pub fn init_config_file(
        path: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if !force && path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(path)?;
        Ok(path.to_path_buf())
    }
}

impl SettingsLookup for Settings {
    fn get_setting(&self, key: &str) -> Option<String> {
        let value = match key {
            OBJECT_MAP_FOLDER => self.paths.object_map_folder.as_ref(),
            PERSISTENCE_DIRECTORY => self.paths.persistence_directory.as_ref(),
            DATA_COLLECTION_CONFIGURATION_DIRECTORY => {
                self.paths.data_collection_configuration_directory.as_ref()
            }
            _ => None,
        };
        value.map(|p| p.to_string_lossy().into_owned())
    }
}
