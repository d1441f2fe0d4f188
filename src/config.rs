//! Annotator configuration.
//!
//! Settings are serialized as versioned JSON. Native builds keep the file
//! under the user's config directory; WASM builds keep it in localStorage.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::ThemeChoice;
use crate::persistence::{DEFAULT_STORAGE_PREFIX, KeyValueStore, LocalStorageAdapter};
use crate::tool::{
    DEFAULT_DOUBLE_CLICK_MS, DEFAULT_FREEHAND_MIN_DISTANCE, DEFAULT_MIN_BOX_SIZE,
    DEFAULT_MIN_CIRCLE_RADIUS, DEFAULT_SNAP_DISTANCE, ToolSettings,
};

/// Log level setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }

    /// Convert to a `log::Level` (used by `console_log`).
    pub fn to_level(&self) -> log::Level {
        match self {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Annotator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorConfig {
    /// Version of the configuration file format
    pub version: u32,

    #[serde(default)]
    pub log_level: LogLevel,

    #[serde(default)]
    pub theme: ThemeChoice,

    /// Save automatically after changes (debounced)
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,

    /// Quiet period before an automatic save, in milliseconds
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Polygon snap-to-first-vertex radius in image pixels
    #[serde(default = "default_snap_distance")]
    pub snap_distance: f64,

    /// Max gap between two clicks of a double click
    #[serde(default = "default_double_click_ms")]
    pub double_click_ms: f64,

    #[serde(default = "default_freehand_min_distance")]
    pub freehand_min_distance: f64,

    #[serde(default = "default_min_circle_radius")]
    pub min_circle_radius: f64,

    #[serde(default = "default_min_box_size")]
    pub min_box_size: f64,

    /// Key prefix for annotation sets in key-value stores
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,
}

fn default_auto_save() -> bool {
    true
}

fn default_save_debounce_ms() -> u64 {
    1000
}

fn default_snap_distance() -> f64 {
    DEFAULT_SNAP_DISTANCE
}

fn default_double_click_ms() -> f64 {
    DEFAULT_DOUBLE_CLICK_MS
}

fn default_freehand_min_distance() -> f64 {
    DEFAULT_FREEHAND_MIN_DISTANCE
}

fn default_min_circle_radius() -> f64 {
    DEFAULT_MIN_CIRCLE_RADIUS
}

fn default_min_box_size() -> f64 {
    DEFAULT_MIN_BOX_SIZE
}

fn default_storage_prefix() -> String {
    DEFAULT_STORAGE_PREFIX.to_string()
}

impl AnnotatorConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: LogLevel::default(),
            theme: ThemeChoice::default(),
            auto_save: default_auto_save(),
            save_debounce_ms: default_save_debounce_ms(),
            snap_distance: default_snap_distance(),
            double_click_ms: default_double_click_ms(),
            freehand_min_distance: default_freehand_min_distance(),
            min_circle_radius: default_min_circle_radius(),
            min_box_size: default_min_box_size(),
            storage_prefix: default_storage_prefix(),
        }
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            snap_distance: self.snap_distance,
            double_click_ms: self.double_click_ms,
            freehand_min_distance: self.freehand_min_distance,
            min_circle_radius: self.min_circle_radius,
            min_box_size: self.min_box_size,
        }
    }

    pub fn save_debounce(&self) -> Duration {
        Duration::from_millis(self.save_debounce_ms)
    }

    /// Key-value storage adapter using the configured key prefix.
    pub fn local_storage_adapter<S: KeyValueStore>(&self, store: S) -> LocalStorageAdapter<S> {
        LocalStorageAdapter::with_prefix(store, self.storage_prefix.clone())
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    pub fn default_filename() -> &'static str {
        "annotator-config.json"
    }

    /// Default config file path. Returns None on WASM (no filesystem access).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn default_path() -> Option<std::path::PathBuf> {
        let base = dirs::config_dir().or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;
        Some(base.join("deepzoom-annotator").join(Self::default_filename()))
    }

    /// Load configuration from a file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save configuration to a file, creating parent directories.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// LocalStorage key for WASM config persistence.
    #[cfg(target_arch = "wasm32")]
    const LOCALSTORAGE_KEY: &'static str = "deepzoom-annotator-config";

    /// Try to load configuration from localStorage (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn load_from_local_storage() -> Option<Self> {
        use crate::persistence::BrowserStorage;

        let storage = BrowserStorage::open().ok()?;
        match storage.get(Self::LOCALSTORAGE_KEY) {
            Ok(Some(json)) => match Self::from_json(&json) {
                Ok(config) => {
                    log::info!("Loaded configuration from localStorage");
                    Some(config)
                }
                Err(e) => {
                    log::warn!("Failed to parse config from localStorage: {}", e);
                    None
                }
            },
            Ok(None) => {
                log::debug!("No config found in localStorage");
                None
            }
            Err(e) => {
                log::warn!("Failed to read from localStorage: {}", e);
                None
            }
        }
    }

    /// Save configuration to localStorage (WASM only).
    #[cfg(target_arch = "wasm32")]
    pub fn save_to_local_storage(&self) -> Result<(), ConfigError> {
        use crate::persistence::BrowserStorage;

        let mut storage =
            BrowserStorage::open().map_err(|e| ConfigError::Storage(e.to_string()))?;
        storage
            .set(Self::LOCALSTORAGE_KEY, &self.to_json()?)
            .map_err(|e| ConfigError::Storage(e.to_string()))?;
        log::info!("Saved configuration to localStorage");
        Ok(())
    }
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        file_version: u32,
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage error (localStorage in WASM)
    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnnotatorConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.auto_save);
        assert_eq!(config.save_debounce(), Duration::from_secs(1));
        assert_eq!(config.tool_settings(), ToolSettings::default());
        assert_eq!(config.storage_prefix, "annotations:");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut config = AnnotatorConfig::new();
        config.theme = ThemeChoice::Light;
        config.log_level = LogLevel::Debug;
        config.snap_distance = 12.5;

        let json = config.to_json().unwrap();
        let parsed = AnnotatorConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_explicit_false_auto_save_is_honoured() {
        let config = AnnotatorConfig::from_json(r#"{"version": 1, "auto_save": false}"#).unwrap();
        assert!(!config.auto_save);

        let config = AnnotatorConfig::from_json(r#"{"version": 1}"#).unwrap();
        assert!(config.auto_save);
        assert_eq!(config.double_click_ms, 300.0);
    }

    #[test]
    fn test_version_too_new() {
        let json = format!(r#"{{"version": {}}}"#, CONFIG_VERSION + 1);
        assert!(matches!(
            AnnotatorConfig::from_json(&json),
            Err(ConfigError::VersionTooNew { .. })
        ));
        assert!(matches!(
            AnnotatorConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Trace.to_level(), log::Level::Trace);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_save_and_load_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("config.json");
        let mut config = AnnotatorConfig::new();
        config.auto_save = false;
        config.save_to(&path).unwrap();
        assert_eq!(AnnotatorConfig::load_from(&path).unwrap(), config);
    }
}
