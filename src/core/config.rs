//! Configuration management for Gamedeck.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::plugin::{ARTIFACT_EXTENSION, DEFAULT_PLUGINS_DIR, DEFAULT_SETTLE_DELAY};

/// Name of the per-directory config file.
pub const LOCAL_CONFIG_FILE: &str = ".gamedeck.toml";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Plugin directory settings
    pub plugins: PluginsConfig,

    /// Hot-load watcher settings
    pub watcher: WatcherSettings,

    /// Score persistence settings
    pub scores: ScoresConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory for persistent data (scores). Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Plugin directory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory scanned and watched for artifacts
    pub dir: PathBuf,

    /// File suffix that marks an artifact
    pub extension: String,
}

/// Hot-load watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// Whether to watch the plugin directory at all
    pub enabled: bool,

    /// Delay before loading a newly seen artifact, in milliseconds
    pub settle_delay_ms: u64,
}

/// Score persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoresConfig {
    /// Records kept per game
    pub max_records: usize,

    /// File name inside the data directory
    pub file: String,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from(DEFAULT_PLUGINS_DIR), extension: ARTIFACT_EXTENSION.to_string() }
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self { enabled: true, settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64 }
    }
}

impl WatcherSettings {
    /// Settling delay as a duration.
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for ScoresConfig {
    fn default() -> Self {
        Self { max_records: 3, file: "scores.json".to_string() }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.gamedeck.toml` in current directory
    /// 2. `~/.config/gamedeck/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to the global config file. Returns its path.
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let config_dir =
            Self::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        let path = config_dir.join("config.toml");
        self.save_to_file(&path)?;
        Ok(path)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("gamedeck"))
    }

    /// Get the platform data directory path.
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("gamedeck"))
    }

    /// Directory used for persistent data.
    ///
    /// The configured directory wins, then the platform data directory, then
    /// `data` relative to the working directory.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.general
            .data_dir
            .clone()
            .or_else(Self::data_dir)
            .unwrap_or_else(|| PathBuf::from("data"))
    }

    /// Path of the score file.
    pub fn scores_path(&self) -> PathBuf {
        self.resolved_data_dir().join(&self.scores.file)
    }
}
