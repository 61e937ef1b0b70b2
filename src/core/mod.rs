//! Core services for Gamedeck.
//!
//! Configuration loading and score persistence.

mod config;
mod scores;

pub use config::{
    Config, GeneralConfig, PluginsConfig, ScoresConfig, WatcherSettings, LOCAL_CONFIG_FILE,
};
pub use scores::{
    format_scores, JsonScoreStore, ScoreError, ScoreRecord, ScoreStore, DEFAULT_MAX_RECORDS,
};
