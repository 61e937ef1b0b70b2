//! Plugin system error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur during plugin operations.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Artifact file not found.
    #[error("Plugin artifact not found: {0}")]
    NotFound(PathBuf),

    /// File is not a loadable artifact (wrong suffix).
    #[error("Not a plugin artifact: {0}")]
    UnsupportedArtifact(PathBuf),

    /// Artifact was already loaded during this process lifetime.
    #[error("Artifact '{0}' is already loaded")]
    AlreadyLoaded(String),

    /// No game registered under this name.
    #[error("Unknown game: {0}")]
    UnknownGame(String),

    /// Artifact could not be opened or compiled.
    #[error("Failed to load artifact '{artifact}': {message}")]
    LoadError { artifact: String, message: String },

    /// A game type inside an artifact does not satisfy the game ABI.
    #[error("Game '{game}' does not satisfy the plugin ABI: {reason}")]
    InvalidAbi { game: String, reason: String },

    /// Plugin code failed while running.
    #[error("Plugin execution failed: {0}")]
    ExecutionError(String),

    /// Input rejected by the game.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input delivered to a game that is not running.
    #[error("Game '{0}' is not running")]
    NotRunning(String),

    /// Input delivered to a paused game.
    #[error("Game '{0}' is paused")]
    Paused(String),

    /// Filesystem watcher could not be set up.
    #[error("Watcher error: {0}")]
    Watch(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WASM error.
    #[error("WASM error: {0}")]
    Wasm(String),
}

impl From<wasmtime::Error> for PluginError {
    fn from(err: wasmtime::Error) -> Self {
        Self::Wasm(format!("{err:#}"))
    }
}

#[cfg(feature = "hot-reload")]
impl From<notify::Error> for PluginError {
    fn from(err: notify::Error) -> Self {
        Self::Watch(err.to_string())
    }
}
