#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::should_implement_trait)]

//! # Gamedeck
//!
//! A console game host with hot-loadable WebAssembly game plugins.
//!
//! Gamedeck ships a couple of built-in games and loads more from `.wasm`
//! artifacts dropped into its plugin directory, at startup and while it runs.
//! Every game publishes lifecycle events; the host records final scores and
//! keeps the best few per game.
//!
//! ## Features
//!
//! - **Plugin discovery**: games declared by an artifact's service list, or
//!   found by scanning its exports
//! - **Hot-loading**: new artifacts are picked up without a restart
//! - **Lifecycle events**: started, paused, resumed, score updated, finished, error
//! - **Scores**: top records per game in a JSON file
//!
//! ## Quick Start
//!
//! ```bash
//! # List built-in and external games
//! gamedeck list
//!
//! # Play one
//! gamedeck play Hangman
//!
//! # Import an artifact
//! gamedeck import ./snake.wasm
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::redundant_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::significant_drop_in_scrutinee)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unnecessary_literal_bound)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::use_self)]

pub mod controller;
pub mod core;
pub mod games;
pub mod plugin;

// Re-export commonly used types
pub use controller::{Controller, ControllerSettings, EventRelay, NullPresenter, Presenter};
pub use core::{Config, JsonScoreStore, ScoreError, ScoreRecord, ScoreStore};
pub use plugin::{
    ArtifactLoader, EventKind, GameEvent, GameListener, GamePlugin, GameSurface, PluginDescriptor,
    PluginError, PluginRegistry, PluginResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "gamedeck";
