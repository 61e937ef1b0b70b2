//! Plugin system for Gamedeck.
//!
//! Games are plugins. Built-in games are compiled in; external games come from
//! WebAssembly artifacts in the plugin directory, loaded at startup and
//! hot-loaded while the application runs.
//!
//! # Architecture
//!
//! - [`GamePlugin`] is the contract every game implements. Lifecycle
//!   bookkeeping lives in a composed [`GameCore`].
//! - Each game owns an [`EventBus`] that delivers [`GameEvent`]s to
//!   [`GameListener`]s in subscription order.
//! - [`PluginRegistry`] keeps one instance per game name; the first
//!   registration wins.
//! - [`ArtifactLoader`] discovers games in an artifact through a chain of
//!   [`DiscoveryStrategy`] implementations: the artifact's declared service
//!   list first, then a scan of its exports.
//! - `DirectoryWatcher` (feature `hot-reload`) loads artifacts that appear in
//!   the plugin directory after a settling delay.
//!
//! # Artifact layout
//!
//! ```text
//! plugins/
//! ├── snake.wasm      # exports __game_services = "snake"
//! └── puzzles.wasm    # no service list, games found by export scan
//! ```

mod bus;
mod contract;
mod error;
mod event;
mod host;
mod loader;
mod registry;
mod types;
mod wasm;
mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

pub use bus::{EventBus, GameListener};
pub use contract::{GameCore, GamePlugin, GameSurface};
pub use error::{PluginError, PluginResult};
pub use event::{EventKind, GameEvent, ERROR_MESSAGE_KEY, EXCEPTION_KEY};
pub use host::{build_linker, pack_str_ref, unpack_str_ref, HostState, LogLevel};
pub use loader::{
    parse_services, ArtifactLoader, DiscoveryStrategy, ExportScanStrategy, LoadContext, LoadReport,
    LoadedArtifacts, ManifestStrategy,
};
pub use registry::PluginRegistry;
pub use types::{
    artifact_id, is_artifact, PluginDescriptor, PluginOrigin, ARTIFACT_EXTENSION,
    DEFAULT_PLUGINS_DIR, DEFAULT_SETTLE_DELAY, MEMORY_EXPORT, SERVICES_EXPORT,
};
pub use wasm::{concrete_game_ids, export_name, WasmGame};
#[cfg(feature = "hot-reload")]
pub use watcher::DirectoryWatcher;
pub use watcher::{Discovery, WatcherConfig};
