//! Core plugin types.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where a plugin came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "artifact", rename_all = "lowercase")]
pub enum PluginOrigin {
    /// Compiled into the host.
    BuiltIn,
    /// Loaded from an artifact in the plugin directory.
    External(String),
}

impl PluginOrigin {
    /// Get the display name for this origin.
    pub fn display_name(&self) -> &str {
        match self {
            Self::BuiltIn => "built-in",
            Self::External(artifact) => artifact,
        }
    }

    /// Check if the plugin was loaded from an artifact.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }
}

impl std::fmt::Display for PluginOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Identity view of a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Unique plugin name, the registry key.
    pub name: String,
    /// Plugin version.
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Plugin origin.
    pub origin: PluginOrigin,
}

/// File extension that marks a loadable artifact.
pub const ARTIFACT_EXTENSION: &str = "wasm";

/// Default plugin directory, relative to the working directory.
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Delay between seeing a new artifact and reading it.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Export holding the newline-separated list of game ids in an artifact.
pub const SERVICES_EXPORT: &str = "__game_services";

/// Linear memory export used for every string crossing the ABI.
pub const MEMORY_EXPORT: &str = "memory";

/// Check whether `path` names an artifact, by suffix only.
pub fn is_artifact(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Identifier of an artifact: its file name.
pub fn artifact_id(path: &Path) -> Option<String> {
    path.file_name().and_then(|name| name.to_str()).map(str::to_string)
}
