//! Registry of known game instances, keyed by name.
//!
//! Registration is idempotent: the first instance registered under a name
//! wins and later ones are dropped. This is the single deduplication point
//! for built-in and external games alike.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{GamePlugin, PluginDescriptor};

#[derive(Default)]
struct Entries {
    order: Vec<Arc<dyn GamePlugin>>,
    by_name: HashMap<String, usize>,
}

/// Thread-safe set of registered games.
#[derive(Default)]
pub struct PluginRegistry {
    entries: Mutex<Entries>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").field("plugins", &self.len()).finish()
    }
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a game under its name.
    ///
    /// Returns `true` if the game was added, `false` if the name was already
    /// taken (the existing instance stays) or empty.
    pub fn register(&self, plugin: Arc<dyn GamePlugin>) -> bool {
        let name = plugin.name().to_string();
        if name.is_empty() {
            tracing::warn!("Ignoring game with an empty name");
            return false;
        }

        let mut entries = self.entries.lock();
        if entries.by_name.contains_key(&name) {
            tracing::debug!(plugin = %name, "Duplicate game ignored");
            return false;
        }

        let index = entries.order.len();
        entries.order.push(plugin);
        entries.by_name.insert(name, index);
        true
    }

    /// Look up a game by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn GamePlugin>> {
        let entries = self.entries.lock();
        entries.by_name.get(name).map(|&index| Arc::clone(&entries.order[index]))
    }

    /// Check whether a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.lock().by_name.contains_key(name)
    }

    /// Snapshot of all games in registration order.
    pub fn list(&self) -> Vec<Arc<dyn GamePlugin>> {
        self.entries.lock().order.clone()
    }

    /// Descriptors of all games in registration order.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.list().iter().map(|plugin| plugin.descriptor()).collect()
    }

    /// Number of registered games.
    pub fn len(&self) -> usize {
        self.entries.lock().order.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
