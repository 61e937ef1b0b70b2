//! Artifact loading.
//!
//! An artifact is opened in its own [`LoadContext`] (compiled module, host
//! linker and a probe instance), games are discovered through a chain of
//! [`DiscoveryStrategy`] implementations and registered in the
//! [`PluginRegistry`]. The context is dropped when loading ends, whatever the
//! outcome.
//!
//! Strategies run in order and the first one that produces at least one game
//! wins. The default chain is [`ManifestStrategy`] (the artifact lists its
//! games) followed by [`ExportScanStrategy`] (every complete export group is a
//! game).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use wasmtime::{Engine, Instance, Linker, Module, Store};

use super::host::{build_linker, read_guest_str, HostState};
use super::wasm::{concrete_game_ids, WasmGame};
use super::{
    artifact_id, is_artifact, GamePlugin, PluginError, PluginRegistry, PluginResult,
    ARTIFACT_EXTENSION, MEMORY_EXPORT, SERVICES_EXPORT,
};

/// Isolated loading context scoped to one artifact.
pub struct LoadContext {
    artifact: String,
    path: PathBuf,
    engine: Engine,
    linker: Linker<HostState>,
    module: Module,
    probe: Option<(Store<HostState>, Instance)>,
}

impl LoadContext {
    /// Read and compile the artifact at `path`.
    pub fn open(engine: &Engine, path: &Path) -> PluginResult<Self> {
        let artifact = artifact_id(path).ok_or_else(|| PluginError::NotFound(path.to_path_buf()))?;
        let bytes = std::fs::read(path)?;
        let module = Module::new(engine, &bytes).map_err(|e| PluginError::LoadError {
            artifact: artifact.clone(),
            message: format!("{e:#}"),
        })?;

        tracing::debug!(artifact = %artifact, "Opened load context");

        Ok(Self {
            artifact,
            path: path.to_path_buf(),
            engine: engine.clone(),
            linker: build_linker(engine)?,
            module,
            probe: None,
        })
    }

    /// Artifact identifier (file name).
    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    /// Artifact path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Compiled module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Read the service list exported by the artifact.
    ///
    /// Returns `Ok(None)` when the artifact has no services export.
    pub fn declared_services(&mut self) -> PluginResult<Option<Vec<String>>> {
        if self.module.get_export(SERVICES_EXPORT).is_none() {
            return Ok(None);
        }

        if self.probe.is_none() {
            let mut store =
                Store::new(&self.engine, HostState::new(format!("{}:probe", self.artifact)));
            let instance = self.linker.instantiate(&mut store, &self.module)?;
            self.probe = Some((store, instance));
        }
        let artifact = self.artifact.clone();
        let Some((store, instance)) = self.probe.as_mut() else {
            return Ok(None);
        };

        let services = instance.get_typed_func::<(), i64>(&mut *store, SERVICES_EXPORT)?;
        let packed = services.call(&mut *store, ())?;
        let memory = instance.get_memory(&mut *store, MEMORY_EXPORT).ok_or_else(|| {
            PluginError::LoadError { artifact, message: "services export without memory".to_string() }
        })?;
        let list = read_guest_str(&memory, &*store, packed, SERVICES_EXPORT)?;

        Ok(Some(parse_services(&list)))
    }

    /// Ids of every complete game type in the module's exports.
    pub fn exported_game_ids(&self) -> Vec<String> {
        concrete_game_ids(&self.module)
    }

    /// Create an independent instance of game type `id`.
    pub fn instantiate(&self, id: &str) -> PluginResult<Arc<dyn GamePlugin>> {
        let game = WasmGame::instantiate(&self.engine, &self.linker, &self.module, &self.artifact, id)?;
        Ok(Arc::new(game))
    }
}

impl Drop for LoadContext {
    fn drop(&mut self) {
        tracing::trace!(artifact = %self.artifact, "Released load context");
    }
}

/// Parse a service list: one id per line, blank lines and `#` comments ignored.
pub fn parse_services(list: &str) -> Vec<String> {
    list.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// One way of finding games inside an artifact.
pub trait DiscoveryStrategy: Send + Sync {
    /// Strategy name, for logs and reports.
    fn name(&self) -> &'static str;

    /// Instantiate every game the strategy finds.
    ///
    /// Games that fail to instantiate are skipped; an error means the
    /// strategy as a whole could not run.
    fn discover(&self, ctx: &mut LoadContext) -> PluginResult<Vec<Arc<dyn GamePlugin>>>;
}

/// Discovery through the artifact's declared service list.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestStrategy;

impl DiscoveryStrategy for ManifestStrategy {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn discover(&self, ctx: &mut LoadContext) -> PluginResult<Vec<Arc<dyn GamePlugin>>> {
        let Some(ids) = ctx.declared_services()? else {
            return Ok(Vec::new());
        };

        let mut games = Vec::new();
        for id in ids {
            match ctx.instantiate(&id) {
                Ok(game) => games.push(game),
                Err(e) => {
                    tracing::warn!(artifact = %ctx.artifact(), game = %id, error = %e, "Declared game failed to load");
                }
            }
        }
        Ok(games)
    }
}

/// Discovery by scanning the module's exports for complete game types.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportScanStrategy;

impl DiscoveryStrategy for ExportScanStrategy {
    fn name(&self) -> &'static str {
        "export-scan"
    }

    fn discover(&self, ctx: &mut LoadContext) -> PluginResult<Vec<Arc<dyn GamePlugin>>> {
        let mut games = Vec::new();
        for id in ctx.exported_game_ids() {
            match ctx.instantiate(&id) {
                Ok(game) => games.push(game),
                Err(e) => {
                    tracing::debug!(artifact = %ctx.artifact(), game = %id, error = %e, "Skipping game type");
                }
            }
        }
        Ok(games)
    }
}

/// Outcome of loading one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    /// Artifact identifier.
    pub artifact: String,
    /// Strategy that produced the games, if any did.
    pub strategy: Option<&'static str>,
    /// Names newly added to the registry.
    pub registered: Vec<String>,
    /// Names dropped because they were already registered.
    pub duplicates: Vec<String>,
}

impl LoadReport {
    fn new(artifact: &str) -> Self {
        Self { artifact: artifact.to_string(), ..Self::default() }
    }

    /// Whether the artifact contributed no new games.
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }
}

/// Identifiers of artifacts already processed in this process.
///
/// An artifact is claimed before loading starts and released again only if
/// loading fails, so concurrent scans never load the same artifact twice.
#[derive(Debug, Default)]
pub struct LoadedArtifacts {
    ids: Mutex<HashSet<String>>,
}

impl LoadedArtifacts {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id` for loading. Returns `false` if it is already claimed.
    pub fn claim(&self, id: &str) -> bool {
        self.ids.lock().insert(id.to_string())
    }

    /// Give up a claim after a failed load.
    pub fn release(&self, id: &str) {
        self.ids.lock().remove(id);
    }

    /// Check whether `id` is claimed.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().contains(id)
    }

    /// Number of claimed artifacts.
    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    /// Check if nothing has been claimed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loads artifacts and registers the games they contain.
pub struct ArtifactLoader {
    engine: Engine,
    registry: Arc<PluginRegistry>,
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
    extension: String,
}

impl std::fmt::Debug for ArtifactLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactLoader")
            .field("strategies", &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("extension", &self.extension)
            .finish()
    }
}

impl ArtifactLoader {
    /// Create a loader with the default strategy chain.
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self::with_strategies(
            registry,
            vec![Box::new(ManifestStrategy), Box::new(ExportScanStrategy)],
        )
    }

    /// Create a loader with a custom strategy chain.
    pub fn with_strategies(
        registry: Arc<PluginRegistry>,
        strategies: Vec<Box<dyn DiscoveryStrategy>>,
    ) -> Self {
        Self {
            engine: Engine::default(),
            registry,
            strategies,
            extension: ARTIFACT_EXTENSION.to_string(),
        }
    }

    /// Use a different artifact suffix.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Artifact suffix this loader recognises.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Registry the loader feeds.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Load one artifact and register its games.
    ///
    /// An artifact without any games is not an error; the report is simply
    /// empty. Names already registered are dropped silently.
    pub fn load_artifact(&self, path: &Path) -> PluginResult<LoadReport> {
        if !path.is_file() {
            return Err(PluginError::NotFound(path.to_path_buf()));
        }

        let mut ctx = LoadContext::open(&self.engine, path)?;
        let mut report = LoadReport::new(ctx.artifact());
        tracing::info!(artifact = %report.artifact, "Loading plugin artifact");

        for strategy in &self.strategies {
            let games = match strategy.discover(&mut ctx) {
                Ok(games) => games,
                Err(e) => {
                    tracing::warn!(
                        artifact = %report.artifact,
                        strategy = strategy.name(),
                        error = %e,
                        "Discovery strategy failed"
                    );
                    continue;
                }
            };

            if games.is_empty() {
                tracing::debug!(artifact = %report.artifact, strategy = strategy.name(), "No games found");
                continue;
            }

            report.strategy = Some(strategy.name());
            for game in games {
                let name = game.name().to_string();
                let version = game.version().to_string();
                if self.registry.register(game) {
                    tracing::info!(plugin = %name, version = %version, "Plugin loaded");
                    report.registered.push(name);
                } else {
                    tracing::info!(plugin = %name, "Duplicate plugin ignored");
                    report.duplicates.push(name);
                }
            }
            break;
        }

        Ok(report)
    }

    /// Load every not-yet-loaded artifact in `dir`.
    ///
    /// The directory is created if missing. A failing artifact is logged and
    /// skipped; the scan carries on with the rest.
    pub fn scan_directory(
        &self,
        dir: &Path,
        loaded: &LoadedArtifacts,
    ) -> PluginResult<Vec<LoadReport>> {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            tracing::info!(dir = %dir.display(), "Created plugin directory");
        }

        let mut artifacts: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_artifact(path, &self.extension))
            .collect();
        artifacts.sort();

        if artifacts.is_empty() {
            tracing::info!(dir = %dir.display(), "No plugin artifacts found");
        }

        let mut reports = Vec::new();
        for path in artifacts {
            let Some(id) = artifact_id(&path) else {
                continue;
            };
            if !loaded.claim(&id) {
                continue;
            }

            match self.load_artifact(&path) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    loaded.release(&id);
                    tracing::error!(artifact = %id, error = %e, "Failed to load plugin artifact");
                }
            }
        }

        tracing::info!(total = self.registry.len(), "Plugin scan complete");
        Ok(reports)
    }
}
