//! Orchestration of games, plugin discovery, scores and presentation.
//!
//! The [`Controller`] owns the list of games it exposes and the single active
//! game. It subscribes an [`EventRelay`] to the active game's bus; the relay
//! persists final scores and forwards everything else to the [`Presenter`].

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::core::{Config, ScoreRecord, ScoreStore};
#[cfg(feature = "hot-reload")]
use crate::plugin::DirectoryWatcher;
use crate::plugin::{
    artifact_id, is_artifact, ArtifactLoader, Discovery, EventKind, GameEvent, GameListener,
    GamePlugin, GameSurface, LoadReport, LoadedArtifacts, PluginDescriptor, PluginError,
    PluginRegistry, PluginResult, WatcherConfig,
};

/// Callback surface of the presentation layer.
///
/// Every method has a no-op default so presenters implement only what they
/// show.
pub trait Presenter: Send + Sync {
    /// The list of games changed.
    fn plugin_list_changed(&self, _games: &[PluginDescriptor]) {}

    /// A game was selected and should be displayed.
    fn display_surface(&self, _game: &PluginDescriptor, _surface: &Arc<dyn GameSurface>) {}

    /// Live score of the active game.
    fn update_score(&self, _game: &str, _score: i64) {}

    /// A round finished.
    fn show_finished(&self, _game: &str, _score: i64) {}

    /// A game reported an error.
    fn show_error(&self, _game: &str, _message: &str) {}

    /// Informational state change (started, paused, resumed).
    fn state_changed(&self, _game: &str, _kind: EventKind) {}

    /// Best scores of a game, after selection or a new record.
    fn scores_changed(&self, _game: &str, _records: &[ScoreRecord]) {}
}

/// Presenter that shows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {}

/// Listener relaying game events to persistence and presentation.
pub struct EventRelay {
    store: Arc<dyn ScoreStore>,
    presenter: Arc<dyn Presenter>,
}

impl EventRelay {
    /// Create a relay.
    pub fn new(store: Arc<dyn ScoreStore>, presenter: Arc<dyn Presenter>) -> Self {
        Self { store, presenter }
    }
}

impl GameListener for EventRelay {
    fn on_game_finished(&self, event: &GameEvent) {
        tracing::info!(plugin = %event.plugin(), score = event.score(), "Game finished");

        if let Err(e) = self.store.record(event.plugin(), event.score()) {
            tracing::error!(plugin = %event.plugin(), error = %e, "Failed to record score");
        }

        self.presenter.show_finished(event.plugin(), event.score());
        self.presenter.scores_changed(event.plugin(), &self.store.top_scores(event.plugin()));
    }

    fn on_score_updated(&self, event: &GameEvent) {
        tracing::debug!(plugin = %event.plugin(), score = event.score(), "Score updated");
        self.presenter.update_score(event.plugin(), event.score());
    }

    fn on_state_changed(&self, event: &GameEvent) {
        tracing::debug!(plugin = %event.plugin(), kind = %event.kind(), "Game state changed");
        self.presenter.state_changed(event.plugin(), event.kind());
    }

    fn on_game_error(&self, event: &GameEvent) {
        let message = event.error_message().unwrap_or("unknown error");
        tracing::error!(
            plugin = %event.plugin(),
            message,
            detail = event.error_detail().unwrap_or(""),
            "Game error"
        );
        self.presenter.show_error(event.plugin(), message);
    }
}

/// Controller settings.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Plugin directory
    pub plugins_dir: PathBuf,
    /// Artifact suffix
    pub extension: String,
    /// Whether to hot-load artifacts
    pub watch: bool,
    /// Settling delay for hot-loaded artifacts
    pub settle_delay: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        let watcher = WatcherConfig::default();
        Self {
            plugins_dir: watcher.dir,
            extension: watcher.extension,
            watch: true,
            settle_delay: watcher.settle_delay,
        }
    }
}

impl ControllerSettings {
    /// Settings taken from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            plugins_dir: config.plugins.dir.clone(),
            extension: config.plugins.extension.clone(),
            watch: config.watcher.enabled,
            settle_delay: config.watcher.settle_delay(),
        }
    }

    #[cfg(feature = "hot-reload")]
    fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            dir: self.plugins_dir.clone(),
            extension: self.extension.clone(),
            settle_delay: self.settle_delay,
        }
    }
}

/// Host-side orchestration.
pub struct Controller {
    settings: ControllerSettings,
    registry: Arc<PluginRegistry>,
    loader: Arc<ArtifactLoader>,
    loaded: Arc<LoadedArtifacts>,
    store: Arc<dyn ScoreStore>,
    presenter: Arc<dyn Presenter>,
    relay: Arc<dyn GameListener>,
    games: Vec<Arc<dyn GamePlugin>>,
    active: Option<Arc<dyn GamePlugin>>,
    scan: Option<JoinHandle<Vec<LoadReport>>>,
    discovery_tx: Sender<Discovery>,
    discovery_rx: Receiver<Discovery>,
    #[cfg(feature = "hot-reload")]
    watcher: Option<DirectoryWatcher>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("settings", &self.settings)
            .field("games", &self.games.len())
            .field("active", &self.active.as_ref().map(|g| g.name().to_string()))
            .finish()
    }
}

impl Controller {
    /// Create a controller with a fresh registry.
    pub fn new(
        settings: ControllerSettings,
        store: Arc<dyn ScoreStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let registry = Arc::new(PluginRegistry::new());
        let loader = Arc::new(
            ArtifactLoader::new(Arc::clone(&registry)).with_extension(settings.extension.clone()),
        );
        let relay: Arc<dyn GameListener> =
            Arc::new(EventRelay::new(Arc::clone(&store), Arc::clone(&presenter)));
        let (discovery_tx, discovery_rx) = mpsc::channel();

        Self {
            settings,
            registry,
            loader,
            loaded: Arc::new(LoadedArtifacts::new()),
            store,
            presenter,
            relay,
            games: Vec::new(),
            active: None,
            scan: None,
            discovery_tx,
            discovery_rx,
            #[cfg(feature = "hot-reload")]
            watcher: None,
        }
    }

    /// Register built-ins, scan the plugin directory and start the watcher.
    ///
    /// Blocks until the startup scan is done. A failing scan or watcher is
    /// logged; the built-ins are still usable.
    pub fn start(&mut self, builtins: Vec<Arc<dyn GamePlugin>>) -> PluginResult<Vec<LoadReport>> {
        self.begin(builtins)?;
        Ok(self.wait_for_scan())
    }

    /// Register built-ins, then scan the plugin directory on a background
    /// thread and start the watcher. Returns without waiting for the scan.
    ///
    /// Games found by the scan arrive through [`Controller::pump_discoveries`]
    /// or [`Controller::wait_for_scan`].
    pub fn begin(&mut self, builtins: Vec<Arc<dyn GamePlugin>>) -> PluginResult<()> {
        for game in builtins {
            let name = game.name().to_string();
            if self.registry.register(game) {
                tracing::debug!(plugin = %name, "Built-in game registered");
            }
        }
        self.merge_registered();

        let loader = Arc::clone(&self.loader);
        let loaded = Arc::clone(&self.loaded);
        let dir = self.settings.plugins_dir.clone();
        let discoveries = self.discovery_tx.clone();
        let scan = std::thread::Builder::new().name("plugin-scan".to_string()).spawn(move || {
            let reports = match loader.scan_directory(&dir, &loaded) {
                Ok(reports) => reports,
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "Plugin scan failed");
                    return Vec::new();
                }
            };
            for report in reports.iter().filter(|report| !report.is_empty()) {
                let discovery = Discovery {
                    artifact: report.artifact.clone(),
                    path: dir.join(&report.artifact),
                    games: report.registered.clone(),
                };
                if discoveries.send(discovery).is_err() {
                    tracing::debug!("Discovery receiver is gone");
                }
            }
            reports
        })?;
        self.scan = Some(scan);

        if self.settings.watch {
            self.start_watcher();
        }

        Ok(())
    }

    /// Wait for the startup scan and merge what it found.
    ///
    /// Returns the per-artifact reports, or nothing if no scan is pending.
    pub fn wait_for_scan(&mut self) -> Vec<LoadReport> {
        let Some(scan) = self.scan.take() else {
            return Vec::new();
        };
        let reports = scan.join().unwrap_or_else(|_| {
            tracing::error!("Plugin scan thread panicked");
            Vec::new()
        });

        // Everything registered so far is merged below, so queued discoveries are stale.
        self.discovery_rx.try_iter().for_each(drop);
        self.merge_registered();
        if !self.games.iter().any(|game| game.origin().is_external()) {
            tracing::info!("No external games found");
        }
        self.presenter.plugin_list_changed(&self.descriptors());

        reports
    }

    /// Whether the startup scan is still running.
    pub fn scan_in_progress(&self) -> bool {
        self.scan.as_ref().is_some_and(|scan| !scan.is_finished())
    }

    #[cfg(feature = "hot-reload")]
    fn start_watcher(&mut self) {
        match DirectoryWatcher::spawn(
            Arc::clone(&self.loader),
            Arc::clone(&self.loaded),
            self.settings.watcher_config(),
            self.discovery_tx.clone(),
        ) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => tracing::warn!(error = %e, "Hot-loading disabled"),
        }
    }

    #[cfg(not(feature = "hot-reload"))]
    fn start_watcher(&mut self) {
        tracing::info!("Built without hot-reload support");
    }

    /// Add registered games missing from the exposed list. Returns their names.
    fn merge_registered(&mut self) -> Vec<String> {
        let mut added = Vec::new();
        for game in self.registry.list() {
            if self.games.iter().any(|known| known.name() == game.name()) {
                continue;
            }
            tracing::info!(plugin = %game.name(), origin = %game.origin(), "Game available");
            added.push(game.name().to_string());
            self.games.push(game);
        }
        added
    }

    /// Merge games found by the watcher since the last call.
    ///
    /// Never blocks. Returns the names added to the exposed list.
    pub fn pump_discoveries(&mut self) -> Vec<String> {
        let mut discovered = false;
        while let Ok(discovery) = self.discovery_rx.try_recv() {
            tracing::info!(artifact = %discovery.artifact, games = ?discovery.games, "New plugin artifact");
            discovered = true;
        }
        if !discovered {
            return Vec::new();
        }

        let added = self.merge_registered();
        if !added.is_empty() {
            self.presenter.plugin_list_changed(&self.descriptors());
        }
        added
    }

    /// Copy an artifact into the plugin directory and load it right away.
    ///
    /// Returns the names of the games it added.
    pub fn import_artifact(&mut self, source: &Path) -> PluginResult<Vec<String>> {
        if !source.is_file() {
            return Err(PluginError::NotFound(source.to_path_buf()));
        }
        if !is_artifact(source, &self.settings.extension) {
            return Err(PluginError::UnsupportedArtifact(source.to_path_buf()));
        }
        let id = artifact_id(source).ok_or_else(|| PluginError::NotFound(source.to_path_buf()))?;
        if !self.loaded.claim(&id) {
            return Err(PluginError::AlreadyLoaded(id));
        }

        let report = self.copy_and_load(source, &id).inspect_err(|_| self.loaded.release(&id))?;

        let added = self.merge_registered();
        tracing::info!(artifact = %id, added = added.len(), duplicates = report.duplicates.len(), "Artifact imported");
        if !added.is_empty() {
            self.presenter.plugin_list_changed(&self.descriptors());
        }
        Ok(added)
    }

    fn copy_and_load(&self, source: &Path, id: &str) -> PluginResult<LoadReport> {
        std::fs::create_dir_all(&self.settings.plugins_dir)?;
        let target = self.settings.plugins_dir.join(id);

        let same_file = match (source.canonicalize(), target.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            std::fs::copy(source, &target)?;
        }

        self.loader.load_artifact(&target)
    }

    /// Make `game` the active game and start a fresh round.
    ///
    /// A running previous game is stopped first, which records its score.
    pub fn select_game(&mut self, game: Arc<dyn GamePlugin>) {
        if let Some(current) = self.active.take() {
            if current.is_running() {
                current.stop();
            }
            current.unsubscribe(&self.relay);
        }

        game.subscribe(Arc::clone(&self.relay));
        self.active = Some(Arc::clone(&game));
        game.restart();

        let descriptor = game.descriptor();
        tracing::info!(plugin = %descriptor.name, "Game selected");
        self.presenter.display_surface(&descriptor, &game.surface());
        self.presenter.scores_changed(&descriptor.name, &self.store.top_scores(&descriptor.name));
    }

    /// Select a game by name.
    pub fn select_by_name(&mut self, name: &str) -> PluginResult<Arc<dyn GamePlugin>> {
        let game = self.find(name).ok_or_else(|| PluginError::UnknownGame(name.to_string()))?;
        self.select_game(Arc::clone(&game));
        Ok(game)
    }

    /// Wait for a pending scan, stop the active game if it is running and
    /// stop the watcher.
    pub fn shutdown(&mut self) {
        if let Some(scan) = self.scan.take() {
            if scan.join().is_err() {
                tracing::error!("Plugin scan thread panicked");
            }
        }

        if let Some(active) = &self.active {
            if active.is_running() {
                active.stop();
            }
        }

        #[cfg(feature = "hot-reload")]
        if let Some(mut watcher) = self.watcher.take() {
            watcher.stop();
        }
    }

    /// Exposed games: built-ins first, then external games in discovery order.
    pub fn games(&self) -> &[Arc<dyn GamePlugin>] {
        &self.games
    }

    /// Descriptors of the exposed games.
    pub fn descriptors(&self) -> Vec<PluginDescriptor> {
        self.games.iter().map(|game| game.descriptor()).collect()
    }

    /// Find an exposed game by name.
    pub fn find(&self, name: &str) -> Option<Arc<dyn GamePlugin>> {
        self.games.iter().find(|game| game.name() == name).cloned()
    }

    /// The active game, if any.
    pub fn active(&self) -> Option<&Arc<dyn GamePlugin>> {
        self.active.as_ref()
    }

    /// Best scores of `name`, best first.
    pub fn top_scores(&self, name: &str) -> Vec<ScoreRecord> {
        self.store.top_scores(name)
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Plugin directory in use.
    pub fn plugins_dir(&self) -> &Path {
        &self.settings.plugins_dir
    }

    /// Whether hot-loading is active.
    pub fn watcher_active(&self) -> bool {
        #[cfg(feature = "hot-reload")]
        {
            self.watcher.as_ref().is_some_and(DirectoryWatcher::is_running)
        }
        #[cfg(not(feature = "hot-reload"))]
        {
            false
        }
    }
}
