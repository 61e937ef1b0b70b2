//! Hot-loading of artifacts dropped into the plugin directory.
//!
//! A background thread receives filesystem events for the directory. New
//! artifacts are loaded after a settling delay, so files still being written
//! are not read half-way. Events for an artifact that arrive during its delay
//! are absorbed. Each successful load that registers at least one game is
//! reported as a [`Discovery`] on a channel.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use super::{ARTIFACT_EXTENSION, DEFAULT_PLUGINS_DIR, DEFAULT_SETTLE_DELAY};

/// An artifact loaded off the host thread that added games.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery {
    /// Artifact identifier.
    pub artifact: String,
    /// Full path of the artifact.
    pub path: PathBuf,
    /// Names of the games it registered.
    pub games: Vec<String>,
}

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory to watch.
    pub dir: PathBuf,
    /// Artifact suffix.
    pub extension: String,
    /// Wait between seeing an artifact and loading it.
    pub settle_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_PLUGINS_DIR),
            extension: ARTIFACT_EXTENSION.to_string(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

#[cfg(feature = "hot-reload")]
pub use self::fs::DirectoryWatcher;

#[cfg(feature = "hot-reload")]
mod fs {
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
    use std::sync::Arc;
    use std::thread::JoinHandle;
    use std::time::Instant;

    use notify::event::EventKind as FsEventKind;
    use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

    use super::{Discovery, WatcherConfig};
    use crate::plugin::{artifact_id, is_artifact, ArtifactLoader, LoadedArtifacts, PluginResult};

    enum WatchSignal {
        Fs(notify::Result<Event>),
        Shutdown,
    }

    /// Handle to the background watcher thread.
    ///
    /// Dropping the handle stops the thread.
    pub struct DirectoryWatcher {
        signals: Sender<WatchSignal>,
        handle: Option<JoinHandle<()>>,
        _watcher: RecommendedWatcher,
    }

    impl std::fmt::Debug for DirectoryWatcher {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("DirectoryWatcher").field("running", &self.is_running()).finish()
        }
    }

    impl DirectoryWatcher {
        /// Start watching `config.dir`, creating it if needed.
        ///
        /// Fails if the platform watcher cannot be set up; callers are
        /// expected to carry on without hot-loading in that case.
        pub fn spawn(
            loader: Arc<ArtifactLoader>,
            loaded: Arc<LoadedArtifacts>,
            config: WatcherConfig,
            discoveries: Sender<Discovery>,
        ) -> PluginResult<Self> {
            std::fs::create_dir_all(&config.dir)?;

            let (signals, receiver) = mpsc::channel();
            let fs_signals = signals.clone();
            let mut watcher = notify::recommended_watcher(move |res| {
                let _ = fs_signals.send(WatchSignal::Fs(res));
            })?;
            watcher.watch(&config.dir, RecursiveMode::NonRecursive)?;

            tracing::info!(
                dir = %config.dir.display(),
                delay_ms = config.settle_delay.as_millis() as u64,
                "Watching plugin directory"
            );

            let worker = Worker { loader, loaded, config, discoveries, receiver };
            let handle = std::thread::Builder::new()
                .name("plugin-watcher".to_string())
                .spawn(move || worker.run())?;

            Ok(Self { signals, handle: Some(handle), _watcher: watcher })
        }

        /// Whether the background thread is still alive.
        pub fn is_running(&self) -> bool {
            self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
        }

        /// Stop the thread and wait for it. A load in progress completes first.
        pub fn stop(&mut self) {
            let Some(handle) = self.handle.take() else {
                return;
            };
            let _ = self.signals.send(WatchSignal::Shutdown);
            if handle.join().is_err() {
                tracing::error!("Plugin watcher thread panicked");
            }
            tracing::debug!("Plugin watcher stopped");
        }
    }

    impl Drop for DirectoryWatcher {
        fn drop(&mut self) {
            self.stop();
        }
    }

    struct Worker {
        loader: Arc<ArtifactLoader>,
        loaded: Arc<LoadedArtifacts>,
        config: WatcherConfig,
        discoveries: Sender<Discovery>,
        receiver: Receiver<WatchSignal>,
    }

    impl Worker {
        fn run(self) {
            let mut pending: VecDeque<PathBuf> = VecDeque::new();

            while let Ok(signal) = self.receiver.recv() {
                match signal {
                    WatchSignal::Shutdown => return,
                    WatchSignal::Fs(Ok(event)) => self.collect(event, None, &mut pending),
                    WatchSignal::Fs(Err(e)) => tracing::warn!(error = %e, "Watch error"),
                }

                while let Some(path) = pending.pop_front() {
                    if !self.settle(&path, &mut pending) {
                        return;
                    }
                    self.load(&path);
                }
            }
        }

        /// Queue artifacts named by a create or modify event.
        fn collect(&self, event: Event, current: Option<&Path>, pending: &mut VecDeque<PathBuf>) {
            if !matches!(event.kind, FsEventKind::Create(_) | FsEventKind::Modify(_)) {
                return;
            }

            for path in event.paths {
                if !is_artifact(&path, &self.config.extension) {
                    continue;
                }
                if current == Some(path.as_path()) || pending.contains(&path) {
                    continue;
                }
                if artifact_id(&path).is_some_and(|id| self.loaded.contains(&id)) {
                    continue;
                }
                tracing::debug!(path = %path.display(), "Artifact event");
                pending.push_back(path);
            }
        }

        /// Wait out the settling delay. Returns `false` on shutdown.
        fn settle(&self, path: &Path, pending: &mut VecDeque<PathBuf>) -> bool {
            let deadline = Instant::now() + self.config.settle_delay;

            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return true;
                }

                match self.receiver.recv_timeout(remaining) {
                    Ok(WatchSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => return false,
                    Ok(WatchSignal::Fs(Ok(event))) => self.collect(event, Some(path), pending),
                    Ok(WatchSignal::Fs(Err(e))) => tracing::warn!(error = %e, "Watch error"),
                    Err(RecvTimeoutError::Timeout) => return true,
                }
            }
        }

        fn load(&self, path: &Path) {
            let Some(id) = artifact_id(path) else {
                return;
            };
            if !path.is_file() {
                tracing::debug!(artifact = %id, "Artifact vanished before loading");
                return;
            }
            if !self.loaded.claim(&id) {
                return;
            }

            match self.loader.load_artifact(path) {
                Ok(report) if report.registered.is_empty() => {
                    tracing::info!(artifact = %id, "Artifact added no new games");
                }
                Ok(report) => {
                    let discovery =
                        Discovery { artifact: id, path: path.to_path_buf(), games: report.registered };
                    if self.discoveries.send(discovery).is_err() {
                        tracing::debug!("Discovery receiver is gone");
                    }
                }
                Err(e) => {
                    self.loaded.release(&id);
                    tracing::error!(artifact = %id, error = %e, "Failed to hot-load artifact");
                }
            }
        }
    }

}
