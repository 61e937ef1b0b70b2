//! The game contract and its shared lifecycle bookkeeping.
//!
//! Every game, built-in or loaded from an artifact, implements [`GamePlugin`].
//! Games do not inherit behaviour: each one owns a [`GameCore`] (listeners,
//! running flag, paused sub-state, score) and the lifecycle methods of the
//! trait drive that core by default.
//!
//! Lifecycle rules:
//! - `start` is a no-op while running; otherwise it resets the game, marks it
//!   running and publishes STARTED.
//! - `stop` always marks the game stopped and publishes FINISHED.
//! - `restart` always resets, marks running and publishes exactly one STARTED.
//! - `pause` publishes PAUSED only while running and not already paused. The
//!   game keeps reporting `is_running() == true` while paused.
//! - `resume` publishes RESUMED only while paused.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    EventBus, EventKind, GameEvent, GameListener, PluginDescriptor, PluginError, PluginOrigin,
    PluginResult,
};

/// Presentation handle of a game.
///
/// Hosts render it and feed user input back through it.
pub trait GameSurface: Send + Sync {
    /// Render the current state as text.
    fn render(&self) -> String;

    /// Apply one line of user input.
    fn handle_input(&self, input: &str) -> PluginResult<()>;
}

/// Capability interface every game implements.
pub trait GamePlugin: Send + Sync {
    /// Unique game name, used as the registry key.
    fn name(&self) -> &str;

    /// Game version.
    fn version(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Presentation handle, built on first access.
    fn surface(&self) -> Arc<dyn GameSurface>;

    /// Shared lifecycle state.
    fn core(&self) -> &GameCore;

    /// Reset the game's own state (board, word, counters).
    fn reset_state(&self);

    /// Where the game came from.
    fn origin(&self) -> PluginOrigin {
        PluginOrigin::BuiltIn
    }

    /// Identity view of the game.
    fn descriptor(&self) -> PluginDescriptor {
        PluginDescriptor {
            name: self.name().to_string(),
            version: self.version().to_string(),
            description: self.description().to_string(),
            origin: self.origin(),
        }
    }

    /// Start a round unless one is already running.
    fn start(&self) {
        if !self.core().try_begin() {
            return;
        }
        self.reset_state();
        self.core().publish_state(EventKind::Started);
    }

    /// Pause the running round.
    fn pause(&self) {
        if self.core().try_pause() {
            self.core().publish_state(EventKind::Paused);
        }
    }

    /// Resume a paused round.
    fn resume(&self) {
        if self.core().try_resume() {
            self.core().publish_state(EventKind::Resumed);
        }
    }

    /// Reset and start a new round regardless of the current state.
    fn restart(&self) {
        self.core().force_begin();
        self.reset_state();
        self.core().publish_state(EventKind::Started);
    }

    /// Stop the round and publish FINISHED with the current score.
    fn stop(&self) {
        self.core().halt();
        self.core().publish_state(EventKind::Finished);
    }

    /// Whether a round is in progress (paused rounds included).
    fn is_running(&self) -> bool {
        self.core().is_running()
    }

    /// Whether the running round is paused.
    fn is_paused(&self) -> bool {
        self.core().is_paused()
    }

    /// Current score.
    fn current_score(&self) -> i64 {
        self.core().score()
    }

    /// Subscribe a listener. Subscribing twice is a no-op.
    fn subscribe(&self, listener: Arc<dyn GameListener>) -> bool {
        self.core().bus().subscribe(listener)
    }

    /// Unsubscribe a listener.
    fn unsubscribe(&self, listener: &Arc<dyn GameListener>) -> bool {
        self.core().bus().unsubscribe(listener)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct CoreState {
    running: bool,
    paused: bool,
    score: i64,
}

/// Lifecycle bookkeeping composed into every game.
///
/// State changes happen under a short lock; events are always published
/// after the lock is released so listeners may call back into the game.
#[derive(Debug)]
pub struct GameCore {
    name: String,
    bus: EventBus,
    state: Mutex<CoreState>,
}

impl GameCore {
    /// Create the core for the game called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), bus: EventBus::new(), state: Mutex::new(CoreState::default()) }
    }

    /// Name used on published events.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The game's event bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Whether a round is in progress.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Whether the round is paused.
    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Whether input should be accepted.
    pub fn is_active(&self) -> bool {
        let state = self.state.lock();
        state.running && !state.paused
    }

    /// Fail unless the round accepts input.
    pub fn ensure_active(&self) -> PluginResult<()> {
        let state = *self.state.lock();
        if !state.running {
            return Err(PluginError::NotRunning(self.name.clone()));
        }
        if state.paused {
            return Err(PluginError::Paused(self.name.clone()));
        }
        Ok(())
    }

    /// Current score.
    pub fn score(&self) -> i64 {
        self.state.lock().score
    }

    /// Mark running if not already. Returns `false` when already running.
    pub fn try_begin(&self) -> bool {
        let mut state = self.state.lock();
        if state.running {
            return false;
        }
        *state = CoreState { running: true, paused: false, score: 0 };
        true
    }

    /// Mark running unconditionally, clearing pause and score.
    pub fn force_begin(&self) {
        *self.state.lock() = CoreState { running: true, paused: false, score: 0 };
    }

    /// Enter the paused sub-state. Returns `false` when not running or already paused.
    pub fn try_pause(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running || state.paused {
            return false;
        }
        state.paused = true;
        true
    }

    /// Leave the paused sub-state. Returns `false` when not paused.
    pub fn try_resume(&self) -> bool {
        let mut state = self.state.lock();
        if !state.running || !state.paused {
            return false;
        }
        state.paused = false;
        true
    }

    /// Mark stopped, keeping the score.
    pub fn halt(&self) {
        let mut state = self.state.lock();
        state.running = false;
        state.paused = false;
    }

    /// Publish a state event carrying the current score.
    pub fn publish_state(&self, kind: EventKind) {
        let score = self.score();
        self.bus.publish(&GameEvent::new(self.name.as_str(), kind, score));
    }

    /// Store a new live score and publish SCORE_UPDATED.
    pub fn update_score(&self, score: i64) {
        self.state.lock().score = score;
        self.bus.publish(&GameEvent::new(self.name.as_str(), EventKind::ScoreUpdated, score));
    }

    /// End the round naturally with `score` and publish FINISHED.
    pub fn finish(&self, score: i64) {
        {
            let mut state = self.state.lock();
            state.running = false;
            state.paused = false;
            state.score = score;
        }
        self.bus.publish(&GameEvent::new(self.name.as_str(), EventKind::Finished, score));
    }

    /// Publish an ERROR event. The round state is left untouched.
    pub fn fail(&self, message: &str, detail: Option<&str>) {
        tracing::warn!(plugin = %self.name, message, "Game reported an error");
        let score = self.score();
        self.bus.publish(&GameEvent::error(self.name.as_str(), score, message, detail));
    }
}
