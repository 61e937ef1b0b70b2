//! Per-game observer registry.
//!
//! Every game owns one [`EventBus`]. Publishing is synchronous: listeners run
//! on the caller's thread, in subscription order, before `publish` returns.
//! A listener that panics is logged and skipped; the remaining listeners
//! still receive the event.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{EventKind, GameEvent};

/// Receiver of lifecycle events.
///
/// All handlers default to no-ops so listeners only implement what they need.
pub trait GameListener: Send + Sync {
    /// A round ended (FINISHED).
    fn on_game_finished(&self, _event: &GameEvent) {}

    /// The live score changed (SCORE_UPDATED).
    fn on_score_updated(&self, _event: &GameEvent) {}

    /// Informational state change (STARTED, PAUSED, RESUMED).
    fn on_state_changed(&self, _event: &GameEvent) {}

    /// The game reported a runtime error (ERROR).
    fn on_game_error(&self, _event: &GameEvent) {}
}

/// Fan-out of events to subscribed listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Arc<dyn GameListener>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("listeners", &self.listeners.lock().len()).finish()
    }
}

fn same_listener(a: &Arc<dyn GameListener>, b: &Arc<dyn GameListener>) -> bool {
    // Compare data pointers only; vtable addresses are not unique.
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        return (*msg).to_string();
    }
    if let Some(msg) = payload.downcast_ref::<String>() {
        return msg.clone();
    }
    "non-string panic payload".to_string()
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener. Returns `false` if it was already subscribed.
    pub fn subscribe(&self, listener: Arc<dyn GameListener>) -> bool {
        let mut listeners = self.listeners.lock();
        if listeners.iter().any(|existing| same_listener(existing, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, listener: &Arc<dyn GameListener>) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|existing| !same_listener(existing, listener));
        listeners.len() != before
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver `event` to every listener.
    ///
    /// Returns the number of listeners that handled the event without
    /// panicking.
    pub fn publish(&self, event: &GameEvent) -> usize {
        // Snapshot so listeners may (un)subscribe from inside a callback.
        let listeners = self.listeners.lock().clone();
        let mut delivered = 0;

        for listener in &listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(listener.as_ref(), event)));
            match outcome {
                Ok(()) => delivered += 1,
                Err(payload) => {
                    tracing::error!(
                        plugin = event.plugin(),
                        kind = %event.kind(),
                        panic = %panic_message(payload.as_ref()),
                        "Game listener panicked"
                    );
                }
            }
        }

        delivered
    }
}

fn dispatch(listener: &dyn GameListener, event: &GameEvent) {
    match event.kind() {
        EventKind::Finished => listener.on_game_finished(event),
        EventKind::ScoreUpdated => listener.on_score_updated(event),
        EventKind::Error => listener.on_game_error(event),
        EventKind::Started | EventKind::Paused | EventKind::Resumed => {
            listener.on_state_changed(event);
        }
    }
}
