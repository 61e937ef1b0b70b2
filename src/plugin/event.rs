//! Lifecycle events published by running games.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Side-channel key holding the human-readable error message.
pub const ERROR_MESSAGE_KEY: &str = "errorMessage";

/// Side-channel key holding the underlying error detail.
pub const EXCEPTION_KEY: &str = "exception";

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// The game started a new round.
    Started,
    /// The game ended, either by completion or by a forced stop.
    Finished,
    /// The live score changed.
    ScoreUpdated,
    /// The game was paused.
    Paused,
    /// The game was resumed.
    Resumed,
    /// The game reported a runtime error.
    Error,
}

impl EventKind {
    /// Get the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Finished => "FINISHED",
            Self::ScoreUpdated => "SCORE_UPDATED",
            Self::Paused => "PAUSED",
            Self::Resumed => "RESUMED",
            Self::Error => "ERROR",
        }
    }

    /// Whether the event's score is meaningful.
    pub fn carries_score(&self) -> bool {
        matches!(self, Self::Finished | Self::ScoreUpdated)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a state or score change in a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    plugin: String,
    kind: EventKind,
    score: i64,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    data: BTreeMap<String, Value>,
}

impl GameEvent {
    /// Create an event stamped with the current time.
    pub fn new(plugin: impl Into<String>, kind: EventKind, score: i64) -> Self {
        Self { plugin: plugin.into(), kind, score, timestamp: Utc::now(), data: BTreeMap::new() }
    }

    /// Create an error event carrying `message` and an optional detail.
    pub fn error(
        plugin: impl Into<String>,
        score: i64,
        message: &str,
        detail: Option<&str>,
    ) -> Self {
        let event = Self::new(plugin, EventKind::Error, score)
            .with_data(ERROR_MESSAGE_KEY, Value::from(message));
        match detail {
            Some(detail) => event.with_data(EXCEPTION_KEY, Value::from(detail)),
            None => event,
        }
    }

    /// Attach a side-channel value.
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Name of the plugin that published the event.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Event kind.
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Score at the time of the event.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// When the event was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Look up a side-channel value.
    pub fn data(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// All side-channel values.
    pub fn data_map(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// Error message carried by an ERROR event.
    pub fn error_message(&self) -> Option<&str> {
        self.data(ERROR_MESSAGE_KEY).and_then(Value::as_str)
    }

    /// Error detail carried by an ERROR event.
    pub fn error_detail(&self) -> Option<&str> {
        self.data(EXCEPTION_KEY).and_then(Value::as_str)
    }
}

impl std::fmt::Display for GameEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GameEvent[{} - {} - Score: {}]", self.plugin, self.kind, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_names() {
        assert_eq!(EventKind::ScoreUpdated.as_str(), "SCORE_UPDATED");
        assert_eq!(EventKind::Finished.to_string(), "FINISHED");
        assert!(EventKind::Finished.carries_score());
        assert!(!EventKind::Paused.carries_score());
    }

    #[test]
    fn test_error_event_payload() {
        let event = GameEvent::error("Snake", 7, "boom", Some("trap at 0x12"));

        assert_eq!(event.kind(), EventKind::Error);
        assert_eq!(event.score(), 7);
        assert_eq!(event.error_message(), Some("boom"));
        assert_eq!(event.error_detail(), Some("trap at 0x12"));
        assert_eq!(event.data_map().len(), 2);
    }

    #[test]
    fn test_error_event_without_detail() {
        let event = GameEvent::error("Snake", 0, "boom", None);
        assert_eq!(event.error_detail(), None);
        assert!(event.data(EXCEPTION_KEY).is_none());
    }

    #[test]
    fn test_event_serialization() {
        let event = GameEvent::new("Tic-Tac-Toe", EventKind::Finished, 110);
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""kind":"FINISHED""#));
        assert!(!json.contains("data"));
        assert_eq!(event.to_string(), "GameEvent[Tic-Tac-Toe - FINISHED - Score: 110]");
    }
}
