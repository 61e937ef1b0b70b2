//! Score persistence.
//!
//! Keeps the best few scores of each game in a JSON file. The store is
//! written on every record, so a crash loses at most the round in progress.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default number of records kept per game.
pub const DEFAULT_MAX_RECORDS: usize = 3;

/// Errors raised by a score store.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Reading or writing the score file failed.
    #[error("Score file error: {0}")]
    Io(#[from] std::io::Error),

    /// The score file could not be encoded.
    #[error("Score encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One finished round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Game name
    pub game: String,
    /// Final score
    pub score: i64,
    /// When the round finished
    pub timestamp: DateTime<Utc>,
}

impl ScoreRecord {
    /// Create a record stamped now.
    pub fn new(game: impl Into<String>, score: i64) -> Self {
        Self { game: game.into(), score, timestamp: Utc::now() }
    }

    /// Local date and time in `dd/mm/yyyy hh:mm` form.
    pub fn formatted_time(&self) -> String {
        self.timestamp.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
    }
}

/// Write/read contract between the controller and persistence.
pub trait ScoreStore: Send + Sync {
    /// Record a final score for `game`.
    fn record(&self, game: &str, score: i64) -> Result<(), ScoreError>;

    /// Best scores of `game`, best first.
    fn top_scores(&self, game: &str) -> Vec<ScoreRecord>;
}

/// Display lines for a list of records.
pub fn format_scores(records: &[ScoreRecord]) -> Vec<String> {
    if records.is_empty() {
        return vec!["No records yet".to_string()];
    }

    records
        .iter()
        .enumerate()
        .map(|(i, record)| format!("{}. {} pts - {}", i + 1, record.score, record.formatted_time()))
        .collect()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ScoreFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    games: BTreeMap<String, Vec<ScoreRecord>>,
}

/// Score store backed by a JSON file.
#[derive(Debug)]
pub struct JsonScoreStore {
    path: PathBuf,
    max_records: usize,
    data: Mutex<ScoreFile>,
}

impl JsonScoreStore {
    /// Open the store at `path`, keeping `max_records` per game.
    ///
    /// A missing file gives an empty store. A corrupt file is logged and
    /// replaced on the next write.
    pub fn open(path: impl Into<PathBuf>, max_records: usize) -> Self {
        let path = path.into();
        let data = match Self::load(&path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable score file");
                ScoreFile::default()
            }
        };

        Self { path, max_records: max_records.max(1), data: Mutex::new(data) }
    }

    fn load(path: &Path) -> Result<ScoreFile, ScoreError> {
        if !path.exists() {
            return Ok(ScoreFile::default());
        }

        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, data: &ScoreFile) -> Result<(), ScoreError> {
        let content = serde_json::to_string_pretty(data)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records kept per game.
    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Display lines for the best scores of `game`.
    pub fn format_top_scores(&self, game: &str) -> Vec<String> {
        format_scores(&self.top_scores(game))
    }

    /// Insert `record` keeping the list sorted and bounded.
    ///
    /// Equal scores keep the older record first.
    fn insert(&self, records: &mut Vec<ScoreRecord>, record: ScoreRecord) {
        let index = records.partition_point(|existing| existing.score >= record.score);
        records.insert(index, record);
        records.truncate(self.max_records);
    }
}

impl ScoreStore for JsonScoreStore {
    fn record(&self, game: &str, score: i64) -> Result<(), ScoreError> {
        let mut data = self.data.lock();
        let mut records = data.games.remove(game).unwrap_or_default();
        self.insert(&mut records, ScoreRecord::new(game, score));
        data.games.insert(game.to_string(), records);

        self.save(&data)?;
        tracing::debug!(game, score, "Score recorded");
        Ok(())
    }

    fn top_scores(&self, game: &str) -> Vec<ScoreRecord> {
        self.data.lock().games.get(game).cloned().unwrap_or_default()
    }
}
