//! Hangman: guess the word one letter at a time.

use std::collections::BTreeSet;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::plugin::{GameCore, GamePlugin, GameSurface, PluginError, PluginResult};

const NAME: &str = "Hangman";

const MAX_ATTEMPTS: u32 = 6;

const WORDS: [&str; 12] = [
    "plume",
    "programming",
    "rust",
    "computer",
    "algorithm",
    "development",
    "software",
    "hardware",
    "application",
    "technology",
    "system",
    "project",
];

enum Outcome {
    Repeat,
    Hit(i64),
    Miss,
    Won(i64),
    Lost(i64),
}

#[derive(Debug, Default)]
struct Round {
    rounds: usize,
    word: Vec<char>,
    revealed: Vec<bool>,
    used: BTreeSet<char>,
    attempts: u32,
}

impl Round {
    /// Pick the next word of the list.
    fn reset(&mut self) {
        let word = WORDS[self.rounds % WORDS.len()];
        self.rounds += 1;
        self.word = word.chars().collect();
        self.revealed = vec![false; self.word.len()];
        self.used.clear();
        self.attempts = MAX_ATTEMPTS;
    }

    fn revealed_count(&self) -> usize {
        self.revealed.iter().filter(|&&r| r).count()
    }

    fn guess(&mut self, letter: char) -> Outcome {
        if !self.used.insert(letter) {
            return Outcome::Repeat;
        }

        let mut hit = false;
        for (slot, &c) in self.revealed.iter_mut().zip(&self.word) {
            if c == letter {
                *slot = true;
                hit = true;
            }
        }

        if hit {
            if self.revealed.iter().all(|&r| r) {
                let score = i64::from(self.attempts) * 50 + self.word.len() as i64 * 20;
                return Outcome::Won(score);
            }
            return Outcome::Hit(self.revealed_count() as i64 * 10);
        }

        self.attempts = self.attempts.saturating_sub(1);
        if self.attempts == 0 {
            return Outcome::Lost(self.used.len() as i64 * 10);
        }
        Outcome::Miss
    }

    fn render(&self) -> String {
        let pattern: Vec<String> = self
            .word
            .iter()
            .zip(&self.revealed)
            .map(|(c, &shown)| if shown { c.to_string() } else { "_".to_string() })
            .collect();
        let used: String = self.used.iter().collect();

        format!(
            "{}\nAttempts left: {}\nUsed: {}",
            pattern.join(" "),
            self.attempts,
            if used.is_empty() { "-".to_string() } else { used }
        )
    }
}

fn parse_letter(input: &str) -> PluginResult<char> {
    let trimmed = input.trim();
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Ok(c.to_ascii_lowercase()),
        _ => Err(PluginError::InvalidInput(format!("expected a single letter, got '{trimmed}'"))),
    }
}

#[derive(Debug)]
struct Inner {
    core: GameCore,
    round: Mutex<Round>,
}

struct Surface {
    inner: Arc<Inner>,
}

impl GameSurface for Surface {
    fn render(&self) -> String {
        self.inner.round.lock().render()
    }

    fn handle_input(&self, input: &str) -> PluginResult<()> {
        self.inner.core.ensure_active()?;
        let letter = parse_letter(input)?;

        let outcome = self.inner.round.lock().guess(letter);
        match outcome {
            Outcome::Repeat | Outcome::Miss => {}
            Outcome::Hit(score) => self.inner.core.update_score(score),
            Outcome::Won(score) | Outcome::Lost(score) => self.inner.core.finish(score),
        }
        Ok(())
    }
}

/// Word guessing with six attempts.
pub struct Hangman {
    inner: Arc<Inner>,
    surface: OnceCell<Arc<dyn GameSurface>>,
}

impl Default for Hangman {
    fn default() -> Self {
        Self::new()
    }
}

impl Hangman {
    /// Create the game.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner { core: GameCore::new(NAME), round: Mutex::new(Round::default()) }),
            surface: OnceCell::new(),
        }
    }
}

impl GamePlugin for Hangman {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        "1.0"
    }

    fn description(&self) -> &str {
        "Guess the word letter by letter before you run out of attempts!"
    }

    fn surface(&self) -> Arc<dyn GameSurface> {
        let surface = self.surface.get_or_init(|| {
            let surface: Arc<dyn GameSurface> = Arc::new(Surface { inner: Arc::clone(&self.inner) });
            surface
        });
        Arc::clone(surface)
    }

    fn core(&self) -> &GameCore {
        &self.inner.core
    }

    fn reset_state(&self) {
        self.inner.round.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{EventKind, GameEvent, GameListener};

    #[derive(Default)]
    struct Events(Mutex<Vec<(EventKind, i64)>>);

    impl GameListener for Events {
        fn on_game_finished(&self, event: &GameEvent) {
            self.0.lock().push((event.kind(), event.score()));
        }

        fn on_score_updated(&self, event: &GameEvent) {
            self.0.lock().push((event.kind(), event.score()));
        }
    }

    fn started() -> (Hangman, Arc<Events>) {
        let game = Hangman::new();
        let events = Arc::new(Events::default());
        game.subscribe(events.clone());
        game.start();
        (game, events)
    }

    fn guess_all(game: &Hangman, letters: &str) {
        let surface = game.surface();
        for letter in letters.chars() {
            surface.handle_input(&letter.to_string()).unwrap();
        }
    }

    #[test]
    fn test_parse_letter() {
        assert_eq!(parse_letter(" E ").unwrap(), 'e');
        assert!(parse_letter("ab").is_err());
        assert!(parse_letter("1").is_err());
        assert!(parse_letter("").is_err());
    }

    #[test]
    fn test_win_scores_attempts_and_length() {
        let (game, events) = started();

        // "plume": one miss, then every letter.
        guess_all(&game, "zplum");
        game.surface().handle_input("e").unwrap();

        let events = events.0.lock();
        assert_eq!(
            *events,
            vec![
                (EventKind::ScoreUpdated, 10),
                (EventKind::ScoreUpdated, 20),
                (EventKind::ScoreUpdated, 30),
                (EventKind::ScoreUpdated, 40),
                (EventKind::Finished, 5 * 50 + 5 * 20),
            ]
        );
        assert!(!game.is_running());
    }

    #[test]
    fn test_loss_scores_letters_used() {
        let (game, events) = started();

        guess_all(&game, "pqrstvw");

        assert_eq!(events.0.lock().last(), Some(&(EventKind::Finished, 70)));
        assert!(!game.is_running());
    }

    #[test]
    fn test_repeated_letter_is_ignored() {
        let (game, events) = started();

        guess_all(&game, "pp");
        guess_all(&game, "zz");

        assert_eq!(events.0.lock().len(), 1);
        assert!(game.surface().render().contains("Attempts left: 5"));
    }

    #[test]
    fn test_rounds_cycle_words() {
        let (game, _events) = started();
        assert!(game.surface().render().starts_with("_ _ _ _ _\n"));

        game.restart();
        assert!(game.surface().render().starts_with("_ _ _ _ _ _ _ _ _ _ _\n"));
    }

    #[test]
    fn test_paused_game_rejects_guesses() {
        let (game, _events) = started();
        game.pause();

        assert!(matches!(game.surface().handle_input("a"), Err(PluginError::Paused(_))));
    }
}
