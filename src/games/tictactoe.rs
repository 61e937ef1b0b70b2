//! Tic-Tac-Toe for two players sharing the console.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::plugin::{GameCore, GamePlugin, GameSurface, PluginError, PluginResult};

const NAME: &str = "Tic-Tac-Toe";

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    X,
    O,
}

impl Mark {
    fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}

enum Outcome {
    Next,
    Won(i64),
    Tie(i64),
}

#[derive(Debug)]
struct Board {
    cells: [Option<Mark>; 9],
    current: Mark,
    turns: u8,
    wins_x: i64,
    wins_o: i64,
    ties: i64,
    status: String,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            cells: [None; 9],
            current: Mark::X,
            turns: 0,
            wins_x: 0,
            wins_o: 0,
            ties: 0,
            status: "Press start to play".to_string(),
        }
    }
}

impl Board {
    /// Clear the board for a new round. Win and tie tallies carry over.
    fn reset(&mut self) {
        self.cells = [None; 9];
        self.current = Mark::X;
        self.turns = 0;
        self.status = format!("{} to move", self.current);
    }

    fn winner(&self) -> Option<Mark> {
        LINES.iter().find_map(|&[a, b, c]| match self.cells[a] {
            Some(mark) if self.cells[b] == Some(mark) && self.cells[c] == Some(mark) => Some(mark),
            _ => None,
        })
    }

    fn play(&mut self, cell: usize) -> PluginResult<Outcome> {
        if self.cells[cell].is_some() {
            return Err(PluginError::InvalidInput(format!("cell {} is taken", cell + 1)));
        }

        let mark = self.current;
        self.cells[cell] = Some(mark);
        self.turns += 1;

        if self.winner().is_some() {
            let wins = match mark {
                Mark::X => {
                    self.wins_x += 1;
                    self.wins_x
                }
                Mark::O => {
                    self.wins_o += 1;
                    self.wins_o
                }
            };
            let score = 100 + wins * 10;
            self.status = format!("{mark} wins! Points: {score}");
            return Ok(Outcome::Won(score));
        }

        if self.turns == 9 {
            self.ties += 1;
            let score = 50 + self.ties * 5;
            self.status = format!("Tie! Points: {score}");
            return Ok(Outcome::Tie(score));
        }

        self.current = mark.other();
        self.status = format!("{} to move", self.current);
        Ok(Outcome::Next)
    }

    fn render(&self) -> String {
        let rows: Vec<String> = self
            .cells
            .chunks(3)
            .enumerate()
            .map(|(row, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .map(|(col, cell)| match cell {
                        Some(mark) => format!(" {mark} "),
                        None => format!(" {} ", row * 3 + col + 1),
                    })
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect();

        format!("{}\n{}", rows.join("\n---+---+---\n"), self.status)
    }
}

/// Parse `row col` (1-3 each) or a cell number 1-9 into a cell index.
fn parse_cell(input: &str) -> PluginResult<usize> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let invalid = || PluginError::InvalidInput(format!("expected 'row col' or 1-9, got '{}'", input.trim()));

    let index = match parts.as_slice() {
        [cell] => {
            let cell: usize = cell.parse().map_err(|_| invalid())?;
            if !(1..=9).contains(&cell) {
                return Err(invalid());
            }
            cell - 1
        }
        [row, col] => {
            let row: usize = row.parse().map_err(|_| invalid())?;
            let col: usize = col.parse().map_err(|_| invalid())?;
            if !(1..=3).contains(&row) || !(1..=3).contains(&col) {
                return Err(invalid());
            }
            (row - 1) * 3 + (col - 1)
        }
        _ => return Err(invalid()),
    };

    Ok(index)
}

#[derive(Debug)]
struct Inner {
    core: GameCore,
    board: Mutex<Board>,
}

struct Surface {
    inner: Arc<Inner>,
}

impl GameSurface for Surface {
    fn render(&self) -> String {
        self.inner.board.lock().render()
    }

    fn handle_input(&self, input: &str) -> PluginResult<()> {
        self.inner.core.ensure_active()?;
        let cell = parse_cell(input)?;

        let outcome = self.inner.board.lock().play(cell)?;
        match outcome {
            Outcome::Next => {}
            Outcome::Won(score) | Outcome::Tie(score) => self.inner.core.finish(score),
        }
        Ok(())
    }
}

/// Classic three-in-a-row.
pub struct TicTacToe {
    inner: Arc<Inner>,
    surface: OnceCell<Arc<dyn GameSurface>>,
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl TicTacToe {
    /// Create the game.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner { core: GameCore::new(NAME), board: Mutex::new(Board::default()) }),
            surface: OnceCell::new(),
        }
    }
}

impl GamePlugin for TicTacToe {
    fn name(&self) -> &str {
        NAME
    }

    fn version(&self) -> &str {
        "1.0"
    }

    fn description(&self) -> &str {
        "Classic Tic-Tac-Toe. First to complete a line wins!"
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
        self.inner.board.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{EventKind, GameEvent, GameListener};

    #[derive(Default)]
    struct Finished(Mutex<Vec<i64>>);

    impl GameListener for Finished {
        fn on_game_finished(&self, event: &GameEvent) {
            assert_eq!(event.kind(), EventKind::Finished);
            self.0.lock().push(event.score());
        }
    }

    fn play(game: &TicTacToe, moves: &[&str]) {
        let surface = game.surface();
        for input in moves {
            surface.handle_input(input).unwrap();
        }
    }

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("1").unwrap(), 0);
        assert_eq!(parse_cell("9").unwrap(), 8);
        assert_eq!(parse_cell("2 3").unwrap(), 5);
        assert!(parse_cell("0").is_err());
        assert!(parse_cell("4 1").is_err());
        assert!(parse_cell("x").is_err());
        assert!(parse_cell("1 2 3").is_err());
    }

    #[test]
    fn test_x_wins_and_tally_grows() {
        let game = TicTacToe::new();
        let finished = Arc::new(Finished::default());
        game.subscribe(finished.clone());

        game.start();
        play(&game, &["1", "4", "2", "5", "3"]);
        assert!(!game.is_running());

        game.restart();
        play(&game, &["1", "4", "2", "5", "3"]);

        assert_eq!(*finished.0.lock(), vec![110, 120]);
    }

    #[test]
    fn test_o_wins() {
        let game = TicTacToe::new();
        let finished = Arc::new(Finished::default());
        game.subscribe(finished.clone());

        game.start();
        play(&game, &["1", "4", "2", "5", "9", "6"]);

        assert_eq!(*finished.0.lock(), vec![110]);
        assert!(game.surface().render().contains("O wins"));
    }

    #[test]
    fn test_tie_scores() {
        let game = TicTacToe::new();
        let finished = Arc::new(Finished::default());
        game.subscribe(finished.clone());

        game.start();
        play(&game, &["1", "2", "3", "5", "4", "6", "8", "7", "9"]);

        assert_eq!(*finished.0.lock(), vec![55]);
        assert_eq!(game.current_score(), 55);
    }

    #[test]
    fn test_taken_cell_rejected() {
        let game = TicTacToe::new();
        game.start();
        let surface = game.surface();

        surface.handle_input("5").unwrap();
        assert!(matches!(surface.handle_input("2 2"), Err(PluginError::InvalidInput(_))));
        assert!(game.is_running());
    }

    #[test]
    fn test_input_requires_running_round() {
        let game = TicTacToe::new();
        assert!(matches!(game.surface().handle_input("1"), Err(PluginError::NotRunning(_))));
    }

    #[test]
    fn test_render_shows_free_cells() {
        let game = TicTacToe::new();
        game.start();
        game.surface().handle_input("5").unwrap();

        let view = game.surface().render();
        assert!(view.contains(" 1 | 2 | 3 "));
        assert!(view.contains(" 4 | X | 6 "));
        assert!(view.ends_with("O to move"));
    }
}
