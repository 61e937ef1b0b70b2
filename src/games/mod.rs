//! Built-in games.

mod hangman;
mod tictactoe;

use std::sync::Arc;

pub use hangman::Hangman;
pub use tictactoe::TicTacToe;

use crate::plugin::GamePlugin;

/// Fresh instances of every built-in game, in display order.
pub fn builtin_games() -> Vec<Arc<dyn GamePlugin>> {
    vec![Arc::new(TicTacToe::new()), Arc::new(Hangman::new())]
}
