//! My Game Plugin for gamedeck
//!
//! This is a template for creating custom game plugins: a number guessing
//! game. Replace the game logic with your own and keep the exports.
//!
//! Every export is prefixed with the game id (`guess` here). Strings are
//! returned as `(ptr << 32) | len` into the module's memory.

use std::sync::Mutex;

#[link(wasm_import_module = "env")]
extern "C" {
    /// Host logger: level 0 = trace .. 4 = error.
    #[link_name = "log"]
    fn host_log(level: i32, ptr: i32, len: i32);
}

/// Status codes returned by `play`.
const CONTINUE: i32 = 0;
const FINISHED: i32 = 1;
const ERROR: i32 = 2;

const MAX_GUESSES: u32 = 10;

fn pack(text: &str) -> i64 {
    ((text.as_ptr() as usize as i64) << 32) | text.len() as i64
}

fn log_info(message: &str) {
    // SAFETY: the host reads `len` bytes at `ptr` from this module's memory.
    unsafe { host_log(2, message.as_ptr() as usize as i32, message.len() as i32) }
}

/// Game state.
///
/// Modify this struct to hold whatever your game needs.
struct Game {
    round: u32,
    secret: u32,
    guesses: u32,
    hint: &'static str,
    score: i32,
    rendered: String,
}

impl Game {
    const fn new() -> Self {
        Self { round: 0, secret: 0, guesses: 0, hint: "", score: 0, rendered: String::new() }
    }

    fn reset(&mut self) {
        self.round += 1;
        // Small LCG so every round picks a different number.
        self.secret = (self.round.wrapping_mul(1_103_515_245).wrapping_add(12_345) >> 8) % 100 + 1;
        self.guesses = 0;
        self.hint = "Guess a number between 1 and 100";
        self.score = 0;
    }

    fn play(&mut self, input: i32) -> i32 {
        if !(1..=100).contains(&input) {
            return ERROR;
        }
        if self.guesses >= MAX_GUESSES {
            return FINISHED;
        }

        self.guesses += 1;
        let guess = input as u32;
        if guess == self.secret {
            self.score = ((MAX_GUESSES + 1 - self.guesses) * 10) as i32;
            self.hint = "Correct!";
            return FINISHED;
        }

        self.hint = if guess < self.secret { "Higher" } else { "Lower" };
        if self.guesses == MAX_GUESSES {
            self.hint = "Out of guesses";
            return FINISHED;
        }
        CONTINUE
    }

    fn render(&mut self) -> i64 {
        self.rendered = format!("{} ({} of {} guesses used)", self.hint, self.guesses, MAX_GUESSES);
        pack(&self.rendered)
    }
}

static GAME: Mutex<Game> = Mutex::new(Game::new());

fn with_game<T>(f: impl FnOnce(&mut Game) -> T) -> T {
    let mut game = GAME.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut game)
}

// ============================================================================
// Exports
// ============================================================================

/// Lists the game ids in this module, one per line.
#[export_name = "__game_services"]
pub extern "C" fn game_services() -> i64 {
    pack("guess")
}

/// Game name, shown in the game list. Must be unique.
#[export_name = "guess.name"]
pub extern "C" fn name() -> i64 {
    pack("Guess")
}

#[export_name = "guess.version"]
pub extern "C" fn version() -> i64 {
    pack(env!("CARGO_PKG_VERSION"))
}

#[export_name = "guess.description"]
pub extern "C" fn description() -> i64 {
    pack("Find the secret number in ten guesses")
}

/// Optional constructor, run once when the host loads the game.
#[export_name = "guess.init"]
pub extern "C" fn init() {
    log_info("Guess loaded");
}

/// Start a fresh round.
#[export_name = "guess.reset"]
pub extern "C" fn reset() {
    with_game(Game::reset);
}

/// Apply one input value. Returns 0 to continue, 1 when finished, 2 on error.
#[export_name = "guess.play"]
pub extern "C" fn play(input: i32) -> i32 {
    with_game(|game| game.play(input))
}

#[export_name = "guess.score"]
pub extern "C" fn score() -> i32 {
    with_game(|game| game.score)
}

/// Optional text surface.
#[export_name = "guess.render"]
pub extern "C" fn render() -> i64 {
    with_game(Game::render)
}

/// Optional message for status 2.
#[export_name = "guess.error"]
pub extern "C" fn error() -> i64 {
    pack("Enter a number between 1 and 100")
}
