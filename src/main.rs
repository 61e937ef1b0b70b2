//! Gamedeck - console game host with hot-loadable WebAssembly plugins.
//!
//! Gamedeck lists, runs and imports games, and keeps their best scores.

#![allow(clippy::single_match_else)]

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gamedeck::core::format_scores;
use gamedeck::games::builtin_games;
use gamedeck::{
    Config, Controller, ControllerSettings, EventKind, GameSurface, JsonScoreStore,
    NullPresenter, PluginDescriptor, Presenter, ScoreRecord, ScoreStore,
};

/// Console game host with hot-loadable WebAssembly game plugins
#[derive(Parser)]
#[command(name = "gamedeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use this config file instead of the default lookup
    #[arg(long, global = true, env = "GAMEDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Plugin directory
    #[arg(long, global = true, env = "GAMEDECK_PLUGINS_DIR")]
    plugins_dir: Option<PathBuf>,

    /// Data directory for scores
    #[arg(long, global = true, env = "GAMEDECK_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all available games (default)
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Play a game in the console
    Play {
        /// Game name
        name: String,
    },

    /// Copy an artifact into the plugin directory and load it
    Import {
        /// Artifact file
        file: PathBuf,
    },

    /// Show the best scores of a game
    Scores {
        /// Game name
        name: String,
    },

    /// Watch the plugin directory and report new games until Ctrl+C
    Watch,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// Show configuration
    Config {
        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Write the current configuration to the user config file
        #[arg(long, conflicts_with = "path")]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    // Handle commands
    match cli.command {
        None => cmd_list(&cli, "text")?,
        Some(Commands::List { ref format }) => cmd_list(&cli, format)?,
        Some(Commands::Play { ref name }) => cmd_play(&cli, name)?,
        Some(Commands::Import { ref file }) => cmd_import(&cli, file)?,
        Some(Commands::Scores { ref name }) => cmd_scores(&cli, name)?,
        Some(Commands::Watch) => cmd_watch(&cli)?,
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Config { path, init }) => cmd_config(&cli, path, init)?,
    }

    Ok(())
}

/// Load the config and apply command-line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    if let Some(dir) = &cli.plugins_dir {
        config.plugins.dir.clone_from(dir);
    }
    if let Some(dir) = &cli.data_dir {
        config.general.data_dir = Some(dir.clone());
    }

    Ok(config)
}

fn open_store(config: &Config) -> Arc<JsonScoreStore> {
    Arc::new(JsonScoreStore::open(config.scores_path(), config.scores.max_records))
}

/// Build and start a controller.
fn start_controller(
    config: &Config,
    watch: bool,
    presenter: Arc<dyn Presenter>,
) -> Result<Controller> {
    let mut settings = ControllerSettings::from_config(config);
    settings.watch &= watch;

    let mut controller = Controller::new(settings, open_store(config), presenter);
    controller.start(builtin_games()).context("Failed to start the game host")?;
    Ok(controller)
}

/// List available games.
fn cmd_list(cli: &Cli, format: &str) -> Result<()> {
    let config = load_config(cli)?;
    let controller = start_controller(&config, false, Arc::new(NullPresenter))?;
    let games = controller.descriptors();

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&games)?;
            println!("{json}");
        }
        _ => {
            for game in &games {
                println!("  {} v{} [{}]", game.name, game.version, game.origin);
                if !game.description.is_empty() {
                    println!("      {}", game.description);
                }
            }
            println!("\nTotal: {} games", games.len());
        }
    }

    Ok(())
}

/// Presenter printing to the terminal.
struct ConsolePresenter;

impl Presenter for ConsolePresenter {
    fn display_surface(&self, game: &PluginDescriptor, surface: &Arc<dyn GameSurface>) {
        println!("=== {} v{} ===", game.name, game.version);
        if !game.description.is_empty() {
            println!("{}", game.description);
        }
        println!("\n{}\n", surface.render());
    }

    fn update_score(&self, _game: &str, score: i64) {
        println!("Score: {score}");
    }

    fn show_finished(&self, game: &str, score: i64) {
        println!("{game} finished! Score: {score}");
    }

    fn show_error(&self, game: &str, message: &str) {
        eprintln!("Error in {game}: {message}");
    }

    fn state_changed(&self, game: &str, kind: EventKind) {
        match kind {
            EventKind::Paused => println!("{game} paused. Type :resume to continue."),
            EventKind::Resumed => println!("{game} resumed."),
            _ => {}
        }
    }

    fn scores_changed(&self, game: &str, records: &[ScoreRecord]) {
        println!("Top scores for {game}:");
        for line in format_scores(records) {
            println!("  {line}");
        }
    }
}

const PLAY_HELP: &str = "Commands: :pause :resume :restart :scores :quit";

/// Play a game with line-oriented input.
fn cmd_play(cli: &Cli, name: &str) -> Result<()> {
    let config = load_config(cli)?;
    let mut controller = start_controller(&config, true, Arc::new(ConsolePresenter))?;

    let game = match controller.select_by_name(name) {
        Ok(game) => game,
        Err(e) => {
            let names: Vec<String> = controller.games().iter().map(|g| g.name().to_string()).collect();
            controller.shutdown();
            anyhow::bail!("{e}. Available: {}", names.join(", "));
        }
    };
    let surface = game.surface();
    println!("{PLAY_HELP}");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        for added in controller.pump_discoveries() {
            println!("New game available: {added}");
        }

        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        match line.trim() {
            "" => continue,
            ":quit" | ":q" => break,
            ":pause" => game.pause(),
            ":resume" => game.resume(),
            ":restart" => game.restart(),
            ":scores" => ConsolePresenter.scores_changed(game.name(), &controller.top_scores(game.name())),
            ":help" => println!("{PLAY_HELP}"),
            input => match surface.handle_input(input) {
                Ok(()) => {}
                Err(e) => println!("{e}"),
            },
        }

        if !game.is_paused() {
            println!("{}", surface.render());
        }
        if !game.is_running() {
            println!("Type :restart to play again or :quit to leave.");
        }
    }

    controller.shutdown();
    Ok(())
}

/// Import an artifact.
fn cmd_import(cli: &Cli, file: &Path) -> Result<()> {
    let config = load_config(cli)?;
    let mut controller = start_controller(&config, false, Arc::new(NullPresenter))?;

    let added = controller
        .import_artifact(file)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if added.is_empty() {
        println!("Imported {}: no new games", file.display());
    } else {
        println!("Imported {}: {}", file.display(), added.join(", "));
    }

    Ok(())
}

/// Print the best scores of a game.
fn cmd_scores(cli: &Cli, name: &str) -> Result<()> {
    let config = load_config(cli)?;
    let store = open_store(&config);

    println!("Top scores for {name}:");
    for line in format_scores(&store.top_scores(name)) {
        println!("  {line}");
    }

    Ok(())
}

/// Keep the watcher running and report new games.
fn cmd_watch(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let mut controller =
        Controller::new(ControllerSettings::from_config(&config), open_store(&config), Arc::new(NullPresenter));
    controller.begin(builtin_games()).context("Failed to start the game host")?;

    if !controller.watcher_active() {
        controller.shutdown();
        anyhow::bail!("Hot-loading is not available (disabled in config or unsupported)");
    }

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })?;

    println!(
        "Watching {} for new games. Press Ctrl+C to stop.",
        controller.plugins_dir().display()
    );
    for game in controller.games() {
        println!("  {} [{}]", game.name(), game.origin());
    }

    while running.load(Ordering::SeqCst) {
        for added in controller.pump_discoveries() {
            println!("New game available: {added}");
        }
        std::thread::sleep(Duration::from_millis(200));
    }

    println!("\nStopping watcher...");
    controller.shutdown();
    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "gamedeck", &mut io::stdout());
}

/// Show configuration.
fn cmd_config(cli: &Cli, show_path: bool, init: bool) -> Result<()> {
    if show_path {
        if let Some(path) = Config::config_dir() {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let config = load_config(cli)?;

    if init {
        if let Some(existing) = Config::config_dir().map(|dir| dir.join("config.toml")) {
            if existing.exists() {
                anyhow::bail!("Config file already exists: {}", existing.display());
            }
        }
        let path = config.save().context("Failed to write config file")?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let toml = toml::to_string_pretty(&config)?;
    println!("{toml}");

    Ok(())
}
