//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

mod common;

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

use common::write_game;

/// Get the binary to test, isolated in `dir`.
fn gamedeck(dir: &assert_fs::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("gamedeck").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .env("GAMEDECK_PLUGINS_DIR", dir.path().join("plugins"))
        .env("GAMEDECK_DATA_DIR", dir.path().join("data"))
        .env_remove("GAMEDECK_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    let dir = assert_fs::TempDir::new().unwrap();
    gamedeck(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("WebAssembly game plugins"));
}

#[test]
fn test_version_flag() {
    let dir = assert_fs::TempDir::new().unwrap();
    gamedeck(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// List Command Tests
// ============================================================================

#[test]
fn test_list_builtins_only() {
    let dir = assert_fs::TempDir::new().unwrap();
    gamedeck(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tic-Tac-Toe v1.0 [built-in]"))
        .stdout(predicate::str::contains("Hangman v1.0 [built-in]"))
        .stdout(predicate::str::contains("Total: 2 games"));

    dir.child("plugins").assert(predicate::path::is_dir());
}

#[test]
fn test_list_includes_external_games() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_game(&dir.path().join("plugins"), "runner.wasm", "Runner");
    dir.child("plugins/broken.wasm").write_str("not a module").unwrap();

    gamedeck(&dir)
        .args(["list", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""name": "Runner""#))
        .stdout(predicate::str::contains(r#""artifact": "runner.wasm""#));
}

// ============================================================================
// Play / Scores Tests
// ============================================================================

#[test]
fn test_play_records_score() {
    let dir = assert_fs::TempDir::new().unwrap();
    write_game(&dir.path().join("plugins"), "runner.wasm", "Runner");

    gamedeck(&dir)
        .args(["play", "Runner"])
        .write_stdin("20\n22\n:quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Runner finished! Score: 42"));

    dir.child("data/scores.json").assert(predicate::path::is_file());

    gamedeck(&dir)
        .args(["scores", "Runner"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. 42 pts - "));
}

#[test]
fn test_play_rejects_bad_input() {
    let dir = assert_fs::TempDir::new().unwrap();
    gamedeck(&dir)
        .args(["play", "Tic-Tac-Toe"])
        .write_stdin("banana\n:quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalid input"));
}

#[test]
fn test_play_unknown_game() {
    let dir = assert_fs::TempDir::new().unwrap();
    gamedeck(&dir)
        .args(["play", "Pong"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown game: Pong"));
}

#[test]
fn test_scores_without_records() {
    let dir = assert_fs::TempDir::new().unwrap();
    gamedeck(&dir)
        .args(["scores", "Hangman"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No records yet"));
}

// ============================================================================
// Import Tests
// ============================================================================

#[test]
fn test_import_artifact() {
    let dir = assert_fs::TempDir::new().unwrap();
    let source = write_game(&dir.path().join("downloads"), "runner.wasm", "Runner");

    gamedeck(&dir)
        .arg("import")
        .arg(&source)
        .assert()
        .success()
        .stdout(predicate::str::contains("Runner"));

    dir.child("plugins/runner.wasm").assert(predicate::path::is_file());
}

#[test]
fn test_import_rejects_non_artifact() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("notes.txt").write_str("hello").unwrap();

    gamedeck(&dir)
        .args(["import", "notes.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a plugin artifact"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_local_config_file_is_used() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child(".gamedeck.toml").write_str("[scores]\nmax_records = 7\n").unwrap();

    gamedeck(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_records = 7"));
}

#[test]
fn test_explicit_config_file() {
    let dir = assert_fs::TempDir::new().unwrap();
    dir.child("custom.toml").write_str("[plugins]\nextension = \"game\"\n").unwrap();

    gamedeck(&dir)
        .args(["--config", "custom.toml", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"extension = "game""#));
}

#[test]
fn test_config_init_writes_user_file() {
    let dir = assert_fs::TempDir::new().unwrap();

    gamedeck(&dir)
        .args(["config", "--init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"))
        .stdout(predicate::str::contains("config.toml"));

    gamedeck(&dir)
        .args(["config", "--init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_completions() {
    let dir = assert_fs::TempDir::new().unwrap();
    gamedeck(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gamedeck"));
}
