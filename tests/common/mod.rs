//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use gamedeck::plugin::pack_str_ref;

/// Text module exposing one game `game` called `name`.
///
/// Every input is added to the score; the round finishes at 42.
pub fn counting_game(name: &str) -> String {
    let name_ref = pack_str_ref(0, name.len() as u32);
    let version_ref = pack_str_ref(256, 3);
    format!(
        r#"(module
  (memory (export "memory") 1)
  (data (i32.const 0) "{name}")
  (data (i32.const 256) "0.1")
  (global $score (mut i32) (i32.const 0))
  (func (export "game.name") (result i64) (i64.const {name_ref}))
  (func (export "game.version") (result i64) (i64.const {version_ref}))
  (func (export "game.description") (result i64) (i64.const {version_ref}))
  (func (export "game.reset") (global.set $score (i32.const 0)))
  (func (export "game.play") (param $input i32) (result i32)
    (global.set $score (i32.add (global.get $score) (local.get $input)))
    (i32.ge_s (global.get $score) (i32.const 42)))
  (func (export "game.score") (result i32) (global.get $score)))"#
    )
}

/// Write [`counting_game`] to `dir/file`, creating `dir`.
pub fn write_game(dir: &Path, file: &str, name: &str) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(file);
    std::fs::write(&path, counting_game(name)).unwrap();
    path
}

/// Path of a sample artifact shipped under `demos/plugins`.
pub fn demo_plugin(file: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join("plugins").join(file)
}
