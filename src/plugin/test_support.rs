//! Synthetic artifacts for unit tests, written as WebAssembly text.

use super::host::pack_str_ref;
use super::SERVICES_EXPORT;

/// Builder for a test module implementing the game ABI.
///
/// Every complete game adds its input to its score; the round finishes once
/// the score reaches 42 and a negative input reports the error "boom".
#[derive(Default)]
pub struct WatModule {
    imports: Vec<String>,
    data: Vec<(u32, String)>,
    globals: Vec<String>,
    funcs: Vec<String>,
    next: u32,
}

impl WatModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn string(&mut self, text: &str) -> i64 {
        let ptr = self.next;
        let len = text.len() as u32;
        self.data.push((ptr, text.to_string()));
        self.next += (len + 16) & !15;
        pack_str_ref(ptr, len)
    }

    fn metadata(&mut self, id: &str, name: &str) {
        let name = self.string(name);
        let version = self.string("1.0");
        let description = self.string(&format!("{} test game", capitalize(id)));
        self.funcs.push(format!(r#"(func (export "{id}.name") (result i64) (i64.const {name}))"#));
        self.funcs.push(format!(r#"(func (export "{id}.version") (result i64) (i64.const {version}))"#));
        self.funcs.push(format!(
            r#"(func (export "{id}.description") (result i64) (i64.const {description}))"#
        ));
    }

    /// Add a complete game type.
    pub fn game(mut self, id: &str, name: &str) -> Self {
        self.metadata(id, name);
        let boom = self.string("boom");
        self.globals.push(format!("(global $score_{id} (mut i32) (i32.const 0))"));
        self.funcs.push(format!(
            r#"(func (export "{id}.reset") (global.set $score_{id} (i32.const 0)))"#
        ));
        self.funcs.push(format!(
            r#"(func (export "{id}.play") (param $input i32) (result i32)
                (if (i32.lt_s (local.get $input) (i32.const 0)) (then (return (i32.const 2))))
                (global.set $score_{id} (i32.add (global.get $score_{id}) (local.get $input)))
                (if (result i32) (i32.ge_s (global.get $score_{id}) (i32.const 42))
                    (then (i32.const 1))
                    (else (i32.const 0))))"#
        ));
        self.funcs.push(format!(
            r#"(func (export "{id}.score") (result i32) (global.get $score_{id}))"#
        ));
        self.funcs.push(format!(r#"(func (export "{id}.error") (result i64) (i64.const {boom}))"#));
        self
    }

    /// Add a type exporting only metadata, which is not a playable game.
    pub fn partial(mut self, id: &str, name: &str) -> Self {
        self.metadata(id, name);
        self
    }

    /// Give `id` a constructor that traps.
    pub fn trapping_init(mut self, id: &str) -> Self {
        self.funcs.push(format!(r#"(func (export "{id}.init") unreachable)"#));
        self
    }

    /// Declare `ids` through the services export.
    pub fn manifest(mut self, ids: &[&str]) -> Self {
        let list = self.string(&ids.join("\n"));
        self.funcs.push(format!(
            r#"(func (export "{SERVICES_EXPORT}") (result i64) (i64.const {list}))"#
        ));
        self
    }

    /// Import a host function that does not exist.
    pub fn missing_import(mut self) -> Self {
        self.imports.push(r#"(import "env" "missing" (func))"#.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut out = String::from("(module\n");
        for import in &self.imports {
            out.push_str(import);
            out.push('\n');
        }
        out.push_str("(memory (export \"memory\") 1)\n");
        for global in &self.globals {
            out.push_str(global);
            out.push('\n');
        }
        for (ptr, text) in &self.data {
            let escaped = text.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
            out.push_str(&format!("(data (i32.const {ptr}) \"{escaped}\")\n"));
        }
        for func in &self.funcs {
            out.push_str(func);
            out.push('\n');
        }
        out.push(')');
        out
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
