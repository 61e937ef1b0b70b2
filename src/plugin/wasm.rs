//! Games backed by a WebAssembly instance.
//!
//! A module may define several game types. A type `<id>` is concrete when the
//! module exports `memory` and the functions below with these signatures:
//!
//! | export            | signature    |
//! |-------------------|--------------|
//! | `<id>.name`       | `() -> i64`  |
//! | `<id>.version`    | `() -> i64`  |
//! | `<id>.description`| `() -> i64`  |
//! | `<id>.reset`      | `() -> ()`   |
//! | `<id>.play`       | `(i32) -> i32` |
//! | `<id>.score`      | `() -> i32`  |
//!
//! Optional: `<id>.init` (`() -> ()`), `<id>.render` and `<id>.error`
//! (`() -> i64`). Strings are packed as `(ptr << 32) | len`.
//!
//! `play` returns 0 to continue, 1 when the round is finished and 2 on error.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use wasmtime::{
    Engine, ExternType, FuncType, Instance, Linker, Memory, Module, Store, TypedFunc, ValType,
    WasmParams, WasmResults,
};

use super::host::{read_guest_str, HostState};
use super::{
    GameCore, GamePlugin, GameSurface, PluginError, PluginOrigin, PluginResult, MEMORY_EXPORT,
};

const STATUS_CONTINUE: i32 = 0;
const STATUS_FINISHED: i32 = 1;
const STATUS_ERROR: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signature {
    Text,
    Unit,
    Play,
    Score,
}

const REQUIRED_EXPORTS: [(&str, Signature); 6] = [
    ("name", Signature::Text),
    ("version", Signature::Text),
    ("description", Signature::Text),
    ("reset", Signature::Unit),
    ("play", Signature::Play),
    ("score", Signature::Score),
];

const OPTIONAL_EXPORTS: [(&str, Signature); 3] =
    [("init", Signature::Unit), ("render", Signature::Text), ("error", Signature::Text)];

/// Full export name of `suffix` for game type `id`.
pub fn export_name(id: &str, suffix: &str) -> String {
    format!("{id}.{suffix}")
}

fn signature_matches(ty: &FuncType, signature: Signature) -> bool {
    let params: Vec<ValType> = ty.params().collect();
    let results: Vec<ValType> = ty.results().collect();

    match signature {
        Signature::Text => params.is_empty() && matches!(results.as_slice(), [ValType::I64]),
        Signature::Unit => params.is_empty() && results.is_empty(),
        Signature::Play => {
            matches!(params.as_slice(), [ValType::I32]) && matches!(results.as_slice(), [ValType::I32])
        }
        Signature::Score => params.is_empty() && matches!(results.as_slice(), [ValType::I32]),
    }
}

fn is_concrete(exports: &HashMap<String, ExternType>, id: &str) -> bool {
    let required = REQUIRED_EXPORTS.iter().all(|(suffix, signature)| {
        matches!(
            exports.get(&export_name(id, suffix)),
            Some(ExternType::Func(ty)) if signature_matches(ty, *signature)
        )
    });

    let optional = OPTIONAL_EXPORTS.iter().all(|(suffix, signature)| {
        match exports.get(&export_name(id, suffix)) {
            None => true,
            Some(ExternType::Func(ty)) => signature_matches(ty, *signature),
            Some(_) => false,
        }
    });

    required && optional
}

/// Ids of every concrete game type exported by `module`, sorted.
///
/// Incomplete export groups (missing functions or wrong signatures) are
/// skipped.
pub fn concrete_game_ids(module: &Module) -> Vec<String> {
    let exports: HashMap<String, ExternType> =
        module.exports().map(|export| (export.name().to_string(), export.ty())).collect();

    if !matches!(exports.get(MEMORY_EXPORT), Some(ExternType::Memory(_))) {
        return Vec::new();
    }

    let ids: BTreeSet<&str> = exports
        .keys()
        .filter_map(|name| name.rsplit_once('.').map(|(id, _)| id))
        .filter(|id| !id.is_empty())
        .collect();

    ids.into_iter().filter(|id| is_concrete(&exports, id)).map(str::to_string).collect()
}

fn typed<P: WasmParams, R: WasmResults>(
    instance: &Instance,
    store: &mut Store<HostState>,
    id: &str,
    suffix: &str,
) -> PluginResult<TypedFunc<P, R>> {
    instance.get_typed_func::<P, R>(&mut *store, &export_name(id, suffix)).map_err(|e| {
        PluginError::InvalidAbi { game: id.to_string(), reason: format!("{suffix}: {e:#}") }
    })
}

fn optional_typed<P: WasmParams, R: WasmResults>(
    instance: &Instance,
    store: &mut Store<HostState>,
    id: &str,
    suffix: &str,
) -> PluginResult<Option<TypedFunc<P, R>>> {
    if instance.get_func(&mut *store, &export_name(id, suffix)).is_none() {
        return Ok(None);
    }
    typed(instance, store, id, suffix).map(Some)
}

fn read_text(
    instance: &Instance,
    store: &mut Store<HostState>,
    memory: &Memory,
    id: &str,
    suffix: &str,
) -> PluginResult<String> {
    let func = typed::<(), i64>(instance, store, id, suffix)?;
    let packed = func
        .call(&mut *store, ())
        .map_err(|e| PluginError::ExecutionError(format!("{id}.{suffix} trapped: {e:#}")))?;
    read_guest_str(memory, &*store, packed, &export_name(id, suffix))
}

enum Step {
    Continue(i64),
    Finished(i64),
    Failed(String),
}

struct WasmRuntime {
    id: String,
    store: Store<HostState>,
    memory: Memory,
    reset: TypedFunc<(), ()>,
    play: TypedFunc<i32, i32>,
    score: TypedFunc<(), i32>,
    render: Option<TypedFunc<(), i64>>,
    error: Option<TypedFunc<(), i64>>,
}

impl WasmRuntime {
    fn trapped(&self, suffix: &str, err: &wasmtime::Error) -> PluginError {
        PluginError::ExecutionError(format!("{}.{suffix} trapped: {err:#}", self.id))
    }

    fn reset(&mut self) -> PluginResult<()> {
        self.reset.call(&mut self.store, ()).map_err(|e| self.trapped("reset", &e))
    }

    fn score(&mut self) -> PluginResult<i64> {
        self.score.call(&mut self.store, ()).map(i64::from).map_err(|e| self.trapped("score", &e))
    }

    fn step(&mut self, input: i32) -> PluginResult<Step> {
        let status = self.play.call(&mut self.store, input).map_err(|e| self.trapped("play", &e))?;
        let score = self.score()?;

        Ok(match status {
            STATUS_CONTINUE => Step::Continue(score),
            STATUS_FINISHED => Step::Finished(score),
            STATUS_ERROR => Step::Failed(
                self.error_message().unwrap_or_else(|| "game reported an error".to_string()),
            ),
            other => Step::Failed(format!("unknown play status {other}")),
        })
    }

    fn error_message(&mut self) -> Option<String> {
        let func = self.error.clone()?;
        let packed = func.call(&mut self.store, ()).ok()?;
        read_guest_str(&self.memory, &self.store, packed, "error").ok()
    }

    fn render(&mut self) -> PluginResult<Option<String>> {
        let Some(func) = self.render.clone() else {
            return Ok(None);
        };
        let packed = func.call(&mut self.store, ()).map_err(|e| self.trapped("render", &e))?;
        read_guest_str(&self.memory, &self.store, packed, "render").map(Some)
    }
}

struct WasmInner {
    core: GameCore,
    runtime: Mutex<WasmRuntime>,
}

impl WasmInner {
    fn reset(&self) {
        let result = self.runtime.lock().reset();
        if let Err(e) = result {
            self.core.fail(&e.to_string(), None);
        }
    }

    fn play(&self, input: i32) -> PluginResult<()> {
        self.core.ensure_active()?;

        let step = self.runtime.lock().step(input);
        match step {
            Ok(Step::Continue(score)) => {
                if score != self.core.score() {
                    self.core.update_score(score);
                }
            }
            Ok(Step::Finished(score)) => self.core.finish(score),
            Ok(Step::Failed(message)) => self.core.fail(&message, None),
            Err(e) => self.core.fail(&e.to_string(), None),
        }

        Ok(())
    }
}

struct WasmSurface {
    inner: Arc<WasmInner>,
}

impl GameSurface for WasmSurface {
    fn render(&self) -> String {
        let rendered = self.inner.runtime.lock().render();
        match rendered {
            Ok(Some(text)) => text,
            Ok(None) => format!("{}: score {}", self.inner.core.name(), self.inner.core.score()),
            Err(e) => format!("<render failed: {e}>"),
        }
    }

    fn handle_input(&self, input: &str) -> PluginResult<()> {
        let value = input
            .trim()
            .parse::<i32>()
            .map_err(|_| PluginError::InvalidInput(format!("expected a number, got '{}'", input.trim())))?;
        self.inner.play(value)
    }
}

/// A game type instantiated from an artifact.
///
/// Each game owns its own store and instance, so game types sharing a module
/// never share guest state.
pub struct WasmGame {
    name: String,
    version: String,
    description: String,
    artifact: String,
    inner: Arc<WasmInner>,
    surface: OnceCell<Arc<dyn GameSurface>>,
}

impl std::fmt::Debug for WasmGame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmGame")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("artifact", &self.artifact)
            .finish()
    }
}

impl WasmGame {
    /// Instantiate game type `id` from `module`.
    ///
    /// Runs the optional `<id>.init` constructor; a trap there is reported as
    /// an error and the game is not created.
    pub fn instantiate(
        engine: &Engine,
        linker: &Linker<HostState>,
        module: &Module,
        artifact: &str,
        id: &str,
    ) -> PluginResult<Self> {
        let mut store = Store::new(engine, HostState::new(format!("{artifact}:{id}")));
        let instance = linker.instantiate(&mut store, module)?;

        let memory = instance.get_memory(&mut store, MEMORY_EXPORT).ok_or_else(|| {
            PluginError::InvalidAbi { game: id.to_string(), reason: "missing memory export".into() }
        })?;

        if let Some(init) = optional_typed::<(), ()>(&instance, &mut store, id, "init")? {
            init.call(&mut store, ())
                .map_err(|e| PluginError::ExecutionError(format!("{id}.init trapped: {e:#}")))?;
        }

        let name = read_text(&instance, &mut store, &memory, id, "name")?;
        if name.trim().is_empty() {
            return Err(PluginError::InvalidAbi {
                game: id.to_string(),
                reason: "empty game name".into(),
            });
        }
        let version = read_text(&instance, &mut store, &memory, id, "version")?;
        let description = read_text(&instance, &mut store, &memory, id, "description")?;

        let runtime = WasmRuntime {
            id: id.to_string(),
            reset: typed(&instance, &mut store, id, "reset")?,
            play: typed(&instance, &mut store, id, "play")?,
            score: typed(&instance, &mut store, id, "score")?,
            render: optional_typed(&instance, &mut store, id, "render")?,
            error: optional_typed(&instance, &mut store, id, "error")?,
            memory,
            store,
        };

        Ok(Self {
            inner: Arc::new(WasmInner {
                core: GameCore::new(name.clone()),
                runtime: Mutex::new(runtime),
            }),
            name,
            version,
            description,
            artifact: artifact.to_string(),
            surface: OnceCell::new(),
        })
    }

    /// Artifact the game was loaded from.
    pub fn artifact(&self) -> &str {
        &self.artifact
    }
}

impl GamePlugin for WasmGame {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn origin(&self) -> PluginOrigin {
        PluginOrigin::External(self.artifact.clone())
    }

    fn surface(&self) -> Arc<dyn GameSurface> {
        let surface = self.surface.get_or_init(|| {
            let surface: Arc<dyn GameSurface> = Arc::new(WasmSurface { inner: Arc::clone(&self.inner) });
            surface
        });
        Arc::clone(surface)
    }

    fn core(&self) -> &GameCore {
        &self.inner.core
    }

    fn reset_state(&self) {
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::host::build_linker;
    use crate::plugin::test_support::WatModule;
    use crate::plugin::{EventKind, GameEvent, GameListener};

    fn load(source: &str, id: &str) -> PluginResult<WasmGame> {
        let engine = Engine::default();
        let linker = build_linker(&engine)?;
        let module = Module::new(&engine, source)?;
        WasmGame::instantiate(&engine, &linker, &module, "test.wasm", id)
    }

    #[derive(Default)]
    struct Log(Mutex<Vec<(EventKind, i64, Option<String>)>>);

    impl Log {
        fn push(&self, event: &GameEvent) {
            self.0.lock().push((event.kind(), event.score(), event.error_message().map(str::to_string)));
        }
    }

    impl GameListener for Log {
        fn on_game_finished(&self, event: &GameEvent) {
            self.push(event);
        }

        fn on_score_updated(&self, event: &GameEvent) {
            self.push(event);
        }

        fn on_game_error(&self, event: &GameEvent) {
            self.push(event);
        }
    }

    #[test]
    fn test_concrete_ids_skip_incomplete_groups() {
        let source = WatModule::new().game("snake", "Snake").partial("ghost", "Ghost").build();
        let engine = Engine::default();
        let module = Module::new(&engine, &source).unwrap();

        assert_eq!(concrete_game_ids(&module), vec!["snake".to_string()]);
    }

    #[test]
    fn test_metadata_is_read_from_memory() {
        let game = load(&WatModule::new().game("snake", "Snake").build(), "snake").unwrap();

        assert_eq!(game.name(), "Snake");
        assert_eq!(game.version(), "1.0");
        assert_eq!(game.description(), "Snake test game");
        assert_eq!(game.origin(), PluginOrigin::External("test.wasm".to_string()));
    }

    #[test]
    fn test_play_updates_and_finishes() {
        let game = load(&WatModule::new().game("snake", "Snake").build(), "snake").unwrap();
        let log = Arc::new(Log::default());
        game.subscribe(log.clone());
        game.start();

        let surface = game.surface();
        surface.handle_input("10").unwrap();
        surface.handle_input("32").unwrap();

        assert!(!game.is_running());
        assert_eq!(game.current_score(), 42);
        assert_eq!(
            *log.0.lock(),
            vec![(EventKind::ScoreUpdated, 10, None), (EventKind::Finished, 42, None)]
        );
    }

    #[test]
    fn test_error_status_publishes_message() {
        let game = load(&WatModule::new().game("snake", "Snake").build(), "snake").unwrap();
        let log = Arc::new(Log::default());
        game.subscribe(log.clone());
        game.start();

        game.surface().handle_input("-1").unwrap();

        assert!(game.is_running());
        assert_eq!(*log.0.lock(), vec![(EventKind::Error, 0, Some("boom".to_string()))]);
    }

    #[test]
    fn test_input_rules() {
        let game = load(&WatModule::new().game("snake", "Snake").build(), "snake").unwrap();
        let surface = game.surface();

        assert!(matches!(surface.handle_input("5"), Err(PluginError::NotRunning(_))));

        game.start();
        assert!(matches!(surface.handle_input("left"), Err(PluginError::InvalidInput(_))));

        game.pause();
        assert!(matches!(surface.handle_input("5"), Err(PluginError::Paused(_))));
    }

    #[test]
    fn test_restart_resets_guest_state() {
        let game = load(&WatModule::new().game("snake", "Snake").build(), "snake").unwrap();
        game.start();
        game.surface().handle_input("20").unwrap();

        game.restart();
        game.surface().handle_input("1").unwrap();

        assert_eq!(game.current_score(), 1);
    }

    #[test]
    fn test_trapping_init_fails() {
        let source = WatModule::new().game("snake", "Snake").trapping_init("snake").build();
        assert!(matches!(load(&source, "snake"), Err(PluginError::ExecutionError(_))));
    }

    #[test]
    fn test_default_render() {
        let game = load(&WatModule::new().game("snake", "Snake").build(), "snake").unwrap();
        assert_eq!(game.surface().render(), "Snake: score 0");
    }

    #[test]
    fn test_surface_is_built_once() {
        let game = load(&WatModule::new().game("snake", "Snake").build(), "snake").unwrap();
        assert!(Arc::ptr_eq(&game.surface(), &game.surface()));
    }
}
