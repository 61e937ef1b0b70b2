//! Performance benchmarks for Gamedeck.
//!
//! Covers event fan-out, registry operations, built-in game input handling
//! and score persistence.
//!
//! Run with: `cargo bench`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gamedeck::games::TicTacToe;
use gamedeck::plugin::{EventBus, GameCore};
use gamedeck::{
    EventKind, GameEvent, GameListener, GamePlugin, GameSurface, JsonScoreStore, PluginRegistry,
    PluginResult, ScoreStore,
};
use once_cell::sync::OnceCell;

// ============================================================================
// Fixtures
// ============================================================================

mod fixtures {
    use super::*;

    #[derive(Default)]
    pub struct Counter(pub AtomicU64);

    impl GameListener for Counter {
        fn on_score_updated(&self, _event: &GameEvent) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    struct NoSurface;

    impl GameSurface for NoSurface {
        fn render(&self) -> String {
            String::new()
        }

        fn handle_input(&self, _input: &str) -> PluginResult<()> {
            Ok(())
        }
    }

    /// Game with no behaviour, used to fill registries.
    pub struct BenchGame {
        name: String,
        core: GameCore,
        surface: OnceCell<Arc<dyn GameSurface>>,
    }

    impl BenchGame {
        pub fn new(name: String) -> Self {
            Self { core: GameCore::new(name.clone()), name, surface: OnceCell::new() }
        }
    }

    impl GamePlugin for BenchGame {
        fn name(&self) -> &str {
            &self.name
        }

        fn version(&self) -> &str {
            "1.0"
        }

        fn description(&self) -> &str {
            ""
        }

        fn surface(&self) -> Arc<dyn GameSurface> {
            Arc::clone(self.surface.get_or_init(|| Arc::new(NoSurface)))
        }

        fn core(&self) -> &GameCore {
            &self.core
        }

        fn reset_state(&self) {}
    }

    pub fn generate_games(count: usize) -> Vec<Arc<dyn GamePlugin>> {
        (0..count).map(|i| Arc::new(BenchGame::new(format!("game-{i}"))) as Arc<dyn GamePlugin>).collect()
    }
}

// ============================================================================
// Event Bus Benchmarks
// ============================================================================

fn bench_event_bus(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_bus");

    for listeners in [1, 10, 100] {
        let bus = EventBus::new();
        for _ in 0..listeners {
            bus.subscribe(Arc::new(fixtures::Counter::default()));
        }
        let event = GameEvent::new("Bench", EventKind::ScoreUpdated, 10);

        group.throughput(Throughput::Elements(listeners as u64));
        group.bench_with_input(BenchmarkId::new("publish", listeners), &listeners, |b, _| {
            b.iter(|| black_box(bus.publish(black_box(&event))));
        });
    }

    group.finish();
}

// ============================================================================
// Registry Benchmarks
// ============================================================================

fn bench_registry_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    let games = fixtures::generate_games(1000);
    group.bench_function("register_1000_games", |b| {
        b.iter(|| {
            let registry = PluginRegistry::new();
            for game in &games {
                registry.register(black_box(Arc::clone(game)));
            }
            black_box(registry)
        });
    });

    let registry = PluginRegistry::new();
    for game in &games {
        registry.register(Arc::clone(game));
    }

    group.bench_function("get_by_name", |b| {
        b.iter(|| black_box(registry.get(black_box("game-500"))));
    });

    group.bench_function("list_1000_games", |b| {
        b.iter(|| black_box(registry.list()));
    });

    group.finish();
}

// ============================================================================
// Game Benchmarks
// ============================================================================

fn bench_tictactoe_round(c: &mut Criterion) {
    let game = TicTacToe::new();
    let surface = game.surface();

    c.bench_function("tictactoe_round", |b| {
        b.iter(|| {
            game.restart();
            for input in ["1", "2", "3", "4", "5", "6", "7", "8", "9"] {
                if !game.is_running() {
                    break;
                }
                let _ = black_box(surface.handle_input(black_box(input)));
            }
        });
    });
}

fn bench_score_store(c: &mut Criterion) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let store = JsonScoreStore::open(temp_dir.path().join("scores.json"), 3);
    let mut score = 0;

    c.bench_function("score_record", |b| {
        b.iter(|| {
            score += 1;
            store.record(black_box("Bench"), black_box(score)).unwrap();
        });
    });
}

criterion_group!(event_benches, bench_event_bus,);

criterion_group!(registry_benches, bench_registry_operations,);

criterion_group!(game_benches, bench_tictactoe_round, bench_score_store,);

criterion_main!(event_benches, registry_benches, game_benches,);
