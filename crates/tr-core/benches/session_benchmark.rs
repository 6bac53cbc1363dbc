//! Session store benchmarks
//!
//! Measures the store operations on the hot path of every chat exchange:
//! - get_or_init on new and existing sessions
//! - replace with growing histories
//! - clear

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use tr_core::session::{ConversationHistory, MemorySessionStore, SessionStore, SqliteSessionStore};

const SEED: &str = "You are an AI assistant that specializes exclusively in benchmarking.";

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn history_with_turns(turns: usize) -> ConversationHistory {
    let mut history = ConversationHistory::seeded(SEED);
    for i in 0..turns {
        history.push_user(format!("Question {} with some additional content", i));
        history.push_assistant(format!("Answer {} with some additional content", i));
    }
    history
}

/// Benchmark session lookup and creation
fn bench_get_or_init(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("get_or_init");

    group.bench_function("memory_existing", |b| {
        let store = MemorySessionStore::new(SEED);
        rt.block_on(store.get_or_init("session")).unwrap();
        b.iter(|| rt.block_on(store.get_or_init(black_box("session"))).unwrap())
    });

    group.bench_function("memory_new", |b| {
        let store = MemorySessionStore::new(SEED);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            rt.block_on(store.get_or_init(&format!("session-{}", i))).unwrap()
        })
    });

    group.bench_function("sqlite_existing", |b| {
        let store = SqliteSessionStore::in_memory(SEED).unwrap();
        rt.block_on(store.get_or_init("session")).unwrap();
        b.iter(|| rt.block_on(store.get_or_init(black_box("session"))).unwrap())
    });

    group.finish();
}

/// Benchmark history replacement at different lengths
fn bench_replace(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("replace");

    for turns in [1, 10, 100].iter() {
        let history = history_with_turns(*turns);

        group.bench_with_input(BenchmarkId::new("memory", turns), &history, |b, history| {
            let store = MemorySessionStore::new(SEED);
            b.iter(|| rt.block_on(store.replace("session", history.clone())).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("sqlite", turns), &history, |b, history| {
            let store = SqliteSessionStore::in_memory(SEED).unwrap();
            b.iter(|| rt.block_on(store.replace("session", history.clone())).unwrap())
        });
    }

    group.finish();
}

/// Benchmark clearing a long session
fn bench_clear(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("clear");

    group.bench_function("memory_after_50_turns", |b| {
        let store = MemorySessionStore::new(SEED);
        let history = history_with_turns(50);
        b.iter_with_setup(
            || rt.block_on(store.replace("session", history.clone())).unwrap(),
            |_| rt.block_on(store.clear("session")).unwrap(),
        )
    });

    group.finish();
}

criterion_group!(benches, bench_get_or_init, bench_replace, bench_clear);

criterion_main!(benches);
