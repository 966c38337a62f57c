//! Criterion benchmarks for the dice factory engine.
//!
//! Benchmark groups:
//! - `starter_factory`: the starter layout, one tick per iteration
//! - `large_factory`: 100 lanes of 50 belts, with and without truck traffic
//! - `serialization`: binary and JSON saves of the large factory

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use dicefactory_core::engine::Engine;
use dicefactory_core::test_utils::*;
use dicefactory_core::truck::TruckPhase;

// ===========================================================================
// Helpers
// ===========================================================================

/// Send every docked truck that holds at least one die.
fn send_loaded(engine: &mut Engine) {
    let docked: Vec<_> = engine
        .world()
        .trucks
        .iter()
        .filter(|t| t.phase() == TruckPhase::Docked && !t.storage.is_empty())
        .map(|t| t.id)
        .collect();
    for id in docked {
        let _ = engine.send_truck(id);
    }
}

/// A large factory run long enough that every lane carries dice.
fn warmed_large_factory() -> Engine {
    let mut engine = large_factory(100, 50);
    engine.run(600);
    engine
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_starter_factory(c: &mut Criterion) {
    let mut group = c.benchmark_group("starter_factory");
    group.sample_size(50);

    let mut engine = starter_engine();
    engine.run(120);

    group.bench_function("step", |b| {
        b.iter(|| {
            send_loaded(&mut engine);
            engine.step();
        });
    });

    group.finish();
}

fn bench_large_factory(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_factory");
    group.sample_size(20);

    let mut stalled = warmed_large_factory();
    group.bench_function("100_lanes_50_belts_stalled", |b| {
        b.iter(|| {
            stalled.step();
        });
    });

    let mut flowing = warmed_large_factory();
    group.bench_function("100_lanes_50_belts_flowing", |b| {
        b.iter(|| {
            send_loaded(&mut flowing);
            flowing.step();
        });
    });

    group.bench_function("state_hash_and_invariants", |b| {
        b.iter(|| flowing.check_invariants());
    });

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    group.sample_size(30);

    let engine = warmed_large_factory();

    group.bench_function("serialize_100_lanes", |b| {
        b.iter(|| engine.serialize().unwrap());
    });

    let data = engine.serialize().unwrap();
    group.bench_function("deserialize_100_lanes", |b| {
        b.iter(|| Engine::deserialize(&data).unwrap());
    });

    group.bench_function("json_round_trip_100_lanes", |b| {
        b.iter_batched(
            || engine.to_json().unwrap(),
            |json| Engine::from_json(&json).unwrap(),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_starter_factory,
    bench_large_factory,
    bench_serialization
);
criterion_main!(benches);
