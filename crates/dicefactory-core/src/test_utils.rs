//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::SimConfig;
use crate::engine::Engine;
use crate::fixed::Fixed64;
use crate::grid::{Direction, GridPosition, ObjectKind};
use crate::id::{ObjectId, TruckId};
use crate::scenario::Scenario;
use crate::sim::SimulationStrategy;
use crate::truck::{TruckKind, TruckRoute};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Engine constructors
// ===========================================================================

/// Empty 20x20 world with default parameters, tick strategy.
pub fn test_engine() -> Engine {
    Engine::new(SimConfig::default(), SimulationStrategy::Tick).unwrap()
}

/// Empty world with the given seed.
pub fn seeded_engine(seed: u64) -> Engine {
    let config = SimConfig {
        rng_seed: seed,
        ..SimConfig::default()
    };
    Engine::new(config, SimulationStrategy::Tick).unwrap()
}

/// The starter layout: three builders, an upgrader, a belt loop and a
/// collector served by one truck.
pub fn starter_engine() -> Engine {
    Engine::from_scenario(SimConfig::default(), SimulationStrategy::Tick, &Scenario::starter())
        .unwrap()
}

/// `lanes` production lines of builder, `length` belts and a collector,
/// each collector served by its own truck. The grid is sized to fit.
pub fn large_factory(lanes: u32, length: u32) -> Engine {
    let config = SimConfig {
        grid_width: length + 2,
        grid_height: lanes * 3 + 2,
        ..SimConfig::default()
    };
    let mut engine = Engine::new(config, SimulationStrategy::Tick).unwrap();
    for lane in 0..lanes {
        let y = (lane * 3 + 2) as i32;
        place(&mut engine, ObjectKind::Builder, 0, y, Direction::East);
        belt_line(&mut engine, 1, y, Direction::East, length);
        collector_with_truck(&mut engine, GridPosition::new(length as i32 + 1, y));
    }
    engine
}

// ===========================================================================
// Layout helpers
// ===========================================================================

/// Place an object for free, panicking on a blocked tile.
pub fn place(engine: &mut Engine, kind: ObjectKind, x: i32, y: i32, facing: Direction) -> ObjectId {
    engine
        .place_object(kind, GridPosition::new(x, y), facing)
        .unwrap()
}

/// Place a straight run of belts from `(x, y)` for `len` tiles toward
/// `facing`, all facing the same way.
pub fn belt_line(engine: &mut Engine, x: i32, y: i32, facing: Direction, len: u32) -> Vec<ObjectId> {
    let mut position = GridPosition::new(x, y);
    let mut ids = Vec::with_capacity(len as usize);
    for _ in 0..len {
        ids.push(place(engine, ObjectKind::ConveyorBelt, position.x, position.y, facing));
        position = position.step(facing);
    }
    ids
}

/// A collector at `position` with a truck route that docks just above it.
pub fn collector_with_truck(engine: &mut Engine, position: GridPosition) -> (ObjectId, TruckId) {
    let collector = place(engine, ObjectKind::Collector, position.x, position.y, Direction::East);
    let route = TruckRoute::new(
        GridPosition::new(position.x, -2),
        GridPosition::new(position.x, position.y - 2),
    );
    let truck = engine
        .spawn_truck(TruckKind::Basic, route, vec![collector])
        .unwrap();
    (collector, truck)
}

/// Step until the truck docks, up to `limit` ticks. Returns whether it did.
pub fn run_until_docked(engine: &mut Engine, truck: TruckId, limit: u64) -> bool {
    for _ in 0..limit {
        if engine
            .truck(truck)
            .is_some_and(|t| t.phase() == crate::truck::TruckPhase::Docked)
        {
            return true;
        }
        engine.step();
    }
    engine
        .truck(truck)
        .is_some_and(|t| t.phase() == crate::truck::TruckPhase::Docked)
}

/// Step until the given truck id no longer exists (it departed and
/// respawned), up to `limit` ticks.
pub fn run_until_departed(engine: &mut Engine, truck: TruckId, limit: u64) -> bool {
    for _ in 0..limit {
        if engine.truck(truck).is_none() {
            return true;
        }
        engine.step();
    }
    engine.truck(truck).is_none()
}
