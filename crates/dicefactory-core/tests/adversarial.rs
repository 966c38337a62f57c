//! Adversarial input tests for the dice factory engine.
//!
//! Inputs that should be rejected or absorbed without panics and without
//! changing state.

use dicefactory_core::command::{Command, CommandError};
use dicefactory_core::config::{SimConfig, TruckParams};
use dicefactory_core::economy::CurrencyKind;
use dicefactory_core::engine::{BuyError, EditError, Engine, SendError};
use dicefactory_core::grid::{Direction, GridPosition, ObjectKind, PlacementError};
use dicefactory_core::id::TruckId;
use dicefactory_core::serialize::DeserializeError;
use dicefactory_core::sim::SimulationStrategy;
use dicefactory_core::test_utils::*;
use dicefactory_core::truck::{TruckError, TruckKind, TruckRoute};

#[test]
fn placements_outside_grid_rejected() {
    let mut engine = test_engine();
    for position in [
        GridPosition::new(-1, 0),
        GridPosition::new(0, -1),
        GridPosition::new(20, 0),
        GridPosition::new(0, 20),
        GridPosition::new(i32::MAX, i32::MIN),
    ] {
        assert_eq!(
            engine.place_object(ObjectKind::ConveyorBelt, position, Direction::East),
            Err(PlacementError::OutOfBounds(position))
        );
    }
    assert_eq!(engine.object_count(), 0);
}

#[test]
fn buy_outside_grid_costs_nothing() {
    let mut engine = test_engine();
    engine.credit(CurrencyKind::PlainBuck, 10);
    let position = GridPosition::new(50, 50);
    assert_eq!(
        engine.buy(ObjectKind::ConveyorBelt, position, Direction::East),
        Err(BuyError::OutOfBounds(position))
    );
    assert_eq!(engine.balance(CurrencyKind::PlainBuck), 10);
}

#[test]
fn edits_on_empty_tiles_are_no_ops() {
    let mut engine = test_engine();
    let before = engine.world().clone();
    let tile = GridPosition::new(3, 3);
    assert_eq!(engine.remove_object_at(tile), Err(EditError::Empty(tile)));
    assert_eq!(engine.rotate_object_at(tile), Err(EditError::Empty(tile)));
    assert_eq!(
        engine.move_object(tile, GridPosition::new(4, 4)),
        Err(EditError::Empty(tile))
    );
    assert_eq!(engine.world(), &before);
}

#[test]
fn move_onto_occupied_or_outside_rejected() {
    let mut engine = test_engine();
    place(&mut engine, ObjectKind::ConveyorBelt, 0, 0, Direction::East);
    place(&mut engine, ObjectKind::ConveyorBelt, 1, 0, Direction::East);
    let from = GridPosition::new(0, 0);
    assert_eq!(
        engine.move_object(from, GridPosition::new(1, 0)),
        Err(EditError::Occupied(GridPosition::new(1, 0)))
    );
    assert_eq!(
        engine.move_object(from, GridPosition::new(-5, 0)),
        Err(EditError::OutOfBounds(GridPosition::new(-5, 0)))
    );
    assert!(engine.object_at(from).is_some());
}

#[test]
fn sending_unknown_or_approaching_truck_rejected() {
    let mut engine = test_engine();
    assert_eq!(
        engine.send_truck(TruckId(42)),
        Err(SendError::UnknownTruck(TruckId(42)))
    );
    let (_, truck) = collector_with_truck(&mut engine, GridPosition::new(5, 5));
    engine.run(10);
    assert_eq!(engine.send_truck(truck), Err(SendError::NotDocked(truck)));
}

#[test]
fn double_send_rejected() {
    let mut engine = test_engine();
    let (_, truck) = collector_with_truck(&mut engine, GridPosition::new(5, 5));
    assert!(run_until_docked(&mut engine, truck, 200));
    engine.send_truck(truck).unwrap();
    assert_eq!(engine.send_truck(truck), Err(SendError::NotDocked(truck)));
}

#[test]
fn removing_served_collector_keeps_truck_running() {
    let mut engine = test_engine();
    let (_, truck) = collector_with_truck(&mut engine, GridPosition::new(5, 5));
    assert!(run_until_docked(&mut engine, truck, 200));
    engine.remove_object_at(GridPosition::new(5, 5)).unwrap();
    engine.send_truck(truck).unwrap();
    assert!(run_until_departed(&mut engine, truck, 200));
    assert_eq!(engine.world().trucks.len(), 1);
}

#[test]
fn balances_saturate() {
    let mut engine = test_engine();
    engine.credit(CurrencyKind::GoldBuck, u64::MAX);
    engine.credit(CurrencyKind::GoldBuck, 10);
    assert_eq!(engine.balance(CurrencyKind::GoldBuck), u64::MAX);
}

#[test]
fn negative_and_huge_elapsed_time_are_safe() {
    let mut engine = Engine::new(
        SimConfig::default(),
        SimulationStrategy::Delta { max_steps: 4 },
    )
    .unwrap();
    assert_eq!(engine.advance(fixed(-5.0)).steps_run, 0);
    let result = engine.advance(fixed(1.0e6));
    assert_eq!(result.steps_run, 4);
    assert!(result.time_dropped);
}

#[test]
fn truncated_snapshot_rejected() {
    let mut engine = starter_engine();
    engine.run(30);
    let data = engine.serialize().unwrap();
    let err = Engine::deserialize(&data[..data.len() / 2]).unwrap_err();
    assert!(matches!(err, DeserializeError::Decode(_)));
}

#[test]
fn malformed_json_save_rejected() {
    assert!(matches!(
        Engine::from_json("{\"header\": 7}"),
        Err(DeserializeError::Decode(_))
    ));
}

#[test]
fn invalid_configs_rejected() {
    let bad = [
        SimConfig {
            tick_rate: 0,
            ..SimConfig::default()
        },
        SimConfig {
            grid_width: 0,
            ..SimConfig::default()
        },
        SimConfig {
            warehouse_capacity: 0,
            ..SimConfig::default()
        },
        SimConfig {
            grid_width: 100_000_000,
            ..SimConfig::default()
        },
        SimConfig {
            tick_rate: u32::MAX,
            ..SimConfig::default()
        },
        SimConfig {
            truck: TruckParams {
                arrival_seconds: 1.0e-12,
                ..TruckParams::default()
            },
            ..SimConfig::default()
        },
    ];
    for config in bad {
        assert!(Engine::new(config, SimulationStrategy::Tick).is_err());
    }
    for speed in [f64::INFINITY, 1.0e12] {
        let mut config = SimConfig::default();
        config.dice.plain.speed = speed;
        assert!(Engine::new(config, SimulationStrategy::Tick).is_err());
    }
}

#[test]
fn far_truck_route_rejected() {
    let mut engine = test_engine();
    let collector = place(&mut engine, ObjectKind::Collector, 1, 1, Direction::East);
    let far = GridPosition::new(1, -100_000_000);
    assert_eq!(
        engine.spawn_truck(
            TruckKind::Basic,
            TruckRoute::new(far, GridPosition::new(1, 0)),
            vec![collector],
        ),
        Err(TruckError::RouteOutOfRange(far))
    );
    assert!(engine.world().trucks.is_empty());
    engine.run(5);
}

#[test]
fn truck_hit_test_at_extreme_tiles_finds_nothing() {
    let mut engine = test_engine();
    collector_with_truck(&mut engine, GridPosition::new(5, 5));
    engine.run(3);
    for tile in [
        GridPosition::new(i32::MIN, i32::MIN),
        GridPosition::new(i32::MAX, i32::MAX),
        GridPosition::new(i32::MIN, i32::MAX),
    ] {
        assert_eq!(engine.truck_at(tile), None);
        assert_eq!(
            engine.apply_command(&Command::SendTruckAt { position: tile }),
            Err(CommandError::NoTruckAt(tile))
        );
    }
}
