//! Property-based tests for the dice factory core.
//!
//! Uses proptest to generate motion steps, storage operations, layouts and
//! input sequences, then verify the structural invariants hold.

use dicefactory_core::die::{step_axis, DieKind};
use dicefactory_core::economy::{CostCurve, CurrencyKind};
use dicefactory_core::engine::Engine;
use dicefactory_core::fixed::Fixed64;
use dicefactory_core::grid::{Direction, GridPosition, ObjectKind};
use dicefactory_core::storage::Storage;
use dicefactory_core::test_utils::*;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_fixed(lo: i32, hi: i32) -> impl Strategy<Value = Fixed64> {
    // Quarter-pixel grid keeps values exact in Q32.32.
    ((lo * 4)..=(hi * 4)).prop_map(|q| Fixed64::from_num(q) / Fixed64::from_num(4))
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::South),
        Just(Direction::West),
        Just(Direction::North),
        Just(Direction::East),
    ]
}

fn arb_kind() -> impl Strategy<Value = ObjectKind> {
    prop_oneof![
        Just(ObjectKind::ConveyorBelt),
        Just(ObjectKind::ConveyorBelt),
        Just(ObjectKind::Builder),
        Just(ObjectKind::Collector),
        Just(ObjectKind::Upgrader),
    ]
}

/// A random layout on a 10x10 corner of the grid.
fn arb_layout(max: usize) -> impl Strategy<Value = Vec<(ObjectKind, i32, i32, Direction)>> {
    proptest::collection::vec((arb_kind(), 0..10i32, 0..10i32, arb_direction()), 1..=max)
}

#[derive(Debug, Clone)]
enum Input {
    Remove(i32, i32),
    Rotate(i32, i32),
    Move(i32, i32, i32, i32),
    Spawn(i32, i32),
    Run(u8),
}

fn arb_inputs(max: usize) -> impl Strategy<Value = Vec<Input>> {
    proptest::collection::vec(
        prop_oneof![
            (0..10i32, 0..10i32).prop_map(|(x, y)| Input::Remove(x, y)),
            (0..10i32, 0..10i32).prop_map(|(x, y)| Input::Rotate(x, y)),
            (0..10i32, 0..10i32, 0..10i32, 0..10i32)
                .prop_map(|(a, b, c, d)| Input::Move(a, b, c, d)),
            (0..10i32, 0..10i32).prop_map(|(x, y)| Input::Spawn(x, y)),
            (1..120u8).prop_map(Input::Run),
        ],
        1..=max,
    )
}

fn build(layout: &[(ObjectKind, i32, i32, Direction)]) -> Engine {
    let mut engine = test_engine();
    for &(kind, x, y, facing) in layout {
        // Occupied tiles are simply skipped.
        let _ = engine.place_object(kind, GridPosition::new(x, y), facing);
    }
    engine
}

fn apply(engine: &mut Engine, input: &Input) {
    match *input {
        Input::Remove(x, y) => {
            let _ = engine.remove_object_at(GridPosition::new(x, y));
        }
        Input::Rotate(x, y) => {
            let _ = engine.rotate_object_at(GridPosition::new(x, y));
        }
        Input::Move(a, b, c, d) => {
            let _ = engine.move_object(GridPosition::new(a, b), GridPosition::new(c, d));
        }
        Input::Spawn(x, y) => {
            let _ = engine.spawn_die_at(GridPosition::new(x, y));
        }
        Input::Run(n) => {
            engine.run(u64::from(n));
        }
    }
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// A motion step never overshoots the target, and snapping never leaves
    /// negative carry.
    #[test]
    fn motion_never_overshoots(
        start in arb_fixed(-320, 320),
        target in arb_fixed(-320, 320),
        carry in arb_fixed(0, 4),
        budget in arb_fixed(0, 8),
    ) {
        let (next, next_carry) = step_axis(start, target, carry, budget);
        if start <= target {
            prop_assert!(next <= target);
            prop_assert!(next >= start);
        } else {
            prop_assert!(next >= target);
            prop_assert!(next <= start);
        }
        prop_assert!(next_carry >= Fixed64::ZERO);
    }

    /// Repeated steps always arrive exactly, given a positive budget.
    #[test]
    fn motion_arrives_exactly(
        start in arb_fixed(-320, 320),
        target in arb_fixed(-320, 320),
        budget in arb_fixed(1, 8),
    ) {
        let (mut position, mut carry) = (start, Fixed64::ZERO);
        for _ in 0..1_000 {
            (position, carry) = step_axis(position, target, carry, budget);
            if position == target {
                break;
            }
        }
        prop_assert_eq!(position, target);
    }

    /// Every growing curve costs strictly more after one more placement.
    #[test]
    fn cost_curves_strictly_increase(
        coefficient in 1u64..50,
        exponent in 1u32..4,
        base in 2u64..5,
        placed in 0u64..20,
    ) {
        let power = CostCurve::Power { coefficient, exponent };
        let exponential = CostCurve::Exponential { coefficient, base };
        prop_assert!(power.cost(placed + 1) > power.cost(placed));
        prop_assert!(exponential.cost(placed + 1) > exponential.cost(placed));
    }

    /// Filling a storage to capacity makes the next store fail, and removing
    /// from an empty bucket fails.
    #[test]
    fn storage_is_capacity_bounded(capacity in 1u64..40, face in 1u8..=6) {
        let mut storage = Storage::new(capacity, 1);
        while storage.count() < capacity {
            prop_assert!(storage.store_die(DieKind::Plain, face));
        }
        prop_assert!(!storage.store_die(DieKind::Plain, face));
        prop_assert!(!storage.remove_die(DieKind::Gold, face));
        let other = if face == 6 { 1 } else { face + 1 };
        prop_assert!(!storage.remove_die(DieKind::Plain, other));
    }

    /// Placing one more object raises the engine's quoted price.
    #[test]
    fn engine_cost_rises_after_placement(kind in prop_oneof![
        Just(ObjectKind::ConveyorBelt),
        Just(ObjectKind::Builder),
        Just(ObjectKind::Upgrader),
    ], x in 0..20i32, y in 0..20i32) {
        let mut engine = test_engine();
        let (_, before) = engine.cost(kind);
        place(&mut engine, kind, x, y, Direction::East);
        let (_, after) = engine.cost(kind);
        prop_assert!(after > before);
    }

    /// Random layouts and edits never break the world invariants, and no
    /// input ever creates money.
    #[test]
    fn random_edits_keep_invariants(layout in arb_layout(30), inputs in arb_inputs(20)) {
        let mut engine = build(&layout);
        for input in &inputs {
            apply(&mut engine, input);
            prop_assert_eq!(engine.check_invariants(), Ok(()));
        }
        prop_assert_eq!(engine.balance(CurrencyKind::PlainBuck), 0);
    }

    /// Save then load reproduces the world and the following ticks.
    #[test]
    fn persistence_round_trip(layout in arb_layout(30), inputs in arb_inputs(10)) {
        let mut engine = build(&layout);
        for input in &inputs {
            apply(&mut engine, input);
        }
        let mut restored = Engine::deserialize(&engine.serialize().unwrap()).unwrap();
        prop_assert_eq!(restored.world(), engine.world());
        engine.run(60);
        restored.run(60);
        prop_assert_eq!(restored.state_hash(), engine.state_hash());
    }
}
