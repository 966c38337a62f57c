#![no_main]
use arbitrary::Arbitrary;
use dicefactory_core::command::Command;
use dicefactory_core::economy::CurrencyKind;
use dicefactory_core::grid::{Direction, GridPosition, ObjectKind};
use dicefactory_core::test_utils::*;
use libfuzzer_sys::fuzz_target;

/// A structured player input for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Buy { kind: u8, x: i8, y: i8, facing: u8 },
    Remove { x: i8, y: i8 },
    Rotate { x: i8, y: i8 },
    Move { from_x: i8, from_y: i8, to_x: i8, to_y: i8 },
    SendTruckAt { x: i8, y: i8 },
    SpawnDie { x: i8, y: i8 },
    Run { ticks: u8 },
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fn tile(x: i8, y: i8) -> GridPosition {
    GridPosition::new(i32::from(x), i32::from(y))
}

fn kind(k: u8) -> ObjectKind {
    ObjectKind::all()[usize::from(k) % ObjectKind::all().len()]
}

fn facing(f: u8) -> Direction {
    [Direction::South, Direction::West, Direction::North, Direction::East][usize::from(f % 4)]
}

fuzz_target!(|input: FuzzInput| {
    let mut engine = starter_engine();
    engine.credit(CurrencyKind::PlainBuck, 10_000);

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        let command = match *op {
            FuzzOp::Buy { kind: k, x, y, facing: f } => Command::Buy {
                kind: kind(k),
                position: tile(x, y),
                facing: facing(f),
            },
            FuzzOp::Remove { x, y } => Command::Remove { position: tile(x, y) },
            FuzzOp::Rotate { x, y } => Command::Rotate { position: tile(x, y) },
            FuzzOp::Move { from_x, from_y, to_x, to_y } => Command::Move {
                from: tile(from_x, from_y),
                to: tile(to_x, to_y),
            },
            FuzzOp::SendTruckAt { x, y } => Command::SendTruckAt { position: tile(x, y) },
            FuzzOp::SpawnDie { x, y } => Command::SpawnDie { position: tile(x, y) },
            FuzzOp::Run { ticks } => {
                engine.run(u64::from(ticks));
                continue;
            }
        };
        let _ = engine.apply_command(&command);
    }

    assert_eq!(engine.check_invariants(), Ok(()));
});
