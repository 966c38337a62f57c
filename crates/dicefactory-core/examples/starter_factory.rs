//! Starter factory example: run the opening layout and watch money arrive.
//!
//! Builds the starter scenario, registers passive listeners for collections
//! and sales, sends the truck whenever it holds dice, and prints a summary
//! every simulated ten seconds.
//!
//! Run with: `cargo run -p dicefactory-core --example starter_factory`

use std::cell::RefCell;
use std::rc::Rc;

use dicefactory_core::economy::CurrencyKind;
use dicefactory_core::event::{Event, EventKind};
use dicefactory_core::test_utils::starter_engine;
use dicefactory_core::truck::TruckPhase;

fn main() {
    let mut engine = starter_engine();

    let collected = Rc::new(RefCell::new(0u64));
    let counter = collected.clone();
    engine.event_bus.on_passive(
        EventKind::DieCollected,
        Box::new(move |_| *counter.borrow_mut() += 1),
    );
    engine.event_bus.on_passive(
        EventKind::DieSold,
        Box::new(|event| {
            if let Event::DieSold { kind, face, value, currency, tick } = event {
                println!("  tick {tick}: sold {kind:?} die showing {face} for {value} {currency:?}");
            }
        }),
    );

    for second in 1..=60u64 {
        for _ in 0..60 {
            let loaded: Vec<_> = engine
                .world()
                .trucks
                .iter()
                .filter(|t| t.phase() == TruckPhase::Docked && !t.storage.is_empty())
                .map(|t| t.id)
                .collect();
            for id in loaded {
                engine.send_truck(id).unwrap();
            }
            engine.step();
        }
        if second % 10 == 0 {
            println!(
                "t={second:>2}s  collected {:>3}  dice on belts {:>2}  warehouse {:>3}  plain {:>4}  gold {:>3}",
                collected.borrow(),
                engine.die_count(),
                engine.world().warehouse.count(),
                engine.balance(CurrencyKind::PlainBuck),
                engine.balance(CurrencyKind::GoldBuck),
            );
        }
    }
}
