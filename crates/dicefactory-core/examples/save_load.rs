//! Save/load example: snapshot a running factory and resume it.
//!
//! Runs the starter factory, writes a binary snapshot and a JSON save,
//! restores both, and checks that every copy stays in lockstep.
//!
//! Run with: `cargo run -p dicefactory-core --example save_load --features json`

use dicefactory_core::engine::Engine;
use dicefactory_core::serialize::read_snapshot_header;
use dicefactory_core::test_utils::starter_engine;

fn main() {
    let mut engine = starter_engine();
    engine.run(450);

    let bytes = engine.serialize().unwrap();
    let header = read_snapshot_header(&bytes).unwrap();
    println!("binary snapshot: {} bytes at tick {}", bytes.len(), header.tick);

    let json = engine.to_json().unwrap();
    println!("json save: {} bytes", json.len());

    let mut from_bytes = Engine::deserialize(&bytes).unwrap();
    let mut from_json = Engine::from_json(&json).unwrap();

    for _ in 0..600 {
        engine.step();
        from_bytes.step();
        from_json.step();
    }

    println!("original   hash {:016x}", engine.state_hash());
    println!("from bytes hash {:016x}", from_bytes.state_hash());
    println!("from json  hash {:016x}", from_json.state_hash());
    assert_eq!(engine.state_hash(), from_bytes.state_hash());
    assert_eq!(engine.state_hash(), from_json.state_hash());
    println!("all three copies agree after 600 more ticks");
}
