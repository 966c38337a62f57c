#![no_main]
use dicefactory_core::engine::Engine;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|source: &str| {
    if let Ok(mut engine) = Engine::from_json(source) {
        engine.step();
    }
});
