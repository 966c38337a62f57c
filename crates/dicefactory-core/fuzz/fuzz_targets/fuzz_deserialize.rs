#![no_main]
use dicefactory_core::engine::Engine;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode to an error, never a panic. Anything that
    // does decode must survive a tick.
    if let Ok(mut engine) = Engine::deserialize(data) {
        engine.step();
    }
});
