//! Save and load of the full simulation state.
//!
//! Two encodings share one snapshot layout: a compact `bitcode` blob and,
//! with the `json` feature, a human-readable JSON save file. Both start with
//! a versioned header that is validated before the engine is rebuilt.
//! Derived indices (tile to object, tile to dice) are not stored; they are
//! rebuilt during decode.

use crate::config::SimConfig;
use crate::engine::{Engine, World};
use crate::sim::{SimulationStrategy, StateHash};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a dice factory snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xD1CE_F001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
    #[cfg(feature = "json")]
    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("snapshot decoding failed: {0}")]
    Decode(String),
    #[error("snapshot carries an invalid config: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("snapshot state is inconsistent: {0}")]
    Corrupt(#[from] crate::validation::InvariantViolation),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Tick the snapshot was taken at.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    /// Check magic and version.
    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Decode only far enough to report the header of a binary snapshot.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    let snapshot: EngineSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

// ---------------------------------------------------------------------------
// Snapshot layout
// ---------------------------------------------------------------------------

/// Everything persisted. The event bus holds closures and is recreated
/// empty on load.
#[derive(Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    header: SnapshotHeader,
    config: SimConfig,
    strategy: SimulationStrategy,
    world: World,
    paused: bool,
    last_state_hash: u64,
}

impl EngineSnapshot {
    fn capture(engine: &Engine) -> Self {
        Self {
            header: SnapshotHeader::new(engine.tick()),
            config: engine.config.clone(),
            strategy: engine.strategy,
            world: engine.world.clone(),
            paused: engine.paused,
            last_state_hash: engine.last_state_hash,
        }
    }

    fn restore(self) -> Result<Engine, DeserializeError> {
        self.header.validate()?;
        self.config.validate()?;
        let engine = Engine::from_parts(
            self.config,
            self.strategy,
            self.world,
            self.paused,
            self.last_state_hash,
        );
        engine.check_invariants()?;
        Ok(engine)
    }
}

// ---------------------------------------------------------------------------
// Engine integration
// ---------------------------------------------------------------------------

impl Engine {
    /// Encode the engine state as a binary blob.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        bitcode::serialize(&EngineSnapshot::capture(self))
            .map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Rebuild an engine from [`Engine::serialize`] output. Listeners must be
    /// re-registered afterwards.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: EngineSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.restore()
    }

    /// Encode the engine state as pretty-printed JSON (the `save.json`
    /// format).
    #[cfg(feature = "json")]
    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string_pretty(&EngineSnapshot::capture(self))?)
    }

    #[cfg(feature = "json")]
    pub fn from_json(source: &str) -> Result<Self, DeserializeError> {
        let snapshot: EngineSnapshot =
            serde_json::from_str(source).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.restore()
    }

    /// Per-subsystem hashes, for narrowing down where two runs diverged.
    pub fn subsystem_hashes(&self) -> SubsystemHashes {
        let world = &self.world;

        let mut objects = StateHash::new();
        for object in world.objects.iter() {
            objects.write_u64(object.id.0);
            objects.write_u32(object.kind as u32);
            objects.write_i32(object.position.x);
            objects.write_i32(object.position.y);
            objects.write_u32(object.facing as u32);
            objects.write_u32(object.collecting as u32);
        }

        let mut dice = StateHash::new();
        for die in world.dice.iter() {
            dice.write_u64(die.id.0);
            dice.write_u32(die.face as u32);
            dice.write_u32(die.kind as u32);
            dice.write_fixed64(die.position.x);
            dice.write_fixed64(die.position.y);
        }

        let mut trucks = StateHash::new();
        for truck in &world.trucks {
            trucks.write_u64(truck.id.0);
            trucks.write_fixed64(truck.percent_complete());
            trucks.write_u64(truck.storage.count());
        }

        let mut economy = StateHash::new();
        economy.write_u64(world.warehouse.count());
        for (currency, balance) in world.ledger.iter() {
            economy.write_u32(currency as u32);
            economy.write_u64(balance);
        }
        economy.write_u64(world.rng.state());

        SubsystemHashes {
            objects: objects.finish(),
            dice: dice.finish(),
            trucks: trucks.finish(),
            economy: economy.finish(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsystemHashes {
    pub objects: u64,
    pub dice: u64,
    pub trucks: u64,
    pub economy: u64,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn header_bytes(magic: u32, version: u32) -> Vec<u8> {
        let engine = test_engine();
        let mut snapshot = EngineSnapshot::capture(&engine);
        snapshot.header.magic = magic;
        snapshot.header.version = version;
        bitcode::serialize(&snapshot).unwrap()
    }

    #[test]
    fn round_trip_preserves_world_and_hash() {
        let mut engine = starter_engine();
        engine.run(300);
        let data = engine.serialize().unwrap();
        let restored = Engine::deserialize(&data).unwrap();
        assert_eq!(restored.world(), engine.world());
        assert_eq!(restored.state_hash(), engine.state_hash());
        assert_eq!(restored.compute_state_hash(), engine.compute_state_hash());
    }

    #[test]
    fn restored_engine_continues_identically() {
        let mut engine = starter_engine();
        engine.run(200);
        let mut restored = Engine::deserialize(&engine.serialize().unwrap()).unwrap();
        engine.run(400);
        restored.run(400);
        assert_eq!(engine.state_hash(), restored.state_hash());
        assert_eq!(engine.subsystem_hashes(), restored.subsystem_hashes());
    }

    #[test]
    fn header_is_readable() {
        let mut engine = test_engine();
        engine.run(12);
        let header = read_snapshot_header(&engine.serialize().unwrap()).unwrap();
        assert_eq!(header, SnapshotHeader::new(12));
    }

    #[test]
    fn bad_magic_rejected() {
        let err = Engine::deserialize(&header_bytes(0xDEAD_BEEF, FORMAT_VERSION)).unwrap_err();
        assert!(matches!(err, DeserializeError::InvalidMagic(0xDEAD_BEEF)));
    }

    #[test]
    fn future_and_past_versions_rejected() {
        let err = Engine::deserialize(&header_bytes(SNAPSHOT_MAGIC, FORMAT_VERSION + 1)).unwrap_err();
        assert!(matches!(err, DeserializeError::FutureVersion(_)));
        let err = Engine::deserialize(&header_bytes(SNAPSHOT_MAGIC, 0)).unwrap_err();
        assert!(matches!(err, DeserializeError::UnsupportedVersion(0)));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = Engine::deserialize(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, DeserializeError::Decode(_)));
    }

    #[test]
    fn inconsistent_world_rejected() {
        let engine = starter_engine();
        let mut snapshot = EngineSnapshot::capture(&engine);
        let id = snapshot.world.dice.ids().next().unwrap();
        snapshot.world.dice.get_mut(id).unwrap().face = 9;
        let data = bitcode::serialize(&snapshot).unwrap();
        let err = Engine::deserialize(&data).unwrap_err();
        assert!(matches!(
            err,
            DeserializeError::Corrupt(crate::validation::InvariantViolation::FaceOutOfRange { face: 9, .. })
        ));
    }

    #[test]
    fn save_with_unusable_config_rejected() {
        let mut snapshot = EngineSnapshot::capture(&test_engine());
        snapshot.config.truck.arrival_seconds = 1.0e-12;
        let data = bitcode::serialize(&snapshot).unwrap();
        assert!(matches!(
            Engine::deserialize(&data),
            Err(DeserializeError::Config(_))
        ));
        #[cfg(feature = "json")]
        {
            let json = serde_json::to_string(&snapshot).unwrap();
            assert!(matches!(
                Engine::from_json(&json),
                Err(DeserializeError::Config(_))
            ));
        }
    }

    #[test]
    fn paused_flag_survives() {
        let mut engine = test_engine();
        engine.pause();
        let restored = Engine::deserialize(&engine.serialize().unwrap()).unwrap();
        assert!(restored.is_paused());
    }

    #[cfg(feature = "json")]
    #[test]
    fn json_round_trip() {
        let mut engine = starter_engine();
        engine.run(500);
        let text = engine.to_json().unwrap();
        let restored = Engine::from_json(&text).unwrap();
        assert_eq!(restored.world(), engine.world());
        assert_eq!(restored.config(), engine.config());
    }

    #[test]
    fn subsystem_hashes_isolate_changes() {
        let mut a = test_engine();
        let b = test_engine();
        a.credit(crate::economy::CurrencyKind::PlainBuck, 1);
        let (ha, hb) = (a.subsystem_hashes(), b.subsystem_hashes());
        assert_eq!(ha.objects, hb.objects);
        assert_eq!(ha.dice, hb.dice);
        assert_ne!(ha.economy, hb.economy);
    }
}
