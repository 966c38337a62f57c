//! Invariant checks, state comparison and determinism validation.
//!
//! [`Engine::check_invariants`] looks for states that correct operation can
//! never produce. The tick pipeline runs it in debug builds and halts on the
//! first violation. The diff and determinism helpers compare whole runs.

use crate::config::SimConfig;
use crate::die::RealPoint;
use crate::engine::Engine;
use crate::fixed::{Fixed64, MAX_REAL_EXTENT};
use crate::grid::{GridPosition, ObjectKind};
use crate::id::{DieId, ObjectId, TruckId};
use crate::scenario::Scenario;
use crate::serialize::DeserializeError;
use crate::sim::SimulationStrategy;
use crate::storage::Storage;
use crate::truck::TruckPhase;

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

/// Where a storage lives, for violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOwner {
    Warehouse,
    Trailer(TruckId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("tile ({}, {}) indexes {object} but the object is elsewhere", .tile.x, .tile.y)]
    TileIndexMismatch { tile: GridPosition, object: ObjectId },
    #[error("{0} is not in the tile index")]
    UnindexedObject(ObjectId),
    #[error("{object} sits outside the grid at ({}, {})", .position.x, .position.y)]
    ObjectOutOfBounds { object: ObjectId, position: GridPosition },
    #[error("{count} dice target tile ({}, {})", .tile.x, .tile.y)]
    TileOverTargeted { tile: GridPosition, count: usize },
    #[error("{die} shows face {face}")]
    FaceOutOfRange { die: DieId, face: u8 },
    #[error("{0} sits outside the grid")]
    DieOutOfBounds(DieId),
    #[error("{0} has a route outside the simulated area")]
    TruckRouteOutOfRange(TruckId),
    #[error("{owner:?} holds {count} dice but its capacity is {capacity}")]
    StorageOverCapacity {
        owner: StorageOwner,
        count: u64,
        capacity: u64,
    },
    #[error("{owner:?} holds {distinct} kinds but its limit is {limit}")]
    StorageOverTypeLimit {
        owner: StorageOwner,
        distinct: usize,
        limit: usize,
    },
    #[error("{owner:?} count {count} disagrees with bucket total {total}")]
    StorageCountMismatch {
        owner: StorageOwner,
        count: u64,
        total: u64,
    },
    #[error("{0} serves no collectors")]
    TruckWithoutCollectors(TruckId),
    #[error("{0} is collecting with no docked truck")]
    CollectingWithoutTruck(ObjectId),
    #[error("{kind:?} placement count is {recorded}, grid holds {actual}")]
    PlacementCountMismatch {
        kind: ObjectKind,
        recorded: u64,
        actual: u64,
    },
}

fn check_storage(owner: StorageOwner, storage: &Storage) -> Result<(), InvariantViolation> {
    if storage.count() > storage.capacity() {
        return Err(InvariantViolation::StorageOverCapacity {
            owner,
            count: storage.count(),
            capacity: storage.capacity(),
        });
    }
    if storage.type_limit() > 0 && storage.distinct_types() > storage.type_limit() {
        return Err(InvariantViolation::StorageOverTypeLimit {
            owner,
            distinct: storage.distinct_types(),
            limit: storage.type_limit(),
        });
    }
    let total: u64 = storage.buckets().map(|(_, _, q)| q).sum();
    if total != storage.count() {
        return Err(InvariantViolation::StorageCountMismatch {
            owner,
            count: storage.count(),
            total,
        });
    }
    Ok(())
}

impl Engine {
    /// Return the first invariant violation found, if any.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let world = &self.world;

        for (&tile, &id) in world.objects.tiles() {
            if world.objects.get(id).map(|o| o.position) != Some(tile) {
                return Err(InvariantViolation::TileIndexMismatch { tile, object: id });
            }
        }
        for object in world.objects.iter() {
            if world.objects.id_at(object.position) != Some(object.id) {
                return Err(InvariantViolation::UnindexedObject(object.id));
            }
            if !world.objects.in_bounds(object.position) {
                return Err(InvariantViolation::ObjectOutOfBounds {
                    object: object.id,
                    position: object.position,
                });
            }
        }
        for kind in ObjectKind::all() {
            let actual = world.objects.iter().filter(|o| o.kind == kind).count() as u64;
            let recorded = world.objects.placed_count(kind);
            if actual != recorded {
                return Err(InvariantViolation::PlacementCountMismatch {
                    kind,
                    recorded,
                    actual,
                });
            }
        }

        for (&tile, ids) in world.dice.target_index() {
            if ids.len() > 1 {
                return Err(InvariantViolation::TileOverTargeted {
                    tile,
                    count: ids.len(),
                });
            }
        }
        if let Some(die) = world.dice.iter().find(|d| !(1..=6).contains(&d.face)) {
            return Err(InvariantViolation::FaceOutOfRange {
                die: die.id,
                face: die.face,
            });
        }

        let tile_size = self.config.tile_size;
        if let Some(die) = world
            .dice
            .iter()
            .find(|d| !world.objects.in_bounds(d.position.to_tile(tile_size)))
        {
            return Err(InvariantViolation::DieOutOfBounds(die.id));
        }

        check_storage(StorageOwner::Warehouse, &world.warehouse)?;
        for truck in &world.trucks {
            let in_range = |p: RealPoint| {
                let limit = Fixed64::from_num(MAX_REAL_EXTENT);
                p.x.abs() <= limit && p.y.abs() <= limit
            };
            if !in_range(truck.spawn_real()) || !in_range(truck.dock_real()) {
                return Err(InvariantViolation::TruckRouteOutOfRange(truck.id));
            }
            if truck.collectors().is_empty() {
                return Err(InvariantViolation::TruckWithoutCollectors(truck.id));
            }
            check_storage(StorageOwner::Trailer(truck.id), &truck.storage)?;
        }

        for object in world.objects.iter().filter(|o| o.collecting) {
            let served = world.trucks.iter().any(|t| {
                t.phase() == TruckPhase::Docked && t.collectors().contains(&object.id)
            });
            if !served {
                return Err(InvariantViolation::CollectingWithoutTruck(object.id));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// State diff
// ---------------------------------------------------------------------------

/// Subsystem-level match flags from comparing hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemDiff {
    pub tick_matches: bool,
    pub objects_match: bool,
    pub dice_match: bool,
    pub trucks_match: bool,
    pub economy_matches: bool,
}

impl SubsystemDiff {
    pub fn all_match(&self) -> bool {
        self.tick_matches
            && self.objects_match
            && self.dice_match
            && self.trucks_match
            && self.economy_matches
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityDiff {
    ObjectOnlyInA(ObjectId),
    ObjectOnlyInB(ObjectId),
    ObjectMismatch(ObjectId),
    DieOnlyInA(DieId),
    DieOnlyInB(DieId),
    DieMismatch(DieId),
}

#[derive(Debug, Clone)]
pub struct StateDiff {
    pub is_identical: bool,
    pub subsystems: SubsystemDiff,
    pub entities: Vec<EntityDiff>,
}

pub fn quick_compare(a: &Engine, b: &Engine) -> SubsystemDiff {
    let ha = a.subsystem_hashes();
    let hb = b.subsystem_hashes();
    SubsystemDiff {
        tick_matches: a.tick() == b.tick(),
        objects_match: ha.objects == hb.objects,
        dice_match: ha.dice == hb.dice,
        trucks_match: ha.trucks == hb.trucks,
        economy_matches: ha.economy == hb.economy,
    }
}

/// Compare two engines subsystem by subsystem, then object by object and
/// die by die.
pub fn diff_engines(a: &Engine, b: &Engine) -> StateDiff {
    let subsystems = quick_compare(a, b);
    let (wa, wb) = (a.world(), b.world());
    let mut entities = Vec::new();

    for object in wa.objects.iter() {
        match wb.objects.get(object.id) {
            None => entities.push(EntityDiff::ObjectOnlyInA(object.id)),
            Some(other) if other != object => entities.push(EntityDiff::ObjectMismatch(object.id)),
            Some(_) => {}
        }
    }
    entities.extend(
        wb.objects
            .ids()
            .filter(|&id| wa.objects.get(id).is_none())
            .map(EntityDiff::ObjectOnlyInB),
    );

    for die in wa.dice.iter() {
        match wb.dice.get(die.id) {
            None => entities.push(EntityDiff::DieOnlyInA(die.id)),
            Some(other) if other != die => entities.push(EntityDiff::DieMismatch(die.id)),
            Some(_) => {}
        }
    }
    entities.extend(
        wb.dice
            .ids()
            .filter(|&id| wa.dice.get(id).is_none())
            .map(EntityDiff::DieOnlyInB),
    );

    StateDiff {
        is_identical: entities.is_empty() && subsystems.all_match(),
        subsystems,
        entities,
    }
}

// ---------------------------------------------------------------------------
// Determinism validation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct DeterminismResult {
    pub is_deterministic: bool,
    /// First tick whose hashes differed.
    pub divergence_tick: Option<u64>,
    /// (tick, hash of run A, hash of run B) per tick.
    pub hash_log: Vec<(u64, u64, u64)>,
}

/// Restore `snapshot_data` twice, run both copies for `ticks` ticks and
/// compare their state hashes tick by tick.
pub fn validate_determinism(
    snapshot_data: &[u8],
    ticks: u64,
) -> Result<DeterminismResult, DeserializeError> {
    let mut run_a = Engine::deserialize(snapshot_data)?;
    let mut run_b = Engine::deserialize(snapshot_data)?;
    run_a.resume();
    run_b.resume();

    let mut hash_log = Vec::with_capacity(ticks as usize);
    let mut divergence_tick = None;
    for _ in 0..ticks {
        run_a.step();
        run_b.step();
        let tick = run_a.tick();
        let (ha, hb) = (run_a.state_hash(), run_b.state_hash());
        hash_log.push((tick, ha, hb));
        if ha != hb && divergence_tick.is_none() {
            divergence_tick = Some(tick);
        }
    }

    Ok(DeterminismResult {
        is_deterministic: divergence_tick.is_none(),
        divergence_tick,
        hash_log,
    })
}

/// Run `scenario` twice per seed on the rayon pool and report each seed's
/// final hash together with whether both runs agreed.
#[cfg(feature = "parallel")]
pub fn validate_seeds_parallel(
    config: &SimConfig,
    scenario: &Scenario,
    seeds: &[u64],
    ticks: u64,
) -> Result<Vec<(u64, u64, bool)>, crate::scenario::ScenarioError> {
    use rayon::prelude::*;

    seeds
        .par_iter()
        .map(|&seed| {
            let (a, b) = (
                run_seed(config, scenario, seed, ticks)?,
                run_seed(config, scenario, seed, ticks)?,
            );
            Ok((seed, a, a == b))
        })
        .collect()
}

/// Final state hash after running `scenario` for `ticks` ticks with `seed`.
pub fn run_seed(
    config: &SimConfig,
    scenario: &Scenario,
    seed: u64,
    ticks: u64,
) -> Result<u64, crate::scenario::ScenarioError> {
    let config = SimConfig {
        rng_seed: seed,
        ..config.clone()
    };
    let mut engine = Engine::from_scenario(config, SimulationStrategy::Tick, scenario)?;
    engine.run(ticks);
    Ok(engine.state_hash())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::die::DieKind;
    use crate::grid::Direction;
    use crate::test_utils::*;

    #[test]
    fn starter_world_satisfies_invariants() {
        let mut engine = starter_engine();
        assert_eq!(engine.check_invariants(), Ok(()));
        engine.run(1_000);
        assert_eq!(engine.check_invariants(), Ok(()));
    }

    #[test]
    fn full_storage_passes_check() {
        let mut trailer = Storage::new(2, 1);
        assert!(trailer.store_dice(DieKind::Plain, 3, 2));
        assert!(!trailer.store_die(DieKind::Gold, 1));
        assert_eq!(check_storage(StorageOwner::Trailer(TruckId(1)), &trailer), Ok(()));
    }

    #[test]
    fn collecting_flag_without_truck_detected() {
        let mut engine = test_engine();
        let id = place(&mut engine, ObjectKind::Collector, 1, 1, Direction::East);
        if let Some(object) = engine.world.objects.get_mut(id) {
            object.collecting = true;
        }
        assert_eq!(
            engine.check_invariants(),
            Err(InvariantViolation::CollectingWithoutTruck(id))
        );
    }

    #[test]
    fn die_beyond_grid_detected() {
        let mut engine = test_engine();
        place(&mut engine, ObjectKind::ConveyorBelt, 2, 2, Direction::East);
        let die = engine.spawn_die_at(GridPosition::new(2, 2)).unwrap();
        if let Some(d) = engine.world.dice.get_mut(die) {
            d.position.x = Fixed64::from_num(90_000_000);
        }
        assert_eq!(
            engine.check_invariants(),
            Err(InvariantViolation::DieOutOfBounds(die))
        );
    }

    #[test]
    fn identical_engines_have_no_diff() {
        let mut a = starter_engine();
        let mut b = starter_engine();
        a.run(100);
        b.run(100);
        let diff = diff_engines(&a, &b);
        assert!(diff.is_identical);
        assert!(diff.entities.is_empty());
    }

    #[test]
    fn diff_reports_extra_object() {
        let a = test_engine();
        let mut b = test_engine();
        let id = place(&mut b, ObjectKind::ConveyorBelt, 0, 0, Direction::East);
        let diff = diff_engines(&a, &b);
        assert!(!diff.is_identical);
        assert!(!diff.subsystems.objects_match);
        assert_eq!(diff.entities, vec![EntityDiff::ObjectOnlyInB(id)]);
    }

    #[test]
    fn determinism_holds_from_snapshot() {
        let mut engine = starter_engine();
        engine.run(50);
        let data = engine.serialize().unwrap();
        let result = validate_determinism(&data, 300).unwrap();
        assert!(result.is_deterministic);
        assert_eq!(result.divergence_tick, None);
        assert_eq!(result.hash_log.len(), 300);
        assert_eq!(result.hash_log[0].0, 51);
    }

    #[test]
    fn different_seeds_diverge() {
        let config = SimConfig::default();
        let scenario = Scenario::starter();
        let a = run_seed(&config, &scenario, 1, 600).unwrap();
        let b = run_seed(&config, &scenario, 2, 600).unwrap();
        assert_ne!(a, b);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_seeds_are_reproducible() {
        let results =
            validate_seeds_parallel(&SimConfig::default(), &Scenario::starter(), &[1, 2, 3], 300)
                .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|&(_, _, agreed)| agreed));
    }
}
