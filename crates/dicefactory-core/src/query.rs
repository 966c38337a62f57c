//! Read-only query API for inspecting simulation state.
//!
//! Provides snapshot types that aggregate engine state into convenient views
//! for rendering and UI. All types are owned copies -- no references into
//! internal engine storage. Real coordinates are converted to `f64`.

use crate::die::{DieKind, RealPoint};
use crate::economy::CurrencyKind;
use crate::engine::Engine;
use crate::fixed::{fixed64_to_f64, Ticks};
use crate::grid::{Direction, GridPosition, ObjectKind};
use crate::id::{DieId, ObjectId, TruckId};
use crate::truck::{TruckKind, TruckPhase};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// A placed object as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: GridPosition,
    pub facing: Direction,
    /// True while a docked truck is taking dice from this collector.
    pub collecting: bool,
}

/// A live die. `x`/`y` are real (pixel) coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DieSnapshot {
    pub id: DieId,
    pub kind: DieKind,
    pub face: u8,
    pub x: f64,
    pub y: f64,
    pub target: GridPosition,
    /// Arrived at its target tile.
    pub resting: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TruckSnapshot {
    pub id: TruckId,
    pub kind: TruckKind,
    pub x: f64,
    pub y: f64,
    /// Footprint in tiles.
    pub width: u32,
    pub height: u32,
    pub phase: TruckPhase,
    /// 0 at spawn, 1 at the dock.
    pub progress: f64,
    pub trailer_count: u64,
    pub trailer_capacity: u64,
    pub trailer_kinds: Vec<DieKind>,
}

/// A kind the player can buy right now, with its next price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotbarEntry {
    pub kind: ObjectKind,
    pub currency: CurrencyKind,
    pub cost: u64,
}

/// Everything a frame needs, copied out of the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub tick: Ticks,
    pub grid_width: u32,
    pub grid_height: u32,
    pub tile_size: u32,
    pub objects: Vec<ObjectSnapshot>,
    pub dice: Vec<DieSnapshot>,
    pub trucks: Vec<TruckSnapshot>,
    pub warehouse_count: u64,
    pub warehouse_capacity: u64,
    pub balances: Vec<(CurrencyKind, u64)>,
    pub hotbar: Vec<HotbarEntry>,
}

fn real_to_f64(point: RealPoint) -> (f64, f64) {
    (fixed64_to_f64(point.x), fixed64_to_f64(point.y))
}

// ---------------------------------------------------------------------------
// Engine queries
// ---------------------------------------------------------------------------

impl Engine {
    pub fn snapshot_object(&self, id: ObjectId) -> Option<ObjectSnapshot> {
        let object = self.world.objects.get(id)?;
        Some(ObjectSnapshot {
            id,
            kind: object.kind,
            position: object.position,
            facing: object.facing,
            collecting: object.collecting,
        })
    }

    pub fn snapshot_die(&self, id: DieId) -> Option<DieSnapshot> {
        let die = self.world.dice.get(id)?;
        let (x, y) = real_to_f64(die.position);
        Some(DieSnapshot {
            id,
            kind: die.kind,
            face: die.face,
            x,
            y,
            target: die.target(),
            resting: die.is_at(self.tile_real(die.target())),
        })
    }

    pub fn snapshot_truck(&self, id: TruckId) -> Option<TruckSnapshot> {
        let truck = self.world.truck(id)?;
        let (x, y) = real_to_f64(truck.position);
        Some(TruckSnapshot {
            id,
            kind: truck.kind,
            x,
            y,
            width: truck.route.width,
            height: truck.route.height,
            phase: truck.phase(),
            progress: fixed64_to_f64(truck.percent_complete()),
            trailer_count: truck.storage.count(),
            trailer_capacity: truck.storage.capacity(),
            trailer_kinds: truck.storage.kinds_present().collect(),
        })
    }

    /// Purchasable, unlocked kinds with their current prices.
    pub fn hotbar(&self) -> Vec<HotbarEntry> {
        ObjectKind::all()
            .into_iter()
            .filter(|&kind| {
                self.is_unlocked(kind) && self.config.objects.get(kind).cost.is_purchasable()
            })
            .map(|kind| {
                let (currency, cost) = self.cost(kind);
                HotbarEntry {
                    kind,
                    currency,
                    cost,
                }
            })
            .collect()
    }

    /// Snapshot of the whole world, suitable for one rendered frame.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick(),
            grid_width: self.config.grid_width,
            grid_height: self.config.grid_height,
            tile_size: self.config.tile_size,
            objects: self
                .world
                .objects
                .ids()
                .filter_map(|id| self.snapshot_object(id))
                .collect(),
            dice: self
                .world
                .dice
                .ids()
                .filter_map(|id| self.snapshot_die(id))
                .collect(),
            trucks: self
                .world
                .trucks
                .iter()
                .filter_map(|t| self.snapshot_truck(t.id))
                .collect(),
            warehouse_count: self.world.warehouse.count(),
            warehouse_capacity: self.world.warehouse.capacity(),
            balances: CurrencyKind::all()
                .into_iter()
                .map(|c| (c, self.balance(c)))
                .collect(),
            hotbar: self.hotbar(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.world.objects.len()
    }

    pub fn die_count(&self) -> usize {
        self.world.dice.len()
    }

    pub fn truck_ids(&self) -> Vec<TruckId> {
        self.world.trucks.iter().map(|t| t.id).collect()
    }
}
