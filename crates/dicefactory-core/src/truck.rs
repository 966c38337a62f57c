//! Trucks: the approach / dock / depart cycle that ferries trailer stock to
//! the warehouse.
//!
//! A truck eases from its spawn point to its dock along
//! `spawn + (1 - (p - 1)^2) * (dock - spawn)` as `p` goes 0 to 1, waits
//! docked until sent, then runs the same curve backwards.

use crate::die::RealPoint;
use crate::fixed::Fixed64;
use crate::grid::GridPosition;
use crate::id::{ObjectId, TruckId};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TruckKind {
    Basic,
}

/// Where a truck is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TruckPhase {
    Approaching,
    Docked,
    Departing,
}

/// Fixed route parameters, copied verbatim onto every respawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckRoute {
    pub spawn: GridPosition,
    pub dock: GridPosition,
    /// Footprint in tiles, used for hit testing.
    pub width: u32,
    pub height: u32,
}

impl TruckRoute {
    pub fn new(spawn: GridPosition, dock: GridPosition) -> Self {
        Self {
            spawn,
            dock,
            width: 1,
            height: 2,
        }
    }

    pub fn with_footprint(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TruckError {
    #[error("a truck needs at least one collector")]
    NoCollectors,
    #[error("{0} is not a collector")]
    NotACollector(ObjectId),
    #[error("route tile ({}, {}) lies outside the simulated area", .0.x, .0.y)]
    RouteOutOfRange(GridPosition),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Truck {
    pub id: TruckId,
    pub kind: TruckKind,
    pub route: TruckRoute,
    pub position: RealPoint,
    spawn_real: RealPoint,
    dock_real: RealPoint,
    pub storage: Storage,
    collectors: Vec<ObjectId>,
    percent_complete: Fixed64,
    exiting: bool,
}

impl Truck {
    pub fn new(
        id: TruckId,
        kind: TruckKind,
        route: TruckRoute,
        collectors: Vec<ObjectId>,
        storage: Storage,
        tile_size: u32,
    ) -> Result<Self, TruckError> {
        if collectors.is_empty() {
            return Err(TruckError::NoCollectors);
        }
        let spawn_real = RealPoint::checked_of_tile(route.spawn, tile_size)
            .ok_or(TruckError::RouteOutOfRange(route.spawn))?;
        let dock_real = RealPoint::checked_of_tile(route.dock, tile_size)
            .ok_or(TruckError::RouteOutOfRange(route.dock))?;
        Ok(Self {
            id,
            kind,
            route,
            position: spawn_real,
            spawn_real,
            dock_real,
            storage,
            collectors,
            percent_complete: Fixed64::ZERO,
            exiting: false,
        })
    }

    /// A new truck on the same route with the same collectors, starting
    /// its approach with `storage` as trailer.
    pub fn respawn(&self, id: TruckId, storage: Storage) -> Truck {
        Truck {
            id,
            kind: self.kind,
            route: self.route.clone(),
            position: self.spawn_real,
            spawn_real: self.spawn_real,
            dock_real: self.dock_real,
            storage,
            collectors: self.collectors.clone(),
            percent_complete: Fixed64::ZERO,
            exiting: false,
        }
    }

    pub fn collectors(&self) -> &[ObjectId] {
        &self.collectors
    }

    pub fn percent_complete(&self) -> Fixed64 {
        self.percent_complete
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    pub fn spawn_real(&self) -> RealPoint {
        self.spawn_real
    }

    pub fn dock_real(&self) -> RealPoint {
        self.dock_real
    }

    pub fn phase(&self) -> TruckPhase {
        if self.exiting {
            TruckPhase::Departing
        } else if self.percent_complete >= Fixed64::from_num(1) {
            TruckPhase::Docked
        } else {
            TruckPhase::Approaching
        }
    }

    /// At a terminal progress value with no pending direction change:
    /// docked, or fully out after departing. `step` must not run.
    pub fn is_at_rest(&self) -> bool {
        if self.exiting {
            self.percent_complete <= Fixed64::ZERO
        } else {
            self.percent_complete >= Fixed64::from_num(1)
        }
    }

    /// Advance (or retreat when exiting) by `increment` and reposition.
    ///
    /// Returns `true` exactly on the call whose move hits the 0 or 1 clamp.
    pub fn step(&mut self, increment: Fixed64) -> bool {
        let one = Fixed64::from_num(1);
        let mut clamped = false;
        if self.exiting {
            self.percent_complete -= increment;
            if self.percent_complete <= Fixed64::ZERO {
                self.percent_complete = Fixed64::ZERO;
                clamped = true;
            }
        } else {
            self.percent_complete += increment;
            if self.percent_complete >= one {
                self.percent_complete = one;
                clamped = true;
            }
        }
        self.position = self.eased_position();
        clamped
    }

    fn eased_position(&self) -> RealPoint {
        let one = Fixed64::from_num(1);
        let offset = self.percent_complete - one;
        let eased = one - offset * offset;
        RealPoint::new(
            self.spawn_real.x + eased * (self.dock_real.x - self.spawn_real.x),
            self.spawn_real.y + eased * (self.dock_real.y - self.spawn_real.y),
        )
    }

    /// Start departing. Only a docked truck can be sent.
    pub fn send(&mut self) -> bool {
        if self.phase() != TruckPhase::Docked {
            return false;
        }
        self.exiting = true;
        true
    }

    /// Whether `tile` falls inside the truck's current footprint.
    pub fn covers(&self, tile: GridPosition, tile_size: u32) -> bool {
        let origin = self.position.to_tile(tile_size);
        let (Some(dx), Some(dy)) = (tile.x.checked_sub(origin.x), tile.y.checked_sub(origin.y))
        else {
            return false;
        };
        dx >= 0 && dy >= 0 && (dx as u32) < self.route.width && (dy as u32) < self.route.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_truck() -> Truck {
        Truck::new(
            TruckId(1),
            TruckKind::Basic,
            TruckRoute::new(GridPosition::new(0, -4), GridPosition::new(0, 4)),
            vec![ObjectId(9)],
            Storage::new(10, 1),
            32,
        )
        .unwrap()
    }

    #[test]
    fn new_without_collectors_fails() {
        let err = Truck::new(
            TruckId(1),
            TruckKind::Basic,
            TruckRoute::new(GridPosition::new(0, 0), GridPosition::new(0, 1)),
            Vec::new(),
            Storage::new(10, 1),
            32,
        )
        .unwrap_err();
        assert_eq!(err, TruckError::NoCollectors);
    }

    #[test]
    fn approach_clamps_once_at_dock() {
        let mut truck = make_truck();
        let quarter = Fixed64::from_num(0.25);
        assert!(!truck.step(quarter));
        assert!(!truck.step(quarter));
        assert!(!truck.step(quarter));
        assert_eq!(truck.phase(), TruckPhase::Approaching);
        assert!(truck.step(quarter));
        assert_eq!(truck.phase(), TruckPhase::Docked);
        assert_eq!(truck.position, truck.dock_real());
        assert!(truck.is_at_rest());
    }

    #[test]
    fn easing_is_ahead_of_linear() {
        let mut truck = make_truck();
        truck.step(Fixed64::from_num(0.5));
        // 1 - (0.5 - 1)^2 = 0.75 of the way from y=-128 to y=128.
        assert_eq!(truck.position.y, Fixed64::from_num(64));
    }

    #[test]
    fn send_only_when_docked() {
        let mut truck = make_truck();
        assert!(!truck.send());
        truck.step(Fixed64::from_num(1));
        assert!(truck.send());
        assert_eq!(truck.phase(), TruckPhase::Departing);
        assert!(!truck.send());
    }

    #[test]
    fn departure_returns_to_spawn() {
        let mut truck = make_truck();
        truck.step(Fixed64::from_num(1));
        truck.send();
        assert!(!truck.step(Fixed64::from_num(0.5)));
        assert!(truck.step(Fixed64::from_num(0.75)));
        assert_eq!(truck.percent_complete(), Fixed64::ZERO);
        assert_eq!(truck.position, truck.spawn_real());
        assert!(truck.is_at_rest());
    }

    #[test]
    fn respawn_copies_route_with_fresh_trailer() {
        let mut truck = make_truck();
        truck.step(Fixed64::from_num(1));
        truck.storage.store_die(crate::die::DieKind::Plain, 3);
        truck.send();
        let next = truck.respawn(TruckId(2), Storage::new(10, 1));
        assert_eq!(next.route, truck.route);
        assert_eq!(next.collectors(), truck.collectors());
        assert!(next.storage.is_empty());
        assert_eq!(next.phase(), TruckPhase::Approaching);
        assert_eq!(next.position, next.spawn_real());
    }

    #[test]
    fn covers_footprint_tiles() {
        let mut truck = make_truck();
        truck.step(Fixed64::from_num(1));
        assert!(truck.covers(GridPosition::new(0, 4), 32));
        assert!(truck.covers(GridPosition::new(0, 5), 32));
        assert!(!truck.covers(GridPosition::new(1, 4), 32));
        assert!(!truck.covers(GridPosition::new(0, 6), 32));
        assert!(!truck.covers(GridPosition::new(i32::MIN, i32::MAX), 32));
    }

    #[test]
    fn route_beyond_pixel_extent_rejected() {
        let far = GridPosition::new(1, -100_000_000);
        let err = Truck::new(
            TruckId(1),
            TruckKind::Basic,
            TruckRoute::new(far, GridPosition::new(1, 0)),
            vec![ObjectId(9)],
            Storage::new(10, 1),
            32,
        )
        .unwrap_err();
        assert_eq!(err, TruckError::RouteOutOfRange(far));
    }
}
