//! Dice: the mobile tokens routed between tiles.
//!
//! A die always has exactly one target tile. It is either in flight (its
//! real position differs from the target's real position) or resting
//! (exactly equal). Motion is per-axis with a carry value that banks the
//! distance budget left over when a step snaps onto the target.

use crate::fixed::{Fixed64, MAX_REAL_EXTENT};
use crate::grid::GridPosition;
use crate::id::DieId;
use crate::rng::SimRng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DieKind {
    Plain,
    Gold,
}

impl DieKind {
    pub fn all() -> [DieKind; 2] {
        [DieKind::Plain, DieKind::Gold]
    }
}

/// A point in real (pixel) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealPoint {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl RealPoint {
    pub fn new(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }

    /// Top-left corner of `tile` for tiles `tile_size` units wide.
    pub fn of_tile(tile: GridPosition, tile_size: u32) -> Self {
        let size = Fixed64::from_num(tile_size);
        Self {
            x: Fixed64::from_num(tile.x) * size,
            y: Fixed64::from_num(tile.y) * size,
        }
    }

    /// [`RealPoint::of_tile`], or `None` when a coordinate lies beyond
    /// [`MAX_REAL_EXTENT`].
    pub fn checked_of_tile(tile: GridPosition, tile_size: u32) -> Option<Self> {
        let scale = |v: i32| {
            let real = i64::from(v) * i64::from(tile_size);
            (real.abs() <= MAX_REAL_EXTENT).then(|| Fixed64::from_num(real))
        };
        Some(Self {
            x: scale(tile.x)?,
            y: scale(tile.y)?,
        })
    }

    /// The tile containing this point (floor division).
    pub fn to_tile(&self, tile_size: u32) -> GridPosition {
        let size = Fixed64::from_num(tile_size.max(1));
        GridPosition::new(
            (self.x / size).floor().to_num::<i32>(),
            (self.y / size).floor().to_num::<i32>(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Die {
    pub id: DieId,
    pub kind: DieKind,
    /// Rolled face, 1 through 6.
    pub face: u8,
    pub position: RealPoint,
    target: GridPosition,
    pub carry_x: Fixed64,
    pub carry_y: Fixed64,
}

impl Die {
    /// A freshly rolled die resting on `tile`.
    pub fn new(id: DieId, kind: DieKind, tile: GridPosition, tile_size: u32, rng: &mut SimRng) -> Self {
        let mut die = Self {
            id,
            kind,
            face: 1,
            position: RealPoint::of_tile(tile, tile_size),
            target: tile,
            carry_x: Fixed64::ZERO,
            carry_y: Fixed64::ZERO,
        };
        die.roll(rng);
        die
    }

    /// Assign a new face uniformly from 1..=6.
    pub fn roll(&mut self, rng: &mut SimRng) {
        self.face = rng.roll_d6();
    }

    pub fn target(&self) -> GridPosition {
        self.target
    }

    /// Whether the die sits exactly on `target_real`.
    pub fn is_at(&self, target_real: RealPoint) -> bool {
        self.position == target_real
    }

    /// One motion step toward `target_real` with `budget` units per axis.
    pub fn advance(&mut self, target_real: RealPoint, budget: Fixed64) {
        let (x, carry_x) = step_axis(self.position.x, target_real.x, self.carry_x, budget);
        let (y, carry_y) = step_axis(self.position.y, target_real.y, self.carry_y, budget);
        self.position = RealPoint::new(x, y);
        self.carry_x = carry_x;
        self.carry_y = carry_y;
    }
}

/// Advance one axis toward `target`. Returns the new position and carry.
///
/// A short remaining distance snaps and banks the unused budget as carry.
/// A long one moves `budget + carry`, clamped at the target so the die never
/// passes it; whatever the clamp cuts off stays banked.
pub fn step_axis(position: Fixed64, target: Fixed64, carry: Fixed64, budget: Fixed64) -> (Fixed64, Fixed64) {
    let delta = target - position;
    let distance = delta.abs();

    if distance < budget {
        if distance == Fixed64::ZERO {
            return (target, carry);
        }
        return (target, carry + (budget - distance));
    }

    let travel = budget + carry;
    if travel >= distance {
        return (target, travel - distance);
    }
    if delta > Fixed64::ZERO {
        (position + travel, Fixed64::ZERO)
    } else {
        (position - travel, Fixed64::ZERO)
    }
}

// ---------------------------------------------------------------------------
// DieSet
// ---------------------------------------------------------------------------

/// Every live die plus the reverse index "which dice target this tile".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Die>", into = "Vec<Die>")]
pub struct DieSet {
    dice: BTreeMap<DieId, Die>,
    by_target: BTreeMap<GridPosition, BTreeSet<DieId>>,
}

impl From<Vec<Die>> for DieSet {
    fn from(dice: Vec<Die>) -> Self {
        let mut set = DieSet::new();
        for die in dice {
            set.insert(die);
        }
        set
    }
}

impl From<DieSet> for Vec<Die> {
    fn from(set: DieSet) -> Self {
        set.dice.into_values().collect()
    }
}

impl DieSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, die: Die) {
        self.by_target.entry(die.target).or_default().insert(die.id);
        self.dice.insert(die.id, die);
    }

    pub fn remove(&mut self, id: DieId) -> Option<Die> {
        let die = self.dice.remove(&id)?;
        self.untrack(die.target, id);
        Some(die)
    }

    fn untrack(&mut self, tile: GridPosition, id: DieId) {
        if let Some(ids) = self.by_target.get_mut(&tile) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_target.remove(&tile);
            }
        }
    }

    /// Point a die at a new tile. Motion toward it is gradual.
    pub fn set_target(&mut self, id: DieId, tile: GridPosition) -> bool {
        let Some(die) = self.dice.get_mut(&id) else {
            return false;
        };
        let previous = die.target;
        die.target = tile;
        self.untrack(previous, id);
        self.by_target.entry(tile).or_default().insert(id);
        true
    }

    pub fn get(&self, id: DieId) -> Option<&Die> {
        self.dice.get(&id)
    }

    /// Mutable access for motion and kind changes. Retarget through
    /// [`set_target`](Self::set_target).
    pub fn get_mut(&mut self, id: DieId) -> Option<&mut Die> {
        self.dice.get_mut(&id)
    }

    /// How many dice currently target `tile`.
    pub fn count_targeting(&self, tile: GridPosition) -> usize {
        self.by_target.get(&tile).map_or(0, BTreeSet::len)
    }

    pub fn targeting(&self, tile: GridPosition) -> impl Iterator<Item = DieId> + '_ {
        self.by_target.get(&tile).into_iter().flatten().copied()
    }

    /// The die resting on `tile`: exactly one die targets it and that die
    /// has arrived at `tile_real`.
    pub fn resting_on(&self, tile: GridPosition, tile_real: RealPoint) -> Option<DieId> {
        let ids = self.by_target.get(&tile)?;
        if ids.len() != 1 {
            return None;
        }
        let id = *ids.iter().next()?;
        self.dice.get(&id).filter(|d| d.is_at(tile_real)).map(|d| d.id)
    }

    /// Die ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = DieId> + '_ {
        self.dice.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Die> {
        self.dice.values()
    }

    pub(crate) fn target_index(&self) -> impl Iterator<Item = (&GridPosition, &BTreeSet<DieId>)> {
        self.by_target.iter()
    }

    pub fn len(&self) -> usize {
        self.dice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dice.is_empty()
    }
}
