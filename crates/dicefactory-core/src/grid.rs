//! Tile grid and object placement index.
//!
//! Every placed machine occupies exactly one tile. [`ObjectIndex`] owns the
//! objects (keyed by [`ObjectId`]) and a tile lookup kept in lockstep with
//! them, plus the per-kind placement counts that drive purchase costs.

use crate::id::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A position on the 2D tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent tile in `direction`.
    pub fn step(&self, direction: Direction) -> GridPosition {
        let (dx, dy) = direction.offset();
        GridPosition::new(self.x + dx, self.y + dy)
    }
}

/// Cardinal facing. Rotation walks the fixed cycle South, West, North, East.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    South,
    West,
    North,
    East,
}

impl Direction {
    /// All four cardinal directions, in rotation order.
    pub fn all() -> [Direction; 4] {
        [
            Direction::South,
            Direction::West,
            Direction::North,
            Direction::East,
        ]
    }

    /// Offset for this direction. Screen coordinates: y grows southward.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    /// The next direction in the rotation cycle.
    pub fn rotated(&self) -> Direction {
        match self {
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            Direction::North => Direction::East,
            Direction::East => Direction::South,
        }
    }
}

/// The closed set of machines that can sit on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Plain,
    ConveyorBelt,
    Builder,
    Collector,
    Upgrader,
}

impl ObjectKind {
    pub fn all() -> [ObjectKind; 5] {
        [
            ObjectKind::Plain,
            ObjectKind::ConveyorBelt,
            ObjectKind::Builder,
            ObjectKind::Collector,
            ObjectKind::Upgrader,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Plain => "plain",
            ObjectKind::ConveyorBelt => "conveyor_belt",
            ObjectKind::Builder => "builder",
            ObjectKind::Collector => "collector",
            ObjectKind::Upgrader => "upgrader",
        }
    }
}

/// A placed machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: GridPosition,
    pub facing: Direction,
    /// Set while a truck referencing this collector is docked.
    #[serde(default)]
    pub collecting: bool,
}

impl Object {
    /// The tile this object hands dice to.
    pub fn facing_tile(&self) -> GridPosition {
        self.position.step(self.facing)
    }
}

/// Errors from placing or relocating an object.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("tile ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(GridPosition),
    #[error("tile ({}, {}) is occupied", .0.x, .0.y)]
    Occupied(GridPosition),
}

// ---------------------------------------------------------------------------
// ObjectIndex
// ---------------------------------------------------------------------------

/// Objects by id, the tile lookup, and per-kind placement counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ObjectIndexData", into = "ObjectIndexData")]
pub struct ObjectIndex {
    width: u32,
    height: u32,
    objects: BTreeMap<ObjectId, Object>,
    tiles: BTreeMap<GridPosition, ObjectId>,
    placed: BTreeMap<ObjectKind, u64>,
}

/// Persisted shape of [`ObjectIndex`]; the tile lookup is rebuilt on load.
#[derive(Serialize, Deserialize)]
struct ObjectIndexData {
    width: u32,
    height: u32,
    objects: Vec<Object>,
    placed: Vec<(ObjectKind, u64)>,
}

impl From<ObjectIndex> for ObjectIndexData {
    fn from(index: ObjectIndex) -> Self {
        Self {
            width: index.width,
            height: index.height,
            objects: index.objects.into_values().collect(),
            placed: index.placed.into_iter().collect(),
        }
    }
}

impl From<ObjectIndexData> for ObjectIndex {
    fn from(data: ObjectIndexData) -> Self {
        let mut index = ObjectIndex::new(data.width, data.height);
        for object in data.objects {
            index.tiles.insert(object.position, object.id);
            index.objects.insert(object.id, object);
        }
        index.placed = data.placed.into_iter().collect();
        index
    }
}

impl ObjectIndex {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            objects: BTreeMap::new(),
            tiles: BTreeMap::new(),
            placed: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn in_bounds(&self, position: GridPosition) -> bool {
        position.x >= 0
            && position.y >= 0
            && (position.x as u32) < self.width
            && (position.y as u32) < self.height
    }

    /// Check that `position` can take a new object.
    pub fn can_place(&self, position: GridPosition) -> Result<(), PlacementError> {
        if !self.in_bounds(position) {
            return Err(PlacementError::OutOfBounds(position));
        }
        if self.tiles.contains_key(&position) {
            return Err(PlacementError::Occupied(position));
        }
        Ok(())
    }

    /// Insert an object at its own position and bump its kind's count.
    pub fn insert(&mut self, object: Object) -> Result<(), PlacementError> {
        self.can_place(object.position)?;
        self.tiles.insert(object.position, object.id);
        *self.placed.entry(object.kind).or_insert(0) += 1;
        self.objects.insert(object.id, object);
        Ok(())
    }

    /// Remove an object, freeing its tile and decrementing its kind's count.
    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        let object = self.objects.remove(&id)?;
        self.tiles.remove(&object.position);
        if let Some(count) = self.placed.get_mut(&object.kind) {
            *count = count.saturating_sub(1);
        }
        Some(object)
    }

    /// Move an object to an empty in-bounds tile. Returns the tile it left,
    /// or `None` for an unknown id.
    pub fn relocate(
        &mut self,
        id: ObjectId,
        to: GridPosition,
    ) -> Result<Option<GridPosition>, PlacementError> {
        self.can_place(to)?;
        let Some(object) = self.objects.get_mut(&id) else {
            return Ok(None);
        };
        let from = object.position;
        object.position = to;
        self.tiles.remove(&from);
        self.tiles.insert(to, id);
        Ok(Some(from))
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    /// Mutable access. Callers must not change `position` or `kind`; use
    /// [`relocate`](Self::relocate) to move.
    pub(crate) fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn id_at(&self, position: GridPosition) -> Option<ObjectId> {
        self.tiles.get(&position).copied()
    }

    pub fn object_at(&self, position: GridPosition) -> Option<&Object> {
        self.id_at(position).and_then(|id| self.objects.get(&id))
    }

    pub fn is_occupied(&self, position: GridPosition) -> bool {
        self.tiles.contains_key(&position)
    }

    /// The object on the tile `object` faces, if any.
    pub fn neighbor_of(&self, object: &Object) -> Option<&Object> {
        self.object_at(object.facing_tile())
    }

    /// How many objects of `kind` are currently placed.
    pub fn placed_count(&self, kind: ObjectKind) -> u64 {
        self.placed.get(&kind).copied().unwrap_or(0)
    }

    /// Object ids in creation order.
    pub fn ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Object> {
        self.objects.values()
    }

    pub(crate) fn tiles(&self) -> impl Iterator<Item = (&GridPosition, &ObjectId)> {
        self.tiles.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
