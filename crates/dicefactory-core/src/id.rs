use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a placed object (belt, builder, collector, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

/// Identifies a die in flight or at rest on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DieId(pub u64);

/// Identifies a truck on its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TruckId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

impl fmt::Display for DieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "die#{}", self.0)
    }
}

impl fmt::Display for TruckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "truck#{}", self.0)
    }
}

/// Monotonic id source shared by objects, dice and trucks.
///
/// Ids are never reused, so iteration in id order is creation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    last: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.last += 1;
        self.last
    }

    pub fn next_object(&mut self) -> ObjectId {
        ObjectId(self.next())
    }

    pub fn next_die(&mut self) -> DieId {
        DieId(self.next())
    }

    pub fn next_truck(&mut self) -> TruckId {
        TruckId(self.next())
    }

    /// The most recently issued raw id (0 if none).
    pub fn last(&self) -> u64 {
        self.last
    }
}
