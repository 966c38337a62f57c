//! Capacity- and type-bounded dice stock.
//!
//! One `Storage` is the warehouse; every truck trailer owns another.
//! Operations return `bool` success: a full store or an empty bucket is an
//! expected outcome, not an error.

use crate::die::DieKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    capacity: u64,
    /// Maximum number of distinct die kinds; 0 means unlimited.
    type_limit: usize,
    dice: BTreeMap<DieKind, BTreeMap<u8, u64>>,
    count: u64,
    distinct_types: usize,
}

impl Storage {
    pub fn new(capacity: u64, type_limit: usize) -> Self {
        Self {
            capacity,
            type_limit,
            dice: BTreeMap::new(),
            count: 0,
            distinct_types: 0,
        }
    }

    /// Whether `kind` may be stored given the type limit.
    fn admits(&self, kind: DieKind) -> bool {
        self.dice.contains_key(&kind) || self.type_limit == 0 || self.distinct_types < self.type_limit
    }

    /// Store one die.
    pub fn store_die(&mut self, kind: DieKind, face: u8) -> bool {
        self.store_dice(kind, face, 1)
    }

    /// Store `n` dice of one kind and face, or nothing at all.
    pub fn store_dice(&mut self, kind: DieKind, face: u8, n: u64) -> bool {
        if n == 0 {
            return true;
        }
        match self.count.checked_add(n) {
            Some(total) if total <= self.capacity => {}
            _ => return false,
        }
        if !self.admits(kind) {
            return false;
        }
        let faces = self.dice.entry(kind).or_insert_with(|| {
            self.distinct_types += 1;
            BTreeMap::new()
        });
        *faces.entry(face).or_insert(0) += n;
        self.count += n;
        true
    }

    /// Remove one die of `kind`/`face`. Fails if that bucket is empty.
    ///
    /// An emptied face bucket is dropped; the kind entry stays, so it keeps
    /// counting toward the type limit until the storage is replaced.
    pub fn remove_die(&mut self, kind: DieKind, face: u8) -> bool {
        let Some(faces) = self.dice.get_mut(&kind) else {
            return false;
        };
        let Some(quantity) = faces.get_mut(&face) else {
            return false;
        };
        if *quantity == 0 {
            return false;
        }
        *quantity -= 1;
        if *quantity == 0 {
            faces.remove(&face);
        }
        self.count -= 1;
        true
    }

    /// Merge every bucket of `other` into `self`, all or nothing.
    pub fn load(&mut self, other: &Storage) -> bool {
        match self.count.checked_add(other.count) {
            Some(total) if total <= self.capacity => {}
            _ => return false,
        }
        let new_kinds = other
            .kinds_present()
            .filter(|kind| !self.dice.contains_key(kind))
            .count();
        if self.type_limit > 0 && self.distinct_types + new_kinds > self.type_limit {
            return false;
        }
        for (&kind, faces) in &other.dice {
            for (&face, &quantity) in faces {
                if !self.store_dice(kind, face, quantity) {
                    return false;
                }
            }
        }
        true
    }

    /// Kinds that currently hold at least one die, in kind order.
    pub fn kinds_present(&self) -> impl Iterator<Item = DieKind> + '_ {
        self.dice
            .iter()
            .filter(|(_, faces)| faces.values().any(|&q| q > 0))
            .map(|(&kind, _)| kind)
    }

    /// Faces of `kind` with at least one die, in face order.
    pub fn faces_present(&self, kind: DieKind) -> Vec<u8> {
        self.dice
            .get(&kind)
            .map(|faces| faces.iter().filter(|(_, q)| **q > 0).map(|(&f, _)| f).collect())
            .unwrap_or_default()
    }

    pub fn quantity(&self, kind: DieKind, face: u8) -> u64 {
        self.dice
            .get(&kind)
            .and_then(|faces| faces.get(&face))
            .copied()
            .unwrap_or(0)
    }

    /// Total dice of `kind` across all faces.
    pub fn quantity_of_kind(&self, kind: DieKind) -> u64 {
        self.dice.get(&kind).map_or(0, |faces| faces.values().sum())
    }

    pub fn buckets(&self) -> impl Iterator<Item = (DieKind, u8, u64)> + '_ {
        self.dice
            .iter()
            .flat_map(|(&kind, faces)| faces.iter().map(move |(&face, &q)| (kind, face, q)))
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn type_limit(&self) -> usize {
        self.type_limit
    }

    pub fn distinct_types(&self) -> usize {
        self.distinct_types
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }
}
