//! Typed event system with pre-allocated ring buffers.
//!
//! Events are emitted while a tick runs (and by input entry points between
//! ticks) and delivered in batch at the end of the next tick. Each event
//! kind has its own [`EventBuffer`] with a configurable capacity.
//!
//! Listeners are passive: they observe events read-only and never mutate
//! the simulation. Hosts use them for sound, UI notifications and stats.
//!
//! # Suppression
//!
//! Event kinds can be suppressed via [`EventBus::suppress`], which prevents
//! any allocation or recording for that kind.

use crate::die::DieKind;
use crate::economy::CurrencyKind;
use crate::fixed::Ticks;
use crate::grid::{Direction, GridPosition, ObjectKind};
use crate::id::{DieId, ObjectId, TruckId};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// A simulation event. Every variant carries the tick it happened on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    ObjectPlaced {
        object: ObjectId,
        kind: ObjectKind,
        position: GridPosition,
        tick: Ticks,
    },
    ObjectRemoved {
        object: ObjectId,
        kind: ObjectKind,
        position: GridPosition,
        tick: Ticks,
    },
    ObjectMoved {
        object: ObjectId,
        from: GridPosition,
        to: GridPosition,
        tick: Ticks,
    },
    ObjectRotated {
        object: ObjectId,
        facing: Direction,
        tick: Ticks,
    },
    /// A kind became purchasable.
    ObjectUnlocked {
        kind: ObjectKind,
        tick: Ticks,
    },
    Purchase {
        kind: ObjectKind,
        currency: CurrencyKind,
        amount: u64,
        tick: Ticks,
    },
    DieSpawned {
        die: DieId,
        position: GridPosition,
        face: u8,
        tick: Ticks,
    },
    DieForwarded {
        die: DieId,
        from: GridPosition,
        to: GridPosition,
        tick: Ticks,
    },
    DieUpgraded {
        die: DieId,
        tick: Ticks,
    },
    /// A collector loaded a die into a docked truck and credited its value.
    DieCollected {
        die: DieId,
        collector: ObjectId,
        truck: TruckId,
        currency: CurrencyKind,
        value: u64,
        tick: Ticks,
    },
    /// A collector with no docked truck threw a die away.
    DieDiscarded {
        die: DieId,
        collector: ObjectId,
        tick: Ticks,
    },
    /// A die lost the object under its target tile.
    DieOrphaned {
        die: DieId,
        target: GridPosition,
        tick: Ticks,
    },
    TruckDocked {
        truck: TruckId,
        tick: Ticks,
    },
    TruckSent {
        truck: TruckId,
        tick: Ticks,
    },
    /// A departed truck's trailer was merged into the warehouse, or lost
    /// when the warehouse could not take all of it.
    TruckUnloaded {
        truck: TruckId,
        quantity: u64,
        lost: bool,
        tick: Ticks,
    },
    TruckRespawned {
        old: TruckId,
        new: TruckId,
        tick: Ticks,
    },
    DieSold {
        kind: DieKind,
        face: u8,
        currency: CurrencyKind,
        value: u64,
        tick: Ticks,
    },
}

/// Discriminant for event kinds, used for subscription and suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ObjectPlaced,
    ObjectRemoved,
    ObjectMoved,
    ObjectRotated,
    ObjectUnlocked,
    Purchase,
    DieSpawned,
    DieForwarded,
    DieUpgraded,
    DieCollected,
    DieDiscarded,
    DieOrphaned,
    TruckDocked,
    TruckSent,
    TruckUnloaded,
    TruckRespawned,
    DieSold,
}

/// Total number of event kinds.
const EVENT_KIND_COUNT: usize = 17;

impl Event {
    /// Get the discriminant kind for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ObjectPlaced { .. } => EventKind::ObjectPlaced,
            Event::ObjectRemoved { .. } => EventKind::ObjectRemoved,
            Event::ObjectMoved { .. } => EventKind::ObjectMoved,
            Event::ObjectRotated { .. } => EventKind::ObjectRotated,
            Event::ObjectUnlocked { .. } => EventKind::ObjectUnlocked,
            Event::Purchase { .. } => EventKind::Purchase,
            Event::DieSpawned { .. } => EventKind::DieSpawned,
            Event::DieForwarded { .. } => EventKind::DieForwarded,
            Event::DieUpgraded { .. } => EventKind::DieUpgraded,
            Event::DieCollected { .. } => EventKind::DieCollected,
            Event::DieDiscarded { .. } => EventKind::DieDiscarded,
            Event::DieOrphaned { .. } => EventKind::DieOrphaned,
            Event::TruckDocked { .. } => EventKind::TruckDocked,
            Event::TruckSent { .. } => EventKind::TruckSent,
            Event::TruckUnloaded { .. } => EventKind::TruckUnloaded,
            Event::TruckRespawned { .. } => EventKind::TruckRespawned,
            Event::DieSold { .. } => EventKind::DieSold,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            Event::ObjectPlaced { tick, .. }
            | Event::ObjectRemoved { tick, .. }
            | Event::ObjectMoved { tick, .. }
            | Event::ObjectRotated { tick, .. }
            | Event::ObjectUnlocked { tick, .. }
            | Event::Purchase { tick, .. }
            | Event::DieSpawned { tick, .. }
            | Event::DieForwarded { tick, .. }
            | Event::DieUpgraded { tick, .. }
            | Event::DieCollected { tick, .. }
            | Event::DieDiscarded { tick, .. }
            | Event::DieOrphaned { tick, .. }
            | Event::TruckDocked { tick, .. }
            | Event::TruckSent { tick, .. }
            | Event::TruckUnloaded { tick, .. }
            | Event::TruckRespawned { tick, .. }
            | Event::DieSold { tick, .. } => *tick,
        }
    }
}

impl EventKind {
    /// Convert to usize index for array lookups.
    fn index(self) -> usize {
        self as usize
    }
}

// ---------------------------------------------------------------------------
// EventBuffer -- pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: Vec<Option<Event>>,
    /// Next write position; also the oldest entry once full.
    head: usize,
    len: usize,
    /// Total events ever written (including dropped).
    total_written: u64,
    dropped: u64,
}

impl EventBuffer {
    /// Create a new ring buffer with the given capacity.
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    /// Push an event. If full, the oldest event is overwritten.
    pub fn push(&mut self, event: Event) {
        let capacity = self.capacity();
        if self.len == capacity {
            self.dropped += 1;
        }
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % capacity;
        self.len = (self.len + 1).min(capacity);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events overwritten before they could be delivered.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Iterate over events from oldest to newest.
    pub fn iter(&self) -> EventBufferIter<'_> {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        EventBufferIter {
            buffer: self,
            index: start,
            remaining: self.len,
        }
    }

    /// Drop buffered events. Counters are kept.
    pub fn clear(&mut self) {
        self.events.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

/// Iterator over an [`EventBuffer`], oldest first.
pub struct EventBufferIter<'a> {
    buffer: &'a EventBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for EventBufferIter<'a> {
    type Item = &'a Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let event = self.buffer.events[self.index].as_ref();
        self.index = (self.index + 1) % self.buffer.capacity();
        self.remaining -= 1;
        event
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for EventBufferIter<'_> {}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// A passive listener receives events read-only.
pub type PassiveListener = Box<dyn FnMut(&Event)>;

/// Optional predicate a listener can attach; events it rejects are skipped.
pub type EventFilter = Box<dyn Fn(&Event) -> bool>;

struct Listener {
    callback: PassiveListener,
    filter: Option<EventFilter>,
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("filtered", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Holds one ring buffer per event kind, listener lists, and suppression
/// flags.
pub struct EventBus {
    buffers: [Option<EventBuffer>; EVENT_KIND_COUNT],
    suppressed: [bool; EVENT_KIND_COUNT],
    listeners: [Vec<Listener>; EVENT_KIND_COUNT],
    default_capacity: usize,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("buffers", &self.buffers)
            .field("suppressed", &self.suppressed)
            .field("default_capacity", &self.default_capacity)
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity per kind.
    pub fn new(default_capacity: usize) -> Self {
        Self {
            buffers: Default::default(),
            suppressed: [false; EVENT_KIND_COUNT],
            listeners: std::array::from_fn(|_| Vec::new()),
            default_capacity,
        }
    }

    /// Suppress an event kind. Suppressed events are never buffered.
    pub fn suppress(&mut self, kind: EventKind) {
        self.suppressed[kind.index()] = true;
        self.buffers[kind.index()] = None;
    }

    pub fn is_suppressed(&self, kind: EventKind) -> bool {
        self.suppressed[kind.index()]
    }

    /// Buffer an event for the next delivery. No-op if suppressed.
    pub fn emit(&mut self, event: Event) {
        let idx = event.kind().index();
        if self.suppressed[idx] {
            return;
        }
        let capacity = self.default_capacity;
        self.buffers[idx]
            .get_or_insert_with(|| EventBuffer::new(capacity))
            .push(event);
    }

    /// Register a listener for an event kind. Listeners run in
    /// registration order.
    pub fn on_passive(&mut self, kind: EventKind, listener: PassiveListener) {
        self.on_passive_filtered(kind, None, listener);
    }

    /// Register a listener that only sees events accepted by `filter`.
    pub fn on_passive_filtered(
        &mut self,
        kind: EventKind,
        filter: Option<EventFilter>,
        listener: PassiveListener,
    ) {
        self.listeners[kind.index()].push(Listener {
            callback: listener,
            filter,
        });
    }

    /// Deliver all buffered events to listeners, then clear the buffers.
    pub fn deliver(&mut self) {
        for idx in 0..EVENT_KIND_COUNT {
            let Some(buffer) = self.buffers[idx].as_mut() else {
                continue;
            };
            if buffer.is_empty() {
                continue;
            }
            let events: Vec<Event> = buffer.iter().cloned().collect();
            buffer.clear();

            for listener in &mut self.listeners[idx] {
                for event in &events {
                    if listener.filter.as_ref().is_some_and(|f| !f(event)) {
                        continue;
                    }
                    (listener.callback)(event);
                }
            }
        }
    }

    /// The buffer for `kind`, if anything has been emitted for it.
    pub fn buffer(&self, kind: EventKind) -> Option<&EventBuffer> {
        self.buffers[kind.index()].as_ref()
    }

    /// Events of `kind` waiting for delivery.
    pub fn buffered_count(&self, kind: EventKind) -> usize {
        self.buffer(kind).map_or(0, EventBuffer::len)
    }

    /// Events of `kind` ever emitted (including dropped and delivered).
    pub fn total_emitted(&self, kind: EventKind) -> u64 {
        self.buffer(kind).map_or(0, EventBuffer::total_written)
    }

    /// Clear all buffers. Listeners and suppression settings stay.
    pub fn clear_all(&mut self) {
        for buffer in self.buffers.iter_mut().flatten() {
            buffer.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
