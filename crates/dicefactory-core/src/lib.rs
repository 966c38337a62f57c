//! Dice Factory Core -- the deterministic simulation engine behind the dice
//! factory game.
//!
//! Players place directional machines on a tile grid. Builders roll dice,
//! belts carry them, upgraders turn them gold, and collectors hand them to
//! trucks that ferry stock to a warehouse, where it is sold for the currency
//! that buys more machines.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::step`] advances the simulation by one tick:
//!
//! 1. **Clock** -- Increment the tick counter.
//! 2. **Objects** -- Every placed object runs its per-kind behavior once.
//! 3. **Dice** -- Orphaned dice are destroyed; the rest move toward targets.
//! 4. **Trucks** -- Approach, dock, depart, unload and respawn.
//! 5. **Economy** -- Periodic random sale from the warehouse.
//! 6. **Post-tick** -- Deliver buffered events to listeners.
//! 7. **Bookkeeping** -- Compute the state hash; check invariants in debug
//!    builds.
//!
//! Input (`buy`, `remove_object_at`, `send_truck`, ...) is applied between
//! ticks, either directly or through a [`command::CommandQueue`].
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns the [`engine::World`] and runs the pipeline.
//! - [`grid::ObjectIndex`] -- Tile to object index; at most one per tile.
//! - [`die::DieSet`] -- Live dice and the "who targets this tile" index.
//! - [`storage::Storage`] -- Capacity and type bounded dice counters.
//! - [`truck::Truck`] -- The approach / dock / depart state machine.
//! - [`config::SimConfig`] -- Every per-kind parameter, passed in explicitly.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic motion.
//! - [`event::EventBus`] -- Typed events with buffered post-tick delivery.
//! - [`serialize`] -- Versioned binary (bitcode) and JSON save files.

pub mod command;
pub mod config;
pub mod die;
pub mod economy;
pub mod engine;
pub mod event;
pub mod fixed;
pub mod grid;
pub mod id;
pub mod query;
pub mod rng;
pub mod scenario;
pub mod serialize;
pub mod sim;
pub mod storage;
pub mod truck;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
