//! The simulation engine: owns the world and runs the tick pipeline.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - a [`SimConfig`] with every per-kind behavior parameter
//! - the [`World`]: objects, dice, trucks, warehouse, ledger, unlocks, RNG
//! - a [`SimulationStrategy`] (tick vs. delta)
//! - an [`EventBus`] for typed simulation events
//!
//! # Tick pipeline
//!
//! Each step runs:
//! 1. **Clock** -- advance the tick counter
//! 2. **Objects** -- every placed object runs its per-kind behavior once
//! 3. **Dice** -- orphaned dice are destroyed, the rest move toward targets
//! 4. **Trucks** -- approach, dock, depart, respawn and unload
//! 5. **Economy** -- periodic warehouse sale
//! 6. **Post-tick** -- deliver buffered events to listeners
//! 7. **Bookkeeping** -- state hash and (debug builds) invariant check
//!
//! Input entry points (`buy`, `remove_object_at`, ...) mutate the world
//! between ticks, never during one.

use crate::config::{ConfigError, SimConfig, Unlock};
use crate::die::{Die, DieKind, DieSet, RealPoint};
use crate::economy::{pick_sale, CurrencyKind, Ledger};
use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks};
use crate::grid::{Direction, GridPosition, Object, ObjectIndex, ObjectKind, PlacementError};
use crate::id::{DieId, IdAllocator, ObjectId, TruckId};
use crate::rng::SimRng;
use crate::sim::{AdvanceResult, SimState, SimulationStrategy, StateHash};
use crate::storage::Storage;
use crate::truck::{Truck, TruckError, TruckKind, TruckPhase, TruckRoute};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, trace, warn};

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why a purchase did not happen. Nothing was charged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuyError {
    #[error("{0:?} cannot be bought")]
    NotPurchasable(ObjectKind),
    #[error("{0:?} is not unlocked yet")]
    Locked(ObjectKind),
    #[error("need {cost} {currency:?}, have {balance}")]
    InsufficientFunds {
        currency: CurrencyKind,
        cost: u64,
        balance: u64,
    },
    #[error("tile ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(GridPosition),
    #[error("tile ({}, {}) is occupied", .0.x, .0.y)]
    Occupied(GridPosition),
}

impl From<PlacementError> for BuyError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::OutOfBounds(p) => BuyError::OutOfBounds(p),
            PlacementError::Occupied(p) => BuyError::Occupied(p),
        }
    }
}

/// Why removing, rotating or moving an object did nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("no object at ({}, {})", .0.x, .0.y)]
    Empty(GridPosition),
    #[error("tile ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(GridPosition),
    #[error("tile ({}, {}) is occupied", .0.x, .0.y)]
    Occupied(GridPosition),
    #[error("{0:?} objects cannot be moved")]
    Immovable(ObjectKind),
}

impl From<PlacementError> for EditError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::OutOfBounds(p) => EditError::OutOfBounds(p),
            PlacementError::Occupied(p) => EditError::Occupied(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("no {0}")]
    UnknownTruck(TruckId),
    #[error("{0} is not docked")]
    NotDocked(TruckId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpawnError {
    #[error("no object at ({}, {})", .0.x, .0.y)]
    NoObject(GridPosition),
    #[error("a die already targets ({}, {})", .0.x, .0.y)]
    TileBusy(GridPosition),
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Every piece of simulation state that a save file must reproduce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    pub sim_state: SimState,
    pub ids: IdAllocator,
    pub objects: ObjectIndex,
    pub dice: DieSet,
    /// Trucks in id (creation) order.
    pub trucks: Vec<Truck>,
    pub warehouse: Storage,
    pub ledger: Ledger,
    /// Kinds the player may buy. Unlocks are permanent.
    pub unlocked: BTreeSet<ObjectKind>,
    pub rng: SimRng,
}

impl World {
    fn new(config: &SimConfig) -> Self {
        Self {
            sim_state: SimState::new(),
            ids: IdAllocator::new(),
            objects: ObjectIndex::new(config.grid_width, config.grid_height),
            dice: DieSet::new(),
            trucks: Vec::new(),
            warehouse: Storage::new(config.warehouse_capacity, 0),
            ledger: Ledger::with_balances(config.starting_balance.iter().copied()),
            unlocked: ObjectKind::all()
                .into_iter()
                .filter(|&kind| config.objects.get(kind).starts_unlocked)
                .collect(),
            rng: SimRng::new(config.rng_seed),
        }
    }

    pub fn truck(&self, id: TruckId) -> Option<&Truck> {
        self.trucks.iter().find(|t| t.id == id)
    }

    fn truck_index(&self, id: TruckId) -> Option<usize> {
        self.trucks.iter().position(|t| t.id == id)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Engine {
    pub(crate) config: SimConfig,

    pub(crate) strategy: SimulationStrategy,

    pub(crate) world: World,

    pub(crate) paused: bool,

    /// The most recently computed state hash.
    pub(crate) last_state_hash: u64,

    /// Typed event bus for simulation events.
    pub event_bus: EventBus,

    /// Dice retargeted during the current object pass.
    moved_this_tick: BTreeSet<DieId>,
}

impl Engine {
    /// Create an empty world from a validated config.
    pub fn new(config: SimConfig, strategy: SimulationStrategy) -> Result<Self, ConfigError> {
        config.validate()?;
        let world = World::new(&config);
        Ok(Self::from_parts(config, strategy, world, false, 0))
    }

    pub(crate) fn from_parts(
        config: SimConfig,
        strategy: SimulationStrategy,
        world: World,
        paused: bool,
        last_state_hash: u64,
    ) -> Self {
        Self {
            config,
            strategy,
            world,
            paused,
            last_state_hash,
            event_bus: EventBus::default(),
            moved_this_tick: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn strategy(&self) -> SimulationStrategy {
        self.strategy
    }

    pub fn tick(&self) -> Ticks {
        self.world.sim_state.tick
    }

    /// Hash of the state as of the last completed tick.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Advance the simulation according to the configured strategy.
    ///
    /// - **Tick mode**: `elapsed` is ignored; exactly one tick runs.
    /// - **Delta mode**: `elapsed` seconds are accumulated; as many ticks of
    ///   `1 / tick_rate` seconds run as fit, up to the step cap.
    pub fn advance(&mut self, elapsed: Fixed64) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if self.paused {
            return result;
        }

        match self.strategy {
            SimulationStrategy::Tick => self.step_internal(&mut result),
            SimulationStrategy::Delta { max_steps } => {
                let step = self.config.tick_seconds().max(Fixed64::DELTA);
                let clock = &mut self.world.sim_state;
                clock.accumulator = clock.accumulator.saturating_add(elapsed.max(Fixed64::ZERO));
                while self.world.sim_state.accumulator >= step {
                    if result.steps_run >= u64::from(max_steps) {
                        self.world.sim_state.accumulator = Fixed64::ZERO;
                        result.time_dropped = true;
                        break;
                    }
                    self.world.sim_state.accumulator -= step;
                    self.step_internal(&mut result);
                }
            }
        }

        result
    }

    /// Run exactly one tick, whatever the strategy.
    pub fn step(&mut self) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if !self.paused {
            self.step_internal(&mut result);
        }
        result
    }

    /// Run `ticks` ticks back to back.
    pub fn run(&mut self, ticks: Ticks) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if self.paused {
            return result;
        }
        for _ in 0..ticks {
            self.step_internal(&mut result);
        }
        result
    }

    // -----------------------------------------------------------------------
    // Internal: single step
    // -----------------------------------------------------------------------

    fn step_internal(&mut self, result: &mut AdvanceResult) {
        self.phase_clock();
        self.phase_objects();
        self.phase_dice();
        self.phase_trucks();
        self.phase_economy();
        self.phase_post_tick();
        self.phase_bookkeeping();
        result.steps_run += 1;
    }

    // -----------------------------------------------------------------------
    // Phase 1: Clock
    // -----------------------------------------------------------------------

    fn phase_clock(&mut self) {
        self.world.sim_state.tick += 1;
        self.moved_this_tick.clear();
    }

    // -----------------------------------------------------------------------
    // Phase 2: Objects
    // -----------------------------------------------------------------------

    fn phase_objects(&mut self) {
        let ids: Vec<ObjectId> = self.world.objects.ids().collect();
        for id in ids {
            let Some(object) = self.world.objects.get(id).cloned() else {
                continue;
            };
            match object.kind {
                ObjectKind::Plain => {}
                ObjectKind::ConveyorBelt => {
                    self.forward(&object);
                }
                ObjectKind::Builder => self.run_builder(&object),
                ObjectKind::Collector => self.run_collector(&object),
                ObjectKind::Upgrader => self.run_upgrader(&object),
            }
        }
    }

    fn cycle_aligned(&self, kind: ObjectKind) -> bool {
        let cycle = self.config.objects.get(kind).cycle_ticks.unwrap_or(1).max(1);
        self.world.sim_state.tick % cycle == 0
    }

    fn run_builder(&mut self, object: &Object) {
        if self.cycle_aligned(ObjectKind::Builder)
            && self.forward_target(object).is_some()
            && self.world.dice.count_targeting(object.position) == 0
        {
            self.spawn_die(DieKind::Plain, object.position);
        }
        self.forward(object);
    }

    fn run_collector(&mut self, object: &Object) {
        let Some(die_id) = self.resting_die(object.position) else {
            return;
        };
        let Some((kind, face)) = self.world.dice.get(die_id).map(|d| (d.kind, d.face)) else {
            return;
        };
        let tick = self.world.sim_state.tick;

        let docked = if object.collecting {
            self.world.trucks.iter().position(|t| {
                t.phase() == TruckPhase::Docked && t.collectors().contains(&object.id)
            })
        } else {
            None
        };

        let Some(index) = docked else {
            self.world.dice.remove(die_id);
            trace!(die = %die_id, collector = %object.id, "die discarded, no truck docked");
            self.event_bus.emit(Event::DieDiscarded {
                die: die_id,
                collector: object.id,
                tick,
            });
            return;
        };

        let truck = &mut self.world.trucks[index];
        if !truck.storage.store_die(kind, face) {
            // Trailer full or wrong kind: the die waits on the collector.
            return;
        }
        let truck_id = truck.id;
        let (currency, value) = self.config.die_value(kind, face);
        self.world.ledger.credit(currency, value);
        self.world.dice.remove(die_id);
        trace!(die = %die_id, truck = %truck_id, value, "die collected");
        self.event_bus.emit(Event::DieCollected {
            die: die_id,
            collector: object.id,
            truck: truck_id,
            currency,
            value,
            tick,
        });
    }

    fn run_upgrader(&mut self, object: &Object) {
        let Some(die_id) = self.resting_die(object.position) else {
            return;
        };
        if !self.cycle_aligned(ObjectKind::Upgrader) {
            return;
        }
        let tick = self.world.sim_state.tick;
        let upgraded = match self.world.dice.get_mut(die_id) {
            Some(die) if die.kind == DieKind::Plain => {
                die.kind = DieKind::Gold;
                true
            }
            _ => false,
        };
        if upgraded {
            self.event_bus.emit(Event::DieUpgraded { die: die_id, tick });
        }
        self.forward(object);
    }

    /// The tile `object` may hand a die to right now: its facing neighbor,
    /// if nothing targets that tile and one side of the pair is a belt.
    fn forward_target(&self, object: &Object) -> Option<GridPosition> {
        let neighbor = self.world.objects.neighbor_of(object)?;
        if self.world.dice.count_targeting(neighbor.position) > 0 {
            return None;
        }
        if object.kind != ObjectKind::ConveyorBelt && neighbor.kind != ObjectKind::ConveyorBelt {
            return None;
        }
        Some(neighbor.position)
    }

    /// Whether the object can currently pass a die onward.
    pub fn is_forwardable(&self, object: &Object) -> bool {
        self.forward_target(object).is_some()
    }

    /// The die resting on `tile`, if exactly one targets it and has arrived.
    pub fn resting_die(&self, tile: GridPosition) -> Option<DieId> {
        self.world.dice.resting_on(tile, self.tile_real(tile))
    }

    /// Retarget the die resting on `object` to its facing neighbor.
    fn forward(&mut self, object: &Object) -> bool {
        let Some(die_id) = self.resting_die(object.position) else {
            return false;
        };
        if self.moved_this_tick.contains(&die_id) {
            return false;
        }
        let Some(to) = self.forward_target(object) else {
            return false;
        };
        self.world.dice.set_target(die_id, to);
        self.moved_this_tick.insert(die_id);
        self.event_bus.emit(Event::DieForwarded {
            die: die_id,
            from: object.position,
            to,
            tick: self.world.sim_state.tick,
        });
        true
    }

    fn spawn_die(&mut self, kind: DieKind, tile: GridPosition) -> DieId {
        let id = self.world.ids.next_die();
        let die = Die::new(id, kind, tile, self.config.tile_size, &mut self.world.rng);
        let face = die.face;
        self.world.dice.insert(die);
        trace!(die = %id, x = tile.x, y = tile.y, face, "die spawned");
        self.event_bus.emit(Event::DieSpawned {
            die: id,
            position: tile,
            face,
            tick: self.world.sim_state.tick,
        });
        id
    }

    // -----------------------------------------------------------------------
    // Phase 3: Dice
    // -----------------------------------------------------------------------

    fn phase_dice(&mut self) {
        let plain_budget = self.config.die_budget(DieKind::Plain);
        let gold_budget = self.config.die_budget(DieKind::Gold);
        let tick = self.world.sim_state.tick;

        let ids: Vec<DieId> = self.world.dice.ids().collect();
        for id in ids {
            let Some((target, kind)) = self.world.dice.get(id).map(|d| (d.target(), d.kind)) else {
                continue;
            };
            if !self.world.objects.is_occupied(target) {
                self.world.dice.remove(id);
                debug!(die = %id, x = target.x, y = target.y, "orphaned die destroyed");
                self.event_bus.emit(Event::DieOrphaned {
                    die: id,
                    target,
                    tick,
                });
                continue;
            }
            let target_real = self.tile_real(target);
            let budget = match kind {
                DieKind::Plain => plain_budget,
                DieKind::Gold => gold_budget,
            };
            if let Some(die) = self.world.dice.get_mut(id) {
                die.advance(target_real, budget);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Trucks
    // -----------------------------------------------------------------------

    fn phase_trucks(&mut self) {
        let increment = self.config.truck_increment();
        let tick = self.world.sim_state.tick;
        let ids: Vec<TruckId> = self.world.trucks.iter().map(|t| t.id).collect();

        for id in ids {
            let Some(index) = self.world.truck_index(id) else {
                continue;
            };
            let truck = &mut self.world.trucks[index];
            if truck.is_at_rest() || !truck.step(increment) {
                continue;
            }
            if truck.is_exiting() {
                self.finish_departure(index);
                continue;
            }
            let collectors = truck.collectors().to_vec();
            for collector in collectors {
                if let Some(object) = self.world.objects.get_mut(collector) {
                    object.collecting = true;
                }
            }
            debug!(truck = %id, "truck docked");
            self.event_bus.emit(Event::TruckDocked { truck: id, tick });
        }
    }

    /// A truck finished leaving: respawn its route, unload, drop it.
    fn finish_departure(&mut self, index: usize) {
        let tick = self.world.sim_state.tick;
        let old = self.world.trucks.remove(index);

        let new_id = self.world.ids.next_truck();
        let trailer = self.fresh_trailer();
        self.world.trucks.push(old.respawn(new_id, trailer));
        self.event_bus.emit(Event::TruckRespawned {
            old: old.id,
            new: new_id,
            tick,
        });

        let quantity = old.storage.count();
        let lost = !self.world.warehouse.load(&old.storage);
        if lost {
            warn!(
                truck = %old.id,
                quantity,
                warehouse = self.world.warehouse.count(),
                capacity = self.world.warehouse.capacity(),
                "warehouse cannot take trailer, contents lost"
            );
        } else {
            info!(truck = %old.id, quantity, "truck unloaded");
        }
        self.event_bus.emit(Event::TruckUnloaded {
            truck: old.id,
            quantity,
            lost,
            tick,
        });
    }

    fn fresh_trailer(&self) -> Storage {
        Storage::new(self.config.truck.capacity, self.config.truck.type_limit)
    }

    // -----------------------------------------------------------------------
    // Phase 5: Economy
    // -----------------------------------------------------------------------

    fn phase_economy(&mut self) {
        let interval = self.config.sell_interval_ticks();
        if interval > 0 && self.world.sim_state.tick % interval == 0 {
            self.sell_random();
        }
    }

    /// Sell one die from the warehouse, chosen kind-first then face.
    /// Returns what was sold and the value credited.
    pub fn sell_random(&mut self) -> Option<(DieKind, u8, u64)> {
        let (kind, face) = pick_sale(&self.world.warehouse, &mut self.world.rng)?;
        if !self.world.warehouse.remove_die(kind, face) {
            return None;
        }
        let (currency, value) = self.config.die_value(kind, face);
        self.world.ledger.credit(currency, value);
        debug!(?kind, face, value, "warehouse sale");
        self.event_bus.emit(Event::DieSold {
            kind,
            face,
            currency,
            value,
            tick: self.world.sim_state.tick,
        });
        Some((kind, face, value))
    }

    // -----------------------------------------------------------------------
    // Phase 6: Post-tick
    // -----------------------------------------------------------------------

    fn phase_post_tick(&mut self) {
        self.event_bus.deliver();
    }

    // -----------------------------------------------------------------------
    // Phase 7: Bookkeeping
    // -----------------------------------------------------------------------

    fn phase_bookkeeping(&mut self) {
        self.last_state_hash = self.compute_state_hash();
        trace!(tick = self.world.sim_state.tick, hash = self.last_state_hash, "tick complete");

        #[cfg(debug_assertions)]
        if let Err(violation) = self.check_invariants() {
            panic!("simulation invariant violated at tick {}: {violation}", self.tick());
        }
    }

    /// Compute a deterministic hash of the current simulation state.
    pub(crate) fn compute_state_hash(&self) -> u64 {
        let world = &self.world;
        let mut hasher = StateHash::new();
        hasher.write_u64(world.sim_state.tick);
        hasher.write_u64(world.ids.last());

        for object in world.objects.iter() {
            hasher.write_u64(object.id.0);
            hasher.write_u32(object.kind as u32);
            hasher.write_i32(object.position.x);
            hasher.write_i32(object.position.y);
            hasher.write_u32(object.facing as u32);
            hasher.write_u32(object.collecting as u32);
        }

        for die in world.dice.iter() {
            hasher.write_u64(die.id.0);
            hasher.write_u32(die.kind as u32);
            hasher.write_u32(die.face as u32);
            hasher.write_fixed64(die.position.x);
            hasher.write_fixed64(die.position.y);
            hasher.write_i32(die.target().x);
            hasher.write_i32(die.target().y);
            hasher.write_fixed64(die.carry_x);
            hasher.write_fixed64(die.carry_y);
        }

        for truck in &world.trucks {
            hasher.write_u64(truck.id.0);
            hasher.write_fixed64(truck.percent_complete());
            hasher.write_u32(truck.is_exiting() as u32);
            hasher.write_u64(truck.storage.count());
        }

        for (kind, face, quantity) in world.warehouse.buckets() {
            hasher.write_u32(kind as u32);
            hasher.write_u32(face as u32);
            hasher.write_u64(quantity);
        }

        for (currency, balance) in world.ledger.iter() {
            hasher.write_u32(currency as u32);
            hasher.write_u64(balance);
        }

        for kind in &world.unlocked {
            hasher.write_u32(*kind as u32);
        }

        hasher.write_u64(world.rng.state());
        hasher.finish()
    }

    // -----------------------------------------------------------------------
    // Grid queries
    // -----------------------------------------------------------------------

    pub fn tile_real(&self, tile: GridPosition) -> RealPoint {
        RealPoint::of_tile(tile, self.config.tile_size)
    }

    pub fn object_at(&self, position: GridPosition) -> Option<&Object> {
        self.world.objects.object_at(position)
    }

    pub fn neighbor_of(&self, object: &Object) -> Option<&Object> {
        self.world.objects.neighbor_of(object)
    }

    pub fn die(&self, id: DieId) -> Option<&Die> {
        self.world.dice.get(id)
    }

    pub fn truck(&self, id: TruckId) -> Option<&Truck> {
        self.world.truck(id)
    }

    /// The truck whose footprint covers `tile`, if any.
    pub fn truck_at(&self, tile: GridPosition) -> Option<TruckId> {
        self.world
            .trucks
            .iter()
            .find(|t| t.covers(tile, self.config.tile_size))
            .map(|t| t.id)
    }

    // -----------------------------------------------------------------------
    // Economy queries
    // -----------------------------------------------------------------------

    /// Price of the next object of `kind` given how many are placed.
    pub fn cost(&self, kind: ObjectKind) -> (CurrencyKind, u64) {
        let params = self.config.objects.get(kind);
        let placed = self.world.objects.placed_count(kind);
        (params.currency, params.cost.cost(placed))
    }

    pub fn balance(&self, currency: CurrencyKind) -> u64 {
        self.world.ledger.balance(currency)
    }

    pub fn is_unlocked(&self, kind: ObjectKind) -> bool {
        self.world.unlocked.contains(&kind)
    }

    /// Subtract `amount` from `currency` if the balance covers it.
    pub fn pay(&mut self, currency: CurrencyKind, amount: u64) -> bool {
        self.world.ledger.pay(currency, amount)
    }

    /// Add to a balance. Used by hosts for rewards and by tests.
    pub fn credit(&mut self, currency: CurrencyKind, amount: u64) {
        self.world.ledger.credit(currency, amount);
    }

    // -----------------------------------------------------------------------
    // Input entry points
    // -----------------------------------------------------------------------

    /// Place an object for free (scenario setup). Bumps the placement count
    /// and may unlock further kinds.
    pub fn place_object(
        &mut self,
        kind: ObjectKind,
        position: GridPosition,
        facing: Direction,
    ) -> Result<ObjectId, PlacementError> {
        self.world.objects.can_place(position)?;
        let id = self.world.ids.next_object();
        self.world.objects.insert(Object {
            id,
            kind,
            position,
            facing,
            collecting: false,
        })?;
        debug!(object = %id, ?kind, x = position.x, y = position.y, "object placed");
        self.event_bus.emit(Event::ObjectPlaced {
            object: id,
            kind,
            position,
            tick: self.tick(),
        });
        self.check_unlocks();
        Ok(id)
    }

    fn check_unlocks(&mut self) {
        for kind in ObjectKind::all() {
            if self.world.unlocked.contains(&kind) {
                continue;
            }
            let Some(Unlock { requires, count }) = self.config.objects.get(kind).unlock.clone()
            else {
                continue;
            };
            if self.world.objects.placed_count(requires) >= count {
                self.world.unlocked.insert(kind);
                debug!(?kind, "kind unlocked");
                self.event_bus.emit(Event::ObjectUnlocked {
                    kind,
                    tick: self.tick(),
                });
            }
        }
    }

    /// Buy and place an object.
    ///
    /// The tile is checked before paying, so a failed placement never costs
    /// anything.
    pub fn buy(
        &mut self,
        kind: ObjectKind,
        position: GridPosition,
        facing: Direction,
    ) -> Result<ObjectId, BuyError> {
        let result = self.try_buy(kind, position, facing);
        if let Err(err) = &result {
            debug!(?kind, x = position.x, y = position.y, %err, "purchase rejected");
        }
        result
    }

    fn try_buy(
        &mut self,
        kind: ObjectKind,
        position: GridPosition,
        facing: Direction,
    ) -> Result<ObjectId, BuyError> {
        if !self.config.objects.get(kind).cost.is_purchasable() {
            return Err(BuyError::NotPurchasable(kind));
        }
        if !self.is_unlocked(kind) {
            return Err(BuyError::Locked(kind));
        }
        self.world.objects.can_place(position)?;

        let (currency, cost) = self.cost(kind);
        if !self.pay(currency, cost) {
            return Err(BuyError::InsufficientFunds {
                currency,
                cost,
                balance: self.balance(currency),
            });
        }
        self.event_bus.emit(Event::Purchase {
            kind,
            currency,
            amount: cost,
            tick: self.tick(),
        });
        Ok(self.place_object(kind, position, facing)?)
    }

    /// Remove the object on `position`. Dice targeting it become orphans and
    /// are destroyed on the next tick.
    pub fn remove_object_at(&mut self, position: GridPosition) -> Result<Object, EditError> {
        let Some(id) = self.world.objects.id_at(position) else {
            debug!(x = position.x, y = position.y, "remove rejected: empty tile");
            return Err(EditError::Empty(position));
        };
        let object = self
            .world
            .objects
            .remove(id)
            .ok_or(EditError::Empty(position))?;
        debug!(object = %id, kind = ?object.kind, "object removed");
        self.event_bus.emit(Event::ObjectRemoved {
            object: id,
            kind: object.kind,
            position,
            tick: self.tick(),
        });
        Ok(object)
    }

    /// Rotate the object on `position` to the next facing.
    pub fn rotate_object_at(&mut self, position: GridPosition) -> Result<Direction, EditError> {
        let Some(id) = self.world.objects.id_at(position) else {
            debug!(x = position.x, y = position.y, "rotate rejected: empty tile");
            return Err(EditError::Empty(position));
        };
        let object = self
            .world
            .objects
            .get_mut(id)
            .ok_or(EditError::Empty(position))?;
        object.facing = object.facing.rotated();
        let facing = object.facing;
        self.event_bus.emit(Event::ObjectRotated {
            object: id,
            facing,
            tick: self.tick(),
        });
        Ok(facing)
    }

    /// Drag an object to an empty tile. Collectors stay put.
    pub fn move_object(&mut self, from: GridPosition, to: GridPosition) -> Result<(), EditError> {
        let result = self.try_move(from, to);
        if let Err(err) = &result {
            debug!(%err, "move rejected");
        }
        result
    }

    fn try_move(&mut self, from: GridPosition, to: GridPosition) -> Result<(), EditError> {
        let object = self.world.objects.object_at(from).ok_or(EditError::Empty(from))?;
        let (id, kind) = (object.id, object.kind);
        if !self.config.objects.get(kind).movable {
            return Err(EditError::Immovable(kind));
        }
        self.world.objects.relocate(id, to)?;
        self.event_bus.emit(Event::ObjectMoved {
            object: id,
            from,
            to,
            tick: self.tick(),
        });
        Ok(())
    }

    /// Send a docked truck away. Its collectors stop collecting at once.
    pub fn send_truck(&mut self, id: TruckId) -> Result<(), SendError> {
        let Some(index) = self.world.truck_index(id) else {
            return Err(SendError::UnknownTruck(id));
        };
        let truck = &mut self.world.trucks[index];
        if !truck.send() {
            debug!(truck = %id, "send rejected: not docked");
            return Err(SendError::NotDocked(id));
        }
        let collectors = truck.collectors().to_vec();
        for collector in collectors {
            if let Some(object) = self.world.objects.get_mut(collector) {
                object.collecting = false;
            }
        }
        debug!(truck = %id, "truck sent");
        self.event_bus.emit(Event::TruckSent {
            truck: id,
            tick: self.tick(),
        });
        Ok(())
    }

    /// Manually spawn a plain die resting on the object at `position`.
    pub fn spawn_die_at(&mut self, position: GridPosition) -> Result<DieId, SpawnError> {
        if !self.world.objects.is_occupied(position) {
            return Err(SpawnError::NoObject(position));
        }
        if self.world.dice.count_targeting(position) > 0 {
            return Err(SpawnError::TileBusy(position));
        }
        Ok(self.spawn_die(DieKind::Plain, position))
    }

    /// Start a truck route serving `collectors`.
    pub fn spawn_truck(
        &mut self,
        kind: TruckKind,
        route: TruckRoute,
        collectors: Vec<ObjectId>,
    ) -> Result<TruckId, TruckError> {
        if let Some(&bad) = collectors.iter().find(|&&c| {
            self.world.objects.get(c).map(|o| o.kind) != Some(ObjectKind::Collector)
        }) {
            return Err(TruckError::NotACollector(bad));
        }
        let id = self.world.ids.next_truck();
        let truck = Truck::new(
            id,
            kind,
            route,
            collectors,
            self.fresh_trailer(),
            self.config.tile_size,
        )?;
        debug!(truck = %id, "truck spawned");
        self.world.trucks.push(truck);
        Ok(id)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
