//! Scenario setup: a declarative initial layout applied to a fresh engine.
//!
//! Scenarios are plain data so they can live in RON/TOML files next to the
//! config. [`Scenario::starter`] is the layout a new game begins with.

use crate::config::{deserialize_file, ConfigError, SimConfig};
use crate::engine::{Engine, SpawnError};
use crate::grid::{Direction, GridPosition, ObjectKind, PlacementError};
use crate::sim::SimulationStrategy;
use crate::truck::{TruckError, TruckKind, TruckRoute};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub kind: ObjectKind,
    pub position: GridPosition,
    pub facing: Direction,
}

/// A truck route and the tiles of the collectors it serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckSpec {
    #[serde(default = "default_truck_kind")]
    pub kind: TruckKind,
    pub route: TruckRoute,
    pub collectors: Vec<GridPosition>,
}

fn default_truck_kind() -> TruckKind {
    TruckKind::Basic
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub placements: Vec<Placement>,
    /// Tiles that start with a plain die resting on them.
    pub dice: Vec<GridPosition>,
    pub trucks: Vec<TruckSpec>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("placement failed: {0}")]
    Placement(#[from] PlacementError),
    #[error("die spawn failed: {0}")]
    Spawn(#[from] SpawnError),
    #[error("truck setup failed: {0}")]
    Truck(#[from] TruckError),
    #[error("no collector at ({}, {})", .0.x, .0.y)]
    NoCollectorAt(GridPosition),
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        deserialize_file(path)
    }

    /// The opening layout: three builders feeding belts, one upgrader on the
    /// first line, a loop ending in a collector, and one truck docking
    /// beside that collector.
    pub fn starter() -> Self {
        use Direction::*;
        use ObjectKind::*;

        let layout: [(ObjectKind, i32, i32, Direction); 22] = [
            (Builder, 2, 2, South),
            (Builder, 4, 2, South),
            (Builder, 6, 2, South),
            (ConveyorBelt, 2, 3, South),
            (ConveyorBelt, 4, 3, South),
            (ConveyorBelt, 6, 3, South),
            (Upgrader, 2, 4, East),
            (ConveyorBelt, 3, 4, East),
            (ConveyorBelt, 4, 4, East),
            (ConveyorBelt, 5, 4, East),
            (ConveyorBelt, 6, 4, East),
            (ConveyorBelt, 7, 4, South),
            (ConveyorBelt, 7, 5, South),
            (ConveyorBelt, 7, 6, South),
            (ConveyorBelt, 7, 7, South),
            (ConveyorBelt, 7, 8, South),
            (ConveyorBelt, 7, 9, West),
            (ConveyorBelt, 6, 9, West),
            (ConveyorBelt, 5, 9, North),
            (ConveyorBelt, 5, 8, North),
            (ConveyorBelt, 5, 7, East),
            (Collector, 6, 7, East),
        ];

        Self {
            placements: layout
                .into_iter()
                .map(|(kind, x, y, facing)| Placement {
                    kind,
                    position: GridPosition::new(x, y),
                    facing,
                })
                .collect(),
            dice: vec![
                GridPosition::new(2, 2),
                GridPosition::new(4, 2),
                GridPosition::new(6, 2),
            ],
            trucks: vec![TruckSpec {
                kind: TruckKind::Basic,
                route: TruckRoute::new(GridPosition::new(6, -2), GridPosition::new(6, 5)),
                collectors: vec![GridPosition::new(6, 7)],
            }],
        }
    }
}

impl Engine {
    /// Build an engine and apply `scenario` to it.
    pub fn from_scenario(
        config: SimConfig,
        strategy: SimulationStrategy,
        scenario: &Scenario,
    ) -> Result<Self, ScenarioError> {
        let mut engine = Engine::new(config, strategy)?;
        engine.apply_scenario(scenario)?;
        Ok(engine)
    }

    /// Place every object, seed dice, then start the truck routes.
    pub fn apply_scenario(&mut self, scenario: &Scenario) -> Result<(), ScenarioError> {
        for placement in &scenario.placements {
            self.place_object(placement.kind, placement.position, placement.facing)?;
        }
        for &tile in &scenario.dice {
            self.spawn_die_at(tile)?;
        }
        for spec in &scenario.trucks {
            let collectors = spec
                .collectors
                .iter()
                .map(|&tile| {
                    self.object_at(tile)
                        .filter(|o| o.kind == ObjectKind::Collector)
                        .map(|o| o.id)
                        .ok_or(ScenarioError::NoCollectorAt(tile))
                })
                .collect::<Result<Vec<_>, _>>()?;
            self.spawn_truck(spec.kind, spec.route.clone(), collectors)?;
        }
        Ok(())
    }
}
