//! Simulation configuration tables.
//!
//! Every per-kind behavior parameter (cost curve, cycle length, speed,
//! multiplier, unlock rule) lives in a [`SimConfig`] handed to the engine at
//! construction. Configs load from RON, TOML or (with the `json` feature)
//! JSON files, chosen by extension.

use crate::die::DieKind;
use crate::economy::{CostCurve, CurrencyKind};
use crate::fixed::{checked_per_tick, per_tick, Fixed64, Ticks, MAX_REAL_EXTENT};
use crate::grid::ObjectKind;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// The values parsed but describe an unusable simulation.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    #[cfg(feature = "json")]
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, ConfigError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        #[cfg(feature = "json")]
        Some("json") => Ok(Format::Json),
        _ => Err(ConfigError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let parse_error = |detail: String| ConfigError::Parse {
        file: path.to_path_buf(),
        detail,
    };

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(e.to_string())),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
        #[cfg(feature = "json")]
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

// ===========================================================================
// Tables
// ===========================================================================

/// A kind that becomes purchasable once enough of another kind is placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unlock {
    pub requires: ObjectKind,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectParams {
    pub cost: CostCurve,
    /// Currency the cost is paid in.
    #[serde(default = "default_currency")]
    pub currency: CurrencyKind,
    /// Build (Builder) or upgrade (Upgrader) cycle length.
    #[serde(default)]
    pub cycle_ticks: Option<Ticks>,
    #[serde(default)]
    pub unlock: Option<Unlock>,
    /// Whether the host may drag this object to another tile.
    #[serde(default = "default_true")]
    pub movable: bool,
    #[serde(default = "default_true")]
    pub starts_unlocked: bool,
}

fn default_true() -> bool {
    true
}

fn default_currency() -> CurrencyKind {
    CurrencyKind::PlainBuck
}

impl ObjectParams {
    fn fixed(cost: CostCurve) -> Self {
        Self {
            cost,
            currency: CurrencyKind::PlainBuck,
            cycle_ticks: None,
            unlock: None,
            movable: true,
            starts_unlocked: true,
        }
    }
}

/// One [`ObjectParams`] per [`ObjectKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectTable {
    pub plain: ObjectParams,
    pub conveyor_belt: ObjectParams,
    pub builder: ObjectParams,
    pub collector: ObjectParams,
    pub upgrader: ObjectParams,
}

impl ObjectTable {
    pub fn get(&self, kind: ObjectKind) -> &ObjectParams {
        match kind {
            ObjectKind::Plain => &self.plain,
            ObjectKind::ConveyorBelt => &self.conveyor_belt,
            ObjectKind::Builder => &self.builder,
            ObjectKind::Collector => &self.collector,
            ObjectKind::Upgrader => &self.upgrader,
        }
    }
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self {
            plain: ObjectParams::fixed(CostCurve::Unbuyable),
            conveyor_belt: ObjectParams::fixed(CostCurve::Power {
                coefficient: 1,
                exponent: 2,
            }),
            builder: ObjectParams {
                cycle_ticks: Some(60),
                ..ObjectParams::fixed(CostCurve::Exponential {
                    coefficient: 1,
                    base: 2,
                })
            },
            collector: ObjectParams {
                movable: false,
                ..ObjectParams::fixed(CostCurve::Unbuyable)
            },
            upgrader: ObjectParams {
                cycle_ticks: Some(30),
                unlock: Some(Unlock {
                    requires: ObjectKind::Builder,
                    count: 4,
                }),
                starts_unlocked: false,
                ..ObjectParams::fixed(CostCurve::Exponential {
                    coefficient: 10,
                    base: 3,
                })
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DieParams {
    pub multiplier: u64,
    /// Real units (pixels) per second.
    pub speed: f64,
    pub currency: CurrencyKind,
}

/// One [`DieParams`] per [`DieKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DieTable {
    pub plain: DieParams,
    pub gold: DieParams,
}

impl DieTable {
    pub fn get(&self, kind: DieKind) -> &DieParams {
        match kind {
            DieKind::Plain => &self.plain,
            DieKind::Gold => &self.gold,
        }
    }
}

impl Default for DieTable {
    fn default() -> Self {
        Self {
            plain: DieParams {
                multiplier: 1,
                speed: 64.0,
                currency: CurrencyKind::PlainBuck,
            },
            gold: DieParams {
                multiplier: 2,
                speed: 64.0,
                currency: CurrencyKind::GoldBuck,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruckParams {
    pub capacity: u64,
    /// Distinct die kinds a trailer accepts; 0 means unlimited.
    pub type_limit: usize,
    pub arrival_seconds: f64,
}

impl Default for TruckParams {
    fn default() -> Self {
        Self {
            capacity: 10,
            type_limit: 1,
            arrival_seconds: 2.0,
        }
    }
}

// ===========================================================================
// SimConfig
// ===========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_rate: u32,
    pub tile_size: u32,
    pub grid_width: u32,
    pub grid_height: u32,
    pub objects: ObjectTable,
    pub dice: DieTable,
    pub truck: TruckParams,
    pub warehouse_capacity: u64,
    pub sell_interval_seconds: u64,
    pub starting_balance: Vec<(CurrencyKind, u64)>,
    pub rng_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            tile_size: 32,
            grid_width: 20,
            grid_height: 20,
            objects: ObjectTable::default(),
            dice: DieTable::default(),
            truck: TruckParams::default(),
            warehouse_capacity: 1000,
            sell_interval_seconds: 4,
            starting_balance: Vec::new(),
            rng_seed: 0x5EED,
        }
    }
}

/// Largest distance a die may cover per axis in one tick.
fn max_die_step() -> Fixed64 {
    Fixed64::from_num(1 << 24)
}

impl SimConfig {
    /// Load and validate a config file (RON, TOML, or JSON with `json`).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: SimConfig = deserialize_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = ron::from_str(source).map_err(|e| ConfigError::Parse {
            file: PathBuf::from("<string>"),
            detail: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };
        if self.tick_rate == 0 {
            return invalid("tick_rate must be positive".into());
        }
        if Fixed64::checked_from_num(self.tick_rate).is_none() {
            return invalid(format!("tick_rate {} is too large", self.tick_rate));
        }
        if self.tile_size == 0 {
            return invalid("tile_size must be positive".into());
        }
        if self.grid_width == 0 || self.grid_height == 0 {
            return invalid("grid must have at least one tile".into());
        }
        let extent = u64::from(self.grid_width.max(self.grid_height)) * u64::from(self.tile_size);
        if extent > MAX_REAL_EXTENT as u64 {
            return invalid(format!(
                "grid spans {extent} units, more than the {MAX_REAL_EXTENT} supported"
            ));
        }
        for kind in ObjectKind::all() {
            let params = self.objects.get(kind);
            match params.cost {
                CostCurve::Power {
                    coefficient,
                    exponent,
                } if coefficient == 0 || exponent == 0 => {
                    return invalid(format!("{} cost curve is not increasing", kind.name()));
                }
                CostCurve::Exponential { coefficient, base } if coefficient == 0 || base < 2 => {
                    return invalid(format!("{} cost curve is not increasing", kind.name()));
                }
                _ => {}
            }
            if params.cycle_ticks == Some(0) {
                return invalid(format!("{} cycle must be positive", kind.name()));
            }
            if params.unlock.as_ref().is_some_and(|u| u.requires == kind) {
                return invalid(format!("{} cannot unlock itself", kind.name()));
            }
        }
        for kind in [ObjectKind::Builder, ObjectKind::Upgrader] {
            if self.objects.get(kind).cycle_ticks.is_none() {
                return invalid(format!("{} needs a cycle length", kind.name()));
            }
        }
        for kind in DieKind::all() {
            let params = self.dice.get(kind);
            if !params.speed.is_finite() || params.speed <= 0.0 {
                return invalid(format!("{kind:?} die speed must be positive and finite"));
            }
            match checked_per_tick(params.speed, self.tick_rate) {
                Some(step) if step == Fixed64::ZERO => {
                    return invalid(format!("{kind:?} die speed is too slow to move"));
                }
                Some(step) if step <= max_die_step() => {}
                _ => return invalid(format!("{kind:?} die speed {} is too fast", params.speed)),
            }
            if params.multiplier == 0 {
                return invalid(format!("{kind:?} die multiplier must be positive"));
            }
        }
        if self.truck.capacity == 0 {
            return invalid("truck capacity must be positive".into());
        }
        if !self.truck.arrival_seconds.is_finite() || self.truck.arrival_seconds <= 0.0 {
            return invalid("truck arrival time must be positive and finite".into());
        }
        match checked_per_tick(1.0 / self.truck.arrival_seconds, self.tick_rate) {
            Some(step) if step == Fixed64::ZERO => {
                return invalid("truck arrival time is too long".into());
            }
            Some(step) if step <= Fixed64::from_num(1) => {}
            _ => return invalid("truck arrival must last at least one tick".into()),
        }
        if self.warehouse_capacity == 0 {
            return invalid("warehouse capacity must be positive".into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Derived per-tick quantities
    // -----------------------------------------------------------------------

    /// Seconds per tick.
    pub fn tick_seconds(&self) -> Fixed64 {
        per_tick(1.0, self.tick_rate)
    }

    /// Distance a die of `kind` may cover per axis in one tick.
    pub fn die_budget(&self, kind: DieKind) -> Fixed64 {
        per_tick(self.dice.get(kind).speed, self.tick_rate)
    }

    /// Truck progress per tick: `Δt / arrival_seconds`.
    pub fn truck_increment(&self) -> Fixed64 {
        per_tick(1.0 / self.truck.arrival_seconds, self.tick_rate)
    }

    /// Ticks between warehouse sales; 0 disables selling.
    pub fn sell_interval_ticks(&self) -> Ticks {
        self.sell_interval_seconds.saturating_mul(self.tick_rate as Ticks)
    }

    /// Currency credited for a die of `kind` showing `face`.
    pub fn die_value(&self, kind: DieKind, face: u8) -> (CurrencyKind, u64) {
        let params = self.dice.get(kind);
        (params.currency, (face as u64).saturating_mul(params.multiplier))
    }
}
