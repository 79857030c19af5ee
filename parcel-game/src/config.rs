//! Session tuning loaded from JSON, with every field defaulted.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{
    DEFAULT_CARRY_SLOTS, DEFAULT_CUSHION_TWEEN_SECS, DEFAULT_DAY_START_HOUR,
    DEFAULT_MAX_ACTIVE_DELIVERIES, DEFAULT_PLAYER_FALL_MIN_HEIGHT, DEFAULT_SECONDS_PER_GAME_HOUR,
    DEFAULT_TAPE_TWEEN_SECS, HOURS_PER_DAY,
};
use crate::ledger::StockLedger;
use crate::protection::{ContainerKind, CushionType, ProtectionTable, TapeColor};
use crate::shop::PriceList;

/// Errors raised when session configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: usize,
        value: usize,
    },
    #[error("{field} must be positive (got {value:.2})")]
    NonPositive { field: &'static str, value: f32 },
    #[error("day start hour must be below 24 (got {hour})")]
    StartHour { hour: u32 },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
    #[error("config JSON invalid: {0}")]
    Parse(String),
}

/// Stock a fresh session opens with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StartingStock {
    #[serde(default)]
    pub bank: i64,
    #[serde(default)]
    pub cash: i64,
    #[serde(default)]
    pub containers: BTreeMap<ContainerKind, u32>,
    /// Packs, not uses.
    #[serde(default)]
    pub cushion_packs: BTreeMap<CushionType, u32>,
    /// Rolls, not uses.
    #[serde(default)]
    pub tape_rolls: BTreeMap<TapeColor, u32>,
}

impl StartingStock {
    #[must_use]
    pub fn to_ledger(&self) -> StockLedger {
        let mut ledger = StockLedger::with_funds(self.bank, self.cash);
        for (&kind, &count) in &self.containers {
            ledger.add_container_stock(kind, count);
        }
        for (&cushion, &packs) in &self.cushion_packs {
            ledger.add_cushion_packs(cushion, packs);
        }
        for (&color, &rolls) in &self.tape_rolls {
            ledger.add_tape_rolls(color, rolls);
        }
        ledger
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "SessionConfig::default_carry_slots")]
    pub carry_slots: usize,
    #[serde(default = "SessionConfig::default_max_active_deliveries")]
    pub max_active_deliveries: usize,
    #[serde(default = "SessionConfig::default_seconds_per_game_hour")]
    pub seconds_per_game_hour: f32,
    #[serde(default = "SessionConfig::default_day_start_hour")]
    pub day_start_hour: u32,
    /// Player drops shorter than this leave carried parcels alone.
    #[serde(default = "SessionConfig::default_player_fall_min_height")]
    pub player_fall_min_height: f32,
    #[serde(default = "SessionConfig::default_cushion_tween_secs")]
    pub cushion_tween_secs: f32,
    #[serde(default = "SessionConfig::default_tape_tween_secs")]
    pub tape_tween_secs: f32,
    #[serde(default)]
    pub starting_stock: StartingStock,
    #[serde(default)]
    pub protection: ProtectionTable,
    #[serde(default)]
    pub prices: PriceList,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            carry_slots: Self::default_carry_slots(),
            max_active_deliveries: Self::default_max_active_deliveries(),
            seconds_per_game_hour: Self::default_seconds_per_game_hour(),
            day_start_hour: Self::default_day_start_hour(),
            player_fall_min_height: Self::default_player_fall_min_height(),
            cushion_tween_secs: Self::default_cushion_tween_secs(),
            tape_tween_secs: Self::default_tape_tween_secs(),
            starting_stock: StartingStock::default(),
            protection: ProtectionTable::default(),
            prices: PriceList::default(),
        }
    }
}

impl SessionConfig {
    const fn default_carry_slots() -> usize {
        DEFAULT_CARRY_SLOTS
    }

    const fn default_max_active_deliveries() -> usize {
        DEFAULT_MAX_ACTIVE_DELIVERIES
    }

    const fn default_seconds_per_game_hour() -> f32 {
        DEFAULT_SECONDS_PER_GAME_HOUR
    }

    const fn default_day_start_hour() -> u32 {
        DEFAULT_DAY_START_HOUR
    }

    const fn default_player_fall_min_height() -> f32 {
        DEFAULT_PLAYER_FALL_MIN_HEIGHT
    }

    const fn default_cushion_tween_secs() -> f32 {
        DEFAULT_CUSHION_TWEEN_SECS
    }

    const fn default_tape_tween_secs() -> f32 {
        DEFAULT_TAPE_TWEEN_SECS
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the JSON is malformed or a bound is violated.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.carry_slots == 0 {
            return Err(ConfigError::MinViolation {
                field: "carry_slots",
                min: 1,
                value: self.carry_slots,
            });
        }
        if self.max_active_deliveries == 0 {
            return Err(ConfigError::MinViolation {
                field: "max_active_deliveries",
                min: 1,
                value: self.max_active_deliveries,
            });
        }
        if self.seconds_per_game_hour.is_nan() || self.seconds_per_game_hour <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "seconds_per_game_hour",
                value: self.seconds_per_game_hour,
            });
        }
        if self.day_start_hour >= HOURS_PER_DAY {
            return Err(ConfigError::StartHour {
                hour: self.day_start_hour,
            });
        }
        for (field, value) in [
            ("starting_stock.bank", self.starting_stock.bank),
            ("starting_stock.cash", self.starting_stock.cash),
        ] {
            if value < 0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        Ok(())
    }
}
