//! Container kinds, cushioning and the damage divisor they combine into.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::DEFAULT_BASE_DIVISOR;

/// Physical box variants stocked by the shop.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    #[default]
    Small,
    Medium,
    Large,
    Cold,
    WaterproofMedium,
    WaterproofLarge,
}

impl ContainerKind {
    pub const ALL: [Self; 6] = [
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::Cold,
        Self::WaterproofMedium,
        Self::WaterproofLarge,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::Cold => "cold",
            Self::WaterproofMedium => "waterproof_medium",
            Self::WaterproofLarge => "waterproof_large",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Whether the box keeps cold-chain items within their base deadline.
    #[must_use]
    pub const fn is_cold_capable(self) -> bool {
        matches!(self, Self::Cold)
    }

    #[must_use]
    pub const fn is_waterproof(self) -> bool {
        matches!(self, Self::WaterproofMedium | Self::WaterproofLarge)
    }
}

/// Filler placed around the item before the lids close.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum CushionType {
    #[default]
    None,
    Basic,
    Strong,
    Ice,
}

impl CushionType {
    /// Cushion types that can be bought and applied.
    pub const PURCHASABLE: [Self; 3] = [Self::Basic, Self::Strong, Self::Ice];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic => "basic",
            Self::Strong => "strong",
            Self::Ice => "ice",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::PURCHASABLE.into_iter().find(|cushion| cushion.key() == key)
    }

    #[must_use]
    pub const fn multiplier(self) -> u32 {
        match self {
            Self::None => 1,
            Self::Basic => 2,
            Self::Strong | Self::Ice => 3,
        }
    }

    /// Ice only fits boxes that hold temperature.
    #[must_use]
    pub const fn fits(self, kind: ContainerKind) -> bool {
        match self {
            Self::Ice => kind.is_cold_capable(),
            Self::None | Self::Basic | Self::Strong => true,
        }
    }
}

/// Tape rolls come in three colours with independent stock.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum TapeColor {
    #[default]
    Red,
    Blue,
    Green,
}

impl TapeColor {
    pub const ALL: [Self; 3] = [Self::Red, Self::Blue, Self::Green];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Blue => "blue",
            Self::Green => "green",
        }
    }

    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.key() == key)
    }
}

/// Combined divisor for a box base value and a cushion type. Never below 1.
#[must_use]
pub const fn damage_divisor(base_divisor: u32, cushion: CushionType) -> u32 {
    let base = if base_divisor == 0 { 1 } else { base_divisor };
    base.saturating_mul(cushion.multiplier())
}

/// Share of incoming damage absorbed by a divisor, in `[0, 1)`.
#[must_use]
pub fn protection_fraction(divisor: u32) -> f32 {
    1.0 - 1.0 / crate::numbers::u32_to_f32(divisor.max(1))
}

/// Protection in effect around an item when damage arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protection {
    pub divisor: u32,
    pub waterproof: bool,
}

impl Protection {
    /// An item in hand or on the counter.
    pub const UNPROTECTED: Self = Self {
        divisor: 1,
        waterproof: false,
    };

    #[must_use]
    pub const fn new(divisor: u32, waterproof: bool) -> Self {
        Self {
            divisor: if divisor == 0 { 1 } else { divisor },
            waterproof,
        }
    }
}

impl Default for Protection {
    fn default() -> Self {
        Self::UNPROTECTED
    }
}

/// Per-kind base divisors, tunable from session config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionTable {
    #[serde(default)]
    pub base_divisors: BTreeMap<ContainerKind, u32>,
}

impl ProtectionTable {
    #[must_use]
    pub fn base_divisor(&self, kind: ContainerKind) -> u32 {
        self.base_divisors
            .get(&kind)
            .copied()
            .unwrap_or(DEFAULT_BASE_DIVISOR)
            .max(1)
    }

    #[must_use]
    pub fn divisor(&self, kind: ContainerKind, cushion: CushionType) -> u32 {
        damage_divisor(self.base_divisor(kind), cushion)
    }
}

impl Default for ProtectionTable {
    fn default() -> Self {
        Self {
            base_divisors: ContainerKind::ALL
                .into_iter()
                .map(|kind| (kind, DEFAULT_BASE_DIVISOR))
                .collect(),
        }
    }
}
