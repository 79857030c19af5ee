//! Static item definitions and the catalog that interns them.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::constants::{DEFAULT_ITEM_WEIGHT, DEFAULT_WATER_DAMAGE_PER_SECOND, QUALITY_MAX};
use crate::protection::ContainerKind;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

/// Broad handling class of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    #[default]
    Normal,
    Cold,
    Fragile,
    Liquid,
}

/// Drop sensitivity, in whole meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallProfile {
    #[serde(default = "FallProfile::default_min_height_m")]
    pub min_height_m: i32,
    #[serde(default)]
    pub damage_per_meter: i32,
}

impl FallProfile {
    const fn default_min_height_m() -> i32 {
        1
    }
}

impl Default for FallProfile {
    fn default() -> Self {
        Self {
            min_height_m: Self::default_min_height_m(),
            damage_per_meter: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterProfile {
    #[serde(default)]
    pub breaks_instantly: bool,
    #[serde(default)]
    pub degrades: bool,
    #[serde(default = "WaterProfile::default_damage_per_second")]
    pub damage_per_second: f32,
}

impl WaterProfile {
    const fn default_damage_per_second() -> f32 {
        DEFAULT_WATER_DAMAGE_PER_SECOND
    }
}

impl Default for WaterProfile {
    fn default() -> Self {
        Self {
            breaks_instantly: false,
            degrades: false,
            damage_per_second: Self::default_damage_per_second(),
        }
    }
}

/// Immutable per-kind configuration shared by every spawned instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub category: ItemCategory,
    #[serde(default = "ItemDefinition::default_base_quality")]
    pub base_quality: f32,
    #[serde(default)]
    pub base_reward: u32,
    pub delivery_limit_days: u32,
    pub damaged_threshold: f32,
    pub broken_threshold: f32,
    #[serde(default)]
    pub fall: FallProfile,
    #[serde(default)]
    pub water: WaterProfile,
    #[serde(default)]
    pub requires_cold: bool,
    /// Empty means any container kind is accepted.
    #[serde(default)]
    pub allowed_containers: SmallVec<[ContainerKind; 4]>,
    #[serde(default)]
    pub destination: String,
    #[serde(default = "ItemDefinition::default_weight")]
    pub weight: u32,
}

impl ItemDefinition {
    const fn default_base_quality() -> f32 {
        QUALITY_MAX
    }

    const fn default_weight() -> u32 {
        DEFAULT_ITEM_WEIGHT
    }

    #[must_use]
    pub fn accepts(&self, kind: ContainerKind) -> bool {
        self.allowed_containers.is_empty() || self.allowed_containers.contains(&kind)
    }

    /// Cold-chain rules apply to flagged items and the whole cold category.
    #[must_use]
    pub fn needs_cold_chain(&self) -> bool {
        self.requires_cold || self.category == ItemCategory::Cold
    }

    /// Check the threshold ordering and deadline of a single definition.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when a bound is violated.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if !(0.0..=QUALITY_MAX).contains(&self.base_quality) {
            return Err(CatalogError::QualityOutOfRange {
                key: self.key.clone(),
                value: self.base_quality,
            });
        }
        if !(0.0 <= self.broken_threshold
            && self.broken_threshold <= self.damaged_threshold
            && self.damaged_threshold <= self.base_quality)
        {
            return Err(CatalogError::ThresholdOrder {
                key: self.key.clone(),
                broken: self.broken_threshold,
                damaged: self.damaged_threshold,
                base: self.base_quality,
            });
        }
        if self.delivery_limit_days == 0 {
            return Err(CatalogError::ZeroDeadline {
                key: self.key.clone(),
            });
        }
        if self.water.damage_per_second < 0.0 {
            return Err(CatalogError::NegativeWaterDamage {
                key: self.key.clone(),
                value: self.water.damage_per_second,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON invalid: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("item key '{key}' appears more than once")]
    DuplicateKey { key: String },
    #[error("item '{key}' base quality {value:.1} outside 0..=100")]
    QualityOutOfRange { key: String, value: f32 },
    #[error(
        "item '{key}' thresholds must satisfy broken {broken:.1} <= damaged {damaged:.1} <= base {base:.1}"
    )]
    ThresholdOrder {
        key: String,
        broken: f32,
        damaged: f32,
        base: f32,
    },
    #[error("item '{key}' needs a delivery limit of at least one day")]
    ZeroDeadline { key: String },
    #[error("item '{key}' water damage per second must not be negative (got {value:.2})")]
    NegativeWaterDamage { key: String, value: f32 },
}

/// Catalog as stored on disk, before validation.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    items: Vec<ItemDefinition>,
}

/// Validated collection of interned item definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "CatalogFile")]
pub struct ItemCatalog {
    items: Vec<Arc<ItemDefinition>>,
}

impl TryFrom<CatalogFile> for ItemCatalog {
    type Error = CatalogError;

    fn try_from(file: CatalogFile) -> Result<Self, Self::Error> {
        Self::from_definitions(file.items)
    }
}

impl ItemCatalog {
    /// Build a catalog from definitions, validating each one.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` when a definition is invalid or a key repeats.
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ItemDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut seen = BTreeSet::new();
        let mut items = Vec::new();
        for definition in definitions {
            definition.validate()?;
            if !seen.insert(definition.key.clone()) {
                return Err(CatalogError::DuplicateKey {
                    key: definition.key,
                });
            }
            items.push(Arc::new(definition));
        }
        Ok(Self { items })
    }

    /// Load catalog data from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the JSON cannot be parsed or fails validation.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Self::try_from(file)
    }

    /// The catalog shipped with the game.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the embedded data is invalid.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<ItemDefinition>> {
        self.items.iter().find(|item| item.key == key).cloned()
    }

    #[must_use]
    pub fn items(&self) -> &[Arc<ItemDefinition>] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(key: &str) -> ItemDefinition {
        ItemDefinition {
            key: key.to_string(),
            name: key.to_string(),
            category: ItemCategory::Normal,
            base_quality: 100.0,
            base_reward: 50,
            delivery_limit_days: 3,
            damaged_threshold: 60.0,
            broken_threshold: 10.0,
            fall: FallProfile::default(),
            water: WaterProfile::default(),
            requires_cold: false,
            allowed_containers: SmallVec::new(),
            destination: "dest".to_string(),
            weight: 5,
        }
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = ItemCatalog::builtin().expect("builtin catalog");
        assert!(!catalog.is_empty());
        assert!(catalog.items().iter().all(|item| !item.destination.is_empty()));
        assert!(catalog.items().iter().any(|item| item.needs_cold_chain()));
    }

    #[test]
    fn threshold_order_is_enforced() {
        let mut bad = definition("vase");
        bad.broken_threshold = 70.0;
        assert!(matches!(
            bad.validate(),
            Err(CatalogError::ThresholdOrder { .. })
        ));

        let mut above_base = definition("mug");
        above_base.base_quality = 50.0;
        assert!(above_base.validate().is_err());
    }

    #[test]
    fn duplicate_keys_and_zero_deadline_rejected() {
        let err = ItemCatalog::from_definitions([definition("a"), definition("a")]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateKey { .. }));

        let mut zero = definition("b");
        zero.delivery_limit_days = 0;
        assert!(matches!(
            zero.validate(),
            Err(CatalogError::ZeroDeadline { .. })
        ));
    }

    #[test]
    fn deserializing_validates_like_from_json() {
        let json = r#"{"items":[
            {"key":"book","name":"Book","delivery_limit_days":2,"damaged_threshold":50,"broken_threshold":5},
            {"key":"book","name":"Book","delivery_limit_days":2,"damaged_threshold":50,"broken_threshold":5}]}"#;
        let err = serde_json::from_str::<ItemCatalog>(json).unwrap_err();
        assert!(err.to_string().contains("appears more than once"));

        let builtin = ItemCatalog::builtin().expect("builtin");
        let saved = serde_json::to_string(&builtin).expect("save");
        let loaded: ItemCatalog = serde_json::from_str(&saved).expect("load");
        assert_eq!(loaded.len(), builtin.len());
    }

    #[test]
    fn empty_allowed_list_accepts_anything() {
        let mut item = definition("box");
        assert!(item.accepts(ContainerKind::WaterproofLarge));
        item.allowed_containers.push(ContainerKind::Cold);
        assert!(item.accepts(ContainerKind::Cold));
        assert!(!item.accepts(ContainerKind::Small));
    }

    #[test]
    fn json_defaults_fill_optional_fields() {
        let json = r#"{"items":[{"key":"book","name":"Book","delivery_limit_days":2,
            "damaged_threshold":50,"broken_threshold":5}]}"#;
        let catalog = ItemCatalog::from_json(json).expect("parse");
        let book = catalog.get("book").expect("book");
        assert!((book.base_quality - 100.0).abs() < f32::EPSILON);
        assert_eq!(book.weight, 5);
        assert_eq!(book.fall.min_height_m, 1);
        assert!((book.water.damage_per_second - 1.0).abs() < f32::EPSILON);
        assert!(catalog.get("missing").is_none());
    }
}
