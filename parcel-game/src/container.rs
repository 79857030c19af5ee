//! The packing box and its state machine.
//!
//! Steps only move forward. The single exception is taking the item back out
//! before any cushioning went in, which returns the box to `Empty`.
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::ItemDefinition;
use crate::constants::CUSHION_APPLICATIONS_REQUIRED;
use crate::delivery::ParcelView;
use crate::item::{DamageReport, ItemCondition, height_for_velocity};
use crate::ledger::{StockError, StockLedger};
use crate::protection::{
    ContainerKind, CushionType, Protection, ProtectionTable, TapeColor, damage_divisor,
    protection_fraction,
};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum PackingStep {
    #[default]
    Empty,
    ItemInside,
    CushionDone,
    Closed,
    Taped,
    Labeled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalMode {
    /// Sits on the packing table.
    #[default]
    Anchored,
    /// Can be picked up and carried.
    Pickable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LidSide {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackingError {
    #[error("container already holds an item")]
    AlreadyHoldsItem,
    #[error("item '{item}' does not fit a {kind:?} container")]
    KindNotAccepted { kind: ContainerKind, item: String },
    #[error("container holds no item")]
    NoItem,
    #[error("cushioning has started; the item can no longer be removed")]
    CushionStarted,
    #[error("cannot {action} while the container is {step:?}")]
    OutOfSequence {
        action: &'static str,
        step: PackingStep,
    },
    #[error("no cushioning type selected")]
    NoCushionSelected,
    #[error("{cushion:?} cushioning does not fit a {kind:?} container")]
    CushionIncompatible {
        cushion: CushionType,
        kind: ContainerKind,
    },
    #[error("cushioning is already complete")]
    CushionFull,
    #[error("container is cushioned with {current:?}, not {requested:?}")]
    CushionMismatch {
        current: CushionType,
        requested: CushionType,
    },
    #[error("cushioning must be complete first")]
    CushionIncomplete,
    #[error("lids are sealed")]
    LidsSealed,
    #[error(transparent)]
    Stock(#[from] StockError),
}

/// Refused insertion; hands the item back to the caller.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct InsertRejected {
    pub reason: PackingError,
    pub item: ItemCondition,
}

/// Everything about a box except its contents and lid physics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingRecord {
    pub kind: ContainerKind,
    pub base_divisor: u32,
    pub step: PackingStep,
    pub cushion: CushionType,
    pub cushion_count: u8,
    pub tape_color: Option<TapeColor>,
}

impl PackingRecord {
    #[must_use]
    pub const fn new(kind: ContainerKind, base_divisor: u32) -> Self {
        Self {
            kind,
            base_divisor,
            step: PackingStep::Empty,
            cushion: CushionType::None,
            cushion_count: 0,
            tape_color: None,
        }
    }

    #[must_use]
    pub const fn damage_divisor(&self) -> u32 {
        damage_divisor(self.base_divisor, self.cushion)
    }

    #[must_use]
    pub const fn protection(&self) -> Protection {
        Protection::new(self.damage_divisor(), self.kind.is_waterproof())
    }

    #[must_use]
    pub const fn cushion_complete(&self) -> bool {
        self.cushion_count >= CUSHION_APPLICATIONS_REQUIRED
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    record: PackingRecord,
    item: Option<ItemCondition>,
    left_lid_closed: bool,
    right_lid_closed: bool,
    mode: PhysicalMode,
    loose_items_attached: bool,
}

impl Container {
    #[must_use]
    pub fn new(kind: ContainerKind, base_divisor: u32) -> Self {
        Self::from_parts(PackingRecord::new(kind, base_divisor), None)
    }

    #[must_use]
    pub fn from_table(kind: ContainerKind, table: &ProtectionTable) -> Self {
        Self::new(kind, table.base_divisor(kind))
    }

    /// Rebuild a box from a stored record, e.g. when a carried parcel is put down.
    #[must_use]
    pub fn from_parts(record: PackingRecord, item: Option<ItemCondition>) -> Self {
        let sealed = record.step >= PackingStep::Closed;
        let labeled = record.step == PackingStep::Labeled;
        Self {
            record,
            item,
            left_lid_closed: sealed,
            right_lid_closed: sealed,
            mode: if labeled {
                PhysicalMode::Pickable
            } else {
                PhysicalMode::Anchored
            },
            loose_items_attached: labeled,
        }
    }

    #[must_use]
    pub fn into_parts(self) -> (PackingRecord, Option<ItemCondition>) {
        (self.record, self.item)
    }

    #[must_use]
    pub const fn record(&self) -> &PackingRecord {
        &self.record
    }

    #[must_use]
    pub const fn kind(&self) -> ContainerKind {
        self.record.kind
    }

    #[must_use]
    pub const fn step(&self) -> PackingStep {
        self.record.step
    }

    #[must_use]
    pub const fn cushion(&self) -> CushionType {
        self.record.cushion
    }

    #[must_use]
    pub const fn cushion_count(&self) -> u8 {
        self.record.cushion_count
    }

    #[must_use]
    pub const fn tape_color(&self) -> Option<TapeColor> {
        self.record.tape_color
    }

    #[must_use]
    pub const fn is_waterproof(&self) -> bool {
        self.record.kind.is_waterproof()
    }

    #[must_use]
    pub const fn is_cold_capable(&self) -> bool {
        self.record.kind.is_cold_capable()
    }

    #[must_use]
    pub fn uses_ice(&self) -> bool {
        self.record.cushion == CushionType::Ice
    }

    #[must_use]
    pub fn tape_complete(&self) -> bool {
        self.record.step >= PackingStep::Taped
    }

    #[must_use]
    pub fn label_complete(&self) -> bool {
        self.record.step == PackingStep::Labeled
    }

    #[must_use]
    pub const fn mode(&self) -> PhysicalMode {
        self.mode
    }

    #[must_use]
    pub const fn loose_items_attached(&self) -> bool {
        self.loose_items_attached
    }

    #[must_use]
    pub const fn lids_closed(&self) -> (bool, bool) {
        (self.left_lid_closed, self.right_lid_closed)
    }

    #[must_use]
    pub const fn item(&self) -> Option<&ItemCondition> {
        self.item.as_ref()
    }

    #[must_use]
    pub const fn damage_divisor(&self) -> u32 {
        self.record.damage_divisor()
    }

    #[must_use]
    pub fn protection_fraction(&self) -> f32 {
        protection_fraction(self.damage_divisor())
    }

    #[must_use]
    pub const fn protection(&self) -> Protection {
        self.record.protection()
    }

    #[must_use]
    pub fn parcel_view(&self) -> Option<ParcelView<'_>> {
        self.item.as_ref().map(|condition| ParcelView {
            condition,
            cold_capable: self.is_cold_capable(),
            ice_cushion: self.uses_ice(),
        })
    }

    /// Whether `definition` may go into this box right now.
    ///
    /// # Errors
    ///
    /// Returns `PackingError` describing the refusal.
    pub fn check_insert(&self, definition: &ItemDefinition) -> Result<(), PackingError> {
        if self.item.is_some() {
            return Err(PackingError::AlreadyHoldsItem);
        }
        if self.record.step != PackingStep::Empty {
            return Err(PackingError::OutOfSequence {
                action: "insert an item",
                step: self.record.step,
            });
        }
        if !definition.accepts(self.record.kind) {
            return Err(PackingError::KindNotAccepted {
                kind: self.record.kind,
                item: definition.key.clone(),
            });
        }
        Ok(())
    }

    /// Take ownership of an item that entered the box.
    ///
    /// # Errors
    ///
    /// Returns the item back inside `InsertRejected` when the box refuses it.
    pub fn insert_item(&mut self, item: ItemCondition) -> Result<(), InsertRejected> {
        if let Err(reason) = self.check_insert(item.definition()) {
            return Err(InsertRejected { reason, item });
        }
        debug!("{} packed into {:?}", item.definition().key, self.record.kind);
        self.item = Some(item);
        self.record.step = PackingStep::ItemInside;
        Ok(())
    }

    /// Take the item back out before cushioning starts.
    ///
    /// # Errors
    ///
    /// Returns `PackingError` once cushioning has started or the box is past
    /// `ItemInside`.
    pub fn remove_item(&mut self) -> Result<ItemCondition, PackingError> {
        if self.record.step != PackingStep::ItemInside {
            return Err(if self.item.is_none() {
                PackingError::NoItem
            } else {
                PackingError::OutOfSequence {
                    action: "remove the item",
                    step: self.record.step,
                }
            });
        }
        if self.record.cushion_count > 0 {
            return Err(PackingError::CushionStarted);
        }
        let item = self.item.take().ok_or(PackingError::NoItem)?;
        self.record.step = PackingStep::Empty;
        Ok(item)
    }

    /// Add one unit of cushioning, consuming one use from stock.
    ///
    /// Returns the number of applications so far.
    ///
    /// # Errors
    ///
    /// Returns `PackingError` when out of sequence, incompatible, already full,
    /// mixed with another type, or when stock has no use left.
    pub fn apply_cushion(
        &mut self,
        cushion: CushionType,
        stock: &mut StockLedger,
    ) -> Result<u8, PackingError> {
        self.check_cushion(cushion)?;
        if !stock.has_cushion_use(cushion) {
            return Err(StockError::OutOfCushion { cushion }.into());
        }
        stock.try_consume_cushion(cushion)?;
        self.record.cushion = cushion;
        self.record.cushion_count = self.record.cushion_count.saturating_add(1);
        if self.record.cushion_complete() {
            self.record.step = PackingStep::CushionDone;
        }
        Ok(self.record.cushion_count)
    }

    fn check_cushion(&self, cushion: CushionType) -> Result<(), PackingError> {
        if self.item.is_none() {
            return Err(PackingError::NoItem);
        }
        if !matches!(
            self.record.step,
            PackingStep::ItemInside | PackingStep::CushionDone
        ) {
            return Err(PackingError::OutOfSequence {
                action: "add cushioning",
                step: self.record.step,
            });
        }
        if cushion == CushionType::None {
            return Err(PackingError::NoCushionSelected);
        }
        if !cushion.fits(self.record.kind) {
            return Err(PackingError::CushionIncompatible {
                cushion,
                kind: self.record.kind,
            });
        }
        if self.record.cushion_complete() {
            return Err(PackingError::CushionFull);
        }
        if self.record.cushion_count > 0 && self.record.cushion != cushion {
            return Err(PackingError::CushionMismatch {
                current: self.record.cushion,
                requested: cushion,
            });
        }
        Ok(())
    }

    /// Move one lid. Lids only close over finished cushioning and cannot
    /// reopen once the box is sealed.
    ///
    /// # Errors
    ///
    /// Returns `PackingError::CushionIncomplete` or `PackingError::LidsSealed`.
    pub fn set_lid(&mut self, side: LidSide, closed: bool) -> Result<(), PackingError> {
        if self.record.step >= PackingStep::Closed {
            return if closed {
                Ok(())
            } else {
                Err(PackingError::LidsSealed)
            };
        }
        if closed && !self.record.cushion_complete() {
            return Err(PackingError::CushionIncomplete);
        }
        match side {
            LidSide::Left => self.left_lid_closed = closed,
            LidSide::Right => self.right_lid_closed = closed,
        }
        Ok(())
    }

    /// Derive the sealed step from the lid sub-state. Returns true on transition.
    pub fn sync_lids(&mut self) -> bool {
        if self.record.step == PackingStep::CushionDone
            && self.left_lid_closed
            && self.right_lid_closed
        {
            self.record.step = PackingStep::Closed;
            debug!("{:?} container sealed", self.record.kind);
            return true;
        }
        false
    }

    /// Close both lids and seal.
    ///
    /// # Errors
    ///
    /// Returns `PackingError` when cushioning is unfinished.
    pub fn close_lids(&mut self) -> Result<(), PackingError> {
        self.set_lid(LidSide::Left, true)?;
        self.set_lid(LidSide::Right, true)?;
        self.sync_lids();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PackingError` when the box is not sealed or no tape use is left.
    pub fn apply_tape(
        &mut self,
        color: TapeColor,
        stock: &mut StockLedger,
    ) -> Result<(), PackingError> {
        if self.item.is_none() {
            return Err(PackingError::NoItem);
        }
        if !self.record.cushion_complete() {
            return Err(PackingError::CushionIncomplete);
        }
        if self.record.step != PackingStep::Closed {
            return Err(PackingError::OutOfSequence {
                action: "tape",
                step: self.record.step,
            });
        }
        stock.try_consume_tape(color)?;
        self.record.tape_color = Some(color);
        self.record.step = PackingStep::Taped;
        Ok(())
    }

    /// Whether a label may be attached now.
    ///
    /// # Errors
    ///
    /// Returns `PackingError` unless the box is taped with an item inside.
    pub fn check_label(&self) -> Result<(), PackingError> {
        if self.item.is_none() {
            return Err(PackingError::NoItem);
        }
        if self.record.step != PackingStep::Taped {
            return Err(PackingError::OutOfSequence {
                action: "label",
                step: self.record.step,
            });
        }
        Ok(())
    }

    /// Finish packing: contents are fixed in place and the box becomes pickable.
    ///
    /// # Errors
    ///
    /// Returns `PackingError` unless the box is taped with an item inside.
    pub fn attach_label(&mut self) -> Result<(), PackingError> {
        self.check_label()?;
        self.record.step = PackingStep::Labeled;
        self.loose_items_attached = true;
        self.mode = PhysicalMode::Pickable;
        Ok(())
    }

    /// Impact on the box. Only a sealed box passes it on to the item.
    pub fn on_collision(&mut self, relative_velocity: f32) -> Option<DamageReport> {
        if self.record.step < PackingStep::Closed {
            return None;
        }
        let divisor = self.damage_divisor();
        let item = self.item.as_mut()?;
        Some(item.apply_fall_height(height_for_velocity(relative_velocity), divisor))
    }

    pub fn on_water_contact(&mut self) -> Option<DamageReport> {
        let protection = self.protection();
        self.item
            .as_mut()
            .map(|item| item.apply_water_contact(protection))
    }

    pub fn on_water_exposure(&mut self, dt_secs: f32) -> Option<DamageReport> {
        let protection = self.protection();
        self.item
            .as_mut()
            .map(|item| item.apply_water_exposure(dt_secs, protection))
    }

    pub fn leave_water(&mut self) {
        if let Some(item) = self.item.as_mut() {
            item.leave_water();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FallProfile, ItemCategory, WaterProfile};
    use smallvec::SmallVec;
    use std::sync::Arc;

    fn item(allowed: &[ContainerKind]) -> ItemCondition {
        ItemCondition::new(Arc::new(ItemDefinition {
            key: "mug".to_string(),
            name: "Mug".to_string(),
            category: ItemCategory::Fragile,
            base_quality: 100.0,
            base_reward: 40,
            delivery_limit_days: 3,
            damaged_threshold: 50.0,
            broken_threshold: 10.0,
            fall: FallProfile {
                min_height_m: 1,
                damage_per_meter: 10,
            },
            water: WaterProfile {
                breaks_instantly: true,
                ..WaterProfile::default()
            },
            requires_cold: false,
            allowed_containers: allowed.iter().copied().collect::<SmallVec<_>>(),
            destination: "cafe".to_string(),
            weight: 5,
        }))
    }

    fn stocked() -> StockLedger {
        let mut stock = StockLedger::new();
        stock.add_cushion_packs(CushionType::Basic, 2);
        stock.add_cushion_packs(CushionType::Strong, 1);
        stock.add_tape_rolls(TapeColor::Red, 1);
        stock
    }

    fn cushioned(kind: ContainerKind, stock: &mut StockLedger) -> Container {
        let mut container = Container::new(kind, 2);
        container.insert_item(item(&[])).expect("insert");
        for _ in 0..3 {
            container
                .apply_cushion(CushionType::Strong, stock)
                .expect("cushion");
        }
        container
    }

    #[test]
    fn happy_path_reaches_labeled() {
        let mut stock = stocked();
        let mut container = Container::new(ContainerKind::Small, 2);
        container.insert_item(item(&[])).expect("insert");
        assert_eq!(container.step(), PackingStep::ItemInside);
        for expected in 1..=3 {
            let count = container
                .apply_cushion(CushionType::Basic, &mut stock)
                .expect("cushion");
            assert_eq!(count, expected);
        }
        assert_eq!(container.step(), PackingStep::CushionDone);
        assert_eq!(stock.cushion_uses(CushionType::Basic), 3);

        container.close_lids().expect("lids");
        assert_eq!(container.step(), PackingStep::Closed);
        container.apply_tape(TapeColor::Red, &mut stock).expect("tape");
        assert!(container.tape_complete());
        assert_eq!(stock.tape_uses(TapeColor::Red), 9);
        container.attach_label().expect("label");
        assert!(container.label_complete());
        assert_eq!(container.mode(), PhysicalMode::Pickable);
        assert!(container.loose_items_attached());
    }

    #[test]
    fn disallowed_kind_hands_item_back() {
        let mut container = Container::new(ContainerKind::Small, 2);
        let rejected = container
            .insert_item(item(&[ContainerKind::Large]))
            .unwrap_err();
        assert!(matches!(
            rejected.reason,
            PackingError::KindNotAccepted { .. }
        ));
        assert_eq!(rejected.item.definition().key, "mug");
        assert_eq!(container.step(), PackingStep::Empty);
        assert!(container.item().is_none());
    }

    #[test]
    fn removal_resets_only_before_cushioning() {
        let mut stock = stocked();
        let mut container = Container::new(ContainerKind::Medium, 2);
        container.insert_item(item(&[])).expect("insert");
        let back = container.remove_item().expect("remove");
        assert_eq!(container.step(), PackingStep::Empty);
        container.insert_item(back).expect("reinsert");
        container
            .apply_cushion(CushionType::Basic, &mut stock)
            .expect("cushion");
        assert_eq!(container.remove_item(), Err(PackingError::CushionStarted));
        assert_eq!(container.step(), PackingStep::ItemInside);
        assert!(container.item().is_some());
    }

    #[test]
    fn cushion_rules() {
        let mut stock = stocked();
        let mut stock_ice = StockLedger::new();
        stock_ice.add_cushion_packs(CushionType::Ice, 1);

        let mut empty = Container::new(ContainerKind::Small, 2);
        assert_eq!(
            empty.apply_cushion(CushionType::Basic, &mut stock),
            Err(PackingError::NoItem)
        );

        let mut small = Container::new(ContainerKind::Small, 2);
        small.insert_item(item(&[])).expect("insert");
        assert!(matches!(
            small.apply_cushion(CushionType::Ice, &mut stock_ice),
            Err(PackingError::CushionIncompatible { .. })
        ));
        assert_eq!(stock_ice.cushion_uses(CushionType::Ice), 3);

        small
            .apply_cushion(CushionType::Basic, &mut stock)
            .expect("basic");
        assert!(matches!(
            small.apply_cushion(CushionType::Strong, &mut stock),
            Err(PackingError::CushionMismatch { .. })
        ));

        let mut full = cushioned(ContainerKind::Large, &mut stock);
        assert_eq!(
            full.apply_cushion(CushionType::Strong, &mut stock),
            Err(PackingError::CushionFull)
        );
    }

    #[test]
    fn empty_stock_leaves_state_unchanged() {
        let mut stock = StockLedger::new();
        let mut container = Container::new(ContainerKind::Small, 2);
        container.insert_item(item(&[])).expect("insert");
        let before = container.clone();
        assert!(matches!(
            container.apply_cushion(CushionType::Basic, &mut stock),
            Err(PackingError::Stock(StockError::OutOfCushion { .. }))
        ));
        assert_eq!(container, before);
    }

    #[test]
    fn lids_need_cushioning_and_seal_for_good() {
        let mut stock = stocked();
        let mut container = Container::new(ContainerKind::Small, 2);
        container.insert_item(item(&[])).expect("insert");
        assert_eq!(
            container.set_lid(LidSide::Left, true),
            Err(PackingError::CushionIncomplete)
        );

        let mut container = cushioned(ContainerKind::Small, &mut stock);
        container.set_lid(LidSide::Left, true).expect("left");
        assert!(!container.sync_lids());
        container.set_lid(LidSide::Right, true).expect("right");
        assert!(container.sync_lids());
        assert_eq!(container.step(), PackingStep::Closed);
        assert_eq!(
            container.set_lid(LidSide::Left, false),
            Err(PackingError::LidsSealed)
        );
    }

    #[test]
    fn tape_and_label_need_order() {
        let mut stock = stocked();
        let mut container = cushioned(ContainerKind::Small, &mut stock);
        assert!(matches!(
            container.apply_tape(TapeColor::Red, &mut stock),
            Err(PackingError::OutOfSequence { .. })
        ));
        assert!(container.attach_label().is_err());
        container.close_lids().expect("lids");
        assert!(matches!(
            container.apply_tape(TapeColor::Green, &mut stock),
            Err(PackingError::Stock(StockError::OutOfTape { .. }))
        ));
        assert_eq!(container.step(), PackingStep::Closed);
    }

    #[test]
    fn collisions_only_reach_sealed_contents() {
        let mut stock = stocked();
        let mut container = cushioned(ContainerKind::Small, &mut stock);
        assert_eq!(container.damage_divisor(), 6);
        let v = (2.0 * 9.81_f32 * 3.0).sqrt();
        assert!(container.on_collision(v).is_none());
        container.close_lids().expect("lids");
        let report = container.on_collision(v).expect("sealed");
        assert!((report.applied - 5.0).abs() < f32::EPSILON);
        assert!((container.protection_fraction() - (1.0 - 1.0 / 6.0)).abs() < 1e-6);
    }

    #[test]
    fn waterproof_box_blocks_instant_break() {
        let mut stock = stocked();
        let mut dry = cushioned(ContainerKind::WaterproofMedium, &mut stock);
        let report = dry.on_water_contact().expect("item");
        assert!(report.is_noop());
        assert!((dry.item().expect("item").quality() - 100.0).abs() < f32::EPSILON);

        let mut wet = Container::new(ContainerKind::Medium, 2);
        wet.insert_item(item(&[])).expect("insert");
        let report = wet.on_water_contact().expect("item");
        assert!(report.became_broken);
    }

    #[test]
    fn parts_round_trip_keeps_progress() {
        let mut stock = stocked();
        let mut container = cushioned(ContainerKind::Cold, &mut stock);
        container.close_lids().expect("lids");
        let (record, item) = container.clone().into_parts();
        let restored = Container::from_parts(record, item);
        assert_eq!(restored.step(), PackingStep::Closed);
        assert_eq!(restored.lids_closed(), (true, true));
        assert_eq!(restored.damage_divisor(), container.damage_divisor());
    }
}
