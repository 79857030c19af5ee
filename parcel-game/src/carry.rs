//! Player carry slots holding snapshots of packed boxes.
//!
//! A snapshot is detached from the world box it came from. Damage applied here
//! uses the protection captured when the box was stored.
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::{Container, PackingRecord};
use crate::delivery::ParcelView;
use crate::ids::ContainerId;
use crate::item::{DamageReport, ItemCondition};
use crate::protection::{ContainerKind, CushionType, Protection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CarryError {
    #[error("all {capacity} carry slots are occupied")]
    NoFreeSlot { capacity: usize },
    #[error("container holds no item")]
    NoItem,
    #[error("carry slot {index} is empty")]
    EmptySlot { index: usize },
    #[error("carry slot {index} does not exist")]
    InvalidSlot { index: usize },
}

/// Refused store; the box stays with the caller.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct StoreRejected {
    pub reason: CarryError,
    pub container: Box<Container>,
}

/// A stored box: its packing progress and a private copy of the item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrySnapshot {
    pub origin: ContainerId,
    pub packing: PackingRecord,
    pub item: ItemCondition,
    pub remaining_days: u32,
    pub protection_divisor: u32,
    pub waterproof: bool,
}

impl CarrySnapshot {
    #[must_use]
    pub const fn kind(&self) -> ContainerKind {
        self.packing.kind
    }

    #[must_use]
    pub const fn protection(&self) -> Protection {
        Protection::new(self.protection_divisor, self.waterproof)
    }

    #[must_use]
    pub fn parcel_view(&self) -> ParcelView<'_> {
        ParcelView {
            condition: &self.item,
            cold_capable: self.packing.kind.is_cold_capable(),
            ice_cushion: self.packing.cushion == CushionType::Ice,
        }
    }

    /// Put the box back into the world where it left off.
    #[must_use]
    pub fn materialize(self) -> (ContainerId, Container) {
        (
            self.origin,
            Container::from_parts(self.packing, Some(self.item)),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarryStore {
    slots: Vec<Option<CarrySnapshot>>,
}

impl CarryStore {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&CarrySnapshot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn slots(&self) -> &[Option<CarrySnapshot>] {
        &self.slots
    }

    pub fn occupied(&self) -> impl Iterator<Item = (usize, &CarrySnapshot)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|snapshot| (index, snapshot)))
    }

    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_none()).count()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_slots() == 0
    }

    /// Snapshot `container` into the first free slot, consuming it.
    ///
    /// # Errors
    ///
    /// Returns the container inside `StoreRejected` when every slot is taken or
    /// the box is empty.
    pub fn store(
        &mut self,
        origin: ContainerId,
        container: Container,
        remaining_days: u32,
    ) -> Result<usize, StoreRejected> {
        let Some(index) = self.slots.iter().position(Option::is_none) else {
            return Err(StoreRejected {
                reason: CarryError::NoFreeSlot {
                    capacity: self.capacity(),
                },
                container: Box::new(container),
            });
        };
        let protection = container.protection();
        let (packing, item) = container.into_parts();
        let Some(item) = item else {
            return Err(StoreRejected {
                reason: CarryError::NoItem,
                container: Box::new(Container::from_parts(packing, None)),
            });
        };
        debug!("stored {origin} in carry slot {index}");
        self.slots[index] = Some(CarrySnapshot {
            origin,
            packing,
            item,
            remaining_days,
            protection_divisor: protection.divisor,
            waterproof: protection.waterproof,
        });
        Ok(index)
    }

    /// Free a slot and rebuild its box.
    ///
    /// # Errors
    ///
    /// Returns `CarryError` for an out-of-range or empty slot.
    pub fn retrieve(&mut self, index: usize) -> Result<(ContainerId, Container), CarryError> {
        self.take(index).map(CarrySnapshot::materialize)
    }

    /// Free a slot and hand back the raw snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CarryError` for an out-of-range or empty slot.
    pub fn take(&mut self, index: usize) -> Result<CarrySnapshot, CarryError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(CarryError::InvalidSlot { index })?;
        slot.take().ok_or(CarryError::EmptySlot { index })
    }

    pub fn advance_one_day(&mut self) {
        self.advance_days(1);
    }

    pub fn advance_days(&mut self, days: u32) {
        for snapshot in self.slots.iter_mut().flatten() {
            snapshot.remaining_days = snapshot.remaining_days.saturating_sub(days);
        }
    }

    #[must_use]
    /// First slot bound for `destination` whose snapshot also passes `accept`.
    pub fn find_by_destination<F>(&self, destination: &str, accept: F) -> Option<usize>
    where
        F: Fn(&CarrySnapshot) -> bool,
    {
        self.occupied()
            .find(|(_, snapshot)| snapshot.item.destination() == destination && accept(snapshot))
            .map(|(index, _)| index)
    }

    pub fn apply_fall_damage_to_all(&mut self, height_m: f32) -> Vec<(usize, DamageReport)> {
        self.apply_to_all(|snapshot| {
            let divisor = snapshot.protection_divisor;
            snapshot.item.apply_fall_height(height_m, divisor)
        })
    }

    pub fn apply_water_contact_to_all(&mut self) -> Vec<(usize, DamageReport)> {
        self.apply_to_all(|snapshot| {
            let protection = snapshot.protection();
            snapshot.item.apply_water_contact(protection)
        })
    }

    pub fn apply_water_damage_to_all(&mut self, dt_secs: f32) -> Vec<(usize, DamageReport)> {
        self.apply_to_all(|snapshot| {
            let protection = snapshot.protection();
            snapshot.item.apply_water_exposure(dt_secs, protection)
        })
    }

    pub fn leave_water_all(&mut self) {
        for snapshot in self.slots.iter_mut().flatten() {
            snapshot.item.leave_water();
        }
    }

    fn apply_to_all(
        &mut self,
        mut apply: impl FnMut(&mut CarrySnapshot) -> DamageReport,
    ) -> Vec<(usize, DamageReport)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|snapshot| (index, apply(snapshot))))
            .filter(|(_, report)| !report.is_noop())
            .collect()
    }
}
