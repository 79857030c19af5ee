//! Active deliveries and payout on completion.
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ContainerId, CustomerId};
use crate::item::ItemCondition;
use crate::ledger::StockLedger;

/// What the ledger needs to know about a parcel at hand-over.
#[derive(Debug, Clone, Copy)]
pub struct ParcelView<'a> {
    pub condition: &'a ItemCondition,
    pub cold_capable: bool,
    pub ice_cushion: bool,
}

impl ParcelView<'_> {
    #[must_use]
    pub fn effective_deadline_days(&self) -> u32 {
        self.condition
            .effective_deadline_days(self.cold_capable, self.ice_cushion)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub container: ContainerId,
    #[serde(default)]
    pub customer: Option<CustomerId>,
    pub item_key: String,
    pub destination: String,
    pub day_created: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub container: ContainerId,
    pub customer: Option<CustomerId>,
    pub item_key: String,
    pub destination: String,
    pub quality: f32,
    pub reward: i64,
    pub days_used: u32,
    pub effective_deadline_days: u32,
    pub late: bool,
    pub broken: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("delivery capacity of {capacity} is already in use")]
    CapacityFull { capacity: usize },
    #[error("item '{item}' has no destination")]
    EmptyDestination { item: String },
    #[error("{container} already has an active delivery")]
    AlreadyRegistered { container: ContainerId },
    #[error("no active delivery for {container}")]
    NotFound { container: ContainerId },
}

/// Bounded list of parcels that are packed and waiting to be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLedger {
    capacity: usize,
    records: Vec<DeliveryRecord>,
}

impl DeliveryLedger {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    #[must_use]
    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    #[must_use]
    pub fn record(&self, container: ContainerId) -> Option<&DeliveryRecord> {
        self.records.iter().find(|r| r.container == container)
    }

    #[must_use]
    pub fn find_by_destination(&self, destination: &str) -> Option<&DeliveryRecord> {
        self.records.iter().find(|r| r.destination == destination)
    }

    /// Whether `register` would accept this parcel.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` when full, already registered or missing a destination.
    pub fn check_register(
        &self,
        container: ContainerId,
        item: &ItemCondition,
    ) -> Result<(), DeliveryError> {
        if self.is_full() {
            return Err(DeliveryError::CapacityFull {
                capacity: self.capacity,
            });
        }
        if self.record(container).is_some() {
            return Err(DeliveryError::AlreadyRegistered { container });
        }
        if item.destination().trim().is_empty() {
            warn!(
                "item {} has no destination; delivery not registered",
                item.definition().key
            );
            return Err(DeliveryError::EmptyDestination {
                item: item.definition().key.clone(),
            });
        }
        Ok(())
    }

    /// # Errors
    ///
    /// See [`DeliveryLedger::check_register`].
    pub fn register(
        &mut self,
        container: ContainerId,
        customer: Option<CustomerId>,
        item: &ItemCondition,
        day_created: u32,
    ) -> Result<&DeliveryRecord, DeliveryError> {
        self.check_register(container, item)?;
        let index = self.records.len();
        self.records.push(DeliveryRecord {
            container,
            customer,
            item_key: item.definition().key.clone(),
            destination: item.destination().to_string(),
            day_created,
        });
        Ok(&self.records[index])
    }

    /// Days left before the parcel counts as late, if it is registered.
    #[must_use]
    pub fn remaining_days(
        &self,
        container: ContainerId,
        parcel: ParcelView<'_>,
        today: u32,
    ) -> Option<u32> {
        let record = self.record(container)?;
        let elapsed = today.saturating_sub(record.day_created);
        Some(parcel.effective_deadline_days().saturating_sub(elapsed))
    }

    /// Pay out and close the delivery for `container`.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::NotFound` when nothing is registered for it.
    pub fn complete(
        &mut self,
        container: ContainerId,
        parcel: ParcelView<'_>,
        day_delivered: u32,
        stock: &mut StockLedger,
    ) -> Result<DeliveryReceipt, DeliveryError> {
        let index = self
            .records
            .iter()
            .position(|r| r.container == container)
            .ok_or(DeliveryError::NotFound { container })?;
        let record = self.records.remove(index);
        let effective = parcel.effective_deadline_days();
        let reward = parcel
            .condition
            .calculate_reward(record.day_created, day_delivered, effective);
        let days_used = day_delivered.saturating_sub(record.day_created);
        stock.add_cash(reward);
        info!(
            "delivered {} to {}: reward {reward} after {days_used} day(s)",
            record.item_key, record.destination
        );
        Ok(DeliveryReceipt {
            container,
            customer: record.customer,
            item_key: record.item_key,
            destination: record.destination,
            quality: parcel.condition.quality(),
            reward,
            days_used,
            effective_deadline_days: effective,
            late: days_used > effective,
            broken: parcel.condition.is_broken(),
        })
    }

    /// Drop a delivery without paying.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::NotFound` when nothing is registered for it.
    pub fn cancel(&mut self, container: ContainerId) -> Result<DeliveryRecord, DeliveryError> {
        let index = self
            .records
            .iter()
            .position(|r| r.container == container)
            .ok_or(DeliveryError::NotFound { container })?;
        Ok(self.records.remove(index))
    }

    /// Drop every delivery belonging to `customer`.
    pub fn cancel_for_customer(&mut self, customer: CustomerId) -> Vec<DeliveryRecord> {
        let (cancelled, kept): (Vec<_>, Vec<_>) = self
            .records
            .drain(..)
            .partition(|r| r.customer == Some(customer));
        self.records = kept;
        cancelled
    }
}
