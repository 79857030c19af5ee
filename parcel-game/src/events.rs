//! Structured events emitted by the parcel session.
//!
//! Events are how the session talks back to the outer game: the customer
//! actors react to `CustomerNotified` and `DeliveryCompleted`, the UI renders
//! the `ui_key`. `kind` is the mechanical descriptor.

use serde::{Deserialize, Serialize};

use crate::delivery::DeliveryReceipt;
use crate::ids::{ContainerId, CustomerId, ItemId};
use crate::protection::{ContainerKind, CushionType, TapeColor};

/// Stable, deterministic identifier for a single event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    /// One-based day counter when the event occurred.
    pub day: u32,
    /// Per-day sequence number (0-based).
    pub seq: u16,
}

impl EventId {
    #[must_use]
    pub const fn new(day: u32, seq: u16) -> Self {
        Self { day, seq }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSeverity {
    Info,
    Warning,
    Critical,
}

/// Where a damage event landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "at", content = "id")]
pub enum DamageTarget {
    Loose(ItemId),
    Container(ContainerId),
    CarrySlot(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum EventKind {
    OrderAccepted {
        customer: CustomerId,
        item: ItemId,
    },
    OrderCancelled {
        customer: CustomerId,
    },
    ContainerSpawned {
        container: ContainerId,
        container_kind: ContainerKind,
    },
    ItemPacked {
        container: ContainerId,
        item_key: String,
    },
    ItemUnpacked {
        container: ContainerId,
        item: ItemId,
    },
    CushionApplied {
        container: ContainerId,
        cushion: CushionType,
        count: u8,
    },
    ContainerClosed {
        container: ContainerId,
    },
    ContainerTaped {
        container: ContainerId,
        color: TapeColor,
    },
    ContainerLabeled {
        container: ContainerId,
    },
    CustomerNotified {
        customer: CustomerId,
        container: ContainerId,
    },
    DeliveryCompleted {
        receipt: DeliveryReceipt,
    },
    ParcelStored {
        container: ContainerId,
        slot: usize,
    },
    ParcelRetrieved {
        container: ContainerId,
        slot: usize,
    },
    ItemDamaged {
        target: DamageTarget,
        amount: f32,
        quality: f32,
    },
    ItemBroken {
        target: DamageTarget,
    },
    ItemDiscarded {
        item: ItemId,
    },
    SuppliesPurchased {
        total: i64,
    },
    DayEnded {
        day: u32,
        deposited: i64,
    },
    ShopClosed {
        cancelled_orders: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub severity: EventSeverity,
    /// i18n key for presentation-layer rendering.
    pub ui_key: String,
}

/// Append-only buffer the presentation layer drains once per frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pending: Vec<SessionEvent>,
    day: u32,
    next_seq: u16,
}

impl EventLog {
    pub fn push(
        &mut self,
        day: u32,
        kind: EventKind,
        severity: EventSeverity,
        ui_key: &str,
    ) -> EventId {
        if day != self.day {
            self.day = day;
            self.next_seq = 0;
        }
        let id = EventId::new(day, self.next_seq);
        self.next_seq = self.next_seq.saturating_add(1);
        self.pending.push(SessionEvent {
            id,
            kind,
            severity,
            ui_key: ui_key.to_string(),
        });
        id
    }

    #[must_use]
    pub fn pending(&self) -> &[SessionEvent] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_restarts_each_day() {
        let mut log = EventLog::default();
        let first = log.push(
            1,
            EventKind::SuppliesPurchased { total: 10 },
            EventSeverity::Info,
            "log.shop.purchase",
        );
        let second = log.push(
            1,
            EventKind::ContainerClosed {
                container: ContainerId(1),
            },
            EventSeverity::Info,
            "log.packing.closed",
        );
        let next_day = log.push(
            2,
            EventKind::DayEnded {
                day: 1,
                deposited: 0,
            },
            EventSeverity::Info,
            "log.day.ended",
        );
        assert_eq!(first, EventId::new(1, 0));
        assert_eq!(second, EventId::new(1, 1));
        assert_eq!(next_day, EventId::new(2, 0));
        assert_eq!(log.drain().len(), 3);
        assert!(log.pending().is_empty());
    }

    #[test]
    fn events_roundtrip_through_json() {
        let mut log = EventLog::default();
        log.push(
            3,
            EventKind::ItemDamaged {
                target: DamageTarget::CarrySlot(2),
                amount: 5.0,
                quality: 95.0,
            },
            EventSeverity::Warning,
            "log.item.damaged",
        );
        let event = log.drain().remove(0);
        let json = serde_json::to_string(&event).expect("serialize");
        let restored: SessionEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, event);
    }
}
