//! The session owns every service of a running shop and routes outside events
//! (player input, physics callbacks, customer actors) into them.
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::carry::{CarryError, CarryStore};
use crate::catalog::ItemCatalog;
use crate::clock::GameClock;
use crate::config::{ConfigError, SessionConfig};
use crate::constants::{
    CUSHION_APPLICATIONS_REQUIRED, LOG_CONTAINER_CLOSED, LOG_CONTAINER_LABELED,
    LOG_CONTAINER_SPAWNED, LOG_CONTAINER_TAPED, LOG_CUSHION_APPLIED, LOG_CUSTOMER_NOTIFIED,
    LOG_DAY_ENDED, LOG_DELIVERY_COMPLETED, LOG_ITEM_BROKEN, LOG_ITEM_DAMAGED, LOG_ITEM_DISCARDED,
    LOG_ITEM_PACKED, LOG_ITEM_UNPACKED, LOG_ORDER_ACCEPTED, LOG_ORDER_CANCELLED,
    LOG_PARCEL_RETRIEVED, LOG_PARCEL_STORED, LOG_SHOP_CLOSED, LOG_SUPPLIES_PURCHASED,
};
use crate::container::{Container, LidSide, PackingError};
use crate::delivery::{DeliveryError, DeliveryLedger, DeliveryReceipt};
use crate::events::{DamageTarget, EventKind, EventLog, EventSeverity, SessionEvent};
use crate::ids::{ContainerId, CustomerId, ItemId};
use crate::item::{DamageReport, ItemCondition};
use crate::ledger::{StockError, StockLedger};
use crate::numbers::u32_to_f32;
use crate::protection::{ContainerKind, CushionType, Protection, TapeColor};
use crate::shop::{CartLine, ShopError, ShopReceipt};
use crate::tween::{Tween, TweenBoard, TweenChannel};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown item '{key}'")]
    UnknownItem { key: String },
    #[error("{0} does not exist")]
    UnknownContainer(ContainerId),
    #[error("{0} does not exist")]
    UnknownLooseItem(ItemId),
    #[error("the shop is closed")]
    ShopClosed,
    #[error("no carried parcel is addressed to '{destination}'")]
    NothingForDestination { destination: String },
    #[error(transparent)]
    Packing(#[from] PackingError),
    #[error(transparent)]
    Stock(#[from] StockError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
    #[error(transparent)]
    Carry(#[from] CarryError),
    #[error(transparent)]
    Shop(#[from] ShopError),
}

/// A box on the shop floor and who it is for.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldContainer {
    pub container: Container,
    pub owner: Option<CustomerId>,
    pub submerged: bool,
}

/// An item on the counter, not yet packed.
#[derive(Debug, Clone, PartialEq)]
pub struct LooseItem {
    pub item: ItemCondition,
    pub owner: Option<CustomerId>,
    pub submerged: bool,
}

#[derive(Debug, Clone)]
pub struct ParcelSession {
    config: SessionConfig,
    catalog: ItemCatalog,
    stock: StockLedger,
    deliveries: DeliveryLedger,
    carry: CarryStore,
    clock: GameClock,
    tweens: TweenBoard,
    events: EventLog,
    containers: BTreeMap<ContainerId, WorldContainer>,
    loose_items: BTreeMap<ItemId, LooseItem>,
    next_handle: u32,
    shop_open: bool,
    player_in_water: bool,
}

impl ParcelSession {
    /// Open a shop with the configured starting stock.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the config is out of bounds.
    pub fn new(config: SessionConfig, catalog: ItemCatalog) -> Result<Self, ConfigError> {
        config.validate()?;
        let stock = config.starting_stock.to_ledger();
        Ok(Self {
            deliveries: DeliveryLedger::new(config.max_active_deliveries),
            carry: CarryStore::new(config.carry_slots),
            clock: GameClock::new(config.seconds_per_game_hour, config.day_start_hour),
            stock,
            catalog,
            config,
            tweens: TweenBoard::default(),
            events: EventLog::default(),
            containers: BTreeMap::new(),
            loose_items: BTreeMap::new(),
            next_handle: 1,
            shop_open: true,
            player_in_water: false,
        })
    }

    /// Replace the ledger, e.g. with one restored from a save.
    #[must_use]
    pub fn with_stock(mut self, stock: StockLedger) -> Self {
        self.stock = stock;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn catalog(&self) -> &ItemCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn stock(&self) -> &StockLedger {
        &self.stock
    }

    pub const fn stock_mut(&mut self) -> &mut StockLedger {
        &mut self.stock
    }

    #[must_use]
    pub const fn deliveries(&self) -> &DeliveryLedger {
        &self.deliveries
    }

    #[must_use]
    pub const fn carry(&self) -> &CarryStore {
        &self.carry
    }

    #[must_use]
    pub const fn clock(&self) -> &GameClock {
        &self.clock
    }

    #[must_use]
    pub const fn tweens(&self) -> &TweenBoard {
        &self.tweens
    }

    #[must_use]
    pub const fn day(&self) -> u32 {
        self.stock.day()
    }

    #[must_use]
    pub const fn shop_open(&self) -> bool {
        self.shop_open
    }

    #[must_use]
    pub const fn player_in_water(&self) -> bool {
        self.player_in_water
    }

    #[must_use]
    pub fn container(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(&id).map(|world| &world.container)
    }

    #[must_use]
    pub fn world_container(&self, id: ContainerId) -> Option<&WorldContainer> {
        self.containers.get(&id)
    }

    pub fn containers(&self) -> impl Iterator<Item = (ContainerId, &WorldContainer)> {
        self.containers.iter().map(|(id, world)| (*id, world))
    }

    #[must_use]
    pub fn loose_item(&self, id: ItemId) -> Option<&LooseItem> {
        self.loose_items.get(&id)
    }

    pub fn loose_items(&self) -> impl Iterator<Item = (ItemId, &LooseItem)> {
        self.loose_items.iter().map(|(id, loose)| (*id, loose))
    }

    #[must_use]
    pub fn pending_events(&self) -> &[SessionEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain()
    }

    /// Days left for a parcel on the floor, if it has an active delivery.
    #[must_use]
    pub fn remaining_days(&self, id: ContainerId) -> Option<u32> {
        let view = self.containers.get(&id)?.container.parcel_view()?;
        self.deliveries.remaining_days(id, view, self.day())
    }

    fn emit(&mut self, kind: EventKind, severity: EventSeverity, ui_key: &str) {
        let day = self.stock.day();
        self.events.push(day, kind, severity, ui_key);
    }

    fn record_damage(&mut self, target: DamageTarget, report: DamageReport) {
        if report.is_noop() {
            return;
        }
        self.emit(
            EventKind::ItemDamaged {
                target,
                amount: report.applied,
                quality: report.quality,
            },
            EventSeverity::Warning,
            LOG_ITEM_DAMAGED,
        );
        if report.became_broken {
            self.emit(
                EventKind::ItemBroken { target },
                EventSeverity::Critical,
                LOG_ITEM_BROKEN,
            );
        }
    }

    fn allocate(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.saturating_add(1);
        handle
    }

    fn world_mut(&mut self, id: ContainerId) -> Result<&mut WorldContainer, SessionError> {
        self.containers
            .get_mut(&id)
            .ok_or(SessionError::UnknownContainer(id))
    }

    // Customers ----------------------------------------------------------------

    /// A customer hands over an item to ship.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the shop is closed or the item key is unknown.
    pub fn accept_order(
        &mut self,
        customer: CustomerId,
        item_key: &str,
    ) -> Result<ItemId, SessionError> {
        if !self.shop_open {
            return Err(SessionError::ShopClosed);
        }
        let Some(definition) = self.catalog.get(item_key) else {
            warn!("{customer} asked for unknown item '{item_key}'");
            return Err(SessionError::UnknownItem {
                key: item_key.to_string(),
            });
        };
        let id = ItemId(self.allocate());
        self.loose_items.insert(
            id,
            LooseItem {
                item: ItemCondition::new(definition),
                owner: Some(customer),
                submerged: false,
            },
        );
        self.emit(
            EventKind::OrderAccepted { customer, item: id },
            EventSeverity::Info,
            LOG_ORDER_ACCEPTED,
        );
        Ok(id)
    }

    /// The customer walked away. Everything of theirs still in the shop is
    /// discarded and every delivery they had, carried ones included, is
    /// cancelled without pay. Returns how many items and boxes were removed.
    pub fn decline_order(&mut self, customer: CustomerId) -> usize {
        let removed = self.clear_customer_from_shop(customer);
        for record in self.deliveries.cancel_for_customer(customer) {
            debug!("cancelled delivery for {}", record.container);
        }
        self.emit(
            EventKind::OrderCancelled { customer },
            EventSeverity::Info,
            LOG_ORDER_CANCELLED,
        );
        removed
    }

    fn clear_customer_from_shop(&mut self, customer: CustomerId) -> usize {
        let before = self.loose_items.len() + self.containers.len();
        self.loose_items
            .retain(|_, loose| loose.owner != Some(customer));
        let doomed: Vec<ContainerId> = self
            .containers
            .iter()
            .filter(|(_, world)| world.owner == Some(customer))
            .map(|(id, _)| *id)
            .collect();
        for id in doomed {
            self.containers.remove(&id);
            self.tweens.cancel_container(id);
            if self.deliveries.cancel(id).is_ok() {
                debug!("cancelled delivery for {id}");
            }
        }
        before - (self.loose_items.len() + self.containers.len())
    }

    /// Forced closure: every order whose parcel is still in the shop is
    /// cancelled. Carried parcels stay deliverable.
    pub fn close_shop(&mut self) -> usize {
        self.shop_open = false;
        let customers: BTreeSet<CustomerId> = self
            .loose_items
            .values()
            .filter_map(|loose| loose.owner)
            .chain(self.containers.values().filter_map(|world| world.owner))
            .collect();
        for &customer in &customers {
            self.clear_customer_from_shop(customer);
            self.emit(
                EventKind::OrderCancelled { customer },
                EventSeverity::Info,
                LOG_ORDER_CANCELLED,
            );
        }
        info!("shop closed; {} order(s) cancelled", customers.len());
        self.emit(
            EventKind::ShopClosed {
                cancelled_orders: customers.len(),
            },
            EventSeverity::Warning,
            LOG_SHOP_CLOSED,
        );
        customers.len()
    }

    pub fn open_shop(&mut self) {
        self.shop_open = true;
    }

    /// Throw a loose item in the bin.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownLooseItem` for a stale handle.
    pub fn discard_item(&mut self, id: ItemId) -> Result<ItemCondition, SessionError> {
        let loose = self
            .loose_items
            .remove(&id)
            .ok_or(SessionError::UnknownLooseItem(id))?;
        self.emit(
            EventKind::ItemDiscarded { item: id },
            EventSeverity::Info,
            LOG_ITEM_DISCARDED,
        );
        Ok(loose.item)
    }

    // Supplies -----------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `SessionError::Shop` when the cart is invalid or unaffordable.
    pub fn purchase(&mut self, cart: &[CartLine]) -> Result<ShopReceipt, SessionError> {
        let receipt = self.config.prices.purchase(cart, &mut self.stock)?;
        self.emit(
            EventKind::SuppliesPurchased {
                total: receipt.total,
            },
            EventSeverity::Info,
            LOG_SUPPLIES_PURCHASED,
        );
        Ok(receipt)
    }

    /// Take an empty box from stock and put it on the packing table.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Stock` when that kind is out of stock.
    pub fn spawn_container(&mut self, kind: ContainerKind) -> Result<ContainerId, SessionError> {
        self.stock.try_consume_container(kind)?;
        let id = ContainerId(self.allocate());
        self.containers.insert(
            id,
            WorldContainer {
                container: Container::from_table(kind, &self.config.protection),
                owner: None,
                submerged: false,
            },
        );
        self.emit(
            EventKind::ContainerSpawned {
                container: id,
                container_kind: kind,
            },
            EventSeverity::Info,
            LOG_CONTAINER_SPAWNED,
        );
        Ok(id)
    }

    // Packing ------------------------------------------------------------------

    /// A loose item entered the box's detection volume.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` for stale handles or when the box refuses the item;
    /// the item then stays loose.
    pub fn insert_item(&mut self, id: ContainerId, item: ItemId) -> Result<(), SessionError> {
        let loose = self
            .loose_items
            .get(&item)
            .ok_or(SessionError::UnknownLooseItem(item))?;
        let world = self
            .containers
            .get(&id)
            .ok_or(SessionError::UnknownContainer(id))?;
        world.container.check_insert(loose.item.definition())?;

        let Some(loose) = self.loose_items.remove(&item) else {
            return Err(SessionError::UnknownLooseItem(item));
        };
        let key = loose.item.definition().key.clone();
        let world = self
            .containers
            .get_mut(&id)
            .ok_or(SessionError::UnknownContainer(id))?;
        if let Err(rejected) = world.container.insert_item(loose.item) {
            self.loose_items.insert(
                item,
                LooseItem {
                    item: rejected.item,
                    ..loose
                },
            );
            return Err(rejected.reason.into());
        }
        world.owner = loose.owner;
        self.emit(
            EventKind::ItemPacked {
                container: id,
                item_key: key,
            },
            EventSeverity::Info,
            LOG_ITEM_PACKED,
        );
        Ok(())
    }

    /// The item was lifted back out before cushioning.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Packing` once cushioning has started.
    pub fn remove_item(&mut self, id: ContainerId) -> Result<ItemId, SessionError> {
        let world = self.world_mut(id)?;
        let item = world.container.remove_item()?;
        let owner = world.owner.take();
        let submerged = world.submerged;
        let handle = ItemId(self.allocate());
        self.loose_items.insert(
            handle,
            LooseItem {
                item,
                owner,
                submerged,
            },
        );
        self.emit(
            EventKind::ItemUnpacked {
                container: id,
                item: handle,
            },
            EventSeverity::Info,
            LOG_ITEM_UNPACKED,
        );
        Ok(handle)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Packing` when the cushion is refused; stock is
    /// untouched in that case.
    pub fn apply_cushion(
        &mut self,
        id: ContainerId,
        cushion: CushionType,
    ) -> Result<u8, SessionError> {
        let world = self
            .containers
            .get_mut(&id)
            .ok_or(SessionError::UnknownContainer(id))?;
        let count = world.container.apply_cushion(cushion, &mut self.stock)?;
        let required = u32_to_f32(u32::from(CUSHION_APPLICATIONS_REQUIRED));
        let from = u32_to_f32(u32::from(count.saturating_sub(1))) / required;
        let to = u32_to_f32(u32::from(count)) / required;
        self.tweens.start(
            id,
            TweenChannel::CushionFill,
            Tween::new(from, to, self.config.cushion_tween_secs),
        );
        self.emit(
            EventKind::CushionApplied {
                container: id,
                cushion,
                count,
            },
            EventSeverity::Info,
            LOG_CUSHION_APPLIED,
        );
        Ok(count)
    }

    /// Move a lid. Sealing is picked up by the next tick.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Packing` when the lid may not move.
    pub fn set_lid(
        &mut self,
        id: ContainerId,
        side: LidSide,
        closed: bool,
    ) -> Result<(), SessionError> {
        self.world_mut(id)?.container.set_lid(side, closed)?;
        Ok(())
    }

    /// Close both lids and seal immediately.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Packing` when cushioning is unfinished.
    pub fn close_lids(&mut self, id: ContainerId) -> Result<(), SessionError> {
        let world = self.world_mut(id)?;
        world.container.set_lid(LidSide::Left, true)?;
        world.container.set_lid(LidSide::Right, true)?;
        if world.container.sync_lids() {
            self.emit(
                EventKind::ContainerClosed { container: id },
                EventSeverity::Info,
                LOG_CONTAINER_CLOSED,
            );
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::Packing` when out of sequence or out of tape.
    pub fn apply_tape(&mut self, id: ContainerId, color: TapeColor) -> Result<(), SessionError> {
        let world = self
            .containers
            .get_mut(&id)
            .ok_or(SessionError::UnknownContainer(id))?;
        world.container.apply_tape(color, &mut self.stock)?;
        self.tweens.start(
            id,
            TweenChannel::TapeStretch,
            Tween::new(0.0, 1.0, self.config.tape_tween_secs),
        );
        self.emit(
            EventKind::ContainerTaped {
                container: id,
                color,
            },
            EventSeverity::Info,
            LOG_CONTAINER_TAPED,
        );
        Ok(())
    }

    /// Label the box: packing ends, the delivery is registered and the
    /// customer is told the parcel is ready.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the box is not taped or the delivery cannot
    /// be registered; the box then stays taped.
    pub fn attach_label(&mut self, id: ContainerId) -> Result<(), SessionError> {
        let day = self.stock.day();
        let world = self
            .containers
            .get_mut(&id)
            .ok_or(SessionError::UnknownContainer(id))?;
        world.container.check_label()?;
        let item = world.container.item().ok_or(PackingError::NoItem)?;
        self.deliveries.check_register(id, item)?;
        self.deliveries.register(id, world.owner, item, day)?;
        world.container.attach_label()?;
        let owner = world.owner;

        self.emit(
            EventKind::ContainerLabeled { container: id },
            EventSeverity::Info,
            LOG_CONTAINER_LABELED,
        );
        if let Some(customer) = owner {
            self.emit(
                EventKind::CustomerNotified {
                    customer,
                    container: id,
                },
                EventSeverity::Info,
                LOG_CUSTOMER_NOTIFIED,
            );
        }
        Ok(())
    }

    // Delivery -----------------------------------------------------------------

    /// Hand a parcel on the floor to its recipient.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when the box is unknown, empty or unregistered.
    pub fn complete_delivery(&mut self, id: ContainerId) -> Result<DeliveryReceipt, SessionError> {
        let day = self.stock.day();
        let world = self
            .containers
            .get(&id)
            .ok_or(SessionError::UnknownContainer(id))?;
        let view = world.container.parcel_view().ok_or(PackingError::NoItem)?;
        let receipt = self.deliveries.complete(id, view, day, &mut self.stock)?;
        self.containers.remove(&id);
        self.tweens.cancel_container(id);
        self.emit(
            EventKind::DeliveryCompleted {
                receipt: receipt.clone(),
            },
            EventSeverity::Info,
            LOG_DELIVERY_COMPLETED,
        );
        Ok(receipt)
    }

    /// The player reached a drop-off point; the first carried parcel for it is
    /// handed over.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when nothing carried is addressed there or the
    /// parcel has no active delivery.
    pub fn deliver_at(&mut self, destination: &str) -> Result<DeliveryReceipt, SessionError> {
        if destination.trim().is_empty() {
            warn!("delivery point without destination id ignored");
            return Err(SessionError::NothingForDestination {
                destination: destination.to_string(),
            });
        }
        let day = self.stock.day();
        let deliveries = &self.deliveries;
        let slot = self
            .carry
            .find_by_destination(destination, |snapshot| {
                deliveries.record(snapshot.origin).is_some()
            })
            .ok_or_else(|| SessionError::NothingForDestination {
                destination: destination.to_string(),
            })?;
        let snapshot = self
            .carry
            .slot(slot)
            .ok_or(CarryError::EmptySlot { index: slot })?;
        let receipt =
            self.deliveries
                .complete(snapshot.origin, snapshot.parcel_view(), day, &mut self.stock)?;
        self.carry.take(slot)?;
        self.emit(
            EventKind::DeliveryCompleted {
                receipt: receipt.clone(),
            },
            EventSeverity::Info,
            LOG_DELIVERY_COMPLETED,
        );
        Ok(receipt)
    }

    // Carrying -----------------------------------------------------------------

    /// Pick a box up into the first free carry slot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Carry` when every slot is taken or the box is
    /// empty; the box stays on the floor.
    pub fn store_container(&mut self, id: ContainerId) -> Result<usize, SessionError> {
        let today = self.stock.day();
        let world = self
            .containers
            .get(&id)
            .ok_or(SessionError::UnknownContainer(id))?;
        let view = world.container.parcel_view().ok_or(CarryError::NoItem)?;
        let remaining = self
            .deliveries
            .remaining_days(id, view, today)
            .unwrap_or_else(|| view.effective_deadline_days());

        let Some(mut world) = self.containers.remove(&id) else {
            return Err(SessionError::UnknownContainer(id));
        };
        world.container.leave_water();
        match self.carry.store(id, world.container, remaining) {
            Ok(slot) => {
                self.tweens.cancel_container(id);
                self.emit(
                    EventKind::ParcelStored {
                        container: id,
                        slot,
                    },
                    EventSeverity::Info,
                    LOG_PARCEL_STORED,
                );
                Ok(slot)
            }
            Err(rejected) => {
                self.containers.insert(
                    id,
                    WorldContainer {
                        container: *rejected.container,
                        owner: world.owner,
                        submerged: world.submerged,
                    },
                );
                Err(rejected.reason.into())
            }
        }
    }

    /// Put a carried parcel back down.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Carry` for an empty or invalid slot.
    pub fn retrieve_container(&mut self, slot: usize) -> Result<ContainerId, SessionError> {
        let (id, container) = self.carry.retrieve(slot)?;
        let owner = self.deliveries.record(id).and_then(|record| record.customer);
        self.containers.insert(
            id,
            WorldContainer {
                container,
                owner,
                submerged: false,
            },
        );
        self.emit(
            EventKind::ParcelRetrieved {
                container: id,
                slot,
            },
            EventSeverity::Info,
            LOG_PARCEL_RETRIEVED,
        );
        Ok(id)
    }

    // Physical events ------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `SessionError::UnknownContainer` for a stale handle.
    pub fn container_collision(
        &mut self,
        id: ContainerId,
        relative_velocity: f32,
    ) -> Result<Option<DamageReport>, SessionError> {
        let report = self.world_mut(id)?.container.on_collision(relative_velocity);
        if let Some(report) = report {
            self.record_damage(DamageTarget::Container(id), report);
        }
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownContainer` for a stale handle.
    pub fn container_entered_water(
        &mut self,
        id: ContainerId,
    ) -> Result<Option<DamageReport>, SessionError> {
        let world = self.world_mut(id)?;
        world.submerged = true;
        let report = world.container.on_water_contact();
        if let Some(report) = report {
            self.record_damage(DamageTarget::Container(id), report);
        }
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownContainer` for a stale handle.
    pub fn container_left_water(&mut self, id: ContainerId) -> Result<(), SessionError> {
        let world = self.world_mut(id)?;
        world.submerged = false;
        world.container.leave_water();
        Ok(())
    }

    /// A loose item hit something while held or thrown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownLooseItem` for a stale handle.
    pub fn item_collision(
        &mut self,
        id: ItemId,
        relative_velocity: f32,
    ) -> Result<DamageReport, SessionError> {
        let loose = self
            .loose_items
            .get_mut(&id)
            .ok_or(SessionError::UnknownLooseItem(id))?;
        let report = loose
            .item
            .apply_impact_velocity(relative_velocity, Protection::UNPROTECTED.divisor);
        self.record_damage(DamageTarget::Loose(id), report);
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownLooseItem` for a stale handle.
    pub fn item_entered_water(&mut self, id: ItemId) -> Result<DamageReport, SessionError> {
        let loose = self
            .loose_items
            .get_mut(&id)
            .ok_or(SessionError::UnknownLooseItem(id))?;
        loose.submerged = true;
        let report = loose.item.apply_water_contact(Protection::UNPROTECTED);
        self.record_damage(DamageTarget::Loose(id), report);
        Ok(report)
    }

    /// # Errors
    ///
    /// Returns `SessionError::UnknownLooseItem` for a stale handle.
    pub fn item_left_water(&mut self, id: ItemId) -> Result<(), SessionError> {
        let loose = self
            .loose_items
            .get_mut(&id)
            .ok_or(SessionError::UnknownLooseItem(id))?;
        loose.submerged = false;
        loose.item.leave_water();
        Ok(())
    }

    /// The player landed after a fall while carrying parcels.
    pub fn player_fell(&mut self, height_m: f32) -> Vec<(usize, DamageReport)> {
        if height_m.is_nan() || height_m <= self.config.player_fall_min_height {
            return Vec::new();
        }
        let hits = self.carry.apply_fall_damage_to_all(height_m);
        for &(slot, report) in &hits {
            self.record_damage(DamageTarget::CarrySlot(slot), report);
        }
        hits
    }

    pub fn player_entered_water(&mut self) -> Vec<(usize, DamageReport)> {
        self.player_in_water = true;
        let hits = self.carry.apply_water_contact_to_all();
        for &(slot, report) in &hits {
            self.record_damage(DamageTarget::CarrySlot(slot), report);
        }
        hits
    }

    pub fn player_left_water(&mut self) {
        self.player_in_water = false;
        self.carry.leave_water_all();
    }

    // Time -----------------------------------------------------------------------

    /// One simulation update. Returns the number of days that ended.
    pub fn tick(&mut self, dt_secs: f32) -> u32 {
        let mut sealed = Vec::new();
        let mut soaked = Vec::new();
        for (&id, world) in &mut self.containers {
            if world.container.sync_lids() {
                sealed.push(id);
            }
            if world.submerged {
                if let Some(report) = world.container.on_water_exposure(dt_secs) {
                    soaked.push((DamageTarget::Container(id), report));
                }
            }
        }
        for (&id, loose) in &mut self.loose_items {
            if loose.submerged {
                let report = loose
                    .item
                    .apply_water_exposure(dt_secs, Protection::UNPROTECTED);
                soaked.push((DamageTarget::Loose(id), report));
            }
        }
        if self.player_in_water {
            for (slot, report) in self.carry.apply_water_damage_to_all(dt_secs) {
                soaked.push((DamageTarget::CarrySlot(slot), report));
            }
        }
        for id in sealed {
            self.emit(
                EventKind::ContainerClosed { container: id },
                EventSeverity::Info,
                LOG_CONTAINER_CLOSED,
            );
        }
        for (target, report) in soaked {
            self.record_damage(target, report);
        }

        self.tweens.advance(dt_secs);

        let midnights = self.clock.advance(dt_secs);
        if midnights > 0 {
            self.roll_over_day();
        }
        if midnights > 1 {
            self.skip_idle_days(midnights - 1);
        }
        midnights
    }

    /// Close the day early and open the next morning. Returns the deposit.
    pub fn end_day(&mut self) -> i64 {
        self.clock.start_next_morning();
        self.roll_over_day()
    }

    fn roll_over_day(&mut self) -> i64 {
        let ending = self.stock.day();
        self.carry.advance_one_day();
        let deposited = self.stock.end_day_and_deposit();
        info!("day {ending} closed; deposited {deposited}");
        self.events.push(
            ending,
            EventKind::DayEnded {
                day: ending,
                deposited,
            },
            EventSeverity::Info,
            LOG_DAY_ENDED,
        );
        deposited
    }

    /// Days after the first midnight of one tick have no takings; they close
    /// together and report a single `DayEnded` for the last of them.
    fn skip_idle_days(&mut self, days: u32) {
        self.carry.advance_days(days);
        let deposited = self.stock.skip_idle_days(days);
        let last = self.stock.day().saturating_sub(1);
        info!("days up to {last} closed without takings");
        self.events.push(
            last,
            EventKind::DayEnded {
                day: last,
                deposited,
            },
            EventSeverity::Info,
            LOG_DAY_ENDED,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StartingStock;
    use crate::container::PackingStep;

    fn session() -> ParcelSession {
        let config = SessionConfig {
            starting_stock: StartingStock {
                bank: 100,
                cash: 0,
                containers: BTreeMap::from([(ContainerKind::Small, 2), (ContainerKind::Cold, 1)]),
                cushion_packs: BTreeMap::from([(CushionType::Basic, 2), (CushionType::Ice, 1)]),
                tape_rolls: BTreeMap::from([(TapeColor::Red, 1)]),
            },
            ..SessionConfig::default()
        };
        ParcelSession::new(config, ItemCatalog::builtin().expect("catalog")).expect("session")
    }

    fn packed(session: &mut ParcelSession, customer: u32, key: &str) -> ContainerId {
        let item = session.accept_order(CustomerId(customer), key).expect("order");
        let id = session.spawn_container(ContainerKind::Small).expect("box");
        session.insert_item(id, item).expect("insert");
        for _ in 0..3 {
            session.apply_cushion(id, CushionType::Basic).expect("cushion");
        }
        session.close_lids(id).expect("lids");
        session.apply_tape(id, TapeColor::Red).expect("tape");
        id
    }

    #[test]
    fn unknown_items_are_refused_without_side_effects() {
        let mut session = session();
        assert!(matches!(
            session.accept_order(CustomerId(1), "unicorn"),
            Err(SessionError::UnknownItem { .. })
        ));
        assert_eq!(session.loose_items().count(), 0);
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn labeling_registers_and_notifies() {
        let mut session = session();
        let id = packed(&mut session, 4, "paperback");
        session.drain_events();
        session.attach_label(id).expect("label");
        assert_eq!(session.deliveries().len(), 1);
        let events = session.drain_events();
        assert!(events.iter().any(|event| matches!(
            event.kind,
            EventKind::CustomerNotified {
                customer: CustomerId(4),
                ..
            }
        )));
    }

    #[test]
    fn lids_seal_on_tick() {
        let mut session = session();
        let item = session.accept_order(CustomerId(1), "paperback").expect("order");
        let id = session.spawn_container(ContainerKind::Small).expect("box");
        session.insert_item(id, item).expect("insert");
        for _ in 0..3 {
            session.apply_cushion(id, CushionType::Basic).expect("cushion");
        }
        session.set_lid(id, LidSide::Left, true).expect("left");
        session.set_lid(id, LidSide::Right, true).expect("right");
        assert_eq!(
            session.container(id).map(Container::step),
            Some(PackingStep::CushionDone)
        );
        session.tick(0.016);
        assert_eq!(
            session.container(id).map(Container::step),
            Some(PackingStep::Closed)
        );
    }

    #[test]
    fn refused_insert_keeps_item_loose() {
        let mut session = session();
        let item = session.accept_order(CustomerId(1), "ceramic_vase").expect("order");
        let id = session.spawn_container(ContainerKind::Small).expect("box");
        assert!(matches!(
            session.insert_item(id, item),
            Err(SessionError::Packing(PackingError::KindNotAccepted { .. }))
        ));
        assert!(session.loose_item(item).is_some());
        assert_eq!(
            session.container(id).map(Container::step),
            Some(PackingStep::Empty)
        );
    }

    #[test]
    fn decline_clears_shop_and_cancels_delivery() {
        let mut session = session();
        let id = packed(&mut session, 2, "paperback");
        session.attach_label(id).expect("label");
        session.accept_order(CustomerId(2), "wool_scarf").expect("order");
        assert_eq!(session.decline_order(CustomerId(2)), 2);
        assert!(session.deliveries().is_empty());
        assert!(session.container(id).is_none());
        assert_eq!(session.stock().total_funds(), 100);
    }

    #[test]
    fn midnight_rolls_the_day() {
        let mut session = session();
        session.stock_mut().add_cash(15);
        let rolled = session.tick(30.0 * 16.0);
        assert_eq!(rolled, 1);
        assert_eq!(session.day(), 2);
        assert_eq!(session.stock().bank_balance(), 115);
        assert_eq!(session.end_day(), 0);
        assert_eq!(session.day(), 3);
        assert_eq!(session.clock().hour(), 8);
    }

    #[test]
    fn huge_tick_closes_every_day_at_once() {
        let mut session = session();
        let id = packed(&mut session, 1, "paperback");
        session.attach_label(id).expect("label");
        let slot = session.store_container(id).expect("store");
        session.stock_mut().add_cash(15);
        session.drain_events();

        assert_eq!(session.tick(1.0e9), 1_388_889);
        assert_eq!(session.day(), 1_388_890);
        assert_eq!(session.stock().bank_balance(), 115);
        assert_eq!(session.stock().cash_today(), 0);
        assert_eq!(session.carry().slot(slot).expect("slot").remaining_days, 0);

        let closed: Vec<(u32, i64)> = session
            .drain_events()
            .into_iter()
            .filter_map(|event| match event.kind {
                EventKind::DayEnded { day, deposited } => Some((day, deposited)),
                _ => None,
            })
            .collect();
        assert_eq!(closed, vec![(1, 15), (1_388_889, 0)]);
    }
}
