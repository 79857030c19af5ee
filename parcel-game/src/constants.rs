//! Centralized balance and tuning constants for the parcel simulation.
//!
//! These values define the deterministic math for the packing, damage and
//! economy rules. Keeping them together means balance changes go through code
//! review rather than through external JSON assets.

// Event keys ---------------------------------------------------------------
pub(crate) const LOG_ORDER_ACCEPTED: &str = "log.order.accepted";
pub(crate) const LOG_ORDER_CANCELLED: &str = "log.order.cancelled";
pub(crate) const LOG_CONTAINER_SPAWNED: &str = "log.container.spawned";
pub(crate) const LOG_ITEM_PACKED: &str = "log.packing.item-inside";
pub(crate) const LOG_ITEM_UNPACKED: &str = "log.packing.item-removed";
pub(crate) const LOG_CUSHION_APPLIED: &str = "log.packing.cushion";
pub(crate) const LOG_CONTAINER_CLOSED: &str = "log.packing.closed";
pub(crate) const LOG_CONTAINER_TAPED: &str = "log.packing.taped";
pub(crate) const LOG_CONTAINER_LABELED: &str = "log.packing.labeled";
pub(crate) const LOG_CUSTOMER_NOTIFIED: &str = "log.customer.notified";
pub(crate) const LOG_DELIVERY_COMPLETED: &str = "log.delivery.completed";
pub(crate) const LOG_PARCEL_STORED: &str = "log.carry.stored";
pub(crate) const LOG_PARCEL_RETRIEVED: &str = "log.carry.retrieved";
pub(crate) const LOG_ITEM_DAMAGED: &str = "log.item.damaged";
pub(crate) const LOG_ITEM_BROKEN: &str = "log.item.broken";
pub(crate) const LOG_ITEM_DISCARDED: &str = "log.item.discarded";
pub(crate) const LOG_SUPPLIES_PURCHASED: &str = "log.shop.purchase";
pub(crate) const LOG_DAY_ENDED: &str = "log.day.ended";
pub(crate) const LOG_SHOP_CLOSED: &str = "log.shop.closed";

// Quality model ------------------------------------------------------------
pub(crate) const QUALITY_MAX: f32 = 100.0;
pub(crate) const QUALITY_MIN: f32 = 0.0;
pub(crate) const GRAVITY: f32 = 9.81;
pub(crate) const WATER_TICK_SECS: f32 = 1.0;
pub(crate) const DEFAULT_WATER_DAMAGE_PER_SECOND: f32 = 1.0;
pub(crate) const MIN_APPLIED_FALL_DAMAGE: i32 = 1;

// Rewards and deadlines ----------------------------------------------------
pub(crate) const LATE_REWARD_FACTOR: f64 = 0.5;
pub(crate) const COLD_MISMATCH_DEADLINE_DIVISOR: u32 = 3;
pub(crate) const ICE_CUSHION_BONUS_DAYS: u32 = 1;

// Packing ------------------------------------------------------------------
pub(crate) const CUSHION_APPLICATIONS_REQUIRED: u8 = 3;
pub(crate) const CUSHION_USES_PER_PACK: u32 = 3;
pub(crate) const TAPE_USES_PER_ROLL: u32 = 10;
pub(crate) const DEFAULT_BASE_DIVISOR: u32 = 2;

// Session defaults ---------------------------------------------------------
pub(crate) const DEFAULT_CARRY_SLOTS: usize = 3;
pub(crate) const DEFAULT_MAX_ACTIVE_DELIVERIES: usize = 3;
pub(crate) const DEFAULT_SECONDS_PER_GAME_HOUR: f32 = 30.0;
pub(crate) const DEFAULT_DAY_START_HOUR: u32 = 8;
pub(crate) const DEFAULT_PLAYER_FALL_MIN_HEIGHT: f32 = 1.0;
pub(crate) const DEFAULT_CUSHION_TWEEN_SECS: f32 = 0.25;
pub(crate) const DEFAULT_TAPE_TWEEN_SECS: f32 = 0.4;
pub(crate) const DEFAULT_ITEM_WEIGHT: u32 = 5;
pub(crate) const HOURS_PER_DAY: u32 = 24;
pub(crate) const MINUTES_PER_HOUR: f32 = 60.0;

// Shop prices --------------------------------------------------------------
pub(crate) const PRICE_BOX_SMALL: i64 = 10;
pub(crate) const PRICE_BOX_MEDIUM: i64 = 15;
pub(crate) const PRICE_BOX_LARGE: i64 = 20;
pub(crate) const PRICE_BOX_COLD: i64 = 25;
pub(crate) const PRICE_BOX_WATERPROOF_MEDIUM: i64 = 25;
pub(crate) const PRICE_BOX_WATERPROOF_LARGE: i64 = 30;
pub(crate) const PRICE_CUSHION_BASIC: i64 = 5;
pub(crate) const PRICE_CUSHION_STRONG: i64 = 10;
pub(crate) const PRICE_CUSHION_ICE: i64 = 15;
pub(crate) const PRICE_TAPE_ROLL: i64 = 5;

// Persistence keys ---------------------------------------------------------
pub(crate) const KEY_DAY: &str = "eco.day";
pub(crate) const KEY_CASH_TODAY: &str = "eco.cash_today";
pub(crate) const KEY_BANK: &str = "eco.bank";
pub(crate) const KEY_BOX_PREFIX: &str = "eco.box.";
pub(crate) const KEY_CUSHION_PREFIX: &str = "eco.cushion.";
pub(crate) const KEY_TAPE_PREFIX: &str = "eco.tape.";
