//! Stock ledger: money pools and consumable counts.
//!
//! Every purchase and every consumption goes through this type. Checks run
//! before mutation so a refused operation leaves the ledger untouched.
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{
    CUSHION_USES_PER_PACK, KEY_BANK, KEY_BOX_PREFIX, KEY_CASH_TODAY, KEY_CUSHION_PREFIX, KEY_DAY,
    KEY_TAPE_PREFIX, TAPE_USES_PER_ROLL,
};
use crate::numbers::clamp_i64_to_u32;
use crate::protection::{ContainerKind, CushionType, TapeColor};

/// Flat persistence form of the ledger.
pub type LedgerKeyMap = BTreeMap<String, i64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StockError {
    #[error("amount {amount} must not be negative")]
    NegativeAmount { amount: i64 },
    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: i64, available: i64 },
    #[error("no {kind:?} containers in stock")]
    OutOfContainers { kind: ContainerKind },
    #[error("no {cushion:?} cushioning uses left")]
    OutOfCushion { cushion: CushionType },
    #[error("no {color:?} tape uses left")]
    OutOfTape { color: TapeColor },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLedger {
    day: u32,
    cash_today: i64,
    bank_balance: i64,
    #[serde(default)]
    containers: BTreeMap<ContainerKind, u32>,
    #[serde(default)]
    cushion_uses: BTreeMap<CushionType, u32>,
    #[serde(default)]
    tape_uses: BTreeMap<TapeColor, u32>,
}

impl Default for StockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StockLedger {
    /// Fresh ledger on day 1 with no money and no stock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            day: 1,
            cash_today: 0,
            bank_balance: 0,
            containers: BTreeMap::new(),
            cushion_uses: BTreeMap::new(),
            tape_uses: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_funds(bank_balance: i64, cash_today: i64) -> Self {
        Self {
            bank_balance: bank_balance.max(0),
            cash_today: cash_today.max(0),
            ..Self::new()
        }
    }

    #[must_use]
    pub const fn day(&self) -> u32 {
        self.day
    }

    #[must_use]
    pub const fn cash_today(&self) -> i64 {
        self.cash_today
    }

    #[must_use]
    pub const fn bank_balance(&self) -> i64 {
        self.bank_balance
    }

    #[must_use]
    pub const fn total_funds(&self) -> i64 {
        self.cash_today.saturating_add(self.bank_balance)
    }

    #[must_use]
    pub const fn can_afford(&self, price: i64) -> bool {
        price >= 0 && self.total_funds() >= price
    }

    /// Spend from the bank first, then from today's cash.
    ///
    /// # Errors
    ///
    /// Returns `StockError` for a negative price or when total funds fall short;
    /// nothing is deducted in either case.
    pub fn try_spend(&mut self, price: i64) -> Result<(), StockError> {
        if price < 0 {
            return Err(StockError::NegativeAmount { amount: price });
        }
        if !self.can_afford(price) {
            return Err(StockError::InsufficientFunds {
                required: price,
                available: self.total_funds(),
            });
        }
        let from_bank = price.min(self.bank_balance);
        self.bank_balance -= from_bank;
        self.cash_today -= price - from_bank;
        debug!(
            "spent {price}: bank {} cash {}",
            self.bank_balance, self.cash_today
        );
        Ok(())
    }

    /// Credit today's cash. Negative amounts deduct but never below zero.
    pub fn add_cash(&mut self, amount: i64) {
        self.cash_today = self.cash_today.saturating_add(amount).max(0);
    }

    /// Return money for a reversed purchase straight to the bank.
    ///
    /// # Errors
    ///
    /// Returns `StockError::NegativeAmount` for negative refunds.
    pub fn refund(&mut self, amount: i64) -> Result<(), StockError> {
        if amount < 0 {
            return Err(StockError::NegativeAmount { amount });
        }
        self.bank_balance = self.bank_balance.saturating_add(amount);
        Ok(())
    }

    /// Close the books for today. Returns the amount deposited.
    pub fn end_day_and_deposit(&mut self) -> i64 {
        let deposited = self.cash_today;
        self.bank_balance = self.bank_balance.saturating_add(deposited);
        self.cash_today = 0;
        self.day = self.day.saturating_add(1);
        deposited
    }

    /// Close `days` further days that had no takings.
    pub fn skip_idle_days(&mut self, days: u32) -> i64 {
        let deposited = self.end_day_and_deposit();
        self.day = self.day.saturating_add(days.saturating_sub(1));
        deposited
    }

    // Containers --------------------------------------------------------------

    #[must_use]
    pub fn container_stock(&self, kind: ContainerKind) -> u32 {
        self.containers.get(&kind).copied().unwrap_or(0)
    }

    pub fn add_container_stock(&mut self, kind: ContainerKind, count: u32) {
        add_count(&mut self.containers, kind, count);
    }

    /// # Errors
    ///
    /// Returns `StockError::OutOfContainers` when none are left.
    pub fn try_consume_container(&mut self, kind: ContainerKind) -> Result<(), StockError> {
        if take_one(&mut self.containers, kind) {
            Ok(())
        } else {
            Err(StockError::OutOfContainers { kind })
        }
    }

    // Cushioning --------------------------------------------------------------

    #[must_use]
    pub fn cushion_uses(&self, cushion: CushionType) -> u32 {
        self.cushion_uses.get(&cushion).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_cushion_use(&self, cushion: CushionType) -> bool {
        self.cushion_uses(cushion) > 0
    }

    pub fn add_cushion_uses(&mut self, cushion: CushionType, uses: u32) {
        if cushion == CushionType::None {
            return;
        }
        add_count(&mut self.cushion_uses, cushion, uses);
    }

    /// One purchased pack expands into several applications.
    pub fn add_cushion_packs(&mut self, cushion: CushionType, packs: u32) {
        self.add_cushion_uses(cushion, packs.saturating_mul(CUSHION_USES_PER_PACK));
    }

    /// # Errors
    ///
    /// Returns `StockError::OutOfCushion` when no use is available.
    pub fn try_consume_cushion(&mut self, cushion: CushionType) -> Result<(), StockError> {
        if take_one(&mut self.cushion_uses, cushion) {
            Ok(())
        } else {
            Err(StockError::OutOfCushion { cushion })
        }
    }

    // Tape --------------------------------------------------------------------

    #[must_use]
    pub fn tape_uses(&self, color: TapeColor) -> u32 {
        self.tape_uses.get(&color).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn has_tape_use(&self, color: TapeColor) -> bool {
        self.tape_uses(color) > 0
    }

    /// Whole rolls left, rounding partial rolls down.
    #[must_use]
    pub fn tape_rolls(&self, color: TapeColor) -> u32 {
        self.tape_uses(color) / TAPE_USES_PER_ROLL
    }

    pub fn add_tape_uses(&mut self, color: TapeColor, uses: u32) {
        add_count(&mut self.tape_uses, color, uses);
    }

    pub fn add_tape_rolls(&mut self, color: TapeColor, rolls: u32) {
        self.add_tape_uses(color, rolls.saturating_mul(TAPE_USES_PER_ROLL));
    }

    /// # Errors
    ///
    /// Returns `StockError::OutOfTape` when no use is available.
    pub fn try_consume_tape(&mut self, color: TapeColor) -> Result<(), StockError> {
        if take_one(&mut self.tape_uses, color) {
            Ok(())
        } else {
            Err(StockError::OutOfTape { color })
        }
    }

    // Persistence -------------------------------------------------------------

    /// Flatten into string keys for the save layer.
    #[must_use]
    pub fn to_key_map(&self) -> LedgerKeyMap {
        let mut map = LedgerKeyMap::new();
        map.insert(KEY_DAY.to_string(), i64::from(self.day));
        map.insert(KEY_CASH_TODAY.to_string(), self.cash_today);
        map.insert(KEY_BANK.to_string(), self.bank_balance);
        for kind in ContainerKind::ALL {
            map.insert(
                format!("{KEY_BOX_PREFIX}{}", kind.key()),
                i64::from(self.container_stock(kind)),
            );
        }
        for cushion in CushionType::PURCHASABLE {
            map.insert(
                format!("{KEY_CUSHION_PREFIX}{}", cushion.key()),
                i64::from(self.cushion_uses(cushion)),
            );
        }
        for color in TapeColor::ALL {
            map.insert(
                format!("{KEY_TAPE_PREFIX}{}", color.key()),
                i64::from(self.tape_uses(color)),
            );
        }
        map
    }

    /// Rebuild from saved keys. Missing keys take defaults, out-of-range values
    /// clamp to the nearest valid bound and unknown keys are skipped.
    #[must_use]
    pub fn from_key_map(map: &LedgerKeyMap) -> Self {
        let mut ledger = Self::new();
        for (key, &value) in map {
            if value < 0 {
                warn!("ledger key {key} held {value}; clamping to 0");
            }
            if key == KEY_DAY {
                ledger.day = clamp_i64_to_u32(value).max(1);
            } else if key == KEY_CASH_TODAY {
                ledger.cash_today = value.max(0);
            } else if key == KEY_BANK {
                ledger.bank_balance = value.max(0);
            } else if let Some(kind) = key
                .strip_prefix(KEY_BOX_PREFIX)
                .and_then(ContainerKind::from_key)
            {
                add_count(&mut ledger.containers, kind, clamp_i64_to_u32(value));
            } else if let Some(cushion) = key
                .strip_prefix(KEY_CUSHION_PREFIX)
                .and_then(CushionType::from_key)
            {
                add_count(&mut ledger.cushion_uses, cushion, clamp_i64_to_u32(value));
            } else if let Some(color) = key.strip_prefix(KEY_TAPE_PREFIX).and_then(TapeColor::from_key)
            {
                add_count(&mut ledger.tape_uses, color, clamp_i64_to_u32(value));
            } else {
                warn!("ignoring unknown ledger key {key}");
            }
        }
        ledger
    }
}

// Count maps only hold non-zero entries so equal ledgers compare equal.
fn add_count<K: Ord>(map: &mut BTreeMap<K, u32>, key: K, count: u32) {
    if count == 0 {
        return;
    }
    let entry = map.entry(key).or_insert(0);
    *entry = entry.saturating_add(count);
}

fn take_one<K: Ord>(map: &mut BTreeMap<K, u32>, key: K) -> bool {
    let Some(count) = map.get_mut(&key) else {
        return false;
    };
    let available = *count > 0;
    *count = count.saturating_sub(1);
    if *count == 0 {
        map.remove(&key);
    }
    available
}
