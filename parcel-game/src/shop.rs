//! Supply shop: price list, quotes and atomic purchases.
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::constants::{
    PRICE_BOX_COLD, PRICE_BOX_LARGE, PRICE_BOX_MEDIUM, PRICE_BOX_SMALL,
    PRICE_BOX_WATERPROOF_LARGE, PRICE_BOX_WATERPROOF_MEDIUM, PRICE_CUSHION_BASIC,
    PRICE_CUSHION_ICE, PRICE_CUSHION_STRONG, PRICE_TAPE_ROLL,
};
use crate::ledger::{StockError, StockLedger};
use crate::protection::{ContainerKind, CushionType, TapeColor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "variant")]
pub enum ShopItem {
    Container(ContainerKind),
    /// One pack expands into several cushioning uses.
    CushionPack(CushionType),
    /// One roll expands into several tape uses.
    TapeRoll(TapeColor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub item: ShopItem,
    pub quantity: u32,
}

impl CartLine {
    #[must_use]
    pub const fn new(item: ShopItem, quantity: u32) -> Self {
        Self { item, quantity }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopReceipt {
    pub lines: Vec<CartLine>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShopError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("{item:?} is not sold here")]
    NotForSale { item: ShopItem },
    #[error("cannot afford {required} (funds {available})")]
    InsufficientFunds { required: i64, available: i64 },
    #[error(transparent)]
    Stock(#[from] StockError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    #[serde(default = "PriceList::default_containers")]
    pub containers: BTreeMap<ContainerKind, i64>,
    #[serde(default = "PriceList::default_cushion_packs")]
    pub cushion_packs: BTreeMap<CushionType, i64>,
    #[serde(default = "PriceList::default_tape_roll")]
    pub tape_roll: i64,
}

impl Default for PriceList {
    fn default() -> Self {
        Self {
            containers: Self::default_containers(),
            cushion_packs: Self::default_cushion_packs(),
            tape_roll: Self::default_tape_roll(),
        }
    }
}

impl PriceList {
    fn default_containers() -> BTreeMap<ContainerKind, i64> {
        BTreeMap::from([
            (ContainerKind::Small, PRICE_BOX_SMALL),
            (ContainerKind::Medium, PRICE_BOX_MEDIUM),
            (ContainerKind::Large, PRICE_BOX_LARGE),
            (ContainerKind::Cold, PRICE_BOX_COLD),
            (ContainerKind::WaterproofMedium, PRICE_BOX_WATERPROOF_MEDIUM),
            (ContainerKind::WaterproofLarge, PRICE_BOX_WATERPROOF_LARGE),
        ])
    }

    fn default_cushion_packs() -> BTreeMap<CushionType, i64> {
        BTreeMap::from([
            (CushionType::Basic, PRICE_CUSHION_BASIC),
            (CushionType::Strong, PRICE_CUSHION_STRONG),
            (CushionType::Ice, PRICE_CUSHION_ICE),
        ])
    }

    const fn default_tape_roll() -> i64 {
        PRICE_TAPE_ROLL
    }

    #[must_use]
    pub fn price(&self, item: ShopItem) -> Option<i64> {
        match item {
            ShopItem::Container(kind) => self.containers.get(&kind).copied(),
            ShopItem::CushionPack(CushionType::None) => None,
            ShopItem::CushionPack(cushion) => self.cushion_packs.get(&cushion).copied(),
            ShopItem::TapeRoll(_) => Some(self.tape_roll),
        }
    }

    /// Total a cart without touching any ledger.
    ///
    /// # Errors
    ///
    /// Returns `ShopError` for an empty or zero-value cart, or an unlisted item.
    pub fn quote(&self, lines: &[CartLine]) -> Result<ShopReceipt, ShopError> {
        let mut merged: BTreeMap<ShopItem, u32> = BTreeMap::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            let entry = merged.entry(line.item).or_insert(0);
            *entry = entry.saturating_add(line.quantity);
        }

        let mut total: i64 = 0;
        let mut receipt_lines = Vec::with_capacity(merged.len());
        for (item, quantity) in merged {
            let price = self.price(item).ok_or(ShopError::NotForSale { item })?;
            total = total.saturating_add(price.max(0).saturating_mul(i64::from(quantity)));
            receipt_lines.push(CartLine { item, quantity });
        }
        if total <= 0 {
            return Err(ShopError::EmptyCart);
        }
        Ok(ShopReceipt {
            lines: receipt_lines,
            total,
        })
    }

    /// Spend once for the whole cart, then stock every line.
    ///
    /// # Errors
    ///
    /// Returns `ShopError` when the cart is invalid or unaffordable; the ledger
    /// is untouched in that case.
    pub fn purchase(
        &self,
        lines: &[CartLine],
        stock: &mut StockLedger,
    ) -> Result<ShopReceipt, ShopError> {
        let receipt = self.quote(lines)?;
        if !stock.can_afford(receipt.total) {
            return Err(ShopError::InsufficientFunds {
                required: receipt.total,
                available: stock.total_funds(),
            });
        }
        stock.try_spend(receipt.total)?;
        for line in &receipt.lines {
            match line.item {
                ShopItem::Container(kind) => stock.add_container_stock(kind, line.quantity),
                ShopItem::CushionPack(cushion) => stock.add_cushion_packs(cushion, line.quantity),
                ShopItem::TapeRoll(color) => stock.add_tape_rolls(color, line.quantity),
            }
        }
        debug!("purchased {} line(s) for {}", receipt.lines.len(), receipt.total);
        Ok(receipt)
    }
}
