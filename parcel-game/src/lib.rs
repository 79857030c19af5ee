//! Parcel Game Engine
//!
//! Platform-agnostic core of a parcel packing and delivery game: the packing
//! state machine, item condition and damage, shop stock and money, carry slots
//! and the delivery ledger. Physics, rendering and input live in the host.

pub mod carry;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod constants;
pub mod container;
pub mod delivery;
pub mod events;
pub mod ids;
pub mod item;
pub mod ledger;
pub mod numbers;
pub mod orders;
pub mod protection;
pub mod session;
pub mod shop;
pub mod tween;

// Re-export commonly used types
pub use carry::{CarryError, CarrySnapshot, CarryStore, StoreRejected};
pub use catalog::{
    CatalogError, FallProfile, ItemCatalog, ItemCategory, ItemDefinition, WaterProfile,
};
pub use clock::GameClock;
pub use config::{ConfigError, SessionConfig, StartingStock};
pub use container::{
    Container, InsertRejected, LidSide, PackingError, PackingRecord, PackingStep, PhysicalMode,
};
pub use delivery::{DeliveryError, DeliveryLedger, DeliveryReceipt, DeliveryRecord, ParcelView};
pub use events::{DamageTarget, EventId, EventKind, EventLog, EventSeverity, SessionEvent};
pub use ids::{ContainerId, CustomerId, ItemId};
pub use item::{DamageReport, ItemCondition, WaterExposure, fall_damage, height_for_velocity};
pub use ledger::{LedgerKeyMap, StockError, StockLedger};
pub use orders::{OrderGenerator, weighted_pick};
pub use protection::{ContainerKind, CushionType, Protection, ProtectionTable, TapeColor};
pub use session::{LooseItem, ParcelSession, SessionError, WorldContainer};
pub use shop::{CartLine, PriceList, ShopError, ShopItem, ShopReceipt};
pub use tween::{Tween, TweenBoard, TweenChannel};

/// Name under which hosts expose the session config to [`CatalogLoader::load_config`].
pub const SESSION_CONFIG_NAME: &str = "session";

/// Trait for abstracting catalog and config loading
/// Platform-specific implementations should provide this
pub trait CatalogLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the item catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<ItemCatalog, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for abstracting persistence of the stock ledger.
/// The ledger is stored as flat `eco.*` keys.
pub trait LedgerStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// # Errors
    ///
    /// Returns an error if the ledger cannot be saved.
    fn save_ledger(&self, slot: &str, keys: &LedgerKeyMap) -> Result<(), Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the ledger cannot be read.
    fn load_ledger(&self, slot: &str) -> Result<Option<LedgerKeyMap>, Self::Error>;

    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_ledger(&self, slot: &str) -> Result<(), Self::Error>;
}

/// Main engine for opening and persisting shop sessions
pub struct ParcelEngine<L, S>
where
    L: CatalogLoader,
    S: LedgerStorage,
{
    loader: L,
    storage: S,
}

impl<L, S> ParcelEngine<L, S>
where
    L: CatalogLoader,
    S: LedgerStorage,
{
    pub const fn new(loader: L, storage: S) -> Self {
        Self { loader, storage }
    }

    /// Open a fresh session from the loader's catalog and config.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the config is invalid.
    pub fn create_session(&self) -> anyhow::Result<ParcelSession>
    where
        L::Error: Into<anyhow::Error>,
    {
        let catalog = self.loader.load_catalog().map_err(Into::into)?;
        let config: SessionConfig = self
            .loader
            .load_config(SESSION_CONFIG_NAME)
            .map_err(Into::into)?;
        Ok(ParcelSession::new(config, catalog)?)
    }

    /// Persist the session's stock and money.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot be saved.
    pub fn save_session(&self, slot: &str, session: &ParcelSession) -> Result<(), S::Error> {
        self.storage.save_ledger(slot, &session.stock().to_key_map())
    }

    /// Reopen a saved shop. Floor and carried parcels are not persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if the save or the catalog cannot be loaded.
    pub fn load_session(&self, slot: &str) -> anyhow::Result<Option<ParcelSession>>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(keys) = self.storage.load_ledger(slot).map_err(Into::into)? else {
            return Ok(None);
        };
        let session = self.create_session()?;
        Ok(Some(session.with_stock(StockLedger::from_key_map(&keys))))
    }

    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_save(&self, slot: &str) -> Result<(), S::Error> {
        self.storage.delete_ledger(slot)
    }
}
