//! Headless shift simulation: customers arrive, parcels are packed, carried
//! across town and handed over, one in-game day at a time.
use anyhow::{Context, Result};
use log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use parcel_game::{
    CartLine, ContainerId, ContainerKind, CushionType, CustomerId, DeliveryReceipt, EventKind,
    ItemCatalog, ItemDefinition, ItemId, OrderGenerator, PackingError, ParcelSession,
    SessionConfig, SessionError, ShopItem, StartingStock, StockLedger, TapeColor,
};

const CUSHION_LAYERS: u8 = 3;
const HAZARD_SALT: u64 = 0xD1CE_F00D_0BAD_CAFE;
const CUSHION_TICK_SECS: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStrategy {
    /// Best box for the item, strongest cushion, restocks from the shop.
    Careful,
    /// Cheapest box, basic cushion, never restocks.
    Reckless,
}

impl ShiftStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Careful => "careful",
            Self::Reckless => "reckless",
        }
    }

    const fn restocks(self) -> bool {
        matches!(self, Self::Careful)
    }

    const fn tape(self) -> TapeColor {
        match self {
            Self::Careful => TapeColor::Green,
            Self::Reckless => TapeColor::Red,
        }
    }

    fn container_for(self, definition: &ItemDefinition) -> Option<ContainerKind> {
        let preference: &[ContainerKind] = match self {
            Self::Careful if definition.needs_cold_chain() => {
                &[ContainerKind::Cold, ContainerKind::Large, ContainerKind::Medium]
            }
            Self::Careful if definition.water.breaks_instantly => &[
                ContainerKind::WaterproofMedium,
                ContainerKind::WaterproofLarge,
            ],
            Self::Careful => &[
                ContainerKind::Medium,
                ContainerKind::Small,
                ContainerKind::Large,
                ContainerKind::WaterproofMedium,
                ContainerKind::WaterproofLarge,
                ContainerKind::Cold,
            ],
            Self::Reckless => &[
                ContainerKind::Small,
                ContainerKind::Medium,
                ContainerKind::Large,
                ContainerKind::Cold,
                ContainerKind::WaterproofMedium,
                ContainerKind::WaterproofLarge,
            ],
        };
        preference
            .iter()
            .copied()
            .find(|&kind| definition.accepts(kind))
    }

    const fn cushion_for(self, kind: ContainerKind) -> CushionType {
        match self {
            Self::Careful if kind.is_cold_capable() => CushionType::Ice,
            Self::Careful => CushionType::Strong,
            Self::Reckless => CushionType::Basic,
        }
    }

    #[must_use]
    pub const fn default_hazards(self) -> HazardProfile {
        match self {
            Self::Careful => HazardProfile {
                fall_chance: 0.2,
                min_fall_m: 1.0,
                max_fall_m: 2.0,
                swim_chance: 0.0,
                swim_secs: 0.0,
            },
            Self::Reckless => HazardProfile {
                fall_chance: 0.6,
                min_fall_m: 2.0,
                max_fall_m: 5.0,
                swim_chance: 0.3,
                swim_secs: 3.0,
            },
        }
    }
}

/// What can go wrong on the way to the drop-off points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardProfile {
    pub fall_chance: f32,
    pub min_fall_m: f32,
    pub max_fall_m: f32,
    pub swim_chance: f32,
    pub swim_secs: f32,
}

impl HazardProfile {
    pub const NONE: Self = Self {
        fall_chance: 0.0,
        min_fall_m: 0.0,
        max_fall_m: 0.0,
        swim_chance: 0.0,
        swim_secs: 0.0,
    };
}

/// Assertion hook run after a shift completes.
type ShiftExpectationFn = Arc<dyn Fn(&ShiftSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct ShiftExpectation(ShiftExpectationFn);

impl std::fmt::Debug for ShiftExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShiftExpectation").finish()
    }
}

impl ShiftExpectation {
    pub fn evaluate(&self, summary: &ShiftSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for ShiftExpectation
where
    F: Fn(&ShiftSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

#[derive(Debug, Clone)]
pub struct ShiftPlan {
    pub strategy: ShiftStrategy,
    pub days: u32,
    pub orders_per_day: usize,
    pub hazards: HazardProfile,
    pub config: SessionConfig,
    pub setup: Option<fn(&mut ParcelSession)>,
    pub expectations: Vec<ShiftExpectation>,
}

impl ShiftPlan {
    #[must_use]
    pub fn new(strategy: ShiftStrategy) -> Self {
        Self {
            strategy,
            days: 1,
            orders_per_day: 3,
            hazards: strategy.default_hazards(),
            config: default_shift_config(),
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    #[must_use]
    pub const fn with_orders_per_day(mut self, orders: usize) -> Self {
        self.orders_per_day = orders;
        self
    }

    #[must_use]
    pub const fn with_hazards(mut self, hazards: HazardProfile) -> Self {
        self.hazards = hazards;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut ParcelSession)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<ShiftExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// A shop that opens with cash in the bank and a few of everything.
#[must_use]
pub fn default_shift_config() -> SessionConfig {
    SessionConfig {
        starting_stock: StartingStock {
            bank: 300,
            cash: 0,
            containers: BTreeMap::from([
                (ContainerKind::Small, 2),
                (ContainerKind::Medium, 3),
                (ContainerKind::Cold, 1),
            ]),
            cushion_packs: BTreeMap::from([(CushionType::Basic, 3), (CushionType::Strong, 2)]),
            tape_rolls: BTreeMap::from([(TapeColor::Red, 1), (TapeColor::Green, 1)]),
        },
        ..SessionConfig::default()
    }
}

/// Everything a scenario may want to assert about a finished shift.
#[derive(Debug, Clone)]
pub struct ShiftSummary {
    pub seed: u64,
    pub strategy: ShiftStrategy,
    pub days_played: u32,
    pub orders_accepted: usize,
    pub orders_declined: usize,
    pub parcels_packed: usize,
    pub stock_refusals: usize,
    pub purchases: usize,
    pub falls: usize,
    pub swims: usize,
    pub damage_events: usize,
    pub receipts: Vec<DeliveryReceipt>,
    pub errors: Vec<String>,
    pub final_stock: StockLedger,
}

impl ShiftSummary {
    fn new(seed: u64, strategy: ShiftStrategy) -> Self {
        Self {
            seed,
            strategy,
            days_played: 0,
            orders_accepted: 0,
            orders_declined: 0,
            parcels_packed: 0,
            stock_refusals: 0,
            purchases: 0,
            falls: 0,
            swims: 0,
            damage_events: 0,
            receipts: Vec::new(),
            errors: Vec::new(),
            final_stock: StockLedger::new(),
        }
    }

    #[must_use]
    pub fn deliveries(&self) -> usize {
        self.receipts.len()
    }

    #[must_use]
    pub fn broken_deliveries(&self) -> usize {
        self.receipts.iter().filter(|r| r.broken).count()
    }

    #[must_use]
    pub fn late_deliveries(&self) -> usize {
        self.receipts.iter().filter(|r| r.late).count()
    }

    #[must_use]
    pub fn total_reward(&self) -> i64 {
        self.receipts.iter().map(|r| r.reward).sum()
    }

    #[must_use]
    pub fn min_quality(&self) -> Option<f32> {
        self.receipts.iter().map(|r| r.quality).reduce(f32::min)
    }

    /// Every accepted order ends up delivered or declined.
    #[must_use]
    pub fn orders_balanced(&self) -> bool {
        self.orders_accepted == self.deliveries() + self.orders_declined
    }
}

/// Headless deterministic runner for shift plans.
#[derive(Debug, Clone)]
pub struct ShiftRunner {
    catalog: ItemCatalog,
    verbose: bool,
}

impl ShiftRunner {
    #[must_use]
    pub const fn new(catalog: ItemCatalog, verbose: bool) -> Self {
        Self { catalog, verbose }
    }

    /// Runner over the item catalog compiled into the game crate.
    pub fn try_new(verbose: bool) -> Result<Self> {
        let catalog = ItemCatalog::builtin().context("built-in catalog failed to load")?;
        Ok(Self::new(catalog, verbose))
    }

    pub fn run_plan(&self, plan: &ShiftPlan, seed: u64) -> Result<ShiftSummary> {
        let mut session = ParcelSession::new(plan.config.clone(), self.catalog.clone())
            .context("shift config rejected")?;
        if let Some(setup) = plan.setup {
            setup(&mut session);
        }
        let mut orders = OrderGenerator::from_seed(seed);
        let mut hazard_rng = ChaCha20Rng::seed_from_u64(seed ^ HAZARD_SALT);
        let mut summary = ShiftSummary::new(seed, plan.strategy);
        let mut next_customer = 1_u32;

        for _ in 0..plan.days {
            let mut packed = Vec::with_capacity(plan.orders_per_day);
            for _ in 0..plan.orders_per_day {
                session.tick(orders.next_spawn_delay());
                let Some(definition) = orders.next_item(session.catalog()) else {
                    break;
                };
                let customer = CustomerId(next_customer);
                next_customer = next_customer.saturating_add(1);
                let item = match session.accept_order(customer, &definition.key) {
                    Ok(item) => item,
                    Err(err) => {
                        summary.errors.push(err.to_string());
                        continue;
                    }
                };
                summary.orders_accepted += 1;

                match pack(&mut session, plan.strategy, &definition, item, &mut summary) {
                    Ok(container) => {
                        summary.parcels_packed += 1;
                        packed.push(container);
                    }
                    Err(err) => {
                        if is_stock_refusal(&err) {
                            summary.stock_refusals += 1;
                        }
                        if self.verbose {
                            println!("     ↳ {customer} declined {}: {err}", definition.key);
                        }
                        debug!("{customer} declined {}: {err}", definition.key);
                        session.decline_order(customer);
                        summary.orders_declined += 1;
                    }
                }
            }

            deliver_round(
                &mut session,
                &packed,
                plan.hazards,
                &mut hazard_rng,
                &mut summary,
            );
            session.end_day();
            summary.days_played += 1;
            summary.damage_events += session
                .drain_events()
                .iter()
                .filter(|event| matches!(event.kind, EventKind::ItemDamaged { .. }))
                .count();
        }

        summary.final_stock = session.stock().clone();
        Ok(summary)
    }
}

fn is_stock_refusal(err: &SessionError) -> bool {
    matches!(
        err,
        SessionError::Stock(_) | SessionError::Shop(_) | SessionError::Packing(PackingError::Stock(_))
    )
}

fn pack(
    session: &mut ParcelSession,
    strategy: ShiftStrategy,
    definition: &ItemDefinition,
    item: ItemId,
    summary: &mut ShiftSummary,
) -> Result<ContainerId, SessionError> {
    let Some(kind) = strategy.container_for(definition) else {
        return Err(PackingError::KindNotAccepted {
            kind: ContainerKind::Medium,
            item: definition.key.clone(),
        }
        .into());
    };
    let cushion = strategy.cushion_for(kind);
    let tape = strategy.tape();
    if strategy.restocks() {
        restock(session, kind, cushion, tape, summary)?;
    }

    let container = session.spawn_container(kind)?;
    session.insert_item(container, item)?;
    for _ in 0..CUSHION_LAYERS {
        session.apply_cushion(container, cushion)?;
        session.tick(CUSHION_TICK_SECS);
    }
    session.close_lids(container)?;
    session.apply_tape(container, tape)?;
    session.attach_label(container)?;
    Ok(container)
}

fn restock(
    session: &mut ParcelSession,
    kind: ContainerKind,
    cushion: CushionType,
    tape: TapeColor,
    summary: &mut ShiftSummary,
) -> Result<(), SessionError> {
    let stock = session.stock();
    let mut cart = Vec::new();
    if stock.container_stock(kind) == 0 {
        cart.push(CartLine::new(ShopItem::Container(kind), 1));
    }
    if stock.cushion_uses(cushion) < u32::from(CUSHION_LAYERS) {
        cart.push(CartLine::new(ShopItem::CushionPack(cushion), 1));
    }
    if !stock.has_tape_use(tape) {
        cart.push(CartLine::new(ShopItem::TapeRoll(tape), 1));
    }
    if cart.is_empty() {
        return Ok(());
    }
    session.purchase(&cart)?;
    summary.purchases += 1;
    Ok(())
}

fn roll(rng: &mut ChaCha20Rng, chance: f32) -> bool {
    rng.r#gen::<f32>() < chance
}

/// Load the day's parcels, walk the route and hand everything over.
fn deliver_round(
    session: &mut ParcelSession,
    packed: &[ContainerId],
    hazards: HazardProfile,
    rng: &mut ChaCha20Rng,
    summary: &mut ShiftSummary,
) {
    for &container in packed {
        if let Err(err) = session.store_container(container) {
            debug!("{container} handed over at the counter: {err}");
            match session.complete_delivery(container) {
                Ok(receipt) => summary.receipts.push(receipt),
                Err(err) => summary.errors.push(err.to_string()),
            }
        }
    }

    if roll(rng, hazards.fall_chance) {
        let height = if hazards.max_fall_m > hazards.min_fall_m {
            rng.gen_range(hazards.min_fall_m..hazards.max_fall_m)
        } else {
            hazards.min_fall_m
        };
        session.player_fell(height);
        summary.falls += 1;
    }
    if roll(rng, hazards.swim_chance) {
        session.player_entered_water();
        session.tick(hazards.swim_secs);
        session.player_left_water();
        summary.swims += 1;
    }

    loop {
        let next_destination = session
            .carry()
            .occupied()
            .next()
            .map(|(_, snapshot)| snapshot.item.destination().to_string());
        let Some(destination) = next_destination else {
            break;
        };
        match session.deliver_at(&destination) {
            Ok(receipt) => summary.receipts.push(receipt),
            Err(err) => {
                summary.errors.push(err.to_string());
                break;
            }
        }
    }
}
