use anyhow::{Context, Result, ensure};
use std::collections::BTreeMap;

use crate::logic::{HazardProfile, ShiftPlan, ShiftStrategy, ShiftSummary, default_shift_config};
use parcel_game::{ContainerKind, CushionType, ItemCatalog, StartingStock, TapeColor};

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: ShiftPlan,
}

impl TestScenario {
    #[must_use]
    pub fn shift(name: impl Into<String>, plan: ShiftPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

fn no_errors(summary: &ShiftSummary) -> Result<()> {
    ensure!(
        summary.errors.is_empty(),
        "Shift reported errors: {:?}",
        summary.errors
    );
    Ok(())
}

fn nothing_broken(summary: &ShiftSummary) -> Result<()> {
    ensure!(
        summary.broken_deliveries() == 0,
        "{} parcels arrived broken",
        summary.broken_deliveries()
    );
    Ok(())
}

fn smoke_scenario() -> TestScenario {
    TestScenario::shift(
        "Smoke Test",
        ShiftPlan::new(ShiftStrategy::Careful).with_expectation(|summary: &ShiftSummary| {
            no_errors(summary)?;
            ensure!(summary.days_played == 1, "Shift should last one day");
            ensure!(summary.orders_accepted > 0, "No customer was served");
            Ok(())
        }),
    )
}

fn happy_path_scenario() -> TestScenario {
    TestScenario::shift(
        "Packing Happy Path",
        ShiftPlan::new(ShiftStrategy::Careful)
            .with_days(2)
            .with_hazards(HazardProfile::NONE)
            .with_expectation(|summary: &ShiftSummary| {
                no_errors(summary)?;
                ensure!(
                    summary.parcels_packed == summary.orders_accepted,
                    "Packed {} of {} orders",
                    summary.parcels_packed,
                    summary.orders_accepted
                );
                ensure!(
                    summary.deliveries() == summary.parcels_packed,
                    "Delivered {} of {} parcels",
                    summary.deliveries(),
                    summary.parcels_packed
                );
                nothing_broken(summary)?;
                ensure!(summary.late_deliveries() == 0, "Parcels arrived late");
                ensure!(summary.total_reward() > 0, "Shift earned nothing");
                Ok(())
            }),
    )
}

fn fall_protection_scenario() -> TestScenario {
    TestScenario::shift(
        "Fall Protection",
        ShiftPlan::new(ShiftStrategy::Careful)
            .with_days(2)
            .with_hazards(HazardProfile {
                fall_chance: 1.0,
                min_fall_m: 3.0,
                max_fall_m: 3.0,
                ..HazardProfile::NONE
            })
            .with_expectation(|summary: &ShiftSummary| {
                no_errors(summary)?;
                ensure!(summary.falls == 2, "Expected a fall every day");
                nothing_broken(summary)?;
                if let Some(quality) = summary.min_quality() {
                    ensure!(
                        quality >= 80.0,
                        "Strong cushioning should soften a 3 m fall (quality {quality})"
                    );
                }
                Ok(())
            }),
    )
}

fn cold_chain_scenario() -> TestScenario {
    TestScenario::shift(
        "Cold Chain",
        ShiftPlan::new(ShiftStrategy::Careful)
            .with_days(3)
            .with_hazards(HazardProfile::NONE)
            .with_expectation(|summary: &ShiftSummary| {
                no_errors(summary)?;
                let catalog = ItemCatalog::builtin().context("built-in catalog")?;
                for receipt in &summary.receipts {
                    let definition = catalog
                        .get(&receipt.item_key)
                        .with_context(|| format!("unknown item {}", receipt.item_key))?;
                    if definition.needs_cold_chain() {
                        ensure!(
                            receipt.effective_deadline_days > definition.delivery_limit_days,
                            "{} travelled without ice ({} days)",
                            receipt.item_key,
                            receipt.effective_deadline_days
                        );
                    }
                }
                Ok(())
            }),
    )
}

fn waterproof_scenario() -> TestScenario {
    TestScenario::shift(
        "Waterproof Crossing",
        ShiftPlan::new(ShiftStrategy::Careful)
            .with_days(3)
            .with_hazards(HazardProfile {
                swim_chance: 1.0,
                swim_secs: 3.0,
                ..HazardProfile::NONE
            })
            .with_expectation(|summary: &ShiftSummary| {
                no_errors(summary)?;
                ensure!(summary.swims == 3, "Expected a swim every day");
                nothing_broken(summary)
            }),
    )
}

fn stock_exhaustion_scenario() -> TestScenario {
    let mut config = default_shift_config();
    config.starting_stock = StartingStock {
        bank: 0,
        cash: 0,
        containers: BTreeMap::from([(ContainerKind::Small, 1)]),
        cushion_packs: BTreeMap::from([(CushionType::Basic, 1)]),
        tape_rolls: BTreeMap::from([(TapeColor::Red, 1)]),
    };
    TestScenario::shift(
        "Stock Exhaustion",
        ShiftPlan::new(ShiftStrategy::Reckless)
            .with_days(2)
            .with_orders_per_day(4)
            .with_hazards(HazardProfile::NONE)
            .with_config(config)
            .with_expectation(|summary: &ShiftSummary| {
                ensure!(summary.stock_refusals > 0, "Empty shelves refused nothing");
                ensure!(
                    summary.parcels_packed <= 1,
                    "Packed {} parcels from a single box",
                    summary.parcels_packed
                );
                ensure!(summary.purchases == 0, "Reckless shifts never restock");
                ensure!(
                    summary.final_stock.total_funds() >= 0,
                    "Funds went negative"
                );
                Ok(())
            }),
    )
}

fn careful_shift_scenario() -> TestScenario {
    TestScenario::shift(
        "Careful Shift",
        ShiftPlan::new(ShiftStrategy::Careful)
            .with_days(5)
            .with_setup(|session| {
                session
                    .stock_mut()
                    .add_container_stock(ContainerKind::WaterproofMedium, 2);
            })
            .with_expectation(|summary: &ShiftSummary| {
                no_errors(summary)?;
                ensure!(summary.orders_balanced(), "Orders went missing");
                nothing_broken(summary)?;
                ensure!(
                    summary.final_stock.total_funds() >= 0,
                    "Funds went negative"
                );
                Ok(())
            }),
    )
}

fn reckless_shift_scenario() -> TestScenario {
    TestScenario::shift(
        "Reckless Shift",
        ShiftPlan::new(ShiftStrategy::Reckless)
            .with_days(5)
            .with_expectation(|summary: &ShiftSummary| {
                no_errors(summary)?;
                ensure!(summary.orders_balanced(), "Orders went missing");
                ensure!(summary.days_played == 5, "Shift ended early");
                Ok(())
            }),
    )
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke_scenario()),
        "packing-happy-path" | "happy-path" => Some(happy_path_scenario()),
        "fall-protection" | "falls" => Some(fall_protection_scenario()),
        "cold-chain" | "cold" => Some(cold_chain_scenario()),
        "waterproof" | "water" => Some(waterproof_scenario()),
        "stock-exhaustion" | "stock" => Some(stock_exhaustion_scenario()),
        "careful-shift" | "careful" => Some(careful_shift_scenario()),
        "reckless-shift" | "reckless" => Some(reckless_shift_scenario()),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("packing-happy-path", "Packing Happy Path"),
        ("fall-protection", "Fall Protection"),
        ("cold-chain", "Cold Chain"),
        ("waterproof", "Waterproof Crossing"),
        ("stock-exhaustion", "Stock Exhaustion"),
        ("careful-shift", "Careful Shift - Five Days"),
        ("reckless-shift", "Reckless Shift - Five Days"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scenario_resolves() {
        for (key, _) in list_scenarios() {
            assert!(get_scenario(key).is_some(), "missing scenario {key}");
        }
        assert_eq!(get_scenario("COLD").unwrap().name, "Cold Chain");
        assert!(get_scenario("all").is_none());
    }

    #[test]
    fn stock_exhaustion_starts_broke() {
        let scenario = get_scenario("stock-exhaustion").unwrap();
        assert_eq!(scenario.plan.strategy, ShiftStrategy::Reckless);
        assert_eq!(scenario.plan.config.starting_stock.bank, 0);
        assert_eq!(scenario.plan.hazards, HazardProfile::NONE);
    }
}
