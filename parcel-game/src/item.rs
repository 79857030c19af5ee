//! Runtime item condition: quality, damage intake and payout.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::catalog::{FallProfile, ItemDefinition};
use crate::constants::{
    COLD_MISMATCH_DEADLINE_DIVISOR, GRAVITY, ICE_CUSHION_BONUS_DAYS, LATE_REWARD_FACTOR,
    MIN_APPLIED_FALL_DAMAGE, QUALITY_MAX, QUALITY_MIN, WATER_TICK_SECS,
};
use crate::numbers::{
    f64_to_f32, floor_f64_to_u32, i32_to_f32, round_f32_to_i32, round_f64_to_i64, u32_to_f32,
};
use crate::protection::Protection;

/// Result of a single damage application.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DamageReport {
    pub applied: f32,
    pub quality: f32,
    pub became_damaged: bool,
    pub became_broken: bool,
}

impl DamageReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.applied <= 0.0
    }
}

/// Accumulates submerged time so degradation lands on whole-second ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaterExposure {
    elapsed: f32,
}

impl WaterExposure {
    /// Add submerged time and return how many whole ticks elapsed.
    pub fn advance(&mut self, dt_secs: f32) -> u32 {
        if !dt_secs.is_finite() || dt_secs <= 0.0 {
            return 0;
        }
        let elapsed = f64::from(self.elapsed) + f64::from(dt_secs);
        let tick = f64::from(WATER_TICK_SECS);
        self.elapsed = f64_to_f32(elapsed.rem_euclid(tick));
        floor_f64_to_u32(elapsed / tick)
    }

    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }
}

/// Damage for a drop of `height_m`, before it is applied.
///
/// Heights round to whole meters; anything below the profile minimum is free.
#[must_use]
pub fn fall_damage(profile: FallProfile, height_m: f32, divisor: u32) -> i32 {
    let meters = round_f32_to_i32(height_m);
    if meters < profile.min_height_m {
        return 0;
    }
    let raw = profile.damage_per_meter.saturating_mul(meters);
    let divisor = i32::try_from(divisor.max(1)).unwrap_or(i32::MAX);
    (raw / divisor).max(MIN_APPLIED_FALL_DAMAGE)
}

/// Equivalent drop height for an impact speed, `h = v² / 2g`.
#[must_use]
pub fn height_for_velocity(velocity: f32) -> f32 {
    if !velocity.is_finite() {
        return 0.0;
    }
    velocity * velocity / (2.0 * GRAVITY)
}

/// Deadline after cold-chain adjustments.
#[must_use]
pub fn effective_deadline_days(
    definition: &ItemDefinition,
    cold_capable_container: bool,
    ice_cushion: bool,
) -> u32 {
    let base = definition.delivery_limit_days;
    if !definition.needs_cold_chain() {
        return base;
    }
    if cold_capable_container {
        if ice_cushion {
            base.saturating_add(ICE_CUSHION_BONUS_DAYS)
        } else {
            base
        }
    } else {
        (base / COLD_MISMATCH_DEADLINE_DIVISOR).max(1)
    }
}

/// Mutable state of one spawned item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCondition {
    definition: Arc<ItemDefinition>,
    quality: f32,
    damaged: bool,
    broken: bool,
    #[serde(default)]
    water: WaterExposure,
}

impl ItemCondition {
    #[must_use]
    pub fn new(definition: Arc<ItemDefinition>) -> Self {
        let quality = definition.base_quality.clamp(QUALITY_MIN, QUALITY_MAX);
        let mut item = Self {
            definition,
            quality,
            damaged: false,
            broken: false,
            water: WaterExposure::default(),
        };
        item.refresh_flags();
        item
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<ItemDefinition> {
        &self.definition
    }

    #[must_use]
    pub const fn quality(&self) -> f32 {
        self.quality
    }

    #[must_use]
    pub const fn is_damaged(&self) -> bool {
        self.damaged
    }

    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.broken
    }

    #[must_use]
    pub fn destination(&self) -> &str {
        &self.definition.destination
    }

    fn refresh_flags(&mut self) {
        self.broken = self.quality <= self.definition.broken_threshold;
        self.damaged = self.broken || self.quality <= self.definition.damaged_threshold;
    }

    /// The single entry point for every quality loss.
    pub fn apply_damage(&mut self, amount: f32) -> DamageReport {
        if amount.is_nan() || amount <= 0.0 || self.broken {
            return DamageReport {
                quality: self.quality,
                ..DamageReport::default()
            };
        }
        let was_damaged = self.damaged;
        let before = self.quality;
        self.quality = (self.quality - amount).clamp(QUALITY_MIN, QUALITY_MAX);
        self.refresh_flags();
        DamageReport {
            applied: before - self.quality,
            quality: self.quality,
            became_damaged: self.damaged && !was_damaged,
            became_broken: self.broken,
        }
    }

    pub fn apply_fall_height(&mut self, height_m: f32, divisor: u32) -> DamageReport {
        let damage = fall_damage(self.definition.fall, height_m, divisor);
        self.apply_damage(i32_to_f32(damage))
    }

    pub fn apply_impact_velocity(&mut self, velocity: f32, divisor: u32) -> DamageReport {
        self.apply_fall_height(height_for_velocity(velocity), divisor)
    }

    /// First touch of water. Instantly-breaking items lose everything unless sealed in a
    /// waterproof container.
    pub fn apply_water_contact(&mut self, protection: Protection) -> DamageReport {
        if protection.waterproof || !self.definition.water.breaks_instantly {
            return self.apply_damage(0.0);
        }
        self.apply_damage(self.quality.max(f32::MIN_POSITIVE))
    }

    /// Continued submersion for `dt_secs`.
    pub fn apply_water_exposure(&mut self, dt_secs: f32, protection: Protection) -> DamageReport {
        let water = self.definition.water;
        if protection.waterproof || !water.degrades {
            return self.apply_damage(0.0);
        }
        let ticks = self.water.advance(dt_secs);
        let per_tick = water.damage_per_second / u32_to_f32(protection.divisor.max(1));
        self.apply_damage(per_tick * u32_to_f32(ticks))
    }

    pub fn leave_water(&mut self) {
        self.water.reset();
    }

    #[must_use]
    pub fn effective_deadline_days(&self, cold_capable_container: bool, ice_cushion: bool) -> u32 {
        effective_deadline_days(&self.definition, cold_capable_container, ice_cushion)
    }

    /// Payout for delivering on `day_delivered` an order created on `day_created`.
    #[must_use]
    pub fn calculate_reward(
        &self,
        day_created: u32,
        day_delivered: u32,
        effective_limit_days: u32,
    ) -> i64 {
        if self.broken {
            return 0;
        }
        let days_used = day_delivered.saturating_sub(day_created);
        let mut reward =
            f64::from(self.definition.base_reward) * f64::from(self.quality) / f64::from(QUALITY_MAX);
        if effective_limit_days > 0 && days_used > effective_limit_days {
            reward *= LATE_REWARD_FACTOR;
        }
        round_f64_to_i64(reward).max(0)
    }
}
