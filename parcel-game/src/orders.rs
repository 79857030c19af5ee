//! Seeded customer order generation.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::Arc;

use crate::catalog::{ItemCatalog, ItemDefinition};

const DEFAULT_MIN_SPAWN_DELAY_SECS: f32 = 3.0;
const DEFAULT_MAX_SPAWN_DELAY_SECS: f32 = 6.0;

/// Weighted random selection from a list of options
pub fn weighted_pick<T, R>(options: &[(T, u32)], rng: &mut R) -> Option<T>
where
    R: Rng,
    T: Clone,
{
    let total_weight: u32 = options.iter().map(|(_, weight)| *weight).sum();
    if total_weight == 0 {
        return None;
    }

    let roll = rng.gen_range(0..total_weight);
    let mut current_weight = 0;
    for (item, weight) in options {
        current_weight += weight;
        if roll < current_weight {
            return Some(item.clone());
        }
    }
    options.first().map(|(item, _)| item.clone())
}

/// Draws which item the next customer wants and when they walk in.
#[derive(Debug, Clone)]
pub struct OrderGenerator {
    rng: ChaCha20Rng,
    min_delay_secs: f32,
    max_delay_secs: f32,
}

impl OrderGenerator {
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            min_delay_secs: DEFAULT_MIN_SPAWN_DELAY_SECS,
            max_delay_secs: DEFAULT_MAX_SPAWN_DELAY_SECS,
        }
    }

    #[must_use]
    pub fn with_delay_range(mut self, min_secs: f32, max_secs: f32) -> Self {
        let min = min_secs.max(0.0);
        self.min_delay_secs = min;
        self.max_delay_secs = max_secs.max(min);
        self
    }

    pub fn next_item(&mut self, catalog: &ItemCatalog) -> Option<Arc<ItemDefinition>> {
        let options: Vec<(Arc<ItemDefinition>, u32)> = catalog
            .items()
            .iter()
            .map(|item| (Arc::clone(item), item.weight))
            .collect();
        weighted_pick(&options, &mut self.rng)
    }

    pub fn next_spawn_delay(&mut self) -> f32 {
        if self.max_delay_secs <= self.min_delay_secs {
            return self.min_delay_secs;
        }
        self.rng.gen_range(self.min_delay_secs..self.max_delay_secs)
    }

    /// True with probability `chance`.
    pub fn roll(&mut self, chance: f32) -> bool {
        self.rng.r#gen::<f32>() < chance
    }

    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..max)
    }
}
