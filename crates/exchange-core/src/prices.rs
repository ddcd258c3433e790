//! Resource price table.
//!
//! Every catalog resource always has a price, and every price is at
//! least 1. The table is only mutated by [`PriceTable::perturb`] (the
//! periodic tick) and the constructors.

use std::collections::BTreeMap;

use rand::Rng;

use crate::resource::Resource;

/// Default bound for one tick's random step (inclusive, both directions).
pub const DEFAULT_MAX_PRICE_STEP: u64 = 10;

/// Lowest price a resource can ever be quoted at.
pub const PRICE_FLOOR: u64 = 1;

/// Owned copy of the price table at one instant.
pub type PriceSnapshot = BTreeMap<Resource, u64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    prices: BTreeMap<Resource, u64>,
}

impl Default for PriceTable {
    fn default() -> Self {
        PriceTable {
            prices: Resource::ALL
                .iter()
                .map(|r| (*r, r.initial_price()))
                .collect(),
        }
    }
}

impl PriceTable {
    /// Start from the catalog's initial prices, overriding the given ones.
    ///
    /// Overrides below the floor are raised to it.
    pub fn with_prices(overrides: impl IntoIterator<Item = (Resource, u64)>) -> Self {
        let mut table = PriceTable::default();
        for (resource, price) in overrides {
            table.prices.insert(resource, price.max(PRICE_FLOOR));
        }
        table
    }

    pub fn price(&self, resource: Resource) -> u64 {
        self.prices
            .get(&resource)
            .copied()
            .unwrap_or_else(|| resource.initial_price())
    }

    /// Move every price by a uniform step in `-max_step..=max_step`,
    /// flooring the result at [`PRICE_FLOOR`].
    ///
    /// The new table is computed in full before it replaces the old one.
    pub fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R, max_step: u64) {
        let bound = i64::try_from(max_step).unwrap_or(i64::MAX);

        let next: BTreeMap<Resource, u64> = self
            .prices
            .iter()
            .map(|(resource, &old)| {
                let step = rng.gen_range(-bound..=bound);
                let moved = if step < 0 {
                    old.saturating_sub(step.unsigned_abs())
                } else {
                    old.saturating_add(step.unsigned_abs())
                };
                (*resource, moved.max(PRICE_FLOOR))
            })
            .collect();

        self.prices = next;
    }

    pub fn snapshot(&self) -> PriceSnapshot {
        self.prices.clone()
    }
}
