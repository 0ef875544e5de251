use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::port::Port;

pub const NB_GOODS: usize = 10;

// Resale at a port pays this fraction of the local purchase price
const SELL_RATIO: f64 = 80.0 / 100.0;

// Daily price swing around the posted multiplier
const FACTOR_MIN: f64 = 0.9;
const FACTOR_MAX: f64 = 1.1;

#[derive(
    EnumIter,
    EnumString,
    IntoStaticStr,
    Debug,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Clone,
    Copy,
)]
#[strum(ascii_case_insensitive)]
pub enum Good {
    // Luxury cargo
    Spices,
    Silk,
    Porcelain,

    // Bulk cargo
    Tea,
    Sugar,
    Tobacco,
    Cotton,
    Wine,

    // Provisions, consumed by the crew at sea
    Food,
    Water,
}

impl Good {
    pub fn base_price(&self) -> u32 {
        match self {
            Good::Spices => 80,
            Good::Silk => 120,
            Good::Porcelain => 60,
            Good::Tea => 40,
            Good::Sugar => 30,
            Good::Tobacco => 50,
            Good::Cotton => 25,
            Good::Wine => 35,
            Good::Food => 10,
            Good::Water => 5,
        }
    }

    pub fn is_supply(&self) -> bool {
        matches!(self, Good::Food | Good::Water)
    }
}

// Posted multipliers of each port, indexed by Good declaration order:
// Spices, Silk, Porcelain, Tea, Sugar, Tobacco, Cotton, Wine, Food, Water
fn port_multipliers(port: Port) -> [f64; NB_GOODS] {
    match port {
        Port::Lisbon => [1.8, 1.9, 1.7, 1.6, 1.3, 1.4, 1.0, 0.6, 0.8, 0.8],
        Port::Seville => [1.9, 1.8, 1.6, 1.5, 0.7, 0.6, 0.9, 1.0, 0.8, 0.9],
        Port::CapeVerde => [1.9, 2.1, 1.8, 1.7, 0.9, 1.2, 1.1, 1.3, 0.9, 0.8],
        Port::Goa => [0.5, 1.1, 1.2, 1.0, 1.2, 1.5, 0.5, 1.9, 1.0, 1.0],
        Port::Malacca => [0.4, 1.0, 1.0, 0.8, 1.1, 1.6, 0.9, 2.0, 1.0, 1.0],
        Port::Macau => [1.0, 0.5, 0.5, 0.6, 1.2, 1.7, 1.2, 2.1, 1.0, 1.1],
        Port::Nagasaki => [1.5, 1.7, 1.3, 0.9, 1.6, 1.8, 1.3, 2.2, 1.1, 1.0],
    }
}

pub fn price_multiplier(port: Port, good: Good) -> f64 {
    port_multipliers(port)[good as usize]
}

// Daily price factors of every (port, good) pair. Factors are rolled
// once per game day and stay frozen until the next day change, so
// repeated quotes within a day always agree.
pub struct Market {
    factors: BTreeMap<(Port, Good), f64>,
}

impl Market {
    pub fn init<R: Rng>(rng: &mut R) -> Market {
        let mut market = Market {
            factors: BTreeMap::new(),
        };
        market.reroll_factors(rng);
        market
    }

    pub fn reroll_factors<R: Rng>(&mut self, rng: &mut R) {
        for port in Port::iter() {
            for good in Good::iter() {
                self.factors
                    .insert((port, good), rng.random_range(FACTOR_MIN..=FACTOR_MAX));
            }
        }
    }

    fn factor(&self, port: Port, good: Good) -> f64 {
        self.factors.get(&(port, good)).copied().unwrap_or(1.0)
    }

    pub fn buy_price(&self, port: Port, good: Good) -> u32 {
        let price =
            good.base_price() as f64 * price_multiplier(port, good) * self.factor(port, good);
        let price = price.round() as u32;
        debug_assert!(price > 0);
        price.max(1)
    }

    pub fn sell_price(&self, port: Port, good: Good) -> u32 {
        (self.buy_price(port, good) as f64 * SELL_RATIO).round() as u32
    }

    #[cfg(test)]
    pub fn flat() -> Market {
        let mut factors = BTreeMap::new();
        for port in Port::iter() {
            for good in Good::iter() {
                factors.insert((port, good), 1.0);
            }
        }
        Market { factors }
    }
}

#[test]
fn test_price_bounds() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(77);
    let market = Market::init(&mut rng);
    for port in Port::iter() {
        for good in Good::iter() {
            let posted = good.base_price() as f64 * price_multiplier(port, good);
            let buy = market.buy_price(port, good);
            assert!(buy >= (posted * FACTOR_MIN).floor() as u32);
            assert!(buy <= (posted * FACTOR_MAX).ceil() as u32);
            let sell = market.sell_price(port, good);
            assert_eq!(sell, (buy as f64 * SELL_RATIO).round() as u32);
            assert!(sell <= buy);
        }
    }
}

#[test]
fn test_flat_prices() {
    let market = Market::flat();
    assert_eq!(market.buy_price(Port::Lisbon, Good::Wine), 21);
    assert_eq!(market.sell_price(Port::Lisbon, Good::Wine), 17);
    assert_eq!(market.buy_price(Port::Malacca, Good::Wine), 70);
    assert_eq!(market.sell_price(Port::Malacca, Good::Wine), 56);
    assert_eq!(market.buy_price(Port::Nagasaki, Good::Spices), 120);
}

#[test]
fn test_reroll_changes_factors() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(1);
    let mut market = Market::init(&mut rng);
    let before = market.factors.clone();
    market.reroll_factors(&mut rng);
    assert_ne!(before, market.factors);
    for factor in market.factors.values() {
        assert!(*factor >= FACTOR_MIN && *factor <= FACTOR_MAX);
    }
}

#[test]
fn test_supply_goods() {
    assert!(Good::Food.is_supply());
    assert!(Good::Water.is_supply());
    for good in Good::iter() {
        if !matches!(good, Good::Food | Good::Water) {
            assert!(!good.is_supply());
        }
    }
}
