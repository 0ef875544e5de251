use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

use crate::market::Good;
use crate::port::Port;

// Stock of every good at every port. Purchases drain it, days spent
// in harbour refill it, selling to a port does not feed it back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PortInventory {
    pub stocks: BTreeMap<Port, BTreeMap<Good, u32>>,
}

impl PortInventory {
    pub fn init() -> PortInventory {
        let mut stocks = BTreeMap::new();
        for port in Port::iter() {
            let max = port.size().max_stock();
            let mut goods = BTreeMap::new();
            for good in Good::iter() {
                goods.insert(good, max);
            }
            stocks.insert(port, goods);
        }
        PortInventory { stocks }
    }

    pub fn stock_of(&self, port: Port, good: Good) -> u32 {
        let Some(goods) = self.stocks.get(&port) else {
            return 0;
        };
        goods.get(&good).copied().unwrap_or(0)
    }

    pub fn reduce_stock(&mut self, port: Port, good: Good, amnt: u32) {
        let entry = self.stocks.entry(port).or_default().entry(good).or_insert(0);
        *entry = entry.saturating_sub(amnt);
    }

    pub fn refresh(&mut self, days: u32) {
        if days == 0 {
            return;
        }
        for port in Port::iter() {
            let size = port.size();
            let added = size.refresh_rate().saturating_mul(days);
            let max = size.max_stock();
            let goods = self.stocks.entry(port).or_default();
            for good in Good::iter() {
                let entry = goods.entry(good).or_insert(0);
                *entry = entry.saturating_add(added).min(max);
            }
        }
    }
}

#[test]
fn test_refresh_rate_and_clamp() {
    let mut stocks = PortInventory::init();
    assert_eq!(stocks.stock_of(Port::Nagasaki, Good::Spices), 30);
    stocks.reduce_stock(Port::Nagasaki, Good::Spices, 99);
    assert_eq!(stocks.stock_of(Port::Nagasaki, Good::Spices), 0);

    stocks.refresh(5);
    assert_eq!(stocks.stock_of(Port::Nagasaki, Good::Spices), 15);
    stocks.refresh(1000);
    assert_eq!(stocks.stock_of(Port::Nagasaki, Good::Spices), 30);
}

#[test]
fn test_refresh_zero_days() {
    let mut stocks = PortInventory::init();
    stocks.reduce_stock(Port::Goa, Good::Silk, 50);
    stocks.refresh(0);
    assert_eq!(stocks.stock_of(Port::Goa, Good::Silk), 100);
}

#[test]
fn test_unknown_pair_reads_empty() {
    let stocks = PortInventory {
        stocks: BTreeMap::new(),
    };
    assert_eq!(stocks.stock_of(Port::Lisbon, Good::Tea), 0);
}
