use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::market::Good;

// Goods stowed in the hold. The ceiling comes from the ship carrying
// the hold, so every mutation takes the capacity as argument.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CargoHold {
    pub goods: BTreeMap<Good, u32>,
}

impl CargoHold {
    pub fn quantity_of(&self, good: Good) -> u32 {
        self.goods.get(&good).copied().unwrap_or(0)
    }

    pub fn used(&self) -> u32 {
        self.goods.values().sum()
    }

    pub fn space_left(&self, capacity: u32) -> u32 {
        capacity.saturating_sub(self.used())
    }

    // Stow up to amnt units, returns how many actually fit
    pub fn add(&mut self, good: Good, amnt: u32, capacity: u32) -> u32 {
        let added = amnt.min(self.space_left(capacity));
        if added == 0 {
            return 0;
        }
        if let Some(held) = self.goods.get_mut(&good) {
            *held += added;
        } else {
            self.goods.insert(good, added);
        }
        added
    }

    // Take up to amnt units out, returns how many were actually held
    pub fn remove(&mut self, good: Good, amnt: u32) -> u32 {
        let Some(held) = self.goods.get_mut(&good) else {
            return 0;
        };
        let removed = amnt.min(*held);
        *held -= removed;
        if *held == 0 {
            self.goods.remove(&good);
        }
        removed
    }

    // Everything in the hold that a merchant would put on the scales,
    // provisions excluded
    pub fn tradeable(&self) -> Vec<(Good, u32)> {
        self.goods
            .iter()
            .filter(|(good, qty)| !good.is_supply() && **qty > 0)
            .map(|(good, qty)| (*good, *qty))
            .collect()
    }

    pub fn has_tradeable(&self) -> bool {
        !self.tradeable().is_empty()
    }
}

#[test]
fn test_cargo_overflow() {
    let mut cargo = CargoHold::default();
    let added = cargo.add(Good::Tea, 95, 100);
    assert_eq!(added, 95);

    let added = cargo.add(Good::Tea, 10, 100);
    assert_eq!(added, 5);
    assert_eq!(cargo.used(), 100);
    assert_eq!(cargo.space_left(100), 0);
}

#[test]
fn test_cargo_remove_clamps() {
    let mut cargo = CargoHold::default();
    cargo.add(Good::Silk, 12, 100);
    assert_eq!(cargo.remove(Good::Silk, 20), 12);
    assert_eq!(cargo.remove(Good::Silk, 1), 0);
    assert!(cargo.goods.is_empty());
}

#[test]
fn test_tradeable_skips_provisions() {
    let mut cargo = CargoHold::default();
    cargo.add(Good::Food, 30, 100);
    cargo.add(Good::Water, 30, 100);
    assert!(!cargo.has_tradeable());
    cargo.add(Good::Wine, 5, 100);
    assert_eq!(cargo.tradeable(), vec![(Good::Wine, 5)]);
}
