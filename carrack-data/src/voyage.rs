use serde::{Deserialize, Serialize};

use crate::market::{Good, Market};
use crate::port::Port;
use crate::ship::cargo::CargoHold;

pub type Day = u32;

// Daily ration per crew member, food and water each
pub const RATION_RATE: f64 = 0.07;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplies {
    pub food: u32,
    pub water: u32,
}

impl Supplies {
    pub fn is_empty(&self) -> bool {
        self.food == 0 && self.water == 0
    }

    pub fn total(&self) -> u32 {
        self.food + self.water
    }
}

pub fn travel_days(from: Port, to: Port, speed: f64) -> Day {
    let days = (from.distance_to(to) / speed).round() as Day;
    days.max(1)
}

// Rations the whole crew needs for a crossing, rounded up
pub fn required_supplies(crew: u32, days: Day) -> Supplies {
    let need = (crew as f64 * days as f64 * RATION_RATE).ceil() as u32;
    Supplies {
        food: need,
        water: need,
    }
}

pub fn supply_shortfall(cargo: &CargoHold, crew: u32, days: Day) -> Supplies {
    let need = required_supplies(crew, days);
    Supplies {
        food: need.food.saturating_sub(cargo.quantity_of(Good::Food)),
        water: need.water.saturating_sub(cargo.quantity_of(Good::Water)),
    }
}

// What topping up the missing rations would cost at local prices,
// rounded up to the next gold piece
pub fn supply_cost(market: &Market, port: Port, need: &Supplies) -> u32 {
    let food = need.food as f64 * market.buy_price(port, Good::Food) as f64;
    let water = need.water as f64 * market.buy_price(port, Good::Water) as f64;
    (food + water).ceil() as u32
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct SupplyCheck {
    pub required: Supplies,
    pub loaded: Supplies,
    pub missing: Supplies,
}

impl SupplyCheck {
    pub fn has_enough(&self) -> bool {
        self.missing.is_empty()
    }
}

pub fn supply_check(cargo: &CargoHold, crew: u32, days: Day) -> SupplyCheck {
    let required = required_supplies(crew, days);
    let loaded = Supplies {
        food: cargo.quantity_of(Good::Food),
        water: cargo.quantity_of(Good::Water),
    };
    SupplyCheck {
        required,
        loaded,
        missing: supply_shortfall(cargo, crew, days),
    }
}

// Crew eat through the hold during the crossing. Returns the rations
// that were missing when the barrels ran dry.
pub fn consume_supplies(cargo: &mut CargoHold, crew: u32, days: Day) -> Supplies {
    let need = required_supplies(crew, days);
    let food = cargo.remove(Good::Food, need.food);
    let water = cargo.remove(Good::Water, need.water);
    Supplies {
        food: need.food - food,
        water: need.water - water,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Voyage {
    pub from: Port,
    pub to: Port,
    pub days: Day,
    pub departed_day: Day,
}

#[test]
fn test_travel_days() {
    assert_eq!(travel_days(Port::Lisbon, Port::Seville, 1.0), 2);
    assert_eq!(travel_days(Port::Lisbon, Port::Seville, 1.6), 1);
    assert_eq!(travel_days(Port::Goa, Port::Malacca, 1.4), 5);
    assert_eq!(travel_days(Port::Lisbon, Port::Nagasaki, 1.0), 36);
    // Never less than one full day at sea
    assert_eq!(travel_days(Port::Lisbon, Port::Seville, 8.0), 1);
}

#[test]
fn test_required_supplies_rounds_up() {
    // 20 crew for 10 days lands a hair above 14.0 in floating point,
    // the ceil keeps the pantry on the safe side
    assert_eq!(required_supplies(20, 10).food, 15);
    assert_eq!(required_supplies(20, 5).water, 8);
    assert_eq!(required_supplies(0, 10), Supplies { food: 0, water: 0 });
}

#[test]
fn test_consume_supplies_floors() {
    let mut cargo = CargoHold::default();
    cargo.add(Good::Food, 10, 1000);
    cargo.add(Good::Water, 40, 1000);
    let starved = consume_supplies(&mut cargo, 20, 10);
    assert_eq!(starved, Supplies { food: 5, water: 0 });
    assert_eq!(cargo.quantity_of(Good::Food), 0);
    assert_eq!(cargo.quantity_of(Good::Water), 25);
}

#[test]
fn test_supply_check() {
    let mut cargo = CargoHold::default();
    cargo.add(Good::Food, 3, 1000);
    let check = supply_check(&cargo, 20, 10);
    assert!(!check.has_enough());
    assert_eq!(check.required.food, 15);
    assert_eq!(check.loaded.food, 3);
    assert_eq!(check.missing, Supplies { food: 12, water: 15 });

    cargo.add(Good::Food, 12, 1000);
    cargo.add(Good::Water, 15, 1000);
    assert!(supply_check(&cargo, 20, 10).has_enough());
}
