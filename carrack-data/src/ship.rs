use serde::{Deserialize, Serialize};

pub mod cargo;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShipClass {
    pub name: &'static str,
    pub capacity: u32,
    pub speed: f64,
    pub crew: u32,
    pub cost: u32,
}

// Hulls available at the shipwright, in upgrade order. The first one
// is what every new player sails out with.
pub const SHIP_TIERS: [ShipClass; 4] = [
    ShipClass {
        name: "Caravel",
        capacity: 100,
        speed: 1.0,
        crew: 20,
        cost: 0,
    },
    ShipClass {
        name: "Carrack",
        capacity: 180,
        speed: 1.2,
        crew: 35,
        cost: 5000,
    },
    ShipClass {
        name: "Galleon",
        capacity: 320,
        speed: 1.4,
        crew: 60,
        cost: 15000,
    },
    ShipClass {
        name: "East Indiaman",
        capacity: 500,
        speed: 1.6,
        crew: 90,
        cost: 40000,
    },
];

pub fn find_class(name: &str) -> Option<&'static ShipClass> {
    SHIP_TIERS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ship {
    pub name: String,
    pub capacity: u32,
    pub speed: f64,
    pub crew: u32,
    pub cost: u32,
}

impl Ship {
    pub fn starting() -> Ship {
        Ship::of_class(&SHIP_TIERS[0])
    }

    pub fn of_class(class: &ShipClass) -> Ship {
        Ship {
            name: class.name.to_string(),
            capacity: class.capacity,
            speed: class.speed,
            crew: class.crew,
            cost: class.cost,
        }
    }

    pub fn tier(&self) -> Option<usize> {
        SHIP_TIERS
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(&self.name))
    }
}

#[test]
fn test_tiers_strictly_improve() {
    for pair in SHIP_TIERS.windows(2) {
        assert!(pair[1].capacity > pair[0].capacity);
        assert!(pair[1].speed > pair[0].speed);
        assert!(pair[1].crew > pair[0].crew);
        assert!(pair[1].cost > pair[0].cost);
    }
}

#[test]
fn test_find_class() {
    assert_eq!(find_class("galleon"), Some(&SHIP_TIERS[2]));
    assert_eq!(find_class("East Indiaman"), Some(&SHIP_TIERS[3]));
    assert_eq!(find_class("Flying Dutchman"), None);
    assert_eq!(Ship::starting().tier(), Some(0));
}
