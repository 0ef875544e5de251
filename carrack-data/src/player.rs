use serde::{Deserialize, Serialize};

use crate::errors::Errcode;
use crate::port::Port;
use crate::ship::cargo::CargoHold;
use crate::ship::{Ship, SHIP_TIERS};
use crate::voyage::Day;

pub type Gold = u32;

pub const INIT_GOLD: Gold = 1000;
pub const STARTING_PORT: Port = Port::Lisbon;

// Everything a single merchant owns, plus the calendar
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerState {
    pub gold: Gold,
    pub port: Port,
    pub cargo: CargoHold,
    pub ship: Ship,
    pub day: Day,
}

impl PlayerState {
    pub fn init() -> PlayerState {
        PlayerState {
            gold: INIT_GOLD,
            port: STARTING_PORT,
            cargo: CargoHold::default(),
            ship: Ship::starting(),
            day: 0,
        }
    }

    // Trade the current hull for a bigger one. The hold moves over
    // untouched, so the new ship must fit what we already carry.
    pub fn upgrade_ship(&mut self, tier: usize) -> Result<&Ship, Errcode> {
        let Some(class) = SHIP_TIERS.get(tier) else {
            return Err(Errcode::UnknownShipTier(tier));
        };
        if class.cost > self.gold {
            return Err(Errcode::NotEnoughGold(self.gold, class.cost));
        }
        if self.cargo.used() > class.capacity {
            return Err(Errcode::ShipTooSmall(self.cargo.used(), class.capacity));
        }
        self.gold -= class.cost;
        self.ship = Ship::of_class(class);
        log::info!(
            "Upgraded to a {} ({} hold, {} crew)",
            class.name,
            class.capacity,
            class.crew
        );
        Ok(&self.ship)
    }
}

#[test]
fn test_upgrade_ship() {
    let mut player = PlayerState::init();
    player.gold = 20000;
    player.upgrade_ship(2).unwrap();
    assert_eq!(player.ship.name, "Galleon");
    assert_eq!(player.gold, 5000);
}

#[test]
fn test_upgrade_rejected_leaves_state_alone() {
    let mut player = PlayerState::init();
    player.gold = 4000;

    // 4000 gold against a 5000 gold Carrack
    assert!(matches!(
        player.upgrade_ship(1),
        Err(Errcode::NotEnoughGold(4000, 5000))
    ));
    assert!(matches!(
        player.upgrade_ship(9),
        Err(Errcode::UnknownShipTier(9))
    ));
    assert_eq!(player.gold, 4000);
    assert_eq!(player.ship.name, "Caravel");
    assert!(player.cargo.goods.is_empty());
    assert_eq!(player.day, 0);
}

#[test]
fn test_upgrade_needs_room_for_cargo() {
    use crate::market::Good;
    let mut player = PlayerState::init();
    player.gold = 100000;
    player.upgrade_ship(3).unwrap();
    player.cargo.add(Good::Tea, 400, player.ship.capacity);

    // Hold carries 400 units, a Galleon only fits 320
    assert!(matches!(
        player.upgrade_ship(2),
        Err(Errcode::ShipTooSmall(400, 320))
    ));
    assert_eq!(player.ship.name, "East Indiaman");
}
