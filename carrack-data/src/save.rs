use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::autopilot::{Autopilot, AutopilotPhase, AutopilotReport};
use crate::events::EventLog;
use crate::game::Game;
use crate::inventory::PortInventory;
use crate::market::{Good, Market};
use crate::player::{Gold, PlayerState};
use crate::port::Port;
use crate::ship::cargo::CargoHold;
use crate::ship::{self, Ship};
use crate::voyage::{Day, Voyage};

// Snapshot of a whole game, the shape that goes to disk. Daily price
// factors, the event ring and any half-built plan are transient and
// get rebuilt on restore, a snapshot taken at any moment resumes
// cleanly from what is here.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveState {
    pub gold: Gold,
    pub current_port: Port,
    #[serde(default)]
    pub inventory: BTreeMap<Good, u32>,
    pub ship: SavedShip,
    #[serde(default)]
    pub game_time: Day,
    #[serde(default)]
    pub port_inventory: BTreeMap<Port, BTreeMap<Good, u32>>,
    #[serde(default)]
    pub autopilot_active: bool,
    #[serde(default)]
    pub autopilot_start_time: f64,
    #[serde(default)]
    pub autopilot_duration_minutes: f64,
    #[serde(default)]
    pub autopilot_report: Option<AutopilotReport>,
    #[serde(default)]
    pub voyage: Option<SavedVoyage>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedShip {
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub crew: u32,
    #[serde(default)]
    pub cost: u32,
}

impl SavedShip {
    fn of(ship: &Ship) -> SavedShip {
        SavedShip {
            name: ship.name.clone(),
            capacity: ship.capacity,
            speed: ship.speed,
            crew: ship.crew,
            cost: ship.cost,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedVoyage {
    #[serde(default)]
    pub from: Option<Port>,
    #[serde(default)]
    pub to: Option<Port>,
    #[serde(default)]
    pub days: Option<Day>,
    #[serde(default)]
    pub departed_day: Option<Day>,
}

impl SavedVoyage {
    fn of(v: &Voyage) -> SavedVoyage {
        SavedVoyage {
            from: Some(v.from),
            to: Some(v.to),
            days: Some(v.days),
            departed_day: Some(v.departed_day),
        }
    }

    // A voyage missing any piece is dropped rather than guessed at
    fn validated(&self) -> Option<Voyage> {
        let from = self.from?;
        let to = self.to?;
        let days = self.days?;
        if from == to || days == 0 {
            return None;
        }
        Some(Voyage {
            from,
            to,
            days,
            departed_day: self.departed_day.unwrap_or(0),
        })
    }
}

impl SaveState {
    pub fn capture(game: &Game) -> SaveState {
        let (active, start, duration) = match &game.autopilot {
            Some(ap) => (true, ap.started_minutes, ap.duration_minutes),
            None => (false, 0.0, 0.0),
        };
        let report = match &game.autopilot {
            Some(ap) => Some(ap.report.clone()),
            None => game.last_report.clone(),
        };
        SaveState {
            gold: game.player.gold,
            current_port: game.player.port,
            inventory: game.player.cargo.goods.clone(),
            ship: SavedShip::of(&game.player.ship),
            game_time: game.player.day,
            port_inventory: game.stocks.stocks.clone(),
            autopilot_active: active,
            autopilot_start_time: start,
            autopilot_duration_minutes: duration,
            autopilot_report: report,
            voyage: game.voyage.as_ref().map(SavedVoyage::of),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> Result<SaveState, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// Ship stats are never trusted from disk. The name picks the class
// out of the current tables, only the crew count carries over as the
// player's own.
fn reconcile_ship(saved: &SavedShip) -> Ship {
    let Some(class) = ship::find_class(&saved.name) else {
        log::warn!(
            "Unknown ship {:?} in save, handing out a {} instead",
            saved.name,
            ship::SHIP_TIERS[0].name
        );
        return Ship::starting();
    };
    let mut restored = Ship::of_class(class);
    if saved.crew > 0 {
        restored.crew = saved.crew;
    }
    restored
}

impl Game {
    pub fn to_save(&self) -> SaveState {
        SaveState::capture(self)
    }

    pub fn restore(save: SaveState) -> Game {
        let mut rng = StdRng::seed_from_u64(rand::rng().random());
        let market = Market::init(&mut rng);

        let ship = reconcile_ship(&save.ship);
        let voyage = save.voyage.as_ref().and_then(SavedVoyage::validated);
        if save.voyage.is_some() && voyage.is_none() {
            log::warn!(
                "Voyage in the save was incomplete, the ship stays docked at {:?}",
                save.current_port
            );
        }

        let stocks = if save.port_inventory.is_empty() {
            PortInventory::init()
        } else {
            PortInventory {
                stocks: save.port_inventory,
            }
        };
        let player = PlayerState {
            gold: save.gold,
            port: save.current_port,
            cargo: CargoHold {
                goods: save.inventory,
            },
            ship,
            day: save.game_time,
        };
        if player.cargo.used() > player.ship.capacity {
            log::warn!(
                "Restored hold carries {} units for a capacity of {}",
                player.cargo.used(),
                player.ship.capacity
            );
        }

        let saved_report = save.autopilot_report;
        let autopilot = if save.autopilot_active {
            Some(Autopilot {
                phase: if voyage.is_some() {
                    AutopilotPhase::Voyaging
                } else {
                    AutopilotPhase::Planning
                },
                plan: None,
                started_minutes: save.autopilot_start_time,
                duration_minutes: save.autopilot_duration_minutes,
                stop_requested: false,
                report: saved_report
                    .clone()
                    .unwrap_or_else(|| AutopilotReport::begin(save.gold, save.game_time)),
            })
        } else {
            None
        };
        let last_report = if save.autopilot_active {
            None
        } else {
            saved_report
        };

        log::info!(
            "Game restored: day {}, {} gold, docked at {:?}",
            save.game_time,
            save.gold,
            save.current_port
        );
        Game {
            player,
            market,
            stocks,
            events: EventLog::new(),
            voyage,
            selected_destination: None,
            autopilot,
            last_report,
            rng,
        }
    }
}

#[test]
fn test_save_uses_legacy_key_shape() {
    let mut game = Game::init(6);
    game.buy(Good::Wine, 4).unwrap();
    let raw = game.to_save().to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

    for key in [
        "gold",
        "currentPort",
        "inventory",
        "ship",
        "gameTime",
        "portInventory",
        "autopilotActive",
        "autopilotStartTime",
        "autopilotDurationMinutes",
    ] {
        assert!(value.get(key).is_some(), "missing key {key}");
    }
    assert_eq!(value["currentPort"], "Lisbon");
    assert_eq!(value["inventory"]["Wine"], 4);
    assert_eq!(value["portInventory"]["Lisbon"]["Wine"], 96);
    assert_eq!(value["autopilotActive"], false);
}

#[test]
fn test_save_roundtrip() {
    let mut game = Game::init(12);
    game.player.gold = 8000;
    game.upgrade_ship(1).unwrap();
    game.buy(Good::Silk, 3).unwrap();
    game.rest().unwrap();
    game.select_destination(Port::Seville).unwrap();
    game.stock_supplies().unwrap();
    game.start_voyage().unwrap();

    let raw = game.to_save().to_json().unwrap();
    let restored = Game::restore(SaveState::from_json(&raw).unwrap());

    assert_eq!(restored.player.gold, game.player.gold);
    assert_eq!(restored.player.port, game.player.port);
    assert_eq!(restored.player.day, game.player.day);
    assert_eq!(restored.player.ship, game.player.ship);
    assert_eq!(restored.player.cargo.goods, game.player.cargo.goods);
    assert_eq!(
        restored.stocks.stock_of(Port::Lisbon, Good::Silk),
        game.stocks.stock_of(Port::Lisbon, Good::Silk)
    );

    let voyage = restored.voyage.as_ref().unwrap();
    assert_eq!(voyage.to, Port::Seville);
    assert_eq!(voyage.days, 2);
    assert!(!restored.autopilot_active());
}

#[test]
fn test_restore_repairs_broken_voyage() {
    let raw = r#"{
        "gold": 500,
        "currentPort": "Goa",
        "ship": { "name": "Carrack" },
        "voyage": { "from": "Goa", "days": 3 }
    }"#;
    let game = Game::restore(SaveState::from_json(raw).unwrap());
    assert!(game.voyage.is_none());
    assert_eq!(game.player.port, Port::Goa);
    assert_eq!(game.player.gold, 500);
    assert_eq!(game.player.day, 0);
    // Carrack stats come from the tables, crew included
    assert_eq!(game.player.ship.capacity, 180);
    assert_eq!(game.player.ship.crew, 35);
    // Absent portInventory starts the warehouses afresh
    assert_eq!(game.stocks.stock_of(Port::Goa, Good::Silk), 150);
}

#[test]
fn test_restore_reconciles_ship_by_name() {
    let raw = r#"{
        "gold": 100,
        "currentPort": "Lisbon",
        "ship": { "name": "Galleon", "capacity": 9999, "speed": 9.9, "crew": 55 }
    }"#;
    let game = Game::restore(SaveState::from_json(raw).unwrap());
    // Stats are re-read from the tables, only the crew carries over
    assert_eq!(game.player.ship.capacity, 320);
    assert_eq!(game.player.ship.speed, 1.4);
    assert_eq!(game.player.ship.crew, 55);

    let raw = r#"{
        "gold": 100,
        "currentPort": "Lisbon",
        "ship": { "name": "Flying Dutchman", "crew": 77 }
    }"#;
    let game = Game::restore(SaveState::from_json(raw).unwrap());
    assert_eq!(game.player.ship.name, "Caravel");
    assert_eq!(game.player.ship.crew, 20);
}

#[test]
fn test_restore_resumes_autopilot() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut game = Game::init(19);
    game.start_autopilot(120.0, 30.0).unwrap();
    let engaged_gold = game.player.gold;
    for _ in 0..3 {
        game.autopilot_tick(31.0);
    }

    let raw = game.to_save().to_json().unwrap();
    let mut restored = Game::restore(SaveState::from_json(&raw).unwrap());

    let ap = restored.autopilot.as_ref().unwrap();
    assert_eq!(ap.started_minutes, 30.0);
    assert_eq!(ap.duration_minutes, 120.0);
    assert_eq!(ap.phase, AutopilotPhase::Planning);
    assert!(ap.plan.is_none());
    assert_eq!(ap.report.start_gold, engaged_gold);

    // And it keeps sailing: catch up the stored window to its end
    let summary = restored.run_offline(31.0, 200.0);
    assert!(summary.ended);
    assert!(restored.last_report.is_some());
}

#[test]
fn test_from_json_rejects_garbage() {
    assert!(SaveState::from_json("not a save").is_err());
    assert!(SaveState::from_json("{\"gold\": 5}").is_err());
}
