use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::autopilot::{Autopilot, AutopilotPhase, AutopilotReport};
use crate::errors::Errcode;
use crate::events::{EventLog, GameEvent};
use crate::inventory::PortInventory;
use crate::market::{Good, Market};
use crate::planner::{self, GoodProspect, TradeDecision};
use crate::player::PlayerState;
use crate::port::Port;
use crate::trade::{self, SupplyPurchase, TradeOutcome};
use crate::voyage::{self, Day, SupplyCheck, Voyage};

// The whole game behind one handle. Manual commands go through the
// helm lock: while the autopilot is engaged they are refused, the
// only exceptions being stop_autopilot and the voyage-arrival signal.
pub struct Game {
    pub player: PlayerState,
    pub market: Market,
    pub stocks: PortInventory,
    pub events: EventLog,
    pub voyage: Option<Voyage>,
    pub selected_destination: Option<Port>,
    pub autopilot: Option<Autopilot>,
    pub last_report: Option<AutopilotReport>,
    pub(crate) rng: StdRng,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct PriceQuote {
    pub buy: u32,
    pub sell: u32,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct DestinationSummary {
    pub port: Port,
    pub days: Day,
    pub check: SupplyCheck,
    pub shortfall_cost: u32,
    pub affordable: bool,
}

impl Game {
    pub fn init(seed: u64) -> Game {
        let mut rng = StdRng::seed_from_u64(seed);
        let market = Market::init(&mut rng);
        log::debug!("New game with seed {seed}");
        Game {
            player: PlayerState::init(),
            market,
            stocks: PortInventory::init(),
            events: EventLog::new(),
            voyage: None,
            selected_destination: None,
            autopilot: None,
            last_report: None,
            rng,
        }
    }

    fn ensure_helm(&self) -> Result<(), Errcode> {
        if self.autopilot.is_some() {
            return Err(Errcode::AutopilotEngaged);
        }
        Ok(())
    }

    fn ensure_docked(&self) -> Result<(), Errcode> {
        if self.voyage.is_some() {
            return Err(Errcode::VoyageUnderway);
        }
        Ok(())
    }

    pub fn buy(&mut self, good: Good, amnt: u32) -> Result<TradeOutcome, Errcode> {
        self.ensure_helm()?;
        self.ensure_docked()?;
        Ok(trade::buy_good(
            &mut self.player,
            &mut self.stocks,
            &self.market,
            &mut self.events,
            good,
            amnt,
        ))
    }

    pub fn buy_all(&mut self, good: Good) -> Result<TradeOutcome, Errcode> {
        self.buy(good, u32::MAX)
    }

    pub fn sell(&mut self, good: Good, amnt: u32) -> Result<TradeOutcome, Errcode> {
        self.ensure_helm()?;
        self.ensure_docked()?;
        Ok(trade::sell_good(
            &mut self.player,
            &self.market,
            &mut self.events,
            good,
            amnt,
        ))
    }

    pub fn sell_all(&mut self, good: Good) -> Result<TradeOutcome, Errcode> {
        self.sell(good, u32::MAX)
    }

    pub fn upgrade_ship(&mut self, tier: usize) -> Result<(), Errcode> {
        self.ensure_helm()?;
        self.ensure_docked()?;
        let ship = self.player.upgrade_ship(tier)?;
        let evt = GameEvent::ShipUpgraded {
            name: ship.name.clone(),
            capacity: ship.capacity,
        };
        self.events.push(self.player.day, evt);
        Ok(())
    }

    pub fn select_destination(&mut self, port: Port) -> Result<Day, Errcode> {
        self.ensure_helm()?;
        self.ensure_docked()?;
        if port == self.player.port {
            return Err(Errcode::AlreadyInPort(port));
        }
        let days = voyage::travel_days(self.player.port, port, self.player.ship.speed);
        self.selected_destination = Some(port);
        log::debug!("Destination set to {port:?}, {days} days of sailing");
        Ok(days)
    }

    pub fn cancel_destination(&mut self) {
        self.selected_destination = None;
    }

    // Buys whatever provisions are still missing for the crossing to
    // the selected destination
    pub fn stock_supplies(&mut self) -> Result<SupplyPurchase, Errcode> {
        self.ensure_helm()?;
        self.ensure_docked()?;
        let Some(dest) = self.selected_destination else {
            return Err(Errcode::NoDestinationSelected);
        };
        let days = voyage::travel_days(self.player.port, dest, self.player.ship.speed);
        Ok(trade::buy_supplies_for(
            &mut self.player,
            &mut self.stocks,
            &self.market,
            &mut self.events,
            days,
        ))
    }

    // Weigh anchor towards the selected destination. Refuses to sail
    // without full rations aboard, the sea is not forgiving.
    pub fn start_voyage(&mut self) -> Result<&Voyage, Errcode> {
        self.ensure_helm()?;
        self.ensure_docked()?;
        let Some(dest) = self.selected_destination else {
            return Err(Errcode::NoDestinationSelected);
        };
        let days = voyage::travel_days(self.player.port, dest, self.player.ship.speed);
        let check = voyage::supply_check(&self.player.cargo, self.player.ship.crew, days);
        if !check.has_enough() {
            return Err(Errcode::NotEnoughSupplies(
                check.missing.food,
                check.missing.water,
            ));
        }
        self.depart(dest, days);
        self.voyage.as_ref().ok_or(Errcode::NoVoyageUnderway)
    }

    // Arrival signal, valid in both manual and autopilot mode. The
    // crossing consumes rations when the ship moors, short rations
    // never sink the ship, they just empty the barrels.
    pub fn complete_voyage(&mut self) -> Result<Port, Errcode> {
        let Some(v) = self.voyage.take() else {
            return Err(Errcode::NoVoyageUnderway);
        };
        let starved =
            voyage::consume_supplies(&mut self.player.cargo, self.player.ship.crew, v.days);
        self.player.port = v.to;
        self.advance_days(v.days);
        self.events.push(
            self.player.day,
            GameEvent::VoyageCompleted {
                from: v.from,
                to: v.to,
                days: v.days,
            },
        );
        if !starved.is_empty() {
            log::warn!(
                "Rations ran dry on the crossing to {:?}, short {} food and {} water",
                v.to,
                starved.food,
                starved.water
            );
            self.events.push(
                self.player.day,
                GameEvent::SupplyShortfall {
                    food: starved.food,
                    water: starved.water,
                },
            );
        }
        if let Some(ap) = self.autopilot.as_mut() {
            if ap.phase == AutopilotPhase::Voyaging {
                ap.phase = AutopilotPhase::Planning;
            }
        }
        log::info!("Moored at {:?} after {} days at sea", v.to, v.days);
        Ok(v.to)
    }

    // A day in harbour doing nothing: stocks refill, prices move
    pub fn rest(&mut self) -> Result<(), Errcode> {
        self.ensure_helm()?;
        self.ensure_docked()?;
        self.advance_days(1);
        Ok(())
    }

    pub(crate) fn depart(&mut self, to: Port, days: Day) {
        let from = self.player.port;
        self.voyage = Some(Voyage {
            from,
            to,
            days,
            departed_day: self.player.day,
        });
        self.selected_destination = None;
        self.events.push(
            self.player.day,
            GameEvent::VoyageStarted { from, to, days },
        );
        log::info!("Set sail {from:?} -> {to:?}, {days} days");
    }

    pub(crate) fn advance_days(&mut self, days: Day) {
        if days == 0 {
            return;
        }
        self.player.day += days;
        self.stocks.refresh(days);
        self.market.reroll_factors(&mut self.rng);
    }

    pub fn quote(&self, good: Good) -> PriceQuote {
        PriceQuote {
            buy: self.market.buy_price(self.player.port, good),
            sell: self.market.sell_price(self.player.port, good),
        }
    }

    pub fn stock_of(&self, port: Port, good: Good) -> u32 {
        self.stocks.stock_of(port, good)
    }

    pub fn profitable_goods(&self, dest: Port) -> Vec<GoodProspect> {
        planner::profitable_goods(&self.player, &self.market, &self.stocks, dest)
    }

    // What the first mate would do right now, without doing it
    pub fn suggest_trade(&self) -> Option<TradeDecision> {
        planner::find_best_trade(&self.player, &self.market, &self.stocks)
    }

    pub fn destination_summary(&self, port: Port) -> Result<DestinationSummary, Errcode> {
        if port == self.player.port {
            return Err(Errcode::AlreadyInPort(port));
        }
        let days = voyage::travel_days(self.player.port, port, self.player.ship.speed);
        let check = voyage::supply_check(&self.player.cargo, self.player.ship.crew, days);
        let shortfall_cost = voyage::supply_cost(&self.market, self.player.port, &check.missing);
        Ok(DestinationSummary {
            port,
            days,
            check,
            shortfall_cost,
            affordable: self.player.gold >= shortfall_cost,
        })
    }
}

#[test]
fn test_manual_voyage_cycle() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut game = Game::init(3);
    assert!(matches!(
        game.start_voyage(),
        Err(Errcode::NoDestinationSelected)
    ));
    assert!(matches!(
        game.select_destination(Port::Lisbon),
        Err(Errcode::AlreadyInPort(Port::Lisbon))
    ));

    // Two days to Seville, 20 crew want 3 food and 3 water
    assert_eq!(game.select_destination(Port::Seville).unwrap(), 2);
    assert!(matches!(
        game.start_voyage(),
        Err(Errcode::NotEnoughSupplies(3, 3))
    ));

    // Thinking better of it clears the selection
    game.cancel_destination();
    assert!(matches!(
        game.start_voyage(),
        Err(Errcode::NoDestinationSelected)
    ));
    game.select_destination(Port::Seville).unwrap();

    let purchase = game.stock_supplies().unwrap();
    assert!(purchase.satisfied);
    let voyage = game.start_voyage().unwrap();
    assert_eq!(voyage.to, Port::Seville);
    assert_eq!(voyage.days, 2);

    // At sea nothing can be done but waiting for the landfall signal
    assert!(matches!(game.buy(Good::Wine, 1), Err(Errcode::VoyageUnderway)));
    assert!(matches!(game.rest(), Err(Errcode::VoyageUnderway)));
    assert!(matches!(
        game.select_destination(Port::Goa),
        Err(Errcode::VoyageUnderway)
    ));

    assert_eq!(game.complete_voyage().unwrap(), Port::Seville);
    assert_eq!(game.player.port, Port::Seville);
    assert_eq!(game.player.day, 2);
    // The crossing ate the rations to the last crumb
    assert_eq!(game.player.cargo.quantity_of(Good::Food), 0);
    assert_eq!(game.player.cargo.quantity_of(Good::Water), 0);
    assert!(game.voyage.is_none());
    assert!(game.selected_destination.is_none());
}

#[test]
fn test_helm_locked_while_autopilot_runs() {
    let mut game = Game::init(8);
    game.start_autopilot(60.0, 0.0).unwrap();

    assert!(matches!(
        game.buy(Good::Wine, 1),
        Err(Errcode::AutopilotEngaged)
    ));
    assert!(matches!(
        game.sell_all(Good::Wine),
        Err(Errcode::AutopilotEngaged)
    ));
    assert!(matches!(
        game.select_destination(Port::Goa),
        Err(Errcode::AutopilotEngaged)
    ));
    assert!(matches!(game.rest(), Err(Errcode::AutopilotEngaged)));
    assert!(matches!(
        game.upgrade_ship(1),
        Err(Errcode::AutopilotEngaged)
    ));
    // The arrival signal stays open, there is just no voyage yet
    assert!(matches!(
        game.complete_voyage(),
        Err(Errcode::NoVoyageUnderway)
    ));

    game.stop_autopilot().unwrap();
    game.autopilot_tick(0.0);
    assert!(game.buy(Good::Wine, 1).is_ok());
}

#[test]
fn test_port_stock_drains_and_recovers() {
    let mut game = Game::init(15);
    game.player.port = Port::Nagasaki;
    game.player.gold = 5000;

    // Nagasaki is a small port, 30 spices on the quay
    let tx = game.buy_all(Good::Spices).unwrap();
    assert_eq!(tx.quantity, 30);
    assert_eq!(game.stock_of(Port::Nagasaki, Good::Spices), 0);

    let tx = game.buy(Good::Spices, 1).unwrap();
    assert_eq!(tx.quantity, 0);

    // Five quiet days refill three units each
    for _ in 0..5 {
        game.rest().unwrap();
    }
    assert_eq!(game.player.day, 5);
    assert_eq!(game.stock_of(Port::Nagasaki, Good::Spices), 15);
}

#[cfg(test)]
fn all_buy_prices(market: &Market) -> Vec<u32> {
    use strum::IntoEnumIterator;
    let mut prices = vec![];
    for port in Port::iter() {
        for good in Good::iter() {
            prices.push(market.buy_price(port, good));
        }
    }
    prices
}

#[test]
fn test_rest_rolls_prices() {
    let mut game = Game::init(23);
    let before = all_buy_prices(&game.market);
    game.rest().unwrap();
    assert_eq!(game.player.day, 1);
    assert_ne!(before, all_buy_prices(&game.market));
}

#[test]
fn test_upgrade_emits_event() {
    let mut game = Game::init(2);
    game.player.gold = 6000;
    game.upgrade_ship(1).unwrap();
    assert_eq!(game.player.ship.name, "Carrack");
    assert_eq!(game.player.gold, 1000);
    let drained = game.events.drain();
    assert!(drained
        .iter()
        .any(|(_, evt)| matches!(evt, GameEvent::ShipUpgraded { capacity: 180, .. })));
}

#[test]
fn test_destination_summary() {
    let mut game = Game::init(31);
    let summary = game.destination_summary(Port::Seville).unwrap();
    assert_eq!(summary.days, 2);
    assert_eq!(summary.check.missing.food, 3);
    assert!(summary.affordable);
    assert!(game.destination_summary(Port::Lisbon).is_err());

    game.player.gold = 0;
    let summary = game.destination_summary(Port::Goa).unwrap();
    assert!(!summary.affordable);
    assert!(summary.shortfall_cost > 0);
}
