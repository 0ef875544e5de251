use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::Errcode;
use crate::events::{GameEvent, TradeAction};
use crate::game::Game;
use crate::market::Good;
use crate::planner::{self, TradeDecision, VoyagePlan};
use crate::player::Gold;
use crate::port::Port;
use crate::trade::{self, TradeOutcome};
use crate::voyage::Day;

// Pacing of the live tick loop, what the driver is told to wait
const ACT_DELAY: Duration = Duration::from_millis(1500);
const IDLE_DELAY: Duration = Duration::from_millis(4000);

// How much simulated wall time one tick stands for during an offline
// catch-up, in minutes
const SIM_ACT_MINUTES: f64 = 0.2;
const SIM_IDLE_MINUTES: f64 = 1.0;

// Hard ceiling on catch-up work for a single restore
const OFFLINE_ITER_CAP: u32 = 10_000;

// When port stock limits a purchase and sits under this fraction of
// what the plan still wants, wait in harbour for the warehouses
const STOCK_WAIT_RATIO: f64 = 60.0 / 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutopilotPhase {
    Planning,
    Selling,
    BuyingSupplies,
    BuyingGoods,
    Departing,
    Voyaging,
}

// The first mate sailing the ship on their own. Exists only while
// engaged, stopping hands the helm back by dropping it.
#[derive(Clone, Debug)]
pub struct Autopilot {
    pub phase: AutopilotPhase,
    pub plan: Option<VoyagePlan>,
    pub started_minutes: f64,
    pub duration_minutes: f64,
    pub stop_requested: bool,
    pub report: AutopilotReport,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRecord {
    pub day: Day,
    pub port: Port,
    pub action: TradeAction,
    pub good: Good,
    pub quantity: u32,
    pub unit_price: u32,
    pub total: u32,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoyageLeg {
    pub from: Port,
    pub to: Port,
    pub days: Day,
}

// Running tally of an autopilot engagement, kept for the player to
// read after the helm is handed back
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotReport {
    pub start_gold: Gold,
    pub start_day: Day,
    pub end_gold: Gold,
    pub end_day: Day,
    pub profit: i64,
    pub days_run: Day,
    pub trades: Vec<TradeRecord>,
    pub voyages: Vec<VoyageLeg>,
}

impl AutopilotReport {
    pub fn begin(gold: Gold, day: Day) -> AutopilotReport {
        AutopilotReport {
            start_gold: gold,
            start_day: day,
            end_gold: gold,
            end_day: day,
            ..Default::default()
        }
    }

    pub fn finish(&mut self, gold: Gold, day: Day) {
        self.end_gold = gold;
        self.end_day = day;
        self.profit = gold as i64 - self.start_gold as i64;
        self.days_run = day.saturating_sub(self.start_day);
    }
}

// What a driver gets back from one tick: whether anything moved, and
// how long to wait before calling again
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Acted { next_delay: Duration },
    Idle { next_delay: Duration },
    Stopped,
}

#[derive(Clone, Copy, Debug)]
pub struct OfflineSummary {
    pub iterations: u32,
    pub minutes: f64,
    pub ended: bool,
    pub capped: bool,
}

enum StepResult {
    Acted,
    Blocked,
    AtSea,
}

impl Game {
    pub fn start_autopilot(
        &mut self,
        duration_minutes: f64,
        now_minutes: f64,
    ) -> Result<(), Errcode> {
        if !duration_minutes.is_finite() || duration_minutes <= 0.0 {
            return Err(Errcode::InvalidArgument("duration_minutes"));
        }
        if self.autopilot.is_some() {
            return Err(Errcode::AutopilotEngaged);
        }
        if self.voyage.is_some() {
            return Err(Errcode::VoyageUnderway);
        }
        self.autopilot = Some(Autopilot {
            phase: AutopilotPhase::Planning,
            plan: None,
            started_minutes: now_minutes,
            duration_minutes,
            stop_requested: false,
            report: AutopilotReport::begin(self.player.gold, self.player.day),
        });
        self.events.push(
            self.player.day,
            GameEvent::AutopilotEngaged {
                minutes: duration_minutes,
            },
        );
        log::info!("Autopilot engaged for {duration_minutes:.0} minutes");
        Ok(())
    }

    // Cooperative: raises a flag the next tick acts on
    pub fn stop_autopilot(&mut self) -> Result<(), Errcode> {
        let Some(ap) = self.autopilot.as_mut() else {
            return Err(Errcode::AutopilotIdle);
        };
        ap.stop_requested = true;
        log::info!("Autopilot stop requested");
        Ok(())
    }

    pub fn autopilot_active(&self) -> bool {
        self.autopilot.is_some()
    }

    // One decision of the first mate. The caller owns the clock and
    // passes the current time in minutes on whatever scale was used
    // for start_autopilot.
    pub fn autopilot_tick(&mut self, now_minutes: f64) -> TickOutcome {
        let Some(mut ap) = self.autopilot.take() else {
            return TickOutcome::Stopped;
        };
        let elapsed = now_minutes - ap.started_minutes;
        if ap.stop_requested || elapsed >= ap.duration_minutes {
            self.finalize_autopilot(ap);
            return TickOutcome::Stopped;
        }

        let outcome = match self.autopilot_step(&mut ap) {
            StepResult::Acted => TickOutcome::Acted {
                next_delay: ACT_DELAY,
            },
            StepResult::Blocked => {
                // Nothing doable today, let a day pass in harbour so
                // prices and stocks move
                self.advance_days(1);
                TickOutcome::Idle {
                    next_delay: IDLE_DELAY,
                }
            }
            StepResult::AtSea => TickOutcome::Idle {
                next_delay: IDLE_DELAY,
            },
        };
        self.autopilot = Some(ap);
        outcome
    }

    // Replays the time the game spent closed, collapsing voyages
    // instantly and charging each tick a fixed slice of simulated
    // wall time. Events stay muted except the final stop.
    pub fn run_offline(&mut self, from_minutes: f64, to_minutes: f64) -> OfflineSummary {
        let mut summary = OfflineSummary {
            iterations: 0,
            minutes: 0.0,
            ended: self.autopilot.is_none(),
            capped: false,
        };
        if self.autopilot.is_none() || to_minutes <= from_minutes {
            return summary;
        }

        let was_muted = self.events.muted;
        self.events.muted = true;
        let mut now = from_minutes;
        while self.autopilot.is_some() && now < to_minutes {
            if summary.iterations >= OFFLINE_ITER_CAP {
                log::warn!(
                    "Offline catch-up capped at {OFFLINE_ITER_CAP} iterations, {:.1} minutes replayed",
                    now - from_minutes
                );
                summary.capped = true;
                break;
            }
            summary.iterations += 1;
            if self.voyage.is_some() {
                let _ = self.complete_voyage();
            }
            match self.autopilot_tick(now) {
                TickOutcome::Acted { .. } => now += SIM_ACT_MINUTES,
                TickOutcome::Idle { .. } => now += SIM_IDLE_MINUTES,
                TickOutcome::Stopped => break,
            }
        }
        self.events.muted = was_muted;
        summary.minutes = now - from_minutes;
        summary.ended = self.autopilot.is_none();
        summary
    }

    fn autopilot_step(&mut self, ap: &mut Autopilot) -> StepResult {
        match ap.phase {
            AutopilotPhase::Planning => self.step_planning(ap),
            AutopilotPhase::Selling => self.step_selling(ap),
            AutopilotPhase::BuyingSupplies => self.step_buying_supplies(ap),
            AutopilotPhase::BuyingGoods => self.step_buying_goods(ap),
            AutopilotPhase::Departing => self.step_departing(ap),
            AutopilotPhase::Voyaging => {
                if self.voyage.is_some() {
                    StepResult::AtSea
                } else {
                    ap.phase = AutopilotPhase::Planning;
                    StepResult::Acted
                }
            }
        }
    }

    fn step_planning(&mut self, ap: &mut Autopilot) -> StepResult {
        if self.player.cargo.has_tradeable() {
            ap.phase = AutopilotPhase::Selling;
            return StepResult::Acted;
        }
        match planner::find_best_trade(&self.player, &self.market, &self.stocks) {
            Some(TradeDecision::Buy(plan)) => {
                self.events.push(
                    self.player.day,
                    GameEvent::PlanFormed {
                        destination: plan.destination,
                        expected_profit: plan.expected_profit,
                    },
                );
                log::info!(
                    "Charted a run {:?} -> {:?} worth {} gold",
                    self.player.port,
                    plan.destination,
                    plan.expected_profit
                );
                ap.plan = Some(plan);
                ap.phase = AutopilotPhase::BuyingSupplies;
                StepResult::Acted
            }
            Some(_) => {
                ap.phase = AutopilotPhase::Selling;
                StepResult::Acted
            }
            None => {
                log::debug!("No run worth chartering today, waiting for the market to turn");
                StepResult::Blocked
            }
        }
    }

    fn step_selling(&mut self, ap: &mut Autopilot) -> StepResult {
        let dest = planner::best_selling_port(&self.player, &self.market);
        if dest == self.player.port {
            let day = self.player.day;
            let port = self.player.port;
            for (good, _) in self.player.cargo.tradeable() {
                let tx =
                    trade::sell_all_good(&mut self.player, &self.market, &mut self.events, good);
                Self::record_trade(&mut ap.report, day, port, &tx);
            }
            ap.phase = AutopilotPhase::Planning;
            return StepResult::Acted;
        }

        log::info!("The hold sells better at {dest:?}, provisioning the crossing");
        ap.plan = Some(planner::relocation_plan(&self.player, &self.market, dest));
        ap.phase = AutopilotPhase::BuyingSupplies;
        StepResult::Acted
    }

    fn step_buying_supplies(&mut self, ap: &mut Autopilot) -> StepResult {
        let Some(plan) = ap.plan.as_ref() else {
            ap.phase = AutopilotPhase::Planning;
            return StepResult::Acted;
        };
        let days = plan.travel_days;
        let day = self.player.day;
        let port = self.player.port;
        let purchase = trade::buy_supplies_for(
            &mut self.player,
            &mut self.stocks,
            &self.market,
            &mut self.events,
            days,
        );
        if let Some(tx) = purchase.food {
            Self::record_trade(&mut ap.report, day, port, &tx);
        }
        if let Some(tx) = purchase.water {
            Self::record_trade(&mut ap.report, day, port, &tx);
        }
        if purchase.satisfied {
            ap.phase = AutopilotPhase::BuyingGoods;
            return StepResult::Acted;
        }
        if purchase.bought_any() {
            // Partial fill, the rest on a later tick
            return StepResult::Acted;
        }
        log::debug!("Cannot provision at {port:?} today, waiting in harbour");
        StepResult::Blocked
    }

    fn step_buying_goods(&mut self, ap: &mut Autopilot) -> StepResult {
        let Some(plan) = ap.plan.as_mut() else {
            ap.phase = AutopilotPhase::Planning;
            return StepResult::Acted;
        };
        if plan.fully_bought() {
            ap.phase = AutopilotPhase::Departing;
            return StepResult::Acted;
        }
        let free = self.player.cargo.space_left(self.player.ship.capacity);
        if free < planner::MIN_FREE_HOLD {
            log::debug!("Hold nearly full ({free} units left), departing early");
            ap.phase = AutopilotPhase::Departing;
            return StepResult::Acted;
        }

        let Some(line_idx) = plan.goods.iter().position(|line| line.remaining() > 0) else {
            ap.phase = AutopilotPhase::Departing;
            return StepResult::Acted;
        };
        let (good, remaining) = {
            let line = &plan.goods[line_idx];
            (line.good, line.remaining())
        };

        let stock = self.stocks.stock_of(self.player.port, good);
        let affordable = self.player.gold / self.market.buy_price(self.player.port, good);
        let wait_floor = (remaining as f64 * STOCK_WAIT_RATIO).ceil() as u32;
        if stock < wait_floor && stock < affordable {
            log::debug!("Only {stock} {good:?} ashore, waiting for the warehouses to fill");
            return StepResult::Blocked;
        }

        let day = self.player.day;
        let port = self.player.port;
        let tx = trade::buy_good(
            &mut self.player,
            &mut self.stocks,
            &self.market,
            &mut self.events,
            good,
            remaining,
        );
        if tx.quantity == 0 {
            // Gold or space ran out for this line, write it off
            let line = &mut plan.goods[line_idx];
            line.quantity = line.bought;
            if plan.total_bought() == 0 && plan.fully_bought() {
                log::info!(
                    "Abandoning the run to {:?}, nothing could be bought",
                    plan.destination
                );
                ap.plan = None;
                ap.phase = AutopilotPhase::Planning;
                return StepResult::Blocked;
            }
            return StepResult::Acted;
        }
        plan.goods[line_idx].bought += tx.quantity;
        Self::record_trade(&mut ap.report, day, port, &tx);
        StepResult::Acted
    }

    fn step_departing(&mut self, ap: &mut Autopilot) -> StepResult {
        let Some(plan) = ap.plan.take() else {
            ap.phase = AutopilotPhase::Planning;
            return StepResult::Acted;
        };
        if !plan.goods.is_empty() && plan.total_bought() == 0 {
            log::info!(
                "Nothing of the plan could be bought, staying at {:?}",
                self.player.port
            );
            ap.phase = AutopilotPhase::Planning;
            return StepResult::Blocked;
        }
        let from = self.player.port;
        self.depart(plan.destination, plan.travel_days);
        ap.report.voyages.push(VoyageLeg {
            from,
            to: plan.destination,
            days: plan.travel_days,
        });
        ap.phase = AutopilotPhase::Voyaging;
        StepResult::Acted
    }

    // Sells whatever is left in the hold (unless still at sea), seals
    // the report and hands the helm back
    fn finalize_autopilot(&mut self, mut ap: Autopilot) {
        if self.voyage.is_none() {
            let day = self.player.day;
            let port = self.player.port;
            for (good, _) in self.player.cargo.tradeable() {
                let tx =
                    trade::sell_all_good(&mut self.player, &self.market, &mut self.events, good);
                Self::record_trade(&mut ap.report, day, port, &tx);
            }
        }
        ap.report.finish(self.player.gold, self.player.day);
        self.events.force_push(
            self.player.day,
            GameEvent::AutopilotStopped {
                profit: ap.report.profit,
                days: ap.report.days_run,
            },
        );
        log::info!(
            "Autopilot disengaged: {} gold over {} days, {} trades",
            ap.report.profit,
            ap.report.days_run,
            ap.report.trades.len()
        );
        self.last_report = Some(ap.report);
    }

    fn record_trade(report: &mut AutopilotReport, day: Day, port: Port, tx: &TradeOutcome) {
        if tx.quantity == 0 {
            return;
        }
        report.trades.push(TradeRecord {
            day,
            port,
            action: tx.action,
            good: tx.good,
            quantity: tx.quantity,
            unit_price: tx.unit_price,
            total: tx.total,
        });
    }
}

#[cfg(test)]
fn engaged_game(seed: u64, minutes: f64) -> Game {
    let mut game = Game::init(seed);
    game.start_autopilot(minutes, 0.0).unwrap();
    game
}

#[test]
fn test_start_and_stop_guards() {
    let mut game = Game::init(4);
    assert!(matches!(
        game.start_autopilot(0.0, 0.0),
        Err(Errcode::InvalidArgument(_))
    ));
    assert!(matches!(game.stop_autopilot(), Err(Errcode::AutopilotIdle)));

    game.start_autopilot(60.0, 0.0).unwrap();
    assert!(game.autopilot_active());
    assert!(matches!(
        game.start_autopilot(60.0, 0.0),
        Err(Errcode::AutopilotEngaged)
    ));

    game.stop_autopilot().unwrap();
    assert_eq!(game.autopilot_tick(0.0), TickOutcome::Stopped);
    assert!(!game.autopilot_active());
    assert!(game.last_report.is_some());
}

#[test]
fn test_first_ticks_plan_provision_load_depart() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut game = engaged_game(21, 60.0);

    // Planning: a fresh game always finds a first run
    assert_eq!(
        game.autopilot_tick(0.0),
        TickOutcome::Acted {
            next_delay: ACT_DELAY
        }
    );
    let (phase, days) = {
        let ap = game.autopilot.as_ref().unwrap();
        (ap.phase, ap.plan.as_ref().unwrap().travel_days)
    };
    assert_eq!(phase, AutopilotPhase::BuyingSupplies);

    // Provisions next, then cargo, then cast off
    for _ in 0..20 {
        if game.voyage.is_some() {
            break;
        }
        game.autopilot_tick(0.0);
    }
    let voyage = game.voyage.as_ref().expect("should have departed");
    assert_eq!(voyage.from, crate::player::STARTING_PORT);
    assert_eq!(voyage.days, days);
    assert_eq!(
        game.autopilot.as_ref().unwrap().phase,
        AutopilotPhase::Voyaging
    );
    assert!(crate::voyage::supply_check(&game.player.cargo, game.player.ship.crew, days).has_enough());
    assert!(game.player.cargo.has_tradeable());
    assert!(!game.autopilot.as_ref().unwrap().report.trades.is_empty());

    // At sea every tick idles without advancing the calendar
    let day = game.player.day;
    assert_eq!(
        game.autopilot_tick(0.0),
        TickOutcome::Idle {
            next_delay: IDLE_DELAY
        }
    );
    assert_eq!(game.player.day, day);
}

#[test]
fn test_blocked_tick_waits_a_day() {
    use strum::IntoEnumIterator;
    let mut game = engaged_game(9, 60.0);
    // Bare warehouses everywhere leave nothing to plan with
    for port in Port::iter() {
        for good in Good::iter() {
            game.stocks.reduce_stock(port, good, u32::MAX);
        }
    }
    assert_eq!(
        game.autopilot_tick(0.0),
        TickOutcome::Idle {
            next_delay: IDLE_DELAY
        }
    );
    assert_eq!(game.player.day, 1);
    // The idle day restocked every port at its own rate
    assert_eq!(game.stocks.stock_of(Port::Lisbon, Good::Wine), 8);
    assert_eq!(game.stocks.stock_of(Port::Nagasaki, Good::Wine), 3);
}

#[test]
fn test_thin_stock_waits_for_restock() {
    let mut game = Game::init(11);
    game.player.port = Port::Macau;
    game.player.gold = 5000;
    game.market = crate::market::Market::flat();
    let plan =
        planner::optimal_purchase_plan(&game.player, &game.market, &game.stocks, Port::Nagasaki)
            .unwrap();
    assert_eq!(plan.goods[0].quantity, 60);
    game.stocks.reduce_stock(Port::Macau, Good::Silk, 55);

    game.autopilot = Some(Autopilot {
        phase: AutopilotPhase::BuyingGoods,
        plan: Some(plan),
        started_minutes: 0.0,
        duration_minutes: 600.0,
        stop_requested: false,
        report: AutopilotReport::begin(game.player.gold, game.player.day),
    });

    // 5 silk ashore against 60 wanted: the mate waits while the
    // warehouse refills at 5 a day, up to the 60% watermark of 36
    let mut waited = 0;
    loop {
        match game.autopilot_tick(0.0) {
            TickOutcome::Idle { .. } => waited += 1,
            TickOutcome::Acted { .. } => break,
            TickOutcome::Stopped => panic!("should not stop"),
        }
        assert!(waited < 20, "waited too long");
    }
    assert_eq!(waited, 7);
    assert_eq!(game.player.day, 7);
    assert_eq!(game.player.cargo.quantity_of(Good::Silk), 40);
    let ap = game.autopilot.as_ref().unwrap();
    assert_eq!(ap.plan.as_ref().unwrap().goods[0].bought, 40);
    assert_eq!(ap.report.trades.len(), 1);
}

#[test]
fn test_offline_run_stops_on_timeout() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut game = engaged_game(42, 30.0);
    let summary = game.run_offline(0.0, 240.0);

    assert!(summary.ended);
    assert!(!summary.capped);
    assert!(summary.iterations > 0);
    assert!(!game.autopilot_active());
    assert!(game.voyage.is_none());

    let report = game.last_report.as_ref().unwrap();
    assert_eq!(report.end_gold, game.player.gold);
    assert_eq!(
        report.profit,
        game.player.gold as i64 - report.start_gold as i64
    );
    assert_eq!(report.days_run, game.player.day - report.start_day);
    assert!(!report.voyages.is_empty());

    // Every gold piece moved is accounted for in the trade ledger
    let ledger: i64 = report
        .trades
        .iter()
        .map(|tx| match tx.action {
            TradeAction::Sold => tx.total as i64,
            TradeAction::Bought => -(tx.total as i64),
        })
        .sum();
    assert_eq!(ledger, report.profit);

    // The hold was liquidated on the way out
    assert!(!game.player.cargo.has_tradeable());

    // The stop always surfaces, even through the catch-up mute
    let drained = game.events.drain();
    assert!(drained
        .iter()
        .any(|(_, evt)| matches!(evt, GameEvent::AutopilotStopped { .. })));
}

#[test]
fn test_offline_run_iteration_cap() {
    let mut game = engaged_game(5, 1e7);
    let summary = game.run_offline(0.0, 1e8);
    assert!(summary.capped);
    assert!(!summary.ended);
    assert_eq!(summary.iterations, OFFLINE_ITER_CAP);
    assert!(game.autopilot_active());
}

#[test]
fn test_stop_mid_voyage_keeps_the_hold() {
    let mut game = engaged_game(17, 600.0);
    for _ in 0..30 {
        if game.voyage.is_some() {
            break;
        }
        game.autopilot_tick(0.0);
    }
    assert!(game.voyage.is_some());
    assert!(game.player.cargo.has_tradeable());

    game.stop_autopilot().unwrap();
    assert_eq!(game.autopilot_tick(0.0), TickOutcome::Stopped);
    assert!(!game.autopilot_active());

    // Still at sea, nothing was liquidated
    assert!(game.voyage.is_some());
    assert!(game.player.cargo.has_tradeable());

    let to = game.voyage.as_ref().unwrap().to;
    let arrived = game.complete_voyage().unwrap();
    assert_eq!(arrived, to);
    assert_eq!(game.player.port, to);
}
