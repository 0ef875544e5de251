use serde::Serialize;
use strum::IntoEnumIterator;

use crate::inventory::PortInventory;
use crate::market::{Good, Market};
use crate::player::PlayerState;
use crate::port::Port;
use crate::voyage::{self, Day, Supplies};

// Gold never committed to cargo, the cushion that keeps a merchant
// solvent when a run goes sour
pub const SAFETY_RESERVE: u32 = 100;

// Of what remains, only this share of gold and hold space is spent on
// a single run
const COMMIT_RATIO: f64 = 90.0 / 100.0;

// Below this much free hold space a run is not worth provisioning
pub(crate) const MIN_FREE_HOLD: u32 = 10;

// Lots smaller than this are skipped during allocation
const MIN_LOT: u32 = 3;

// A plan has to promise at least this much gold to leave the harbour
const MIN_PLAN_PROFIT: i64 = 50;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct GoodProspect {
    pub good: Good,
    pub buy_price: u32,
    pub sell_price: u32,
    pub profit_per_unit: u32,
    pub profit_margin: f64,
    pub stock: u32,
}

// Goods worth hauling from the player's harbour to dest, best profit
// margin first. Provisions are never part of it, they are rations,
// not freight.
pub fn profitable_goods(
    player: &PlayerState,
    market: &Market,
    stocks: &PortInventory,
    dest: Port,
) -> Vec<GoodProspect> {
    let mut prospects = vec![];
    for good in Good::iter() {
        if good.is_supply() {
            continue;
        }
        let buy_price = market.buy_price(player.port, good);
        let sell_price = market.sell_price(dest, good);
        if sell_price <= buy_price {
            continue;
        }
        let profit_per_unit = sell_price - buy_price;
        prospects.push(GoodProspect {
            good,
            buy_price,
            sell_price,
            profit_per_unit,
            profit_margin: profit_per_unit as f64 / buy_price as f64 * 100.0,
            stock: stocks.stock_of(player.port, good),
        });
    }
    prospects.sort_by(|a, b| b.profit_margin.total_cmp(&a.profit_margin));
    prospects
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlannedGood {
    pub good: Good,
    pub quantity: u32,
    pub buy_price: u32,
    pub sell_price: u32,
    pub bought: u32,
}

impl PlannedGood {
    pub fn remaining(&self) -> u32 {
        self.quantity.saturating_sub(self.bought)
    }
}

// A provisioned shopping list for one run. An empty goods list is a
// plain relocation, sailing the hold somewhere it sells better.
#[derive(Clone, Debug)]
pub struct VoyagePlan {
    pub destination: Port,
    pub travel_days: Day,
    pub goods: Vec<PlannedGood>,
    pub required: Supplies,
    pub shortfall: Supplies,
    pub supply_cost: u32,
    pub expected_profit: i64,
}

impl VoyagePlan {
    pub fn total_bought(&self) -> u32 {
        self.goods.iter().map(|line| line.bought).sum()
    }

    pub fn fully_bought(&self) -> bool {
        self.goods.iter().all(|line| line.remaining() == 0)
    }
}

// Value of the tradeable part of the hold if sold at the given port,
// at today's quotes
pub fn cargo_sell_value(player: &PlayerState, market: &Market, port: Port) -> u32 {
    player
        .cargo
        .tradeable()
        .iter()
        .map(|(good, qty)| qty * market.sell_price(port, *good))
        .sum()
}

// Where the current hold fetches the most, net of the provisions the
// trip there would cost. Staying put wins unless sailing pays
// strictly better and the provisions are affordable.
pub fn best_selling_port(player: &PlayerState, market: &Market) -> Port {
    let here = player.port;
    let mut best = here;
    let mut best_net = cargo_sell_value(player, market, here) as i64;
    for port in Port::iter() {
        if port == here {
            continue;
        }
        let days = voyage::travel_days(here, port, player.ship.speed);
        let shortfall = voyage::supply_shortfall(&player.cargo, player.ship.crew, days);
        let cost = voyage::supply_cost(market, here, &shortfall);
        if player.gold < cost.saturating_add(SAFETY_RESERVE) {
            continue;
        }
        let net = cargo_sell_value(player, market, port) as i64 - cost as i64;
        if net > best_net {
            best = port;
            best_net = net;
        }
    }
    best
}

// Shopping list for a run to dest: provisions first, then a greedy
// walk over the goods by profit per unit, each lot as big as gold,
// hold space and port stock allow. Returns None when no worthwhile
// load can be put together.
pub fn optimal_purchase_plan(
    player: &PlayerState,
    market: &Market,
    stocks: &PortInventory,
    dest: Port,
) -> Option<VoyagePlan> {
    let travel_days = voyage::travel_days(player.port, dest, player.ship.speed);
    let required = voyage::required_supplies(player.ship.crew, travel_days);
    let shortfall = voyage::supply_shortfall(&player.cargo, player.ship.crew, travel_days);
    let supply_cost = voyage::supply_cost(market, player.port, &shortfall);

    let reserved = supply_cost.saturating_add(SAFETY_RESERVE);
    if player.gold <= reserved {
        log::debug!(
            "No run to {dest:?}: {} gold cannot cover {reserved} of provisions and reserve",
            player.gold
        );
        return None;
    }
    let available = player.gold - reserved;

    let space = player.cargo.space_left(player.ship.capacity);
    let space_for_goods = space.saturating_sub(shortfall.total());
    if space_for_goods < MIN_FREE_HOLD {
        log::debug!("No run to {dest:?}: only {space_for_goods} units of hold left");
        return None;
    }

    let mut budget_gold = (available as f64 * COMMIT_RATIO).floor() as u32;
    let mut budget_space = (space_for_goods as f64 * COMMIT_RATIO).floor() as u32;

    // Candidates in declaration order, then a stable sort by absolute
    // profit per unit. Ties keep the declaration order.
    let mut candidates = vec![];
    for good in Good::iter() {
        if good.is_supply() {
            continue;
        }
        let stock = stocks.stock_of(player.port, good);
        if stock == 0 {
            continue;
        }
        let buy_price = market.buy_price(player.port, good);
        let sell_price = market.sell_price(dest, good);
        if sell_price <= buy_price {
            continue;
        }
        candidates.push((good, buy_price, sell_price, stock));
    }
    candidates.sort_by_key(|(_, buy, sell, _)| std::cmp::Reverse(sell - buy));

    let mut goods = vec![];
    for (good, buy_price, sell_price, stock) in candidates {
        if budget_space == 0 || budget_gold < buy_price {
            continue;
        }
        let quantity = (budget_gold / buy_price).min(budget_space).min(stock);
        if quantity < MIN_LOT {
            continue;
        }
        budget_gold -= quantity * buy_price;
        budget_space -= quantity;
        goods.push(PlannedGood {
            good,
            quantity,
            buy_price,
            sell_price,
            bought: 0,
        });
    }
    if goods.is_empty() {
        return None;
    }

    let gross: i64 = goods
        .iter()
        .map(|line| line.quantity as i64 * (line.sell_price as i64 - line.buy_price as i64))
        .sum();
    Some(VoyagePlan {
        destination: dest,
        travel_days,
        goods,
        required,
        shortfall,
        supply_cost,
        expected_profit: gross - supply_cost as i64,
    })
}

// A goods-free plan that just moves the ship, provisions included
pub fn relocation_plan(player: &PlayerState, market: &Market, dest: Port) -> VoyagePlan {
    let travel_days = voyage::travel_days(player.port, dest, player.ship.speed);
    let required = voyage::required_supplies(player.ship.crew, travel_days);
    let shortfall = voyage::supply_shortfall(&player.cargo, player.ship.crew, travel_days);
    let supply_cost = voyage::supply_cost(market, player.port, &shortfall);
    let here = cargo_sell_value(player, market, player.port) as i64;
    let there = cargo_sell_value(player, market, dest) as i64;
    VoyagePlan {
        destination: dest,
        travel_days,
        goods: vec![],
        required,
        shortfall,
        supply_cost,
        expected_profit: there - here - supply_cost as i64,
    }
}

#[derive(Clone, Debug)]
pub enum TradeDecision {
    SellHere,
    SellAt(Port),
    Buy(VoyagePlan),
}

// The one call the first mate makes at the dock: sell what we carry
// at the best harbour, or put together the most promising run from
// here. None means nothing worth doing today.
pub fn find_best_trade(
    player: &PlayerState,
    market: &Market,
    stocks: &PortInventory,
) -> Option<TradeDecision> {
    if player.cargo.has_tradeable() {
        let best = best_selling_port(player, market);
        if best == player.port {
            return Some(TradeDecision::SellHere);
        }
        return Some(TradeDecision::SellAt(best));
    }

    let mut best: Option<VoyagePlan> = None;
    for port in Port::iter() {
        if port == player.port {
            continue;
        }
        let Some(plan) = optimal_purchase_plan(player, market, stocks, port) else {
            continue;
        };
        if best
            .as_ref()
            .is_none_or(|b| plan.expected_profit > b.expected_profit)
        {
            best = Some(plan);
        }
    }
    let best = best?;
    if best.expected_profit < MIN_PLAN_PROFIT {
        log::debug!(
            "Best run from {:?} goes to {:?} for a meagre {} gold, staying put",
            player.port,
            best.destination,
            best.expected_profit
        );
        return None;
    }
    Some(TradeDecision::Buy(best))
}

#[cfg(test)]
fn planner_fixture(port: Port, gold: u32) -> (PlayerState, PortInventory, Market) {
    let mut player = PlayerState::init();
    player.port = port;
    player.gold = gold;
    (player, PortInventory::init(), Market::flat())
}

#[test]
fn test_prospects_sorted_by_margin() {
    let (player, stocks, market) = planner_fixture(Port::Macau, 1000);
    let prospects = profitable_goods(&player, &market, &stocks, Port::Nagasaki);
    let order: Vec<Good> = prospects.iter().map(|p| p.good).collect();
    // Tea beats Spices on margin despite a smaller absolute profit
    assert_eq!(
        order,
        vec![Good::Silk, Good::Porcelain, Good::Tea, Good::Spices, Good::Sugar]
    );
    for p in &prospects {
        assert!(p.sell_price > p.buy_price);
        assert!(!p.good.is_supply());
    }
}

#[test]
fn test_purchase_plan_greedy_allocation() {
    let (player, stocks, market) = planner_fixture(Port::Macau, 5000);
    let plan = optimal_purchase_plan(&player, &market, &stocks, Port::Nagasaki).unwrap();

    // Flat prices: silk buys at 60 and nets 103 a unit, porcelain
    // nets 32. Silk drains the whole port stock of 60, porcelain
    // fills the rest of the committed hold.
    assert_eq!(plan.travel_days, 4);
    assert_eq!(plan.required, Supplies { food: 6, water: 6 });
    assert_eq!(plan.supply_cost, 96);
    assert_eq!(plan.goods.len(), 2);
    assert_eq!(plan.goods[0].good, Good::Silk);
    assert_eq!(plan.goods[0].quantity, 60);
    assert_eq!(plan.goods[1].good, Good::Porcelain);
    assert_eq!(plan.goods[1].quantity, 19);
    assert_eq!(plan.expected_profit, 60 * 103 + 19 * 32 - 96);
    assert_eq!(plan.total_bought(), 0);
    assert!(!plan.fully_bought());
}

#[test]
fn test_purchase_plan_budget_bound() {
    let (player, stocks, market) = planner_fixture(Port::Macau, 1000);
    let plan = optimal_purchase_plan(&player, &market, &stocks, Port::Nagasaki).unwrap();

    // 1000 gold, 96 of provisions and 100 of reserve leave 804, of
    // which 90% may be spent: 12 silk at 60 apiece
    assert_eq!(plan.goods.len(), 1);
    assert_eq!(plan.goods[0].good, Good::Silk);
    assert_eq!(plan.goods[0].quantity, 12);
    let committed: u32 = plan
        .goods
        .iter()
        .map(|line| line.quantity * line.buy_price)
        .sum();
    assert!(committed + plan.supply_cost + SAFETY_RESERVE <= 1000);
}

#[test]
fn test_purchase_plan_skips_tiny_lots() {
    // Budget leaves room for 2 silk, under the minimum lot, so the
    // cheaper porcelain gets the gold instead
    let (player, stocks, market) = planner_fixture(Port::Macau, 363);
    let plan = optimal_purchase_plan(&player, &market, &stocks, Port::Nagasaki).unwrap();
    assert_eq!(plan.goods.len(), 1);
    assert_eq!(plan.goods[0].good, Good::Porcelain);
    assert_eq!(plan.goods[0].quantity, 5);
}

#[test]
fn test_purchase_plan_ties_keep_declaration_order() {
    // Goa to Seville at flat prices: porcelain (72 in, 77 out) and
    // cotton (13 in, 18 out) both net 5 a unit. With the luxuries
    // drained and tea down to a crate, the tied lots must land in
    // declaration order, porcelain first despite its thinner margin.
    let (player, mut stocks, market) = planner_fixture(Port::Goa, 2050);
    stocks.reduce_stock(Port::Goa, Good::Spices, u32::MAX);
    stocks.reduce_stock(Port::Goa, Good::Silk, u32::MAX);
    stocks.reduce_stock(Port::Goa, Good::Tea, 140);

    let plan = optimal_purchase_plan(&player, &market, &stocks, Port::Seville).unwrap();
    assert_eq!(plan.travel_days, 23);
    assert_eq!(plan.required, Supplies { food: 33, water: 33 });
    assert_eq!(plan.supply_cost, 495);

    // Tea (8 a unit) leads, then the two tied lots: all 10 tea in
    // stock, 12 porcelain on the remaining gold, cotton on the scraps
    let lineup: Vec<(Good, u32)> = plan.goods.iter().map(|l| (l.good, l.quantity)).collect();
    assert_eq!(
        lineup,
        vec![(Good::Tea, 10), (Good::Porcelain, 12), (Good::Cotton, 3)]
    );
    assert_eq!(plan.expected_profit, 10 * 8 + 12 * 5 + 3 * 5 - 495);
}

#[test]
fn test_purchase_plan_infeasible() {
    // Too broke to even provision the trip
    let (player, stocks, market) = planner_fixture(Port::Macau, 150);
    assert!(optimal_purchase_plan(&player, &market, &stocks, Port::Nagasaki).is_none());

    // Hold too full to bother
    let (mut player, stocks, market) = planner_fixture(Port::Macau, 5000);
    player.cargo.add(Good::Tea, 95, player.ship.capacity);
    assert!(optimal_purchase_plan(&player, &market, &stocks, Port::Nagasaki).is_none());
}

#[test]
fn test_best_selling_port_weighs_provisions() {
    let (mut player, _, market) = planner_fixture(Port::Macau, 1000);
    player.cargo.add(Good::Silk, 10, player.ship.capacity);

    // Nagasaki is 4 days away and pays 163 flat for silk against 48
    // at home, worth far more than the provisions cost
    assert_eq!(best_selling_port(&player, &market), Port::Nagasaki);

    // Without gold for provisions every crossing is out of reach
    player.gold = 0;
    assert_eq!(best_selling_port(&player, &market), Port::Macau);
}

#[test]
fn test_find_best_trade_sells_cargo_first() {
    let (mut player, stocks, market) = planner_fixture(Port::Macau, 1000);
    player.cargo.add(Good::Silk, 10, player.ship.capacity);
    assert!(matches!(
        find_best_trade(&player, &market, &stocks),
        Some(TradeDecision::SellAt(Port::Nagasaki))
    ));

    player.gold = 0;
    assert!(matches!(
        find_best_trade(&player, &market, &stocks),
        Some(TradeDecision::SellHere)
    ));
}

#[test]
fn test_find_best_trade_fresh_game_always_has_a_run() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    // Whatever the daily factors, a new game in Lisbon must find a
    // worthwhile first run
    for seed in [1, 7, 42, 1337, 99999] {
        let mut rng = StdRng::seed_from_u64(seed);
        let market = Market::init(&mut rng);
        let player = PlayerState::init();
        let stocks = PortInventory::init();
        match find_best_trade(&player, &market, &stocks) {
            Some(TradeDecision::Buy(plan)) => {
                assert!(plan.expected_profit >= MIN_PLAN_PROFIT, "seed {seed}");
                assert!(!plan.goods.is_empty(), "seed {seed}");
            }
            other => panic!("seed {seed}: expected a run, got {other:?}"),
        }
    }
}

#[test]
fn test_first_run_from_lisbon_fits_the_purse() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    // A fresh game holds 1000 gold and a 100 unit hold. Whatever the
    // day's factors, the run to Seville must fit both.
    for seed in [2, 13, 777] {
        let mut rng = StdRng::seed_from_u64(seed);
        let market = Market::init(&mut rng);
        let player = PlayerState::init();
        let stocks = PortInventory::init();
        let plan = optimal_purchase_plan(&player, &market, &stocks, Port::Seville)
            .expect("a fresh game can always stock a run to Seville");

        assert_eq!(plan.travel_days, 2);
        let committed: u32 = plan
            .goods
            .iter()
            .map(|line| line.quantity * line.buy_price)
            .sum();
        assert!(
            committed + plan.supply_cost + SAFETY_RESERVE <= 1000,
            "seed {seed}"
        );
        let units: u32 = plan.goods.iter().map(|line| line.quantity).sum();
        assert!(units + plan.shortfall.total() <= 100, "seed {seed}");
        for line in &plan.goods {
            assert!(
                line.quantity <= stocks.stock_of(Port::Lisbon, line.good),
                "seed {seed}"
            );
        }
    }
}

#[test]
fn test_find_best_trade_broke_and_empty_handed() {
    let (player, stocks, market) = planner_fixture(Port::Lisbon, 50);
    assert!(find_best_trade(&player, &market, &stocks).is_none());
}

#[test]
fn test_relocation_plan_carries_no_goods() {
    let (mut player, _, market) = planner_fixture(Port::Macau, 1000);
    player.cargo.add(Good::Silk, 10, player.ship.capacity);
    let plan = relocation_plan(&player, &market, Port::Nagasaki);
    assert!(plan.goods.is_empty());
    assert_eq!(plan.shortfall, Supplies { food: 6, water: 6 });
    assert_eq!(plan.supply_cost, 96);
    assert_eq!(plan.expected_profit, 10 * 163 - 10 * 48 - 96);
    assert!(plan.fully_bought());
}
