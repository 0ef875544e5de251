use serde::{Deserialize, Serialize};

use crate::events::{EventLog, GameEvent, TradeAction};
use crate::inventory::PortInventory;
use crate::market::{Good, Market};
use crate::player::PlayerState;
use crate::voyage::{self, Day};

// One settled transaction at the counting house. A quantity of zero
// means the deal came to nothing, which is never an error: requests
// are clamped to what gold, hold space and port stock allow.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub action: TradeAction,
    pub good: Good,
    pub quantity: u32,
    pub unit_price: u32,
    pub total: u32,
}

pub fn buy_good(
    player: &mut PlayerState,
    stocks: &mut PortInventory,
    market: &Market,
    events: &mut EventLog,
    good: Good,
    amnt: u32,
) -> TradeOutcome {
    let port = player.port;
    let unit_price = market.buy_price(port, good);
    let affordable = player.gold / unit_price;
    let space = player.cargo.space_left(player.ship.capacity);
    let stock = stocks.stock_of(port, good);

    let quantity = amnt.min(affordable).min(space).min(stock);
    if quantity == 0 {
        log::debug!(
            "Buying no {good:?} at {port:?}: asked {amnt}, affordable {affordable}, space {space}, stock {stock}"
        );
        return TradeOutcome {
            action: TradeAction::Bought,
            good,
            quantity: 0,
            unit_price,
            total: 0,
        };
    }

    let total = quantity * unit_price;
    player.gold -= total;
    player.cargo.add(good, quantity, player.ship.capacity);
    stocks.reduce_stock(port, good, quantity);
    events.push(
        player.day,
        GameEvent::TradeExecuted {
            port,
            action: TradeAction::Bought,
            good,
            quantity,
            unit_price,
            total,
        },
    );
    TradeOutcome {
        action: TradeAction::Bought,
        good,
        quantity,
        unit_price,
        total,
    }
}

pub fn buy_all_good(
    player: &mut PlayerState,
    stocks: &mut PortInventory,
    market: &Market,
    events: &mut EventLog,
    good: Good,
) -> TradeOutcome {
    buy_good(player, stocks, market, events, good, u32::MAX)
}

pub fn sell_good(
    player: &mut PlayerState,
    market: &Market,
    events: &mut EventLog,
    good: Good,
    amnt: u32,
) -> TradeOutcome {
    let port = player.port;
    let unit_price = market.sell_price(port, good);
    let quantity = amnt.min(player.cargo.quantity_of(good));
    if quantity == 0 {
        log::debug!("Selling no {good:?} at {port:?}: nothing of it in the hold");
        return TradeOutcome {
            action: TradeAction::Sold,
            good,
            quantity: 0,
            unit_price,
            total: 0,
        };
    }

    let total = quantity * unit_price;
    player.cargo.remove(good, quantity);
    player.gold += total;
    events.push(
        player.day,
        GameEvent::TradeExecuted {
            port,
            action: TradeAction::Sold,
            good,
            quantity,
            unit_price,
            total,
        },
    );
    TradeOutcome {
        action: TradeAction::Sold,
        good,
        quantity,
        unit_price,
        total,
    }
}

pub fn sell_all_good(
    player: &mut PlayerState,
    market: &Market,
    events: &mut EventLog,
    good: Good,
) -> TradeOutcome {
    sell_good(player, market, events, good, u32::MAX)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SupplyPurchase {
    pub food: Option<TradeOutcome>,
    pub water: Option<TradeOutcome>,
    pub satisfied: bool,
}

impl SupplyPurchase {
    pub fn bought_any(&self) -> bool {
        let food = self.food.map_or(0, |tx| tx.quantity);
        let water = self.water.map_or(0, |tx| tx.quantity);
        food + water > 0
    }
}

// Top up food and water for a crossing of the given length. Buys only
// the missing part, clamped like any other purchase.
pub fn buy_supplies_for(
    player: &mut PlayerState,
    stocks: &mut PortInventory,
    market: &Market,
    events: &mut EventLog,
    days: Day,
) -> SupplyPurchase {
    let crew = player.ship.crew;
    let missing = voyage::supply_shortfall(&player.cargo, crew, days);
    let mut purchase = SupplyPurchase::default();
    if missing.is_empty() {
        purchase.satisfied = true;
        return purchase;
    }

    if missing.food > 0 {
        purchase.food = Some(buy_good(
            player,
            stocks,
            market,
            events,
            Good::Food,
            missing.food,
        ));
    }
    if missing.water > 0 {
        purchase.water = Some(buy_good(
            player,
            stocks,
            market,
            events,
            Good::Water,
            missing.water,
        ));
    }
    purchase.satisfied = voyage::supply_shortfall(&player.cargo, crew, days).is_empty();
    purchase
}

#[cfg(test)]
fn trade_fixture() -> (PlayerState, PortInventory, Market, EventLog) {
    (
        PlayerState::init(),
        PortInventory::init(),
        Market::flat(),
        EventLog::new(),
    )
}

#[test]
fn test_buy_clamps_to_gold() {
    let (mut player, mut stocks, market, mut events) = trade_fixture();
    player.gold = 100;
    // Silk in Lisbon posts at 228 flat, out of reach
    let tx = buy_good(&mut player, &mut stocks, &market, &mut events, Good::Silk, 5);
    assert_eq!(tx.quantity, 0);
    assert_eq!(player.gold, 100);
    assert!(events.is_empty());

    // Wine posts at 21, the 100 gold buys 4 of the 5 asked
    let tx = buy_good(&mut player, &mut stocks, &market, &mut events, Good::Wine, 5);
    assert_eq!(tx.quantity, 4);
    assert_eq!(tx.total, 84);
    assert_eq!(player.gold, 16);
    assert_eq!(player.cargo.quantity_of(Good::Wine), 4);
    assert_eq!(stocks.stock_of(crate::port::Port::Lisbon, Good::Wine), 96);
    assert_eq!(events.len(), 1);
}

#[test]
fn test_buy_clamps_to_stock_and_space() {
    let (mut player, mut stocks, market, mut events) = trade_fixture();
    player.gold = 1_000_000;
    stocks.reduce_stock(player.port, Good::Tea, 95);
    let tx = buy_all_good(&mut player, &mut stocks, &market, &mut events, Good::Tea);
    assert_eq!(tx.quantity, 5);
    assert_eq!(stocks.stock_of(player.port, Good::Tea), 0);

    // 95 units of hold left, wine stock is full at 100
    let tx = buy_all_good(&mut player, &mut stocks, &market, &mut events, Good::Wine);
    assert_eq!(tx.quantity, 95);
    assert_eq!(player.cargo.space_left(player.ship.capacity), 0);
}

#[test]
fn test_sell_clamps_to_hold() {
    let (mut player, _, market, mut events) = trade_fixture();
    let tx = sell_good(&mut player, &market, &mut events, Good::Wine, 10);
    assert_eq!(tx.quantity, 0);
    assert_eq!(player.gold, crate::player::INIT_GOLD);

    player.cargo.add(Good::Wine, 8, player.ship.capacity);
    let tx = sell_all_good(&mut player, &market, &mut events, Good::Wine);
    assert_eq!(tx.quantity, 8);
    // Lisbon wine sells flat at 17
    assert_eq!(tx.total, 8 * 17);
    assert_eq!(player.gold, crate::player::INIT_GOLD + 8 * 17);
    assert!(player.cargo.goods.is_empty());
}

#[test]
fn test_buy_supplies_only_tops_up() {
    let (mut player, mut stocks, market, mut events) = trade_fixture();
    player.cargo.add(Good::Food, 10, player.ship.capacity);

    // 20 crew for 10 days needs 15 of each
    let purchase = buy_supplies_for(&mut player, &mut stocks, &market, &mut events, 10);
    assert!(purchase.satisfied);
    assert_eq!(purchase.food.map(|tx| tx.quantity), Some(5));
    assert_eq!(purchase.water.map(|tx| tx.quantity), Some(15));
    assert_eq!(player.cargo.quantity_of(Good::Food), 15);
    assert_eq!(player.cargo.quantity_of(Good::Water), 15);

    // Asking again buys nothing more
    let purchase = buy_supplies_for(&mut player, &mut stocks, &market, &mut events, 10);
    assert!(purchase.satisfied);
    assert!(!purchase.bought_any());
}

#[test]
fn test_buy_supplies_reports_failure() {
    let (mut player, mut stocks, market, mut events) = trade_fixture();
    player.gold = 0;
    let purchase = buy_supplies_for(&mut player, &mut stocks, &market, &mut events, 10);
    assert!(!purchase.satisfied);
    assert!(!purchase.bought_any());
}
