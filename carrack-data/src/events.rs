use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::market::Good;
use crate::port::Port;
use crate::voyage::Day;

const EVENT_RING_MAX_SIZE: usize = 64;

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
pub enum TradeAction {
    #[default]
    Bought,
    Sold,
}

#[derive(Clone, Debug, PartialEq, Serialize, IntoStaticStr)]
pub enum GameEvent {
    // Harbour business
    TradeExecuted {
        port: Port,
        action: TradeAction,
        good: Good,
        quantity: u32,
        unit_price: u32,
        total: u32,
    },
    ShipUpgraded {
        name: String,
        capacity: u32,
    },

    // Sailing
    VoyageStarted {
        from: Port,
        to: Port,
        days: Day,
    },
    VoyageCompleted {
        from: Port,
        to: Port,
        days: Day,
    },
    SupplyShortfall {
        food: u32,
        water: u32,
    },

    // First mate
    AutopilotEngaged {
        minutes: f64,
    },
    AutopilotStopped {
        profit: i64,
        days: Day,
    },
    PlanFormed {
        destination: Port,
        expected_profit: i64,
    },
}

impl GameEvent {
    pub fn message(&self) -> String {
        match self {
            GameEvent::TradeExecuted {
                port,
                action,
                good,
                quantity,
                unit_price,
                total,
            } => {
                let verb = match action {
                    TradeAction::Bought => "Bought",
                    TradeAction::Sold => "Sold",
                };
                format!(
                    "{verb} {quantity} {good:?} at {port:?} for {total} gold ({unit_price}/unit)"
                )
            }
            GameEvent::ShipUpgraded { name, capacity } => {
                format!("Took command of a {name}, hold fits {capacity} units")
            }
            GameEvent::VoyageStarted { from, to, days } => {
                format!("Set sail from {from:?} towards {to:?}, {days} days at sea")
            }
            GameEvent::VoyageCompleted { from, to, days } => {
                format!("Moored at {to:?}, {days} days out of {from:?}")
            }
            GameEvent::SupplyShortfall { food, water } => {
                format!("Rations ran dry at sea, short {food} food and {water} water")
            }
            GameEvent::AutopilotEngaged { minutes } => {
                format!("The first mate takes the helm for {minutes:.0} minutes")
            }
            GameEvent::AutopilotStopped { profit, days } => {
                format!("The first mate hands back the helm: {profit} gold over {days} days")
            }
            GameEvent::PlanFormed {
                destination,
                expected_profit,
            } => {
                format!("Charted a run to {destination:?}, counting on {expected_profit} gold")
            }
        }
    }
}

// Ring of the latest game events, oldest dropped first once full.
// While muted (offline catch-up), regular pushes are discarded.
pub struct EventLog {
    list: [Option<(Day, GameEvent)>; EVENT_RING_MAX_SIZE],
    push_ind: usize,
    pop_ind: usize,
    len: usize,
    pub muted: bool,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> EventLog {
        EventLog {
            list: [const { None }; EVENT_RING_MAX_SIZE],
            push_ind: 0,
            pop_ind: 0,
            len: 0,
            muted: false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, day: Day, evt: GameEvent) {
        if self.muted {
            return;
        }
        self.force_push(day, evt);
    }

    // Records even while muted, for the few events worth surfacing
    // after an offline catch-up
    pub fn force_push(&mut self, day: Day, evt: GameEvent) {
        log::debug!("day {day}: {evt:?}");
        if (self.len > 0) && (self.push_ind == self.pop_ind) {
            self.pop_ind = (self.pop_ind + 1) % EVENT_RING_MAX_SIZE;
        }
        self.list[self.push_ind] = Some((day, evt));
        self.push_ind = (self.push_ind + 1) % EVENT_RING_MAX_SIZE;
        self.len = (self.len + 1).min(EVENT_RING_MAX_SIZE);
    }

    fn pop(&mut self) -> Option<(Day, GameEvent)> {
        if self.len == 0 {
            return None;
        }
        let data = std::mem::take(&mut self.list[self.pop_ind]);
        self.pop_ind = (self.pop_ind + 1) % EVENT_RING_MAX_SIZE;
        self.len -= 1;
        data
    }

    pub fn drain(&mut self) -> Vec<(Day, GameEvent)> {
        let mut data = vec![];
        while let Some(got) = self.pop() {
            data.push(got);
        }
        data
    }
}

#[test]
fn test_event_ring_drops_oldest() {
    let mut events = EventLog::new();
    events.push(0, GameEvent::SupplyShortfall { food: 0, water: 0 });
    assert_eq!(events.drain().len(), 1);
    assert!(events.is_empty());

    let ntest = EVENT_RING_MAX_SIZE + 5;
    for n in 0..ntest {
        events.push(
            n as Day,
            GameEvent::SupplyShortfall {
                food: n as u32,
                water: 0,
            },
        );
        assert_eq!(events.len(), (n + 1).min(EVENT_RING_MAX_SIZE));
    }

    let all = events.drain();
    assert_eq!(all.len(), EVENT_RING_MAX_SIZE);
    // The five oldest entries were pushed out
    assert_eq!(all[0].0, 5);
    assert_eq!(all.last().map(|e| e.0), Some((ntest - 1) as Day));
    assert!(events.is_empty());
}

#[test]
fn test_event_mute() {
    let mut events = EventLog::new();
    events.muted = true;
    events.push(
        0,
        GameEvent::VoyageStarted {
            from: Port::Lisbon,
            to: Port::Goa,
            days: 22,
        },
    );
    assert!(events.is_empty());

    events.force_push(
        3,
        GameEvent::AutopilotStopped {
            profit: 120,
            days: 3,
        },
    );
    events.muted = false;
    let all = events.drain();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].0, 3);
}
