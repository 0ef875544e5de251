pub mod autopilot;
pub mod errors;
pub mod events;
pub mod game;
pub mod inventory;
pub mod market;
pub mod planner;
pub mod player;
pub mod port;
pub mod save;
pub mod ship;
pub mod trade;
pub mod voyage;
