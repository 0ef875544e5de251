#[derive(Debug)]
pub enum Errcode {
    NotEnoughGold(u32, u32),
    NotEnoughSupplies(u32, u32),
    UnknownShipTier(usize),
    ShipTooSmall(u32, u32),
    AutopilotEngaged,
    AutopilotIdle,
    VoyageUnderway,
    NoVoyageUnderway,
    NoDestinationSelected,
    AlreadyInPort(crate::port::Port),
    InvalidArgument(&'static str),
}

impl Errcode {
    pub fn errmsg(&self) -> String {
        match self {
            Errcode::NotEnoughGold(got, need) => {
                format!("Not enough gold, need {need}, got {got}")
            }
            Errcode::NotEnoughSupplies(food, water) => {
                format!("Missing provisions for this voyage: {food} food, {water} water")
            }
            Errcode::UnknownShipTier(tier) => format!("No ship of tier {tier} exists"),
            Errcode::ShipTooSmall(used, capacity) => {
                format!("The hold of this ship fits {capacity} units, you carry {used}")
            }
            Errcode::AutopilotEngaged => {
                "The autopilot holds the helm, stop it before trading manually".to_string()
            }
            Errcode::AutopilotIdle => "The autopilot is not engaged".to_string(),
            Errcode::VoyageUnderway => "The ship is already at sea".to_string(),
            Errcode::NoVoyageUnderway => "The ship is not at sea".to_string(),
            Errcode::NoDestinationSelected => "No destination was selected".to_string(),
            Errcode::AlreadyInPort(port) => format!("The ship is already docked at {port:?}"),
            Errcode::InvalidArgument(arg) => format!("Argument {arg} has an invalid value"),
        }
    }
}
