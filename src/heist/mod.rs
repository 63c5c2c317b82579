//! A heist: building, commands, events and the tick loop

pub mod building;
pub mod commands;
pub mod events;
pub mod state;

pub use building::{Building, BuildingDef, ExtractionPoint};
pub use commands::{Command, HeistPlan, ScheduledCommand};
pub use events::{HeistEvent, HeistEventKind, HeistEventLog, HeistOutcome};
pub use state::HeistState;
