pub mod config;
pub mod error;
pub mod types;

pub use config::{SimulationConfig, ThreatConfig};
pub use error::{HeistError, PurchaseError, Result};
pub use types::{ObjectiveId, ObserverId, SimTime, Tick, TilePos, UnitId};
