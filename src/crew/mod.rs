//! Crew units, movement and carried loot

pub mod loot;
pub mod movement;
pub mod unit;

pub use loot::{LootBag, LootTotals};
pub use movement::{advance_movement, MoveStatus};
pub use unit::{Stance, Unit};
