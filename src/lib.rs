//! Heist Grid - real-time tactical stealth simulation core

pub mod core;
pub mod crew;
pub mod economy;
pub mod grid;
pub mod heist;
pub mod objectives;
pub mod signals;
pub mod threat;
pub mod vision;
