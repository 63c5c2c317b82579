//! Named tile groups (rooms, corridors, vaults)

use serde::{Deserialize, Serialize};

use crate::core::types::TilePos;

/// A named group of tiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub color: String,
    pub tiles: Vec<TilePos>,
    /// Zones reachable directly from this one
    pub connections: Vec<String>,
}

impl Zone {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
            tiles: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        self.tiles.contains(&pos)
    }

    pub fn connect(&mut self, other: &str) {
        if other != self.id && !self.connections.iter().any(|c| c == other) {
            self.connections.push(other.to_string());
        }
    }
}
