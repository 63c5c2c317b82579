//! Core type definitions used throughout the codebase

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Simulation tick counter
pub type Tick = u64;

/// Simulation time in seconds since the heist started
pub type SimTime = f32;

/// Identifier for crew units
///
/// Assigned in spawn order. Unit processing order (and therefore reservation
/// priority within a tick) follows this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Identifier for observers (guards and cameras)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObserverId(pub u32);

/// Identifier for objectives, unique within a heist
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectiveId(pub u32);

/// Integer tile coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Chebyshev distance (king moves)
    pub fn chebyshev(&self, other: &Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    /// Manhattan distance
    pub fn manhattan(&self, other: &Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Is `other` one of the 8 surrounding tiles?
    pub fn is_adjacent(&self, other: &Self) -> bool {
        self.chebyshev(other) == 1
    }

    /// All 8 neighbours, orthogonals first
    pub fn neighbors(&self) -> [TilePos; 8] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
            self.offset(1, 1),
            self.offset(1, -1),
            self.offset(-1, 1),
            self.offset(-1, -1),
        ]
    }

    /// Continuous coordinate of the tile centre
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    /// Tile containing a continuous coordinate
    pub fn from_world(pos: Vec2) -> Self {
        Self::new(pos.x.floor() as i32, pos.y.floor() as i32)
    }
}

impl From<(i32, i32)> for TilePos {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chebyshev_distance() {
        let a = TilePos::new(0, 0);
        assert_eq!(a.chebyshev(&TilePos::new(9, 9)), 9);
        assert_eq!(a.chebyshev(&TilePos::new(3, 7)), 7);
        assert_eq!(a.manhattan(&TilePos::new(3, 7)), 10);
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let p = TilePos::new(4, 4);
        for n in p.neighbors() {
            assert!(p.is_adjacent(&n));
        }
        assert!(!p.is_adjacent(&p));
    }

    #[test]
    fn test_center_round_trips_to_tile() {
        let p = TilePos::new(3, -2);
        assert_eq!(TilePos::from_world(p.center()), p);
    }

    #[test]
    fn test_unit_id_ordering_follows_creation() {
        assert!(UnitId(0) < UnitId(1));
        let mut ids = vec![UnitId(2), UnitId(0), UnitId(1)];
        ids.sort();
        assert_eq!(ids, vec![UnitId(0), UnitId(1), UnitId(2)]);
    }
}
