//! Tile types, terrain and per-tile state
//!
//! Walkability, cover and transparency derive from the tile type (and door
//! state); terrain only changes what a step costs.

use serde::{Deserialize, Serialize};

use crate::core::types::{TilePos, UnitId};

/// Structural type of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TileType {
    #[default]
    Void, // Outside the building
    Floor,
    Wall,
    Door,   // Walkable even while locked; see DoorState
    Window, // See-through cover, cannot be crossed
    Vent,   // Crawlable, hides whoever is inside
}

impl TileType {
    pub fn is_walkable(&self) -> bool {
        matches!(self, TileType::Floor | TileType::Door | TileType::Vent)
    }

    pub fn is_cover(&self) -> bool {
        matches!(self, TileType::Window | TileType::Vent)
    }

    /// Transparency ignoring door state (closed doors are handled on Tile)
    pub fn is_transparent(&self) -> bool {
        matches!(self, TileType::Void | TileType::Floor | TileType::Window | TileType::Door)
    }
}

/// Floor surface; affects movement cost only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Terrain {
    #[default]
    Default,
    Carpet,
    HardFloor,
    Gravel,
    Vent,
}

impl Terrain {
    /// Movement cost multiplier (1.0 = normal, never below 1.0)
    pub fn movement_cost(&self) -> f32 {
        match self {
            Terrain::Default => 1.0,
            Terrain::Carpet => 1.1,
            Terrain::HardFloor => 1.0,
            Terrain::Gravel => 1.5,
            Terrain::Vent => 2.5,
        }
    }
}

/// Fog-of-war state of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TileVisibility {
    #[default]
    Hidden,   // Never revealed
    Revealed, // Known layout, not currently observed
    Visible,  // Currently seen by the crew
}

/// Open/closed and locked/unlocked sub-state of a door tile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoorState {
    pub open: bool,
    pub locked: bool,
    /// Seconds needed to unlock
    pub unlock_duration: f32,
}

impl DoorState {
    pub fn new(locked: bool, unlock_duration: f32) -> Self {
        Self {
            open: false,
            locked,
            unlock_duration,
        }
    }
}

/// A single grid tile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub pos: TilePos,
    pub tile_type: TileType,
    pub terrain: Terrain,
    pub door: Option<DoorState>,
    pub occupant: Option<UnitId>,
    pub reservation: Option<UnitId>,
    pub zone: Option<String>,
    pub visibility: TileVisibility,
}

impl Tile {
    pub fn new(pos: TilePos, tile_type: TileType) -> Self {
        Self {
            pos,
            tile_type,
            terrain: Terrain::Default,
            door: None,
            occupant: None,
            reservation: None,
            zone: None,
            visibility: TileVisibility::Hidden,
        }
    }

    pub fn is_walkable(&self) -> bool {
        self.tile_type.is_walkable()
    }

    pub fn is_cover(&self) -> bool {
        self.tile_type.is_cover()
    }

    /// Closed doors block sight; open doors do not
    pub fn is_transparent(&self) -> bool {
        match (self.tile_type, self.door) {
            (TileType::Door, Some(door)) => door.open,
            (tile_type, _) => tile_type.is_transparent(),
        }
    }

    pub fn is_locked_door(&self) -> bool {
        self.tile_type == TileType::Door && self.door.is_some_and(|d| d.locked)
    }

    /// Movement cost to enter this tile (infinite when not walkable)
    pub fn movement_cost(&self) -> f32 {
        if self.is_walkable() {
            self.terrain.movement_cost()
        } else {
            f32::INFINITY
        }
    }

    /// Can `unit` reserve this tile right now?
    pub fn is_free_for(&self, unit: UnitId) -> bool {
        self.occupant.map_or(true, |o| o == unit) && self.reservation.map_or(true, |r| r == unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walkability_by_type() {
        assert!(TileType::Floor.is_walkable());
        assert!(TileType::Door.is_walkable());
        assert!(TileType::Vent.is_walkable());
        assert!(!TileType::Wall.is_walkable());
        assert!(!TileType::Window.is_walkable());
        assert!(!TileType::Void.is_walkable());
    }

    #[test]
    fn test_window_is_transparent_cover() {
        let tile = Tile::new(TilePos::new(0, 0), TileType::Window);
        assert!(tile.is_transparent());
        assert!(tile.is_cover());
    }

    #[test]
    fn test_closed_door_blocks_sight() {
        let mut tile = Tile::new(TilePos::new(0, 0), TileType::Door);
        tile.door = Some(DoorState::new(true, 3.0));
        assert!(!tile.is_transparent());
        assert!(tile.is_walkable());
        assert!(tile.is_locked_door());

        tile.door = Some(DoorState {
            open: true,
            locked: false,
            unlock_duration: 3.0,
        });
        assert!(tile.is_transparent());
        assert!(!tile.is_locked_door());
    }

    #[test]
    fn test_wall_cost_is_infinite() {
        let wall = Tile::new(TilePos::new(0, 0), TileType::Wall);
        assert!(wall.movement_cost().is_infinite());
    }

    #[test]
    fn test_gravel_costs_more_than_default() {
        let mut tile = Tile::new(TilePos::new(0, 0), TileType::Floor);
        let base = tile.movement_cost();
        tile.terrain = Terrain::Gravel;
        assert!(tile.movement_cost() > base);
    }

    #[test]
    fn test_terrain_costs_never_below_one() {
        for terrain in [
            Terrain::Default,
            Terrain::Carpet,
            Terrain::HardFloor,
            Terrain::Gravel,
            Terrain::Vent,
        ] {
            assert!(terrain.movement_cost() >= 1.0);
        }
    }

    #[test]
    fn test_free_for_respects_other_units() {
        let mut tile = Tile::new(TilePos::new(0, 0), TileType::Floor);
        assert!(tile.is_free_for(UnitId(1)));
        tile.reservation = Some(UnitId(2));
        assert!(!tile.is_free_for(UnitId(1)));
        assert!(tile.is_free_for(UnitId(2)));
        tile.reservation = None;
        tile.occupant = Some(UnitId(3));
        assert!(!tile.is_free_for(UnitId(1)));
    }
}
