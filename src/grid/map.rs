//! The building grid: dense tiles, zones, occupancy and reservations
//!
//! Every position-taking operation is a silent no-op outside the grid. Vision
//! and pathing scans routinely reach past the edges, so out-of-bounds access
//! returns `None`/`false` instead of failing.

use std::collections::BTreeMap;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::core::types::{TilePos, UnitId};
use crate::grid::tile::{DoorState, Terrain, Tile, TileType, TileVisibility};
use crate::grid::zone::Zone;

/// Dense width x height tile grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    zones: BTreeMap<String, Zone>,
    /// Bumped whenever walkability or cost changes
    topology_version: u64,
}

impl Grid {
    /// Create a grid of Void tiles
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, TileType::Void)
    }

    /// Create a grid of Floor tiles
    pub fn open(width: u32, height: u32) -> Self {
        Self::filled(width, height, TileType::Floor)
    }

    fn filled(width: u32, height: u32, tile_type: TileType) -> Self {
        let mut tiles = Vec::with_capacity((width * height) as usize);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                tiles.push(Tile::new(TilePos::new(x, y), tile_type));
            }
        }

        Self {
            width,
            height,
            tiles,
            zones: BTreeMap::new(),
            topology_version: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Monotonic counter of walkability/cost changes
    pub fn topology_version(&self) -> u64 {
        self.topology_version
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    /// Dense index of an in-bounds position
    pub fn index(&self, pos: TilePos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    pub fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).map(move |i| &mut self.tiles[i])
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    // ===== STRUCTURE =====

    /// Set the type of a tile. Door tiles get a closed, unlocked door.
    pub fn set_tile(&mut self, pos: TilePos, tile_type: TileType) {
        let Some(tile) = self.tile_mut(pos) else {
            return;
        };
        tile.tile_type = tile_type;
        tile.door = match tile_type {
            TileType::Door => Some(tile.door.unwrap_or(DoorState::new(false, 0.0))),
            _ => None,
        };
        self.topology_version += 1;
    }

    pub fn set_terrain(&mut self, pos: TilePos, terrain: Terrain) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.terrain = terrain;
            self.topology_version += 1;
        }
    }

    /// Fill the inclusive rectangle between two corners
    pub fn fill_rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, tile_type: TileType) {
        let (min_x, max_x) = (x1.min(x2), x1.max(x2));
        let (min_y, max_y) = (y1.min(y2), y1.max(y2));
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                self.set_tile(TilePos::new(x, y), tile_type);
            }
        }
    }

    /// Draw the outline of the inclusive rectangle between two corners
    pub fn draw_rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, tile_type: TileType) {
        let (min_x, max_x) = (x1.min(x2), x1.max(x2));
        let (min_y, max_y) = (y1.min(y2), y1.max(y2));
        for x in min_x..=max_x {
            self.set_tile(TilePos::new(x, min_y), tile_type);
            self.set_tile(TilePos::new(x, max_y), tile_type);
        }
        for y in min_y..=max_y {
            self.set_tile(TilePos::new(min_x, y), tile_type);
            self.set_tile(TilePos::new(max_x, y), tile_type);
        }
    }

    /// Turn a tile into a closed door
    pub fn place_door(&mut self, pos: TilePos, locked: bool, unlock_duration: f32) {
        if !self.in_bounds(pos) {
            return;
        }
        self.set_tile(pos, TileType::Door);
        if let Some(tile) = self.tile_mut(pos) {
            tile.door = Some(DoorState::new(locked, unlock_duration));
        }
    }

    /// Permanently unlock and open a door. Returns false if there is no
    /// locked door at `pos`.
    pub fn unlock_door(&mut self, pos: TilePos) -> bool {
        let Some(tile) = self.tile_mut(pos) else {
            return false;
        };
        let Some(door) = tile.door.as_mut() else {
            return false;
        };
        if !door.locked {
            door.open = true;
            return false;
        }
        door.locked = false;
        door.open = true;
        self.topology_version += 1;
        true
    }

    pub fn is_locked_door(&self, pos: TilePos) -> bool {
        self.tile(pos).is_some_and(|t| t.is_locked_door())
    }

    pub fn door_unlock_duration(&self, pos: TilePos) -> Option<f32> {
        self.tile(pos).and_then(|t| t.door).map(|d| d.unlock_duration)
    }

    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.tile(pos).is_some_and(|t| t.is_walkable())
    }

    /// Terrain-indexed cost of entering a tile; infinite when not walkable
    pub fn movement_cost(&self, pos: TilePos) -> f32 {
        self.tile(pos).map_or(f32::INFINITY, |t| t.movement_cost())
    }

    // ===== ZONES =====

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.insert(zone.id.clone(), zone);
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.get(id)
    }

    pub fn zone_mut(&mut self, id: &str) -> Option<&mut Zone> {
        self.zones.get_mut(id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    /// Assign a tile to a zone, removing it from any previous zone.
    /// Returns false when the zone is unknown or the tile is out of bounds.
    pub fn assign_zone(&mut self, zone_id: &str, pos: TilePos) -> bool {
        if !self.zones.contains_key(zone_id) {
            return false;
        }
        let Some(idx) = self.index(pos) else {
            return false;
        };

        if let Some(previous) = self.tiles[idx].zone.take() {
            if let Some(zone) = self.zones.get_mut(&previous) {
                zone.tiles.retain(|p| *p != pos);
            }
        }

        self.tiles[idx].zone = Some(zone_id.to_string());
        if let Some(zone) = self.zones.get_mut(zone_id) {
            zone.tiles.push(pos);
        }
        true
    }

    /// Assign every in-bounds tile of an inclusive rectangle to a zone
    pub fn assign_zone_rect(&mut self, zone_id: &str, x1: i32, y1: i32, x2: i32, y2: i32) {
        for y in y1.min(y2)..=y1.max(y2) {
            for x in x1.min(x2)..=x1.max(x2) {
                self.assign_zone(zone_id, TilePos::new(x, y));
            }
        }
    }

    /// Set the visibility of every tile in a zone
    pub fn set_zone_visibility(&mut self, zone_id: &str, visibility: TileVisibility) -> bool {
        let Some(zone) = self.zones.get(zone_id) else {
            return false;
        };
        let members = zone.tiles.clone();
        for pos in members {
            self.set_visibility(pos, visibility);
        }
        true
    }

    pub fn set_visibility(&mut self, pos: TilePos, visibility: TileVisibility) {
        if let Some(tile) = self.tile_mut(pos) {
            tile.visibility = visibility;
        }
    }

    pub fn visibility(&self, pos: TilePos) -> Option<TileVisibility> {
        self.tile(pos).map(|t| t.visibility)
    }

    // ===== OCCUPANCY & RESERVATION =====

    /// Claim the next tile of a path. Fails when the tile is not walkable or
    /// is occupied or reserved by a different unit.
    pub fn try_reserve(&mut self, pos: TilePos, unit: UnitId) -> bool {
        let Some(tile) = self.tile_mut(pos) else {
            return false;
        };
        if !tile.is_walkable() || !tile.is_free_for(unit) {
            return false;
        }
        tile.reservation = Some(unit);
        true
    }

    /// Drop a reservation held by `unit` (other units' claims are untouched)
    pub fn release_reservation(&mut self, pos: TilePos, unit: UnitId) {
        if let Some(tile) = self.tile_mut(pos) {
            if tile.reservation == Some(unit) {
                tile.reservation = None;
            }
        }
    }

    /// Mark `unit` as standing on a tile. Fails if someone else is there.
    pub fn occupy(&mut self, pos: TilePos, unit: UnitId) -> bool {
        let Some(tile) = self.tile_mut(pos) else {
            return false;
        };
        match tile.occupant {
            Some(other) if other != unit => false,
            _ => {
                tile.occupant = Some(unit);
                true
            }
        }
    }

    pub fn vacate(&mut self, pos: TilePos, unit: UnitId) {
        if let Some(tile) = self.tile_mut(pos) {
            if tile.occupant == Some(unit) {
                tile.occupant = None;
            }
        }
    }

    pub fn occupant(&self, pos: TilePos) -> Option<UnitId> {
        self.tile(pos).and_then(|t| t.occupant)
    }

    pub fn reservation(&self, pos: TilePos) -> Option<UnitId> {
        self.tile(pos).and_then(|t| t.reservation)
    }

    /// Tiles occupied by any unit other than `unit`
    pub fn occupied_by_others(&self, unit: UnitId) -> AHashSet<TilePos> {
        self.tiles
            .iter()
            .filter(|t| t.occupant.is_some_and(|o| o != unit))
            .map(|t| t.pos)
            .collect()
    }

    /// Tile a unit should stand on to work at `target`: the target itself
    /// when walkable, otherwise the walkable neighbour closest to `from`.
    pub fn approach_tile(&self, target: TilePos, from: TilePos) -> Option<TilePos> {
        if self.is_walkable(target) {
            return Some(target);
        }
        target
            .neighbors()
            .into_iter()
            .filter(|n| self.is_walkable(*n))
            .min_by_key(|n| (n.chebyshev(&from), n.manhattan(&from), *n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::open(10, 8);
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 8);
        assert!(grid.is_walkable(TilePos::new(9, 7)));
        assert!(!Grid::new(4, 4).is_walkable(TilePos::new(1, 1)));
    }

    #[test]
    fn test_out_of_bounds_is_silent() {
        let mut grid = Grid::open(5, 5);
        grid.set_tile(TilePos::new(-1, 0), TileType::Wall);
        grid.set_tile(TilePos::new(5, 5), TileType::Wall);
        grid.fill_rect(3, 3, 10, 10, TileType::Wall);
        assert!(grid.tile(TilePos::new(100, 100)).is_none());
        assert!(grid.movement_cost(TilePos::new(-3, 2)).is_infinite());
        assert!(!grid.try_reserve(TilePos::new(7, 7), UnitId(0)));
        // In-bounds part of the rect still applied
        assert_eq!(grid.tile(TilePos::new(4, 4)).unwrap().tile_type, TileType::Wall);
    }

    #[test]
    fn test_draw_rect_outline_only() {
        let mut grid = Grid::open(6, 6);
        grid.draw_rect(0, 0, 5, 5, TileType::Wall);
        assert_eq!(grid.tile(TilePos::new(0, 3)).unwrap().tile_type, TileType::Wall);
        assert_eq!(grid.tile(TilePos::new(5, 5)).unwrap().tile_type, TileType::Wall);
        assert_eq!(grid.tile(TilePos::new(2, 2)).unwrap().tile_type, TileType::Floor);
    }

    #[test]
    fn test_fill_rect_accepts_reversed_corners() {
        let mut grid = Grid::new(6, 6);
        grid.fill_rect(4, 4, 1, 1, TileType::Floor);
        assert!(grid.is_walkable(TilePos::new(1, 1)));
        assert!(grid.is_walkable(TilePos::new(4, 4)));
        assert!(!grid.is_walkable(TilePos::new(5, 5)));
    }

    #[test]
    fn test_zone_membership_is_exclusive() {
        let mut grid = Grid::open(6, 6);
        grid.add_zone(Zone::new("a", "A", "#f00"));
        grid.add_zone(Zone::new("b", "B", "#0f0"));

        let pos = TilePos::new(2, 2);
        assert!(grid.assign_zone("a", pos));
        assert!(grid.assign_zone("b", pos));

        assert!(!grid.zone("a").unwrap().contains(pos));
        assert!(grid.zone("b").unwrap().contains(pos));
        assert_eq!(grid.tile(pos).unwrap().zone.as_deref(), Some("b"));
        assert!(!grid.assign_zone("missing", pos));
    }

    #[test]
    fn test_zone_visibility_propagates() {
        let mut grid = Grid::open(6, 6);
        grid.add_zone(Zone::new("vault", "Vault", "#ffd700"));
        grid.assign_zone_rect("vault", 1, 1, 2, 2);

        assert!(grid.set_zone_visibility("vault", TileVisibility::Revealed));
        assert_eq!(grid.visibility(TilePos::new(2, 1)), Some(TileVisibility::Revealed));
        assert_eq!(grid.visibility(TilePos::new(3, 3)), Some(TileVisibility::Hidden));
        assert!(!grid.set_zone_visibility("nope", TileVisibility::Revealed));
    }

    #[test]
    fn test_locked_door_is_walkable() {
        let mut grid = Grid::open(5, 5);
        grid.place_door(TilePos::new(2, 2), true, 4.0);
        assert!(grid.is_walkable(TilePos::new(2, 2)));
        assert!(grid.is_locked_door(TilePos::new(2, 2)));
        assert_eq!(grid.door_unlock_duration(TilePos::new(2, 2)), Some(4.0));
    }

    #[test]
    fn test_unlock_door_bumps_version_once() {
        let mut grid = Grid::open(5, 5);
        grid.place_door(TilePos::new(2, 2), true, 4.0);
        let before = grid.topology_version();

        assert!(grid.unlock_door(TilePos::new(2, 2)));
        assert!(!grid.is_locked_door(TilePos::new(2, 2)));
        assert!(grid.tile(TilePos::new(2, 2)).unwrap().is_transparent());
        assert_eq!(grid.topology_version(), before + 1);

        assert!(!grid.unlock_door(TilePos::new(2, 2)));
        assert_eq!(grid.topology_version(), before + 1);
    }

    #[test]
    fn test_reservation_is_exclusive() {
        let mut grid = Grid::open(5, 5);
        let pos = TilePos::new(1, 1);
        assert!(grid.try_reserve(pos, UnitId(0)));
        assert!(!grid.try_reserve(pos, UnitId(1)));
        // Re-reserving your own claim is fine
        assert!(grid.try_reserve(pos, UnitId(0)));

        grid.release_reservation(pos, UnitId(1));
        assert_eq!(grid.reservation(pos), Some(UnitId(0)));
        grid.release_reservation(pos, UnitId(0));
        assert!(grid.try_reserve(pos, UnitId(1)));
    }

    #[test]
    fn test_cannot_reserve_occupied_tile() {
        let mut grid = Grid::open(5, 5);
        let pos = TilePos::new(3, 3);
        assert!(grid.occupy(pos, UnitId(0)));
        assert!(!grid.try_reserve(pos, UnitId(1)));
        assert!(!grid.occupy(pos, UnitId(1)));
        grid.vacate(pos, UnitId(0));
        assert!(grid.try_reserve(pos, UnitId(1)));
    }

    #[test]
    fn test_cannot_reserve_wall() {
        let mut grid = Grid::open(5, 5);
        grid.set_tile(TilePos::new(1, 1), TileType::Wall);
        assert!(!grid.try_reserve(TilePos::new(1, 1), UnitId(0)));
    }

    #[test]
    fn test_occupied_by_others() {
        let mut grid = Grid::open(5, 5);
        grid.occupy(TilePos::new(0, 0), UnitId(0));
        grid.occupy(TilePos::new(1, 0), UnitId(1));
        let others = grid.occupied_by_others(UnitId(0));
        assert_eq!(others.len(), 1);
        assert!(others.contains(&TilePos::new(1, 0)));
    }

    #[test]
    fn test_approach_tile_for_wall_mounted_target() {
        let mut grid = Grid::open(6, 6);
        grid.set_tile(TilePos::new(3, 0), TileType::Wall);
        let approach = grid.approach_tile(TilePos::new(3, 0), TilePos::new(0, 0)).unwrap();
        assert!(grid.is_walkable(approach));
        assert!(approach.is_adjacent(&TilePos::new(3, 0)));
        assert_eq!(approach, TilePos::new(2, 0));
    }
}
