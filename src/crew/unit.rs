//! Crew units
//!
//! A unit has an integer tile position and a continuous world position. The
//! two only agree at tile centres; `cross_tile_boundary` is the single place
//! where the tile position changes.

use std::collections::VecDeque;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::config::SimulationConfig;
use crate::core::types::{TilePos, UnitId};
use crate::crew::loot::LootBag;
use crate::grid::map::Grid;
use crate::grid::path_service::PathResult;
use crate::objectives::machine::Activity;
use crate::objectives::objective::Objective;

/// Movement posture; trades speed for stealth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stance {
    Sneak,
    #[default]
    Walk,
    Run,
}

impl Stance {
    /// Tiles per second on cost-1 terrain
    pub fn speed(&self, config: &SimulationConfig) -> f32 {
        match self {
            Stance::Sneak => config.sneak_speed,
            Stance::Walk => config.walk_speed,
            Stance::Run => config.run_speed,
        }
    }

    /// Scales how fast observers fill their meter on this unit
    pub fn detection_multiplier(&self, config: &SimulationConfig) -> f32 {
        match self {
            Stance::Sneak => config.sneak_detection_multiplier,
            Stance::Walk => config.walk_detection_multiplier,
            Stance::Run => config.run_detection_multiplier,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    grid_pos: TilePos,
    world_pos: Vec2,
    pub stance: Stance,
    /// Added to d20 interaction rolls
    pub skill: i32,

    /// Remaining tiles to walk, not including the current tile
    pub path: VecDeque<TilePos>,
    /// Tile claimed for the step in progress
    pub reserved: Option<TilePos>,
    /// Seconds spent waiting on a contested tile
    pub wait_elapsed: f32,
    /// Seconds until the next reservation attempt
    pub retry_timer: f32,

    pub carried_loot: Vec<LootBag>,
    extracted: bool,
    captured: bool,

    /// Preferred extraction point id
    pub extraction: Option<String>,
    pub plan: Vec<Objective>,
    /// Index of the current objective in `plan`
    pub cursor: usize,
    pub activity: Activity,
    /// Path result delivered this tick
    pub path_inbox: Option<PathResult>,
    pub scrammed: bool,
    /// Set while a blocked episode has already been reported
    pub blocked_reported: bool,
}

impl Unit {
    pub fn new(id: UnitId, name: impl Into<String>, pos: TilePos) -> Self {
        Self {
            id,
            name: name.into(),
            grid_pos: pos,
            world_pos: pos.center(),
            stance: Stance::default(),
            skill: 0,
            path: VecDeque::new(),
            reserved: None,
            wait_elapsed: 0.0,
            retry_timer: 0.0,
            carried_loot: Vec::new(),
            extracted: false,
            captured: false,
            extraction: None,
            plan: Vec::new(),
            cursor: 0,
            activity: Activity::Idle,
            path_inbox: None,
            scrammed: false,
            blocked_reported: false,
        }
    }

    pub fn with_skill(mut self, skill: i32) -> Self {
        self.skill = skill;
        self
    }

    pub fn grid_pos(&self) -> TilePos {
        self.grid_pos
    }

    pub fn world_pos(&self) -> Vec2 {
        self.world_pos
    }

    pub(crate) fn set_world_pos(&mut self, pos: Vec2) {
        self.world_pos = pos;
    }

    pub fn is_extracted(&self) -> bool {
        self.extracted
    }

    pub fn is_captured(&self) -> bool {
        self.captured
    }

    /// Extracted or captured; nothing more happens to this unit
    pub fn is_terminal(&self) -> bool {
        self.extracted || self.captured
    }

    /// Place the unit on its spawn tile
    pub fn spawn(&mut self, grid: &mut Grid) -> bool {
        self.world_pos = self.grid_pos.center();
        grid.occupy(self.grid_pos, self.id)
    }

    /// Move the tile position from the current tile to `to`: vacate the old
    /// tile, occupy the new one and drop the reservation on it.
    pub fn cross_tile_boundary(&mut self, grid: &mut Grid, to: TilePos) -> bool {
        grid.vacate(self.grid_pos, self.id);
        let claimed = grid.occupy(to, self.id);
        if !claimed {
            warn!("unit {:?} crossed into {:?} which is occupied", self.id, to);
        }
        grid.release_reservation(to, self.id);
        if self.reserved == Some(to) {
            self.reserved = None;
        }
        self.grid_pos = to;
        self.world_pos = to.center();
        claimed
    }

    /// Replace the current path. A leading entry equal to the current tile
    /// is dropped.
    pub fn set_path(&mut self, grid: &mut Grid, path: Vec<TilePos>) {
        self.stop(grid);
        self.path = path.into_iter().collect();
        if self.path.front() == Some(&self.grid_pos) {
            self.path.pop_front();
        }
    }

    /// Drop the path and any reservation
    pub fn stop(&mut self, grid: &mut Grid) {
        if let Some(reserved) = self.reserved.take() {
            grid.release_reservation(reserved, self.id);
        }
        self.path.clear();
        self.wait_elapsed = 0.0;
        self.retry_timer = 0.0;
    }

    pub fn current_objective(&self) -> Option<&Objective> {
        self.plan.get(self.cursor)
    }

    pub fn current_objective_mut(&mut self) -> Option<&mut Objective> {
        self.plan.get_mut(self.cursor)
    }

    /// Bank carried loot and leave the map
    pub fn extract(&mut self, grid: &mut Grid) -> Vec<LootBag> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.stop(grid);
        grid.vacate(self.grid_pos, self.id);
        self.extracted = true;
        debug!("unit {:?} extracted with {} bags", self.id, self.carried_loot.len());
        self.carried_loot
            .drain(..)
            .map(|mut bag| {
                bag.extracted = true;
                bag
            })
            .collect()
    }

    /// Taken by a guard; carried loot is forfeited. Returns the forfeited
    /// bags.
    pub fn capture(&mut self, grid: &mut Grid) -> Vec<LootBag> {
        if self.is_terminal() {
            return Vec::new();
        }
        self.stop(grid);
        grid.vacate(self.grid_pos, self.id);
        self.captured = true;
        self.carried_loot
            .drain(..)
            .map(|mut bag| {
                bag.carrier = None;
                bag
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_unit_positions_agree() {
        let unit = Unit::new(UnitId(0), "Ace", TilePos::new(2, 3));
        assert_eq!(unit.grid_pos(), TilePos::new(2, 3));
        assert_eq!(unit.world_pos(), Vec2::new(2.5, 3.5));
    }

    #[test]
    fn test_cross_tile_boundary_moves_occupancy() {
        let mut grid = Grid::open(5, 5);
        let mut unit = Unit::new(UnitId(0), "Ace", TilePos::new(1, 1));
        assert!(unit.spawn(&mut grid));
        assert!(grid.try_reserve(TilePos::new(2, 1), unit.id));
        unit.reserved = Some(TilePos::new(2, 1));

        assert!(unit.cross_tile_boundary(&mut grid, TilePos::new(2, 1)));

        assert_eq!(grid.occupant(TilePos::new(1, 1)), None);
        assert_eq!(grid.occupant(TilePos::new(2, 1)), Some(unit.id));
        assert_eq!(grid.reservation(TilePos::new(2, 1)), None);
        assert_eq!(unit.reserved, None);
        assert_eq!(unit.grid_pos(), TilePos::new(2, 1));
        assert_eq!(unit.world_pos(), TilePos::new(2, 1).center());
    }

    #[test]
    fn test_set_path_drops_current_tile() {
        let mut grid = Grid::open(5, 5);
        let mut unit = Unit::new(UnitId(0), "Ace", TilePos::new(0, 0));
        unit.set_path(&mut grid, vec![TilePos::new(0, 0), TilePos::new(1, 0)]);
        assert_eq!(unit.path, VecDeque::from(vec![TilePos::new(1, 0)]));
    }

    #[test]
    fn test_stop_releases_reservation() {
        let mut grid = Grid::open(5, 5);
        let mut unit = Unit::new(UnitId(4), "Ace", TilePos::new(0, 0));
        grid.try_reserve(TilePos::new(1, 0), unit.id);
        unit.reserved = Some(TilePos::new(1, 0));
        unit.stop(&mut grid);
        assert_eq!(grid.reservation(TilePos::new(1, 0)), None);
    }

    #[test]
    fn test_extract_and_capture_are_exclusive() {
        let mut grid = Grid::open(5, 5);
        let mut unit = Unit::new(UnitId(0), "Ace", TilePos::new(0, 0));
        unit.spawn(&mut grid);
        unit.carried_loot.push(LootBag::new("safe", 100, true, unit.id));

        let banked = unit.extract(&mut grid);
        assert_eq!(banked.len(), 1);
        assert!(banked[0].extracted);
        assert!(unit.is_extracted());
        assert_eq!(grid.occupant(TilePos::new(0, 0)), None);

        assert!(unit.capture(&mut grid).is_empty());
        assert!(!unit.is_captured());
    }

    #[test]
    fn test_capture_forfeits_loot() {
        let mut grid = Grid::open(5, 5);
        let mut unit = Unit::new(UnitId(0), "Ace", TilePos::new(0, 0));
        unit.carried_loot.push(LootBag::new("safe", 100, true, unit.id));
        let lost = unit.capture(&mut grid);
        assert_eq!(lost.len(), 1);
        assert!(unit.carried_loot.is_empty());
        assert!(unit.is_captured());
        assert!(!unit.is_extracted());
    }

    #[test]
    fn test_stance_speed_ordering() {
        let config = SimulationConfig::default();
        assert!(Stance::Sneak.speed(&config) < Stance::Walk.speed(&config));
        assert!(Stance::Walk.speed(&config) < Stance::Run.speed(&config));
        assert_eq!(Stance::Sneak.detection_multiplier(&config), 0.5);
        assert_eq!(Stance::Run.detection_multiplier(&config), 2.0);
    }
}
