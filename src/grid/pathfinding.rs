//! A* pathfinding over the building grid
//!
//! Searches run against an immutable cost snapshot (`CostGrid`). Refreshing
//! the pathfinder swaps in a new `Arc`, so a search holding the old snapshot
//! finishes on consistent data.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use ahash::AHashSet;
use ordered_float::OrderedFloat;

use crate::core::types::TilePos;
use crate::grid::constants::{DIAGONAL_COST, MIN_TERRAIN_COST};
use crate::grid::map::Grid;

/// Immutable per-tile entry costs. `None` marks a tile that is not a node at
/// all, which is distinct from a tile that is merely expensive.
#[derive(Debug, Clone)]
pub struct CostGrid {
    width: u32,
    height: u32,
    costs: Vec<Option<f32>>,
    version: u64,
}

impl CostGrid {
    pub fn from_grid(grid: &Grid) -> Self {
        let costs = grid
            .tiles()
            .map(|t| {
                let cost = t.movement_cost();
                if cost.is_finite() {
                    Some(cost)
                } else {
                    None
                }
            })
            .collect();

        Self {
            width: grid.width(),
            height: grid.height(),
            costs,
            version: grid.topology_version(),
        }
    }

    /// Grid topology version this snapshot was built from
    pub fn version(&self) -> u64 {
        self.version
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32 {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    fn pos_of(&self, index: usize) -> TilePos {
        TilePos::new(
            (index % self.width as usize) as i32,
            (index / self.width as usize) as i32,
        )
    }

    /// Cost of entering `pos`, `None` when it is not a node
    pub fn cost(&self, pos: TilePos) -> Option<f32> {
        self.index(pos).and_then(|i| self.costs[i])
    }

    pub fn is_node(&self, pos: TilePos) -> bool {
        self.cost(pos).is_some()
    }

    /// Cost of a single step between adjacent tiles, `None` when the step is
    /// not allowed. Diagonals are refused only when both orthogonal
    /// neighbours are non-nodes.
    pub fn step_cost(&self, from: TilePos, to: TilePos) -> Option<f32> {
        let enter = self.cost(to)?;
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        if dx != 0 && dy != 0 {
            let side_a = self.is_node(from.offset(dx, 0));
            let side_b = self.is_node(from.offset(0, dy));
            if !side_a && !side_b {
                return None;
            }
            Some(enter * DIAGONAL_COST)
        } else {
            Some(enter)
        }
    }

    /// Find the cheapest path from `start` to `goal`, both included.
    ///
    /// Tiles in `avoid` are treated as non-nodes for this search only; the
    /// start and goal are exempt. Returns `None` when no path exists.
    pub fn find_path(
        &self,
        start: TilePos,
        goal: TilePos,
        avoid: &AHashSet<TilePos>,
    ) -> Option<Vec<TilePos>> {
        let start_idx = self.index(start)?;
        let goal_idx = self.index(goal)?;
        if !self.is_node(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let len = self.costs.len();
        let mut g_scores = vec![f32::INFINITY; len];
        let mut came_from: Vec<Option<usize>> = vec![None; len];
        let mut closed = vec![false; len];
        let mut open_set = BinaryHeap::new();
        let mut sequence: u64 = 0;

        g_scores[start_idx] = 0.0;
        open_set.push(Reverse((OrderedFloat(heuristic(start, goal)), sequence, start_idx)));

        while let Some(Reverse((_, _, current_idx))) = open_set.pop() {
            if current_idx == goal_idx {
                return Some(self.reconstruct_path(&came_from, goal_idx));
            }
            if closed[current_idx] {
                continue;
            }
            closed[current_idx] = true;

            let current = self.pos_of(current_idx);
            let current_g = g_scores[current_idx];

            for neighbor in current.neighbors() {
                let Some(neighbor_idx) = self.index(neighbor) else {
                    continue;
                };
                if closed[neighbor_idx] {
                    continue;
                }
                if neighbor != goal && avoid.contains(&neighbor) {
                    continue;
                }
                let Some(step) = self.step_cost(current, neighbor) else {
                    continue;
                };

                let tentative_g = current_g + step;
                if tentative_g < g_scores[neighbor_idx] {
                    g_scores[neighbor_idx] = tentative_g;
                    came_from[neighbor_idx] = Some(current_idx);
                    sequence += 1;
                    let f_cost = tentative_g + heuristic(neighbor, goal);
                    open_set.push(Reverse((OrderedFloat(f_cost), sequence, neighbor_idx)));
                }
            }
        }

        None
    }

    fn reconstruct_path(&self, came_from: &[Option<usize>], goal_idx: usize) -> Vec<TilePos> {
        let mut path = vec![self.pos_of(goal_idx)];
        let mut current = goal_idx;
        while let Some(prev) = came_from[current] {
            path.push(self.pos_of(prev));
            current = prev;
        }
        path.reverse();
        path
    }

    /// Total step cost of a path; infinite if any step is illegal
    pub fn path_cost(&self, path: &[TilePos]) -> f32 {
        path.windows(2)
            .map(|pair| self.step_cost(pair[0], pair[1]).unwrap_or(f32::INFINITY))
            .sum()
    }
}

/// Octile distance at the cheapest terrain cost
fn heuristic(from: TilePos, to: TilePos) -> f32 {
    let dx = (from.x - to.x).abs() as f32;
    let dy = (from.y - to.y).abs() as f32;
    let (low, high) = if dx < dy { (dx, dy) } else { (dy, dx) };
    (high - low + low * DIAGONAL_COST) * MIN_TERRAIN_COST
}

/// Holds the current cost snapshot and rebuilds it when the grid changes
#[derive(Debug, Clone)]
pub struct Pathfinder {
    snapshot: Arc<CostGrid>,
}

impl Pathfinder {
    pub fn new(grid: &Grid) -> Self {
        Self {
            snapshot: Arc::new(CostGrid::from_grid(grid)),
        }
    }

    /// Rebuild the cost grid. Searches holding the previous snapshot are
    /// unaffected.
    pub fn refresh(&mut self, grid: &Grid) {
        self.snapshot = Arc::new(CostGrid::from_grid(grid));
    }

    /// Rebuild only if the grid topology changed. Returns true on rebuild.
    pub fn refresh_if_stale(&mut self, grid: &Grid) -> bool {
        if self.snapshot.version() == grid.topology_version() {
            return false;
        }
        self.refresh(grid);
        true
    }

    pub fn snapshot(&self) -> Arc<CostGrid> {
        Arc::clone(&self.snapshot)
    }

    pub fn find_path(&self, start: TilePos, goal: TilePos) -> Option<Vec<TilePos>> {
        self.snapshot.find_path(start, goal, &AHashSet::new())
    }

    pub fn find_path_avoiding(
        &self,
        start: TilePos,
        goal: TilePos,
        avoid: &AHashSet<TilePos>,
    ) -> Option<Vec<TilePos>> {
        self.snapshot.find_path(start, goal, avoid)
    }
}
