//! Deferred path requests
//!
//! Units post a request and keep ticking; the service solves a bounded number
//! of requests per tick and the heist hands the results back on the next
//! tick. A result carries the tile it was planned from so the receiver can
//! discard it if the unit has moved since.

use std::collections::VecDeque;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{TilePos, UnitId};
use crate::grid::pathfinding::Pathfinder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathRequestId(pub u64);

#[derive(Debug, Clone)]
pub struct PathRequest {
    pub id: PathRequestId,
    pub unit: UnitId,
    pub from: TilePos,
    pub to: TilePos,
    pub avoid: AHashSet<TilePos>,
}

#[derive(Debug, Clone)]
pub struct PathResult {
    pub request: PathRequestId,
    pub unit: UnitId,
    pub from: TilePos,
    pub to: TilePos,
    /// `None` when no path exists
    pub path: Option<Vec<TilePos>>,
}

/// FIFO request/response queue in front of the pathfinder
#[derive(Debug, Default)]
pub struct PathService {
    pending: VecDeque<PathRequest>,
    completed: Vec<PathResult>,
    next_id: u64,
    budget_per_tick: usize,
}

impl PathService {
    pub fn new(budget_per_tick: usize) -> Self {
        Self {
            budget_per_tick: budget_per_tick.max(1),
            ..Default::default()
        }
    }

    /// Queue a request. Any earlier unanswered request of the same unit is
    /// dropped, since a unit only waits on its latest one.
    pub fn request(
        &mut self,
        unit: UnitId,
        from: TilePos,
        to: TilePos,
        avoid: AHashSet<TilePos>,
    ) -> PathRequestId {
        self.cancel(unit);
        let id = PathRequestId(self.next_id);
        self.next_id += 1;
        self.pending.push_back(PathRequest {
            id,
            unit,
            from,
            to,
            avoid,
        });
        id
    }

    /// Drop pending requests and undelivered results for a unit
    pub fn cancel(&mut self, unit: UnitId) {
        self.pending.retain(|r| r.unit != unit);
        self.completed.retain(|r| r.unit != unit);
    }

    /// Solve up to the per-tick budget against the current snapshot
    pub fn process(&mut self, pathfinder: &Pathfinder) -> usize {
        let snapshot = pathfinder.snapshot();
        let mut solved = 0;
        while solved < self.budget_per_tick {
            let Some(request) = self.pending.pop_front() else {
                break;
            };
            let path = snapshot.find_path(request.from, request.to, &request.avoid);
            debug!(
                "path request {:?} for unit {:?}: {:?} -> {:?} ({})",
                request.id,
                request.unit,
                request.from,
                request.to,
                path.as_ref().map_or("no path".to_string(), |p| format!("{} tiles", p.len()))
            );
            self.completed.push(PathResult {
                request: request.id,
                unit: request.unit,
                from: request.from,
                to: request.to,
                path,
            });
            solved += 1;
        }
        solved
    }

    /// Take all finished results, in request order
    pub fn drain_completed(&mut self) -> Vec<PathResult> {
        std::mem::take(&mut self.completed)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn has_pending(&self, unit: UnitId) -> bool {
        self.pending.iter().any(|r| r.unit == unit) || self.completed.iter().any(|r| r.unit == unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::map::Grid;

    #[test]
    fn test_results_only_after_process() {
        let grid = Grid::open(8, 8);
        let pathfinder = Pathfinder::new(&grid);
        let mut service = PathService::new(4);

        let id = service.request(UnitId(0), TilePos::new(0, 0), TilePos::new(5, 5), AHashSet::new());
        assert!(service.drain_completed().is_empty());

        assert_eq!(service.process(&pathfinder), 1);
        let results = service.drain_completed();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].request, id);
        assert_eq!(results[0].from, TilePos::new(0, 0));
        assert!(results[0].path.is_some());
    }

    #[test]
    fn test_budget_limits_work_per_tick() {
        let grid = Grid::open(8, 8);
        let pathfinder = Pathfinder::new(&grid);
        let mut service = PathService::new(2);
        for unit in 0..5 {
            service.request(UnitId(unit), TilePos::new(0, 0), TilePos::new(7, 7), AHashSet::new());
        }

        assert_eq!(service.process(&pathfinder), 2);
        assert_eq!(service.pending_count(), 3);
        let first = service.drain_completed();
        assert_eq!(first[0].unit, UnitId(0));
        assert_eq!(first[1].unit, UnitId(1));
    }

    #[test]
    fn test_new_request_supersedes_old() {
        let grid = Grid::open(8, 8);
        let pathfinder = Pathfinder::new(&grid);
        let mut service = PathService::new(8);
        service.request(UnitId(0), TilePos::new(0, 0), TilePos::new(1, 1), AHashSet::new());
        let latest = service.request(UnitId(0), TilePos::new(0, 0), TilePos::new(6, 6), AHashSet::new());

        service.process(&pathfinder);
        let results = service.drain_completed();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].request, latest);
    }

    #[test]
    fn test_unreachable_goal_reports_no_path() {
        let grid = Grid::new(4, 4);
        let pathfinder = Pathfinder::new(&grid);
        let mut service = PathService::new(1);
        service.request(UnitId(3), TilePos::new(0, 0), TilePos::new(3, 3), AHashSet::new());
        service.process(&pathfinder);
        assert!(service.drain_completed()[0].path.is_none());
    }
}
