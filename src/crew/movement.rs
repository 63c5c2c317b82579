//! Per-tick movement along a path with the tile reservation protocol
//!
//! A unit reserves the next tile before stepping onto it. If the tile is
//! contested it waits, retrying on a fixed interval, and asks for a reroute
//! once the wait times out.

use tracing::debug;

use crate::core::config::SimulationConfig;
use crate::core::types::TilePos;
use crate::crew::unit::Unit;
use crate::grid::map::Grid;

/// Outcome of one movement update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStatus {
    /// Reached the last tile of the path this tick
    Arrived,
    /// Moving toward the reserved tile
    InTransit,
    /// Next tile is contested; still within the wait timeout
    Waiting,
    /// Next tile unusable or the wait timed out; the path was dropped
    NeedsReroute,
    /// Next tile is a locked door; the path is kept
    LockedDoor(TilePos),
    /// No path to follow
    Idle,
}

/// Advance a unit along its path by `dt` seconds
pub fn advance_movement(
    unit: &mut Unit,
    grid: &mut Grid,
    config: &SimulationConfig,
    dt: f32,
) -> MoveStatus {
    if unit.is_terminal() {
        return MoveStatus::Idle;
    }

    let target = match unit.reserved {
        Some(target) => target,
        None => match claim_next_tile(unit, grid, config, dt) {
            Ok(target) => target,
            Err(status) => return status,
        },
    };

    let speed = unit.stance.speed(config) / grid.movement_cost(target).max(1.0);
    let goal = target.center();
    let offset = goal - unit.world_pos();
    let distance = offset.length();
    let step = speed * dt;

    if distance - step <= config.arrival_snap_distance {
        unit.cross_tile_boundary(grid, target);
        unit.path.pop_front();
        if unit.path.is_empty() {
            MoveStatus::Arrived
        } else {
            MoveStatus::InTransit
        }
    } else {
        let next = unit.world_pos() + offset / distance * step;
        unit.set_world_pos(next);
        MoveStatus::InTransit
    }
}

/// Reserve the next path tile. Returns the reserved tile or the status to
/// report when no step can start.
fn claim_next_tile(
    unit: &mut Unit,
    grid: &mut Grid,
    config: &SimulationConfig,
    dt: f32,
) -> Result<TilePos, MoveStatus> {
    while unit.path.front() == Some(&unit.grid_pos()) {
        unit.path.pop_front();
    }
    let Some(&next) = unit.path.front() else {
        return Err(MoveStatus::Idle);
    };

    if !next.is_adjacent(&unit.grid_pos()) || !grid.is_walkable(next) {
        debug!("unit {:?} path broken at {:?}", unit.id, next);
        unit.stop(grid);
        return Err(MoveStatus::NeedsReroute);
    }
    if grid.is_locked_door(next) {
        return Err(MoveStatus::LockedDoor(next));
    }

    if unit.retry_timer > 0.0 {
        unit.retry_timer -= dt;
        return wait_or_reroute(unit, grid, config, dt);
    }

    if grid.try_reserve(next, unit.id) {
        unit.reserved = Some(next);
        unit.wait_elapsed = 0.0;
        unit.retry_timer = 0.0;
        Ok(next)
    } else {
        unit.retry_timer = config.reservation_retry_interval;
        wait_or_reroute(unit, grid, config, dt)
    }
}

fn wait_or_reroute(
    unit: &mut Unit,
    grid: &mut Grid,
    config: &SimulationConfig,
    dt: f32,
) -> Result<TilePos, MoveStatus> {
    unit.wait_elapsed += dt;
    if unit.wait_elapsed >= config.reservation_wait_timeout {
        debug!(
            "unit {:?} gave up waiting after {:.2}s",
            unit.id, unit.wait_elapsed
        );
        unit.stop(grid);
        Err(MoveStatus::NeedsReroute)
    } else {
        Err(MoveStatus::Waiting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::UnitId;
    use crate::grid::tile::{Terrain, TileType};

    fn setup(path: &[(i32, i32)]) -> (Grid, Unit, SimulationConfig) {
        let mut grid = Grid::open(10, 10);
        let mut unit = Unit::new(UnitId(0), "Ace", TilePos::new(0, 0));
        unit.spawn(&mut grid);
        unit.set_path(&mut grid, path.iter().map(|&p| p.into()).collect());
        (grid, unit, SimulationConfig::default())
    }

    fn run_until_arrival(grid: &mut Grid, unit: &mut Unit, config: &SimulationConfig) -> usize {
        for tick in 1..1000 {
            if advance_movement(unit, grid, config, config.tick_seconds) == MoveStatus::Arrived {
                return tick;
            }
        }
        panic!("never arrived");
    }

    #[test]
    fn test_walks_to_end_of_path() {
        let (mut grid, mut unit, config) = setup(&[(1, 0), (2, 0), (3, 0)]);
        run_until_arrival(&mut grid, &mut unit, &config);
        assert_eq!(unit.grid_pos(), TilePos::new(3, 0));
        assert_eq!(grid.occupant(TilePos::new(3, 0)), Some(unit.id));
        assert_eq!(grid.occupant(TilePos::new(0, 0)), None);
    }

    #[test]
    fn test_grid_pos_changes_only_at_boundary() {
        let (mut grid, mut unit, config) = setup(&[(1, 0)]);
        let status = advance_movement(&mut unit, &mut grid, &config, config.tick_seconds);
        assert_eq!(status, MoveStatus::InTransit);
        assert_eq!(unit.grid_pos(), TilePos::new(0, 0));
        assert!(unit.world_pos().x > 0.5);
        assert_eq!(grid.reservation(TilePos::new(1, 0)), Some(unit.id));
    }

    #[test]
    fn test_run_is_faster_than_sneak() {
        let (mut grid, mut unit, config) = setup(&[(1, 0), (2, 0), (3, 0), (4, 0)]);
        unit.stance = crate::crew::unit::Stance::Sneak;
        let sneak_ticks = run_until_arrival(&mut grid, &mut unit, &config);

        let (mut grid, mut unit, config) = setup(&[(1, 0), (2, 0), (3, 0), (4, 0)]);
        unit.stance = crate::crew::unit::Stance::Run;
        let run_ticks = run_until_arrival(&mut grid, &mut unit, &config);

        assert!(run_ticks < sneak_ticks);
    }

    #[test]
    fn test_heavy_terrain_slows_movement() {
        let (mut grid, mut unit, config) = setup(&[(1, 0), (2, 0)]);
        let fast = run_until_arrival(&mut grid, &mut unit, &config);

        let (mut grid, mut unit, config) = setup(&[(1, 0), (2, 0)]);
        grid.set_terrain(TilePos::new(1, 0), Terrain::Gravel);
        grid.set_terrain(TilePos::new(2, 0), Terrain::Gravel);
        let slow = run_until_arrival(&mut grid, &mut unit, &config);

        assert!(slow > fast);
    }

    #[test]
    fn test_waits_on_contested_tile_then_reroutes() {
        let (mut grid, mut unit, config) = setup(&[(1, 0), (2, 0)]);
        grid.occupy(TilePos::new(1, 0), UnitId(9));

        assert_eq!(
            advance_movement(&mut unit, &mut grid, &config, config.tick_seconds),
            MoveStatus::Waiting
        );

        let mut status = MoveStatus::Waiting;
        for _ in 0..100 {
            status = advance_movement(&mut unit, &mut grid, &config, config.tick_seconds);
            if status != MoveStatus::Waiting {
                break;
            }
        }
        assert_eq!(status, MoveStatus::NeedsReroute);
        assert!(unit.path.is_empty());
        assert_eq!(unit.grid_pos(), TilePos::new(0, 0));
    }

    #[test]
    fn test_resumes_when_tile_frees_up() {
        let (mut grid, mut unit, config) = setup(&[(1, 0)]);
        grid.occupy(TilePos::new(1, 0), UnitId(9));
        advance_movement(&mut unit, &mut grid, &config, config.tick_seconds);
        grid.vacate(TilePos::new(1, 0), UnitId(9));

        run_until_arrival(&mut grid, &mut unit, &config);
        assert_eq!(unit.grid_pos(), TilePos::new(1, 0));
    }

    #[test]
    fn test_locked_door_halts_without_dropping_path() {
        let (mut grid, mut unit, config) = setup(&[(1, 0), (2, 0)]);
        grid.place_door(TilePos::new(1, 0), true, 3.0);
        assert_eq!(
            advance_movement(&mut unit, &mut grid, &config, config.tick_seconds),
            MoveStatus::LockedDoor(TilePos::new(1, 0))
        );
        assert_eq!(unit.path.len(), 2);
    }

    #[test]
    fn test_wall_on_path_needs_reroute() {
        let (mut grid, mut unit, config) = setup(&[(1, 0), (2, 0)]);
        grid.set_tile(TilePos::new(1, 0), TileType::Wall);
        assert_eq!(
            advance_movement(&mut unit, &mut grid, &config, config.tick_seconds),
            MoveStatus::NeedsReroute
        );
    }

    #[test]
    fn test_empty_path_is_idle() {
        let (mut grid, mut unit, config) = setup(&[]);
        assert_eq!(
            advance_movement(&mut unit, &mut grid, &config, config.tick_seconds),
            MoveStatus::Idle
        );
    }
}
