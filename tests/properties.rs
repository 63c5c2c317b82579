//! Property tests for grid, detection and threat invariants

use heist_grid::core::{ThreatConfig, TilePos, UnitId};
use heist_grid::grid::{Grid, Pathfinder, TileType};
use heist_grid::threat::{ThreatClock, ThreatZone};
use heist_grid::vision::{AwarenessState, DetectionParams, VisionCone};
use proptest::prelude::*;

fn params() -> DetectionParams {
    DetectionParams {
        decay_rate: 0.2,
        suspicious_threshold: 0.5,
        detected_threshold: 1.0,
    }
}

#[derive(Debug, Clone)]
enum ClockOp {
    Advance(f32),
    Penalty(f32),
    Bonus(f32),
}

fn clock_op() -> impl Strategy<Value = ClockOp> {
    prop_oneof![
        (0.0f32..20.0).prop_map(ClockOp::Advance),
        (0.0f32..40.0).prop_map(ClockOp::Penalty),
        (0.0f32..60.0).prop_map(ClockOp::Bonus),
    ]
}

proptest! {
    #[test]
    fn prop_open_grid_always_has_path(
        w in 2u32..24,
        h in 2u32..24,
        sx in 0i32..24, sy in 0i32..24,
        gx in 0i32..24, gy in 0i32..24,
    ) {
        let start = TilePos::new(sx % w as i32, sy % h as i32);
        let goal = TilePos::new(gx % w as i32, gy % h as i32);
        let grid = Grid::open(w, h);
        let path = Pathfinder::new(&grid).find_path(start, goal);

        let path = path.expect("open grid must be connected");
        prop_assert_eq!(path.first(), Some(&start));
        prop_assert_eq!(path.last(), Some(&goal));
        for pair in path.windows(2) {
            prop_assert!(pair[0].is_adjacent(&pair[1]));
        }
        // Diagonal shortcuts: never longer than the Chebyshev distance
        prop_assert_eq!(path.len() as i32 - 1, start.chebyshev(&goal));
    }

    #[test]
    fn prop_wall_splits_grid(
        h in 3u32..20,
        wall_x in 1i32..8,
        sy in 0i32..20,
        gy in 0i32..20,
    ) {
        let mut grid = Grid::open(10, h);
        for y in 0..h as i32 {
            grid.set_tile(TilePos::new(wall_x, y), TileType::Wall);
        }
        let start = TilePos::new(0, sy % h as i32);
        let goal = TilePos::new(9, gy % h as i32);
        prop_assert!(Pathfinder::new(&grid).find_path(start, goal).is_none());
    }

    #[test]
    fn prop_detection_meter_is_clamped_and_monotonic(
        steps in prop::collection::vec((any::<bool>(), 0.01f32..1.0, 0.0f32..5.0), 1..60),
    ) {
        let mut cone = VisionCone::new(TilePos::new(0, 0), 0.0, 90.0, 5.0, 0.8);
        let target = UnitId(1);
        for (visible, dt, distance) in steps {
            let before = cone.detection(target);
            let seen = visible.then_some(distance);
            cone.update_detection(target, seen, 2.0, &params(), dt);
            let after = cone.detection(target);

            prop_assert!((0.0..=1.0).contains(&after));
            if visible && before < 1.0 {
                prop_assert!(after > before);
            }
            if !visible && before > 0.0 {
                prop_assert!(after < before);
            }
            let expected = AwarenessState::from_value(after, 0.5, 1.0);
            prop_assert_eq!(cone.meter(target).state, expected);
        }
    }

    #[test]
    fn prop_threat_zone_never_drops(ops in prop::collection::vec(clock_op(), 1..80)) {
        let config = ThreatConfig::default();
        let mut clock = ThreatClock::new(config.clone());
        let mut previous = clock.zone();
        for op in ops {
            match op {
                ClockOp::Advance(dt) => { clock.advance(dt); }
                ClockOp::Penalty(s) => { clock.add_penalty(s); }
                ClockOp::Bonus(s) => clock.add_bonus(s),
            }
            prop_assert!(clock.zone() >= previous);
            // The zone is never behind what the elapsed time implies
            prop_assert!(clock.zone() >= ThreatZone::for_elapsed(clock.elapsed(), &config.thresholds));
            previous = clock.zone();
        }
    }

    #[test]
    fn prop_one_reservation_per_tile(
        x in 0i32..8,
        y in 0i32..8,
        a in 0u32..50,
        b in 0u32..50,
    ) {
        prop_assume!(a != b);
        let mut grid = Grid::open(8, 8);
        let pos = TilePos::new(x, y);
        let first = grid.try_reserve(pos, UnitId(a));
        let second = grid.try_reserve(pos, UnitId(b));
        prop_assert!(first);
        prop_assert!(!second);
        prop_assert_eq!(grid.reservation(pos), Some(UnitId(a)));
    }
}
