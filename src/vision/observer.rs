//! Guards and cameras: things that carry a vision cone

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::types::{ObserverId, TilePos};
use crate::vision::cone::{facing_of, VisionCone};

/// Default meter gain per second at point-blank range
pub const DEFAULT_DETECTION_RATE: f32 = 0.8;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ObserverKind {
    /// Walks its patrol route in a loop; an empty route means it stands still
    Guard { patrol: Vec<TilePos> },
    /// Fixed position, facing sweeps +/- `sweep` degrees around the base facing
    Camera { sweep: f32, sweep_speed: f32 },
}

#[derive(Debug, Clone)]
pub struct Observer {
    pub id: ObserverId,
    pub name: String,
    pub kind: ObserverKind,
    pub world_pos: Vec2,
    pub cone: VisionCone,
    base_facing: f32,
    patrol_index: usize,
    sweep_offset: f32,
    sweep_direction: f32,
}

impl Observer {
    pub fn guard(
        id: ObserverId,
        name: impl Into<String>,
        pos: TilePos,
        cone: VisionCone,
        patrol: Vec<TilePos>,
    ) -> Self {
        Self::with_kind(id, name, pos, cone, ObserverKind::Guard { patrol })
    }

    pub fn camera(
        id: ObserverId,
        name: impl Into<String>,
        pos: TilePos,
        cone: VisionCone,
        sweep: f32,
        sweep_speed: f32,
    ) -> Self {
        Self::with_kind(id, name, pos, cone, ObserverKind::Camera { sweep, sweep_speed })
    }

    fn with_kind(
        id: ObserverId,
        name: impl Into<String>,
        pos: TilePos,
        mut cone: VisionCone,
        kind: ObserverKind,
    ) -> Self {
        cone.origin = pos;
        Self {
            id,
            name: name.into(),
            base_facing: cone.facing,
            kind,
            world_pos: pos.center(),
            cone,
            patrol_index: 0,
            sweep_offset: 0.0,
            sweep_direction: 1.0,
        }
    }

    pub fn is_guard(&self) -> bool {
        matches!(self.kind, ObserverKind::Guard { .. })
    }

    pub fn tile(&self) -> TilePos {
        TilePos::from_world(self.world_pos)
    }

    /// Move along the patrol or sweep the camera. `guard_speed` is in tiles
    /// per second.
    pub fn update(&mut self, guard_speed: f32, dt: f32) {
        match &self.kind {
            ObserverKind::Guard { patrol } => {
                if patrol.is_empty() {
                    return;
                }
                let mut budget = guard_speed * dt;
                // A zero-length leg must not stall the loop forever
                for _ in 0..patrol.len() + 1 {
                    if budget <= 0.0 {
                        break;
                    }
                    let waypoint = patrol[self.patrol_index % patrol.len()].center();
                    let offset = waypoint - self.world_pos;
                    let distance = offset.length();
                    if let Some(facing) = facing_of(offset) {
                        self.cone.facing = facing;
                    }
                    if distance <= budget {
                        self.world_pos = waypoint;
                        budget -= distance;
                        self.patrol_index = (self.patrol_index + 1) % patrol.len();
                    } else {
                        self.world_pos += offset / distance * budget;
                        budget = 0.0;
                    }
                }
                self.cone.origin = TilePos::from_world(self.world_pos);
            }
            ObserverKind::Camera { sweep, sweep_speed } => {
                if *sweep <= 0.0 || *sweep_speed <= 0.0 {
                    return;
                }
                self.sweep_offset += self.sweep_direction * sweep_speed * dt;
                if self.sweep_offset > *sweep {
                    self.sweep_offset = *sweep;
                    self.sweep_direction = -1.0;
                } else if self.sweep_offset < -sweep {
                    self.sweep_offset = -sweep;
                    self.sweep_direction = 1.0;
                }
                self.cone.facing = self.base_facing + self.sweep_offset;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cone() -> VisionCone {
        VisionCone::new(TilePos::new(0, 0), 0.0, 90.0, 5.0, DEFAULT_DETECTION_RATE)
    }

    #[test]
    fn test_guard_walks_patrol_loop() {
        let mut guard = Observer::guard(
            ObserverId(0),
            "Rook",
            TilePos::new(0, 0),
            cone(),
            vec![TilePos::new(4, 0), TilePos::new(0, 0)],
        );
        for _ in 0..20 {
            guard.update(1.0, 0.1);
        }
        assert_eq!(guard.tile(), TilePos::new(2, 0));
        assert_eq!(guard.cone.origin, TilePos::new(2, 0));
        assert!(guard.cone.facing.abs() < 1e-4);

        for _ in 0..30 {
            guard.update(1.0, 0.1);
        }
        // Heading back toward (0, 0)
        assert!((guard.cone.facing.abs() - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_guard_without_patrol_stays_put() {
        let mut guard = Observer::guard(ObserverId(0), "Rook", TilePos::new(3, 3), cone(), vec![]);
        guard.update(2.0, 1.0);
        assert_eq!(guard.tile(), TilePos::new(3, 3));
    }

    #[test]
    fn test_camera_sweeps_within_bounds() {
        let mut camera = Observer::camera(ObserverId(1), "Cam", TilePos::new(0, 0), cone(), 30.0, 20.0);
        let mut max_seen: f32 = 0.0;
        let mut min_seen: f32 = 0.0;
        for _ in 0..100 {
            camera.update(1.0, 0.1);
            max_seen = max_seen.max(camera.cone.facing);
            min_seen = min_seen.min(camera.cone.facing);
        }
        assert!((max_seen - 30.0).abs() < 1e-3);
        assert!((min_seen + 30.0).abs() < 1e-3);
        assert!(!camera.is_guard());
    }
}
