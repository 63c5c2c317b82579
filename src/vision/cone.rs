//! Vision cones and per-target detection meters
//!
//! A target is visible when it is inside the cone arc, the ray to it is
//! clear, and it is not sneaking behind cover. Each target has its own meter
//! that fills while visible and decays otherwise.

use ahash::AHashMap;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::core::types::{TilePos, UnitId};
use crate::grid::los::{line_of_sight, LineOfSight};
use crate::grid::map::Grid;
use crate::threat::ZoneModifiers;

/// How aware an observer is of one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum AwarenessState {
    #[default]
    Unaware,
    Suspicious,
    Detected,
}

impl AwarenessState {
    pub fn from_value(value: f32, suspicious: f32, detected: f32) -> Self {
        if value >= detected {
            AwarenessState::Detected
        } else if value >= suspicious {
            AwarenessState::Suspicious
        } else {
            AwarenessState::Unaware
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectionMeter {
    /// Always within [0, 1]
    pub value: f32,
    pub state: AwarenessState,
}

/// Thresholds and rates shared by every meter update
#[derive(Debug, Clone, Copy)]
pub struct DetectionParams {
    pub decay_rate: f32,
    pub suspicious_threshold: f32,
    pub detected_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct VisionCone {
    pub origin: TilePos,
    /// Degrees; 0 points along +x, 90 along +y
    pub facing: f32,
    pub base_fov: f32,
    pub base_range: f32,
    pub base_rate: f32,
    pub fov: f32,
    pub range: f32,
    /// Meter gain per second at point-blank range
    pub rate: f32,
    meters: AHashMap<UnitId, DetectionMeter>,
}

impl VisionCone {
    pub fn new(origin: TilePos, facing: f32, fov: f32, range: f32, rate: f32) -> Self {
        Self {
            origin,
            facing,
            base_fov: fov,
            base_range: range,
            base_rate: rate,
            fov,
            range,
            rate,
            meters: AHashMap::new(),
        }
    }

    /// Re-derive effective fov and rate from the base values
    pub fn apply_modifiers(&mut self, modifiers: ZoneModifiers) {
        self.fov = (self.base_fov + modifiers.fov_bonus).clamp(0.0, 360.0);
        self.rate = self.base_rate * modifiers.detection_multiplier;
        self.range = self.base_range;
    }

    /// Distance and angular test between tile centres
    pub fn check_cone_arc(&self, target: TilePos) -> bool {
        let offset = target.center() - self.origin.center();
        let distance = offset.length();
        if distance > self.range {
            return false;
        }
        if distance <= f32::EPSILON {
            return true;
        }
        let bearing = offset.y.atan2(offset.x).to_degrees();
        angle_difference(bearing, self.facing).abs() <= self.fov / 2.0
    }

    pub fn check_line_of_sight(&self, grid: &Grid, target: TilePos) -> LineOfSight {
        line_of_sight(grid, self.origin, target)
    }

    /// Distance to the target when it can be seen, `None` otherwise
    pub fn visible_distance(&self, grid: &Grid, target: TilePos, sneaking: bool) -> Option<f32> {
        if !self.check_cone_arc(target) {
            return None;
        }
        let los = self.check_line_of_sight(grid, target);
        if !los.clear || (los.through_cover && sneaking) {
            return None;
        }
        Some(target.center().distance(self.origin.center()))
    }

    /// Advance one target's meter. Returns the new state when it changed.
    pub fn update_detection(
        &mut self,
        target: UnitId,
        visible_distance: Option<f32>,
        stance_multiplier: f32,
        params: &DetectionParams,
        dt: f32,
    ) -> Option<AwarenessState> {
        let range = self.range.max(f32::EPSILON);
        let rate = self.rate;
        let meter = self.meters.entry(target).or_default();

        match visible_distance {
            Some(distance) => {
                let falloff = 1.0 - 0.5 * (distance / range).min(1.0);
                meter.value += rate * falloff * stance_multiplier * dt;
            }
            None => meter.value -= params.decay_rate * dt,
        }
        meter.value = meter.value.clamp(0.0, 1.0);

        let state = AwarenessState::from_value(
            meter.value,
            params.suspicious_threshold,
            params.detected_threshold,
        );
        if state != meter.state {
            meter.state = state;
            Some(state)
        } else {
            None
        }
    }

    pub fn meter(&self, target: UnitId) -> DetectionMeter {
        self.meters.get(&target).copied().unwrap_or_default()
    }

    pub fn detection(&self, target: UnitId) -> f32 {
        self.meter(target).value
    }

    /// Forget a target (captured or extracted)
    pub fn forget(&mut self, target: UnitId) {
        self.meters.remove(&target);
    }
}

/// Signed difference `a - b` wrapped to [-180, 180]
pub fn angle_difference(a: f32, b: f32) -> f32 {
    let mut diff = (a - b) % 360.0;
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff < -180.0 {
        diff += 360.0;
    }
    diff
}

/// Facing in degrees for a movement direction
pub fn facing_of(direction: Vec2) -> Option<f32> {
    if direction.length_squared() <= f32::EPSILON {
        None
    } else {
        Some(direction.y.atan2(direction.x).to_degrees())
    }
}
