//! Simulation configuration with documented constants
//!
//! All tunables are collected here with explanations of their purpose and how
//! they interact. A TOML file may override any subset of fields; missing
//! fields fall back to the defaults below.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{HeistError, Result};
use crate::threat::{ThreatZone, ZoneModifiers};

/// Configuration for the simulation systems
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TIME ===
    /// Length of one simulation tick in seconds
    pub tick_seconds: f32,

    /// Seed for interaction skill checks
    ///
    /// Same seed + same building + same commands = same heist.
    pub rng_seed: u64,

    // === MOVEMENT ===
    /// Crew speed while sneaking (tiles per second)
    pub sneak_speed: f32,
    /// Crew speed while walking (tiles per second)
    pub walk_speed: f32,
    /// Crew speed while running (tiles per second)
    pub run_speed: f32,

    /// Distance to a tile centre under which a unit snaps onto the tile
    ///
    /// Must be smaller than the distance covered in one tick at the slowest
    /// stance, otherwise units hover around the centre without arriving.
    pub arrival_snap_distance: f32,

    /// Seconds between reservation attempts while waiting on a blocked tile
    pub reservation_retry_interval: f32,

    /// Seconds a unit waits on a blocked tile before asking for a reroute
    pub reservation_wait_timeout: f32,

    /// Failed path searches and reroutes tolerated before a unit reports itself blocked
    pub max_path_retries: u32,

    /// Seconds between path attempts once a unit is blocked
    pub blocked_retry_interval: f32,

    /// Path searches solved per tick; the rest stay queued
    pub path_budget_per_tick: usize,

    // === DETECTION ===
    /// Meter loss per second while a target is out of sight
    pub detection_decay_rate: f32,
    /// Meter value at which an observer becomes suspicious
    pub suspicious_threshold: f32,
    /// Meter value at which a target counts as detected
    pub detected_threshold: f32,
    /// Detection gain multiplier while sneaking
    pub sneak_detection_multiplier: f32,
    /// Detection gain multiplier while walking
    pub walk_detection_multiplier: f32,
    /// Detection gain multiplier while running
    pub run_detection_multiplier: f32,

    /// Radius (tiles) within which the crew reveals tiles for fog of war
    pub crew_sight_radius: i32,

    /// Guards within this distance (tiles) of a detected unit capture it
    pub capture_range: f32,

    /// Detection triggers a crew-wide SCRAM
    pub scram_on_detection: bool,

    /// Seconds added to the threat clock on each detection
    pub detection_penalty_seconds: f32,

    // === INTERACTION ===
    /// Seconds added to the threat clock for each failed skill check
    pub failed_check_penalty_seconds: f32,
    /// Attempts before an interaction objective fails
    pub max_interaction_attempts: u32,
    /// Unlock time for doors that do not specify one (seconds)
    pub default_unlock_duration: f32,

    // === ECONOMY ===
    /// Intel available for sector purchases at heist start
    pub starting_intel: u32,
    /// Cash available for arrangement purchases at heist start
    pub starting_cash: u32,

    // === THREAT ===
    pub threat: ThreatConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 0.1,
            rng_seed: 0x5eed,

            // Sneak is half of walk; run nearly doubles it
            sneak_speed: 1.5,
            walk_speed: 3.0,
            run_speed: 5.0,
            arrival_snap_distance: 0.05,

            reservation_retry_interval: 0.25,
            reservation_wait_timeout: 2.0,
            max_path_retries: 3,
            blocked_retry_interval: 2.0,
            path_budget_per_tick: 8,

            detection_decay_rate: 0.2,
            suspicious_threshold: 0.5,
            detected_threshold: 1.0,
            sneak_detection_multiplier: 0.5,
            walk_detection_multiplier: 1.0,
            run_detection_multiplier: 2.0,

            crew_sight_radius: 6,
            capture_range: 1.5,
            scram_on_detection: true,
            detection_penalty_seconds: 30.0,

            failed_check_penalty_seconds: 5.0,
            max_interaction_attempts: 3,
            default_unlock_duration: 3.0,

            starting_intel: 0,
            starting_cash: 0,

            threat: ThreatConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document, filling unspecified fields with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.tick_seconds <= 0.0 {
            return Err(HeistError::InvalidConfig("tick_seconds must be positive".into()));
        }

        if self.sneak_speed <= 0.0 || self.walk_speed <= 0.0 || self.run_speed <= 0.0 {
            return Err(HeistError::InvalidConfig("stance speeds must be positive".into()));
        }

        // A unit must be able to land inside the snap radius in one tick
        let slowest_step = self.sneak_speed.min(self.walk_speed).min(self.run_speed) * self.tick_seconds;
        if self.arrival_snap_distance <= 0.0 || self.arrival_snap_distance >= 0.5 {
            return Err(HeistError::InvalidConfig(format!(
                "arrival_snap_distance ({}) must be in (0, 0.5)",
                self.arrival_snap_distance
            )));
        }
        if slowest_step > 1.0 {
            return Err(HeistError::InvalidConfig(format!(
                "slowest stance covers {:.2} tiles per tick; tiles would be skipped",
                slowest_step
            )));
        }

        if self.suspicious_threshold >= self.detected_threshold {
            return Err(HeistError::InvalidConfig(format!(
                "suspicious_threshold ({}) should be < detected_threshold ({})",
                self.suspicious_threshold, self.detected_threshold
            )));
        }
        if self.detected_threshold > 1.0 || self.suspicious_threshold <= 0.0 {
            return Err(HeistError::InvalidConfig(
                "detection thresholds must lie in (0, 1]".into(),
            ));
        }

        if self.detection_decay_rate <= 0.0 {
            return Err(HeistError::InvalidConfig("detection_decay_rate must be positive".into()));
        }

        if self.path_budget_per_tick == 0 {
            return Err(HeistError::InvalidConfig("path_budget_per_tick must be at least 1".into()));
        }

        self.threat.validate()
    }
}

/// Threat clock thresholds and per-zone modifier bundles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreatConfig {
    /// Elapsed seconds at which Casual, Alert, Lockdown and Swat begin
    pub thresholds: [f32; 4],
    pub casual: ZoneModifiers,
    pub alert: ZoneModifiers,
    pub lockdown: ZoneModifiers,
    pub swat: ZoneModifiers,
    /// Guard walking speed (tiles per second) for speed tiers 1 to 4
    pub guard_speeds: [f32; 4],
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            thresholds: [0.0, 60.0, 120.0, 180.0],
            casual: ZoneModifiers {
                guard_speed_tier: 1,
                fov_bonus: 0.0,
                detection_multiplier: 1.0,
            },
            alert: ZoneModifiers {
                guard_speed_tier: 2,
                fov_bonus: 10.0,
                detection_multiplier: 1.25,
            },
            lockdown: ZoneModifiers {
                guard_speed_tier: 3,
                fov_bonus: 20.0,
                detection_multiplier: 1.5,
            },
            swat: ZoneModifiers {
                guard_speed_tier: 4,
                fov_bonus: 30.0,
                detection_multiplier: 2.0,
            },
            guard_speeds: [1.0, 1.5, 2.0, 2.5],
        }
    }
}

impl ThreatConfig {
    /// Modifier bundle for a zone
    pub fn modifiers(&self, zone: ThreatZone) -> ZoneModifiers {
        match zone {
            ThreatZone::Casual => self.casual,
            ThreatZone::Alert => self.alert,
            ThreatZone::Lockdown => self.lockdown,
            ThreatZone::Swat => self.swat,
        }
    }

    /// Elapsed time at which a zone begins
    pub fn threshold(&self, zone: ThreatZone) -> f32 {
        self.thresholds[zone.index()]
    }

    /// Guard speed for a tier (tiers outside 1-4 are clamped)
    pub fn guard_speed(&self, tier: u8) -> f32 {
        let idx = (tier.clamp(1, 4) - 1) as usize;
        self.guard_speeds[idx]
    }

    pub fn validate(&self) -> Result<()> {
        if self.thresholds[0] != 0.0 {
            return Err(HeistError::InvalidConfig("first threat threshold must be 0".into()));
        }
        if self.thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(HeistError::InvalidConfig(
                "threat thresholds must be strictly increasing".into(),
            ));
        }
        if self.guard_speeds.iter().any(|s| *s <= 0.0) {
            return Err(HeistError::InvalidConfig("guard speeds must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let mut config = SimulationConfig::default();
        config.suspicious_threshold = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_threat_thresholds_must_increase() {
        let mut config = SimulationConfig::default();
        config.threat.thresholds = [0.0, 60.0, 60.0, 180.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_overrides_defaults() {
        let toml = r#"
            walk_speed = 2.5
            scram_on_detection = false

            [threat]
            thresholds = [0.0, 30.0, 90.0, 150.0]
        "#;
        let config = SimulationConfig::from_toml_str(toml).expect("valid config");
        assert_eq!(config.walk_speed, 2.5);
        assert!(!config.scram_on_detection);
        assert_eq!(config.threat.thresholds[1], 30.0);
        // Untouched fields keep defaults
        assert_eq!(config.run_speed, 5.0);
        assert_eq!(config.threat.alert.guard_speed_tier, 2);
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(SimulationConfig::from_toml_str("tick_seconds = -1.0").is_err());
        assert!(SimulationConfig::from_toml_str("tick_seconds = \"fast\"").is_err());
    }

    #[test]
    fn test_guard_speed_tiers() {
        let threat = ThreatConfig::default();
        assert_eq!(threat.guard_speed(1), 1.0);
        assert_eq!(threat.guard_speed(4), 2.5);
        assert_eq!(threat.guard_speed(9), 2.5);
        assert_eq!(threat.guard_speed(0), 1.0);
    }
}
