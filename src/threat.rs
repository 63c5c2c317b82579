//! Global threat clock and escalation zones
//!
//! Elapsed heist time maps onto four zones. The current zone only ever goes
//! up: time bonuses wind the clock back but never de-escalate.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::config::ThreatConfig;
use crate::signals;

/// Discrete escalation tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum ThreatZone {
    #[default]
    Casual,
    Alert,
    Lockdown,
    Swat,
}

impl ThreatZone {
    pub const ALL: [ThreatZone; 4] = [
        ThreatZone::Casual,
        ThreatZone::Alert,
        ThreatZone::Lockdown,
        ThreatZone::Swat,
    ];

    pub fn index(&self) -> usize {
        match self {
            ThreatZone::Casual => 0,
            ThreatZone::Alert => 1,
            ThreatZone::Lockdown => 2,
            ThreatZone::Swat => 3,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(3)]
    }

    /// Zone whose threshold `elapsed` has reached
    pub fn for_elapsed(elapsed: f32, thresholds: &[f32; 4]) -> Self {
        let mut zone = ThreatZone::Casual;
        for candidate in Self::ALL {
            if elapsed >= thresholds[candidate.index()] {
                zone = candidate;
            }
        }
        zone
    }

    /// Signal emitted when this zone is entered
    pub fn signal(&self) -> Option<&'static str> {
        match self {
            ThreatZone::Casual => None,
            ThreatZone::Alert => Some(signals::THREAT_ALERT),
            ThreatZone::Lockdown => Some(signals::THREAT_LOCKDOWN),
            ThreatZone::Swat => Some(signals::THREAT_SWAT),
        }
    }
}

impl fmt::Display for ThreatZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThreatZone::Casual => "casual",
            ThreatZone::Alert => "alert",
            ThreatZone::Lockdown => "lockdown",
            ThreatZone::Swat => "swat",
        };
        write!(f, "{}", name)
    }
}

/// Modifier bundle applied to every observer while a zone is active
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneModifiers {
    /// 1 (slowest) to 4 (fastest)
    pub guard_speed_tier: u8,
    /// Degrees added to the base field of view
    pub fov_bonus: f32,
    /// Multiplier on the base detection rate
    pub detection_multiplier: f32,
}

impl Default for ZoneModifiers {
    fn default() -> Self {
        Self {
            guard_speed_tier: 1,
            fov_bonus: 0.0,
            detection_multiplier: 1.0,
        }
    }
}

type EscalationListener = Box<dyn FnMut(ThreatZone, f32)>;

pub struct ThreatClock {
    elapsed: f32,
    zone: ThreatZone,
    paused: bool,
    config: ThreatConfig,
    listeners: Vec<EscalationListener>,
}

impl fmt::Debug for ThreatClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreatClock")
            .field("elapsed", &self.elapsed)
            .field("zone", &self.zone)
            .field("paused", &self.paused)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ThreatClock {
    pub fn new(config: ThreatConfig) -> Self {
        Self {
            elapsed: 0.0,
            zone: ThreatZone::Casual,
            paused: false,
            config,
            listeners: Vec::new(),
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn zone(&self) -> ThreatZone {
        self.zone
    }

    pub fn modifiers(&self) -> ZoneModifiers {
        self.config.modifiers(self.zone)
    }

    pub fn guard_speed(&self) -> f32 {
        self.config.guard_speed(self.modifiers().guard_speed_tier)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Called once per zone crossing with the new zone and elapsed time
    pub fn on_escalation(&mut self, listener: impl FnMut(ThreatZone, f32) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Advance by `dt` seconds unless paused. Returns every zone entered, in
    /// order (a big jump can cross several).
    pub fn advance(&mut self, dt: f32) -> Vec<ThreatZone> {
        if self.paused || dt <= 0.0 {
            return Vec::new();
        }
        self.elapsed += dt;
        self.escalate()
    }

    /// Push elapsed time forward; may escalate even while paused
    pub fn add_penalty(&mut self, seconds: f32) -> Vec<ThreatZone> {
        if seconds <= 0.0 {
            return Vec::new();
        }
        self.elapsed += seconds;
        info!("threat penalty +{:.1}s (elapsed {:.1}s)", seconds, self.elapsed);
        self.escalate()
    }

    /// Wind elapsed time back. The zone never drops.
    pub fn add_bonus(&mut self, seconds: f32) {
        if seconds <= 0.0 {
            return;
        }
        self.elapsed = (self.elapsed - seconds).max(0.0);
        info!("threat bonus -{:.1}s (elapsed {:.1}s)", seconds, self.elapsed);
    }

    fn escalate(&mut self) -> Vec<ThreatZone> {
        let target = ThreatZone::for_elapsed(self.elapsed, &self.config.thresholds);
        let mut entered = Vec::new();
        while self.zone < target {
            self.zone = ThreatZone::from_index(self.zone.index() + 1);
            info!("threat escalated to {} at {:.1}s", self.zone, self.elapsed);
            for listener in self.listeners.iter_mut() {
                listener(self.zone, self.elapsed);
            }
            entered.push(self.zone);
        }
        entered
    }

    /// Back to zero, Casual, running
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
        self.zone = ThreatZone::Casual;
        self.paused = false;
    }
}
