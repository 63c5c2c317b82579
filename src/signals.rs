//! Named signals shared across the crew
//!
//! Signals are fire-and-persist: once emitted a signal stays set (with the
//! time of its first emission) until the bus is reset for a new heist.

use std::fmt;

use ahash::AHashMap;
use tracing::debug;

use crate::core::types::SimTime;

/// Global abort: every crew member drops its plan and heads for extraction
pub const SCRAM: &str = "SCRAM";
/// Raised when any observer reaches Detected
pub const ALARM: &str = "ALARM";
pub const THREAT_ALERT: &str = "THREAT_ALERT";
pub const THREAT_LOCKDOWN: &str = "THREAT_LOCKDOWN";
pub const THREAT_SWAT: &str = "THREAT_SWAT";

type Listener = Box<dyn FnMut(&str, SimTime)>;

#[derive(Default)]
pub struct SignalBus {
    emitted: AHashMap<String, SimTime>,
    listeners: AHashMap<String, Vec<Listener>>,
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus")
            .field("emitted", &self.emitted)
            .field("listeners", &self.listeners.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal and fire its listeners. Re-emitting keeps the first
    /// timestamp and fires nothing; returns whether this was a new emission.
    pub fn emit(&mut self, id: &str, now: SimTime) -> bool {
        if self.emitted.contains_key(id) {
            return false;
        }
        self.emitted.insert(id.to_string(), now);
        debug!("signal {} emitted at {:.2}s", id, now);

        if let Some(listeners) = self.listeners.get_mut(id) {
            for listener in listeners.iter_mut() {
                listener(id, now);
            }
        }
        true
    }

    pub fn check(&self, id: &str) -> bool {
        self.emitted.contains_key(id)
    }

    pub fn emitted_at(&self, id: &str) -> Option<SimTime> {
        self.emitted.get(id).copied()
    }

    /// Register a callback for the first emission of `id`
    pub fn listen(&mut self, id: &str, listener: impl FnMut(&str, SimTime) + 'static) {
        self.listeners
            .entry(id.to_string())
            .or_default()
            .push(Box::new(listener));
    }

    /// All emitted signals ordered by emission time, then name
    pub fn emitted(&self) -> Vec<(String, SimTime)> {
        let mut all: Vec<(String, SimTime)> =
            self.emitted.iter().map(|(k, v)| (k.clone(), *v)).collect();
        all.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        all
    }

    /// Clear every signal. Listeners stay registered.
    pub fn reset(&mut self) {
        self.emitted.clear();
    }
}
