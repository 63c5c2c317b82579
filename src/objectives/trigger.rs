//! Trigger conditions gating objective start and Hold release

use serde::{Deserialize, Serialize};

use crate::core::types::SimTime;
use crate::signals::SignalBus;
use crate::threat::ThreatZone;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// A named signal has been emitted
    Signal(String),
    AllOf(Vec<Trigger>),
    AnyOf(Vec<Trigger>),
    /// Heist time in seconds
    ElapsedAtLeast(f32),
    ThreatAtLeast(ThreatZone),
}

/// State a trigger is evaluated against
#[derive(Debug, Clone, Copy)]
pub struct TriggerContext<'a> {
    pub signals: &'a SignalBus,
    pub elapsed: SimTime,
    pub zone: ThreatZone,
}

impl Trigger {
    pub fn signal(id: impl Into<String>) -> Self {
        Trigger::Signal(id.into())
    }

    pub fn evaluate(&self, ctx: &TriggerContext) -> bool {
        match self {
            Trigger::Signal(id) => ctx.signals.check(id),
            Trigger::AllOf(all) => all.iter().all(|t| t.evaluate(ctx)),
            Trigger::AnyOf(any) => any.iter().any(|t| t.evaluate(ctx)),
            Trigger::ElapsedAtLeast(seconds) => ctx.elapsed >= *seconds,
            Trigger::ThreatAtLeast(zone) => ctx.zone >= *zone,
        }
    }
}
