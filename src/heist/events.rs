//! Heist event log
//!
//! Everything an outside observer (renderer, replay, runner) needs to know
//! about state changes is reported here, once per change.

use serde::{Deserialize, Serialize};

use crate::core::types::{ObjectiveId, ObserverId, SimTime, Tick, TilePos, UnitId};
use crate::signals::SignalBus;
use crate::threat::ThreatZone;
use crate::vision::cone::AwarenessState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeistEvent {
    pub tick: Tick,
    pub time: SimTime,
    pub kind: HeistEventKind,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HeistEventKind {
    ZoneRevealed {
        zone: String,
    },
    DetectionStateChanged {
        unit: UnitId,
        observer: ObserverId,
        state: AwarenessState,
    },
    DoorUnlocked {
        pos: TilePos,
        unit: Option<UnitId>,
    },
    ObjectiveCompleted {
        unit: UnitId,
        objective: ObjectiveId,
    },
    ObjectiveAborted {
        unit: UnitId,
        objective: ObjectiveId,
    },
    ObjectiveFailed {
        unit: UnitId,
        objective: ObjectiveId,
        reason: String,
    },
    InteractionFailed {
        unit: UnitId,
        interactable: String,
        attempt: u32,
    },
    LootSecured {
        unit: UnitId,
        value: u32,
        is_score: bool,
    },
    UnitBlocked {
        unit: UnitId,
        goal: TilePos,
    },
    UnitCaptured {
        unit: UnitId,
        observer: ObserverId,
        forfeited: u32,
    },
    UnitExtracted {
        unit: UnitId,
        loot_value: u32,
    },
    ScramCalled,
    ThreatEscalated {
        zone: ThreatZone,
    },
    ArrangementPurchased {
        id: String,
    },
    ArrangementTriggered {
        id: String,
    },
    ArrangementExpired {
        id: String,
    },
    HeistOutcomeReady {
        outcome: HeistOutcome,
    },
}

/// Final report, produced once every crew member is extracted or captured
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeistOutcome {
    pub extracted: Vec<UnitId>,
    pub captured: Vec<UnitId>,
    pub score_value: u32,
    pub bonus_value: u32,
    pub elapsed: SimTime,
    pub final_zone: ThreatZone,
    /// At least one unit got out with score loot
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeistEventLog {
    pub events: Vec<HeistEvent>,
}

impl HeistEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: Tick, time: SimTime, kind: HeistEventKind, description: String) {
        self.events.push(HeistEvent {
            tick,
            time,
            kind,
            description,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HeistEvent> {
        self.events.iter()
    }

    pub fn append(&mut self, other: &mut HeistEventLog) {
        self.events.append(&mut other.events);
    }

    /// Events matching a predicate on their kind
    pub fn filter<'a>(
        &'a self,
        predicate: impl Fn(&HeistEventKind) -> bool + 'a,
    ) -> impl Iterator<Item = &'a HeistEvent> + 'a {
        self.events.iter().filter(move |e| predicate(&e.kind))
    }
}

/// Emit the zone signal and log an escalation for every zone entered
pub(crate) fn announce_escalations(
    entered: &[ThreatZone],
    signals: &mut SignalBus,
    events: &mut HeistEventLog,
    tick: Tick,
    time: SimTime,
) {
    for zone in entered {
        if let Some(signal) = zone.signal() {
            signals.emit(signal, time);
        }
        events.push(
            tick,
            time,
            HeistEventKind::ThreatEscalated { zone: *zone },
            format!("Threat escalated to {}", zone),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_announce_escalations_emits_signals() {
        let mut signals = SignalBus::new();
        let mut events = HeistEventLog::new();
        announce_escalations(
            &[ThreatZone::Alert, ThreatZone::Lockdown],
            &mut signals,
            &mut events,
            3,
            0.3,
        );
        assert!(signals.check(crate::signals::THREAT_ALERT));
        assert!(signals.check(crate::signals::THREAT_LOCKDOWN));
        assert!(!signals.check(crate::signals::THREAT_SWAT));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_filter_by_kind() {
        let mut events = HeistEventLog::new();
        events.push(0, 0.0, HeistEventKind::ScramCalled, "scram".into());
        events.push(
            1,
            0.1,
            HeistEventKind::ZoneRevealed {
                zone: "vault".into(),
            },
            "vault".into(),
        );
        let reveals: Vec<_> = events
            .filter(|k| matches!(k, HeistEventKind::ZoneRevealed { .. }))
            .collect();
        assert_eq!(reveals.len(), 1);
        assert_eq!(reveals[0].tick, 1);
    }
}
