//! Pre-heist arrangements: bought with cash, applied to the map
//!
//! Static modifiers and placed items take effect once, at purchase.
//! Triggered abilities are bought first and fired later, spending one use
//! per trigger. Timed effects end at a deadline in simulation time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::PurchaseError;
use crate::core::types::{SimTime, TilePos};
use crate::economy::sectors::SectorManager;
use crate::grid::map::Grid;
use crate::signals::SignalBus;
use crate::threat::ThreatClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrangementKind {
    StaticModifier,
    TriggeredAbility,
    PlacedItem,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ArrangementEffect {
    /// Door unlock durations are multiplied by this (below 1 is faster)
    FasterUnlock { multiplier: f32 },
    /// Wind the threat clock back
    ThreatBonus { seconds: f32 },
    ExtraIntel { amount: u32 },
    EmitSignal { signal: String },
    /// Stop the threat clock for a while
    PauseClock { duration: f32 },
    /// Observers gain no detection for a while
    BlindObservers { duration: f32 },
    UnlockDoor { x: i32, y: i32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arrangement {
    pub id: String,
    pub name: String,
    pub kind: ArrangementKind,
    pub cost: u32,
    /// Triggers allowed per heist (ignored for non-triggered kinds)
    pub max_uses: u32,
    pub uses_remaining: u32,
    pub purchased: bool,
    pub effect: ArrangementEffect,
}

impl Arrangement {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ArrangementKind,
        cost: u32,
        max_uses: u32,
        effect: ArrangementEffect,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            cost,
            max_uses,
            uses_remaining: max_uses,
            purchased: false,
            effect,
        }
    }
}

/// Everything an arrangement effect can touch
pub struct EffectContext<'a> {
    pub grid: &'a mut Grid,
    pub threat: &'a mut ThreatClock,
    pub signals: &'a mut SignalBus,
    pub sectors: &'a mut SectorManager,
    pub now: SimTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimedEffect {
    ClockPause,
    Blind,
}

#[derive(Debug, Clone)]
struct Deadline {
    arrangement: String,
    at: SimTime,
    effect: TimedEffect,
}

#[derive(Debug, Clone)]
pub struct ArrangementEngine {
    arrangements: BTreeMap<String, Arrangement>,
    cash: u32,
    unlock_multiplier: f32,
    deadlines: Vec<Deadline>,
}

impl Default for ArrangementEngine {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ArrangementEngine {
    pub fn new(cash: u32) -> Self {
        Self {
            arrangements: BTreeMap::new(),
            cash,
            unlock_multiplier: 1.0,
            deadlines: Vec::new(),
        }
    }

    pub fn add(&mut self, arrangement: Arrangement) {
        self.arrangements.insert(arrangement.id.clone(), arrangement);
    }

    pub fn get(&self, id: &str) -> Option<&Arrangement> {
        self.arrangements.get(id)
    }

    pub fn arrangements(&self) -> impl Iterator<Item = &Arrangement> {
        self.arrangements.values()
    }

    pub fn cash(&self) -> u32 {
        self.cash
    }

    /// Multiplier on door unlock durations from purchased modifiers
    pub fn unlock_multiplier(&self) -> f32 {
        self.unlock_multiplier
    }

    pub fn observers_blinded(&self, now: SimTime) -> bool {
        self.deadlines
            .iter()
            .any(|d| d.effect == TimedEffect::Blind && d.at > now)
    }

    /// Buy an arrangement. Fails closed on unknown ids, re-purchase and
    /// insufficient cash. Static modifiers and placed items apply now.
    pub fn purchase(&mut self, id: &str, ctx: &mut EffectContext) -> Result<(), PurchaseError> {
        let arrangement = self
            .arrangements
            .get(id)
            .ok_or_else(|| PurchaseError::NotFound(id.to_string()))?;
        if arrangement.purchased {
            return Err(PurchaseError::AlreadyPurchased(id.to_string()));
        }
        if self.cash < arrangement.cost {
            return Err(PurchaseError::InsufficientFunds {
                needed: arrangement.cost,
                available: self.cash,
            });
        }

        let cost = arrangement.cost;
        let kind = arrangement.kind;
        let effect = arrangement.effect.clone();
        self.cash -= cost;
        if let Some(arrangement) = self.arrangements.get_mut(id) {
            arrangement.purchased = true;
        }
        info!("arrangement {} purchased for {}", id, cost);

        if kind != ArrangementKind::TriggeredAbility {
            self.apply(id, &effect, ctx);
        }
        Ok(())
    }

    /// Fire a purchased triggered ability, spending one use
    pub fn trigger(&mut self, id: &str, ctx: &mut EffectContext) -> Result<u32, PurchaseError> {
        let arrangement = self
            .arrangements
            .get_mut(id)
            .ok_or_else(|| PurchaseError::NotFound(id.to_string()))?;
        if !arrangement.purchased {
            return Err(PurchaseError::NotPurchased(id.to_string()));
        }
        if arrangement.kind != ArrangementKind::TriggeredAbility {
            return Err(PurchaseError::NotTriggerable(id.to_string()));
        }
        if arrangement.uses_remaining == 0 {
            return Err(PurchaseError::NoUsesRemaining(id.to_string()));
        }

        arrangement.uses_remaining -= 1;
        let remaining = arrangement.uses_remaining;
        let effect = arrangement.effect.clone();
        info!("arrangement {} triggered ({} uses left)", id, remaining);

        self.apply(id, &effect, ctx);
        Ok(remaining)
    }

    fn apply(&mut self, id: &str, effect: &ArrangementEffect, ctx: &mut EffectContext) {
        match effect {
            ArrangementEffect::FasterUnlock { multiplier } => {
                self.unlock_multiplier *= multiplier.max(0.0);
            }
            ArrangementEffect::ThreatBonus { seconds } => ctx.threat.add_bonus(*seconds),
            ArrangementEffect::ExtraIntel { amount } => ctx.sectors.add_intel(*amount),
            ArrangementEffect::EmitSignal { signal } => {
                ctx.signals.emit(signal, ctx.now);
            }
            ArrangementEffect::PauseClock { duration } => {
                ctx.threat.pause();
                self.schedule(id, ctx.now + duration, TimedEffect::ClockPause);
            }
            ArrangementEffect::BlindObservers { duration } => {
                self.schedule(id, ctx.now + duration, TimedEffect::Blind);
            }
            ArrangementEffect::UnlockDoor { x, y } => {
                if !ctx.grid.unlock_door(TilePos::new(*x, *y)) {
                    debug!("arrangement {}: no locked door at ({}, {})", id, x, y);
                }
            }
        }
    }

    fn schedule(&mut self, id: &str, at: SimTime, effect: TimedEffect) {
        self.deadlines.push(Deadline {
            arrangement: id.to_string(),
            at,
            effect,
        });
    }

    /// End timed effects whose deadline has passed. Returns the ids of the
    /// arrangements that expired.
    pub fn expire_due(&mut self, now: SimTime, threat: &mut ThreatClock) -> Vec<String> {
        let (due, pending): (Vec<Deadline>, Vec<Deadline>) =
            self.deadlines.drain(..).partition(|d| d.at <= now);
        self.deadlines = pending;

        let still_paused = self
            .deadlines
            .iter()
            .any(|d| d.effect == TimedEffect::ClockPause);
        if !still_paused && due.iter().any(|d| d.effect == TimedEffect::ClockPause) {
            threat.resume();
        }

        due.into_iter()
            .map(|d| {
                debug!("arrangement {} expired at {:.2}s", d.arrangement, now);
                d.arrangement
            })
            .collect()
    }

    /// Undo all purchases for a new heist
    pub fn reset(&mut self, cash: u32) {
        for arrangement in self.arrangements.values_mut() {
            arrangement.purchased = false;
            arrangement.uses_remaining = arrangement.max_uses;
        }
        self.cash = cash;
        self.unlock_multiplier = 1.0;
        self.deadlines.clear();
    }
}
