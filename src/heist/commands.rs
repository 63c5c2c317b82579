//! Commands from outside the simulation (UI, scripts, the runner)
//!
//! Commands are applied between ticks. A rejected command leaves the heist
//! unchanged and reports why.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::core::error::{HeistError, Result};
use crate::core::types::{Tick, TilePos, UnitId};
use crate::crew::unit::Stance;
use crate::economy::arrangements::{ArrangementEffect, EffectContext};
use crate::heist::events::HeistEventKind;
use crate::heist::state::HeistState;
use crate::objectives::machine::preempt;
use crate::objectives::objective::{Objective, ObjectiveStatus};
use crate::signals;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Append an objective to a unit's plan
    AssignObjective { unit: UnitId, objective: Objective },
    /// Change one unit's stance, or everyone's when `unit` is absent
    SetStance {
        #[serde(default)]
        unit: Option<UnitId>,
        stance: Stance,
    },
    PurchaseSector { sector: String },
    PurchaseArrangement { id: String },
    TriggerArrangement { id: String },
    /// Go to a tile now; the interrupted objective resumes afterwards
    RequestMove { unit: UnitId, x: i32, y: i32 },
    /// Abort everything and head for extraction
    Scram,
}

/// A command due at a given tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub tick: Tick,
    pub command: Command,
}

/// A heist plan: commands applied before the first tick, then commands at
/// fixed ticks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeistPlan {
    #[serde(default)]
    pub setup: Vec<Command>,
    #[serde(default)]
    pub scheduled: Vec<ScheduledCommand>,
}

impl HeistPlan {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Commands scheduled for `tick`, in file order
    pub fn due(&self, tick: Tick) -> impl Iterator<Item = &Command> {
        self.scheduled
            .iter()
            .filter(move |s| s.tick == tick)
            .map(|s| &s.command)
    }

    pub fn last_tick(&self) -> Tick {
        self.scheduled.iter().map(|s| s.tick).max().unwrap_or(0)
    }
}

impl HeistState {
    pub fn apply(&mut self, command: Command) -> Result<()> {
        match command {
            Command::AssignObjective { unit, objective } => self.assign_objective(unit, objective),
            Command::SetStance { unit, stance } => self.set_stance(unit, stance),
            Command::PurchaseSector { sector } => self.purchase_sector(&sector),
            Command::PurchaseArrangement { id } => self.purchase_arrangement(&id),
            Command::TriggerArrangement { id } => self.trigger_arrangement(&id),
            Command::RequestMove { unit, x, y } => self.request_move(unit, TilePos::new(x, y)),
            Command::Scram => {
                self.scram();
                Ok(())
            }
        }
    }

    pub fn assign_objective(&mut self, unit: UnitId, mut objective: Objective) -> Result<()> {
        objective.id = self.allocate_objective_id();
        objective.status = ObjectiveStatus::Pending;
        let unit = self.unit_mut(unit)?;
        if unit.is_terminal() {
            return Err(HeistError::InvalidCommand(format!(
                "{} has left the building",
                unit.name
            )));
        }
        info!("{} assigned {:?} objective {:?}", unit.name, objective.kind, objective.id);
        unit.plan.push(objective);
        Ok(())
    }

    pub fn set_stance(&mut self, unit: Option<UnitId>, stance: Stance) -> Result<()> {
        match unit {
            Some(id) => self.unit_mut(id)?.stance = stance,
            None => {
                for unit in self.crew.iter_mut().filter(|u| !u.is_terminal()) {
                    unit.stance = stance;
                }
            }
        }
        Ok(())
    }

    /// Spend intel to reveal a hidden zone
    pub fn purchase_sector(&mut self, sector: &str) -> Result<()> {
        let intel_left = self.sectors.purchase(sector, &mut self.grid)?;
        let (tick, time) = (self.tick(), self.time());
        self.events.push(
            tick,
            time,
            HeistEventKind::ZoneRevealed {
                zone: sector.to_string(),
            },
            format!("Sector {} revealed ({} intel left)", sector, intel_left),
        );
        Ok(())
    }

    pub fn purchase_arrangement(&mut self, id: &str) -> Result<()> {
        let door = self.arrangement_door(id);
        let now = self.time();
        let mut ctx = EffectContext {
            grid: &mut self.grid,
            threat: &mut self.threat,
            signals: &mut self.signals,
            sectors: &mut self.sectors,
            now,
        };
        self.arrangements.purchase(id, &mut ctx)?;

        let tick = self.tick();
        self.events.push(
            tick,
            now,
            HeistEventKind::ArrangementPurchased { id: id.to_string() },
            format!("Arrangement {} purchased", id),
        );
        self.report_door_unlock(door);
        Ok(())
    }

    pub fn trigger_arrangement(&mut self, id: &str) -> Result<()> {
        let door = self.arrangement_door(id);
        let now = self.time();
        let mut ctx = EffectContext {
            grid: &mut self.grid,
            threat: &mut self.threat,
            signals: &mut self.signals,
            sectors: &mut self.sectors,
            now,
        };
        let remaining = self.arrangements.trigger(id, &mut ctx)?;

        let tick = self.tick();
        self.events.push(
            tick,
            now,
            HeistEventKind::ArrangementTriggered { id: id.to_string() },
            format!("Arrangement {} triggered ({} uses left)", id, remaining),
        );
        self.report_door_unlock(door);
        Ok(())
    }

    pub fn request_move(&mut self, unit: UnitId, pos: TilePos) -> Result<()> {
        if !self.grid.in_bounds(pos) {
            return Err(HeistError::InvalidCommand(format!("{:?} is outside the grid", pos)));
        }
        let index = self
            .crew
            .iter()
            .position(|u| u.id == unit)
            .ok_or(HeistError::UnitNotFound(unit))?;
        if self.crew[index].is_terminal() || self.crew[index].scrammed {
            return Err(HeistError::InvalidCommand(format!(
                "{} cannot take new orders",
                self.crew[index].name
            )));
        }
        let objective = Objective::move_to(pos).with_id(self.allocate_objective_id());
        let unit = &mut self.crew[index];
        if !preempt(unit, &mut self.grid, &mut self.paths, objective) {
            return Err(HeistError::InvalidCommand(format!(
                "{} cannot take new orders",
                unit.name
            )));
        }
        Ok(())
    }

    /// Emit SCRAM; every unit reacts at the start of its next step
    pub fn scram(&mut self) {
        let (tick, time) = (self.tick(), self.time());
        if self.signals.emit(signals::SCRAM, time) {
            warn!("SCRAM called at {:.1}s", time);
            self.events
                .push(tick, time, HeistEventKind::ScramCalled, "SCRAM called".to_string());
        }
    }

    /// Locked door an arrangement would open, if any
    fn arrangement_door(&self, id: &str) -> Option<TilePos> {
        match self.arrangements.get(id).map(|a| &a.effect) {
            Some(ArrangementEffect::UnlockDoor { x, y }) => {
                let pos = TilePos::new(*x, *y);
                self.grid.is_locked_door(pos).then_some(pos)
            }
            _ => None,
        }
    }

    fn report_door_unlock(&mut self, door: Option<TilePos>) {
        let Some(pos) = door else {
            return;
        };
        if !self.grid.is_locked_door(pos) {
            let (tick, time) = (self.tick(), self.time());
            self.events.push(
                tick,
                time,
                HeistEventKind::DoorUnlocked { pos, unit: None },
                format!("Door at ({}, {}) unlocked", pos.x, pos.y),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_json() {
        let json = r#"{"command": "requestMove", "unit": 1, "x": 4, "y": 2}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            Command::RequestMove {
                unit: UnitId(1),
                x: 4,
                y: 2
            }
        );

        let json = r#"{"command": "setStance", "stance": "Sneak"}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            Command::SetStance {
                unit: None,
                stance: Stance::Sneak
            }
        );
    }

    #[test]
    fn test_plan_due_commands() {
        let json = r#"{
            "setup": [{"command": "purchaseSector", "sector": "vault"}],
            "scheduled": [
                {"tick": 5, "command": {"command": "scram"}},
                {"tick": 2, "command": {"command": "triggerArrangement", "id": "blackout"}}
            ]
        }"#;
        let plan = HeistPlan::from_json_str(json).unwrap();
        assert_eq!(plan.setup.len(), 1);
        assert_eq!(plan.due(5).collect::<Vec<_>>(), vec![&Command::Scram]);
        assert_eq!(plan.due(3).count(), 0);
        assert_eq!(plan.last_tick(), 5);
    }
}
