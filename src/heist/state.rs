//! Heist state and the tick loop
//!
//! One tick, in order:
//! 1. expire timed arrangement effects
//! 2. advance the threat clock
//! 3. apply zone modifiers to every vision cone
//! 4. deliver path results queued last tick
//! 5. step every crew member's plan, in unit order
//! 6. refresh the cost grid if doors opened, then solve queued paths
//! 7. move guards and sweep cameras
//! 8. update detection meters and react to detections
//! 9. update crew fog of war
//! 10. report the outcome once every crew member is out

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::core::config::SimulationConfig;
use crate::core::error::{HeistError, Result};
use crate::core::types::{ObjectiveId, ObserverId, SimTime, Tick, TilePos, UnitId};
use crate::crew::loot::{LootBag, LootTotals};
use crate::crew::unit::{Stance, Unit};
use crate::economy::arrangements::ArrangementEngine;
use crate::economy::sectors::SectorManager;
use crate::grid::los::supercover_line;
use crate::grid::map::Grid;
use crate::grid::path_service::PathService;
use crate::grid::pathfinding::Pathfinder;
use crate::grid::tile::{Tile, TileVisibility};
use crate::heist::building::{Building, BuildingDef, ExtractionPoint};
use crate::heist::events::{announce_escalations, HeistEventKind, HeistEventLog, HeistOutcome};
use crate::objectives::interactable::Interactable;
use crate::objectives::machine::{step_unit, PlanContext};
use crate::signals::{self, SignalBus};
use crate::threat::ThreatClock;
use crate::vision::cone::{AwarenessState, DetectionParams};
use crate::vision::observer::Observer;

pub struct HeistState {
    pub(crate) config: SimulationConfig,
    /// Pristine copy for `reset`
    building: Building,

    pub(crate) grid: Grid,
    pathfinder: Pathfinder,
    pub(crate) paths: PathService,
    pub(crate) signals: SignalBus,
    pub(crate) threat: ThreatClock,
    pub(crate) sectors: SectorManager,
    pub(crate) arrangements: ArrangementEngine,

    pub(crate) crew: Vec<Unit>,
    observers: Vec<Observer>,
    interactables: BTreeMap<String, Interactable>,
    extraction_points: Vec<ExtractionPoint>,

    pub(crate) events: HeistEventLog,
    banked_loot: Vec<LootBag>,
    forfeited_loot: Vec<LootBag>,
    rng: ChaCha8Rng,
    next_objective_id: u32,

    tick: Tick,
    time: SimTime,
    outcome: Option<HeistOutcome>,
}

impl HeistState {
    pub fn new(building: Building, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let mut state = Self {
            pathfinder: Pathfinder::new(&building.grid),
            paths: PathService::new(config.path_budget_per_tick),
            signals: SignalBus::new(),
            threat: ThreatClock::new(config.threat.clone()),
            sectors: SectorManager::new(config.starting_intel),
            arrangements: ArrangementEngine::new(config.starting_cash),
            grid: building.grid.clone(),
            crew: Vec::new(),
            observers: Vec::new(),
            interactables: BTreeMap::new(),
            extraction_points: Vec::new(),
            events: HeistEventLog::new(),
            banked_loot: Vec::new(),
            forfeited_loot: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            next_objective_id: 1,
            tick: 0,
            time: 0.0,
            outcome: None,
            building,
            config,
        };
        for arrangement in &state.building.arrangements {
            state.arrangements.add(arrangement.clone());
        }
        state.load_building()?;
        Ok(state)
    }

    /// Parse, materialize and load a building in one go
    pub fn from_json_str(json: &str, config: SimulationConfig) -> Result<Self> {
        let building = BuildingDef::from_json_str(json)?.materialize(&config)?;
        Self::new(building, config)
    }

    /// Put every piece back where the building started. Signals, the threat
    /// clock, purchases and plans are all cleared.
    pub fn reset(&mut self) -> Result<()> {
        self.signals.reset();
        self.threat.reset();
        self.sectors = SectorManager::new(self.config.starting_intel);
        self.arrangements.reset(self.config.starting_cash);
        self.paths = PathService::new(self.config.path_budget_per_tick);
        self.events = HeistEventLog::new();
        self.banked_loot.clear();
        self.forfeited_loot.clear();
        self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
        self.next_objective_id = 1;
        self.tick = 0;
        self.time = 0.0;
        self.outcome = None;
        self.load_building()
    }

    fn load_building(&mut self) -> Result<()> {
        self.grid = self.building.grid.clone();
        self.observers = self.building.observers.clone();
        self.interactables = self.building.interactables.clone();
        self.extraction_points = self.building.extraction_points.clone();
        self.crew = self.building.crew.clone();

        // Tiles outside hidden zones are known from the start
        let positions: Vec<TilePos> = self.grid.tiles().map(|t| t.pos).collect();
        for pos in positions {
            self.grid.set_visibility(pos, TileVisibility::Revealed);
        }
        for (zone, cost) in &self.building.hidden_zones {
            self.grid.set_zone_visibility(zone, TileVisibility::Hidden);
            self.sectors.add_sector(zone.clone(), *cost);
        }
        for zone in &self.building.initially_revealed {
            if !self.sectors.reveal_free(zone, &mut self.grid) {
                self.grid.set_zone_visibility(zone, TileVisibility::Revealed);
            }
        }

        for unit in self.crew.iter_mut() {
            if !unit.spawn(&mut self.grid) {
                return Err(HeistError::InvalidBuilding(format!(
                    "{} spawns on an occupied tile",
                    unit.name
                )));
            }
        }
        self.pathfinder.refresh(&self.grid);
        self.update_fog();

        info!(
            "heist ready: {} crew, {} observers, {} intel, {} cash",
            self.crew.len(),
            self.observers.len(),
            self.sectors.intel(),
            self.arrangements.cash()
        );
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Simulation seconds since the heist started
    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    /// Mutable access for registering listeners
    pub fn signals_mut(&mut self) -> &mut SignalBus {
        &mut self.signals
    }

    pub fn threat(&self) -> &ThreatClock {
        &self.threat
    }

    pub fn threat_mut(&mut self) -> &mut ThreatClock {
        &mut self.threat
    }

    pub fn sectors(&self) -> &SectorManager {
        &self.sectors
    }

    pub fn arrangements(&self) -> &ArrangementEngine {
        &self.arrangements
    }

    pub fn crew(&self) -> &[Unit] {
        &self.crew
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.crew.iter().find(|u| u.id == id)
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.crew
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(HeistError::UnitNotFound(id))
    }

    pub fn observers(&self) -> &[Observer] {
        &self.observers
    }

    pub fn interactables(&self) -> &BTreeMap<String, Interactable> {
        &self.interactables
    }

    pub fn extraction_points(&self) -> &[ExtractionPoint] {
        &self.extraction_points
    }

    pub fn events(&self) -> &HeistEventLog {
        &self.events
    }

    /// Detection value of `unit` as seen by `observer`
    pub fn detection(&self, observer: ObserverId, unit: UnitId) -> f32 {
        self.observers
            .iter()
            .find(|o| o.id == observer)
            .map_or(0.0, |o| o.cone.detection(unit))
    }

    /// Highest awareness any observer has of `unit`
    pub fn awareness(&self, unit: UnitId) -> AwarenessState {
        self.observers
            .iter()
            .map(|o| o.cone.meter(unit).state)
            .max()
            .unwrap_or_default()
    }

    pub fn banked_loot(&self) -> LootTotals {
        let mut totals = LootTotals::default();
        for bag in &self.banked_loot {
            totals.add(bag);
        }
        totals
    }

    pub fn forfeited_loot(&self) -> &[LootBag] {
        &self.forfeited_loot
    }

    pub fn outcome(&self) -> Option<&HeistOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    pub(crate) fn allocate_objective_id(&mut self) -> ObjectiveId {
        let id = ObjectiveId(self.next_objective_id);
        self.next_objective_id += 1;
        id
    }

    // ===== TICK =====

    /// Advance the heist by one tick. Does nothing once the outcome is in.
    pub fn run_tick(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        let dt = self.config.tick_seconds;
        self.tick += 1;
        self.time += dt;
        let (tick, now) = (self.tick, self.time);

        for id in self.arrangements.expire_due(now, &mut self.threat) {
            self.events.push(
                tick,
                now,
                HeistEventKind::ArrangementExpired { id: id.clone() },
                format!("Arrangement {} wore off", id),
            );
        }

        let entered = self.threat.advance(dt);
        announce_escalations(&entered, &mut self.signals, &mut self.events, tick, now);

        let modifiers = self.threat.modifiers();
        for observer in self.observers.iter_mut() {
            observer.cone.apply_modifiers(modifiers);
        }

        for result in self.paths.drain_completed() {
            if let Some(unit) = self.crew.iter_mut().find(|u| u.id == result.unit) {
                unit.path_inbox = Some(result);
            }
        }

        self.step_crew(dt);

        if self.pathfinder.refresh_if_stale(&self.grid) {
            debug!("cost grid rebuilt at tick {}", tick);
        }
        self.paths.process(&self.pathfinder);

        let guard_speed = self.threat.guard_speed();
        for observer in self.observers.iter_mut() {
            observer.update(guard_speed, dt);
        }

        self.update_detection(dt);
        self.update_fog();
        self.check_outcome();
    }

    /// Run until the outcome is in or `max_ticks` more ticks have passed
    pub fn run_until_done(&mut self, max_ticks: u64) -> Option<&HeistOutcome> {
        for _ in 0..max_ticks {
            if self.outcome.is_some() {
                break;
            }
            self.run_tick();
        }
        self.outcome.as_ref()
    }

    fn step_crew(&mut self, dt: f32) {
        let mut ctx = PlanContext {
            grid: &mut self.grid,
            pathfinder: &mut self.pathfinder,
            paths: &mut self.paths,
            signals: &mut self.signals,
            threat: &mut self.threat,
            interactables: &mut self.interactables,
            extraction_points: &self.extraction_points,
            config: &self.config,
            rng: &mut self.rng,
            events: &mut self.events,
            banked_loot: &mut self.banked_loot,
            next_objective_id: &mut self.next_objective_id,
            unlock_multiplier: self.arrangements.unlock_multiplier(),
            tick: self.tick,
            time: self.time,
            dt,
        };
        for unit in self.crew.iter_mut() {
            step_unit(unit, &mut ctx);
        }
    }

    fn update_detection(&mut self, dt: f32) {
        let (tick, now) = (self.tick, self.time);
        let blinded = self.arrangements.observers_blinded(now);
        let params = DetectionParams {
            decay_rate: self.config.detection_decay_rate,
            suspicious_threshold: self.config.suspicious_threshold,
            detected_threshold: self.config.detected_threshold,
        };

        let mut detections = Vec::new();
        for (oi, observer) in self.observers.iter_mut().enumerate() {
            for (ui, unit) in self.crew.iter().enumerate() {
                if unit.is_terminal() {
                    continue;
                }
                let seen = if blinded {
                    None
                } else {
                    observer.cone.visible_distance(
                        &self.grid,
                        unit.grid_pos(),
                        unit.stance == Stance::Sneak,
                    )
                };
                let multiplier = unit.stance.detection_multiplier(&self.config);
                let Some(state) =
                    observer.cone.update_detection(unit.id, seen, multiplier, &params, dt)
                else {
                    continue;
                };

                debug!("{} is now {:?} of {}", observer.name, state, unit.name);
                self.events.push(
                    tick,
                    now,
                    HeistEventKind::DetectionStateChanged {
                        unit: unit.id,
                        observer: observer.id,
                        state,
                    },
                    format!("{} is {:?} of {}", observer.name, state, unit.name),
                );
                if state == AwarenessState::Detected {
                    detections.push((oi, ui));
                }
            }
        }

        for (oi, ui) in detections {
            self.on_detected(oi, ui);
        }
    }

    fn on_detected(&mut self, observer_index: usize, unit_index: usize) {
        let (tick, now) = (self.tick, self.time);
        let observer = &self.observers[observer_index];
        let unit = &mut self.crew[unit_index];
        warn!("{} detected by {} at {:.1}s", unit.name, observer.name, now);

        self.signals.emit(signals::ALARM, now);
        let entered = self.threat.add_penalty(self.config.detection_penalty_seconds);
        announce_escalations(&entered, &mut self.signals, &mut self.events, tick, now);

        if self.config.scram_on_detection && self.signals.emit(signals::SCRAM, now) {
            warn!("SCRAM called after {} was detected", unit.name);
            self.events.push(
                tick,
                now,
                HeistEventKind::ScramCalled,
                format!("SCRAM called ({} detected)", unit.name),
            );
        }

        let in_reach = observer.world_pos.distance(unit.world_pos()) <= self.config.capture_range;
        if !observer.is_guard() || !in_reach || unit.is_terminal() {
            return;
        }
        self.paths.cancel(unit.id);
        let forfeited_bags = unit.capture(&mut self.grid);
        let forfeited: u32 = forfeited_bags.iter().map(|b| b.value).sum();
        self.forfeited_loot.extend(forfeited_bags);
        info!("{} captured by {}, {} loot forfeited", unit.name, observer.name, forfeited);
        self.events.push(
            tick,
            now,
            HeistEventKind::UnitCaptured {
                unit: unit.id,
                observer: observer.id,
                forfeited,
            },
            format!("{} captured by {}", unit.name, observer.name),
        );
    }

    /// Tiles the active crew can see become Visible; tiles seen before but
    /// not now fall back to Revealed. Sectors still waiting to be bought
    /// stay Hidden whatever the crew sees.
    fn update_fog(&mut self) {
        let previously_visible: Vec<TilePos> = self
            .grid
            .tiles()
            .filter(|t| t.visibility == TileVisibility::Visible && self.fog_reaches(t))
            .map(|t| t.pos)
            .collect();
        for pos in previously_visible {
            self.grid.set_visibility(pos, TileVisibility::Revealed);
        }

        let radius = self.config.crew_sight_radius.max(0);
        for unit in self.crew.iter().filter(|u| !u.is_terminal()) {
            let origin = unit.grid_pos();
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx * dx + dy * dy > radius * radius {
                        continue;
                    }
                    let pos = origin.offset(dx, dy);
                    let Some(tile) = self.grid.tile(pos) else {
                        continue;
                    };
                    if self.fog_reaches(tile) && crew_can_see(&self.grid, origin, pos) {
                        self.grid.set_visibility(pos, TileVisibility::Visible);
                    }
                }
            }
        }
    }

    fn fog_reaches(&self, tile: &Tile) -> bool {
        match tile.zone.as_deref() {
            Some(zone) if self.sectors.sector(zone).is_some() => self.sectors.is_revealed(zone),
            _ => true,
        }
    }

    fn check_outcome(&mut self) {
        if self.crew.is_empty() || !self.crew.iter().all(Unit::is_terminal) {
            return;
        }
        let totals = self.banked_loot();
        let extracted: Vec<UnitId> = self
            .crew
            .iter()
            .filter(|u| u.is_extracted())
            .map(|u| u.id)
            .collect();
        let captured: Vec<UnitId> = self
            .crew
            .iter()
            .filter(|u| u.is_captured())
            .map(|u| u.id)
            .collect();

        let outcome = HeistOutcome {
            success: !extracted.is_empty() && totals.score > 0,
            extracted,
            captured,
            score_value: totals.score,
            bonus_value: totals.bonus,
            elapsed: self.time,
            final_zone: self.threat.zone(),
        };
        info!(
            "heist over at {:.1}s: {} out, {} caught, score {} bonus {}",
            outcome.elapsed,
            outcome.extracted.len(),
            outcome.captured.len(),
            outcome.score_value,
            outcome.bonus_value
        );
        self.events.push(
            self.tick,
            self.time,
            HeistEventKind::HeistOutcomeReady {
                outcome: outcome.clone(),
            },
            if outcome.success {
                "Heist succeeded".to_string()
            } else {
                "Heist failed".to_string()
            },
        );
        self.outcome = Some(outcome);
    }
}

/// Crew sight ignores the end tiles, so walls bounding a room are seen
fn crew_can_see(grid: &Grid, from: TilePos, to: TilePos) -> bool {
    let line = supercover_line(from, to);
    if line.len() <= 2 {
        return true;
    }
    line[1..line.len() - 1]
        .iter()
        .all(|pos| grid.tile(*pos).is_some_and(|t| t.is_transparent()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heist::commands::Command;
    use crate::objectives::objective::{Objective, ObjectiveStatus};
    use crate::objectives::trigger::Trigger;
    use crate::threat::ThreatZone;

    const BUILDING: &str = r##"{
        "width": 16,
        "height": 9,
        "zones": [
            {"id": "lobby", "name": "Lobby"},
            {"id": "vault", "name": "Vault"}
        ],
        "building": {"shell": {"x1": 0, "y1": 0, "x2": 15, "y2": 8}},
        "rooms": [
            {"zone": "lobby", "bounds": {"x1": 0, "y1": 0, "x2": 8, "y2": 8},
             "doors": [{"x": 8, "y": 4, "locked": true, "unlockDuration": 1.0}]},
            {"zone": "vault", "bounds": {"x1": 8, "y1": 0, "x2": 15, "y2": 8}}
        ],
        "interactables": [{"id": "safe", "type": "safe", "x": 13, "y": 4,
                           "duration": 1, "lootValue": 900, "isScore": true}],
        "crewSpawns": [{"x": 2, "y": 4, "name": "Ace"}, {"x": 2, "y": 5, "name": "Bee"}],
        "extraction": {"points": [{"id": "door", "x": 1, "y": 1, "isDefault": true}]},
        "hiddenZones": [{"id": "vault", "intelCost": 3}]
    }"##;

    fn heist(config: SimulationConfig) -> HeistState {
        HeistState::from_json_str(BUILDING, config).unwrap()
    }

    #[test]
    fn test_initial_visibility() {
        let mut config = SimulationConfig::default();
        config.crew_sight_radius = 2;
        let state = heist(config);
        assert_eq!(
            state.grid().visibility(TilePos::new(12, 2)),
            Some(TileVisibility::Hidden)
        );
        // Near the crew
        assert_eq!(
            state.grid().visibility(TilePos::new(3, 4)),
            Some(TileVisibility::Visible)
        );
        assert_eq!(
            state.grid().visibility(TilePos::new(7, 1)),
            Some(TileVisibility::Revealed)
        );
    }

    #[test]
    fn test_sector_purchase_fails_closed() {
        let mut config = SimulationConfig::default();
        config.starting_intel = 2;
        let mut state = heist(config);
        let result = state.apply(Command::PurchaseSector {
            sector: "vault".into(),
        });
        assert!(matches!(result, Err(HeistError::Purchase(_))));
        assert_eq!(state.sectors().intel(), 2);
        assert!(!state.sectors().is_revealed("vault"));
        assert!(state.events().is_empty());
    }

    #[test]
    fn test_sector_purchase_reveals_zone() {
        let mut config = SimulationConfig::default();
        config.starting_intel = 5;
        let mut state = heist(config);
        state
            .apply(Command::PurchaseSector {
                sector: "vault".into(),
            })
            .unwrap();
        assert_eq!(state.sectors().intel(), 2);
        assert_eq!(
            state.grid().visibility(TilePos::new(12, 2)),
            Some(TileVisibility::Revealed)
        );
        assert!(state
            .events()
            .filter(|k| matches!(k, HeistEventKind::ZoneRevealed { .. }))
            .next()
            .is_some());
    }

    #[test]
    fn test_crew_sight_leaves_unbought_sector_hidden() {
        let mut state = heist(SimulationConfig::default());
        state
            .assign_objective(UnitId(0), Objective::move_to(TilePos::new(11, 4)))
            .unwrap();
        state
            .assign_objective(UnitId(0), Objective::move_to(TilePos::new(3, 4)))
            .unwrap();

        for _ in 0..400 {
            state.run_tick();
            if state.unit(UnitId(0)).unwrap().grid_pos() == TilePos::new(11, 4) {
                break;
            }
        }
        assert_eq!(state.unit(UnitId(0)).unwrap().grid_pos(), TilePos::new(11, 4));
        assert_eq!(
            state.grid().visibility(TilePos::new(11, 4)),
            Some(TileVisibility::Hidden)
        );
        assert_eq!(
            state.grid().visibility(TilePos::new(12, 3)),
            Some(TileVisibility::Hidden)
        );

        for _ in 0..400 {
            state.run_tick();
        }
        assert_eq!(state.unit(UnitId(0)).unwrap().plan[1].status, ObjectiveStatus::Completed);
        assert!(!state.sectors().is_revealed("vault"));
        assert_eq!(state.sectors().intel(), state.config().starting_intel);
        assert_eq!(
            state.grid().visibility(TilePos::new(11, 4)),
            Some(TileVisibility::Hidden)
        );
        assert_eq!(
            state.grid().visibility(TilePos::new(4, 4)),
            Some(TileVisibility::Visible)
        );
    }

    #[test]
    fn test_full_heist_succeeds() {
        let mut state = heist(SimulationConfig::default());
        for objective in [Objective::loot("safe"), Objective::escape(None)] {
            state.assign_objective(UnitId(0), objective).unwrap();
        }
        state.assign_objective(UnitId(1), Objective::escape(None)).unwrap();

        let outcome = state.run_until_done(2_000).cloned().unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.score_value, 900);
        assert_eq!(outcome.extracted.len(), 2);
        assert!(outcome.captured.is_empty());
        assert!(state
            .events()
            .filter(|k| matches!(k, HeistEventKind::DoorUnlocked { .. }))
            .next()
            .is_some());

        // Reported once; further ticks change nothing
        let tick = state.tick();
        state.run_tick();
        assert_eq!(state.tick(), tick);
        let reports = state
            .events()
            .filter(|k| matches!(k, HeistEventKind::HeistOutcomeReady { .. }))
            .count();
        assert_eq!(reports, 1);
    }

    #[test]
    fn test_scram_command_sends_crew_home() {
        let mut state = heist(SimulationConfig::default());
        state
            .assign_objective(
                UnitId(0),
                Objective::hold(None).with_trigger(Trigger::signal("never")),
            )
            .unwrap();
        state.run_tick();
        state.apply(Command::Scram).unwrap();
        state.run_tick();

        let unit = state.unit(UnitId(0)).unwrap();
        assert!(unit.scrammed);
        assert_eq!(unit.plan[0].status, ObjectiveStatus::Aborted);
        assert_eq!(unit.plan[1].kind, crate::objectives::ObjectiveKind::Escape);

        let outcome = state.run_until_done(1_000).cloned().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.extracted.len(), 2);
    }

    #[test]
    fn test_threat_escalates_with_time() {
        let mut config = SimulationConfig::default();
        config.tick_seconds = 0.5;
        let mut state = heist(config);
        for _ in 0..130 {
            state.run_tick();
        }
        assert_eq!(state.threat().zone(), ThreatZone::Alert);
        assert!(state.signals().check(signals::THREAT_ALERT));
    }

    #[test]
    fn test_reset_restores_building() {
        let mut state = heist(SimulationConfig::default());
        state.assign_objective(UnitId(0), Objective::escape(None)).unwrap();
        state.apply(Command::Scram).unwrap();
        for _ in 0..50 {
            state.run_tick();
        }
        state.reset().unwrap();
        assert_eq!(state.tick(), 0);
        assert!(!state.signals().check(signals::SCRAM));
        assert_eq!(state.unit(UnitId(0)).unwrap().grid_pos(), TilePos::new(2, 4));
        assert!(state.unit(UnitId(0)).unwrap().plan.is_empty());
        assert_eq!(state.grid().occupant(TilePos::new(2, 4)), Some(UnitId(0)));
    }

    #[test]
    fn test_unknown_unit_is_rejected() {
        let mut state = heist(SimulationConfig::default());
        let result = state.apply(Command::RequestMove {
            unit: UnitId(9),
            x: 3,
            y: 3,
        });
        assert!(matches!(result, Err(HeistError::UnitNotFound(UnitId(9)))));
    }

    #[test]
    fn test_rejected_request_move_keeps_objective_ids() {
        let mut state = heist(SimulationConfig::default());
        assert!(state.request_move(UnitId(9), TilePos::new(3, 3)).is_err());
        assert!(state.request_move(UnitId(0), TilePos::new(40, 3)).is_err());

        // SCRAM hands out the first ids to the injected escapes
        state.apply(Command::Scram).unwrap();
        state.run_tick();
        assert_eq!(state.unit(UnitId(0)).unwrap().plan[0].id, ObjectiveId(1));
        assert_eq!(state.unit(UnitId(1)).unwrap().plan[0].id, ObjectiveId(2));

        let refused = state.request_move(UnitId(0), TilePos::new(3, 3));
        assert!(matches!(refused, Err(HeistError::InvalidCommand(_))));

        state
            .assign_objective(UnitId(1), Objective::move_to(TilePos::new(3, 3)))
            .unwrap();
        assert_eq!(state.unit(UnitId(1)).unwrap().plan[1].id, ObjectiveId(3));
    }
}
