//! Per-unit objective state machine
//!
//! Each tick a unit checks for SCRAM, then runs its current activity. Some
//! transitions finish instantly (a trigger fires, an objective completes on
//! arrival) so a unit may pass through a few states in one tick; the number
//! of transitions per tick is bounded.

use std::collections::BTreeMap;

use ahash::AHashSet;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::core::config::SimulationConfig;
use crate::core::types::{ObjectiveId, SimTime, Tick, TilePos};
use crate::crew::loot::LootBag;
use crate::crew::movement::{advance_movement, MoveStatus};
use crate::crew::unit::Unit;
use crate::grid::map::Grid;
use crate::grid::path_service::{PathRequestId, PathService};
use crate::grid::pathfinding::Pathfinder;
use crate::heist::building::ExtractionPoint;
use crate::heist::events::{announce_escalations, HeistEventKind, HeistEventLog};
use crate::objectives::interactable::{skill_check, Interactable};
use crate::objectives::objective::{Objective, ObjectiveKind, ObjectiveStatus, ObjectiveTarget};
use crate::objectives::trigger::TriggerContext;
use crate::signals::{self, SignalBus};
use crate::threat::ThreatClock;

const MAX_TRANSITIONS_PER_TICK: usize = 8;

/// What a unit is doing for its current objective
#[derive(Debug, Clone, PartialEq)]
pub enum Activity {
    Idle,
    WaitingForTrigger,
    WaitingForPath {
        request: PathRequestId,
        goal: TilePos,
        retries: u32,
    },
    Moving {
        goal: TilePos,
        retries: u32,
    },
    Escaping {
        goal: TilePos,
        retries: u32,
    },
    Unlocking {
        door: TilePos,
        remaining: f32,
        goal: TilePos,
    },
    Interacting {
        interactable: String,
        remaining: f32,
        attempts: u32,
    },
    Holding {
        held: f32,
    },
    /// Pathing failed repeatedly; retry after a pause
    Blocked {
        goal: TilePos,
        retry_in: f32,
    },
}

impl Activity {
    pub fn label(&self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::WaitingForTrigger => "waiting for trigger",
            Activity::WaitingForPath { .. } => "waiting for path",
            Activity::Moving { .. } => "moving",
            Activity::Escaping { .. } => "escaping",
            Activity::Unlocking { .. } => "unlocking",
            Activity::Interacting { .. } => "interacting",
            Activity::Holding { .. } => "holding",
            Activity::Blocked { .. } => "blocked",
        }
    }
}

/// Shared heist state a unit's plan reads and mutates
pub struct PlanContext<'a> {
    pub grid: &'a mut Grid,
    pub pathfinder: &'a mut Pathfinder,
    pub paths: &'a mut PathService,
    pub signals: &'a mut SignalBus,
    pub threat: &'a mut ThreatClock,
    pub interactables: &'a mut BTreeMap<String, Interactable>,
    pub extraction_points: &'a [ExtractionPoint],
    pub config: &'a SimulationConfig,
    pub rng: &'a mut ChaCha8Rng,
    pub events: &'a mut HeistEventLog,
    /// Loot banked by extracted units
    pub banked_loot: &'a mut Vec<LootBag>,
    pub next_objective_id: &'a mut u32,
    /// Door unlock duration multiplier from arrangements
    pub unlock_multiplier: f32,
    pub tick: Tick,
    pub time: SimTime,
    pub dt: f32,
}

impl PlanContext<'_> {
    fn log(&mut self, kind: HeistEventKind, description: String) {
        self.events.push(self.tick, self.time, kind, description);
    }

    fn trigger_context(&self) -> TriggerContext<'_> {
        TriggerContext {
            signals: &*self.signals,
            elapsed: self.time,
            zone: self.threat.zone(),
        }
    }

    fn penalize(&mut self, seconds: f32) {
        let entered = self.threat.add_penalty(seconds);
        announce_escalations(&entered, self.signals, self.events, self.tick, self.time);
    }

    fn allocate_objective_id(&mut self) -> ObjectiveId {
        let id = ObjectiveId(*self.next_objective_id);
        *self.next_objective_id += 1;
        id
    }
}

enum Flow {
    /// Done for this tick
    Yield,
    /// State changed instantly; run the new state now
    Continue,
}

/// Run one tick of a unit's plan
pub fn step_unit(unit: &mut Unit, ctx: &mut PlanContext) {
    if unit.is_terminal() {
        return;
    }
    check_scram(unit, ctx);

    for _ in 0..MAX_TRANSITIONS_PER_TICK {
        let activity = std::mem::replace(&mut unit.activity, Activity::Idle);
        match dispatch(unit, ctx, activity) {
            Flow::Yield => break,
            Flow::Continue => {
                if unit.is_terminal() {
                    break;
                }
            }
        }
    }
    // Results not claimed this tick are stale
    unit.path_inbox = None;
}

/// SCRAM preempts everything except an Escape already under way
fn check_scram(unit: &mut Unit, ctx: &mut PlanContext) {
    if unit.scrammed || !ctx.signals.check(signals::SCRAM) {
        return;
    }
    unit.scrammed = true;

    let current = (unit.cursor..unit.plan.len()).find(|&i| !unit.plan[i].status.is_finished());
    if let Some(i) = current {
        if unit.plan[i].kind == ObjectiveKind::Escape {
            return;
        }
    }

    ctx.paths.cancel(unit.id);
    unit.path_inbox = None;
    unit.stop(ctx.grid);

    let insert_at = match current {
        Some(i) => {
            let objective = &mut unit.plan[i];
            objective.status = ObjectiveStatus::Aborted;
            let objective_id = objective.id;
            info!("unit {:?} scrams, aborting objective {:?}", unit.id, objective_id);
            ctx.log(
                HeistEventKind::ObjectiveAborted {
                    unit: unit.id,
                    objective: objective_id,
                },
                format!("{} aborted objective {:?} (SCRAM)", unit.name, objective_id),
            );
            i + 1
        }
        None => unit.plan.len(),
    };

    let escape = Objective::escape(None).with_id(ctx.allocate_objective_id());
    unit.plan.insert(insert_at, escape);
    unit.cursor = insert_at;
    unit.activity = Activity::Idle;
}

fn dispatch(unit: &mut Unit, ctx: &mut PlanContext, activity: Activity) -> Flow {
    match activity {
        Activity::Idle => start_next(unit, ctx),
        Activity::WaitingForTrigger => {
            if start_trigger_met(unit, ctx) {
                Flow::Continue
            } else {
                unit.activity = Activity::WaitingForTrigger;
                Flow::Yield
            }
        }
        Activity::WaitingForPath {
            request,
            goal,
            retries,
        } => receive_path(unit, ctx, request, goal, retries),
        Activity::Moving { goal, retries } | Activity::Escaping { goal, retries } => {
            travel(unit, ctx, goal, retries)
        }
        Activity::Unlocking {
            door,
            remaining,
            goal,
        } => unlock(unit, ctx, door, remaining - ctx.dt, goal),
        Activity::Interacting {
            interactable,
            remaining,
            attempts,
        } => interact(unit, ctx, interactable, remaining - ctx.dt, attempts),
        Activity::Holding { held } => hold(unit, ctx, held + ctx.dt),
        Activity::Blocked { goal, retry_in } => {
            let retry_in = retry_in - ctx.dt;
            if retry_in <= 0.0 {
                debug!("unit {:?} retrying blocked path to {:?}", unit.id, goal);
                request_path(unit, ctx, goal, ctx.config.max_path_retries, AHashSet::new());
            } else {
                unit.activity = Activity::Blocked { goal, retry_in };
            }
            Flow::Yield
        }
    }
}

fn start_trigger_met(unit: &Unit, ctx: &PlanContext) -> bool {
    match unit.current_objective().and_then(|o| o.trigger.as_ref()) {
        Some(trigger) => trigger.evaluate(&ctx.trigger_context()),
        None => true,
    }
}

fn start_next(unit: &mut Unit, ctx: &mut PlanContext) -> Flow {
    while unit
        .current_objective()
        .is_some_and(|o| o.status.is_finished())
    {
        unit.cursor += 1;
    }
    let Some(objective) = unit.current_objective() else {
        unit.activity = Activity::Idle;
        return Flow::Yield;
    };

    // Hold objectives start at once; their trigger is a release condition
    if objective.kind != ObjectiveKind::Hold
        && objective.status == ObjectiveStatus::Pending
        && !start_trigger_met(unit, ctx)
    {
        unit.activity = Activity::WaitingForTrigger;
        return Flow::Yield;
    }

    let goal = match resolve_goal(unit, ctx) {
        Ok(goal) => goal,
        Err(reason) => {
            fail_objective(unit, ctx, reason);
            return Flow::Continue;
        }
    };

    if let Some(objective) = unit.current_objective_mut() {
        objective.status = ObjectiveStatus::InProgress;
    }

    match goal {
        Some(goal) if goal != unit.grid_pos() => {
            request_path(unit, ctx, goal, 0, AHashSet::new());
            Flow::Yield
        }
        _ => arrive(unit, ctx),
    }
}

/// Tile the unit must reach for its current objective. `Ok(None)` means
/// "right here".
fn resolve_goal(unit: &Unit, ctx: &PlanContext) -> Result<Option<TilePos>, String> {
    let Some(objective) = unit.current_objective() else {
        return Err("no objective".into());
    };
    let here = unit.grid_pos();

    let target = match (&objective.target, objective.kind) {
        (Some(target), _) => target.clone(),
        (None, ObjectiveKind::Hold) => return Ok(None),
        (None, ObjectiveKind::Escape) => ObjectiveTarget::Extraction(None),
        (None, _) => return Err("objective has no target".into()),
    };

    match target {
        ObjectiveTarget::Tile(pos) => ctx
            .grid
            .approach_tile(pos, here)
            .map(Some)
            .ok_or_else(|| format!("tile {:?} cannot be reached", pos)),
        ObjectiveTarget::Interactable(id) => {
            let item = ctx
                .interactables
                .get(&id)
                .ok_or_else(|| format!("interactable {} not found", id))?;
            if objective.kind == ObjectiveKind::Loot && !item.is_loot() {
                return Err(format!("interactable {} holds no loot", id));
            }
            if !item.is_available() {
                return Err(format!("interactable {} already looted", id));
            }
            if item.in_reach(here) {
                return Ok(Some(here));
            }
            ctx.grid
                .approach_tile(item.pos, here)
                .map(Some)
                .ok_or_else(|| format!("interactable {} cannot be reached", id))
        }
        ObjectiveTarget::Zone(id) => {
            let zone = ctx
                .grid
                .zone(&id)
                .ok_or_else(|| format!("zone {} not found", id))?;
            if zone.contains(here) {
                return Ok(Some(here));
            }
            zone.tiles
                .iter()
                .copied()
                .filter(|p| ctx.grid.is_walkable(*p))
                .min_by_key(|p| (p.chebyshev(&here), p.manhattan(&here), *p))
                .map(Some)
                .ok_or_else(|| format!("zone {} has no walkable tile", id))
        }
        ObjectiveTarget::Extraction(point) => {
            let wanted = point.or_else(|| unit.extraction.clone());
            select_extraction(ctx.extraction_points, wanted.as_deref())
                .map(|p| Some(p.pos))
                .ok_or_else(|| "no extraction point".to_string())
        }
    }
}

/// Requested point, else the default, else the first one
pub fn select_extraction<'a>(
    points: &'a [ExtractionPoint],
    wanted: Option<&str>,
) -> Option<&'a ExtractionPoint> {
    wanted
        .and_then(|id| points.iter().find(|p| p.id == id))
        .or_else(|| points.iter().find(|p| p.is_default))
        .or_else(|| points.first())
}

fn request_path(
    unit: &mut Unit,
    ctx: &mut PlanContext,
    goal: TilePos,
    retries: u32,
    avoid: AHashSet<TilePos>,
) {
    let request = ctx.paths.request(unit.id, unit.grid_pos(), goal, avoid);
    unit.activity = Activity::WaitingForPath {
        request,
        goal,
        retries,
    };
}

fn travel_state(unit: &Unit, goal: TilePos, retries: u32) -> Activity {
    match unit.current_objective().map(|o| o.kind) {
        Some(ObjectiveKind::Escape) => Activity::Escaping { goal, retries },
        _ => Activity::Moving { goal, retries },
    }
}

fn receive_path(
    unit: &mut Unit,
    ctx: &mut PlanContext,
    request: PathRequestId,
    goal: TilePos,
    retries: u32,
) -> Flow {
    let result = match unit.path_inbox.take() {
        Some(result) if result.request == request => result,
        _ => {
            unit.activity = Activity::WaitingForPath {
                request,
                goal,
                retries,
            };
            return Flow::Yield;
        }
    };

    if result.from != unit.grid_pos() {
        debug!("unit {:?} discards stale path from {:?}", unit.id, result.from);
        request_path(unit, ctx, goal, retries, AHashSet::new());
        return Flow::Yield;
    }

    match result.path {
        Some(path) => {
            unit.set_path(ctx.grid, path);
            unit.activity = travel_state(unit, goal, retries);
            Flow::Continue
        }
        None => {
            retry_or_block(unit, ctx, goal, retries + 1, AHashSet::new());
            Flow::Yield
        }
    }
}

/// Ask for another path, or give up for a while once the retries run out.
/// `UnitBlocked` is reported once until the unit reaches a goal again.
fn retry_or_block(
    unit: &mut Unit,
    ctx: &mut PlanContext,
    goal: TilePos,
    retries: u32,
    avoid: AHashSet<TilePos>,
) {
    if retries <= ctx.config.max_path_retries {
        request_path(unit, ctx, goal, retries, avoid);
        return;
    }
    if !unit.blocked_reported {
        unit.blocked_reported = true;
        warn!("unit {:?} blocked on the way to {:?}", unit.id, goal);
        ctx.log(
            HeistEventKind::UnitBlocked {
                unit: unit.id,
                goal,
            },
            format!("{} is blocked", unit.name),
        );
    }
    unit.activity = Activity::Blocked {
        goal,
        retry_in: ctx.config.blocked_retry_interval,
    };
}

fn travel(unit: &mut Unit, ctx: &mut PlanContext, goal: TilePos, retries: u32) -> Flow {
    match advance_movement(unit, ctx.grid, ctx.config, ctx.dt) {
        MoveStatus::Arrived | MoveStatus::Idle => {
            if unit.grid_pos() == goal {
                arrive(unit, ctx)
            } else {
                request_path(unit, ctx, goal, retries, AHashSet::new());
                Flow::Yield
            }
        }
        MoveStatus::InTransit | MoveStatus::Waiting => {
            unit.activity = travel_state(unit, goal, retries);
            Flow::Yield
        }
        MoveStatus::NeedsReroute => {
            let mut avoid = ctx.grid.occupied_by_others(unit.id);
            avoid.remove(&goal);
            retry_or_block(unit, ctx, goal, retries + 1, avoid);
            Flow::Yield
        }
        MoveStatus::LockedDoor(door) => {
            let base = ctx
                .grid
                .door_unlock_duration(door)
                .unwrap_or(ctx.config.default_unlock_duration);
            let remaining = base * ctx.unlock_multiplier;
            debug!("unit {:?} unlocking door at {:?} ({:.1}s)", unit.id, door, remaining);
            unit.activity = Activity::Unlocking {
                door,
                remaining,
                goal,
            };
            Flow::Yield
        }
    }
}

fn unlock(unit: &mut Unit, ctx: &mut PlanContext, door: TilePos, remaining: f32, goal: TilePos) -> Flow {
    if remaining > 0.0 {
        unit.activity = Activity::Unlocking {
            door,
            remaining,
            goal,
        };
        return Flow::Yield;
    }

    if ctx.grid.unlock_door(door) {
        ctx.pathfinder.refresh_if_stale(ctx.grid);
        info!("unit {:?} unlocked door at {:?}", unit.id, door);
        ctx.log(
            HeistEventKind::DoorUnlocked {
                pos: door,
                unit: Some(unit.id),
            },
            format!("{} unlocked the door at ({}, {})", unit.name, door.x, door.y),
        );
    }
    unit.activity = travel_state(unit, goal, 0);
    Flow::Yield
}

/// The unit stands on its goal tile; start the work the objective asks for
fn arrive(unit: &mut Unit, ctx: &mut PlanContext) -> Flow {
    unit.blocked_reported = false;
    let Some(objective) = unit.current_objective() else {
        unit.activity = Activity::Idle;
        return Flow::Yield;
    };

    match (objective.kind, objective.target.clone()) {
        (ObjectiveKind::Hold, _) => {
            unit.activity = Activity::Holding { held: 0.0 };
            Flow::Yield
        }
        (ObjectiveKind::Escape, _) => {
            let bags = unit.extract(ctx.grid);
            let value: u32 = bags.iter().map(|b| b.value).sum();
            ctx.banked_loot.extend(bags);
            info!("unit {:?} extracted with {} loot", unit.id, value);
            ctx.log(
                HeistEventKind::UnitExtracted {
                    unit: unit.id,
                    loot_value: value,
                },
                format!("{} extracted", unit.name),
            );
            complete_objective(unit, ctx);
            Flow::Yield
        }
        (_, Some(ObjectiveTarget::Interactable(id))) => {
            let duration = match ctx.interactables.get(&id) {
                Some(item) => item.duration,
                None => {
                    fail_objective(unit, ctx, format!("interactable {} not found", id));
                    return Flow::Continue;
                }
            };
            unit.activity = Activity::Interacting {
                interactable: id,
                remaining: duration,
                attempts: 0,
            };
            Flow::Yield
        }
        _ => {
            complete_objective(unit, ctx);
            Flow::Continue
        }
    }
}

fn interact(
    unit: &mut Unit,
    ctx: &mut PlanContext,
    id: String,
    remaining: f32,
    attempts: u32,
) -> Flow {
    if remaining > 0.0 {
        unit.activity = Activity::Interacting {
            interactable: id,
            remaining,
            attempts,
        };
        return Flow::Yield;
    }

    let Some(item) = ctx.interactables.get_mut(&id) else {
        fail_objective(unit, ctx, format!("interactable {} not found", id));
        return Flow::Continue;
    };
    if !item.is_available() {
        fail_objective(unit, ctx, format!("interactable {} already looted", id));
        return Flow::Continue;
    }

    if skill_check(&mut *ctx.rng, unit.skill, item.dc) {
        item.used = true;
        let loot = item
            .is_loot()
            .then(|| LootBag::new(id.clone(), item.loot_value, item.is_score, unit.id));
        let signal = item.signal.clone();

        if let Some(bag) = loot {
            ctx.log(
                HeistEventKind::LootSecured {
                    unit: unit.id,
                    value: bag.value,
                    is_score: bag.is_score,
                },
                format!("{} bagged {} from {}", unit.name, bag.value, id),
            );
            unit.carried_loot.push(bag);
        }
        if let Some(signal) = signal {
            ctx.signals.emit(&signal, ctx.time);
        }
        complete_objective(unit, ctx);
        return Flow::Continue;
    }

    let duration = item.duration;
    let attempts = attempts + 1;
    debug!("unit {:?} failed check on {} (attempt {})", unit.id, id, attempts);
    ctx.log(
        HeistEventKind::InteractionFailed {
            unit: unit.id,
            interactable: id.clone(),
            attempt: attempts,
        },
        format!("{} fumbled {}", unit.name, id),
    );
    ctx.penalize(ctx.config.failed_check_penalty_seconds);

    if attempts >= ctx.config.max_interaction_attempts {
        fail_objective(unit, ctx, format!("{} failed {} checks", id, attempts));
        return Flow::Continue;
    }
    unit.activity = Activity::Interacting {
        interactable: id,
        remaining: duration,
        attempts,
    };
    Flow::Yield
}

fn hold(unit: &mut Unit, ctx: &mut PlanContext, held: f32) -> Flow {
    let Some(objective) = unit.current_objective() else {
        return Flow::Yield;
    };
    let long_enough = held >= objective.hold_duration;
    let released = objective
        .trigger
        .as_ref()
        .map_or(true, |t| t.evaluate(&ctx.trigger_context()));

    if long_enough && released {
        complete_objective(unit, ctx);
        Flow::Continue
    } else {
        unit.activity = Activity::Holding { held };
        Flow::Yield
    }
}

fn complete_objective(unit: &mut Unit, ctx: &mut PlanContext) {
    let Some(objective) = unit.current_objective_mut() else {
        return;
    };
    objective.status = ObjectiveStatus::Completed;
    let objective_id = objective.id;
    let emits = objective.emits.clone();

    info!("unit {:?} completed objective {:?}", unit.id, objective_id);
    if let Some(signal) = emits {
        ctx.signals.emit(&signal, ctx.time);
    }
    ctx.log(
        HeistEventKind::ObjectiveCompleted {
            unit: unit.id,
            objective: objective_id,
        },
        format!("{} completed objective {:?}", unit.name, objective_id),
    );
    unit.cursor += 1;
    unit.activity = Activity::Idle;
}

fn fail_objective(unit: &mut Unit, ctx: &mut PlanContext, reason: String) {
    unit.stop(ctx.grid);
    ctx.paths.cancel(unit.id);
    let Some(objective) = unit.current_objective_mut() else {
        return;
    };
    objective.status = ObjectiveStatus::Failed;
    let objective_id = objective.id;

    warn!("unit {:?} objective {:?} failed: {}", unit.id, objective_id, reason);
    ctx.log(
        HeistEventKind::ObjectiveFailed {
            unit: unit.id,
            objective: objective_id,
            reason: reason.clone(),
        },
        format!("{} failed objective {:?}: {}", unit.name, objective_id, reason),
    );
    unit.cursor += 1;
    unit.activity = Activity::Idle;
}

/// Put `objective` ahead of the current one. An interrupted objective goes
/// back to Pending and resumes afterwards. Refused once the unit is
/// escaping after SCRAM.
pub fn preempt(unit: &mut Unit, grid: &mut Grid, paths: &mut PathService, objective: Objective) -> bool {
    if unit.is_terminal() || unit.scrammed {
        return false;
    }
    paths.cancel(unit.id);
    unit.path_inbox = None;
    unit.stop(grid);

    while unit
        .current_objective()
        .is_some_and(|o| o.status.is_finished())
    {
        unit.cursor += 1;
    }
    if let Some(current) = unit.current_objective_mut() {
        current.status = ObjectiveStatus::Pending;
    }
    let at = unit.cursor.min(unit.plan.len());
    unit.plan.insert(at, objective);
    unit.cursor = at;
    unit.activity = Activity::Idle;
    true
}
