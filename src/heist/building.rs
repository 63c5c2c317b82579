//! Building definitions loaded from JSON
//!
//! `BuildingDef` mirrors the on-disk format (camelCase keys). `materialize`
//! turns it into a grid, observers, interactables and crew, validating every
//! reference on the way.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::config::SimulationConfig;
use crate::core::error::{HeistError, Result};
use crate::core::types::{ObserverId, TilePos, UnitId};
use crate::crew::unit::Unit;
use crate::economy::arrangements::{Arrangement, ArrangementEffect, ArrangementKind};
use crate::grid::constants::MAX_GRID_DIMENSION;
use crate::grid::los::supercover_line;
use crate::grid::map::Grid;
use crate::grid::tile::{Terrain, TileType};
use crate::grid::zone::Zone;
use crate::objectives::interactable::{Interactable, InteractableKind};
use crate::vision::cone::VisionCone;
use crate::vision::observer::{Observer, DEFAULT_DETECTION_RATE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectDef {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointDef {
    pub x: i32,
    pub y: i32,
}

impl From<PointDef> for TilePos {
    fn from(p: PointDef) -> Self {
        TilePos::new(p.x, p.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellDef {
    pub shell: RectDef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoorDef {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub unlock_duration: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomDef {
    #[serde(default)]
    pub zone: Option<String>,
    pub bounds: RectDef,
    /// Walled room (true) or open floor area (false)
    #[serde(default = "default_true")]
    pub interior: bool,
    #[serde(default)]
    pub doors: Vec<DoorDef>,
    #[serde(default)]
    pub connections: Vec<String>,
    #[serde(default)]
    pub terrain: Option<Terrain>,
}

fn default_true() -> bool {
    true
}

/// Single-tile structural feature (window, vent, pillar)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureDef {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub tile_type: TileType,
    #[serde(default)]
    pub terrain: Option<Terrain>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConeDef {
    pub fov: f32,
    pub range: f32,
    #[serde(default)]
    pub facing: f32,
    #[serde(default)]
    pub detection_rate: Option<f32>,
}

impl ConeDef {
    fn to_cone(&self, pos: TilePos) -> VisionCone {
        VisionCone::new(
            pos,
            self.facing,
            self.fov,
            self.range,
            self.detection_rate.unwrap_or(DEFAULT_DETECTION_RATE),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardDef {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub vision_cone: ConeDef,
    #[serde(default)]
    pub patrol: Vec<PointDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDef {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub vision_cone: ConeDef,
    #[serde(default)]
    pub sweep: f32,
    #[serde(default)]
    pub sweep_speed: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractableDef {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: InteractableKind,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub duration: f32,
    #[serde(default)]
    pub dc: i32,
    #[serde(default)]
    pub loot_value: u32,
    #[serde(default)]
    pub is_score: bool,
    #[serde(default)]
    pub signal: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnDef {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub skill: i32,
    #[serde(default)]
    pub extraction: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionPoint {
    pub id: String,
    #[serde(flatten)]
    pub pos: TilePos,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionDef {
    #[serde(default)]
    pub points: Vec<ExtractionPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HiddenZoneDef {
    pub id: String,
    pub intel_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrangementDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: ArrangementKind,
    pub cost: u32,
    #[serde(default = "default_uses")]
    pub uses: u32,
    pub effect: ArrangementEffect,
}

fn default_uses() -> u32 {
    1
}

/// On-disk building format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingDef {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    #[serde(default)]
    pub building: Option<ShellDef>,
    #[serde(default)]
    pub rooms: Vec<RoomDef>,
    #[serde(default)]
    pub features: Vec<FeatureDef>,
    #[serde(default)]
    pub guards: Vec<GuardDef>,
    #[serde(default)]
    pub cameras: Vec<CameraDef>,
    #[serde(default)]
    pub interactables: Vec<InteractableDef>,
    #[serde(default)]
    pub crew_spawns: Vec<SpawnDef>,
    #[serde(default)]
    pub extraction: ExtractionDef,
    #[serde(default)]
    pub hidden_zones: Vec<HiddenZoneDef>,
    #[serde(default)]
    pub initially_revealed: Vec<String>,
    #[serde(default)]
    pub arrangements: Vec<ArrangementDef>,
}

/// A materialized building, ready to become a heist
#[derive(Debug, Clone)]
pub struct Building {
    pub grid: Grid,
    pub observers: Vec<Observer>,
    pub interactables: BTreeMap<String, Interactable>,
    pub crew: Vec<Unit>,
    pub extraction_points: Vec<ExtractionPoint>,
    /// (zone id, intel cost)
    pub hidden_zones: Vec<(String, u32)>,
    pub initially_revealed: Vec<String>,
    pub arrangements: Vec<Arrangement>,
}

impl BuildingDef {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn materialize(&self, config: &SimulationConfig) -> Result<Building> {
        if self.width == 0
            || self.height == 0
            || self.width > MAX_GRID_DIMENSION
            || self.height > MAX_GRID_DIMENSION
        {
            return Err(invalid(format!(
                "grid size {}x{} outside 1..={}",
                self.width, self.height, MAX_GRID_DIMENSION
            )));
        }

        let mut grid = Grid::new(self.width, self.height);
        self.build_structure(&mut grid, config)?;

        let observers = self.build_observers(&grid)?;
        let interactables = self.build_interactables(&grid)?;
        let extraction_points = self.build_extraction(&grid)?;
        let crew = self.build_crew(&grid)?;

        let mut hidden_zones = Vec::new();
        for hidden in &self.hidden_zones {
            if grid.zone(&hidden.id).is_none() {
                return Err(HeistError::ZoneNotFound(hidden.id.clone()));
            }
            hidden_zones.push((hidden.id.clone(), hidden.intel_cost));
        }
        for id in &self.initially_revealed {
            if grid.zone(id).is_none() {
                return Err(HeistError::ZoneNotFound(id.clone()));
            }
        }

        let arrangements = self
            .arrangements
            .iter()
            .map(|a| {
                let name = if a.name.is_empty() { a.id.clone() } else { a.name.clone() };
                Arrangement::new(a.id.clone(), name, a.kind, a.cost, a.uses, a.effect.clone())
            })
            .collect();

        info!(
            "building {}x{} loaded: {} zones, {} crew, {} observers, {} interactables",
            self.width,
            self.height,
            self.zones.len(),
            crew.len(),
            observers.len(),
            interactables.len()
        );

        Ok(Building {
            grid,
            observers,
            interactables,
            crew,
            extraction_points,
            hidden_zones,
            initially_revealed: self.initially_revealed.clone(),
            arrangements,
        })
    }

    fn build_structure(&self, grid: &mut Grid, config: &SimulationConfig) -> Result<()> {
        for zone in &self.zones {
            grid.add_zone(Zone::new(zone.id.clone(), zone.name.clone(), zone.color.clone()));
        }

        if let Some(shell) = &self.building {
            let r = shell.shell;
            grid.fill_rect(r.x1, r.y1, r.x2, r.y2, TileType::Floor);
            grid.draw_rect(r.x1, r.y1, r.x2, r.y2, TileType::Wall);
        }

        // Geometry first so a later room's walls cannot bury an earlier door
        for room in &self.rooms {
            let b = room.bounds;
            grid.fill_rect(b.x1, b.y1, b.x2, b.y2, TileType::Floor);
            if room.interior {
                grid.draw_rect(b.x1, b.y1, b.x2, b.y2, TileType::Wall);
            }
            if let Some(terrain) = room.terrain {
                for y in b.y1.min(b.y2)..=b.y1.max(b.y2) {
                    for x in b.x1.min(b.x2)..=b.x1.max(b.x2) {
                        grid.set_terrain(TilePos::new(x, y), terrain);
                    }
                }
            }
            if let Some(zone_id) = &room.zone {
                if grid.zone(zone_id).is_none() {
                    return Err(HeistError::ZoneNotFound(zone_id.clone()));
                }
                grid.assign_zone_rect(zone_id, b.x1, b.y1, b.x2, b.y2);
                for other in &room.connections {
                    if grid.zone(other).is_none() {
                        return Err(HeistError::ZoneNotFound(other.clone()));
                    }
                    if let Some(zone) = grid.zone_mut(zone_id) {
                        zone.connect(other);
                    }
                    if let Some(zone) = grid.zone_mut(other) {
                        zone.connect(zone_id);
                    }
                }
            }
        }

        for feature in &self.features {
            let pos = TilePos::new(feature.x, feature.y);
            check_bounds(grid, pos, "feature")?;
            grid.set_tile(pos, feature.tile_type);
            if let Some(terrain) = feature.terrain {
                grid.set_terrain(pos, terrain);
            }
        }

        for room in &self.rooms {
            for door in &room.doors {
                let pos = TilePos::new(door.x, door.y);
                check_bounds(grid, pos, "door")?;
                let duration = door.unlock_duration.unwrap_or(config.default_unlock_duration);
                grid.place_door(pos, door.locked, duration);
            }
        }

        Ok(())
    }

    fn build_observers(&self, grid: &Grid) -> Result<Vec<Observer>> {
        let mut observers = Vec::new();
        let mut next_id = 0;

        for guard in &self.guards {
            let pos = TilePos::new(guard.x, guard.y);
            check_bounds(grid, pos, &format!("guard {}", guard.id))?;
            let patrol: Vec<TilePos> = guard.patrol.iter().map(|p| TilePos::from(*p)).collect();
            for waypoint in &patrol {
                check_bounds(grid, *waypoint, &format!("patrol of {}", guard.id))?;
            }
            check_patrol(grid, pos, &patrol, &guard.id)?;
            observers.push(Observer::guard(
                ObserverId(next_id),
                guard.id.clone(),
                pos,
                guard.vision_cone.to_cone(pos),
                patrol,
            ));
            next_id += 1;
        }

        for camera in &self.cameras {
            let pos = TilePos::new(camera.x, camera.y);
            check_bounds(grid, pos, &format!("camera {}", camera.id))?;
            observers.push(Observer::camera(
                ObserverId(next_id),
                camera.id.clone(),
                pos,
                camera.vision_cone.to_cone(pos),
                camera.sweep,
                camera.sweep_speed,
            ));
            next_id += 1;
        }

        Ok(observers)
    }

    fn build_interactables(&self, grid: &Grid) -> Result<BTreeMap<String, Interactable>> {
        let mut interactables = BTreeMap::new();
        for def in &self.interactables {
            let pos = TilePos::new(def.x, def.y);
            check_bounds(grid, pos, &format!("interactable {}", def.id))?;
            let mut item = Interactable::new(def.id.clone(), def.kind, pos, def.duration.max(0.0))
                .with_dc(def.dc)
                .with_loot(def.loot_value, def.is_score);
            item.signal = def.signal.clone();
            if interactables.insert(def.id.clone(), item).is_some() {
                return Err(invalid(format!("duplicate interactable id {}", def.id)));
            }
        }
        Ok(interactables)
    }

    fn build_extraction(&self, grid: &Grid) -> Result<Vec<ExtractionPoint>> {
        for point in &self.extraction.points {
            if !grid.is_walkable(point.pos) {
                return Err(invalid(format!(
                    "extraction point {} at {:?} is not walkable",
                    point.id, point.pos
                )));
            }
        }
        if self.extraction.points.is_empty() {
            debug!("building has no extraction points");
        }
        Ok(self.extraction.points.clone())
    }

    fn build_crew(&self, grid: &Grid) -> Result<Vec<Unit>> {
        let mut crew = Vec::new();
        for (i, spawn) in self.crew_spawns.iter().enumerate() {
            let pos = TilePos::new(spawn.x, spawn.y);
            if !grid.is_walkable(pos) {
                return Err(invalid(format!("crew spawn {:?} is not walkable", pos)));
            }
            if crew.iter().any(|u: &Unit| u.grid_pos() == pos) {
                return Err(invalid(format!("two crew spawns share {:?}", pos)));
            }
            let name = spawn.name.clone().unwrap_or_else(|| format!("crew-{}", i));
            let mut unit = Unit::new(UnitId(i as u32), name, pos).with_skill(spawn.skill);
            unit.extraction = spawn.extraction.clone();
            crew.push(unit);
        }
        Ok(crew)
    }
}

fn invalid(message: String) -> HeistError {
    HeistError::InvalidBuilding(message)
}

/// Guards walk straight legs: start to the first waypoint, then around the
/// loop and back to the first. Every tile a leg touches must be walkable.
fn check_patrol(grid: &Grid, start: TilePos, patrol: &[TilePos], guard: &str) -> Result<()> {
    let Some(&first) = patrol.first() else {
        return Ok(());
    };
    let legs = std::iter::once((start, first))
        .chain(patrol.windows(2).map(|leg| (leg[0], leg[1])))
        .chain(patrol.last().map(|&last| (last, first)));

    for (from, to) in legs {
        if let Some(blocked) = supercover_line(from, to)
            .into_iter()
            .find(|p| !grid.is_walkable(*p))
        {
            return Err(invalid(format!(
                "patrol of {} crosses {:?} between {:?} and {:?}",
                guard, blocked, from, to
            )));
        }
    }
    Ok(())
}

fn check_bounds(grid: &Grid, pos: TilePos, what: &str) -> Result<()> {
    if grid.in_bounds(pos) {
        Ok(())
    } else {
        Err(invalid(format!("{} at {:?} is outside the grid", what, pos)))
    }
}
