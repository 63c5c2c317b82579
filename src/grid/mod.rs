//! Building grid: tiles, zones, line of sight and pathfinding

pub mod constants;
pub mod los;
pub mod map;
pub mod path_service;
pub mod pathfinding;
pub mod tile;
pub mod zone;

pub use los::{line_of_sight, supercover_line, LineOfSight};
pub use map::Grid;
pub use path_service::{PathRequestId, PathResult, PathService};
pub use pathfinding::{CostGrid, Pathfinder};
pub use tile::{DoorState, Terrain, Tile, TileType, TileVisibility};
pub use zone::Zone;
