//! Supercover line rasterization and line-of-sight queries
//!
//! A supercover line visits every tile the segment between two tile centres
//! touches. When the segment passes exactly through a tile corner both side
//! tiles are visited, so sight never slips between two diagonal walls.

use crate::core::types::TilePos;
use crate::grid::map::Grid;

/// Result of a line-of-sight query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineOfSight {
    /// No opaque tile between observer and target
    pub clear: bool,
    /// The ray passed through (or ended on) a cover tile
    pub through_cover: bool,
}

/// Every tile touched by the segment from `from` to `to`, both ends included
pub fn supercover_line(from: TilePos, to: TilePos) -> Vec<TilePos> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let nx = dx.abs();
    let ny = dy.abs();
    let sign_x = dx.signum();
    let sign_y = dy.signum();

    let mut points = Vec::with_capacity((nx + ny + 1) as usize);
    let mut current = from;
    points.push(current);

    let (mut ix, mut iy) = (0, 0);
    while ix < nx || iy < ny {
        let decision = (1 + 2 * ix) * ny - (1 + 2 * iy) * nx;
        if decision == 0 {
            // Exactly through a corner: touch both neighbours, then step diagonally
            points.push(current.offset(sign_x, 0));
            points.push(current.offset(0, sign_y));
            current = current.offset(sign_x, sign_y);
            ix += 1;
            iy += 1;
        } else if decision < 0 {
            current = current.offset(sign_x, 0);
            ix += 1;
        } else {
            current = current.offset(0, sign_y);
            iy += 1;
        }
        points.push(current);
    }

    points
}

/// Cast a ray from `from` to `to`. The observer's own tile never blocks.
/// Cover is recorded before the opacity check, so an opaque cover tile
/// (a vent) both blocks and reports cover.
pub fn line_of_sight(grid: &Grid, from: TilePos, to: TilePos) -> LineOfSight {
    let mut result = LineOfSight {
        clear: true,
        through_cover: false,
    };

    for pos in supercover_line(from, to).into_iter().skip(1) {
        let Some(tile) = grid.tile(pos) else {
            result.clear = false;
            return result;
        };
        if tile.is_cover() {
            result.through_cover = true;
        }
        if !tile.is_transparent() {
            result.clear = false;
            return result;
        }
    }

    result
}
