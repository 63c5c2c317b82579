//! Grid constants - tunable values for the tile model and pathing

/// Cost multiplier for a diagonal step (approximates sqrt(2))
pub const DIAGONAL_COST: f32 = 1.4;

/// Cheapest terrain cost; keeps the A* heuristic admissible
pub const MIN_TERRAIN_COST: f32 = 1.0;

/// Largest grid dimension accepted from building definitions
pub const MAX_GRID_DIMENSION: u32 = 512;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagonal_cost_between_one_and_two() {
        assert!(DIAGONAL_COST > 1.0 && DIAGONAL_COST < 2.0);
    }
}
