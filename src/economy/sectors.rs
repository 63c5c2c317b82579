//! Intel-gated sector reveals
//!
//! A sector mirrors a hidden zone. Buying it reveals every tile of the zone;
//! the reveal cannot be undone until the heist is reset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::error::PurchaseError;
use crate::grid::map::Grid;
use crate::grid::tile::TileVisibility;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SectorState {
    #[default]
    Hidden,
    Revealed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sector {
    /// Same id as the zone it gates
    pub id: String,
    pub intel_cost: u32,
    pub state: SectorState,
}

#[derive(Debug, Clone, Default)]
pub struct SectorManager {
    sectors: BTreeMap<String, Sector>,
    intel: u32,
}

impl SectorManager {
    pub fn new(intel: u32) -> Self {
        Self {
            sectors: BTreeMap::new(),
            intel,
        }
    }

    pub fn add_sector(&mut self, id: impl Into<String>, intel_cost: u32) {
        let id = id.into();
        self.sectors.insert(
            id.clone(),
            Sector {
                id,
                intel_cost,
                state: SectorState::Hidden,
            },
        );
    }

    pub fn intel(&self) -> u32 {
        self.intel
    }

    pub fn add_intel(&mut self, amount: u32) {
        self.intel = self.intel.saturating_add(amount);
    }

    pub fn sector(&self, id: &str) -> Option<&Sector> {
        self.sectors.get(id)
    }

    pub fn sectors(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.values()
    }

    pub fn is_revealed(&self, id: &str) -> bool {
        self.sectors
            .get(id)
            .is_some_and(|s| s.state == SectorState::Revealed)
    }

    /// Spend intel to reveal a sector. Fails closed: on any error neither
    /// intel nor the sector changes. Returns the intel left.
    pub fn purchase(&mut self, id: &str, grid: &mut Grid) -> Result<u32, PurchaseError> {
        let sector = self
            .sectors
            .get_mut(id)
            .ok_or_else(|| PurchaseError::NotFound(id.to_string()))?;

        if sector.state == SectorState::Revealed {
            return Err(PurchaseError::AlreadyRevealed(id.to_string()));
        }
        if self.intel < sector.intel_cost {
            debug!(
                "sector {} needs {} intel, have {}",
                id, sector.intel_cost, self.intel
            );
            return Err(PurchaseError::InsufficientFunds {
                needed: sector.intel_cost,
                available: self.intel,
            });
        }

        self.intel -= sector.intel_cost;
        sector.state = SectorState::Revealed;
        grid.set_zone_visibility(id, TileVisibility::Revealed);
        info!("sector {} revealed for {} intel", id, sector.intel_cost);
        Ok(self.intel)
    }

    /// Reveal without paying (initially revealed zones). Returns false if the
    /// sector is unknown or already revealed.
    pub fn reveal_free(&mut self, id: &str, grid: &mut Grid) -> bool {
        match self.sectors.get_mut(id) {
            Some(sector) if sector.state == SectorState::Hidden => {
                sector.state = SectorState::Revealed;
                grid.set_zone_visibility(id, TileVisibility::Revealed);
                true
            }
            _ => false,
        }
    }

    /// Hide every sector again and restore intel
    pub fn reset(&mut self, intel: u32, grid: &mut Grid) {
        for sector in self.sectors.values_mut() {
            sector.state = SectorState::Hidden;
            grid.set_zone_visibility(&sector.id, TileVisibility::Hidden);
        }
        self.intel = intel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TilePos;
    use crate::grid::zone::Zone;

    fn setup(intel: u32) -> (SectorManager, Grid) {
        let mut grid = Grid::open(6, 6);
        grid.add_zone(Zone::new("vault", "Vault", "#ffd700"));
        grid.assign_zone_rect("vault", 3, 3, 5, 5);
        let mut sectors = SectorManager::new(intel);
        sectors.add_sector("vault", 3);
        (sectors, grid)
    }

    #[test]
    fn test_insufficient_intel_fails_closed() {
        let (mut sectors, mut grid) = setup(2);
        let err = sectors.purchase("vault", &mut grid).unwrap_err();
        assert_eq!(
            err,
            PurchaseError::InsufficientFunds {
                needed: 3,
                available: 2
            }
        );
        assert_eq!(sectors.intel(), 2);
        assert_eq!(sectors.sector("vault").unwrap().state, SectorState::Hidden);
        assert_eq!(grid.visibility(TilePos::new(4, 4)), Some(TileVisibility::Hidden));
    }

    #[test]
    fn test_purchase_reveals_zone_once() {
        let (mut sectors, mut grid) = setup(5);
        assert_eq!(sectors.purchase("vault", &mut grid), Ok(2));
        assert_eq!(grid.visibility(TilePos::new(4, 4)), Some(TileVisibility::Revealed));
        assert!(sectors.is_revealed("vault"));

        assert_eq!(
            sectors.purchase("vault", &mut grid),
            Err(PurchaseError::AlreadyRevealed("vault".into()))
        );
        assert_eq!(sectors.intel(), 2);
    }

    #[test]
    fn test_unknown_sector() {
        let (mut sectors, mut grid) = setup(5);
        assert_eq!(
            sectors.purchase("roof", &mut grid),
            Err(PurchaseError::NotFound("roof".into()))
        );
    }

    #[test]
    fn test_reveal_free_and_reset() {
        let (mut sectors, mut grid) = setup(0);
        assert!(sectors.reveal_free("vault", &mut grid));
        assert!(!sectors.reveal_free("vault", &mut grid));
        assert_eq!(sectors.intel(), 0);

        sectors.reset(4, &mut grid);
        assert!(!sectors.is_revealed("vault"));
        assert_eq!(sectors.intel(), 4);
        assert_eq!(grid.visibility(TilePos::new(3, 3)), Some(TileVisibility::Hidden));
    }
}
