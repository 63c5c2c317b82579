//! Intel and cash economy: sector reveals and arrangements

pub mod arrangements;
pub mod sectors;

pub use arrangements::{
    Arrangement, ArrangementEffect, ArrangementEngine, ArrangementKind, EffectContext,
};
pub use sectors::{Sector, SectorManager, SectorState};
