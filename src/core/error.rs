use thiserror::Error;

use crate::core::types::UnitId;

#[derive(Error, Debug)]
pub enum HeistError {
    #[error("Unit not found: {0:?}")]
    UnitNotFound(UnitId),

    #[error("Zone not found: {0}")]
    ZoneNotFound(String),

    #[error("Invalid building definition: {0}")]
    InvalidBuilding(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("Purchase rejected: {0}")]
    Purchase(#[from] PurchaseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Rejection reasons for sector and arrangement purchases
///
/// Every rejection leaves the economy state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PurchaseError {
    #[error("no such item: {0}")]
    NotFound(String),

    #[error("sector already revealed: {0}")]
    AlreadyRevealed(String),

    #[error("arrangement already purchased: {0}")]
    AlreadyPurchased(String),

    #[error("insufficient funds: need {needed}, have {available}")]
    InsufficientFunds { needed: u32, available: u32 },

    #[error("arrangement not purchased: {0}")]
    NotPurchased(String),

    #[error("arrangement cannot be triggered: {0}")]
    NotTriggerable(String),

    #[error("no uses remaining: {0}")]
    NoUsesRemaining(String),
}

pub type Result<T> = std::result::Result<T, HeistError>;
