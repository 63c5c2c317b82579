//! Loot bags carried by crew members

use serde::{Deserialize, Serialize};

use crate::core::types::UnitId;

/// Created by a successful loot interaction. Forfeited if the carrier is
/// captured; banked when the carrier extracts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LootBag {
    pub value: u32,
    /// Score loot counts towards the heist objective; the rest is bonus
    pub is_score: bool,
    pub carrier: Option<UnitId>,
    pub extracted: bool,
    /// Interactable the bag came from
    pub source: String,
}

impl LootBag {
    pub fn new(source: impl Into<String>, value: u32, is_score: bool, carrier: UnitId) -> Self {
        Self {
            value,
            is_score,
            carrier: Some(carrier),
            extracted: false,
            source: source.into(),
        }
    }
}

/// Totals of banked loot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootTotals {
    pub score: u32,
    pub bonus: u32,
    pub bags: u32,
}

impl LootTotals {
    pub fn add(&mut self, bag: &LootBag) {
        if bag.is_score {
            self.score += bag.value;
        } else {
            self.bonus += bag.value;
        }
        self.bags += 1;
    }
}
