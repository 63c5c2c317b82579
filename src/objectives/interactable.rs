//! Interactable map objects: terminals, safes, keypads, loot

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::types::TilePos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InteractableKind {
    Terminal,
    Safe,
    Keypad,
    Panel,
    Loot,
    #[default]
    #[serde(other)]
    Generic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interactable {
    pub id: String,
    pub kind: InteractableKind,
    pub pos: TilePos,
    /// Seconds per attempt
    pub duration: f32,
    /// Difficulty class for the d20 check; 0 always succeeds
    pub dc: i32,
    pub loot_value: u32,
    pub is_score: bool,
    /// Signal emitted on successful use
    pub signal: Option<String>,
    pub used: bool,
}

impl Interactable {
    pub fn new(id: impl Into<String>, kind: InteractableKind, pos: TilePos, duration: f32) -> Self {
        Self {
            id: id.into(),
            kind,
            pos,
            duration,
            dc: 0,
            loot_value: 0,
            is_score: false,
            signal: None,
            used: false,
        }
    }

    pub fn with_dc(mut self, dc: i32) -> Self {
        self.dc = dc;
        self
    }

    pub fn with_loot(mut self, value: u32, is_score: bool) -> Self {
        self.loot_value = value;
        self.is_score = is_score;
        self
    }

    pub fn with_signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    pub fn is_loot(&self) -> bool {
        self.loot_value > 0 || self.kind == InteractableKind::Loot
    }

    /// Loot can be taken once; everything else can be reused
    pub fn is_available(&self) -> bool {
        !(self.is_loot() && self.used)
    }

    /// Can a unit standing on `pos` work this object?
    pub fn in_reach(&self, pos: TilePos) -> bool {
        pos.chebyshev(&self.pos) <= 1
    }
}

/// d20 + skill against a difficulty class
pub fn skill_check<R: Rng>(rng: &mut R, skill: i32, dc: i32) -> bool {
    if dc <= 0 {
        return true;
    }
    let roll: i32 = rng.gen_range(1..=20);
    roll + skill >= dc
}
