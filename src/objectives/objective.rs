//! Objectives: one scripted step in a unit's plan

use serde::{Deserialize, Serialize};

use crate::core::types::{ObjectiveId, TilePos};
use crate::objectives::trigger::Trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveKind {
    /// Go somewhere, optionally use an interactable there
    Action,
    /// Stay put until the release trigger fires
    Hold,
    /// Use a loot interactable and carry the bag
    Loot,
    /// Walk to an extraction point and leave
    Escape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectiveTarget {
    Tile(TilePos),
    Interactable(String),
    Zone(String),
    /// A specific extraction point, or the unit's assigned/default one
    Extraction(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObjectiveStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Aborted,
    /// Target missing or unreachable, or too many failed attempts
    Failed,
}

impl ObjectiveStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            ObjectiveStatus::Completed | ObjectiveStatus::Aborted | ObjectiveStatus::Failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    #[serde(default = "unassigned_id")]
    pub id: ObjectiveId,
    #[serde(rename = "type")]
    pub kind: ObjectiveKind,
    #[serde(default)]
    pub target: Option<ObjectiveTarget>,
    /// Start trigger, or release trigger for Hold
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub status: ObjectiveStatus,
    /// Signal emitted on completion
    #[serde(default)]
    pub emits: Option<String>,
    /// Minimum seconds a Hold lasts
    #[serde(default)]
    pub hold_duration: f32,
}

fn unassigned_id() -> ObjectiveId {
    ObjectiveId(0)
}

impl Objective {
    pub fn new(kind: ObjectiveKind, target: Option<ObjectiveTarget>) -> Self {
        Self {
            id: unassigned_id(),
            kind,
            target,
            trigger: None,
            status: ObjectiveStatus::Pending,
            emits: None,
            hold_duration: 0.0,
        }
    }

    /// Walk to a tile
    pub fn move_to(pos: TilePos) -> Self {
        Self::new(ObjectiveKind::Action, Some(ObjectiveTarget::Tile(pos)))
    }

    pub fn interact(interactable: impl Into<String>) -> Self {
        Self::new(
            ObjectiveKind::Action,
            Some(ObjectiveTarget::Interactable(interactable.into())),
        )
    }

    pub fn loot(interactable: impl Into<String>) -> Self {
        Self::new(
            ObjectiveKind::Loot,
            Some(ObjectiveTarget::Interactable(interactable.into())),
        )
    }

    /// Hold in place (or at `target` once reached)
    pub fn hold(target: Option<ObjectiveTarget>) -> Self {
        Self::new(ObjectiveKind::Hold, target)
    }

    pub fn escape(extraction: Option<String>) -> Self {
        Self::new(
            ObjectiveKind::Escape,
            Some(ObjectiveTarget::Extraction(extraction)),
        )
    }

    pub fn with_id(mut self, id: ObjectiveId) -> Self {
        self.id = id;
        self
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_emits(mut self, signal: impl Into<String>) -> Self {
        self.emits = Some(signal.into());
        self
    }

    pub fn with_hold_duration(mut self, seconds: f32) -> Self {
        self.hold_duration = seconds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let obj = Objective::hold(None)
            .with_trigger(Trigger::signal("go"))
            .with_hold_duration(4.0)
            .with_emits("held");
        assert_eq!(obj.kind, ObjectiveKind::Hold);
        assert_eq!(obj.status, ObjectiveStatus::Pending);
        assert_eq!(obj.hold_duration, 4.0);
        assert_eq!(obj.emits.as_deref(), Some("held"));
    }

    #[test]
    fn test_finished_statuses() {
        assert!(!ObjectiveStatus::Pending.is_finished());
        assert!(!ObjectiveStatus::InProgress.is_finished());
        assert!(ObjectiveStatus::Completed.is_finished());
        assert!(ObjectiveStatus::Aborted.is_finished());
        assert!(ObjectiveStatus::Failed.is_finished());
    }

    #[test]
    fn test_objective_from_json() {
        let json = r#"{
            "type": "Loot",
            "target": {"interactable": "vault_safe"},
            "trigger": {"signal": "alarm_cut"},
            "emits": "got_it"
        }"#;
        let obj: Objective = serde_json::from_str(json).unwrap();
        assert_eq!(obj.kind, ObjectiveKind::Loot);
        assert_eq!(obj.target, Some(ObjectiveTarget::Interactable("vault_safe".into())));
        assert_eq!(obj.trigger, Some(Trigger::signal("alarm_cut")));
        assert_eq!(obj.status, ObjectiveStatus::Pending);
    }
}
