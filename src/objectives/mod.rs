//! Objectives, triggers, interactables and the per-unit plan machine

pub mod interactable;
pub mod machine;
pub mod objective;
pub mod trigger;

pub use interactable::{skill_check, Interactable, InteractableKind};
pub use machine::{preempt, select_extraction, step_unit, Activity, PlanContext};
pub use objective::{Objective, ObjectiveKind, ObjectiveStatus, ObjectiveTarget};
pub use trigger::{Trigger, TriggerContext};
