//! Observer vision cones and detection

pub mod cone;
pub mod observer;

pub use cone::{angle_difference, AwarenessState, DetectionMeter, DetectionParams, VisionCone};
pub use observer::{Observer, ObserverKind, DEFAULT_DETECTION_RATE};
