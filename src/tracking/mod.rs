//! Tracking core: pick a target, decide whether control is armed, steer.

pub mod controller;
pub mod selector;
pub mod state;

pub use controller::{Controller, Steering, FORWARD_RATE, VERTICAL_RATE, YAW_RATE};
pub use selector::{Selection, SelectionMode, TargetSelector, CONFIDENCE_THRESHOLD};
pub use state::{Phase, TrackingState};
