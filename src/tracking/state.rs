//! Arm/calibrate state machine.
//!
//! ```text
//!   Idle --toggle--> Calibrating --first target--> Active
//!    ^                   |                            |
//!    +------toggle-------+-----------toggle-----------+
//! ```
//!
//! The reference distance is captured exactly once per arming episode.

use crate::detect::Detection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Calibrating,
    Active,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingState {
    armed: bool,
    needs_calibration: bool,
    reference_distance: f64,
}

impl TrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        match (self.armed, self.needs_calibration) {
            (false, _) => Phase::Idle,
            (true, true) => Phase::Calibrating,
            (true, false) => Phase::Active,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn needs_calibration(&self) -> bool {
        self.needs_calibration
    }

    pub fn reference_distance(&self) -> f64 {
        self.reference_distance
    }

    /// Flip arming. Returns the new phase.
    ///
    /// Arming always lands in `Calibrating`; disarming clears any pending
    /// calibration so a later re-arm starts fresh.
    pub fn toggle(&mut self) -> Phase {
        self.armed = !self.armed;
        self.needs_calibration = self.armed;
        self.phase()
    }

    /// Capture the reference distance from `target` if calibration is pending.
    ///
    /// Returns `Some(reference)` only on the capturing call.
    pub fn calibrate(&mut self, target: &Detection) -> Option<f64> {
        if !self.armed || !self.needs_calibration {
            return None;
        }
        self.reference_distance = target.diagonal();
        self.needs_calibration = false;
        Some(self.reference_distance)
    }
}
