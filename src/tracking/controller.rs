//! Threshold steering.
//!
//! Three independent axes, each a three-way comparison yielding a fixed-size
//! step or a stop. No proportional term: the box's offset only decides the
//! sign, never the magnitude.

use crate::detect::Detection;

/// Yaw step, percent of max rate.
pub const YAW_RATE: i8 = 50;
/// Vertical step, percent of max rate.
pub const VERTICAL_RATE: i8 = 25;
/// Forward/back step, percent of max rate.
pub const FORWARD_RATE: i8 = 20;
/// Distance tolerance as a fraction of the nominal frame diagonal.
pub const TOLERANCE_FRACTION: f64 = 0.05;

/// Signed per-axis rates. Positive is clockwise, up, forward; zero holds the
/// axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Steering {
    pub yaw: i8,
    pub vertical: i8,
    pub forward: i8,
}

impl Steering {
    pub const STOP: Steering = Steering {
        yaw: 0,
        vertical: 0,
        forward: 0,
    };
}

#[derive(Clone, Debug)]
pub struct Controller {
    tolerance: f64,
}

impl Controller {
    /// Tolerance is fixed from the nominal frame size, not the live one.
    pub fn new(nominal_width: u32, nominal_height: u32) -> Self {
        let w = nominal_width as f64;
        let h = nominal_height as f64;
        Self::with_tolerance(TOLERANCE_FRACTION * (w * w + h * h).sqrt())
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Steering for `target` in a `width` x `height` frame, holding
    /// `reference` as the apparent-size setpoint.
    pub fn steer(&self, target: &Detection, width: u32, height: u32, reference: f64) -> Steering {
        Steering {
            yaw: self.yaw(target, width),
            vertical: self.vertical(target, height),
            forward: self.forward(target, reference),
        }
    }

    fn yaw(&self, target: &Detection, width: u32) -> i8 {
        let centre = width as f32 / 2.0;
        if target.right < centre {
            -YAW_RATE
        } else if target.left > centre {
            YAW_RATE
        } else {
            0
        }
    }

    fn vertical(&self, target: &Detection, height: u32) -> i8 {
        let h = height as f32;
        let margin = h / 10.0;
        if target.top < margin {
            VERTICAL_RATE
        } else if target.bottom > h - margin {
            -VERTICAL_RATE
        } else {
            0
        }
    }

    fn forward(&self, target: &Detection, reference: f64) -> i8 {
        let distance = target.diagonal();
        if distance < reference - self.tolerance {
            FORWARD_RATE
        } else if distance > reference + self.tolerance {
            -FORWARD_RATE
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(left: f32, top: f32, right: f32, bottom: f32) -> Detection {
        Detection::new(0.9, left, top, right, bottom)
    }

    /// A box of the given diagonal, centred so yaw and vertical hold.
    fn sized(diagonal: f32) -> Detection {
        let side = diagonal / std::f32::consts::SQRT_2;
        boxed(200.0 - side / 2.0, 150.0 - side / 2.0, 200.0 + side / 2.0, 150.0 + side / 2.0)
    }

    #[test]
    fn nominal_tolerance_is_five_percent_of_diagonal() {
        let controller = Controller::new(400, 300);
        assert!((controller.tolerance() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn target_left_of_centre_rotates_counter_clockwise() {
        let controller = Controller::new(400, 300);
        for (w, h) in [(400, 300), (640, 480), (100, 1000)] {
            let half = w as f32 / 2.0;
            let target = boxed(0.0, 0.0, half - 1.0, h as f32 - 1.0);
            assert_eq!(controller.steer(&target, w, h, 0.0).yaw, -YAW_RATE);
        }
    }

    #[test]
    fn target_right_of_centre_rotates_clockwise() {
        let controller = Controller::new(400, 300);
        let target = boxed(201.0, 0.0, 399.0, 10.0);
        assert_eq!(controller.steer(&target, 400, 300, 0.0).yaw, YAW_RATE);
    }

    #[test]
    fn target_straddling_centre_holds_yaw() {
        let controller = Controller::new(400, 300);
        assert_eq!(controller.steer(&boxed(150.0, 100.0, 250.0, 200.0), 400, 300, 0.0).yaw, 0);
        assert_eq!(controller.steer(&boxed(200.0, 100.0, 250.0, 200.0), 400, 300, 0.0).yaw, 0);
        assert_eq!(controller.steer(&boxed(150.0, 100.0, 200.0, 200.0), 400, 300, 0.0).yaw, 0);
    }

    #[test]
    fn vertical_follows_top_and_bottom_margins() {
        let controller = Controller::new(400, 300);
        assert_eq!(
            controller.steer(&boxed(150.0, 29.0, 250.0, 200.0), 400, 300, 0.0).vertical,
            VERTICAL_RATE
        );
        assert_eq!(
            controller.steer(&boxed(150.0, 100.0, 250.0, 271.0), 400, 300, 0.0).vertical,
            -VERTICAL_RATE
        );
        assert_eq!(
            controller.steer(&boxed(150.0, 30.0, 250.0, 270.0), 400, 300, 0.0).vertical,
            0
        );
    }

    #[test]
    fn forward_back_holds_reference_within_tolerance() {
        let controller = Controller::with_tolerance(10.0);
        assert_eq!(controller.steer(&sized(85.0), 400, 300, 100.0).forward, FORWARD_RATE);
        assert_eq!(controller.steer(&sized(115.0), 400, 300, 100.0).forward, -FORWARD_RATE);
        assert_eq!(controller.steer(&sized(100.0), 400, 300, 100.0).forward, 0);
    }

    #[test]
    fn axes_are_independent() {
        let controller = Controller::with_tolerance(10.0);
        let steering = controller.steer(&boxed(0.0, 0.0, 10.0, 10.0), 400, 300, 100.0);
        assert_eq!(
            steering,
            Steering {
                yaw: -YAW_RATE,
                vertical: VERTICAL_RATE,
                forward: FORWARD_RATE,
            }
        );
    }
}
