//! Target selection.
//!
//! Every detection at or above the confidence threshold is kept for drawing.
//! One of them becomes the target: by default the last one in detector order.
//! Last-wins matches the behaviour existing flight logs were recorded with;
//! `HighestConfidence` is available as an explicit opt-in.

use serde::Deserialize;

use crate::detect::Detection;

/// Detections below this confidence are discarded.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// The last qualifying detection in detector order.
    #[default]
    LastQualifying,
    /// The qualifying detection with the highest confidence; ties keep the
    /// earlier one.
    HighestConfidence,
}

impl SelectionMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last" | "last_qualifying" => Some(Self::LastQualifying),
            "highest" | "highest_confidence" => Some(Self::HighestConfidence),
            _ => None,
        }
    }
}

/// Result of selecting over one frame's detections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    /// Every qualifying detection, in detector order. All of these are drawn.
    pub qualifying: Vec<Detection>,
    /// The detection that drives control this cycle.
    pub target: Option<Detection>,
}

#[derive(Clone, Debug)]
pub struct TargetSelector {
    threshold: f32,
    mode: SelectionMode,
}

impl TargetSelector {
    pub fn new(threshold: f32, mode: SelectionMode) -> Self {
        Self { threshold, mode }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn select(&self, detections: &[Detection]) -> Selection {
        let qualifying: Vec<Detection> = detections
            .iter()
            .filter(|det| det.confidence >= self.threshold)
            .copied()
            .collect();

        let target = match self.mode {
            SelectionMode::LastQualifying => qualifying.last().copied(),
            SelectionMode::HighestConfidence => {
                qualifying
                    .iter()
                    .copied()
                    .fold(None::<Detection>, |best, det| match best {
                        Some(b) if b.confidence >= det.confidence => Some(b),
                        _ => Some(det),
                    })
            }
        };

        Selection { qualifying, target }
    }
}

impl Default for TargetSelector {
    fn default() -> Self {
        Self::new(CONFIDENCE_THRESHOLD, SelectionMode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(confidence: f32, left: f32) -> Detection {
        Detection::new(confidence, left, 10.0, left + 50.0, 60.0)
    }

    #[test]
    fn last_qualifying_detection_wins() {
        let a = det(0.9, 10.0);
        let b = det(0.6, 200.0);
        let selection = TargetSelector::default().select(&[a, b]);

        assert_eq!(selection.target, Some(b));
        assert_eq!(selection.qualifying, vec![a, b]);
    }

    #[test]
    fn low_confidence_is_discarded_even_when_last() {
        let a = det(0.9, 10.0);
        let low = det(0.49, 200.0);
        let selection = TargetSelector::default().select(&[a, low]);

        assert_eq!(selection.target, Some(a));
        assert_eq!(selection.qualifying.len(), 1);
    }

    #[test]
    fn threshold_is_inclusive() {
        let edge = det(0.5, 10.0);
        let selection = TargetSelector::default().select(&[edge]);
        assert_eq!(selection.target, Some(edge));
    }

    #[test]
    fn nothing_qualifies_means_no_target() {
        let selection = TargetSelector::default().select(&[det(0.2, 0.0), det(0.1, 5.0)]);
        assert!(selection.target.is_none());
        assert!(selection.qualifying.is_empty());
    }

    #[test]
    fn highest_confidence_mode_picks_best() {
        let a = det(0.9, 10.0);
        let b = det(0.6, 200.0);
        let c = det(0.9, 300.0);
        let selector = TargetSelector::new(CONFIDENCE_THRESHOLD, SelectionMode::HighestConfidence);
        let selection = selector.select(&[a, b, c]);

        assert_eq!(selection.target, Some(a));
        assert_eq!(selection.qualifying.len(), 3);
    }

    #[test]
    fn highest_confidence_takes_a_later_stronger_face() {
        let a = det(0.6, 10.0);
        let b = det(0.95, 200.0);
        let c = det(0.7, 300.0);
        let selector = TargetSelector::new(CONFIDENCE_THRESHOLD, SelectionMode::HighestConfidence);

        assert_eq!(selector.select(&[a, b, c]).target, Some(b));
        assert_eq!(selector.select(&[]).target, None);
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!(
            SelectionMode::parse("highest_confidence"),
            Some(SelectionMode::HighestConfidence)
        );
        assert_eq!(SelectionMode::parse("LAST"), Some(SelectionMode::LastQualifying));
        assert_eq!(SelectionMode::parse("best"), None);
    }
}
