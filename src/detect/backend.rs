use anyhow::Result;

use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend takes one decoded frame and returns every candidate face it
/// found, in its native output order. Order matters: target selection is
/// order-sensitive. Backends do not filter by confidence; that is the
/// selector's job.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// The frame is borrowed for the call only. Coordinates in the result are
    /// normalised to `[0, 1]`.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
