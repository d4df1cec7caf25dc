//! Frame presentation.
//!
//! The cycle driver shows every annotated frame and asks the display whether
//! the operator wants to stop.

#[cfg(feature = "display-window")]
mod window;

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::frame::Frame;

#[cfg(feature = "display-window")]
pub use window::WindowDisplay;

/// Outcome of presenting one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presented {
    Continue,
    /// The operator asked to end the session.
    Stop,
}

pub trait Display {
    fn name(&self) -> &str;

    fn show(&mut self, frame: &Frame) -> Result<Presented>;
}

/// Display without a screen. Stops once the shared flag is raised, typically
/// from a Ctrl-C handler.
pub struct HeadlessDisplay {
    stop: Arc<AtomicBool>,
    frames_shown: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::with_stop_flag(Arc::new(AtomicBool::new(false)))
    }

    pub fn with_stop_flag(stop: Arc<AtomicBool>) -> Self {
        Self {
            stop,
            frames_shown: 0,
        }
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for HeadlessDisplay {
    fn name(&self) -> &str {
        "headless"
    }

    fn show(&mut self, _frame: &Frame) -> Result<Presented> {
        self.frames_shown += 1;
        if self.stop.load(Ordering::SeqCst) {
            Ok(Presented::Stop)
        } else {
            Ok(Presented::Continue)
        }
    }
}
