//! Synthetic frame source (`stub://`).
//!
//! Renders a dark moving background with one bright square standing in for a
//! face. The square hops between centre, left, right and close-up positions so
//! every steering branch gets exercised without a camera.

use super::FrameSource;
use crate::frame::{frame_len, Frame, FrameError};

/// Frames spent in each scene before the square moves.
pub const FRAMES_PER_SCENE: u64 = 40;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    /// Source URL, kept for logs (e.g. "stub://demo").
    pub url: String,
    pub width: u32,
    pub height: u32,
    /// Stop with `Exhausted` after this many frames. `None` runs forever.
    pub max_frames: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            url: "stub://synthetic".to_string(),
            width: 400,
            height: 300,
            max_frames: None,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        log::info!(
            "SyntheticSource: {} ({}x{})",
            config.url,
            config.width,
            config.height
        );
        Self {
            config,
            frame_count: 0,
        }
    }

    /// Square placement for the current scene: (left, top, side).
    fn face_square(&self) -> (u32, u32, u32) {
        let w = self.config.width;
        let h = self.config.height;
        let scene = (self.frame_count / FRAMES_PER_SCENE) % 4;
        let side = match scene {
            3 => h / 2,
            _ => h / 4,
        }
        .max(1);
        let cx = match scene {
            1 => w / 6,
            2 => w * 5 / 6,
            _ => w / 2,
        };
        let cy = h / 2;
        let left = cx.saturating_sub(side / 2).min(w.saturating_sub(side));
        let top = cy.saturating_sub(side / 2).min(h.saturating_sub(side));
        (left, top, side)
    }

    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let w = self.config.width as usize;
        let h = self.config.height as usize;
        let mut pixels = vec![0u8; frame_len(self.config.width, self.config.height)];
        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) * 3;
                let shade = ((x + y + self.frame_count as usize) % 96) as u8;
                pixels[idx] = shade;
                pixels[idx + 1] = shade / 2;
                pixels[idx + 2] = shade / 3;
            }
        }

        let (left, top, side) = self.face_square();
        for y in top..(top + side).min(self.config.height) {
            for x in left..(left + side).min(self.config.width) {
                let idx = (y as usize * w + x as usize) * 3;
                pixels[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.config.url
    }

    fn next_frame(&mut self) -> Result<Frame, FrameError> {
        if let Some(max) = self.config.max_frames {
            if self.frame_count >= max {
                return Err(FrameError::Exhausted {
                    expected: frame_len(self.config.width, self.config.height),
                });
            }
        }
        let pixels = self.generate_synthetic_pixels();
        self.frame_count += 1;
        Frame::from_bgr(pixels, self.config.width, self.config.height)
    }

    fn frames_read(&self) -> u64 {
        self.frame_count
    }
}
