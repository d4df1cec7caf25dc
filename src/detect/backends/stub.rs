use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Stub backend for testing and the synthetic demo.
///
/// Reports the bounding box of near-white pixels as a single face. Pairs with
/// the `stub://` frame source, which renders its face as a white square.
pub struct StubBackend {
    threshold: u8,
    confidence: f32,
    min_pixels: usize,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            threshold: 200,
            confidence: 0.9,
            min_pixels: 16,
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let width = frame.width() as usize;
        let mut count = 0usize;
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);

        for (i, px) in frame.as_bgr().chunks_exact(3).enumerate() {
            if px.iter().all(|&v| v >= self.threshold) {
                let (x, y) = (i % width, i / width);
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
                count += 1;
            }
        }

        if count < self.min_pixels {
            return Ok(Vec::new());
        }

        let w = frame.width() as f32;
        let h = frame.height() as f32;
        Ok(vec![RawDetection {
            class_id: 1,
            confidence: self.confidence,
            left: min_x as f32 / w,
            top: min_y as f32 / h,
            right: (max_x + 1) as f32 / w,
            bottom: (max_y + 1) as f32 / h,
        }])
    }
}
