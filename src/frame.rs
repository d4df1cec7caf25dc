//! Decoded video frames.
//!
//! - `Frame`: one interleaved BGR image, exactly `width * height * 3` bytes.
//! - `FrameError`: why a frame could not be produced, split into fatal
//!   (stream gone) and skippable (this frame is bad) cases.
//!
//! Frames are owned by the cycle that read them and dropped once detection and
//! display are done. Nothing retains pixels across cycles.

use thiserror::Error;

/// Bytes per pixel for the BGR24 layout the decoder emits.
pub const BYTES_PER_PIXEL: usize = 3;

/// Box colour used for every qualifying detection (B, G, R).
pub const BOX_COLOUR: [u8; 3] = [0, 255, 0];

/// Box outline thickness in pixels.
pub const BOX_THICKNESS: u32 = 3;

/// Errors raised while reading or building a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The byte stream ended before a full frame could be read.
    #[error("frame stream exhausted (expected {expected} bytes per frame)")]
    Exhausted { expected: usize },

    /// The frame decoded but cannot be interpreted (zero-sized, wrong length).
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// The underlying reader failed.
    #[error("frame stream read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Fatal errors end the cycle loop; everything else skips one cycle.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FrameError::Malformed(_))
    }
}

/// Number of bytes one BGR frame of the given size occupies.
pub fn frame_len(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(BYTES_PER_PIXEL)
}

/// One decoded BGR frame.
///
/// There is no header; pixel `(x, y)` starts at `(y * width + x) * 3`.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap a raw BGR buffer, rejecting empty or mis-sized input.
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::Malformed(format!(
                "zero-sized frame {}x{}",
                width, height
            )));
        }
        let expected = frame_len(width, height);
        if data.len() != expected {
            return Err(FrameError::Malformed(format!(
                "expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bgr(&self) -> &[u8] {
        &self.data
    }

    /// BGR value at `(x, y)`. Out-of-range coordinates return `None`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Draw an axis-aligned rectangle outline, clipped to the frame.
    ///
    /// Coordinates are inclusive pixel positions; the outline grows inward by
    /// `thickness` pixels.
    pub fn draw_rectangle(
        &mut self,
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
        colour: [u8; 3],
        thickness: u32,
    ) {
        let (left, right) = (left.min(right), left.max(right));
        let (top, bottom) = (top.min(bottom), top.max(bottom));
        let t = thickness.max(1) as i32;

        for offset in 0..t {
            let l = left + offset;
            let r = right - offset;
            let tp = top + offset;
            let b = bottom - offset;
            if l > r || tp > b {
                break;
            }
            for x in l..=r {
                self.put(x, tp, colour);
                self.put(x, b, colour);
            }
            for y in tp..=b {
                self.put(l, y, colour);
                self.put(r, y, colour);
            }
        }
    }

    fn put(&mut self, x: i32, y: i32, colour: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        self.data[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&colour);
    }
}
