//! Network input preparation.
//!
//! The SSD face detector expects a 1x3xHxW float tensor built from the BGR
//! frame: bilinear resize to the network input size, per-channel mean
//! subtraction, no scaling, no channel swap.

use crate::frame::Frame;

/// Default network input size (width, height).
pub const INPUT_SIZE: (u32, u32) = (128, 96);

/// Default per-channel mean, in the frame's B, G, R order.
pub const CHANNEL_MEAN: [f32; 3] = [104.0, 177.0, 123.0];

/// Build an NCHW blob from `frame`.
///
/// Output length is `3 * out_h * out_w`; channel plane `c` holds the frame's
/// byte `c` of each pixel minus `mean[c]`.
pub fn blob_from_frame(frame: &Frame, size: (u32, u32), mean: [f32; 3]) -> Vec<f32> {
    let (out_w, out_h) = (size.0.max(1) as usize, size.1.max(1) as usize);
    let in_w = frame.width() as usize;
    let in_h = frame.height() as usize;
    let src = frame.as_bgr();
    let plane = out_w * out_h;
    let mut blob = vec![0f32; plane * 3];

    let scale_x = in_w as f32 / out_w as f32;
    let scale_y = in_h as f32 / out_h as f32;

    for oy in 0..out_h {
        let (y0, y1, fy) = sample_axis(oy, scale_y, in_h);
        for ox in 0..out_w {
            let (x0, x1, fx) = sample_axis(ox, scale_x, in_w);
            for c in 0..3 {
                let p00 = src[(y0 * in_w + x0) * 3 + c] as f32;
                let p01 = src[(y0 * in_w + x1) * 3 + c] as f32;
                let p10 = src[(y1 * in_w + x0) * 3 + c] as f32;
                let p11 = src[(y1 * in_w + x1) * 3 + c] as f32;
                let top = p00 + (p01 - p00) * fx;
                let bottom = p10 + (p11 - p10) * fx;
                let value = top + (bottom - top) * fy;
                blob[c * plane + oy * out_w + ox] = value - mean[c];
            }
        }
    }
    blob
}

/// Source neighbours and blend weight for one output coordinate, using
/// pixel-centre alignment.
fn sample_axis(out: usize, scale: f32, len: usize) -> (usize, usize, f32) {
    let max = len.saturating_sub(1);
    let pos = ((out as f32 + 0.5) * scale - 0.5).max(0.0);
    let lo = (pos.floor() as usize).min(max);
    let hi = (lo + 1).min(max);
    let frac = if lo == hi { 0.0 } else { pos - lo as f32 };
    (lo, hi, frac)
}
