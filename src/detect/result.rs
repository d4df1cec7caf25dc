/// Raw detector output. Coordinates are normalised to `[0, 1]` of the
/// network input and may fall slightly outside that range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub class_id: u32,
    pub confidence: f32,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// A detection in frame pixel coordinates.
///
/// Always satisfies `0 <= left <= right <= W-1` and `0 <= top <= bottom <= H-1`
/// for the frame it was built against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub confidence: f32,
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Detection {
    pub fn new(confidence: f32, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            confidence,
            left,
            top,
            right,
            bottom,
        }
    }

    /// Scale a normalised detection to a `width` x `height` frame and clamp it
    /// inside the frame.
    pub fn from_normalized(raw: &RawDetection, width: u32, height: u32) -> Self {
        let w = width as f32;
        let h = height as f32;
        let max_x = (w - 1.0).max(0.0);
        let max_y = (h - 1.0).max(0.0);

        let x1 = clamp_coord(raw.left * w, max_x);
        let x2 = clamp_coord(raw.right * w, max_x);
        let y1 = clamp_coord(raw.top * h, max_y);
        let y2 = clamp_coord(raw.bottom * h, max_y);

        Self {
            confidence: raw.confidence,
            left: x1.min(x2),
            top: y1.min(y2),
            right: x1.max(x2),
            bottom: y1.max(y2),
        }
    }

    /// Euclidean distance between the top-left and bottom-right corners.
    ///
    /// Used as the apparent-size proxy for distance keeping.
    pub fn diagonal(&self) -> f64 {
        let dx = (self.right - self.left) as f64;
        let dy = (self.bottom - self.top) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

fn clamp_coord(value: f32, max: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.max(0.0).min(max)
}
