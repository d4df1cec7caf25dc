//! SSD `DetectionOutput` decoding.
//!
//! The output blob is `[1, 1, N, 7]`; each row is
//! `[image_id, class_id, confidence, left, top, right, bottom]` with the box
//! normalised to the network input. Rows with a negative image id are padding.

use crate::detect::result::RawDetection;

pub const ROW_LEN: usize = 7;

/// Decode a flattened SSD output into detections, preserving row order.
pub fn parse_detection_rows(values: &[f32]) -> Vec<RawDetection> {
    values
        .chunks_exact(ROW_LEN)
        .filter(|row| row[0] >= 0.0)
        .map(|row| RawDetection {
            class_id: row[1].max(0.0) as u32,
            confidence: row[2],
            left: row[3],
            top: row[4],
            right: row[5],
            bottom: row[6],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_rows_in_order_and_skips_padding() {
        let values = [
            0.0, 1.0, 0.9, 0.1, 0.2, 0.3, 0.4, //
            -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.3, 0.5, 0.5, 0.6, 0.6, //
        ];
        let rows = parse_detection_rows(&values);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].confidence, 0.9);
        assert_eq!(rows[0].left, 0.1);
        assert_eq!(rows[0].bottom, 0.4);
        assert_eq!(rows[1].confidence, 0.3);
        assert_eq!(rows[1].class_id, 1);
    }

    #[test]
    fn trailing_partial_row_is_ignored() {
        let values = [0.0, 1.0, 0.9, 0.1, 0.2];
        assert!(parse_detection_rows(&values).is_empty());
    }
}
