//! Zone classifier: left half buys, right half sells.

use crate::domain::Classification;

/// Classify a centroid against the frame midline.
///
/// `mid_x = frame_width / 2` (floored). A centroid exactly on the midline is
/// SELL. No centroid means HOLD.
pub fn classify(centroid_x: Option<u32>, frame_width: u32) -> Classification {
    match centroid_x {
        None => Classification::Hold,
        Some(x) if x < frame_width / 2 => Classification::Buy,
        Some(_) => Classification::Sell,
    }
}
