//! Colour-range detector.
//!
//! Keeps pixels whose HSV value falls inside a fixed range. Useful when the
//! tracked object has a distinctive colour and the camera is not perfectly
//! still. Hue follows the 0..=179 half-degree convention; saturation and
//! value are 0..=255.

use super::morphology::Morphology;
use super::{ForegroundDetector, MotionError};
use crate::domain::{ForegroundMask, Frame};
use serde::{Deserialize, Serialize};

/// Inclusive HSV bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl Default for HsvRange {
    /// Bright orange / yellow.
    fn default() -> Self {
        Self {
            lower: [5, 150, 150],
            upper: [25, 255, 255],
        }
    }
}

impl HsvRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| hsv[i] >= self.lower[i] && hsv[i] <= self.upper[i])
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.upper[0] > 179 {
            return Err(format!("hue upper bound {} exceeds 179", self.upper[0]));
        }
        if (0..3).any(|i| self.lower[i] > self.upper[i]) {
            return Err("lower HSV bound exceeds upper bound".into());
        }
        Ok(())
    }
}

/// Convert an RGB pixel to 8-bit HSV (H in 0..=179).
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f32::from);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max * 255.0 } else { 0.0 };
    let mut h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }

    [
        ((h / 2.0).round() as u32 % 180) as u8,
        s.round() as u8,
        max as u8,
    ]
}

/// Foreground detector driven purely by pixel colour.
pub struct ColorDetector {
    range: HsvRange,
    morphology: Morphology,
}

impl ColorDetector {
    pub fn new(range: HsvRange, morphology: Morphology) -> Result<Self, MotionError> {
        range.validate().map_err(MotionError::InvalidConfig)?;
        morphology.validate().map_err(MotionError::InvalidConfig)?;
        Ok(Self { range, morphology })
    }
}

impl ForegroundDetector for ColorDetector {
    fn name(&self) -> &str {
        "color"
    }

    fn detect(&mut self, frame: &Frame) -> Result<ForegroundMask, MotionError> {
        if frame.is_empty() {
            return Err(MotionError::EmptyFrame);
        }
        let image = frame.image();
        let raw = ForegroundMask::from_fn(frame.width(), frame.height(), |x, y| {
            self.range.contains(rgb_to_hsv(image.get_pixel(x, y).0))
        });
        Ok(self.morphology.apply(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_colours_map_to_expected_hues() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn orange_is_in_default_range() {
        let range = HsvRange::default();
        assert!(range.contains(rgb_to_hsv([255, 140, 0])));
        assert!(!range.contains(rgb_to_hsv([0, 120, 255])));
    }

    #[test]
    fn detects_orange_patch() {
        let mut frame = Frame::solid(40, 30, [20, 60, 160]);
        for y in 5..15 {
            for x in 25..35 {
                frame.image_mut().put_pixel(x, y, image::Rgb([255, 140, 0]));
            }
        }
        let mut det = ColorDetector::new(HsvRange::default(), Morphology::default()).unwrap();
        let mask = det.detect(&frame).unwrap();
        assert_eq!(mask.foreground_count(), 100);
        assert!(mask.get(30, 10));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let range = HsvRange {
            lower: [30, 0, 0],
            upper: [10, 255, 255],
        };
        assert!(ColorDetector::new(range, Morphology::default()).is_err());
    }
}
