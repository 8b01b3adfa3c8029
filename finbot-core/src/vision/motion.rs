//! Background-subtraction motion detector.

use super::background::BackgroundModel;
use super::morphology::Morphology;
use super::{ForegroundDetector, MotionError};
use crate::domain::{ForegroundMask, Frame};
use image::GrayImage;
use serde::{Deserialize, Serialize};

/// Tuning for the background model and the binary threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Frames the running average effectively remembers.
    pub history: u32,
    /// Graded score above which a pixel is foreground. Higher = less sensitive.
    pub threshold: u8,
    /// Deviation (in sigmas) that maps to a full 255 graded score.
    pub score_ceiling: f32,
    /// Variance assigned to every pixel when the model is seeded.
    pub initial_variance: f32,
    /// Variance floor, keeps sensor noise on flat regions from reading as motion.
    pub min_variance: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            history: 500,
            threshold: 127,
            score_ceiling: 8.0,
            initial_variance: 225.0,
            min_variance: 16.0,
        }
    }
}

impl MotionConfig {
    pub fn validate(&self) -> Result<(), MotionError> {
        if self.history == 0 {
            return Err(MotionError::InvalidConfig("history must be at least 1".into()));
        }
        if !(self.score_ceiling > 0.0) {
            return Err(MotionError::InvalidConfig(
                "score_ceiling must be positive".into(),
            ));
        }
        if !(self.min_variance > 0.0) {
            return Err(MotionError::InvalidConfig(
                "min_variance must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Strict binary pass: a pixel is foreground when its graded score exceeds `level`.
pub fn threshold(graded: &GrayImage, level: u8) -> ForegroundMask {
    ForegroundMask::from_fn(graded.width(), graded.height(), |x, y| {
        graded.get_pixel(x, y).0[0] > level
    })
}

/// Motion detector owning its background model.
///
/// The model is created lazily from the first frame's dimensions and lives
/// for the rest of the run; nothing outside the detector can reach it.
pub struct MotionDetector {
    config: MotionConfig,
    morphology: Morphology,
    model: Option<BackgroundModel>,
}

impl MotionDetector {
    pub fn new(config: MotionConfig, morphology: Morphology) -> Result<Self, MotionError> {
        config.validate()?;
        morphology.validate().map_err(MotionError::InvalidConfig)?;
        Ok(Self {
            config,
            morphology,
            model: None,
        })
    }

    /// Frames folded into the background so far.
    pub fn frames_learned(&self) -> u32 {
        self.model.as_ref().map_or(0, BackgroundModel::frames_seen)
    }

    /// Graded foreground for `frame`, then learn from it.
    fn graded(&mut self, frame: &Frame) -> Result<GrayImage, MotionError> {
        if frame.is_empty() {
            return Err(MotionError::EmptyFrame);
        }
        let actual = (frame.width(), frame.height());
        let model = self
            .model
            .get_or_insert_with(|| BackgroundModel::new(actual.0, actual.1));
        if model.dimensions() != actual {
            return Err(MotionError::DimensionMismatch {
                expected: model.dimensions(),
                actual,
            });
        }

        let luma = frame.to_luma();
        let cfg = &self.config;
        let graded = model.scores(&luma, cfg.score_ceiling, cfg.min_variance);
        model.update(&luma, cfg.history, cfg.initial_variance, cfg.min_variance);
        Ok(graded)
    }
}

impl ForegroundDetector for MotionDetector {
    fn name(&self) -> &str {
        "background"
    }

    fn detect(&mut self, frame: &Frame) -> Result<ForegroundMask, MotionError> {
        let graded = self.graded(frame)?;
        let binary = threshold(&graded, self.config.threshold);
        Ok(self.morphology.apply(&binary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn detector() -> MotionDetector {
        MotionDetector::new(MotionConfig::default(), Morphology::default()).unwrap()
    }

    fn frame_with_square(x0: u32, y0: u32, size: u32) -> Frame {
        let mut frame = Frame::solid(64, 48, [40, 40, 40]);
        for y in y0..y0 + size {
            for x in x0..x0 + size {
                frame.image_mut().put_pixel(x, y, image::Rgb([250, 250, 250]));
            }
        }
        frame
    }

    #[test]
    fn threshold_is_strictly_greater() {
        let graded = GrayImage::from_fn(3, 1, |x, _| Luma([[126u8, 127, 128][x as usize]]));
        let mask = threshold(&graded, 127);
        assert!(!mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(mask.get(2, 0));
    }

    #[test]
    fn first_frame_has_no_motion() {
        let mut det = detector();
        let mask = det.detect(&frame_with_square(10, 10, 8)).unwrap();
        assert!(mask.is_blank());
        assert_eq!(det.frames_learned(), 1);
    }

    #[test]
    fn object_entering_static_scene_is_foreground() {
        let mut det = detector();
        for _ in 0..10 {
            det.detect(&Frame::solid(64, 48, [40, 40, 40])).unwrap();
        }
        let mask = det.detect(&frame_with_square(20, 10, 10)).unwrap();
        assert!(mask.get(25, 15));
        assert!(!mask.get(2, 2));
        assert!(!mask.get(60, 40));
    }

    #[test]
    fn static_scene_stays_blank() {
        let mut det = detector();
        for _ in 0..5 {
            let mask = det.detect(&Frame::solid(64, 48, [90, 90, 90])).unwrap();
            assert!(mask.is_blank());
        }
    }

    #[test]
    fn empty_frame_is_an_error_not_a_blank_mask() {
        let mut det = detector();
        assert_eq!(
            det.detect(&Frame::solid(0, 0, [0, 0, 0])),
            Err(MotionError::EmptyFrame)
        );
    }

    #[test]
    fn resized_frame_is_rejected() {
        let mut det = detector();
        det.detect(&Frame::solid(64, 48, [0, 0, 0])).unwrap();
        let err = det.detect(&Frame::solid(32, 48, [0, 0, 0])).unwrap_err();
        assert_eq!(
            err,
            MotionError::DimensionMismatch {
                expected: (64, 48),
                actual: (32, 48)
            }
        );
    }

    #[test]
    fn higher_threshold_is_less_sensitive() {
        let dim_change = || {
            let mut frame = Frame::solid(16, 16, [100, 100, 100]);
            for y in 4..12 {
                for x in 4..12 {
                    frame.image_mut().put_pixel(x, y, image::Rgb([120, 120, 120]));
                }
            }
            frame
        };
        let run = |threshold: u8| {
            let config = MotionConfig {
                threshold,
                ..MotionConfig::default()
            };
            let mut det = MotionDetector::new(config, Morphology::default()).unwrap();
            for _ in 0..10 {
                det.detect(&Frame::solid(16, 16, [100, 100, 100])).unwrap();
            }
            det.detect(&dim_change()).unwrap().foreground_count()
        };
        // a 20-level step after ten quiet frames scores about 135
        assert!(run(100) > 0);
        assert_eq!(run(200), 0);
    }

    #[test]
    fn zero_history_is_invalid() {
        let config = MotionConfig {
            history: 0,
            ..MotionConfig::default()
        };
        assert!(MotionDetector::new(config, Morphology::default()).is_err());
    }
}
