//! Vision pipeline: frame → foreground mask → dominant blob.
//!
//! Two detectors produce masks:
//! - `MotionDetector` learns a per-pixel background and flags deviations
//! - `ColorDetector` keeps pixels inside an HSV range
//!
//! Both run the same morphological cleanup before the mask reaches the
//! `ObjectLocator`.

pub mod background;
pub mod color;
pub mod locator;
pub mod morphology;
pub mod motion;

pub use background::BackgroundModel;
pub use color::{ColorDetector, HsvRange};
pub use locator::{find_regions, Blob, Moments, ObjectLocator, Region};
pub use morphology::Morphology;
pub use motion::{threshold, MotionConfig, MotionDetector};

use crate::domain::{ForegroundMask, Frame};
use thiserror::Error;

/// Errors raised while turning a frame into a mask.
#[derive(Debug, Error, PartialEq)]
pub enum MotionError {
    #[error("frame has zero area")]
    EmptyFrame,

    #[error("frame is {actual:?} but the background model was learned at {expected:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
}

/// Anything that can turn a frame into a cleaned binary foreground mask.
pub trait ForegroundDetector: Send {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Produce the foreground mask for this frame. An empty mask means
    /// "nothing moved", never "no frame".
    fn detect(&mut self, frame: &Frame) -> Result<ForegroundMask, MotionError>;
}
