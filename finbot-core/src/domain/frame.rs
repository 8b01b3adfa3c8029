//! Frame: one captured raster image, alive for a single tick.

use image::{imageops, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// Pixel coordinate in frame space. Origin is the top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// A captured RGB frame.
///
/// Frames are produced once per tick by a frame source and dropped after the
/// tick completes. Nothing downstream keeps a reference past the tick.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Build a frame from packed RGB8 bytes. Returns `None` when the buffer
    /// length does not match `width * height * 3`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbImage::from_raw(width, height, data).map(Self::new)
    }

    /// A frame filled with a single colour.
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::new(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True for a zero-area frame (what a broken driver hands back).
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Vertical dividing line between the BUY and SELL halves.
    pub fn midline(&self) -> u32 {
        self.width() / 2
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Single-channel luminance copy used by the background model.
    pub fn to_luma(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }

    /// Horizontally flipped copy. Webcams deliver a mirrored picture.
    pub fn mirrored(&self) -> Self {
        Self::new(imageops::flip_horizontal(&self.image))
    }
}
