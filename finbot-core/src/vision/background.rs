//! Per-pixel background statistics.
//!
//! Each pixel carries an exponentially weighted running mean and variance of
//! its luminance. The learning rate starts at 1 and decays to `1 / history`,
//! so the first frames seed the model quickly and later frames only nudge it.

use image::GrayImage;

/// Learned background for a fixed frame size.
#[derive(Debug, Clone)]
pub struct BackgroundModel {
    width: u32,
    height: u32,
    mean: Vec<f32>,
    variance: Vec<f32>,
    frames_seen: u32,
}

impl BackgroundModel {
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            mean: vec![0.0; n],
            variance: vec![0.0; n],
            frames_seen: 0,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    /// Learning rate the next `update` will use.
    pub fn learning_rate(&self, history: u32) -> f32 {
        let window = self.frames_seen.saturating_add(1).min(history.max(1));
        1.0 / window as f32
    }

    /// Deviation of `value` at pixel `idx`, in standard deviations.
    ///
    /// An unseeded model has nothing to compare against and scores zero.
    pub fn deviation(&self, idx: usize, value: f32, min_variance: f32) -> f32 {
        if self.frames_seen == 0 {
            return 0.0;
        }
        let sigma = self.variance[idx].max(min_variance).sqrt();
        (value - self.mean[idx]).abs() / sigma
    }

    /// Graded foreground image: deviation scaled so `score_ceiling` sigmas map to 255.
    pub fn scores(&self, luma: &GrayImage, score_ceiling: f32, min_variance: f32) -> GrayImage {
        let mut out = GrayImage::new(self.width, self.height);
        for (idx, (px, dst)) in luma.pixels().zip(out.pixels_mut()).enumerate() {
            let d = self.deviation(idx, f32::from(px.0[0]), min_variance);
            dst.0[0] = (d / score_ceiling * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        out
    }

    /// Fold a new luminance frame into the model.
    pub fn update(&mut self, luma: &GrayImage, history: u32, initial_variance: f32, min_variance: f32) {
        if self.frames_seen == 0 {
            for (idx, px) in luma.pixels().enumerate() {
                self.mean[idx] = f32::from(px.0[0]);
                self.variance[idx] = initial_variance.max(min_variance);
            }
            self.frames_seen = 1;
            return;
        }

        let alpha = self.learning_rate(history);
        for (idx, px) in luma.pixels().enumerate() {
            let diff = f32::from(px.0[0]) - self.mean[idx];
            self.mean[idx] += alpha * diff;
            let var = self.variance[idx] + alpha * (diff * diff - self.variance[idx]);
            self.variance[idx] = var.max(min_variance);
        }
        self.frames_seen = self.frames_seen.saturating_add(1);
    }
}
