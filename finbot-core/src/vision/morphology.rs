//! Morphological cleanup: dilate then erode with a square structuring element.
//!
//! Dilation merges nearby fragments of the same object; the following erosion
//! shrinks the blob back and strips isolated speckle. Pixels outside the mask
//! never contribute to either pass.

use crate::domain::ForegroundMask;
use serde::{Deserialize, Serialize};

/// Structuring element size and pass count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Morphology {
    /// Side length of the square element. Must be odd.
    pub kernel_size: u32,
    /// Dilations to run, followed by the same number of erosions.
    pub iterations: u32,
}

impl Default for Morphology {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            iterations: 2,
        }
    }
}

impl Morphology {
    pub fn validate(&self) -> Result<(), String> {
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(format!(
                "kernel_size must be a positive odd number, got {}",
                self.kernel_size
            ));
        }
        Ok(())
    }

    fn radius(&self) -> u32 {
        self.kernel_size / 2
    }

    /// Run the full cleanup pass.
    pub fn apply(&self, mask: &ForegroundMask) -> ForegroundMask {
        let radius = self.radius();
        if radius == 0 || self.iterations == 0 {
            return mask.clone();
        }
        let mut out = mask.clone();
        for _ in 0..self.iterations {
            out = dilate(&out, radius);
        }
        for _ in 0..self.iterations {
            out = erode(&out, radius);
        }
        out
    }
}

/// Dilate by a `(2r+1)²` square.
pub fn dilate(mask: &ForegroundMask, radius: u32) -> ForegroundMask {
    let rows = sweep(mask, radius, Axis::Horizontal, Op::Dilate);
    sweep(&rows, radius, Axis::Vertical, Op::Dilate)
}

/// Erode by a `(2r+1)²` square.
pub fn erode(mask: &ForegroundMask, radius: u32) -> ForegroundMask {
    let rows = sweep(mask, radius, Axis::Horizontal, Op::Erode);
    sweep(&rows, radius, Axis::Vertical, Op::Erode)
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy)]
enum Op {
    Dilate,
    Erode,
}

/// One-dimensional window pass using a running count of set pixels.
fn sweep(mask: &ForegroundMask, radius: u32, axis: Axis, op: Op) -> ForegroundMask {
    let (w, h) = (mask.width(), mask.height());
    let (lines, len) = match axis {
        Axis::Horizontal => (h, w),
        Axis::Vertical => (w, h),
    };
    let read = |line: u32, pos: u32| match axis {
        Axis::Horizontal => mask.get(pos, line),
        Axis::Vertical => mask.get(line, pos),
    };

    let mut out = ForegroundMask::new(w, h);
    let mut prefix = vec![0u32; len as usize + 1];
    for line in 0..lines {
        for pos in 0..len {
            prefix[pos as usize + 1] = prefix[pos as usize] + u32::from(read(line, pos));
        }
        for pos in 0..len {
            let lo = pos.saturating_sub(radius);
            let hi = (pos + radius).min(len - 1);
            let set = prefix[hi as usize + 1] - prefix[lo as usize];
            let value = match op {
                Op::Dilate => set > 0,
                Op::Erode => set == hi - lo + 1,
            };
            match axis {
                Axis::Horizontal => out.set(pos, line, value),
                Axis::Vertical => out.set(line, pos, value),
            }
        }
    }
    out
}
