//! Object locator: picks the dominant foreground region and its centroid.

use crate::domain::{ForegroundMask, Point};
use serde::{Deserialize, Serialize};

/// Raw spatial moments of a region (order 0 and 1).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    fn add(&mut self, x: u32, y: u32) {
        self.m00 += 1.0;
        self.m10 += f64::from(x);
        self.m01 += f64::from(y);
    }

    /// First-moment centroid, truncated to whole pixels.
    ///
    /// A zero-mass region has no centroid.
    pub fn centroid(&self) -> Option<Point> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Point::new(
            (self.m10 / self.m00) as u32,
            (self.m01 / self.m00) as u32,
        ))
    }
}

/// One 8-connected foreground component.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub area: u32,
    pub moments: Moments,
    pub top_left: Point,
    pub bottom_right: Point,
}

/// The located object for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub centroid: Point,
    pub area: u32,
    pub top_left: Point,
    pub bottom_right: Point,
}

/// Label every 8-connected foreground component, in raster order of their
/// first pixel.
pub fn find_regions(mask: &ForegroundMask) -> Vec<Region> {
    let (w, h) = (mask.width(), mask.height());
    let mut visited = vec![false; w as usize * h as usize];
    let idx = |x: u32, y: u32| y as usize * w as usize + x as usize;
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            if visited[idx(x, y)] || !mask.get(x, y) {
                continue;
            }

            let mut region = Region {
                area: 0,
                moments: Moments::default(),
                top_left: Point::new(x, y),
                bottom_right: Point::new(x, y),
            };
            visited[idx(x, y)] = true;
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                region.area += 1;
                region.moments.add(cx, cy);
                region.top_left.x = region.top_left.x.min(cx);
                region.top_left.y = region.top_left.y.min(cy);
                region.bottom_right.x = region.bottom_right.x.max(cx);
                region.bottom_right.y = region.bottom_right.y.max(cy);

                for ny in cy.saturating_sub(1)..=(cy + 1).min(h - 1) {
                    for nx in cx.saturating_sub(1)..=(cx + 1).min(w - 1) {
                        let n = idx(nx, ny);
                        if !visited[n] && mask.get(nx, ny) {
                            visited[n] = true;
                            stack.push((nx, ny));
                        }
                    }
                }
            }

            regions.push(region);
        }
    }

    regions
}

/// Finds the largest region and reports it when it is big enough to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectLocator {
    min_area: u32,
}

impl Default for ObjectLocator {
    fn default() -> Self {
        Self::new(500)
    }
}

impl ObjectLocator {
    pub fn new(min_area: u32) -> Self {
        Self { min_area }
    }

    pub fn min_area(&self) -> u32 {
        self.min_area
    }

    /// The dominant blob, or `None` when there is nothing worth tracking.
    ///
    /// Ties on area go to the region found first in raster order.
    ///
    /// Area is the number of foreground pixels in the component. Holes are
    /// not filled and a component nested inside another's hole is a separate
    /// region, so a hollow outline scores its outline pixels only. This is
    /// smaller than the polygon area of its outer contour, which also covers
    /// the hole; `min_area` is tuned against pixel counts.
    pub fn locate(&self, mask: &ForegroundMask) -> Option<Blob> {
        let largest = find_regions(mask)
            .into_iter()
            .fold(None::<Region>, |best, r| match best {
                Some(b) if b.area >= r.area => Some(b),
                _ => Some(r),
            })?;

        if largest.area < self.min_area {
            return None;
        }

        let centroid = largest.moments.centroid()?;
        Some(Blob {
            centroid,
            area: largest.area,
            top_left: largest.top_left,
            bottom_right: largest.bottom_right,
        })
    }
}
