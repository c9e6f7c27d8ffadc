//! Occupancy masks: which pixels count as sprite content.

use crate::image::RgbaView;

/// Row-major `width × height` boolean grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    /// Row-major occupancy flags.
    pub data: Vec<bool>,
    /// Width in cells.
    pub width: usize,
    /// Height in cells.
    pub height: usize,
}

impl Mask {
    /// Wrap an existing occupancy buffer.
    pub fn new(data: Vec<bool>, width: usize, height: usize) -> Result<Self, String> {
        if data.len() != width * height {
            return Err(format!(
                "Mask size ({}) does not match {}x{} grid",
                data.len(),
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// An all-false mask.
    #[must_use]
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            data: vec![false; width * height],
            width,
            height,
        }
    }

    /// Pixels whose alpha is strictly above `threshold` are occupied.
    #[must_use]
    pub fn from_alpha(img: &RgbaView, threshold: u8) -> Self {
        let mut data = Vec::with_capacity(img.width * img.height);
        for y in 0..img.height {
            data.extend(img.get_row(y).chunks_exact(4).map(|px| px[3] > threshold));
        }
        Self {
            data,
            width: img.width,
            height: img.height,
        }
    }

    /// Pixels whose RGB color lies farther than `tolerance` (Euclidean) from `key`
    /// are occupied. Fully transparent pixels are never occupied.
    #[must_use]
    pub fn from_color_key(img: &RgbaView, key: [u8; 3], tolerance: u32) -> Self {
        let tol_sq = u64::from(tolerance).pow(2);
        let mut data = Vec::with_capacity(img.width * img.height);
        for y in 0..img.height {
            data.extend(img.get_row(y).chunks_exact(4).map(|px| {
                let dist_sq: u64 = (0..3)
                    .map(|c| {
                        let d = u64::from(px[c].abs_diff(key[c]));
                        d * d
                    })
                    .sum();
                px[3] > 0 && dist_sq > tol_sq
            }));
        }
        Self {
            data,
            width: img.width,
            height: img.height,
        }
    }

    /// The top-left pixel's color, the usual background of a sprite sheet.
    #[must_use]
    pub fn corner_key(img: &RgbaView) -> Option<[u8; 3]> {
        if img.width == 0 || img.height == 0 {
            return None;
        }
        let [r, g, b, _] = img.get_pixel(0, 0);
        Some([r, g, b])
    }

    /// Occupancy flags of row `y`.
    #[inline]
    #[must_use]
    pub fn row(&self, y: usize) -> &[bool] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Occupancy at `(x, y)`.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[y * self.width + x]
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&b| b).count()
    }
}
