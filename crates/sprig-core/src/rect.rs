//! Half-open axis-aligned boxes.

/// Bounding box `[left, right) × [top, bottom)` in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    /// Leftmost column (inclusive).
    pub left: u32,
    /// Topmost row (inclusive).
    pub top: u32,
    /// Right edge (exclusive).
    pub right: u32,
    /// Bottom edge (exclusive).
    pub bottom: u32,
}

impl Rect {
    /// Construct from half-open edges.
    #[must_use]
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Width in pixels.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    /// Height in pixels.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True if the box covers no pixel.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Horizontal center.
    #[inline]
    #[must_use]
    pub fn center_x(&self) -> f64 {
        (f64::from(self.left) + f64::from(self.right)) / 2.0
    }

    /// Vertical center.
    #[inline]
    #[must_use]
    pub fn center_y(&self) -> f64 {
        (f64::from(self.top) + f64::from(self.bottom)) / 2.0
    }

    /// Smallest box containing both.
    #[must_use]
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Horizontal separation; zero when the boxes overlap or touch on x.
    #[inline]
    #[must_use]
    pub fn gap_x(&self, other: &Rect) -> u32 {
        self.left
            .max(other.left)
            .saturating_sub(self.right.min(other.right))
    }

    /// Vertical separation; zero when the boxes overlap or touch on y.
    #[inline]
    #[must_use]
    pub fn gap_y(&self, other: &Rect) -> u32 {
        self.top
            .max(other.top)
            .saturating_sub(self.bottom.min(other.bottom))
    }

    /// Grow by `margin` on every side, clamped to `[0, width] × [0, height]`.
    #[must_use]
    pub fn pad_clamped(&self, margin: u32, width: u32, height: u32) -> Rect {
        Rect {
            left: self.left.saturating_sub(margin).min(width),
            top: self.top.saturating_sub(margin).min(height),
            right: self.right.saturating_add(margin).min(width),
            bottom: self.bottom.saturating_add(margin).min(height),
        }
    }
}
