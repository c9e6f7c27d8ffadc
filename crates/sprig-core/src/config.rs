//! Configuration types for the slicing pipeline.
//!
//! This module provides two configuration types:
//! - [`SlicerConfig`]: Pipeline-level configuration (immutable after construction)
//! - [`SliceOptions`]: Per-call options (target frame count, seed, background keying)

// ============================================================================
// SlicerConfig: Pipeline-level configuration
// ============================================================================

/// Pipeline-level configuration for the slicer.
///
/// These settings are fixed once the `Slicer` is constructed. Use the builder
/// pattern for ergonomic construction.
///
/// # Example
/// ```
/// use sprig_core::config::SlicerConfig;
///
/// let config = SlicerConfig::builder()
///     .merge_distance(4)
///     .min_component_pixels(20)
///     .build();
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SlicerConfig {
    /// Pixels with alpha strictly above this value are occupied (default: 10).
    pub alpha_threshold: u8,
    /// Components with fewer pixels are discarded as noise (default: 50).
    pub min_component_pixels: u32,
    /// Boxes whose horizontal and vertical gaps are both within this many pixels are merged (default: 10).
    pub merge_distance: u32,
    /// Margin added around every frame before clamping to the image (default: 2).
    pub frame_padding: u32,
    /// Fraction of a box's height its center may deviate from a row's mean center (default: 0.6).
    pub row_tolerance: f64,
    /// Iteration cap for weighted k-means (default: 100).
    pub kmeans_max_iterations: usize,
}

impl Default for SlicerConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: 10,
            min_component_pixels: 50,
            merge_distance: 10,
            frame_padding: 2,
            row_tolerance: crate::order::DEFAULT_ROW_TOLERANCE,
            kmeans_max_iterations: crate::cluster::DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SlicerConfig {
    /// Create a new builder for `SlicerConfig`.
    #[must_use]
    pub fn builder() -> SlicerConfigBuilder {
        SlicerConfigBuilder::default()
    }
}

/// Builder for [`SlicerConfig`].
#[derive(Default)]
pub struct SlicerConfigBuilder {
    alpha_threshold: Option<u8>,
    min_component_pixels: Option<u32>,
    merge_distance: Option<u32>,
    frame_padding: Option<u32>,
    row_tolerance: Option<f64>,
    kmeans_max_iterations: Option<usize>,
}

impl SlicerConfigBuilder {
    /// Set the alpha occupancy threshold.
    #[must_use]
    pub fn alpha_threshold(mut self, threshold: u8) -> Self {
        self.alpha_threshold = Some(threshold);
        self
    }

    /// Set the noise floor for components.
    #[must_use]
    pub fn min_component_pixels(mut self, pixels: u32) -> Self {
        self.min_component_pixels = Some(pixels);
        self
    }

    /// Set the box merge distance.
    #[must_use]
    pub fn merge_distance(mut self, distance: u32) -> Self {
        self.merge_distance = Some(distance);
        self
    }

    /// Set the frame padding.
    #[must_use]
    pub fn frame_padding(mut self, padding: u32) -> Self {
        self.frame_padding = Some(padding);
        self
    }

    /// Set the row grouping tolerance.
    #[must_use]
    pub fn row_tolerance(mut self, tolerance: f64) -> Self {
        self.row_tolerance = Some(tolerance);
        self
    }

    /// Set the k-means iteration cap.
    #[must_use]
    pub fn kmeans_max_iterations(mut self, iterations: usize) -> Self {
        self.kmeans_max_iterations = Some(iterations);
        self
    }

    /// Build the configuration, using defaults for unset fields.
    #[must_use]
    pub fn build(self) -> SlicerConfig {
        let d = SlicerConfig::default();
        SlicerConfig {
            alpha_threshold: self.alpha_threshold.unwrap_or(d.alpha_threshold),
            min_component_pixels: self
                .min_component_pixels
                .unwrap_or(d.min_component_pixels),
            merge_distance: self.merge_distance.unwrap_or(d.merge_distance),
            frame_padding: self.frame_padding.unwrap_or(d.frame_padding),
            row_tolerance: self.row_tolerance.unwrap_or(d.row_tolerance),
            kmeans_max_iterations: self
                .kmeans_max_iterations
                .unwrap_or(d.kmeans_max_iterations),
        }
    }
}

// ============================================================================
// SliceOptions: Per-call options
// ============================================================================

/// How the occupancy mask is derived from the color buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Background {
    /// Transparent background: alpha above the configured threshold is occupied.
    #[default]
    Alpha,
    /// Opaque background of a known color; pixels farther than `tolerance` are occupied.
    ColorKey {
        /// Background RGB color.
        key: [u8; 3],
        /// Euclidean RGB distance still treated as background.
        tolerance: u32,
    },
    /// Like `ColorKey`, with the key sampled from the top-left pixel.
    CornerKey {
        /// Euclidean RGB distance still treated as background.
        tolerance: u32,
    },
}

/// Per-call slicing options.
///
/// # Example
/// ```
/// use sprig_core::config::SliceOptions;
///
/// // Exactly eight frames, reproducibly
/// let options = SliceOptions::builder().target_frames(8).seed(42).build();
/// assert_eq!(options.target_frames, Some(8));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceOptions {
    /// Exact number of frames wanted. `None` or `Some(0)` uses box merging instead of clustering.
    pub target_frames: Option<usize>,
    /// Seed for k-means++ initialization. `None` draws one from the OS.
    pub seed: Option<u64>,
    /// Background keying mode.
    pub background: Background,
}

impl SliceOptions {
    /// Create a new builder for `SliceOptions`.
    #[must_use]
    pub fn builder() -> SliceOptionsBuilder {
        SliceOptionsBuilder::default()
    }

    /// The cluster count when count-constrained slicing was requested.
    #[must_use]
    pub fn cluster_count(&self) -> Option<usize> {
        self.target_frames.filter(|&k| k > 0)
    }
}

/// Builder for [`SliceOptions`].
#[derive(Default)]
pub struct SliceOptionsBuilder {
    options: SliceOptions,
}

impl SliceOptionsBuilder {
    /// Request an exact number of frames.
    #[must_use]
    pub fn target_frames(mut self, frames: usize) -> Self {
        self.options.target_frames = Some(frames);
        self
    }

    /// Pin the k-means++ seed.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.options.seed = Some(seed);
        self
    }

    /// Set the background keying mode.
    #[must_use]
    pub fn background(mut self, background: Background) -> Self {
        self.options.background = background;
        self
    }

    /// Build the options.
    #[must_use]
    pub fn build(self) -> SliceOptions {
        self.options
    }
}
