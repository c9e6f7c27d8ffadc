//! Core slicing logic for the Sprig library.
//!
//! Sprig cuts a sprite sheet (several disjoint sprites painted on a removable
//! background) into an ordered list of per-sprite frames.
//!
//! # Architecture Overview
//!
//! 1. **Masking**:
//!    - Per-pixel alpha threshold or background color key, producing an occupancy [`Mask`].
//!
//! 2. **Segmentation**:
//!    - Run-length connected components labeling (no per-pixel flood fill).
//!    - Union-Find over dense run ids, allocated in a bump arena.
//!    - One pass yields component boxes, pixel counts, centroids and the label map.
//!
//! 3. **Grouping**:
//!    - Default: fixed-point merging of boxes closer than a distance threshold.
//!    - With a target frame count: weighted k-means over component centroids,
//!      k-means++ seeded from an injected generator.
//!
//! 4. **Ordering**:
//!    - Greedy row grouping by vertical center, then left-to-right within rows.
//!
//! 5. **Extraction**:
//!    - Padded, clamped crops. Clustered groups are alpha-masked to their own pixels.
//!
//! # Example
//!
//! ```
//! # use sprig_core::{Slicer, RgbaView, config::{SlicerConfig, SliceOptions}};
//! let config = SlicerConfig::builder().frame_padding(1).build();
//! let mut slicer = Slicer::with_config(config);
//!
//! // Transparent 64x64 sheet with no sprites
//! # let pixels = vec![0u8; 64 * 64 * 4];
//! let img = RgbaView::packed(&pixels, 64, 64).unwrap();
//!
//! let options = SliceOptions::builder().target_frames(4).seed(7).build();
//! let frames = slicer.slice_with_options(&img, &options);
//! assert!(frames.is_empty());
//! ```

/// Count-constrained grouping with weighted k-means.
pub mod cluster;
/// Configuration types for the slicing pipeline.
pub mod config;
/// Frame cropping and masking.
pub mod frame;
/// Image buffer abstractions.
pub mod image;
/// Occupancy masks.
pub mod mask;
/// Nearby box coalescing.
pub mod merge;
/// Reading-order sorting.
pub mod order;
/// Half-open rectangles.
pub mod rect;
/// Connected components labeling using Union-Find.
pub mod segmentation;
/// Utilities for testing and synthetic data generation.
pub mod test_utils;

pub use crate::cluster::Group;
pub use crate::config::{Background, SliceOptions, SlicerConfig};
pub use crate::frame::Frame;
pub use crate::image::RgbaView;
pub use crate::mask::Mask;
pub use crate::rect::Rect;
pub use crate::segmentation::{Component, LabelResult};
use bumpalo::Bump;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Pipeline-wide statistics for a single slicing call.
#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineStats {
    /// Time taken to build the occupancy mask in milliseconds.
    pub masking_ms: f64,
    /// Time taken for connected components labeling in milliseconds.
    pub segmentation_ms: f64,
    /// Time taken for box merging or clustering in milliseconds.
    pub grouping_ms: f64,
    /// Time taken for reading-order sorting in milliseconds.
    pub ordering_ms: f64,
    /// Time taken for frame extraction in milliseconds.
    pub extraction_ms: f64,
    /// Total pipeline time in milliseconds.
    pub total_ms: f64,
    /// Number of components that passed the noise floor.
    pub num_components: usize,
    /// Number of groups after merging or clustering.
    pub num_groups: usize,
    /// Number of frames returned.
    pub num_frames: usize,
    /// K-means iterations (0 on the merge path or when no clustering was needed).
    pub kmeans_iterations: usize,
    /// Whether k-means converged before the iteration cap.
    pub kmeans_converged: bool,
}

/// Full result of a slicing call including intermediate data for debugging.
pub struct FullSliceResult {
    /// Frames in reading order.
    pub frames: Vec<Frame>,
    /// Component labeling of the mask.
    pub labels: LabelResult,
    /// Groups before ordering.
    pub groups: Vec<Group>,
    /// Indices into `groups` in reading order.
    pub order: Vec<usize>,
    /// Whether the count-constrained (clustering) path was taken.
    pub clustered: bool,
    /// Pipeline statistics.
    pub stats: PipelineStats,
}

/// The main entry point for slicing sprite sheets.
///
/// The slicer holds reusable state (the arena used for runs and the
/// union-find) and is configured at construction time via [`SlicerConfig`].
pub struct Slicer {
    arena: Bump,
    config: SlicerConfig,
}

impl Slicer {
    /// Create a new slicer with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SlicerConfig::default())
    }

    /// Create a slicer with custom pipeline configuration.
    #[must_use]
    pub fn with_config(config: SlicerConfig) -> Self {
        Self {
            arena: Bump::new(),
            config,
        }
    }

    /// Get the current slicer configuration.
    pub fn get_config(&self) -> SlicerConfig {
        self.config
    }

    /// Slice with default options: alpha masking and box merging.
    pub fn slice(&mut self, img: &RgbaView) -> Vec<Frame> {
        self.slice_with_options(img, &SliceOptions::default())
    }

    /// Slice with custom per-call options.
    pub fn slice_with_options(&mut self, img: &RgbaView, options: &SliceOptions) -> Vec<Frame> {
        self.slice_with_stats(img, options).0
    }

    /// Slice and report timing statistics.
    pub fn slice_with_stats(
        &mut self,
        img: &RgbaView,
        options: &SliceOptions,
    ) -> (Vec<Frame>, PipelineStats) {
        let res = self.slice_full(img, options);
        (res.frames, res.stats)
    }

    /// Build the occupancy mask for `img` according to `background`.
    #[must_use]
    pub fn build_mask(&self, img: &RgbaView, background: Background) -> Mask {
        let _span = tracing::info_span!("masking").entered();
        match background {
            Background::Alpha => Mask::from_alpha(img, self.config.alpha_threshold),
            Background::ColorKey { key, tolerance } => Mask::from_color_key(img, key, tolerance),
            Background::CornerKey { tolerance } => match Mask::corner_key(img) {
                Some(key) => Mask::from_color_key(img, key, tolerance),
                None => Mask::empty(img.width, img.height),
            },
        }
    }

    /// Perform a full slice and return all intermediate data.
    pub fn slice_full(&mut self, img: &RgbaView, options: &SliceOptions) -> FullSliceResult {
        let start_mask = std::time::Instant::now();
        let mask = self.build_mask(img, options.background);
        let masking_ms = start_mask.elapsed().as_secs_f64() * 1000.0;

        let mut res = match options.seed {
            Some(seed) => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                self.slice_mask_with_rng(img, &mask, options.cluster_count(), &mut rng)
            }
            None => {
                let mut rng = ChaCha8Rng::from_entropy();
                self.slice_mask_with_rng(img, &mask, options.cluster_count(), &mut rng)
            }
        };
        res.stats.masking_ms = masking_ms;
        res.stats.total_ms += masking_ms;
        res
    }

    /// Slice a precomputed mask, drawing k-means++ seeds from `rng`.
    ///
    /// `target_frames` of `None` or `Some(0)` takes the box-merging path.
    ///
    /// # Panics
    /// Panics if `mask` and `img` differ in dimensions.
    pub fn slice_mask_with_rng<R: Rng + ?Sized>(
        &mut self,
        img: &RgbaView,
        mask: &Mask,
        target_frames: Option<usize>,
        rng: &mut R,
    ) -> FullSliceResult {
        assert!(
            mask.width == img.width && mask.height == img.height,
            "mask is {}x{} but image is {}x{}",
            mask.width,
            mask.height,
            img.width,
            img.height
        );
        let mut stats = PipelineStats::default();
        let start_total = std::time::Instant::now();

        self.arena.reset();

        // 1. Segmentation
        let start_seg = std::time::Instant::now();
        let labels = {
            let _span = tracing::info_span!("segmentation").entered();
            segmentation::label_components(&self.arena, mask, self.config.min_component_pixels)
        };
        stats.segmentation_ms = start_seg.elapsed().as_secs_f64() * 1000.0;
        stats.num_components = labels.components.len();

        // 2. Grouping
        let start_group = std::time::Instant::now();
        let clustered = target_frames.is_some_and(|k| k > 0);
        let groups: Vec<Group> = match target_frames.filter(|&k| k > 0) {
            Some(k) => {
                let _span = tracing::info_span!("clustering", k).entered();
                let result = cluster::cluster_components(
                    &labels,
                    k,
                    self.config.kmeans_max_iterations,
                    rng,
                );
                stats.kmeans_iterations = result.iterations;
                stats.kmeans_converged = result.converged;
                result.groups
            }
            None => {
                let _span = tracing::info_span!("merge").entered();
                let boxes: Vec<Rect> = labels.components.iter().map(|c| c.bbox).collect();
                merge::merge_boxes(&boxes, self.config.merge_distance)
                    .into_iter()
                    .map(Group::from_rect)
                    .collect()
            }
        };
        stats.grouping_ms = start_group.elapsed().as_secs_f64() * 1000.0;
        stats.num_groups = groups.len();

        // 3. Ordering
        let start_order = std::time::Instant::now();
        let order = {
            let _span = tracing::info_span!("ordering").entered();
            let boxes: Vec<Rect> = groups.iter().map(|g| g.bbox).collect();
            order::reading_order(&boxes, self.config.row_tolerance)
        };
        stats.ordering_ms = start_order.elapsed().as_secs_f64() * 1000.0;

        // 4. Extraction
        let start_extract = std::time::Instant::now();
        let frames = {
            let _span = tracing::info_span!("extraction").entered();
            frame::extract_frames(
                img,
                &groups,
                &order,
                self.config.frame_padding,
                clustered.then_some(&labels),
            )
        };
        stats.extraction_ms = start_extract.elapsed().as_secs_f64() * 1000.0;
        stats.num_frames = frames.len();
        stats.total_ms = start_total.elapsed().as_secs_f64() * 1000.0;

        tracing::info!(
            components = stats.num_components,
            groups = stats.num_groups,
            frames = stats.num_frames,
            clustered,
            total_ms = stats.total_ms,
            "sliced sheet"
        );

        FullSliceResult {
            frames,
            labels,
            groups,
            order,
            clustered,
            stats,
        }
    }
}

impl Default for Slicer {
    fn default() -> Self {
        Self::new()
    }
}
