//! Count-constrained grouping of components by weighted k-means.
//!
//! Points are component centroids weighted by pixel count. Seeding follows
//! k-means++ and is the only randomized step in the pipeline; the generator is
//! always supplied by the caller.

use crate::rect::Rect;
use crate::segmentation::LabelResult;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

/// A 2D point `(x, y)`.
pub type Point = (f64, f64);

/// Default iteration cap for [`weighted_kmeans`].
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[inline]
fn dist_sq(a: Point, b: Point) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    dx * dx + dy * dy
}

/// Index of the nearest centroid; ties go to the lowest index.
#[inline]
fn nearest(p: Point, centroids: &[Point]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (i, &c) in centroids.iter().enumerate() {
        let d = dist_sq(p, c);
        if d < best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Pick `k` initial centroids with k-means++ seeding.
///
/// The first centroid is uniform over `points`; each further one is drawn with
/// probability proportional to the squared distance to the nearest centroid
/// chosen so far. When every point coincides with a chosen centroid the draw
/// falls back to uniform.
pub fn seed_centroids<R: Rng + ?Sized>(points: &[Point], k: usize, rng: &mut R) -> Vec<Point> {
    if points.is_empty() || k == 0 {
        return Vec::new();
    }
    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())]);

    let mut min_d: Vec<f64> = points.iter().map(|&p| dist_sq(p, centroids[0])).collect();
    while centroids.len() < k {
        let idx = match WeightedIndex::new(&min_d) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..points.len()),
        };
        let chosen = points[idx];
        centroids.push(chosen);
        for (d, &p) in min_d.iter_mut().zip(points) {
            *d = d.min(dist_sq(p, chosen));
        }
    }
    centroids
}

/// Outcome of a k-means run.
#[derive(Clone, Debug, PartialEq)]
pub struct KMeans {
    /// Cluster index per input point.
    pub assignment: Vec<usize>,
    /// Final centroids.
    pub centroids: Vec<Point>,
    /// Assignment passes performed.
    pub iterations: usize,
    /// True if the assignment stopped changing before the cap.
    pub converged: bool,
}

/// Weighted Lloyd iterations from k-means++ seeds.
///
/// Empty clusters keep their previous centroid. Stops when an assignment pass
/// changes nothing, or after `max_iterations` passes (at least one) with the
/// current assignment.
pub fn weighted_kmeans<R: Rng + ?Sized>(
    points: &[Point],
    weights: &[f64],
    k: usize,
    max_iterations: usize,
    rng: &mut R,
) -> KMeans {
    debug_assert_eq!(points.len(), weights.len());
    // At least one assignment pass so every point ends up in a cluster
    let max_iterations = max_iterations.max(1);
    let mut centroids = seed_centroids(points, k, rng);
    let mut assignment = vec![usize::MAX; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    if centroids.is_empty() {
        return KMeans {
            assignment: Vec::new(),
            centroids,
            iterations,
            converged: true,
        };
    }

    while iterations < max_iterations {
        iterations += 1;
        let next: Vec<usize> = points.iter().map(|&p| nearest(p, &centroids)).collect();
        if next == assignment {
            converged = true;
            break;
        }
        assignment = next;

        let mut sum_x = vec![0.0; centroids.len()];
        let mut sum_y = vec![0.0; centroids.len()];
        let mut total_w = vec![0.0; centroids.len()];
        for ((&p, &w), &c) in points.iter().zip(weights).zip(&assignment) {
            sum_x[c] += p.0 * w;
            sum_y[c] += p.1 * w;
            total_w[c] += w;
        }
        for (i, centroid) in centroids.iter_mut().enumerate() {
            if total_w[i] > 0.0 {
                *centroid = (sum_x[i] / total_w[i], sum_y[i] / total_w[i]);
            }
        }
    }

    KMeans {
        assignment,
        centroids,
        iterations,
        converged,
    }
}

/// A final partition unit: the pixels of one or more components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Group {
    /// Extent of the group's pixels.
    pub bbox: Rect,
    /// Number of pixels in the group.
    pub pixel_count: u32,
    /// Component labels belonging to the group. Empty for purely geometric groups.
    pub members: Vec<u32>,
}

impl Group {
    /// A geometric group with no label membership, as produced by box merging.
    #[must_use]
    pub fn from_rect(bbox: Rect) -> Self {
        Self {
            bbox,
            pixel_count: 0,
            members: Vec::new(),
        }
    }
}

/// Result of count-constrained clustering.
#[derive(Clone, Debug, Default)]
pub struct ClusterResult {
    /// Non-empty groups, in cluster index order.
    pub groups: Vec<Group>,
    /// K-means iterations performed (0 when no clustering was needed).
    pub iterations: usize,
    /// Whether k-means converged (true when no clustering was needed).
    pub converged: bool,
}

/// Partition the labeled components into at most `k` groups.
///
/// With `k` at least the component count every component becomes its own group.
/// A group's pixels are the union of its members' pixels in the label map, so its
/// box is the union of the members' boxes.
pub fn cluster_components<R: Rng + ?Sized>(
    labels: &LabelResult,
    k: usize,
    max_iterations: usize,
    rng: &mut R,
) -> ClusterResult {
    let components = &labels.components;
    if components.len() <= k {
        return ClusterResult {
            groups: components
                .iter()
                .map(|c| Group {
                    bbox: c.bbox,
                    pixel_count: c.pixel_count,
                    members: vec![c.label],
                })
                .collect(),
            iterations: 0,
            converged: true,
        };
    }

    let points: Vec<Point> = components.iter().map(|c| c.centroid).collect();
    let weights: Vec<f64> = components.iter().map(|c| f64::from(c.pixel_count)).collect();
    let km = weighted_kmeans(&points, &weights, k, max_iterations, rng);

    let mut slots: Vec<Option<Group>> = vec![None; k];
    for (component, &cluster) in components.iter().zip(&km.assignment) {
        let slot = slots[cluster].get_or_insert_with(|| Group {
            bbox: component.bbox,
            ..Group::default()
        });
        slot.bbox = slot.bbox.union(&component.bbox);
        slot.pixel_count += component.pixel_count;
        slot.members.push(component.label);
    }

    let groups: Vec<Group> = slots
        .into_iter()
        .flatten()
        .filter(|g| g.pixel_count > 0)
        .collect();

    tracing::debug!(
        components = components.len(),
        k,
        groups = groups.len(),
        iterations = km.iterations,
        converged = km.converged,
        "clustered components"
    );

    ClusterResult {
        groups,
        iterations: km.iterations,
        converged: km.converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Mask;
    use crate::segmentation::{NO_LABEL, label_components};
    use bumpalo::Bump;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn squares_mask(width: usize, height: usize, squares: &[(usize, usize, usize)]) -> Mask {
        let mut mask = Mask::empty(width, height);
        for &(x0, y0, size) in squares {
            for y in y0..y0 + size {
                for x in x0..x0 + size {
                    mask.data[y * width + x] = true;
                }
            }
        }
        mask
    }

    #[test]
    fn test_seeding_picks_distinct_points() {
        let points = [(0.0, 0.0), (100.0, 0.0), (0.0, 100.0)];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let seeds = seed_centroids(&points, 3, &mut rng);
        assert_eq!(seeds.len(), 3);
        for p in points {
            assert!(seeds.contains(&p));
        }
    }

    #[test]
    fn test_seeding_coincident_points() {
        let points = [(5.0, 5.0); 4];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let seeds = seed_centroids(&points, 3, &mut rng);
        assert_eq!(seeds, vec![(5.0, 5.0); 3]);
    }

    #[test]
    fn test_kmeans_separates_two_clouds() {
        let points = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (50.0, 50.0), (51.0, 50.0)];
        let weights = [1.0; 5];
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let km = weighted_kmeans(&points, &weights, 2, DEFAULT_MAX_ITERATIONS, &mut rng);
        assert!(km.converged);
        assert_eq!(km.assignment[0], km.assignment[1]);
        assert_eq!(km.assignment[0], km.assignment[2]);
        assert_eq!(km.assignment[3], km.assignment[4]);
        assert_ne!(km.assignment[0], km.assignment[3]);
    }

    #[test]
    fn test_centroid_is_weighted() {
        let points = [(0.0, 0.0), (10.0, 0.0), (1000.0, 0.0)];
        let weights = [3.0, 1.0, 1.0];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let km = weighted_kmeans(&points, &weights, 2, DEFAULT_MAX_ITERATIONS, &mut rng);
        let c = km.centroids[km.assignment[0]];
        assert!((c.0 - 2.5).abs() < 1e-9);
        assert_eq!(km.centroids[km.assignment[2]], (1000.0, 0.0));
    }

    #[test]
    fn test_iteration_cap_is_respected() {
        let points = [(0.0, 0.0), (1.0, 0.0), (5.0, 0.0), (9.0, 0.0)];
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let km = weighted_kmeans(&points, &[1.0; 4], 2, 1, &mut rng);
        assert_eq!(km.iterations, 1);
        assert!(!km.converged);
        assert_eq!(km.assignment.len(), 4);
    }

    #[test]
    fn test_fewer_components_than_k_maps_one_to_one() {
        let arena = Bump::new();
        let mask = squares_mask(64, 64, &[(2, 2, 8), (30, 30, 8)]);
        let labels = label_components(&arena, &mask, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = cluster_components(&labels, 5, DEFAULT_MAX_ITERATIONS, &mut rng);
        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.groups[0].members, vec![1]);
        assert_eq!(result.groups[1].bbox, Rect::new(30, 30, 38, 38));
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_three_touching_blobs_into_two_groups_is_reproducible() {
        let arena = Bump::new();
        // Two blobs close together on the left, one far on the right; each
        // pair of neighbors is separated by a single empty column.
        let mask = squares_mask(
            120,
            40,
            &[(5, 10, 10), (16, 10, 10), (90, 10, 10)],
        );
        let labels = label_components(&arena, &mask, 1);
        assert_eq!(labels.components.len(), 3);

        let run = |seed: u64| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            cluster_components(&labels, 2, DEFAULT_MAX_ITERATIONS, &mut rng).groups
        };

        let first = run(1234);
        assert_eq!(first, run(1234));
        assert_eq!(first.len(), 2);

        let mut memberships: Vec<Vec<u32>> = first.iter().map(|g| g.members.clone()).collect();
        memberships.sort();
        assert_eq!(memberships, vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn test_empty_cluster_keeps_its_seed() {
        // Two distinct locations and three clusters: seeding must repeat one,
        // and ties send every point to the lower index of the duplicate pair.
        let points = [(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (10.0, 0.0)];
        let weights = [1.0; 4];
        for seed in [31, 40, 49] {
            let seeds = seed_centroids(&points, 3, &mut ChaCha8Rng::seed_from_u64(seed));
            let km = weighted_kmeans(
                &points,
                &weights,
                3,
                DEFAULT_MAX_ITERATIONS,
                &mut ChaCha8Rng::seed_from_u64(seed),
            );
            assert!(km.converged);

            let empty: Vec<usize> = (0..3).filter(|c| !km.assignment.contains(c)).collect();
            assert_eq!(empty.len(), 1);
            assert_eq!(km.centroids[empty[0]], seeds[empty[0]]);
        }
    }

    #[test]
    fn test_coincident_centroids_yield_fewer_groups() {
        let arena = Bump::new();
        // Two rings, each around a centered dot: four components at two locations
        let mut mask = Mask::empty(100, 40);
        for x0 in [0, 60] {
            for (x, y, w, h) in [
                (x0, 0, 30, 3),
                (x0, 27, 30, 3),
                (x0, 3, 3, 24),
                (x0 + 27, 3, 3, 24),
                (x0 + 11, 11, 8, 8),
            ] {
                for py in y..y + h {
                    for px in x..x + w {
                        mask.data[py * 100 + px] = true;
                    }
                }
            }
        }
        let labels = label_components(&arena, &mask, 50);
        assert_eq!(labels.components.len(), 4);
        let ring = labels.component(labels.label_at(0, 0)).unwrap();
        let dot = labels.component(labels.label_at(12, 12)).unwrap();
        assert_eq!(ring.centroid, dot.centroid);
        assert!(labels.component(NO_LABEL).is_none());

        for seed in 0..20 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = cluster_components(&labels, 3, DEFAULT_MAX_ITERATIONS, &mut rng);
            assert_eq!(result.groups.len(), 2);

            let mut boxes: Vec<Rect> = result.groups.iter().map(|g| g.bbox).collect();
            boxes.sort();
            assert_eq!(boxes, vec![Rect::new(0, 0, 30, 30), Rect::new(60, 0, 90, 30)]);
            assert!(result.groups.iter().all(|g| g.members.len() == 2));
        }
    }

    proptest! {
        #[test]
        fn prop_group_count_bound(
            squares in prop::collection::vec((0..10usize, 0..10usize), 1..12),
            k in 1..8usize,
            seed in any::<u64>(),
        ) {
            let arena = Bump::new();
            // Place 4x4 squares on a 10x10 lattice of 8px cells so they never touch
            let placed: Vec<(usize, usize, usize)> =
                squares.iter().map(|&(cx, cy)| (cx * 8, cy * 8, 4)).collect();
            let mask = squares_mask(80, 80, &placed);
            let labels = label_components(&arena, &mask, 1);
            let n = labels.components.len();

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let result = cluster_components(&labels, k, DEFAULT_MAX_ITERATIONS, &mut rng);

            prop_assert!(result.groups.len() <= k);
            prop_assert!(!result.groups.is_empty());
            if n <= k {
                prop_assert_eq!(result.groups.len(), n);
            }
            let total: u32 = result.groups.iter().map(|g| g.pixel_count).sum();
            let expected: u32 = labels.components.iter().map(|c| c.pixel_count).sum();
            prop_assert_eq!(total, expected);

            let mut seen: Vec<u32> = result.groups.iter().flat_map(|g| g.members.clone()).collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (1..=n as u32).collect::<Vec<_>>());
        }
    }
}
