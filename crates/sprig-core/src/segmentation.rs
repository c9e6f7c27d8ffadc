use crate::mask::Mask;
use crate::rect::Rect;
use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;

/// Label map value for pixels owned by no retained component.
pub const NO_LABEL: u32 = 0;

/// A disjoint-set forest (Union-Find) with full path compression.
///
/// Parents live in an arena-backed array indexed by dense id. Ids outside the
/// current array are registered as their own root on first lookup.
pub struct DisjointSet<'a> {
    parent: BumpVec<'a, u32>,
}

impl<'a> DisjointSet<'a> {
    /// Create a forest with `size` singleton sets, backed by the provided arena.
    pub fn new_in(arena: &'a Bump, size: usize) -> Self {
        let mut parent = BumpVec::with_capacity_in(size, arena);
        parent.extend(0..size as u32);
        Self { parent }
    }

    /// Number of registered ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// True if no id has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    #[inline]
    fn register(&mut self, i: u32) {
        let needed = i as usize + 1;
        if self.parent.len() < needed {
            let start = self.parent.len() as u32;
            self.parent.extend(start..=i);
        }
    }

    /// Find the representative (root) of the set containing `i`.
    #[inline]
    pub fn find(&mut self, i: u32) -> u32 {
        self.register(i);
        let mut root = i;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut node = i;
        while node != root {
            let next = self.parent[node as usize];
            self.parent[node as usize] = root;
            node = next;
        }
        root
    }

    /// Unite the sets containing `i` and `j`; the root of `i` is pointed at the root of `j`.
    #[inline]
    pub fn union(&mut self, i: u32, j: u32) {
        let root_i = self.find(i);
        let root_j = self.find(j);
        if root_i != root_j {
            self.parent[root_i as usize] = root_j;
        }
    }
}

/// A maximal horizontal span of occupied pixels in one row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Run {
    /// Row index.
    pub y: u32,
    /// First occupied column.
    pub x_start: u32,
    /// One past the last occupied column.
    pub x_end: u32,
    /// Dense id in row-major scan order.
    pub id: u32,
}

impl Run {
    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub fn len(&self) -> u32 {
        self.x_end - self.x_start
    }

    /// Runs are never empty; provided for API symmetry with `len`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x_end == self.x_start
    }

    /// Half-open interval overlap on x.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Run) -> bool {
        self.x_start < other.x_end && other.x_start < self.x_end
    }
}

/// All runs of a mask plus a row index into them.
pub struct RunTable<'a> {
    /// Runs in row-major scan order.
    pub runs: BumpVec<'a, Run>,
    /// `row_offsets[y]..row_offsets[y + 1]` are the runs of row `y`.
    pub row_offsets: BumpVec<'a, usize>,
}

impl RunTable<'_> {
    /// Runs belonging to row `y`.
    #[inline]
    #[must_use]
    pub fn row(&self, y: usize) -> &[Run] {
        &self.runs[self.row_offsets[y]..self.row_offsets[y + 1]]
    }

    /// Number of rows indexed.
    #[must_use]
    pub fn height(&self) -> usize {
        self.row_offsets.len().saturating_sub(1)
    }
}

/// Extract maximal runs by locating rising and falling edges in each row.
pub fn extract_runs<'a>(arena: &'a Bump, mask: &Mask) -> RunTable<'a> {
    let mut runs = BumpVec::new_in(arena);
    let mut row_offsets = BumpVec::with_capacity_in(mask.height + 1, arena);
    row_offsets.push(0);

    for y in 0..mask.height {
        let row = mask.row(y);
        let mut prev = false;
        let mut start = 0usize;
        for (x, &occupied) in row.iter().enumerate() {
            if occupied && !prev {
                start = x;
            } else if !occupied && prev {
                runs.push(Run {
                    y: y as u32,
                    x_start: start as u32,
                    x_end: x as u32,
                    id: runs.len() as u32,
                });
            }
            prev = occupied;
        }
        // Falling edge past the last column
        if prev {
            runs.push(Run {
                y: y as u32,
                x_start: start as u32,
                x_end: mask.width as u32,
                id: runs.len() as u32,
            });
        }
        row_offsets.push(runs.len());
    }

    RunTable { runs, row_offsets }
}

/// Bounding box and statistics for a connected component.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Component {
    /// Dense label, also the value stamped into the label map.
    pub label: u32,
    /// Half-open bounding box.
    pub bbox: Rect,
    /// Total number of pixels in the component.
    pub pixel_count: u32,
    /// Pixel centroid `(x, y)`.
    pub centroid: (f64, f64),
}

#[derive(Clone, Copy)]
struct Accumulator {
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
    pixel_count: u32,
    sum_x: f64,
    sum_y: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            min_x: u32::MAX,
            max_x: 0,
            min_y: u32::MAX,
            max_y: 0,
            pixel_count: 0,
            sum_x: 0.0,
            sum_y: 0.0,
        }
    }
}

impl Accumulator {
    #[inline]
    fn add_run(&mut self, run: &Run) {
        let len = run.len();
        self.min_x = self.min_x.min(run.x_start);
        self.max_x = self.max_x.max(run.x_end - 1);
        self.min_y = self.min_y.min(run.y);
        self.max_y = self.max_y.max(run.y);
        self.pixel_count += len;
        // Sum of x over [x_start, x_end) is len * (x_start + x_end - 1) / 2
        self.sum_x += f64::from(len) * (f64::from(run.x_start) + f64::from(run.x_end - 1)) / 2.0;
        self.sum_y += f64::from(len) * f64::from(run.y);
    }
}

/// Result of connected component labeling.
#[derive(Clone, Debug)]
pub struct LabelResult {
    /// Flat array of pixel labels (row-major), [`NO_LABEL`] for background and noise.
    pub labels: Vec<u32>,
    /// Width of the label map.
    pub width: usize,
    /// Height of the label map.
    pub height: usize,
    /// Retained components, indexed by `label - 1`.
    pub components: Vec<Component>,
}

impl LabelResult {
    /// Label at `(x, y)`.
    #[inline]
    #[must_use]
    pub fn label_at(&self, x: usize, y: usize) -> u32 {
        self.labels[y * self.width + x]
    }

    /// Component owning `label`, if any.
    #[must_use]
    pub fn component(&self, label: u32) -> Option<&Component> {
        if label == NO_LABEL {
            return None;
        }
        self.components.get(label as usize - 1)
    }
}

/// Label components of `mask`, drop those smaller than `min_pixels`, and build the label map.
pub fn label_components(arena: &Bump, mask: &Mask, min_pixels: u32) -> LabelResult {
    let table = extract_runs(arena, mask);
    label_runs(arena, &table, mask.width, mask.height, min_pixels)
}

/// Label components from a pre-extracted run table.
pub fn label_runs(
    arena: &Bump,
    table: &RunTable<'_>,
    width: usize,
    height: usize,
    min_pixels: u32,
) -> LabelResult {
    let runs = &table.runs;
    if runs.is_empty() {
        return LabelResult {
            labels: vec![NO_LABEL; width * height],
            width,
            height,
            components: Vec::new(),
        };
    }

    let mut uf = DisjointSet::new_in(arena, runs.len());

    // Pass 1: Link overlapping runs of adjacent rows using a two-pointer scan
    for y in 1..table.height() {
        let prev_row = table.row(y - 1);
        let curr_row = table.row(y);
        if prev_row.is_empty() || curr_row.is_empty() {
            continue;
        }

        let mut p_idx = 0;
        for curr in curr_row {
            // Skip previous-row runs that end before this one starts
            while p_idx < prev_row.len() && prev_row[p_idx].x_end <= curr.x_start {
                p_idx += 1;
            }

            let mut temp_p = p_idx;
            while temp_p < prev_row.len() && prev_row[temp_p].x_start < curr.x_end {
                uf.union(prev_row[temp_p].id, curr.id);
                temp_p += 1;
            }
        }
    }

    // Pass 2: Fold run statistics per root
    let mut roots = vec![0u32; runs.len()];
    let mut acc = vec![Accumulator::default(); runs.len()];
    for run in runs.iter() {
        let root = uf.find(run.id);
        roots[run.id as usize] = root;
        acc[root as usize].add_run(run);
    }

    // Pass 3: Assign dense labels to roots that survive the noise floor, in scan order
    let mut root_to_label = vec![NO_LABEL; runs.len()];
    let mut components = Vec::new();
    for run in runs.iter() {
        let root = roots[run.id as usize] as usize;
        let stats = &acc[root];
        if root_to_label[root] != NO_LABEL || stats.pixel_count < min_pixels {
            continue;
        }
        let label = components.len() as u32 + 1;
        root_to_label[root] = label;
        let count = f64::from(stats.pixel_count);
        components.push(Component {
            label,
            bbox: Rect::new(stats.min_x, stats.min_y, stats.max_x + 1, stats.max_y + 1),
            pixel_count: stats.pixel_count,
            centroid: (stats.sum_x / count, stats.sum_y / count),
        });
    }

    // Pass 4: Stamp labels into the pixel map
    let mut labels = vec![NO_LABEL; width * height];
    for run in runs.iter() {
        let label = root_to_label[roots[run.id as usize] as usize];
        if label == NO_LABEL {
            continue;
        }
        let row_off = run.y as usize * width;
        labels[row_off + run.x_start as usize..row_off + run.x_end as usize].fill(label);
    }

    tracing::debug!(
        runs = runs.len(),
        components = components.len(),
        "labeled connected components"
    );

    LabelResult {
        labels,
        width,
        height,
        components,
    }
}
