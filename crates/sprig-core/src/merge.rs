//! Coalescing of nearby bounding boxes.
//!
//! Box counts on a sprite sheet are small, so the merger runs full quadratic
//! passes until a fixed point instead of building a proximity graph. Growing a
//! box can only shrink its gaps, so the final extents do not depend on the
//! order boxes are visited in.

use crate::rect::Rect;

/// True if both the horizontal and vertical gaps are at most `distance`.
#[inline]
#[must_use]
pub fn within_distance(a: &Rect, b: &Rect, distance: u32) -> bool {
    a.gap_x(b) <= distance && a.gap_y(b) <= distance
}

/// Merge boxes whose gaps are within `distance` until no pair qualifies.
///
/// Survivors keep the position of the earliest box they absorbed.
#[must_use]
pub fn merge_boxes(boxes: &[Rect], distance: u32) -> Vec<Rect> {
    let mut slots: Vec<Option<Rect>> = boxes.iter().copied().map(Some).collect();
    let mut passes = 0usize;

    loop {
        passes += 1;
        let mut merged_any = false;
        for i in 0..slots.len() {
            let Some(mut current) = slots[i] else {
                continue;
            };
            for j in (i + 1)..slots.len() {
                let Some(other) = slots[j] else {
                    continue;
                };
                if within_distance(&current, &other, distance) {
                    current = current.union(&other);
                    slots[j] = None;
                    merged_any = true;
                }
            }
            slots[i] = Some(current);
        }
        if !merged_any {
            break;
        }
    }

    let merged: Vec<Rect> = slots.into_iter().flatten().collect();
    tracing::debug!(
        input = boxes.len(),
        output = merged.len(),
        passes,
        "merged nearby boxes"
    );
    merged
}
