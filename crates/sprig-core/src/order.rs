//! Reading order: rows top-to-bottom, boxes left-to-right within a row.

use crate::rect::Rect;

/// Default fraction of a candidate's height tolerated between its center and a row's mean.
pub const DEFAULT_ROW_TOLERANCE: f64 = 0.6;

/// Group boxes into rows, top to bottom, each row holding indices of `boxes`
/// ordered left to right.
///
/// Boxes are visited by ascending vertical center. A box joins the current row
/// when its center lies within `tolerance × height` of the mean center of the
/// boxes already in the row; the mean is taken before the box is appended.
/// Otherwise the row is closed and the box starts a new one. Each row is then
/// sorted by horizontal center. Both sorts are stable.
#[must_use]
pub fn reading_rows(boxes: &[Rect], tolerance: f64) -> Vec<Vec<usize>> {
    let mut by_y: Vec<usize> = (0..boxes.len()).collect();
    by_y.sort_by(|&a, &b| boxes[a].center_y().total_cmp(&boxes[b].center_y()));

    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut row_sum = 0.0;

    for idx in by_y {
        let b = &boxes[idx];
        let cy = b.center_y();
        if !current.is_empty() {
            let mean = row_sum / current.len() as f64;
            if (cy - mean).abs() >= tolerance * f64::from(b.height()) {
                rows.push(std::mem::take(&mut current));
                row_sum = 0.0;
            }
        }
        current.push(idx);
        row_sum += cy;
    }
    if !current.is_empty() {
        rows.push(current);
    }

    tracing::debug!(boxes = boxes.len(), rows = rows.len(), "grouped boxes into rows");

    for row in &mut rows {
        row.sort_by(|&a, &b| boxes[a].center_x().total_cmp(&boxes[b].center_x()));
    }
    rows
}

/// Indices of `boxes` in reading order: the rows of [`reading_rows`] concatenated.
#[must_use]
pub fn reading_order(boxes: &[Rect], tolerance: f64) -> Vec<usize> {
    reading_rows(boxes, tolerance).into_iter().flatten().collect()
}

/// Convenience wrapper returning the boxes themselves in reading order.
#[must_use]
pub fn sort_reading_order(boxes: &[Rect], tolerance: f64) -> Vec<Rect> {
    reading_order(boxes, tolerance)
        .into_iter()
        .map(|i| boxes[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square(x: u32, y: u32, size: u32) -> Rect {
        Rect::new(x, y, x + size, y + size)
    }

    #[test]
    fn test_grid_order() {
        // 3x2 grid given in scrambled order
        let boxes = [
            square(200, 100, 40),
            square(0, 0, 40),
            square(100, 100, 40),
            square(200, 0, 40),
            square(0, 100, 40),
            square(100, 0, 40),
        ];
        let order = reading_order(&boxes, DEFAULT_ROW_TOLERANCE);
        assert_eq!(order, vec![1, 5, 3, 4, 2, 0]);
    }

    #[test]
    fn test_uneven_row_alignment() {
        // Second box sits 10px lower but still belongs to the first row
        let boxes = [square(100, 10, 40), square(0, 0, 40), square(50, 80, 40)];
        let order = reading_order(&boxes, DEFAULT_ROW_TOLERANCE);
        assert_eq!(order, vec![1, 0, 2]);
    }

    #[test]
    fn test_mean_excludes_candidate() {
        // Centers at 10, 25, 40. Against a mean of 10 the second box (height 30,
        // tolerance 18) joins; the row mean becomes 17.5, so the third box with
        // deviation 22.5 starts a new row.
        let boxes = [
            Rect::new(0, 0, 10, 20),
            Rect::new(20, 10, 30, 40),
            Rect::new(40, 25, 50, 55),
        ];
        let order = reading_order(&boxes, DEFAULT_ROW_TOLERANCE);
        assert_eq!(order, vec![0, 1, 2]);

        // With the third box placed left of the others, it must still come last.
        let boxes = [
            Rect::new(20, 0, 30, 20),
            Rect::new(40, 10, 50, 40),
            Rect::new(0, 25, 10, 55),
        ];
        assert_eq!(reading_order(&boxes, DEFAULT_ROW_TOLERANCE), vec![0, 1, 2]);
    }

    #[test]
    fn test_deviation_equal_to_tolerance_starts_new_row() {
        // Candidate center deviates by exactly 0.5 * height
        let boxes = [Rect::new(10, 0, 20, 10), Rect::new(0, 5, 5, 15)];
        assert_eq!(reading_order(&boxes, 0.5), vec![0, 1]);
        assert_eq!(reading_order(&boxes, 0.6), vec![1, 0]);
    }

    #[test]
    fn test_empty() {
        assert!(reading_order(&[], DEFAULT_ROW_TOLERANCE).is_empty());
    }

    fn arb_rect() -> impl Strategy<Value = Rect> {
        (0..400u32, 0..400u32, 1..60u32, 1..60u32)
            .prop_map(|(x, y, w, h)| Rect::new(x, y, x + w, y + h))
    }

    proptest! {
        #[test]
        fn prop_reading_order_is_permutation(
            boxes in prop::collection::vec(arb_rect(), 0..40),
            tolerance in 0.0..2.0f64,
        ) {
            let mut order = reading_order(&boxes, tolerance);
            prop_assert_eq!(order.len(), boxes.len());
            order.sort_unstable();
            prop_assert_eq!(order, (0..boxes.len()).collect::<Vec<_>>());
        }

        #[test]
        fn prop_rows_respect_tolerance(
            boxes in prop::collection::vec(arb_rect(), 1..40),
            tolerance in 0.0..2.0f64,
        ) {
            let rows = reading_rows(&boxes, tolerance);
            let flat: Vec<usize> = rows.iter().flatten().copied().collect();
            prop_assert_eq!(&flat, &reading_order(&boxes, tolerance));

            let mut prev_mean: Option<f64> = None;
            let mut prev_max_cy = f64::NEG_INFINITY;
            for row in &rows {
                prop_assert!(!row.is_empty());
                for pair in row.windows(2) {
                    prop_assert!(boxes[pair[0]].center_x() <= boxes[pair[1]].center_x());
                }

                // Replay the row in visiting order: by center-y, then by index
                let mut by_y = row.clone();
                by_y.sort_by(|&a, &b| {
                    boxes[a].center_y().total_cmp(&boxes[b].center_y()).then(a.cmp(&b))
                });

                let first = &boxes[by_y[0]];
                prop_assert!(first.center_y() >= prev_max_cy);
                if let Some(mean) = prev_mean {
                    prop_assert!(
                        first.center_y() - mean >= tolerance * f64::from(first.height())
                    );
                }

                let mut sum = 0.0;
                for (n, &idx) in by_y.iter().enumerate() {
                    let cy = boxes[idx].center_y();
                    if n > 0 {
                        let mean = sum / n as f64;
                        prop_assert!(
                            (cy - mean).abs() < tolerance * f64::from(boxes[idx].height())
                        );
                    }
                    sum += cy;
                }
                prev_mean = Some(sum / by_y.len() as f64);
                prev_max_cy = boxes[by_y[by_y.len() - 1]].center_y();
            }
        }
    }
}
