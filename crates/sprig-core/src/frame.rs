//! Cropping groups out of the source image.

use crate::cluster::Group;
use crate::image::{CHANNELS, RgbaView};
use crate::rect::Rect;
use crate::segmentation::LabelResult;

/// One extracted sprite.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Padded, clamped box in source coordinates.
    pub bbox: Rect,
    /// Index of the group this frame was cut from, before reading order was applied.
    pub group: usize,
    /// Width of `pixels` in pixels.
    pub width: usize,
    /// Height of `pixels` in pixels.
    pub height: usize,
    /// Tightly packed RGBA8 pixels.
    pub pixels: Vec<u8>,
}

/// Copy the pixels inside `bbox` into a packed RGBA buffer.
#[must_use]
pub fn crop(img: &RgbaView, bbox: Rect) -> Vec<u8> {
    let (x0, x1) = (bbox.left as usize, bbox.right as usize);
    let mut out = Vec::with_capacity(bbox.width() as usize * bbox.height() as usize * CHANNELS);
    for y in bbox.top as usize..bbox.bottom as usize {
        out.extend_from_slice(&img.get_row(y)[x0 * CHANNELS..x1 * CHANNELS]);
    }
    out
}

/// Extract one frame per group in the given order.
///
/// Without `labels` the padded box is copied verbatim. With `labels`, every pixel
/// whose label is not a member of the group gets alpha zero, so neighbors that
/// fall inside the padded box are cut away.
#[must_use]
pub fn extract_frames(
    img: &RgbaView,
    groups: &[Group],
    order: &[usize],
    padding: u32,
    labels: Option<&LabelResult>,
) -> Vec<Frame> {
    let (w, h) = (img.width as u32, img.height as u32);
    let mut membership = labels.map(|l| vec![false; l.components.len() + 1]);

    order
        .iter()
        .map(|&gi| {
            let group = &groups[gi];
            let bbox = group.bbox.pad_clamped(padding, w, h);
            let mut pixels = crop(img, bbox);

            if let (Some(labels), Some(member)) = (labels, membership.as_mut())
                && !bbox.is_empty()
            {
                member.fill(false);
                for &label in &group.members {
                    member[label as usize] = true;
                }
                let row_len = bbox.width() as usize;
                for (dy, row) in pixels.chunks_exact_mut(row_len * CHANNELS).enumerate() {
                    let y = bbox.top as usize + dy;
                    for (dx, px) in row.chunks_exact_mut(CHANNELS).enumerate() {
                        let label = labels.label_at(bbox.left as usize + dx, y);
                        if !member[label as usize] {
                            px[3] = 0;
                        }
                    }
                }
            }

            Frame {
                bbox,
                group: gi,
                width: bbox.width() as usize,
                height: bbox.height() as usize,
                pixels,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(width: usize, height: usize) -> Vec<u8> {
        let mut data = vec![0u8; width * height * CHANNELS];
        for (i, px) in data.chunks_exact_mut(CHANNELS).enumerate() {
            px[0] = (i % 251) as u8;
            px[3] = 255;
        }
        data
    }

    #[test]
    fn test_crop_respects_stride() {
        let data = canvas(6, 3);
        // View the left 4 columns of a 6-wide buffer
        let view = RgbaView::new(&data, 4, 3, 6 * CHANNELS).unwrap();
        let pixels = crop(&view, Rect::new(1, 1, 3, 3));
        assert_eq!(pixels.len(), 2 * 2 * CHANNELS);
        assert_eq!(pixels[0], 7);
        assert_eq!(pixels[2 * CHANNELS], 13);
    }

    #[test]
    fn test_unmasked_padding_is_clamped() {
        let data = canvas(10, 10);
        let view = RgbaView::packed(&data, 10, 10).unwrap();
        let groups = [Group::from_rect(Rect::new(1, 1, 9, 5))];
        let frames = extract_frames(&view, &groups, &[0], 3, None);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].bbox, Rect::new(0, 0, 10, 8));
        assert_eq!((frames[0].width, frames[0].height), (10, 8));
        assert!(frames[0].pixels.chunks_exact(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_masked_frames_drop_neighbors() {
        let data = canvas(4, 1);
        let view = RgbaView::packed(&data, 4, 1).unwrap();
        let labels = LabelResult {
            labels: vec![1, 1, 0, 2],
            width: 4,
            height: 1,
            components: vec![
                crate::segmentation::Component {
                    label: 1,
                    bbox: Rect::new(0, 0, 2, 1),
                    pixel_count: 2,
                    centroid: (0.5, 0.0),
                },
                crate::segmentation::Component {
                    label: 2,
                    bbox: Rect::new(3, 0, 4, 1),
                    pixel_count: 1,
                    centroid: (3.0, 0.0),
                },
            ],
        };
        let groups = [
            Group {
                bbox: Rect::new(0, 0, 2, 1),
                pixel_count: 2,
                members: vec![1],
            },
            Group {
                bbox: Rect::new(3, 0, 4, 1),
                pixel_count: 1,
                members: vec![2],
            },
        ];
        let frames = extract_frames(&view, &groups, &[1, 0], 2, Some(&labels));

        assert_eq!(frames[0].group, 1);
        assert_eq!(frames[0].bbox, Rect::new(1, 0, 4, 1));
        let alpha: Vec<u8> = frames[0].pixels.chunks_exact(4).map(|p| p[3]).collect();
        assert_eq!(alpha, vec![0, 0, 255]);

        assert_eq!(frames[1].bbox, Rect::new(0, 0, 4, 1));
        let alpha: Vec<u8> = frames[1].pixels.chunks_exact(4).map(|p| p[3]).collect();
        assert_eq!(alpha, vec![255, 255, 0, 0]);
        // Color channels are untouched
        assert_eq!(frames[1].pixels[3 * 4], 3);
    }
}
