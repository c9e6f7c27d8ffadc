//! Synthetic sprite sheets for tests and benchmarks.
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

use crate::image::{CHANNELS, RgbaView};
use rand::Rng;

/// An owned, tightly packed RGBA sheet.
#[derive(Clone, Debug)]
pub struct Sheet {
    /// RGBA8 pixels.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
}

impl Sheet {
    /// Borrow the sheet as a view.
    ///
    /// # Panics
    /// Never in practice: the builder always allocates `width * height * 4` bytes.
    #[allow(clippy::missing_panics_doc)]
    pub fn view(&self) -> RgbaView<'_> {
        RgbaView::packed(&self.data, self.width, self.height).expect("sheet buffer matches its size")
    }

    /// Pixel at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }
}

/// A builder for sheets made of simple painted shapes.
pub struct SheetBuilder {
    sheet: Sheet,
}

impl SheetBuilder {
    /// Fully transparent canvas.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            sheet: Sheet {
                data: vec![0u8; width * height * CHANNELS],
                width,
                height,
            },
        }
    }

    /// Fill the whole canvas with an opaque background color.
    pub fn with_background(mut self, rgb: [u8; 3]) -> Self {
        for px in self.sheet.data.chunks_exact_mut(CHANNELS) {
            px.copy_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
        }
        self
    }

    fn put(&mut self, x: usize, y: usize, color: [u8; 4]) {
        if x < self.sheet.width && y < self.sheet.height {
            let i = (y * self.sheet.width + x) * CHANNELS;
            self.sheet.data[i..i + CHANNELS].copy_from_slice(&color);
        }
    }

    /// Paint a filled `w × h` rectangle with its top-left corner at `(x, y)`.
    pub fn rect(mut self, x: usize, y: usize, w: usize, h: usize, color: [u8; 4]) -> Self {
        for py in y..y + h {
            for px in x..x + w {
                self.put(px, py, color);
            }
        }
        self
    }

    /// Paint a filled disc.
    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    pub fn disc(mut self, cx: usize, cy: usize, radius: usize, color: [u8; 4]) -> Self {
        let r = radius as isize;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    let (x, y) = (cx as isize + dx, cy as isize + dy);
                    if x >= 0 && y >= 0 {
                        self.put(x as usize, y as usize, color);
                    }
                }
            }
        }
        self
    }

    /// Scatter `count` isolated single pixels at random positions.
    pub fn speckle<R: Rng>(mut self, rng: &mut R, count: usize, color: [u8; 4]) -> Self {
        if self.sheet.width == 0 || self.sheet.height == 0 {
            return self;
        }
        for _ in 0..count {
            let x = rng.gen_range(0..self.sheet.width);
            let y = rng.gen_range(0..self.sheet.height);
            self.put(x, y, color);
        }
        self
    }

    /// Finish the sheet.
    pub fn build(self) -> Sheet {
        self.sheet
    }
}

/// A regular `cols × rows` grid of square sprites, `size` pixels wide with `gap` pixels between.
pub fn grid_sheet(cols: usize, rows: usize, size: usize, gap: usize) -> Sheet {
    let width = cols * (size + gap) + gap;
    let height = rows * (size + gap) + gap;
    let mut builder = SheetBuilder::new(width, height);
    for row in 0..rows {
        for col in 0..cols {
            let shade = ((row * cols + col) * 17 % 200) as u8 + 40;
            builder = builder.rect(
                gap + col * (size + gap),
                gap + row * (size + gap),
                size,
                size,
                [shade, 255 - shade, 128, 255],
            );
        }
    }
    builder.build()
}
