//! Stride-aware RGBA image view for zero-copy ingestion.

/// Bytes per RGBA8 pixel.
pub const CHANNELS: usize = 4;

/// A view into an RGBA8 buffer with explicit stride support.
/// `stride` is measured in bytes, so rows may carry alignment padding.
#[derive(Clone, Copy, Debug)]
pub struct RgbaView<'a> {
    /// Raw interleaved RGBA bytes.
    pub data: &'a [u8],
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
    /// Distance between row starts, in bytes.
    pub stride: usize,
}

impl<'a> RgbaView<'a> {
    /// Create a new view after validating that the buffer size matches the dimensions and stride.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> Result<Self, String> {
        let row_bytes = width * CHANNELS;
        if stride < row_bytes {
            return Err(format!(
                "Stride ({stride}) cannot be less than width * 4 ({row_bytes})"
            ));
        }
        let required_size = if height > 0 {
            (height - 1) * stride + row_bytes
        } else {
            0
        };
        if data.len() < required_size {
            return Err(format!(
                "Buffer size ({}) is too small for {}x{} RGBA image with stride {} (required: {})",
                data.len(),
                width,
                height,
                stride,
                required_size
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// View over a tightly packed buffer (`stride == width * 4`).
    pub fn packed(data: &'a [u8], width: usize, height: usize) -> Result<Self, String> {
        Self::new(data, width, height, width * CHANNELS)
    }

    /// Safe accessor for a specific row, without padding.
    #[inline(always)]
    #[must_use]
    pub fn get_row(&self, y: usize) -> &'a [u8] {
        assert!(y < self.height, "Row index {y} out of bounds");
        let start = y * self.stride;
        &self.data[start..start + self.width * CHANNELS]
    }

    /// Safe accessor for a specific pixel.
    #[inline(always)]
    #[must_use]
    pub fn get_pixel(&self, x: usize, y: usize) -> [u8; 4] {
        assert!(x < self.width, "Column index {x} out of bounds");
        let row = self.get_row(y);
        let i = x * CHANNELS;
        [row[i], row[i + 1], row[i + 2], row[i + 3]]
    }
}
