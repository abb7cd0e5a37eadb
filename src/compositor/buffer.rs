//! RGBA8 pixel buffers

use std::path::Path;

/// Opaque black, what `background(0)` paints
pub const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];

/// Errors from pixel buffer construction and export
#[derive(Debug)]
pub enum BufferError {
    /// Raw data length does not match `width * height * 4`
    SizeMismatch { expected: usize, actual: usize },
    /// Image encoding failed
    Encode(image::ImageError),
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::SizeMismatch { expected, actual } => {
                write!(f, "pixel data size mismatch: expected {} bytes, got {}", expected, actual)
            }
            BufferError::Encode(e) => write!(f, "image encode error: {}", e),
        }
    }
}

impl std::error::Error for BufferError {}

/// RGBA8 byte length for the given dimensions, computed without `u32` overflow
fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// Row-major, non-premultiplied RGBA8 pixel buffer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    /// Create a transparent black buffer. Zero dimensions are clamped to 1.
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            data: vec![0; byte_len(width, height)],
            width,
            height,
        }
    }

    /// Create a buffer filled with a single color
    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        let mut buffer = Self::new(width, height);
        buffer.fill(color);
        buffer
    }

    /// Wrap existing RGBA data
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, BufferError> {
        let expected = byte_len(width, height);
        if width == 0 || height == 0 || data.len() != expected {
            return Err(BufferError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of pixels
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw RGBA bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw RGBA bytes
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Paint every pixel with `color`
    pub fn fill(&mut self, color: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&color);
        }
    }

    /// Get the pixel at (x, y), or `None` when out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = self.offset(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.data[idx..idx + 4]);
        Some(px)
    }

    /// Set the pixel at (x, y). Out-of-bounds writes are ignored.
    pub fn put_pixel(&mut self, x: u32, y: u32, color: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.offset(x, y);
        self.data[idx..idx + 4].copy_from_slice(&color);
    }

    /// Byte offset of pixel (x, y)
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Reallocate to a new size. Existing content is discarded.
    pub fn resize(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    /// Copy into an `image` buffer for encoding
    pub fn to_image(&self) -> image::RgbaImage {
        // Dimensions and length are kept consistent by construction
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| image::RgbaImage::new(self.width, self.height))
    }

    /// Encode as PNG at `path`
    pub fn save_png(&self, path: &Path) -> Result<(), BufferError> {
        self.to_image()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(BufferError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent() {
        let buffer = PixelBuffer::new(4, 3);
        assert_eq!(buffer.len(), 12);
        assert_eq!(buffer.as_bytes().len(), 48);
        assert_eq!(buffer.pixel(3, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_zero_size_clamped() {
        let buffer = PixelBuffer::new(0, 0);
        assert_eq!(buffer.width(), 1);
        assert_eq!(buffer.height(), 1);
    }

    #[test]
    fn test_fill_and_put_pixel() {
        let mut buffer = PixelBuffer::filled(2, 2, OPAQUE_BLACK);
        assert_eq!(buffer.pixel(1, 1), Some(OPAQUE_BLACK));

        buffer.put_pixel(1, 0, [10, 20, 30, 40]);
        assert_eq!(buffer.pixel(1, 0), Some([10, 20, 30, 40]));

        // Out of bounds is a no-op
        buffer.put_pixel(5, 5, [1, 1, 1, 1]);
        assert_eq!(buffer.pixel(5, 5), None);
    }

    #[test]
    fn test_from_rgba_validates_length() {
        assert!(PixelBuffer::from_rgba(2, 2, vec![0; 16]).is_ok());
        let err = PixelBuffer::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, BufferError::SizeMismatch { expected: 16, actual: 15 }));
    }

    #[test]
    fn test_sizes_beyond_u32_range() {
        // 70000 x 70000 x 4 does not fit in a u32
        assert_eq!(byte_len(70_000, 70_000), 19_600_000_000usize);
        assert_eq!(byte_len(1, 1), 4);
    }

    #[test]
    fn test_pixel_offsets() {
        let mut buffer = PixelBuffer::new(3, 2);
        buffer.put_pixel(2, 1, [1, 2, 3, 4]);
        assert_eq!(buffer.offset(2, 1), 20);
        assert_eq!(&buffer.as_bytes()[20..24], &[1, 2, 3, 4]);
        assert_eq!(buffer.len(), 6);
    }

    #[test]
    fn test_resize_discards_content() {
        let mut buffer = PixelBuffer::filled(2, 2, [255; 4]);
        buffer.resize(3, 1);
        assert_eq!(buffer.width(), 3);
        assert_eq!(buffer.height(), 1);
        assert_eq!(buffer.pixel(0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_save_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let buffer = PixelBuffer::filled(8, 6, [200, 100, 50, 255]);
        buffer.save_png(&path).unwrap();

        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded.dimensions(), (8, 6));
        assert_eq!(loaded.get_pixel(7, 5).0, [200, 100, 50, 255]);
    }
}
