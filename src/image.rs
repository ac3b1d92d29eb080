//! Pixel-grid type shared by the frame encoder and decoder.

/// An RGBA pixel grid.
///
/// This is the image boundary of the codec: the frame encoder emits one
/// of these per chunk and the frame decoder consumes one per still. All
/// grids produced within one encoding run have identical dimensions.
#[derive(Clone)]
pub struct ImageData {
    /// RGBA bytes, row-major, 4 bytes per pixel.
    data: Vec<u8>,
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
}

impl ImageData {
    /// Creates a new image from raw RGBA bytes.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            data,
            width,
            height,
        }
    }

    /// Returns a reference to the raw RGBA bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Validates that the buffer size matches the dimensions.
    pub fn is_valid(&self) -> bool {
        self.data.len() == self.pixel_count() * 4
    }

    /// Consumes the image and returns the raw RGBA buffer.
    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    /// Converts the image to an 8-bit grayscale buffer using ITU-R BT.601
    /// luminance weights (0.299 R + 0.587 G + 0.114 B), in integer form
    /// `(77 R + 150 G + 29 B) >> 8`.
    ///
    /// This recovers contrast lost to lossy video compression before
    /// binarization and detection.
    pub fn to_grayscale(&self) -> Vec<u8> {
        let len = self.pixel_count();
        let mut gray = Vec::with_capacity(len);
        for i in 0..len {
            let base = i * 4;
            let r = self.data[base] as u32;
            let g = self.data[base + 1] as u32;
            let b = self.data[base + 2] as u32;
            gray.push(((77 * r + 150 * g + 29 * b) >> 8) as u8);
        }
        gray
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rgba_bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_creation() {
        let img = ImageData::new(vec![0u8; 64 * 48 * 4], 64, 48);

        assert_eq!(img.width(), 64);
        assert_eq!(img.height(), 48);
        assert!(img.is_valid());
    }

    #[test]
    fn test_image_invalid_size() {
        let img = ImageData::new(vec![0u8; 100], 64, 48);
        assert!(!img.is_valid());
    }

    #[test]
    fn test_grayscale_pure_gray() {
        // Pure gray pixels map to themselves: (77+150+29)*v >> 8 == v
        let img = ImageData::new(vec![128, 128, 128, 255, 64, 64, 64, 255], 2, 1);
        let gray = img.to_grayscale();
        assert_eq!(gray, vec![128, 64]);
    }

    #[test]
    fn test_grayscale_black_and_white() {
        let img = ImageData::new(vec![0, 0, 0, 255, 255, 255, 255, 255], 2, 1);
        let gray = img.to_grayscale();
        assert_eq!(gray[0], 0);
        assert!(gray[1] >= 254, "white luminance was {}", gray[1]);
    }
}
