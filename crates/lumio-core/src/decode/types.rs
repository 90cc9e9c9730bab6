//! Core types for image decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for decoding operations.
///
/// The display strings are what callers surface as the "last error".
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No file is open in the decoding session.
    #[error("No file opened")]
    NotOpen,

    /// Neither the RAW decoder nor the bitmap decoder accepted the file.
    #[error("Unsupported file: {0}")]
    Unsupported(String),

    /// The RAW developer failed to produce an image.
    #[error("Failed to develop RAW image: {0}")]
    Develop(String),

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The decoder returned an image with no pixels.
    #[error("Decoder returned an empty image")]
    EmptyImage,

    /// No embedded thumbnail found in the file.
    #[error("No embedded thumbnail found")]
    NoThumbnail,
}

/// Filter type for image resizing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    #[default]
    Normal = 1,
    FlipHorizontal = 2,
    Rotate180 = 3,
    FlipVertical = 4,
    /// Flip horizontal + rotate 270 CW.
    Transpose = 5,
    Rotate90CW = 6,
    /// Flip horizontal + rotate 90 CW.
    Transverse = 7,
    Rotate270CW = 8,
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

impl Orientation {
    /// Whether applying this orientation exchanges width and height.
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Orientation::Transpose
                | Orientation::Rotate90CW
                | Orientation::Transverse
                | Orientation::Rotate270CW
        )
    }

    /// Apply this orientation to a decoded bitmap.
    pub(crate) fn apply(self, img: image::DynamicImage) -> image::DynamicImage {
        match self {
            Orientation::Normal => img,
            Orientation::FlipHorizontal => img.fliph(),
            Orientation::Rotate180 => img.rotate180(),
            Orientation::FlipVertical => img.flipv(),
            Orientation::Transpose => img.rotate90().fliph(),
            Orientation::Rotate90CW => img.rotate90(),
            Orientation::Transverse => img.rotate270().fliph(),
            Orientation::Rotate270CW => img.rotate270(),
        }
    }
}

/// A decoded image with RGB pixel data owned by Lumio.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Create a new DecodedImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * 3,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Take ownership of an image::RgbImage's buffer.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            pixels: img.into_raw(),
        }
    }

    /// Copy into an image::RgbImage for further processing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation_from_u32() {
        assert_eq!(Orientation::from(1), Orientation::Normal);
        assert_eq!(Orientation::from(6), Orientation::Rotate90CW);
        assert_eq!(Orientation::from(99), Orientation::Normal);
    }

    #[test]
    fn test_orientation_swaps_dimensions() {
        let swapping: Vec<u32> = (1..=8)
            .filter(|&v| Orientation::from(v).swaps_dimensions())
            .collect();
        assert_eq!(swapping, vec![5, 6, 7, 8]);
    }

    #[test]
    fn test_orientation_apply_swaps_dimensions() {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(4, 2));
        let rotated = Orientation::Rotate90CW.apply(img.clone());
        assert_eq!((rotated.width(), rotated.height()), (2, 4));
        let flipped = Orientation::FlipHorizontal.apply(img);
        assert_eq!((flipped.width(), flipped.height()), (4, 2));
    }

    #[test]
    fn test_decoded_image_rgb_conversion() {
        let img = DecodedImage::new(2, 1, vec![1, 2, 3, 4, 5, 6]);
        let rgb = img.to_rgb_image().unwrap();
        assert_eq!(rgb.get_pixel(1, 0).0, [4, 5, 6]);
        assert_eq!(DecodedImage::from_rgb_image(rgb), img);
        assert_eq!(img.byte_size(), 6);
    }

    #[test]
    fn test_decoded_image_empty() {
        assert!(DecodedImage::new(0, 0, vec![]).is_empty());
    }

    #[test]
    fn test_decode_error_display() {
        assert_eq!(DecodeError::NotOpen.to_string(), "No file opened");
        let err = DecodeError::Unsupported("unknown camera".to_string());
        assert_eq!(err.to_string(), "Unsupported file: unknown camera");
    }
}
