//! Lumio Core - RAW decoding session and preview encoding
//!
//! This crate wraps the external RAW decoders (`rawloader`, `imagepipe`) and the
//! `image` crate behind a small session type, [`RawDecoder`], and provides the
//! glue around it: the six tone adjustments applied to developed images,
//! embedded thumbnail extraction, and JPEG / data URI encoding.

pub mod adjustments;
pub mod decode;
pub mod decoder;
pub mod encode;

#[cfg(test)]
pub(crate) mod test_support;

pub use adjustments::apply_adjustments;
pub use decode::{DecodeError, DecodedImage, RawMetadata};
pub use decoder::{DecodeJob, RawDecoder};
pub use encode::{encode_data_uri, encode_jpeg, to_data_uri, EncodeError, JPEG_DATA_URI_PREFIX};

/// Tone and colour adjustments applied to every developed image.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Exposure adjustment (-2 to 2 stops)
    pub exposure: f32,
    /// Contrast (-50 to 50)
    pub contrast: f32,
    /// Highlights (-100 to 100)
    pub highlights: f32,
    /// Shadows (-100 to 100)
    pub shadows: f32,
    /// Saturation (-100 to 100)
    pub saturation: f32,
    /// White balance temperature (-100 to 100)
    pub temperature: f32,
}

impl Adjustments {
    pub const EXPOSURE_RANGE: (f32, f32) = (-2.0, 2.0);
    pub const CONTRAST_RANGE: (f32, f32) = (-50.0, 50.0);
    pub const SLIDER_RANGE: (f32, f32) = (-100.0, 100.0);

    /// Create a new Adjustments with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if all values are at their defaults
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Copy of these adjustments with every slider clamped to its range.
    pub fn clamped(&self) -> Self {
        let clamp = |v: f32, (lo, hi): (f32, f32)| if v.is_finite() { v.clamp(lo, hi) } else { 0.0 };
        Self {
            exposure: clamp(self.exposure, Self::EXPOSURE_RANGE),
            contrast: clamp(self.contrast, Self::CONTRAST_RANGE),
            highlights: clamp(self.highlights, Self::SLIDER_RANGE),
            shadows: clamp(self.shadows, Self::SLIDER_RANGE),
            saturation: clamp(self.saturation, Self::SLIDER_RANGE),
            temperature: clamp(self.temperature, Self::SLIDER_RANGE),
        }
    }
}
