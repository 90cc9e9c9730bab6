//! File metadata captured when a session is opened.

use exif::Tag;
use serde::{Deserialize, Serialize};

use super::exif_tags::ExifTags;

/// Metadata of an opened file.
///
/// Sensor fields come from the RAW decoder; shooting parameters come from
/// EXIF and are `None` when the tag is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetadata {
    pub camera_make: String,
    pub camera_model: String,
    pub software: Option<String>,
    /// Output width after the sensor crop (bitmaps: after EXIF orientation).
    pub image_width: u32,
    /// Output height after the sensor crop (bitmaps: after EXIF orientation).
    pub image_height: u32,
    pub raw_width: u32,
    pub raw_height: u32,
    pub iso: Option<u32>,
    /// Exposure time in seconds.
    pub shutter_speed: Option<f32>,
    /// Aperture as f-number.
    pub aperture: Option<f32>,
    /// Focal length in mm.
    pub focal_length: Option<f32>,
    /// DateTimeOriginal as unix seconds.
    pub timestamp: Option<i64>,
    /// As-shot white balance multipliers, normalised so green is 1.0.
    pub wb_red: f32,
    pub wb_green: f32,
    pub wb_blue: f32,
    pub lens_model: Option<String>,
    /// EXIF orientation (1-8).
    pub orientation: u16,
    pub is_raw: bool,
}

/// Sensor description reported by the RAW decoder.
#[derive(Debug, Clone, Default)]
pub(crate) struct SensorInfo {
    pub make: String,
    pub model: String,
    pub width: usize,
    pub height: usize,
    /// Crop in pixels: top, right, bottom, left.
    pub crops: [usize; 4],
    pub wb_coeffs: [f32; 4],
    pub orientation: u16,
}

impl SensorInfo {
    pub(crate) fn from_raw(raw: &rawloader::RawImage) -> Self {
        Self {
            make: raw.clean_make.clone(),
            model: raw.clean_model.clone(),
            width: raw.width,
            height: raw.height,
            crops: raw.crops,
            wb_coeffs: raw.wb_coeffs,
            orientation: raw.orientation.to_u16(),
        }
    }
}

impl RawMetadata {
    pub(crate) fn from_sensor(sensor: &SensorInfo, exif: Option<&ExifTags>) -> Self {
        let [top, right, bottom, left] = sensor.crops;
        let image_width = sensor.width.saturating_sub(left + right);
        let image_height = sensor.height.saturating_sub(top + bottom);
        let (wb_red, wb_green, wb_blue) = normalize_wb(sensor.wb_coeffs);

        let mut meta = Self {
            camera_make: sensor.make.clone(),
            camera_model: sensor.model.clone(),
            image_width: image_width as u32,
            image_height: image_height as u32,
            raw_width: sensor.width as u32,
            raw_height: sensor.height as u32,
            wb_red,
            wb_green,
            wb_blue,
            orientation: sensor.orientation.clamp(1, 8),
            is_raw: true,
            ..Default::default()
        };
        if let Some(exif) = exif {
            meta.fill_from_exif(exif);
        }
        meta
    }

    pub(crate) fn from_bitmap(width: u32, height: u32, exif: Option<&ExifTags>) -> Self {
        let mut meta = Self {
            image_width: width,
            image_height: height,
            raw_width: width,
            raw_height: height,
            wb_red: 1.0,
            wb_green: 1.0,
            wb_blue: 1.0,
            orientation: 1,
            is_raw: false,
            ..Default::default()
        };
        if let Some(exif) = exif {
            if let Some(make) = exif.string(Tag::Make) {
                meta.camera_make = make;
            }
            if let Some(model) = exif.string(Tag::Model) {
                meta.camera_model = model;
            }
            let orientation = exif.orientation();
            meta.orientation = orientation as u16;
            if orientation.swaps_dimensions() {
                // Report the size of the upright image that develop produces.
                std::mem::swap(&mut meta.image_width, &mut meta.image_height);
            }
            meta.fill_from_exif(exif);
        }
        meta
    }

    fn fill_from_exif(&mut self, exif: &ExifTags) {
        self.software = exif.string(Tag::Software);
        self.lens_model = exif.string(Tag::LensModel);
        self.iso = exif.uint(Tag::PhotographicSensitivity);
        self.shutter_speed = exif.rational(Tag::ExposureTime);
        self.aperture = exif.rational(Tag::FNumber);
        self.focal_length = exif.rational(Tag::FocalLength);
        self.timestamp = exif.timestamp();
    }
}

/// Divide the as-shot multipliers by green. Missing or invalid coefficients
/// yield a neutral balance.
fn normalize_wb(coeffs: [f32; 4]) -> (f32, f32, f32) {
    let [r, g, b, _] = coeffs;
    if !(g.is_finite() && g > 0.0 && r.is_finite() && b.is_finite()) {
        return (1.0, 1.0, 1.0);
    }
    (r / g, 1.0, b / g)
}
