//! Processor configuration loaded from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ProcessorError;

/// A `width x height` bounding box for a develop. Zero leaves an axis unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSize {
    pub width: u32,
    pub height: u32,
}

impl PreviewSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for PreviewSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Sizes and encoder settings used by [`crate::RawProcessor`].
///
/// Every field is optional in the JSON form; missing fields take the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// JPEG quality for data URIs (1-100)
    pub jpeg_quality: u8,
    /// Size used by `decode_image` and `redecode_with_adjustments`
    pub default_preview: PreviewSize,
    pub quick_preview: PreviewSize,
    pub medium_preview: PreviewSize,
    /// Size developed when the file has no usable embedded thumbnail
    pub thumbnail_fallback: PreviewSize,
    /// Stages of a progressive decode, smallest first
    pub progressive_stages: Vec<PreviewSize>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            default_preview: PreviewSize::new(1920, 1080),
            quick_preview: PreviewSize::new(320, 240),
            medium_preview: PreviewSize::new(1280, 720),
            thumbnail_fallback: PreviewSize::new(640, 480),
            progressive_stages: vec![
                PreviewSize::new(320, 240),
                PreviewSize::new(1280, 720),
                PreviewSize::new(1920, 1080),
            ],
        }
    }
}

impl ProcessorConfig {
    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ProcessorError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ProcessorError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ProcessorError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ProcessorError::Config(format!("failed to parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ProcessorError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ProcessorError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.progressive_stages.is_empty() {
            return Err(ProcessorError::Config(
                "progressive_stages must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
