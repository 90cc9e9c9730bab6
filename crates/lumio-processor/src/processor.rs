//! The UI-facing processor.

use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use lumio_core::{encode_data_uri, Adjustments, DecodedImage, RawDecoder, RawMetadata};

use crate::events::ProcessorEvent;
use crate::task::{DecodePlan, DecodeWorker, Shared};
use crate::{PreviewSize, ProcessorConfig, ProcessorError};

const THUMBNAIL_FALLBACK_NOTICE: &str = "Using preview instead of thumbnail";

/// Strip a `file://` URL prefix, leaving a local path.
///
/// `file:///C:/x` becomes `C:/x`; `file:///home/x` stays absolute.
pub fn local_path(path: &str) -> &str {
    let Some(rest) = path.strip_prefix("file://") else {
        return path;
    };
    match rest.strip_prefix('/') {
        Some(drive) if has_drive_letter(drive) => drive,
        _ => rest,
    }
}

fn has_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Stateful wrapper around a [`RawDecoder`] for UI bindings.
///
/// Synchronous operations return a `Result` and also record any error as
/// [`last_error`](Self::last_error). Background decodes report through
/// [`ProcessorEvent`]s; at most one runs at a time and starting another
/// cancels the previous one.
#[derive(Debug)]
pub struct RawProcessor {
    decoder: RawDecoder,
    config: ProcessorConfig,
    current_file: String,
    shared: Arc<Shared>,
    worker: DecodeWorker,
}

impl Default for RawProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl RawProcessor {
    pub fn new() -> Self {
        Self::build(ProcessorConfig::default())
    }

    pub fn with_config(config: ProcessorConfig) -> Result<Self, ProcessorError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ProcessorConfig) -> Self {
        Self {
            decoder: RawDecoder::new(),
            config,
            current_file: String::new(),
            shared: Arc::new(Shared::default()),
            worker: DecodeWorker::default(),
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Receive every event emitted from now on.
    pub fn subscribe(&self) -> Receiver<ProcessorEvent> {
        self.shared.events.subscribe()
    }

    /// Local path of the open file, empty when none is open.
    pub fn current_file(&self) -> &str {
        &self.current_file
    }

    pub fn file_open(&self) -> bool {
        self.decoder.is_open()
    }

    pub fn is_file_open(&self) -> bool {
        self.file_open()
    }

    pub fn is_decoding(&self) -> bool {
        self.shared.is_decoding()
    }

    pub fn last_error(&self) -> String {
        self.shared.last_error()
    }

    /// Open a file by path or `file://` URL, closing any open file first.
    pub fn open_file(&mut self, path: &str) -> bool {
        self.close();

        let local = local_path(path);
        if !Path::new(local).exists() {
            self.fail(ProcessorError::FileNotFound(local.to_string()));
            return false;
        }

        match self.decoder.open(local) {
            Ok(()) => {
                self.current_file = local.to_string();
                self.shared.clear_last_error();
                self.shared.events.emit(ProcessorEvent::FileChanged);
                true
            }
            Err(e) => {
                self.fail(e.into());
                false
            }
        }
    }

    /// Cancel any background decode and close the open file.
    pub fn close(&mut self) {
        self.cancel_decode();

        if self.decoder.is_open() {
            self.decoder.close();
            self.current_file.clear();
            self.shared.events.emit(ProcessorEvent::FileChanged);
        }
    }

    pub fn metadata(&self) -> Option<RawMetadata> {
        let metadata = self.decoder.metadata().cloned();
        if metadata.is_none() {
            self.shared
                .set_last_error(ProcessorError::NoFileOpened.to_string());
        }
        metadata
    }

    /// Develop at the configured default preview size.
    pub fn decode_image(&self) -> Result<DecodedImage, ProcessorError> {
        self.decode_preview(self.config.default_preview)
    }

    pub fn decode_quick_preview(&self) -> Result<DecodedImage, ProcessorError> {
        self.decode_preview(self.config.quick_preview)
    }

    pub fn decode_medium_preview(&self) -> Result<DecodedImage, ProcessorError> {
        self.decode_preview(self.config.medium_preview)
    }

    /// Develop into an arbitrary box with the current adjustments.
    pub fn decode_preview(&self, size: PreviewSize) -> Result<DecodedImage, ProcessorError> {
        self.record(self.develop(size))
    }

    /// [`decode_image`](Self::decode_image) as a JPEG data URI.
    pub fn preview_base64(&self) -> Result<String, ProcessorError> {
        let image = self.decode_image()?;
        self.record(self.to_uri(&image))
    }

    /// The embedded preview, or a small develop when the file has none.
    pub fn thumbnail(&self) -> Result<DecodedImage, ProcessorError> {
        if !self.decoder.is_open() {
            return self.record(Err(ProcessorError::NoFileOpened));
        }

        match self.decoder.thumbnail() {
            Ok(image) => {
                self.shared.clear_last_error();
                Ok(image)
            }
            Err(e) => {
                tracing::debug!("No usable embedded thumbnail: {}", e);
                self.shared.set_last_error(THUMBNAIL_FALLBACK_NOTICE);
                self.record(self.develop(self.config.thumbnail_fallback))
            }
        }
    }

    pub fn thumbnail_base64(&self) -> Result<String, ProcessorError> {
        let image = self.thumbnail()?;
        self.record(self.to_uri(&image))
    }

    /// Develop `max_width x max_height` on a background thread.
    ///
    /// The result arrives as [`ProcessorEvent::DecodeFinished`] or
    /// [`ProcessorEvent::DecodeFailed`].
    pub fn decode_async(&mut self, max_width: u32, max_height: u32) {
        self.start(DecodePlan::Single(PreviewSize::new(max_width, max_height)));
    }

    /// Develop at each configured stage in turn on a background thread.
    pub fn decode_progressive(&mut self) {
        self.start(DecodePlan::Progressive(self.config.progressive_stages.clone()));
    }

    /// Stop the background decode, if any, and wait for it to exit.
    pub fn cancel_decode(&mut self) {
        self.worker.cancel(&self.shared);
        self.shared.set_decoding(false);
    }

    /// Set the adjustments used by every later develop.
    pub fn set_adjustments(
        &mut self,
        exposure: f32,
        contrast: f32,
        highlights: f32,
        shadows: f32,
        saturation: f32,
        temperature: f32,
    ) {
        self.decoder.set_adjustments(Adjustments {
            exposure,
            contrast,
            highlights,
            shadows,
            saturation,
            temperature,
        });
    }

    pub fn adjustments(&self) -> Adjustments {
        self.decoder.adjustments()
    }

    /// Restart a background decode at the default size with the current adjustments.
    pub fn redecode_with_adjustments(&mut self) {
        let size = self.config.default_preview;
        self.decode_async(size.width, size.height);
    }

    fn start(&mut self, plan: DecodePlan) {
        let job = match self.decoder.job() {
            Ok(job) => job,
            Err(_) => {
                self.shared.fail(ProcessorError::NoFileOpened.to_string());
                return;
            }
        };

        self.cancel_decode();
        self.shared.set_decoding(true);
        self.worker
            .start(job, plan, self.config.jpeg_quality, &self.shared);
    }

    fn develop(&self, size: PreviewSize) -> Result<DecodedImage, ProcessorError> {
        if !self.decoder.is_open() {
            return Err(ProcessorError::NoFileOpened);
        }
        Ok(self.decoder.decode_preview(size.width, size.height)?)
    }

    fn to_uri(&self, image: &DecodedImage) -> Result<String, ProcessorError> {
        Ok(encode_data_uri(image, self.config.jpeg_quality)?)
    }

    fn record<T>(&self, result: Result<T, ProcessorError>) -> Result<T, ProcessorError> {
        if let Err(e) = &result {
            tracing::warn!("{}", e);
            self.shared.set_last_error(e.to_string());
        }
        result
    }

    fn fail(&self, err: ProcessorError) {
        tracing::warn!("{}", err);
        self.shared.set_last_error(err.to_string());
    }
}

impl Drop for RawProcessor {
    fn drop(&mut self) {
        self.close();
    }
}
