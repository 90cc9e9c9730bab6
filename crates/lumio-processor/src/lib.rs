//! Lumio Processor - stateful front end over a [`lumio_core::RawDecoder`]
//!
//! [`RawProcessor`] is what a UI binds to: it tracks the open file, the last
//! error and whether a background decode is running, and reports changes as
//! [`ProcessorEvent`]s on channels handed out by [`RawProcessor::subscribe`].
//! Decoded previews leave the processor as `data:image/jpeg;base64,` URIs.

mod config;
mod error;
mod events;
mod processor;
mod task;

pub use config::{PreviewSize, ProcessorConfig};
pub use error::ProcessorError;
pub use events::ProcessorEvent;
pub use processor::{local_path, RawProcessor};

pub use lumio_core::{Adjustments, DecodedImage, RawMetadata};
