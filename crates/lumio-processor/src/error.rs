use lumio_core::{DecodeError, EncodeError};
use thiserror::Error;

/// Errors surfaced by [`crate::RawProcessor`].
///
/// The display string of every error that escapes a processor operation is
/// also stored as the processor's last error.
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("No file opened")]
    NoFileOpened,

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
