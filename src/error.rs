//! Error types for the live preview core

use thiserror::Error;

/// Result type alias for preview operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while uploading, rendering or capturing a preview
#[derive(Error, Debug)]
pub enum Error {
    /// The upload coordinator rejected or failed to publish the markup.
    /// Retryable: the shape stays in the loading state.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// No live frame is registered for the shape at capture time
    #[error("Capture target not found: {0}")]
    CaptureTargetMissing(String),

    /// No matching reply arrived before the capture deadline
    #[error("Capture timed out after {0}ms")]
    CaptureTimeout(u64),

    /// The inbound message bus went away while a capture was waiting
    #[error("Capture message channel closed")]
    CaptureChannelClosed,

    /// Width or height was not a finite, positive number
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: f64, height: f64 },

    /// The editor has no shape with this identity
    #[error("Shape not found: {0}")]
    ShapeNotFound(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a later attempt may succeed without any change on the caller's side.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::UploadFailed(_) | Error::CaptureTimeout(_))
    }
}
