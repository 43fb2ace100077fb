//! Unified error types for ltcgen

use thiserror::Error;

/// Main error type for ltcgen operations
#[derive(Error, Debug)]
pub enum LtcgenError {
    /// Configuration is invalid and could not be coerced into a usable state
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No output device is available on the default audio host
    #[error("no audio output device available")]
    NoOutputDevice,

    /// A named output device was requested but not found
    #[error("output device not found: {0}")]
    DeviceNotFound(String),

    /// The audio sink could not be opened or negotiated
    #[error("failed to open audio sink: {0}")]
    SinkOpen(String),

    /// A mid-stream write to the audio device failed
    #[error("audio stream write failed: {0}")]
    SinkWrite(String),
}

/// Result type alias for ltcgen operations
pub type Result<T> = std::result::Result<T, LtcgenError>;
