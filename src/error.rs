//! Error types for the voice pipeline

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Audio device errors
#[derive(Error, Debug)]
pub enum AudioError {
    /// Device missing or permission to record denied
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Stream error: {0}")]
    StreamError(String),
}

/// PCM16 and container errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Malformed frame: {0} bytes is not a whole number of 16-bit samples")]
    MalformedFrame(usize),

    #[error("Container payload too large: {0} bytes")]
    ContainerTooLarge(usize),
}

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Playback engine errors
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// Engine refused a unit or container
    #[error("Playback rejected: {0}")]
    Rejected(String),

    #[error("Playback queue full")]
    QueueFull,

    #[error("Output unavailable: {0}")]
    OutputUnavailable(String),
}

/// Session control errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is not connected")]
    NotConnected,

    #[error("Session is already connected")]
    AlreadyConnected,
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
