//! Error types for m4amux

use thiserror::Error;

/// Result type alias for muxing operations
pub type Result<T> = std::result::Result<T, MuxError>;

/// Everything that can go wrong while producing an MP4 audio file.
#[derive(Error, Debug)]
pub enum MuxError {
    /// Write, seek or flush against the output sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The atom descriptor is malformed. Indicates an authoring bug, not bad input.
    #[error("Descriptor error at node {index}: {reason}")]
    Descriptor { index: usize, reason: String },

    /// An operation was called out of order.
    #[error("Invalid state: {0}")]
    State(String),

    /// The frame-size table could not grow.
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Session parameters that the container cannot express.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The external AAC encoder failed.
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MuxError {
    pub fn state<S: Into<String>>(msg: S) -> Self {
        MuxError::State(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        MuxError::InvalidConfig(msg.into())
    }

    pub fn encoder<S: Into<String>>(msg: S) -> Self {
        MuxError::Encoder(msg.into())
    }

    pub fn descriptor<S: Into<String>>(index: usize, reason: S) -> Self {
        MuxError::Descriptor {
            index,
            reason: reason.into(),
        }
    }
}
