//! # Error Types
//!
//! This module defines error types used throughout the dotline library.

use std::time::Duration;

use thiserror::Error;

/// Main error type for dotline operations
#[derive(Debug, Error)]
pub enum DotlineError {
    /// Serial port missing, busy, or rejecting the line settings
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Partial line grew past the framer's buffer
    #[error("Frame overflow: line exceeds {capacity} bytes")]
    FrameOverflow { capacity: usize },

    /// Numeric command argument does not fit the 3-digit field
    #[error("Encoding range error: {value} does not fit a 3-digit field")]
    EncodingRange { value: u32 },

    /// No acknowledgment within the configured bound
    #[error("Timeout: no acknowledgment for {command:?} after {waited:?}")]
    Timeout { command: String, waited: Duration },

    /// Send aborted through a cancel handle
    #[error("Cancelled after {sent} acknowledged commands")]
    Cancelled { sent: usize },

    /// Invalid caller-supplied parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Malformed printer profile
    #[error("Profile error: {0}")]
    Profile(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for dotline operations
pub type Result<T> = std::result::Result<T, DotlineError>;
