// SPDX-License-Identifier: MIT OR Apache-2.0
//! Driver errors.

use framescript_scene::SceneError;
use framescript_timeline::TimelineError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single frame fetch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Packet shorter than its header
    #[error("Frame packet too short: {len} bytes")]
    TooShort {
        /// Received length
        len: usize,
    },

    /// Payload length does not match `width * height * 4`
    #[error("Frame {frame} payload is {actual} bytes, expected {expected} for {width}x{height}")]
    SizeMismatch {
        /// Frame index from the header
        frame: u32,
        /// Width from the header
        width: u32,
        /// Height from the header
        height: u32,
        /// Bytes required by the header
        expected: usize,
        /// Bytes received
        actual: usize,
    },

    /// A newer request for the same target replaced this one
    #[error("Request superseded by a newer one")]
    Superseded,

    /// The channel kept failing
    #[error("Frame channel unavailable after {attempts} attempts")]
    RetriesExhausted {
        /// Reconnect attempts made
        attempts: u32,
    },

    /// The channel dropped
    #[error("Frame channel error: {0}")]
    Channel(String),
}

/// Failures talking to the backend HTTP surface
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport or decode failure
    #[error("Backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status
    #[error("Backend returned {status} for {url}")]
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },
}

/// Top-level driver errors
#[derive(Debug, Error)]
pub enum DriverError {
    /// Bad render argument string
    #[error("Invalid render arguments: {0}")]
    InvalidArgs(String),

    /// Settings file could not be parsed or written
    #[error("Settings error in {path:?}: {message}")]
    Settings {
        /// Settings file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Scene authoring error
    #[error(transparent)]
    Scene(#[from] SceneError),

    /// Backend failure
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Frame fetch failure
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl From<TimelineError> for DriverError {
    fn from(err: TimelineError) -> Self {
        Self::Scene(SceneError::Timeline(err))
    }
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;
