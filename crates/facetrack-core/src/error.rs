//! Error types for the tracking pipeline.

use facetrack_models::ConfigError;
use thiserror::Error;

/// Result type for tracking operations.
pub type TrackResult<T> = Result<T, TrackerError>;

/// Errors that can occur while running the tracking pipeline.
///
/// Detector-level variants never escape a detection job: the scheduler
/// logs them and downgrades them to "no observation".
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("No usable frame source")]
    InvalidInput,

    #[error("Frame output could not be attached: {0}")]
    InvalidOutput(String),

    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Detector panicked: {0}")]
    DetectorPanicked(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
