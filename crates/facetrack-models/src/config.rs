//! Tracker configuration and tuning.
//!
//! [`TrackerConfig`] holds the user-facing switches sent by the host
//! runtime; [`TrackerTuning`] holds the fixed constants the scheduler is
//! tuned with. Both are immutable for the lifetime of one scheduler.

use crate::observation::RectangleObservation;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while decoding or validating configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Invalid configuration message: {0}")]
    InvalidMessage(String),

    #[error("{field} must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Feature switches for one tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// Re-seed the short-horizon tracker whenever a full detection disagrees with it
    pub retrack_periodically: bool,

    /// Smooth the reported box with the low-pass filter
    pub apply_low_pass_filter: bool,

    /// Run the landmark lane for mouth state
    pub detect_landmarks: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            retrack_periodically: true,
            apply_low_pass_filter: false,
            detect_landmarks: true,
        }
    }
}

impl TrackerConfig {
    /// Decode a configuration message from the host transport.
    ///
    /// All three switches must be present.
    pub fn from_message(value: &serde_json::Value) -> Result<Self, ConfigError> {
        Self::deserialize(value).map_err(|e| ConfigError::InvalidMessage(e.to_string()))
    }

    /// Encode the configuration for the host transport.
    pub fn to_message(&self) -> serde_json::Value {
        // three bools always serialize
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            retrack_periodically: env_flag("FACETRACK_RETRACK_PERIODICALLY")
                .unwrap_or(defaults.retrack_periodically),
            apply_low_pass_filter: env_flag("FACETRACK_LOW_PASS_FILTER")
                .unwrap_or(defaults.apply_low_pass_filter),
            detect_landmarks: env_flag("FACETRACK_DETECT_LANDMARKS")
                .unwrap_or(defaults.detect_landmarks),
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().and_then(|s| parse_flag(&s))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Fixed tuning constants for the detection scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerTuning {
    /// Tracked regions at or below this confidence are discarded (default: 0.3)
    pub minimum_confidence: f32,

    /// How strongly the reported box resists change when filtering (default: 0.75)
    pub low_pass_resistance: f64,

    /// Minimum time between full detections while a track is active.
    /// Zero re-detects whenever the rectangle lane is free.
    pub accurate_retrack_interval: Duration,

    /// Minimum time between landmark passes (default: 50ms)
    pub landmark_retrack_interval: Duration,
}

impl Default for TrackerTuning {
    fn default() -> Self {
        Self {
            minimum_confidence: 0.3,
            low_pass_resistance: 0.75,
            accurate_retrack_interval: Duration::ZERO,
            landmark_retrack_interval: Duration::from_millis(50),
        }
    }
}

impl TrackerTuning {
    /// Check that ratios are within `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let confidence = self.minimum_confidence as f64;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(ConfigError::OutOfRange {
                field: "minimum_confidence",
                value: confidence,
            });
        }
        if !(0.0..=1.0).contains(&self.low_pass_resistance) {
            return Err(ConfigError::OutOfRange {
                field: "low_pass_resistance",
                value: self.low_pass_resistance,
            });
        }
        Ok(())
    }

    /// Interpolation factor applied when reconciling a new observation.
    pub fn smoothing_factor(&self, config: &TrackerConfig) -> f64 {
        if config.apply_low_pass_filter {
            1.0 - self.low_pass_resistance
        } else {
            1.0
        }
    }

    /// Whether a tracked region is confident enough to keep.
    #[inline]
    pub fn accepts(&self, confidence: f32) -> bool {
        confidence > self.minimum_confidence
    }
}

/// Decide whether a full detection should re-seed the tracking handle.
///
/// Re-seeds when either side is missing, or when periodic retracking is on
/// and the detection moved more than a small step away from the current
/// observation.
pub fn should_reset(
    current: Option<&RectangleObservation>,
    detected: Option<&RectangleObservation>,
    config: &TrackerConfig,
) -> bool {
    match (current, detected) {
        (Some(current), Some(detected)) => {
            config.retrack_periodically && detected.is_distant(current)
        }
        _ => true,
    }
}
