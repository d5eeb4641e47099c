//! Shared data models for the face tracking pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Normalized geometry (boxes, points, origin conventions)
//! - Rectangle and lips observations with their smoothing rules
//! - Raw detector outputs
//! - Tracker configuration and tuning

pub mod config;
pub mod geometry;
pub mod observation;

// Re-export common types
pub use config::{should_reset, ConfigError, TrackerConfig, TrackerTuning};
pub use geometry::{BoundingBox, BoxOrigin, Point};
pub use observation::{
    DetectedRegion, Delta, FaceLandmarks, LipsObservation, RectangleObservation,
};
