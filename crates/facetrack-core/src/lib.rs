#![deny(unreachable_patterns)]
//! Real-time face tracking pipeline.
//!
//! This crate provides:
//! - A detection scheduler that keeps a cheap per-frame track alive and
//!   refreshes it with rate-limited full detections on a background lane
//! - Mouth state from a second, independently rate-limited landmark lane
//! - Low-pass smoothing of the reported face region
//! - A drop-late ingestion lane and a session type with safe teardown
//!
//! Detection backends plug in through the traits in [`providers`];
//! consumers receive observations through an [`ObservationSink`].

pub mod error;
pub mod executor;
pub mod frame;
pub mod lane;
pub mod providers;
pub mod scheduler;
pub mod session;
pub mod sink;

pub use error::{TrackResult, TrackerError};
pub use executor::{BlockingExecutor, LaneExecutor, LaneJob, ManualExecutor};
pub use frame::{CameraIntrinsics, Frame};
pub use lane::{Lane, LaneGuard, LaneStatus};
pub use providers::{
    Detectors, FaceLandmarkDetector, FaceRectangleDetector, ObjectTracker, TrackingHandle,
};
pub use scheduler::{DetectionScheduler, SchedulerStats, LANDMARK_LANE, RECTANGLE_LANE};
pub use session::{FaceTracker, FrameIngest, FrameSource};
pub use sink::{ChannelSink, ObservationSink, RecordingSink, TrackerEvent};

// Model re-exports so backends only need this crate
pub use facetrack_models::{
    BoundingBox, BoxOrigin, DetectedRegion, Delta, FaceLandmarks, LipsObservation, Point,
    RectangleObservation, TrackerConfig, TrackerTuning,
};
