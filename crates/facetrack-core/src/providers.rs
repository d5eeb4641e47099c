//! Provider traits for the detection backends.
//!
//! These traits give the scheduler a uniform interface over whatever
//! platform detector, tracker and landmark model is available. All calls
//! are synchronous and may be expensive; the scheduler decides which lane
//! they run on.

use facetrack_models::{DetectedRegion, FaceLandmarks};
use std::sync::Arc;

use crate::error::TrackResult;
use crate::frame::Frame;

/// Full-frame face detection (slow path).
pub trait FaceRectangleDetector: Send + Sync {
    /// Detect faces in a frame, most prominent first.
    fn detect_faces(&self, frame: &Frame) -> TrackResult<Vec<DetectedRegion>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Short-horizon object tracking (fast path).
pub trait ObjectTracker: Send + Sync {
    /// Seed a new track from a full detection.
    fn start_track(&self, frame: &Frame, seed: &DetectedRegion) -> Box<dyn TrackingHandle>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// An active track seeded by a full detection.
pub trait TrackingHandle: Send {
    /// Advance the track by one frame.
    ///
    /// `Ok(None)` means the tracker lost the subject.
    fn track(&mut self, frame: &Frame) -> TrackResult<Option<DetectedRegion>>;

    /// Replace the region the next `track` call searches around.
    fn set_reference(&mut self, region: DetectedRegion);

    /// Mark the track terminal. Further `track` calls should report nothing.
    fn finish(&mut self);

    /// Whether `finish` has been called.
    fn is_finished(&self) -> bool;
}

/// Facial landmark detection (landmark lane).
pub trait FaceLandmarkDetector: Send + Sync {
    /// Detect landmarks for the face found at `face`.
    fn detect_landmarks(&self, frame: &Frame, face: &DetectedRegion) -> TrackResult<Vec<FaceLandmarks>>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// The set of backends one scheduler runs against.
#[derive(Clone)]
pub struct Detectors {
    pub rectangles: Arc<dyn FaceRectangleDetector>,
    pub tracker: Arc<dyn ObjectTracker>,
    pub landmarks: Arc<dyn FaceLandmarkDetector>,
}

impl Detectors {
    /// Bundle the three backends.
    pub fn new(
        rectangles: Arc<dyn FaceRectangleDetector>,
        tracker: Arc<dyn ObjectTracker>,
        landmarks: Arc<dyn FaceLandmarkDetector>,
    ) -> Self {
        Self {
            rectangles,
            tracker,
            landmarks,
        }
    }
}
