//! Detection scheduler: turns a frame stream into observation streams.
//!
//! # Lanes
//!
//! ```text
//! Frame ──▶ on_frame (ingestion lane, serial)
//!             │  fast path: advance tracking handle ──▶ reconcile ──▶ sink
//!             │
//!             └─▶ rectangle lane (one job, rate-limited)
//!                   full detection ──▶ reseed tracking handle
//!                        │
//!                        └─▶ landmark lane (one job, rate-limited)
//!                              landmarks ──▶ lips ──▶ sink
//! ```
//!
//! The rectangle lane lock guards the tracking state (`last_observation`
//! and the tracking handle) as well as the lane status, so the fast path
//! and the rectangle completion never interleave. The landmark lane lock
//! guards only its own status. The two locks are never held together.
//!
//! # Shutdown
//!
//! [`DetectionScheduler::shutdown`] sets a tombstone that every entry point
//! checks after taking its lane lock. Once `shutdown` returns the sink is
//! never called again, even by jobs that were already running.

use facetrack_models::{
    should_reset, DetectedRegion, LipsObservation, RectangleObservation, TrackerConfig,
    TrackerTuning,
};
use metrics::counter;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{TrackResult, TrackerError};
use crate::executor::LaneExecutor;
use crate::frame::Frame;
use crate::lane::Lane;
use crate::providers::{Detectors, TrackingHandle};
use crate::sink::ObservationSink;

/// Name of the full-detection lane.
pub const RECTANGLE_LANE: &str = "rectangle";

/// Name of the landmark lane.
pub const LANDMARK_LANE: &str = "landmark";

const INGESTION_LANE: &str = "ingestion";

/// State owned by the rectangle lane.
#[derive(Default)]
struct TrackingState {
    /// Most recent reconciled observation
    last_observation: Option<RectangleObservation>,
    /// Active short-horizon track; `None` forces a full detection
    object_request: Option<Box<dyn TrackingHandle>>,
}

impl TrackingState {
    /// Finish and drop the active tracking handle.
    fn discard_track(&mut self, lane: &'static str) {
        if let Some(mut handle) = self.object_request.take() {
            contain_panic(lane, || {
                if !handle.is_finished() {
                    handle.finish();
                }
            });
        }
    }
}

/// Point-in-time view of the scheduler for monitoring.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStats {
    pub rectangle_in_flight: bool,
    pub landmark_in_flight: bool,
    pub tracking: bool,
    pub last_observation: Option<RectangleObservation>,
    pub shut_down: bool,
}

struct Inner {
    config: TrackerConfig,
    tuning: TrackerTuning,
    detectors: Detectors,
    sink: Arc<dyn ObservationSink>,
    executor: Arc<dyn LaneExecutor>,
    rectangle_lane: Lane<TrackingState>,
    landmark_lane: Lane<()>,
    ignore_output: AtomicBool,
}

/// Schedules detection work for one tracking session.
///
/// Cloning yields another handle to the same scheduler; in-flight jobs keep
/// the shared state alive until they finish.
#[derive(Clone)]
pub struct DetectionScheduler {
    inner: Arc<Inner>,
}

impl DetectionScheduler {
    /// Create a scheduler.
    ///
    /// Fails if `tuning` is out of range.
    pub fn new(
        config: TrackerConfig,
        tuning: TrackerTuning,
        detectors: Detectors,
        sink: Arc<dyn ObservationSink>,
        executor: Arc<dyn LaneExecutor>,
    ) -> TrackResult<Self> {
        tuning.validate()?;

        debug!(
            retrack_periodically = config.retrack_periodically,
            apply_low_pass_filter = config.apply_low_pass_filter,
            detect_landmarks = config.detect_landmarks,
            rectangles = detectors.rectangles.name(),
            tracker = detectors.tracker.name(),
            landmarks = detectors.landmarks.name(),
            "Creating detection scheduler"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                tuning,
                detectors,
                sink,
                executor,
                rectangle_lane: Lane::new(RECTANGLE_LANE, TrackingState::default()),
                landmark_lane: Lane::new(LANDMARK_LANE, ()),
                ignore_output: AtomicBool::new(false),
            }),
        })
    }

    /// Ingest one frame.
    ///
    /// Must be called serially, in capture order. Advances the active
    /// track, delivers the reconciled rectangle to the sink, and dispatches
    /// a full detection if the rectangle lane is free and due.
    pub fn on_frame(&self, frame: Frame) {
        let inner = &self.inner;
        let mut lane = inner.rectangle_lane.lock();
        if inner.is_ignoring() {
            return;
        }
        counter!("facetrack_frames_ingested_total").increment(1);

        let tracked = inner.advance_track(&mut lane, &frame);
        inner.reconcile_rectangle(&mut lane, tracked);

        let force = lane.object_request.is_none();
        if lane.try_begin_job(Instant::now(), inner.tuning.accurate_retrack_interval, force) {
            debug!(
                lane = RECTANGLE_LANE,
                forced = force,
                timestamp_ms = frame.timestamp.as_millis() as u64,
                "Dispatching full face detection"
            );
            counter!("facetrack_lane_jobs_total", "lane" => RECTANGLE_LANE).increment(1);
            let shared = Arc::clone(inner);
            inner
                .executor
                .spawn(RECTANGLE_LANE, Box::new(move || shared.complete_rectangle_job(frame)));
        }
    }

    /// Stop delivering observations.
    ///
    /// Call before tearing down the frame source. Blocks until any callback
    /// currently delivering to the sink has returned, so it must not be
    /// called from inside a sink callback.
    pub fn shutdown(&self) {
        if self.inner.ignore_output.swap(true, Ordering::SeqCst) {
            return;
        }

        // each lane emits while locked: acquiring both in turn waits out any
        // callback that passed its tombstone check before the flag flipped
        drop(self.inner.rectangle_lane.lock());
        drop(self.inner.landmark_lane.lock());

        info!("Detection scheduler shut down");
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    pub fn is_shut_down(&self) -> bool {
        self.inner.is_ignoring()
    }

    /// Snapshot the scheduler state.
    pub fn stats(&self) -> SchedulerStats {
        let (rectangle_in_flight, tracking, last_observation) = {
            let lane = self.inner.rectangle_lane.lock();
            (
                lane.is_in_flight(),
                lane.object_request.is_some(),
                lane.last_observation,
            )
        };
        let landmark_in_flight = self.inner.landmark_lane.lock().is_in_flight();

        SchedulerStats {
            rectangle_in_flight,
            landmark_in_flight,
            tracking,
            last_observation,
            shut_down: self.inner.is_ignoring(),
        }
    }
}

impl Inner {
    fn is_ignoring(&self) -> bool {
        self.ignore_output.load(Ordering::SeqCst)
    }

    /// Fast path: advance the active track against `frame`.
    ///
    /// A lost, failed or low-confidence track is finished and `None` is
    /// returned; reconciliation then drops it.
    fn advance_track(&self, state: &mut TrackingState, frame: &Frame) -> Option<RectangleObservation> {
        let handle = state.object_request.as_mut()?;

        let outcome = catch_unwind(AssertUnwindSafe(|| handle.track(frame)))
            .unwrap_or_else(|payload| Err(TrackerError::DetectorPanicked(panic_message(&*payload))));

        match outcome {
            Ok(Some(region)) if self.tuning.accepts(region.confidence) => {
                if contain_panic(INGESTION_LANE, || handle.set_reference(region)).is_some() {
                    return Some(RectangleObservation::from_region(&region));
                }
            }
            Ok(Some(region)) => {
                counter!("facetrack_low_confidence_total").increment(1);
                debug!(confidence = region.confidence, "Discarding low-confidence track");
            }
            Ok(None) => debug!("Track lost"),
            Err(e) => {
                counter!("facetrack_detector_failures_total", "lane" => INGESTION_LANE).increment(1);
                warn!(
                    tracker = self.detectors.tracker.name(),
                    error = %e,
                    "Object tracking failed"
                );
            }
        }

        contain_panic(INGESTION_LANE, || handle.finish());
        None
    }

    /// Merge a new raw observation into the smoothed state and deliver it.
    ///
    /// No observation means no face: the track is dropped and both streams
    /// receive `None`.
    fn reconcile_rectangle(&self, state: &mut TrackingState, observation: Option<RectangleObservation>) {
        let Some(new) = observation else {
            state.discard_track(INGESTION_LANE);
            state.last_observation = None;
            self.sink.on_lips_observation(None);
            self.sink.on_rectangle_observation(None);
            return;
        };

        let next = match state.last_observation {
            Some(old) => {
                let factor = self.tuning.smoothing_factor(&self.config);
                RectangleObservation::interpolate(&old, &new, factor)
            }
            None => new,
        };
        state.last_observation = Some(next);
        self.sink.on_rectangle_observation(Some(next));
    }

    /// Rectangle lane job: full detection, then reseed and hand off to landmarks.
    fn complete_rectangle_job(self: Arc<Self>, frame: Frame) {
        if self.is_ignoring() {
            return;
        }

        let detector = self.detectors.rectangles.name();
        let detection = run_detector(RECTANGLE_LANE, || self.detectors.rectangles.detect_faces(&frame));

        let seed = {
            let mut lane = self.rectangle_lane.lock();
            if self.is_ignoring() {
                return;
            }

            let seed = match detection {
                Ok(regions) => {
                    let first = regions.first().copied();
                    self.reseed_if_needed(&mut lane, &frame, first);
                    first
                }
                Err(e) => {
                    warn!(lane = RECTANGLE_LANE, detector, error = %e, "Face detection failed");
                    None
                }
            };
            lane.end_job(Instant::now());
            seed
        };

        if let Some(region) = seed {
            self.dispatch_landmarks(frame, region);
        }
    }

    /// Replace the tracking handle when the full detection disagrees with it.
    fn reseed_if_needed(&self, state: &mut TrackingState, frame: &Frame, detected: Option<DetectedRegion>) {
        let observation = detected.as_ref().map(RectangleObservation::from_region);
        if !should_reset(state.last_observation.as_ref(), observation.as_ref(), &self.config) {
            return;
        }

        state.discard_track(RECTANGLE_LANE);
        state.object_request = detected.and_then(|region| {
            contain_panic(RECTANGLE_LANE, || self.detectors.tracker.start_track(frame, &region))
        });
        debug!(
            lane = RECTANGLE_LANE,
            tracking = state.object_request.is_some(),
            "Reseeded tracking handle"
        );
    }

    /// Start a landmark pass seeded by `region` if the lane is free and due.
    fn dispatch_landmarks(self: Arc<Self>, frame: Frame, region: DetectedRegion) {
        if !self.config.detect_landmarks {
            return;
        }

        let mut lane = self.landmark_lane.lock();
        if self.is_ignoring() {
            return;
        }
        if !lane.try_begin_job(Instant::now(), self.tuning.landmark_retrack_interval, false) {
            return;
        }

        counter!("facetrack_lane_jobs_total", "lane" => LANDMARK_LANE).increment(1);
        let shared = Arc::clone(&self);
        self.executor
            .spawn(LANDMARK_LANE, Box::new(move || shared.complete_landmark_job(frame, region)));
    }

    /// Landmark lane job: detect landmarks and deliver the mouth state.
    fn complete_landmark_job(self: Arc<Self>, frame: Frame, region: DetectedRegion) {
        if self.is_ignoring() {
            return;
        }

        let detector = self.detectors.landmarks.name();
        let result = run_detector(LANDMARK_LANE, || {
            self.detectors.landmarks.detect_landmarks(&frame, &region)
        });

        let mut lane = self.landmark_lane.lock();
        if self.is_ignoring() {
            return;
        }

        let lips = match result {
            Ok(landmarks) => landmarks.first().and_then(LipsObservation::from_landmarks),
            Err(e) => {
                warn!(lane = LANDMARK_LANE, detector, error = %e, "Landmark detection failed");
                None
            }
        };
        self.sink.on_lips_observation(lips);
        lane.end_job(Instant::now());
    }
}

/// Run a detector call, turning a panic into an error.
fn run_detector<R>(lane: &'static str, call: impl FnOnce() -> TrackResult<R>) -> TrackResult<R> {
    let started = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(TrackerError::DetectorPanicked(panic_message(&*payload))));

    if result.is_err() {
        counter!("facetrack_detector_failures_total", "lane" => lane).increment(1);
    }
    debug!(
        lane,
        elapsed_ms = started.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "Detector finished"
    );
    result
}

/// Run a backend call that has no error channel. A panic is logged,
/// counted against `lane` and reported as `None`.
fn contain_panic<R>(lane: &'static str, call: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(value) => Some(value),
        Err(payload) => {
            counter!("facetrack_detector_failures_total", "lane" => lane).increment(1);
            warn!(lane, panic = %panic_message(&*payload), "Detector backend panicked");
            None
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
