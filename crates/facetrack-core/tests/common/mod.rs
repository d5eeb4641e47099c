//! Scripted detector backends shared by the integration tests.

#![allow(dead_code)]

use facetrack_core::{
    BoundingBox, DetectedRegion, DetectionScheduler, Detectors, FaceLandmarkDetector,
    FaceLandmarks, FaceRectangleDetector, Frame, ManualExecutor, ObjectTracker, Point,
    RecordingSink, TrackResult, TrackerConfig, TrackerError, TrackerTuning, TrackingHandle,
};
use image::RgbImage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn frame(index: u64) -> Frame {
    Frame::new(RgbImage::new(8, 8), Duration::from_millis(index * 33))
}

pub fn region(confidence: f32, x: f64, y: f64, w: f64, h: f64) -> DetectedRegion {
    DetectedRegion::new(confidence, BoundingBox::new(x, y, w, h))
}

pub fn open_mouth() -> FaceLandmarks {
    FaceLandmarks::new(
        0.8,
        vec![
            Point::new(0.3, 0.5),
            Point::new(0.5, 0.3),
            Point::new(0.7, 0.5),
            Point::new(0.5, 0.8),
        ],
    )
}

/// Tuning with every interval at zero so tests never depend on wall time.
pub fn eager_tuning() -> TrackerTuning {
    TrackerTuning {
        landmark_retrack_interval: Duration::ZERO,
        ..Default::default()
    }
}

/// Full detector answering from a script, then from a fallback.
pub struct ScriptedRectangles {
    script: Mutex<VecDeque<TrackResult<Vec<DetectedRegion>>>>,
    fallback: Mutex<Vec<DetectedRegion>>,
    calls: AtomicUsize,
    panic_next: AtomicBool,
}

impl ScriptedRectangles {
    pub fn new(fallback: Vec<DetectedRegion>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            calls: AtomicUsize::new(0),
            panic_next: AtomicBool::new(false),
        }
    }

    pub fn push(&self, response: TrackResult<Vec<DetectedRegion>>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn set_fallback(&self, fallback: Vec<DetectedRegion>) {
        *self.fallback.lock().unwrap() = fallback;
    }

    /// Make the next call panic.
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaceRectangleDetector for ScriptedRectangles {
    fn detect_faces(&self, _frame: &Frame) -> TrackResult<Vec<DetectedRegion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("scripted detector panic");
        }
        match self.script.lock().unwrap().pop_front() {
            Some(response) => response,
            None => Ok(self.fallback.lock().unwrap().clone()),
        }
    }

    fn name(&self) -> &'static str {
        "scripted-rectangles"
    }
}

/// Tracker whose handles all draw from one shared script.
///
/// An exhausted script means the subject was lost.
#[derive(Default)]
pub struct ScriptedTracker {
    script: Arc<Mutex<VecDeque<TrackResult<Option<DetectedRegion>>>>>,
    started: AtomicUsize,
    finished: Arc<AtomicUsize>,
    seeds: Mutex<Vec<DetectedRegion>>,
    panic_start: AtomicBool,
    panic_track: Arc<AtomicBool>,
    panic_reference: Arc<AtomicBool>,
}

impl ScriptedTracker {
    pub fn push(&self, response: TrackResult<Option<DetectedRegion>>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn push_region(&self, region: DetectedRegion) {
        self.push(Ok(Some(region)));
    }

    /// Make the next `start_track` panic.
    pub fn panic_next_start(&self) {
        self.panic_start.store(true, Ordering::SeqCst);
    }

    /// Make the next `track` call on any handle panic.
    pub fn panic_next_track(&self) {
        self.panic_track.store(true, Ordering::SeqCst);
    }

    /// Make the next `set_reference` call on any handle panic.
    pub fn panic_next_reference(&self) {
        self.panic_reference.store(true, Ordering::SeqCst);
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    pub fn seeds(&self) -> Vec<DetectedRegion> {
        self.seeds.lock().unwrap().clone()
    }
}

impl ObjectTracker for ScriptedTracker {
    fn start_track(&self, _frame: &Frame, seed: &DetectedRegion) -> Box<dyn TrackingHandle> {
        if self.panic_start.swap(false, Ordering::SeqCst) {
            panic!("scripted tracker start panic");
        }
        self.started.fetch_add(1, Ordering::SeqCst);
        self.seeds.lock().unwrap().push(*seed);
        Box::new(ScriptedHandle {
            script: Arc::clone(&self.script),
            finished_count: Arc::clone(&self.finished),
            panic_track: Arc::clone(&self.panic_track),
            panic_reference: Arc::clone(&self.panic_reference),
            reference: *seed,
            finished: false,
        })
    }

    fn name(&self) -> &'static str {
        "scripted-tracker"
    }
}

struct ScriptedHandle {
    script: Arc<Mutex<VecDeque<TrackResult<Option<DetectedRegion>>>>>,
    finished_count: Arc<AtomicUsize>,
    panic_track: Arc<AtomicBool>,
    panic_reference: Arc<AtomicBool>,
    reference: DetectedRegion,
    finished: bool,
}

impl TrackingHandle for ScriptedHandle {
    fn track(&mut self, _frame: &Frame) -> TrackResult<Option<DetectedRegion>> {
        if self.finished {
            return Ok(None);
        }
        if self.panic_track.swap(false, Ordering::SeqCst) {
            panic!("scripted track panic");
        }
        self.script.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }

    fn set_reference(&mut self, region: DetectedRegion) {
        if self.panic_reference.swap(false, Ordering::SeqCst) {
            panic!("scripted reference panic");
        }
        self.reference = region;
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.finished_count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Landmark detector answering from a script, then with an open mouth.
#[derive(Default)]
pub struct ScriptedLandmarks {
    script: Mutex<VecDeque<TrackResult<Vec<FaceLandmarks>>>>,
    calls: AtomicUsize,
}

impl ScriptedLandmarks {
    pub fn push(&self, response: TrackResult<Vec<FaceLandmarks>>) {
        self.script.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaceLandmarkDetector for ScriptedLandmarks {
    fn detect_landmarks(
        &self,
        _frame: &Frame,
        _face: &DetectedRegion,
    ) -> TrackResult<Vec<FaceLandmarks>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![open_mouth()]))
    }

    fn name(&self) -> &'static str {
        "scripted-landmarks"
    }
}

/// A scheduler wired to scripted backends and a manual executor.
pub struct Harness {
    pub scheduler: DetectionScheduler,
    pub executor: Arc<ManualExecutor>,
    pub sink: Arc<RecordingSink>,
    pub rectangles: Arc<ScriptedRectangles>,
    pub tracker: Arc<ScriptedTracker>,
    pub landmarks: Arc<ScriptedLandmarks>,
    next_frame: u64,
}

impl Harness {
    pub fn new(config: TrackerConfig, tuning: TrackerTuning, face: DetectedRegion) -> Self {
        let executor = Arc::new(ManualExecutor::new());
        let sink = Arc::new(RecordingSink::new());
        let rectangles = Arc::new(ScriptedRectangles::new(vec![face]));
        let tracker = Arc::new(ScriptedTracker::default());
        let landmarks = Arc::new(ScriptedLandmarks::default());

        let detectors = Detectors::new(rectangles.clone(), tracker.clone(), landmarks.clone());
        let scheduler =
            DetectionScheduler::new(config, tuning, detectors, sink.clone(), executor.clone())
                .expect("valid tuning");

        Self {
            scheduler,
            executor,
            sink,
            rectangles,
            tracker,
            landmarks,
            next_frame: 0,
        }
    }

    /// Feed the next frame.
    pub fn feed(&mut self) {
        let frame = frame(self.next_frame);
        self.next_frame += 1;
        self.scheduler.on_frame(frame);
    }

    /// Feed a first frame and complete the full detection it dispatches,
    /// leaving a seeded track and an empty event log.
    pub fn seed(&mut self) {
        self.feed();
        self.executor.run_pending();
        assert!(self.scheduler.stats().tracking, "full detection should seed a track");
        self.sink.clear();
    }
}

pub fn detection_error() -> TrackerError {
    TrackerError::detection_failed("scripted failure")
}
