//! Tracking session: binds one scheduler to one frame source.
//!
//! Frames enter through a [`FrameIngest`] with room for a single pending
//! frame. The ingestion lane drains it serially; a frame arriving while
//! another is still waiting is discarded rather than queued.

use facetrack_models::{TrackerConfig, TrackerTuning};
use metrics::counter;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::error::TrackResult;
use crate::executor::BlockingExecutor;
use crate::frame::Frame;
use crate::providers::Detectors;
use crate::scheduler::DetectionScheduler;
use crate::sink::ObservationSink;

/// Camera or other producer of frames.
pub trait FrameSource: Send {
    /// Begin delivering frames into `ingest`.
    fn start(&mut self, ingest: FrameIngest) -> TrackResult<()>;

    /// Stop delivering frames and release the ingest handle.
    fn stop(&mut self);
}

/// Entry point of the ingestion lane.
#[derive(Debug, Clone)]
pub struct FrameIngest {
    sender: mpsc::Sender<Frame>,
}

impl FrameIngest {
    /// Create an ingest handle and the receiving end of the lane.
    pub fn channel() -> (Self, mpsc::Receiver<Frame>) {
        let (sender, receiver) = mpsc::channel(1);
        (Self { sender }, receiver)
    }

    /// Offer a frame to the ingestion lane.
    ///
    /// Returns `false` if the frame was discarded because the lane is busy
    /// or closed.
    pub fn deliver(&self, frame: Frame) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(frame)) => {
                counter!("facetrack_frames_dropped_total").increment(1);
                trace!(
                    timestamp_ms = frame.timestamp.as_millis() as u64,
                    "Dropping late frame"
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the ingestion lane has stopped accepting frames.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// A running tracking session.
///
/// Stopping (explicitly or on drop) silences the scheduler before the
/// frame source is torn down, so frames still in flight are ignored, and
/// then closes the ingestion lane.
pub struct FaceTracker {
    scheduler: DetectionScheduler,
    source: Box<dyn FrameSource>,
    close_ingest: watch::Sender<bool>,
    stopped: bool,
}

impl FaceTracker {
    /// Build the scheduler, start the ingestion lane and start the source.
    ///
    /// Detection jobs and the ingestion lane run on `runtime`'s blocking pool.
    pub fn start(
        config: TrackerConfig,
        tuning: TrackerTuning,
        detectors: Detectors,
        sink: Arc<dyn ObservationSink>,
        mut source: Box<dyn FrameSource>,
        runtime: Handle,
    ) -> TrackResult<Self> {
        let executor = Arc::new(BlockingExecutor::new(runtime.clone()));
        let scheduler = DetectionScheduler::new(config, tuning, detectors, sink, executor)?;

        let (ingest, receiver) = FrameIngest::channel();
        let (close_ingest, close_rx) = watch::channel(false);
        spawn_ingestion_lane(&runtime, scheduler.clone(), receiver, close_rx);

        if let Err(e) = source.start(ingest) {
            warn!(error = %e, "Frame source failed to start");
            scheduler.shutdown();
            let _ = close_ingest.send(true);
            return Err(e);
        }

        info!(
            retrack_periodically = config.retrack_periodically,
            apply_low_pass_filter = config.apply_low_pass_filter,
            detect_landmarks = config.detect_landmarks,
            "Face tracker started"
        );

        Ok(Self {
            scheduler,
            source,
            close_ingest,
            stopped: false,
        })
    }

    /// The scheduler driving this session.
    pub fn scheduler(&self) -> &DetectionScheduler {
        &self.scheduler
    }

    /// Whether the session has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop the session. Idempotent.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        // the tombstone must be set before the source goes away
        self.scheduler.shutdown();
        self.source.stop();
        let _ = self.close_ingest.send(true);
        info!("Face tracker stopped");
    }
}

impl Drop for FaceTracker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Drain `receiver` into the scheduler, one frame at a time, in order,
/// until the source hangs up or `close` fires.
fn spawn_ingestion_lane(
    runtime: &Handle,
    scheduler: DetectionScheduler,
    mut receiver: mpsc::Receiver<Frame>,
    mut close: watch::Receiver<bool>,
) {
    drop(runtime.spawn(async move {
        loop {
            tokio::select! {
                biased;
                changed = close.changed() => {
                    if changed.is_err() || *close.borrow() {
                        break;
                    }
                }
                frame = receiver.recv() => {
                    let Some(frame) = frame else {
                        break;
                    };
                    if scheduler.is_shut_down() {
                        break;
                    }
                    // the fast path runs the tracker synchronously
                    let lane = scheduler.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || lane.on_frame(frame)).await {
                        warn!(error = %e, "Ingestion step failed");
                    }
                }
            }
        }

        receiver.close();
        debug!("Ingestion lane closed");
    }));
}
