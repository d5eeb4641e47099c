//! Observation sinks receiving the reconciled streams.

use facetrack_models::{LipsObservation, RectangleObservation};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;

/// Consumer of the tracker's output.
///
/// Called from the ingestion lane and the landmark lane, possibly
/// concurrently. Implementations should return quickly: the calling lane
/// stays locked for the duration of the call.
pub trait ObservationSink: Send + Sync {
    /// The smoothed face region, or `None` when no face is tracked.
    fn on_rectangle_observation(&self, observation: Option<RectangleObservation>);

    /// The latest mouth state, or `None` when it is unknown.
    fn on_lips_observation(&self, observation: Option<LipsObservation>);
}

/// One delivery to a sink.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackerEvent {
    Rectangle(Option<RectangleObservation>),
    Lips(Option<LipsObservation>),
}

/// Forwards observations over an unbounded channel.
///
/// The receiver may be dropped at any time; later observations are discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<TrackerEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver for its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TrackerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: TrackerEvent) {
        if self.sender.send(event).is_err() {
            trace!("Observation receiver dropped");
        }
    }
}

impl ObservationSink for ChannelSink {
    fn on_rectangle_observation(&self, observation: Option<RectangleObservation>) {
        self.send(TrackerEvent::Rectangle(observation));
    }

    fn on_lips_observation(&self, observation: Option<LipsObservation>) {
        self.send(TrackerEvent::Lips(observation));
    }
}

/// Keeps every delivered event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TrackerEvent>>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in delivery order.
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.lock().clone()
    }

    /// Rectangle deliveries in order.
    pub fn rectangles(&self) -> Vec<Option<RectangleObservation>> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                TrackerEvent::Rectangle(observation) => Some(*observation),
                TrackerEvent::Lips(_) => None,
            })
            .collect()
    }

    /// Lips deliveries in order.
    pub fn lips(&self) -> Vec<Option<LipsObservation>> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                TrackerEvent::Lips(observation) => Some(*observation),
                TrackerEvent::Rectangle(_) => None,
            })
            .collect()
    }

    /// Number of events recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TrackerEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ObservationSink for RecordingSink {
    fn on_rectangle_observation(&self, observation: Option<RectangleObservation>) {
        self.lock().push(TrackerEvent::Rectangle(observation));
    }

    fn on_lips_observation(&self, observation: Option<LipsObservation>) {
        self.lock().push(TrackerEvent::Lips(observation));
    }
}
