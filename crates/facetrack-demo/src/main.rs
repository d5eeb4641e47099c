//! Face tracking demo against a synthetic camera.

mod detector;
mod source;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::runtime::Handle;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use facetrack_core::{
    ChannelSink, Detectors, FaceTracker, LipsObservation, RectangleObservation, TrackerConfig,
    TrackerEvent, TrackerTuning,
};

use crate::detector::LuminanceDetector;
use crate::source::{Scene, SyntheticCamera};

const DEFAULT_DEMO_SECONDS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing()?;
    info!("Starting facetrack-demo");

    // Load configuration
    let config = TrackerConfig::from_env();
    let seconds = std::env::var("FACETRACK_DEMO_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_DEMO_SECONDS);
    info!(config = %config.to_message(), seconds, "Tracker config");

    let backend = Arc::new(LuminanceDetector::new());
    let detectors = Detectors::new(backend.clone(), backend.clone(), backend);
    let (sink, mut events) = ChannelSink::new();

    let mut tracker = FaceTracker::start(
        config,
        TrackerTuning::default(),
        detectors,
        Arc::new(sink),
        Box::new(SyntheticCamera::new(Scene::default())),
        Handle::current(),
    )
    .context("Failed to start face tracker")?;

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut summary = Summary::default();
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = &mut ctrl_c => {
                info!("Received shutdown signal");
                break;
            }
            event = events.recv() => match event {
                Some(event) => summary.record(event)?,
                None => break,
            },
        }
    }

    // joins the camera thread
    tokio::task::spawn_blocking(move || tracker.stop())
        .await
        .context("Tracker shutdown task failed")?;

    info!(
        rectangles = summary.rectangles,
        faces = summary.faces,
        mouth_changes = summary.mouth_changes,
        "Demo complete"
    );
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("facetrack=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

/// Running tally of what the sink delivered.
#[derive(Debug, Default)]
struct Summary {
    rectangles: u64,
    faces: u64,
    face_visible: bool,
    mouth_open: Option<bool>,
    mouth_changes: u64,
}

impl Summary {
    fn record(&mut self, event: TrackerEvent) -> anyhow::Result<()> {
        match event {
            TrackerEvent::Rectangle(observation) => self.record_rectangle(observation),
            TrackerEvent::Lips(observation) => self.record_lips(observation)?,
        }
        Ok(())
    }

    fn record_rectangle(&mut self, observation: Option<RectangleObservation>) {
        self.rectangles += 1;
        let visible = observation.is_some();
        if visible != self.face_visible {
            self.face_visible = visible;
            if visible {
                self.faces += 1;
            }
            info!(visible, "Face visibility changed");
        }

        if let Some(observation) = observation {
            let bbox = observation.bounding_box;
            debug!(
                confidence = observation.confidence,
                x = bbox.x,
                y = bbox.y,
                width = bbox.width,
                height = bbox.height,
                center_x = observation.relative_center.x,
                center_y = observation.relative_center.y,
                "Face region"
            );
        }
    }

    fn record_lips(&mut self, observation: Option<LipsObservation>) -> anyhow::Result<()> {
        let open = observation.map(|lips| lips.are_open());
        if open.is_some() && open != self.mouth_open {
            self.mouth_changes += 1;
            info!(
                open = open.unwrap_or_default(),
                lips = %serde_json::to_string(&observation)?,
                "Mouth state changed"
            );
        }
        self.mouth_open = open;
        Ok(())
    }
}
