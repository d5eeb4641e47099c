//! Synthetic camera: a bright square drifting over a dark background.

use facetrack_core::{CameraIntrinsics, Frame, FrameIngest, FrameSource, TrackResult, TrackerError};
use image::{Rgb, RgbImage};
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const BACKGROUND: Rgb<u8> = Rgb([20, 24, 28]);
const SKIN: Rgb<u8> = Rgb([235, 225, 215]);
const MOUTH: Rgb<u8> = Rgb([12, 6, 6]);

/// Layout of the rendered scene, in pixels.
#[derive(Debug, Clone, Copy)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    /// Side of the square "face"
    pub face_size: u32,
    /// Horizontal drift amplitude of the face center
    pub drift: f64,
    /// Time for one full drift cycle
    pub drift_period: Duration,
    pub frame_rate: u32,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            face_size: 40,
            drift: 40.0,
            drift_period: Duration::from_secs(4),
            frame_rate: 30,
        }
    }
}

impl Scene {
    /// Whether the mouth is drawn open at `t`. Toggles every second.
    pub fn mouth_open(&self, t: Duration) -> bool {
        t.as_secs() % 2 == 1
    }

    /// Top-left corner of the face at `t`.
    pub fn face_origin(&self, t: Duration) -> (u32, u32) {
        let phase = t.as_secs_f64() / self.drift_period.as_secs_f64();
        let center_x = self.width as f64 / 2.0 + self.drift * (TAU * phase).sin();
        let left = (center_x - self.face_size as f64 / 2.0).round().max(0.0) as u32;
        let top = (self.height - self.face_size) / 2;
        (left.min(self.width - self.face_size), top)
    }

    /// Render the frame at `t`.
    pub fn render(&self, t: Duration) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        let (left, top) = self.face_origin(t);
        let size = self.face_size;

        for y in top..top + size {
            for x in left..left + size {
                image.put_pixel(x, y, SKIN);
            }
        }

        // mouth band in the lower half, 14px open or 2px closed for a 40px face
        let (band_top, band_height) = if self.mouth_open(t) {
            (size * 22 / 40, size * 14 / 40)
        } else {
            (size * 28 / 40, (size * 2 / 40).max(1))
        };
        let inset = size / 4;
        for y in top + band_top..top + band_top + band_height {
            for x in left + inset..left + size - inset {
                image.put_pixel(x, y, MOUTH);
            }
        }

        image
    }

    /// Pinhole intrinsics with the principal point at the image center.
    pub fn intrinsics(&self) -> CameraIntrinsics {
        let focal = self.width as f32;
        CameraIntrinsics([
            [focal, 0.0, self.width as f32 / 2.0],
            [0.0, focal, self.height as f32 / 2.0],
            [0.0, 0.0, 1.0],
        ])
    }

    fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }
}

/// Frame source rendering [`Scene`] on its own thread at the scene's frame rate.
pub struct SyntheticCamera {
    scene: Scene,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<u64>>,
}

impl SyntheticCamera {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }
}

impl FrameSource for SyntheticCamera {
    fn start(&mut self, ingest: FrameIngest) -> TrackResult<()> {
        if self.worker.is_some() {
            return Err(TrackerError::invalid_output("synthetic camera already has an output"));
        }

        let scene = self.scene;
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        let worker = thread::Builder::new()
            .name("synthetic-camera".to_string())
            .spawn(move || capture_loop(scene, running, ingest))
            .map_err(|e| TrackerError::internal(format!("failed to spawn camera thread: {e}")))?;
        self.worker = Some(worker);

        info!(
            width = scene.width,
            height = scene.height,
            frame_rate = scene.frame_rate,
            "Synthetic camera started"
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return;
        };
        match worker.join() {
            Ok(frames) => info!(frames, "Synthetic camera stopped"),
            Err(_) => warn!("Synthetic camera thread panicked"),
        }
    }
}

/// Render and deliver frames until stopped. Returns the number of frames rendered.
fn capture_loop(scene: Scene, running: Arc<AtomicBool>, ingest: FrameIngest) -> u64 {
    let started = Instant::now();
    let interval = scene.frame_interval();
    let intrinsics = scene.intrinsics();
    let mut rendered = 0u64;
    let mut dropped = 0u64;

    while running.load(Ordering::SeqCst) {
        let t = started.elapsed();
        let frame = Frame::new(scene.render(t), t).with_intrinsics(intrinsics);
        rendered += 1;

        if !ingest.deliver(frame) {
            if ingest.is_closed() {
                debug!("Ingestion lane closed, stopping capture");
                break;
            }
            dropped += 1;
        }

        let next = interval * (rendered as u32);
        if let Some(wait) = next.checked_sub(started.elapsed()) {
            thread::sleep(wait);
        }
    }

    debug!(rendered, dropped, "Capture loop finished");
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouth_toggles_every_second() {
        let scene = Scene::default();
        assert!(!scene.mouth_open(Duration::from_millis(500)));
        assert!(scene.mouth_open(Duration::from_millis(1500)));
        assert!(!scene.mouth_open(Duration::from_millis(2500)));
    }

    #[test]
    fn test_face_stays_inside_frame() {
        let scene = Scene::default();
        for ms in (0..4000).step_by(100) {
            let (left, top) = scene.face_origin(Duration::from_millis(ms));
            assert!(left + scene.face_size <= scene.width);
            assert!(top + scene.face_size <= scene.height);
        }
    }

    #[test]
    fn test_render_draws_face_and_mouth() {
        let scene = Scene::default();
        let t = Duration::from_millis(1500);
        let image = scene.render(t);
        let (left, top) = scene.face_origin(t);

        assert_eq!(*image.get_pixel(left, top), SKIN);
        assert_eq!(*image.get_pixel(left + 20, top + 25), MOUTH);
        assert_eq!(*image.get_pixel(0, 0), BACKGROUND);
    }

    #[test]
    fn test_camera_delivers_until_stopped() {
        let (ingest, mut receiver) = FrameIngest::channel();
        let mut camera = SyntheticCamera::new(Scene::default());

        camera.start(ingest.clone()).unwrap();
        assert!(matches!(camera.start(ingest), Err(TrackerError::InvalidOutput(_))));

        let frame = receiver.blocking_recv().expect("first frame");
        assert_eq!(frame.width(), 160);
        assert!(frame.intrinsics.is_some());

        camera.stop();
        camera.stop();
    }
}
