//! Luminance-threshold backend for the synthetic scene.
//!
//! Treats the bright pixels as the face and the dark pixels inside it as the
//! mouth. Regions are reported with a bottom-left origin, like most camera
//! vision frameworks.

use facetrack_core::{
    BoundingBox, BoxOrigin, DetectedRegion, FaceLandmarkDetector, FaceLandmarks,
    FaceRectangleDetector, Frame, ObjectTracker, Point, TrackResult, TrackingHandle,
};
use image::{Pixel, RgbImage};

const FACE_LUMA: u8 = 128;
const MOUTH_LUMA: u8 = 64;

/// Pixel rectangle, right and bottom exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PixelWindow {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl PixelWindow {
    fn full(image: &RgbImage) -> Self {
        Self {
            left: 0,
            top: 0,
            right: image.width(),
            bottom: image.height(),
        }
    }

    /// Pixel window covered by a top-left normalized box, grown by `margin`
    /// of its size on every side and clamped to the image.
    fn from_box(image: &RgbImage, bbox: &BoundingBox, margin: f64) -> Self {
        let (w, h) = (image.width() as f64, image.height() as f64);
        let grow_x = bbox.width * margin;
        let grow_y = bbox.height * margin;
        let clamp = |v: f64, max: f64| (v.max(0.0).min(max)).round() as u32;
        Self {
            left: clamp((bbox.x - grow_x) * w, w),
            top: clamp((bbox.y - grow_y) * h, h),
            right: clamp((bbox.x2() + grow_x) * w, w),
            bottom: clamp((bbox.y2() + grow_y) * h, h),
        }
    }

    fn area(&self) -> u32 {
        self.right.saturating_sub(self.left) * self.bottom.saturating_sub(self.top)
    }
}

fn luma(image: &RgbImage, x: u32, y: u32) -> u8 {
    image.get_pixel(x, y).to_luma()[0]
}

/// Bounds of the bright pixels in `window`, with the fraction of the
/// bounds they fill.
fn bright_bounds(image: &RgbImage, window: PixelWindow) -> Option<(PixelWindow, f32)> {
    let mut bounds: Option<PixelWindow> = None;
    let mut lit = 0u32;

    for y in window.top..window.bottom {
        for x in window.left..window.right {
            if luma(image, x, y) <= FACE_LUMA {
                continue;
            }
            lit += 1;
            bounds = Some(match bounds {
                Some(b) => PixelWindow {
                    left: b.left.min(x),
                    top: b.top.min(y),
                    right: b.right.max(x + 1),
                    bottom: b.bottom.max(y + 1),
                },
                None => PixelWindow {
                    left: x,
                    top: y,
                    right: x + 1,
                    bottom: y + 1,
                },
            });
        }
    }

    bounds.map(|b| (b, lit as f32 / b.area().max(1) as f32))
}

/// Convert pixel bounds into a bottom-left normalized region.
fn to_region(image: &RgbImage, bounds: PixelWindow, confidence: f32) -> DetectedRegion {
    let (w, h) = (image.width() as f64, image.height() as f64);
    let width = (bounds.right - bounds.left) as f64 / w;
    let height = (bounds.bottom - bounds.top) as f64 / h;
    let top = bounds.top as f64 / h;
    let bbox = BoundingBox::new(bounds.left as f64 / w, 1.0 - top - height, width, height);
    DetectedRegion::with_origin(confidence, bbox, BoxOrigin::BottomLeft)
}

/// Face, tracking and landmark backend driven by pixel brightness.
#[derive(Debug, Default)]
pub struct LuminanceDetector;

impl LuminanceDetector {
    pub fn new() -> Self {
        Self
    }
}

impl FaceRectangleDetector for LuminanceDetector {
    fn detect_faces(&self, frame: &Frame) -> TrackResult<Vec<DetectedRegion>> {
        let image = frame.image.as_ref();
        Ok(bright_bounds(image, PixelWindow::full(image))
            .map(|(bounds, fill)| to_region(image, bounds, fill))
            .into_iter()
            .collect())
    }

    fn name(&self) -> &'static str {
        "luminance"
    }
}

impl ObjectTracker for LuminanceDetector {
    fn start_track(&self, _frame: &Frame, seed: &DetectedRegion) -> Box<dyn TrackingHandle> {
        Box::new(LuminanceTrack {
            reference: *seed,
            finished: false,
        })
    }

    fn name(&self) -> &'static str {
        "luminance-window"
    }
}

/// Follows the bright blob inside a window around the last known region.
struct LuminanceTrack {
    reference: DetectedRegion,
    finished: bool,
}

impl TrackingHandle for LuminanceTrack {
    fn track(&mut self, frame: &Frame) -> TrackResult<Option<DetectedRegion>> {
        if self.finished {
            return Ok(None);
        }
        let image = frame.image.as_ref();
        let window = PixelWindow::from_box(image, &self.reference.top_left_box(), 0.5);
        Ok(bright_bounds(image, window).map(|(bounds, fill)| to_region(image, bounds, fill)))
    }

    fn set_reference(&mut self, region: DetectedRegion) {
        self.reference = region;
    }

    fn finish(&mut self) {
        self.finished = true;
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

impl FaceLandmarkDetector for LuminanceDetector {
    fn detect_landmarks(
        &self,
        frame: &Frame,
        face: &DetectedRegion,
    ) -> TrackResult<Vec<FaceLandmarks>> {
        let image = frame.image.as_ref();
        let window = PixelWindow::from_box(image, &face.top_left_box(), 0.0);
        let face_height = window.bottom.saturating_sub(window.top);
        if face_height == 0 {
            return Ok(Vec::new());
        }

        let dark_rows: Vec<u32> = (window.top..window.bottom)
            .filter(|&y| (window.left..window.right).any(|x| luma(image, x, y) < MOUTH_LUMA))
            .collect();

        let (Some(&first), Some(&last)) = (dark_rows.first(), dark_rows.last()) else {
            return Ok(vec![FaceLandmarks {
                confidence: face.confidence,
                outer_lips: None,
            }]);
        };

        // outer lip diamond in face-normalized coordinates
        let upper = (first - window.top) as f64 / face_height as f64;
        let lower = (last + 1 - window.top) as f64 / face_height as f64;
        let middle = (upper + lower) / 2.0;
        let lips = vec![
            Point::new(0.25, middle),
            Point::new(0.5, upper),
            Point::new(0.75, middle),
            Point::new(0.5, lower),
        ];

        Ok(vec![FaceLandmarks::new(face.confidence, lips)])
    }

    fn name(&self) -> &'static str {
        "luminance-landmarks"
    }
}
