//! Frames delivered by the camera.

use image::RgbImage;
use std::sync::Arc;
use std::time::Duration;

/// Camera intrinsic matrix, row-major.
///
/// Passed through to detector backends untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics(pub [[f32; 3]; 3]);

/// One captured video frame.
///
/// Cloning is cheap; the pixel buffer is shared.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Pixel data
    pub image: Arc<RgbImage>,
    /// Capture timestamp relative to the start of the session
    pub timestamp: Duration,
    /// Intrinsics attached by the camera, if it delivers them
    pub intrinsics: Option<CameraIntrinsics>,
}

impl Frame {
    /// Create a frame without intrinsic metadata.
    pub fn new(image: RgbImage, timestamp: Duration) -> Self {
        Self {
            image: Arc::new(image),
            timestamp,
            intrinsics: None,
        }
    }

    /// Attach camera intrinsics.
    pub fn with_intrinsics(mut self, intrinsics: CameraIntrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
