//! Observation value types produced by the tracking pipeline.
//!
//! A [`RectangleObservation`] is the smoothed face region forwarded to the
//! consumer every frame; a [`LipsObservation`] carries the mouth state
//! derived from the outer-lip landmark polygon.

use crate::geometry::{BoundingBox, BoxOrigin, Point};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Squared center distance above which two observations are `Large` apart (0.5²).
pub const LARGE_SQUARED_DISTANCE: f64 = 0.25;

/// Area ratio above which two observations are `Large` apart.
pub const LARGE_AREA_RATIO: f64 = 4.0;

/// Squared center distance above which two observations are `Medium` apart (0.25²).
pub const MEDIUM_SQUARED_DISTANCE: f64 = 0.0625;

/// Area ratio above which two observations are `Medium` apart.
pub const MEDIUM_AREA_RATIO: f64 = 2.5;

/// Gap above which the lips count as open.
pub const LIPS_OPEN_GAP: f64 = 0.25;

/// Raw region reported by a detector or tracker backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetectedRegion {
    /// Backend confidence (0.0-1.0)
    pub confidence: f32,
    /// Region in the backend's own origin convention
    pub bounding_box: BoundingBox,
    /// Origin convention of `bounding_box`
    #[serde(default)]
    pub origin: BoxOrigin,
}

impl DetectedRegion {
    /// Create a region reported with a top-left origin.
    pub fn new(confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            confidence,
            bounding_box,
            origin: BoxOrigin::TopLeft,
        }
    }

    /// Create a region with an explicit origin convention.
    pub fn with_origin(confidence: f32, bounding_box: BoundingBox, origin: BoxOrigin) -> Self {
        Self {
            confidence,
            bounding_box,
            origin,
        }
    }

    /// The region's box in top-left coordinates.
    pub fn top_left_box(&self) -> BoundingBox {
        self.bounding_box.to_top_left(self.origin)
    }
}

/// Magnitude of the change between two rectangle observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Delta {
    Small,
    Medium,
    Large,
}

impl Delta {
    /// Classify the change between two observations.
    ///
    /// Symmetric in its arguments: the area ratio is always larger over
    /// smaller and the center distance does not depend on direction.
    pub fn between(a: &RectangleObservation, b: &RectangleObservation) -> Delta {
        let area_a = a.bounding_box.area();
        let area_b = b.bounding_box.area();
        let larger = area_a.max(area_b);
        let smaller = area_a.min(area_b);

        let ratio = if smaller > 0.0 {
            larger / smaller
        } else if larger > 0.0 {
            f64::INFINITY
        } else {
            1.0
        };

        let sq_dist = a
            .bounding_box
            .center()
            .squared_distance(&b.bounding_box.center());

        if sq_dist > LARGE_SQUARED_DISTANCE || ratio > LARGE_AREA_RATIO {
            Delta::Large
        } else if sq_dist > MEDIUM_SQUARED_DISTANCE || ratio > MEDIUM_AREA_RATIO {
            Delta::Medium
        } else {
            Delta::Small
        }
    }
}

/// A tracked face region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RectangleObservation {
    /// Detection confidence (0.0-1.0)
    pub confidence: f32,
    /// Region with a top-left origin
    pub bounding_box: BoundingBox,
    /// Subject position; follows the box but keeps any accumulated offset
    pub relative_center: Point,
}

impl RectangleObservation {
    /// Create an observation whose relative center is the box center.
    pub fn new(confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            confidence,
            bounding_box,
            relative_center: bounding_box.center(),
        }
    }

    /// Build an observation from a raw backend region.
    pub fn from_region(region: &DetectedRegion) -> Self {
        Self::new(region.confidence, region.top_left_box())
    }

    /// Blend `old` towards `new` by `factor`.
    ///
    /// Confidence always comes from `new`. The relative center snaps to the
    /// new box on a large change, holds still on a medium one, and follows
    /// the box movement on a small one.
    pub fn interpolate(old: &RectangleObservation, new: &RectangleObservation, factor: f64) -> Self {
        let bounding_box = old.bounding_box.lerp(&new.bounding_box, factor);

        let old_center = old.bounding_box.center();
        let new_center = new.bounding_box.center();
        let relative_center = match Delta::between(old, new) {
            Delta::Large => new_center,
            Delta::Medium => old.relative_center,
            Delta::Small => old.relative_center + (new_center - old_center),
        };

        Self {
            confidence: new.confidence,
            bounding_box,
            relative_center,
        }
    }

    /// Whether `other` differs by more than a small change.
    pub fn is_distant(&self, other: &RectangleObservation) -> bool {
        Delta::between(self, other) != Delta::Small
    }
}

/// Facial landmarks reported by a landmark backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaceLandmarks {
    /// Backend confidence (0.0-1.0)
    pub confidence: f32,
    /// Outer lip contour in normalized face coordinates, if found
    pub outer_lips: Option<Vec<Point>>,
}

impl FaceLandmarks {
    /// Create landmarks with an outer lip contour.
    pub fn new(confidence: f32, outer_lips: Vec<Point>) -> Self {
        Self {
            confidence,
            outer_lips: Some(outer_lips),
        }
    }
}

/// Mouth state derived from one landmark pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LipsObservation {
    /// Landmark confidence (0.0-1.0)
    pub confidence: f32,
    /// Vertical extent of the closed outer-lip polygon
    pub gap: f64,
}

impl LipsObservation {
    /// Create a new lips observation.
    pub fn new(confidence: f32, gap: f64) -> Self {
        Self { confidence, gap }
    }

    /// Derive the mouth state from landmarks.
    ///
    /// Returns `None` when the outer lip contour is missing or has a single point.
    pub fn from_landmarks(landmarks: &FaceLandmarks) -> Option<Self> {
        let lips = landmarks.outer_lips.as_deref()?;
        // closing the polygon does not add any extent, so the point set's box is enough
        let bounds = BoundingBox::from_points(lips)?;
        Some(Self {
            confidence: landmarks.confidence,
            gap: bounds.height,
        })
    }

    /// Whether the mouth is open.
    #[inline]
    pub fn are_open(&self) -> bool {
        self.gap > LIPS_OPEN_GAP
    }
}
