//! Normalized geometry primitives shared by detectors and observations.
//!
//! All coordinates live in the unit square. Boxes handed to the pipeline
//! use a top-left origin; backends reporting bottom-left boxes are
//! normalized with [`BoundingBox::to_top_left`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// A point in normalized frame coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance to another point.
    #[inline]
    pub fn squared_distance(&self, other: &Point) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Origin convention of a box reported by a detector backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BoxOrigin {
    /// y grows downwards from the top edge of the frame
    #[default]
    TopLeft,
    /// y grows upwards from the bottom edge of the frame
    BottomLeft,
}

/// Axis-aligned bounding box in normalized coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// Left edge x-coordinate
    pub x: f64,
    /// Top edge y-coordinate
    pub y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Center x-coordinate.
    #[inline]
    pub fn cx(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Center y-coordinate.
    #[inline]
    pub fn cy(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.cx(), self.cy())
    }

    /// Right edge x-coordinate.
    #[inline]
    pub fn x2(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    #[inline]
    pub fn y2(&self) -> f64 {
        self.y + self.height
    }

    /// Box area.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Linearly interpolate every component towards `other`.
    ///
    /// Both endpoints are exact: a factor of `0.0` returns `self` and `1.0`
    /// returns `other` without rounding drift.
    pub fn lerp(&self, other: &BoundingBox, factor: f64) -> BoundingBox {
        let keep = 1.0 - factor;
        BoundingBox {
            x: self.x * keep + other.x * factor,
            y: self.y * keep + other.y * factor,
            width: self.width * keep + other.width * factor,
            height: self.height * keep + other.height * factor,
        }
    }

    /// Convert a box reported with `origin` into the top-left convention.
    pub fn to_top_left(&self, origin: BoxOrigin) -> BoundingBox {
        match origin {
            BoxOrigin::TopLeft => *self,
            BoxOrigin::BottomLeft => BoundingBox {
                x: self.x,
                y: 1.0 - self.y - self.height,
                width: self.width,
                height: self.height,
            },
        }
    }

    /// Bounding box of a point set.
    ///
    /// Returns `None` for fewer than two points, which cannot describe a region.
    pub fn from_points(points: &[Point]) -> Option<BoundingBox> {
        if points.len() < 2 {
            return None;
        }

        let x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let x2 = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let y2 = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        Some(BoundingBox {
            x,
            y,
            width: x2 - x,
            height: y2 - y,
        })
    }
}
