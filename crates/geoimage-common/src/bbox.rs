//! Bounding box types and operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A world-coordinate bounding box in the units of its raster's CRS.
///
/// Field order follows the raster convention `(left, bottom, right, top)`.
/// For geographic CRS (EPSG:4326) coordinates are degrees, for projected CRS
/// they are usually meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Parse a `left,bottom,right,top` string.
    pub fn parse(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let number = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
        };

        Ok(Self {
            left: number(parts[0])?,
            bottom: number(parts[1])?,
            right: number(parts[2])?,
            top: number(parts[3])?,
        })
    }

    /// Smallest box containing every `(x, y)` in `points`.
    ///
    /// Returns `None` for an empty iterator or when every coordinate is NaN.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut left = f64::INFINITY;
        let mut bottom = f64::INFINITY;
        let mut right = f64::NEG_INFINITY;
        let mut top = f64::NEG_INFINITY;

        for (x, y) in points {
            if x.is_nan() || y.is_nan() {
                continue;
            }
            left = left.min(x);
            right = right.max(x);
            bottom = bottom.min(y);
            top = top.max(y);
        }

        if left.is_finite() && bottom.is_finite() && right.is_finite() && top.is_finite() {
            Some(Self::new(left, bottom, right, top))
        } else {
            None
        }
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Center point `(x, y)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.left + self.right) / 2.0,
            (self.bottom + self.top) / 2.0,
        )
    }

    /// Check if this bbox intersects another (touching edges do not count).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.bottom < other.top
            && self.top > other.bottom
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            left: self.left.min(other.left),
            bottom: self.bottom.min(other.bottom),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
        }
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right && y >= self.bottom && y <= self.top
    }

    /// Corners as `[left, bottom, right, top]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.left, self.bottom, self.right, self.top]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox(left={}, bottom={}, right={}, top={})",
            self.left, self.bottom, self.right, self.top
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid bounds format: {0}. Expected 'left,bottom,right,top'")]
    InvalidFormat(String),

    #[error("Invalid number in bounds: {0}")]
    InvalidNumber(String),
}
