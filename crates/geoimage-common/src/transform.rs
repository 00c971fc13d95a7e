//! Affine pixel-to-world transforms.
//!
//! Coefficients follow the usual raster affine layout:
//!
//! ```text
//! x = a * col + b * row + c
//! y = d * col + e * row + f
//! ```
//!
//! where `(col, row)` are continuous pixel coordinates with `(0, 0)` at the
//! top-left corner of the top-left pixel.

use crate::bbox::BoundingBox;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Six-coefficient affine transform from pixel to world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl GeoTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// North-up transform with the top-left corner at `(west, north)`.
    ///
    /// `xsize` and `ysize` are positive pixel sizes; the row axis points south.
    pub fn from_origin(west: f64, north: f64, xsize: f64, ysize: f64) -> Self {
        Self::new(xsize, 0.0, west, 0.0, -ysize, north)
    }

    /// Identity transform (pixel coordinates are world coordinates).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.e - self.b * self.d
    }

    /// True when there is no rotation or shear.
    pub fn is_rectilinear(&self) -> bool {
        self.b == 0.0 && self.d == 0.0
    }

    /// World coordinates of continuous pixel position `(col, row)`.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.a * col + self.b * row + self.c,
            self.d * col + self.e * row + self.f,
        )
    }

    /// World coordinates of the centre of pixel `(row, col)`.
    pub fn pixel_center(&self, row: usize, col: usize) -> (f64, f64) {
        self.pixel_to_world(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Inverse transform (world to pixel), `None` when singular.
    ///
    /// Singularity is judged relative to the scale terms, so very fine pixel
    /// sizes still invert.
    pub fn inverse(&self) -> Option<GeoTransform> {
        let det = self.determinant();
        let scale = (self.a * self.e).abs().max((self.b * self.d).abs());
        if !det.is_finite() || det == 0.0 || det.abs() <= scale * f64::EPSILON {
            return None;
        }

        let ia = self.e / det;
        let ib = -self.b / det;
        let id = -self.d / det;
        let ie = self.a / det;
        Some(GeoTransform {
            a: ia,
            b: ib,
            c: -(ia * self.c + ib * self.f),
            d: id,
            e: ie,
            f: -(id * self.c + ie * self.f),
        })
    }

    /// Integer `(row, col)` containing a world coordinate (floor semantics).
    ///
    /// Call on the inverse transform. The result may lie outside any
    /// particular grid; callers check bounds. `None` for non-finite input.
    pub fn rowcol(&self, x: f64, y: f64) -> Option<(i64, i64)> {
        let (col, row) = self.pixel_to_world(x, y);
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        Some((row.floor() as i64, col.floor() as i64))
    }

    /// Transform whose origin is moved to pixel `(col_off, row_off)`.
    pub fn translate(&self, col_off: f64, row_off: f64) -> GeoTransform {
        let (c, f) = self.pixel_to_world(col_off, row_off);
        GeoTransform { c, f, ..*self }
    }

    /// World bounds covered by a `width x height` grid.
    pub fn bounds(&self, width: usize, height: usize) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.pixel_to_world(0.0, 0.0),
            self.pixel_to_world(w, 0.0),
            self.pixel_to_world(0.0, h),
            self.pixel_to_world(w, h),
        ];
        let xs = corners.iter().map(|p| p.0);
        let ys = corners.iter().map(|p| p.1);
        BoundingBox::new(
            xs.clone().fold(f64::INFINITY, f64::min),
            ys.clone().fold(f64::INFINITY, f64::min),
            xs.fold(f64::NEG_INFINITY, f64::max),
            ys.fold(f64::NEG_INFINITY, f64::max),
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "| {}, {}, {}|\n| {}, {}, {}|\n| 0.00, 0.00, 1.00|",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}
