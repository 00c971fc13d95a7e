//! Point and bounds reprojection between two CRS.

use crate::epsg::{is_longlat_definition, proj_string};
use crate::ProjectionError;
use geoimage_common::{BoundingBox, Crs};
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// Points sampled along each bounds edge when reprojecting a box.
pub const DEFAULT_DENSIFY_POINTS: usize = 21;

/// A reusable source → target coordinate transformer.
#[derive(Debug, Clone)]
pub struct Transformer {
    source_crs: Crs,
    target_crs: Crs,
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
}

impl Transformer {
    pub fn new(source_crs: &Crs, target_crs: &Crs) -> Result<Self, ProjectionError> {
        let source_def = proj_string(source_crs)?;
        let target_def = proj_string(target_crs)?;

        let source = build_proj(&source_def)?;
        let target = build_proj(&target_def)?;

        Ok(Self {
            source_crs: source_crs.clone(),
            target_crs: target_crs.clone(),
            source,
            target,
            source_geographic: is_longlat_definition(&source_def),
            target_geographic: is_longlat_definition(&target_def),
        })
    }

    /// True when source and target are the same CRS identifier.
    pub fn is_identity(&self) -> bool {
        self.source_crs == self.target_crs
    }

    /// Reproject a single coordinate.
    ///
    /// Geographic coordinates are degrees on both sides.
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        if self.is_identity() {
            return Ok((x, y));
        }

        // proj4rs works in radians for geographic systems
        let mut point = if self.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        transform(&self.source, &self.target, &mut point).map_err(|e| {
            ProjectionError::TransformFailed {
                source_crs: self.source_crs.to_string(),
                target_crs: self.target_crs.to_string(),
                message: format!("{e:?}"),
            }
        })?;

        if self.target_geographic {
            Ok((point.0.to_degrees(), point.1.to_degrees()))
        } else {
            Ok((point.0, point.1))
        }
    }

    /// Reproject many coordinates, failing on the first error.
    pub fn transform_points(
        &self,
        points: &[(f64, f64)],
    ) -> Result<Vec<(f64, f64)>, ProjectionError> {
        points
            .iter()
            .map(|&(x, y)| self.transform_point(x, y))
            .collect()
    }

    /// Reproject a bounding box, sampling `densify` points along every edge.
    ///
    /// Points that fail to project are skipped; the result is the envelope of
    /// the ones that succeed.
    pub fn transform_bounds(
        &self,
        bounds: &BoundingBox,
        densify: usize,
    ) -> Result<BoundingBox, ProjectionError> {
        if self.is_identity() {
            return Ok(*bounds);
        }

        let steps = densify.max(2) - 1;
        let mut edge_points = Vec::with_capacity(4 * (steps + 1));
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            let x = bounds.left + t * bounds.width();
            let y = bounds.bottom + t * bounds.height();
            edge_points.push((x, bounds.bottom));
            edge_points.push((x, bounds.top));
            edge_points.push((bounds.left, y));
            edge_points.push((bounds.right, y));
        }

        let projected = edge_points
            .into_iter()
            .filter_map(|(x, y)| self.transform_point(x, y).ok())
            .filter(|(x, y)| x.is_finite() && y.is_finite());

        BoundingBox::from_points(projected)
            .ok_or_else(|| ProjectionError::EmptyBounds(bounds.to_string()))
    }
}

/// Reproject bounds between two CRS with the default densification.
pub fn transform_bounds(
    source: &Crs,
    target: &Crs,
    bounds: &BoundingBox,
) -> Result<BoundingBox, ProjectionError> {
    Transformer::new(source, target)?.transform_bounds(bounds, DEFAULT_DENSIFY_POINTS)
}

fn build_proj(definition: &str) -> Result<Proj, ProjectionError> {
    Proj::from_proj_string(definition).map_err(|e| ProjectionError::InvalidDefinition {
        definition: definition.to_string(),
        message: format!("{e:?}"),
    })
}
