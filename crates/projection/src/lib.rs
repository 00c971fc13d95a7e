//! Coordinate reference system lookup and reprojection.
//!
//! CRS identifiers are resolved to PROJ definition strings through the
//! `crs-definitions` EPSG database and the actual math is delegated to
//! `proj4rs`.

pub mod epsg;
pub mod reproject;

pub use epsg::{is_geographic, proj_string};
pub use reproject::{transform_bounds, Transformer, DEFAULT_DENSIFY_POINTS};

use geoimage_common::GeoImageError;
use thiserror::Error;

/// Errors raised while resolving or applying a projection.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("EPSG:{0} is not in the CRS database")]
    UnknownEpsg(u32),

    #[error("Invalid projection definition '{definition}': {message}")]
    InvalidDefinition { definition: String, message: String },

    #[error("Transform from {source_crs} to {target_crs} failed: {message}")]
    TransformFailed {
        source_crs: String,
        target_crs: String,
        message: String,
    },

    #[error("No finite coordinates after reprojecting {0}")]
    EmptyBounds(String),
}

impl From<ProjectionError> for GeoImageError {
    fn from(err: ProjectionError) -> Self {
        GeoImageError::Projection(err.to_string())
    }
}
