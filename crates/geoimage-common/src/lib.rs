//! Common types and utilities shared across the geoimage crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod transform;

pub use bbox::BoundingBox;
pub use crs::Crs;
pub use error::{ErrorKind, GeoImageError, GeoImageResult};
pub use transform::GeoTransform;
