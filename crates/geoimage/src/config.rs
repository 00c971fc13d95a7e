//! Immutable configuration records for the transform nodes.
//!
//! Each record validates itself against the input table schema in
//! `configure`, before any data is touched.

use crate::bridge::validate_value_columns;
use crate::table::{ColumnType, TableSchema};
use geoimage_common::GeoImageResult;
use serde::{Deserialize, Serialize};

/// Default geometry column name.
pub const DEFAULT_GEOMETRY_COLUMN: &str = "geometry";

fn default_geometry_column() -> String {
    DEFAULT_GEOMETRY_COLUMN.to_string()
}

/// What the point sampler does for points that fall outside the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfGridPolicy {
    /// Emit the nodata value (NaN when the raster has none) and log a warning.
    #[default]
    Nodata,
    /// Fail the node.
    Fail,
}

/// How the clipper tracks bounds on the output envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsPolicy {
    /// Derive bounds from the output transform and shape.
    #[default]
    Recompute,
    /// Carry the input bounds through unchanged.
    Preserve,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub geometry_column: String,
    pub out_of_grid: OutOfGridPolicy,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            geometry_column: default_geometry_column(),
            out_of_grid: OutOfGridPolicy::default(),
        }
    }
}

impl SamplerConfig {
    pub fn configure(&self, schema: &TableSchema) -> GeoImageResult<()> {
        schema.require(&self.geometry_column, &[ColumnType::Point])?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipperConfig {
    pub crop: bool,
    pub geometry_column: String,
    pub bounds_policy: BoundsPolicy,
}

impl Default for ClipperConfig {
    fn default() -> Self {
        Self {
            crop: true,
            geometry_column: default_geometry_column(),
            bounds_policy: BoundsPolicy::default(),
        }
    }
}

impl ClipperConfig {
    pub fn configure(&self, schema: &TableSchema) -> GeoImageResult<()> {
        schema.require(&self.geometry_column, &[ColumnType::Polygon])?;
        Ok(())
    }
}

/// Column selection for building bands from a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableToImageConfig {
    pub value_columns: Vec<String>,
}

impl TableToImageConfig {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value_columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn configure(&self, schema: &TableSchema) -> GeoImageResult<()> {
        validate_value_columns(schema, &self.value_columns)
    }
}
