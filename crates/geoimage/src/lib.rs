//! Raster envelopes and the transforms that operate on them.
//!
//! - [`io`]: GeoTIFF reader and writer
//! - [`bridge`]: pixel grid to table reshaping and back
//! - [`sampler`]: raster values under point geometries
//! - [`clipper`]: polygon masking and cropping
//! - [`codec`]: versioned binary envelope form for passing between nodes

pub mod bridge;
pub mod clipper;
pub mod codec;
pub mod config;
pub mod envelope;
pub mod geometry;
pub mod io;
pub mod progress;
pub mod sampler;
pub mod table;

pub use bridge::{band_to_grid_table, bands_from_table, from_table, to_table};
pub use clipper::clip_raster;
pub use config::{BoundsPolicy, ClipperConfig, OutOfGridPolicy, SamplerConfig, TableToImageConfig};
pub use envelope::{Band, DataType, Georeference, RasterEnvelope};
pub use geometry::{Geometry, Point, Polygon};
pub use io::{read_raster, write_raster};
pub use progress::{NoProgress, Progress, TracingProgress};
pub use sampler::sample_points;
pub use table::{ColumnType, Field, Table, TableSchema, Value};
