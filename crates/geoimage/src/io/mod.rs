//! GeoTIFF reading and writing.

pub mod geokeys;
pub mod reader;
pub mod writer;

pub use reader::{decode, profile_table, read_raster, FileLayout};
pub use writer::{write_bands, write_raster, write_raster_to, GEOTIFF_EXTENSIONS};
