//! Runner for GeoImage nodes.
//!
//! Used by the `geoimage` binary: settings, the node wrappers and YAML
//! pipelines.

pub mod config;
pub mod nodes;
pub mod pipeline;

pub use config::Settings;
pub use nodes::Toolkit;
pub use pipeline::{Pipeline, Port, Ports, Step};

use geoimage_common::GeoImageError;

/// Exit code for an error that reached the binary: the sysexits code of the
/// first [`GeoImageError`] in the chain, else 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<GeoImageError>())
        .map(|e| e.exit_code() as u8)
        .unwrap_or(1)
}
