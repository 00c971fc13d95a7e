//! The GeoImage nodes as the runner executes them.
//!
//! Envelopes travel between nodes in their encoded wire form, tables as
//! [`Table`] values. Every node validates its configuration against the
//! input schema before decoding any raster data.

use crate::config::Settings;
use bytes::Bytes;
use geoimage::codec;
use geoimage::io::GEOTIFF_EXTENSIONS;
use geoimage::{
    ClipperConfig, RasterEnvelope, SamplerConfig, Table, TableToImageConfig, TracingProgress,
};
use geoimage_common::{GeoImageError, GeoImageResult};
use renderer::{
    render_interactive, render_static, BasemapRegistry, ColormapRegistry, InteractiveViewConfig,
    StaticViewConfig,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Node runner bound to one set of settings and registries.
pub struct Toolkit {
    settings: Settings,
    colormaps: ColormapRegistry,
    basemaps: BasemapRegistry,
}

impl Toolkit {
    pub fn new(settings: Settings) -> GeoImageResult<Self> {
        let (colormaps, basemaps) = settings.registries()?;
        Ok(Self {
            settings,
            colormaps,
            basemaps,
        })
    }

    pub fn colormaps(&self) -> &ColormapRegistry {
        &self.colormaps
    }

    pub fn basemaps(&self) -> &BasemapRegistry {
        &self.basemaps
    }

    /// Interactive view configuration seeded from the settings.
    pub fn interactive_defaults(&self) -> InteractiveViewConfig {
        InteractiveViewConfig {
            colormap: self.settings.default_colormap.clone(),
            basemap: self.settings.default_basemap.clone(),
            ..Default::default()
        }
    }

    /// Static view configuration seeded from the settings.
    pub fn static_defaults(&self) -> StaticViewConfig {
        StaticViewConfig {
            colormap: self.settings.default_colormap.clone(),
            width: self.settings.static_view.width,
            height: self.settings.static_view.height,
            ..Default::default()
        }
    }

    fn encode(&self, envelope: &RasterEnvelope) -> GeoImageResult<Bytes> {
        codec::encode_version(envelope, self.settings.wire_version)
    }

    /// GeoTIFF file to an encoded envelope and its profile table.
    pub fn read(&self, path: &Path) -> GeoImageResult<(Bytes, Table)> {
        let (envelope, profile) = geoimage::read_raster(path, &TracingProgress::new("read"))?;
        Ok((self.encode(&envelope)?, profile))
    }

    pub fn write(&self, image: &[u8], path: &Path) -> GeoImageResult<()> {
        let envelope = codec::decode(image)?;
        geoimage::write_raster(&envelope, path)
    }

    pub fn to_table(&self, image: &[u8]) -> GeoImageResult<Table> {
        let envelope = codec::decode(image)?;
        Ok(geoimage::bridge::to_table_with_progress(
            &envelope,
            &TracingProgress::new("to_table"),
        ))
    }

    pub fn grid_table(&self, image: &[u8]) -> GeoImageResult<Table> {
        Ok(geoimage::band_to_grid_table(&codec::decode(image)?))
    }

    pub fn from_table(
        &self,
        table: &Table,
        template: &[u8],
        config: &TableToImageConfig,
    ) -> GeoImageResult<Bytes> {
        config.configure(table.schema())?;
        let template = codec::decode(template)?;
        let envelope = geoimage::bands_from_table(table, &config.value_columns, &template)?;
        self.encode(&envelope)
    }

    pub fn sample(
        &self,
        image: &[u8],
        points: &Table,
        config: &SamplerConfig,
    ) -> GeoImageResult<Table> {
        config.configure(points.schema())?;
        geoimage::sample_points(&codec::decode(image)?, points, config)
    }

    pub fn clip(&self, image: &[u8], shapes: &Table, config: &ClipperConfig) -> GeoImageResult<Bytes> {
        config.configure(shapes.schema())?;
        let clipped = geoimage::clip_raster(&codec::decode(image)?, shapes, config)?;
        self.encode(&clipped)
    }

    pub fn view(&self, image: &[u8], config: &InteractiveViewConfig) -> GeoImageResult<String> {
        config.configure(&self.colormaps, &self.basemaps)?;
        render_interactive(
            &codec::decode(image)?,
            config,
            &self.colormaps,
            &self.basemaps,
            &TracingProgress::new("view"),
        )
    }

    pub fn view_static(&self, image: &[u8], config: &StaticViewConfig) -> GeoImageResult<Vec<u8>> {
        config.configure(&self.colormaps)?;
        render_static(
            &codec::decode(image)?,
            config,
            &self.colormaps,
            &TracingProgress::new("view_static"),
        )
    }
}

/// Apply `overrides` on top of `base`, field by field.
pub fn overlay<T>(base: &T, overrides: &serde_yaml::Mapping) -> GeoImageResult<T>
where
    T: Serialize + DeserializeOwned,
{
    let invalid = |e: serde_yaml::Error| GeoImageError::InvalidConfiguration(e.to_string());
    let mut merged = match serde_yaml::to_value(base).map_err(invalid)? {
        serde_yaml::Value::Mapping(m) => m,
        _ => serde_yaml::Mapping::new(),
    };
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    serde_yaml::from_value(serde_yaml::Value::Mapping(merged)).map_err(invalid)
}

// ============================================================================
// File helpers
// ============================================================================

/// True when `path` names a GeoTIFF by extension.
pub fn is_geotiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| GEOTIFF_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Load an envelope: GeoTIFF files are read, anything else is taken as an
/// encoded envelope.
pub fn load_image(toolkit: &Toolkit, path: &Path) -> GeoImageResult<Bytes> {
    if is_geotiff(path) {
        return toolkit.read(path).map(|(image, _)| image);
    }
    let data = fs::read(path).map_err(|e| GeoImageError::file_read(path, e))?;
    codec::peek_version(&data)?;
    Ok(Bytes::from(data))
}

pub fn load_table(path: &Path) -> GeoImageResult<Table> {
    let json = fs::read_to_string(path).map_err(|e| GeoImageError::file_read(path, e))?;
    let table = Table::from_json(&json)?;
    debug!(path = %path.display(), rows = table.num_rows(), "Loaded table");
    Ok(table)
}

pub fn save_bytes(path: &Path, data: &[u8]) -> GeoImageResult<()> {
    fs::write(path, data).map_err(|e| GeoImageError::file_write(path, e))?;
    info!(path = %path.display(), bytes = data.len(), "Wrote output");
    Ok(())
}

pub fn save_table(path: &Path, table: &Table) -> GeoImageResult<()> {
    save_bytes(path, table.to_json_pretty()?.as_bytes())
}

/// Store an envelope: GeoTIFF paths are written as rasters, anything else
/// gets the encoded bytes.
pub fn save_image(toolkit: &Toolkit, path: &Path, image: &[u8]) -> GeoImageResult<()> {
    if is_geotiff(path) {
        toolkit.write(image, path)
    } else {
        save_bytes(path, image)
    }
}
