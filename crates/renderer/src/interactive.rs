//! Interactive Leaflet view of an envelope.
//!
//! The selected bands are normalized, colorized and embedded as a base64 PNG
//! image overlay in a self-contained HTML page, placed by the envelope
//! bounds reprojected to EPSG:4326.

use crate::basemap::{Basemap, BasemapRegistry, DEFAULT_BASEMAP};
use crate::colormap::{ColormapRegistry, DEFAULT_COLORMAP};
use crate::normalize::{colorize, compose_rgb, normalize};
use crate::png::create_png;
use crate::selection::BandSelection;
use base64::Engine;
use geoimage::envelope::RasterEnvelope;
use geoimage::progress::Progress;
use geoimage_common::{BoundingBox, Crs, GeoImageError, GeoImageResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const LEAFLET_VERSION: &str = "1.9.4";
const OVERLAY_LAYER: &str = "GeoImage";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractiveViewConfig {
    pub band: String,
    pub colormap: String,
    pub opacity: f64,
    pub basemap: String,
}

impl Default for InteractiveViewConfig {
    fn default() -> Self {
        Self {
            band: "1".to_string(),
            colormap: DEFAULT_COLORMAP.to_string(),
            opacity: 0.7,
            basemap: DEFAULT_BASEMAP.to_string(),
        }
    }
}

impl InteractiveViewConfig {
    pub fn configure(
        &self,
        colormaps: &ColormapRegistry,
        basemaps: &BasemapRegistry,
    ) -> GeoImageResult<()> {
        colormaps.get(&self.colormap)?;
        basemaps.resolve(&self.basemap)?;
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(GeoImageError::InvalidConfiguration(format!(
                "opacity {} is outside [0, 1]",
                self.opacity
            )));
        }
        Ok(())
    }
}

/// Render one or three bands as an HTML page with a Leaflet map.
pub fn render_interactive(
    envelope: &RasterEnvelope,
    config: &InteractiveViewConfig,
    colormaps: &ColormapRegistry,
    basemaps: &BasemapRegistry,
    progress: &dyn Progress,
) -> GeoImageResult<String> {
    config.configure(colormaps, basemaps)?;
    progress.report(0.1, "Processing raster data...");

    let selection = BandSelection::parse(&config.band, envelope.count())?;
    let georef = envelope.georeference();
    let bands = envelope.bands();
    let (width, height) = (envelope.width(), envelope.height());

    let pixels = match selection {
        BandSelection::Single(b) => {
            let colormap = colormaps.get(&config.colormap)?;
            colorize(&normalize(&bands[b - 1], georef), width, colormap)
        }
        BandSelection::Rgb([r, g, b]) => compose_rgb(
            &normalize(&bands[r - 1], georef),
            &normalize(&bands[g - 1], georef),
            &normalize(&bands[b - 1], georef),
            width,
        ),
    };
    let png = create_png(&pixels, width, height)?;
    let data_uri = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&png)
    );

    let bounds = geographic_bounds(envelope)?;
    let basemap = basemaps.resolve(&config.basemap)?;
    let html = page(&data_uri, &bounds, config.opacity, basemap)?;

    info!(
        bands = %selection,
        basemap = %config.basemap,
        bounds = %bounds,
        bytes = html.len(),
        "Rendered interactive view"
    );
    Ok(html)
}

/// Envelope bounds in EPSG:4326.
fn geographic_bounds(envelope: &RasterEnvelope) -> GeoImageResult<BoundingBox> {
    let bounds = envelope.effective_bounds();
    match envelope.crs() {
        Some(crs) if !crs.is_wgs84() => {
            Ok(projection::transform_bounds(crs, &Crs::wgs84(), &bounds)?)
        }
        Some(_) => Ok(bounds),
        None => {
            warn!(bounds = %bounds, "Raster has no CRS, treating bounds as EPSG:4326");
            Ok(bounds)
        }
    }
}

fn page(
    data_uri: &str,
    bounds: &BoundingBox,
    opacity: f64,
    basemap: Option<&Basemap>,
) -> GeoImageResult<String> {
    let js = |v: &str| serde_json::to_string(v);
    let corners = format!(
        "[[{}, {}], [{}, {}]]",
        bounds.bottom, bounds.left, bounds.top, bounds.right
    );

    let base_layer = match basemap {
        Some(b) => {
            let mut options = format!(
                "{{attribution: {}, maxZoom: {}",
                js(&b.attribution)?,
                b.max_zoom
            );
            if let Some(subdomains) = &b.subdomains {
                options.push_str(&format!(", subdomains: {}", js(subdomains)?));
            }
            options.push('}');
            format!(
                "var base = L.tileLayer({}, {}).addTo(map);\n      var baseLayers = {{{}: base}};",
                js(&b.url)?,
                options,
                js(&b.name)?
            )
        }
        None => "var baseLayers = {};".to_string(),
    };

    Ok(format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>GeoImage View</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.css">
  <script src="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.js"></script>
  <style>
    html, body, #map {{ height: 100%; width: 100%; margin: 0; }}
    .geoimage-overlay {{ image-rendering: pixelated; }}
  </style>
</head>
<body>
  <div id="map"></div>
  <script>
      var map = L.map("map");
      {base_layer}
      var bounds = {corners};
      var overlay = L.imageOverlay({image}, bounds, {{opacity: {opacity}, className: "geoimage-overlay"}}).addTo(map);
      L.control.layers(baseLayers, {{{layer}: overlay}}).addTo(map);
      map.fitBounds(bounds);
  </script>
</body>
</html>
"#,
        leaflet = LEAFLET_VERSION,
        base_layer = base_layer,
        corners = corners,
        image = js(data_uri)?,
        opacity = opacity,
        layer = js(OVERLAY_LAYER)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoimage::envelope::{Band, DataType, Georeference};
    use geoimage::progress::NoProgress;
    use crate::basemap::NO_BASEMAP;
    use geoimage_common::GeoTransform;

    fn envelope(count: usize, crs: Option<Crs>) -> RasterEnvelope {
        let mut georef = Georeference::new(
            DataType::Float32,
            3,
            2,
            count,
            GeoTransform::from_origin(8.4, 47.5, 0.1, 0.1),
        );
        georef.crs = crs;
        let bands = (0..count)
            .map(|i| Band::new(2, 3, (0..6).map(|v| (v + i) as f64).collect()).unwrap())
            .collect();
        RasterEnvelope::with_derived_bounds(bands, georef).unwrap()
    }

    fn render(env: &RasterEnvelope, config: &InteractiveViewConfig) -> GeoImageResult<String> {
        render_interactive(
            env,
            config,
            &ColormapRegistry::with_defaults(),
            &BasemapRegistry::with_defaults(),
            &NoProgress,
        )
    }

    #[test]
    fn test_single_band_page() {
        let html = render(&envelope(1, Some(Crs::wgs84())), &InteractiveViewConfig::default())
            .unwrap();
        assert!(html.contains("data:image/png;base64,"));
        assert!(html.contains("tile.openstreetmap.org"));
        assert!(html.contains("opacity: 0.7"));
        assert!(html.contains("L.control.layers"));
    }

    #[test]
    fn test_no_basemap() {
        let config = InteractiveViewConfig {
            basemap: NO_BASEMAP.to_string(),
            ..Default::default()
        };
        let html = render(&envelope(1, None), &config).unwrap();
        assert!(!html.contains("L.tileLayer"));
        assert!(html.contains("var baseLayers = {};"));
    }

    #[test]
    fn test_two_bands_rejected() {
        let config = InteractiveViewConfig {
            band: "1, 2".to_string(),
            ..Default::default()
        };
        let err = render(&envelope(3, None), &config).unwrap_err();
        assert_eq!(err.kind(), geoimage_common::ErrorKind::Value);
    }

    #[test]
    fn test_opacity_range() {
        let config = InteractiveViewConfig {
            opacity: 1.5,
            ..Default::default()
        };
        let err = config
            .configure(
                &ColormapRegistry::with_defaults(),
                &BasemapRegistry::with_defaults(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), geoimage_common::ErrorKind::Configuration);
    }
}
