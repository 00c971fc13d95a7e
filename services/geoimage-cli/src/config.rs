//! Settings for the geoimage runner.
//!
//! Loaded from the YAML file named by `GEOIMAGE_CONFIG` (or `--config`).
//! Supports environment variable substitution using ${VAR} syntax.

use anyhow::{Context, Result};
use geoimage::codec::EnvelopeVersion;
use geoimage_common::{GeoImageError, GeoImageResult};
use renderer::basemap::DEFAULT_BASEMAP;
use renderer::colormap::{ColormapDefinition, DEFAULT_COLORMAP};
use renderer::{Basemap, BasemapRegistry, ColormapRegistry};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "GEOIMAGE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_colormap: String,
    pub default_basemap: String,
    /// Extra tile layers on top of the built-in ones.
    pub basemaps: Vec<Basemap>,
    /// Extra palettes as hex color stops.
    pub colormaps: Vec<ColormapDefinition>,
    pub static_view: CanvasSize,
    /// Version used when encoding envelopes between nodes.
    pub wire_version: EnvelopeVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSize {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_colormap: DEFAULT_COLORMAP.to_string(),
            default_basemap: DEFAULT_BASEMAP.to_string(),
            basemaps: Vec::new(),
            colormaps: Vec::new(),
            static_view: CanvasSize::default(),
            wire_version: EnvelopeVersion::LATEST,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to `GEOIMAGE_CONFIG` and then
    /// to the defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match std::env::var(CONFIG_ENV) {
                Ok(path) if !path.is_empty() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load and parse a settings file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| GeoImageError::file_read(path.as_ref(), e))
            .with_context(|| format!("Failed to read settings from {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to load settings from {:?}", path.as_ref()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        let settings: Settings = serde_yaml::from_str(&expanded)
            .map_err(|e| GeoImageError::InvalidConfiguration(e.to_string()))
            .context("Failed to parse settings YAML")?;
        Ok(settings)
    }

    /// Registries with the built-in entries plus the configured extras. The
    /// default colormap and basemap must resolve in them.
    pub fn registries(&self) -> GeoImageResult<(ColormapRegistry, BasemapRegistry)> {
        let mut colormaps = ColormapRegistry::with_defaults();
        for def in &self.colormaps {
            colormaps.register_definition(def)?;
        }
        let mut basemaps = BasemapRegistry::with_defaults();
        for basemap in &self.basemaps {
            basemaps.register(basemap.clone());
        }

        colormaps.get(&self.default_colormap)?;
        basemaps.resolve(&self.default_basemap)?;
        Ok((colormaps, basemaps))
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expand environment variables in YAML content
/// Supports ${VAR} and ${VAR:-default} syntax
pub fn expand_env_vars(content: &str) -> GeoImageResult<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(GeoImageError::InvalidConfiguration(format!(
                            "unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve variable expression (supports VAR and VAR:-default syntax)
fn resolve_var_expr(expr: &str) -> GeoImageResult<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).map_err(|_| {
            GeoImageError::InvalidConfiguration(format!(
                "environment variable {} not set",
                expr.trim()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoimage_common::ErrorKind;

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("GEOIMAGE_TEST_DATA_DIR", "/data");
        let out = expand_env_vars("path: ${GEOIMAGE_TEST_DATA_DIR}/dem.tif").unwrap();
        assert_eq!(out, "path: /data/dem.tif");

        let out = expand_env_vars("size: ${GEOIMAGE_TEST_UNSET_SIZE:-640}").unwrap();
        assert_eq!(out, "size: 640");

        let out = expand_env_vars("cost: $5").unwrap();
        assert_eq!(out, "cost: $5");
    }

    #[test]
    fn test_expand_env_vars_errors() {
        let err = expand_env_vars("${GEOIMAGE_TEST_NEVER_SET}").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_yaml("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.wire_version, EnvelopeVersion::V2);
        assert!(settings.registries().is_ok());
    }

    #[test]
    fn test_extra_entries() {
        let yaml = r##"
default_colormap: terrain
default_basemap: Local
wire_version: 1
static_view: { width: 1024, height: 768 }
colormaps:
  - name: terrain
    stops: ["#00a000", "#e0e000", "#ffffff"]
basemaps:
  - name: Local
    url: "http://localhost:8080/{z}/{x}/{y}.png"
    attribution: "local tiles"
"##;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.wire_version, EnvelopeVersion::V1);
        assert_eq!(settings.static_view.width, 1024);

        let (colormaps, basemaps) = settings.registries().unwrap();
        assert!(colormaps.contains("terrain"));
        assert!(colormaps.contains("viridis"));
        assert!(basemaps.contains("Local"));
    }

    #[test]
    fn test_unknown_default_colormap() {
        let settings = Settings::from_yaml("default_colormap: rainbow").unwrap();
        let err = settings.registries().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
