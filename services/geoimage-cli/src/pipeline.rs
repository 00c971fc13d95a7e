//! YAML pipelines chaining nodes through named ports.
//!
//! ```yaml
//! steps:
//!   - node: read
//!     path: ${DATA_DIR:-.}/dem.tif
//!     image: dem
//!   - node: load_table
//!     path: aoi.json
//!     table: aoi
//!   - node: clip
//!     image: dem
//!     shapes: aoi
//!     output: dem_aoi
//!     config: { crop: true }
//!   - node: write
//!     image: dem_aoi
//!     path: dem_aoi.tif
//! ```

use crate::config::expand_env_vars;
use crate::nodes::{self, overlay, Toolkit};
use anyhow::{Context, Result};
use bytes::Bytes;
use geoimage::{ClipperConfig, SamplerConfig, Table, TableToImageConfig};
use geoimage_common::{GeoImageError, GeoImageResult};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Value held by a port.
#[derive(Debug, Clone)]
pub enum Port {
    /// Encoded envelope.
    Image(Bytes),
    Table(Table),
}

/// Named port values produced while running a pipeline.
#[derive(Debug, Default)]
pub struct Ports {
    values: HashMap<String, Port>,
}

impl Ports {
    pub fn image(&self, name: &str) -> GeoImageResult<&Bytes> {
        match self.values.get(name) {
            Some(Port::Image(bytes)) => Ok(bytes),
            Some(Port::Table(_)) => Err(GeoImageError::InvalidConfiguration(format!(
                "port '{}' holds a table, expected an image",
                name
            ))),
            None => Err(missing_port(name)),
        }
    }

    pub fn table(&self, name: &str) -> GeoImageResult<&Table> {
        match self.values.get(name) {
            Some(Port::Table(table)) => Ok(table),
            Some(Port::Image(_)) => Err(GeoImageError::InvalidConfiguration(format!(
                "port '{}' holds an image, expected a table",
                name
            ))),
            None => Err(missing_port(name)),
        }
    }

    pub fn insert(&mut self, name: &str, port: Port) {
        self.values.insert(name.to_string(), port);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn missing_port(name: &str) -> GeoImageError {
    GeoImageError::InvalidConfiguration(format!("port '{}' is not set", name))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Step {
    Read {
        path: PathBuf,
        image: String,
        #[serde(default)]
        profile: Option<String>,
    },
    Write {
        image: String,
        path: PathBuf,
    },
    LoadTable {
        path: PathBuf,
        table: String,
    },
    SaveTable {
        table: String,
        path: PathBuf,
    },
    ToTable {
        image: String,
        table: String,
    },
    GridTable {
        image: String,
        table: String,
    },
    FromTable {
        table: String,
        template: String,
        columns: Vec<String>,
        output: String,
    },
    Sample {
        image: String,
        points: String,
        output: String,
        #[serde(default)]
        config: SamplerConfig,
    },
    Clip {
        image: String,
        shapes: String,
        output: String,
        #[serde(default)]
        config: ClipperConfig,
    },
    View {
        image: String,
        path: PathBuf,
        #[serde(default)]
        config: serde_yaml::Mapping,
    },
    ViewStatic {
        image: String,
        path: PathBuf,
        #[serde(default)]
        config: serde_yaml::Mapping,
    },
}

impl Step {
    pub fn node(&self) -> &'static str {
        match self {
            Step::Read { .. } => "read",
            Step::Write { .. } => "write",
            Step::LoadTable { .. } => "load_table",
            Step::SaveTable { .. } => "save_table",
            Step::ToTable { .. } => "to_table",
            Step::GridTable { .. } => "grid_table",
            Step::FromTable { .. } => "from_table",
            Step::Sample { .. } => "sample",
            Step::Clip { .. } => "clip",
            Step::View { .. } => "view",
            Step::ViewStatic { .. } => "view_static",
        }
    }

    /// Ports read by this step.
    pub fn inputs(&self) -> Vec<&str> {
        match self {
            Step::Read { .. } | Step::LoadTable { .. } => vec![],
            Step::Write { image, .. }
            | Step::ToTable { image, .. }
            | Step::GridTable { image, .. }
            | Step::View { image, .. }
            | Step::ViewStatic { image, .. } => vec![image.as_str()],
            Step::SaveTable { table, .. } => vec![table.as_str()],
            Step::FromTable {
                table, template, ..
            } => vec![table.as_str(), template.as_str()],
            Step::Sample { image, points, .. } => vec![image.as_str(), points.as_str()],
            Step::Clip { image, shapes, .. } => vec![image.as_str(), shapes.as_str()],
        }
    }

    /// Ports written by this step.
    pub fn outputs(&self) -> Vec<&str> {
        match self {
            Step::Read { image, profile, .. } => {
                let mut out = vec![image.as_str()];
                out.extend(profile.as_deref());
                out
            }
            Step::LoadTable { table, .. }
            | Step::ToTable { table, .. }
            | Step::GridTable { table, .. } => vec![table.as_str()],
            Step::FromTable { output, .. }
            | Step::Sample { output, .. }
            | Step::Clip { output, .. } => vec![output.as_str()],
            Step::Write { .. }
            | Step::SaveTable { .. }
            | Step::View { .. }
            | Step::ViewStatic { .. } => vec![],
        }
    }

    fn run(&self, toolkit: &Toolkit, ports: &mut Ports) -> GeoImageResult<()> {
        match self {
            Step::Read {
                path,
                image,
                profile,
            } => {
                let (bytes, table) = toolkit.read(path)?;
                ports.insert(image, Port::Image(bytes));
                if let Some(profile) = profile {
                    ports.insert(profile, Port::Table(table));
                }
            }
            Step::Write { image, path } => toolkit.write(ports.image(image)?, path)?,
            Step::LoadTable { path, table } => {
                ports.insert(table, Port::Table(nodes::load_table(path)?));
            }
            Step::SaveTable { table, path } => nodes::save_table(path, ports.table(table)?)?,
            Step::ToTable { image, table } => {
                let out = toolkit.to_table(ports.image(image)?)?;
                ports.insert(table, Port::Table(out));
            }
            Step::GridTable { image, table } => {
                let out = toolkit.grid_table(ports.image(image)?)?;
                ports.insert(table, Port::Table(out));
            }
            Step::FromTable {
                table,
                template,
                columns,
                output,
            } => {
                let config = TableToImageConfig::new(columns.iter().cloned());
                let out = toolkit.from_table(ports.table(table)?, ports.image(template)?, &config)?;
                ports.insert(output, Port::Image(out));
            }
            Step::Sample {
                image,
                points,
                output,
                config,
            } => {
                let out = toolkit.sample(ports.image(image)?, ports.table(points)?, config)?;
                ports.insert(output, Port::Table(out));
            }
            Step::Clip {
                image,
                shapes,
                output,
                config,
            } => {
                let out = toolkit.clip(ports.image(image)?, ports.table(shapes)?, config)?;
                ports.insert(output, Port::Image(out));
            }
            Step::View {
                image,
                path,
                config,
            } => {
                let config = overlay(&toolkit.interactive_defaults(), config)?;
                let html = toolkit.view(ports.image(image)?, &config)?;
                nodes::save_bytes(path, html.as_bytes())?;
            }
            Step::ViewStatic {
                image,
                path,
                config,
            } => {
                let config = overlay(&toolkit.static_defaults(), config)?;
                let png = toolkit.view_static(ports.image(image)?, &config)?;
                nodes::save_bytes(path, &png)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub steps: Vec<Step>,
}

impl Pipeline {
    /// Load and parse a pipeline file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| GeoImageError::file_read(path.as_ref(), e))
            .with_context(|| format!("Failed to read pipeline from {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to load pipeline from {:?}", path.as_ref()))
    }

    pub fn from_yaml(content: &str) -> GeoImageResult<Self> {
        let expanded = expand_env_vars(content)?;
        let pipeline: Pipeline = serde_yaml::from_str(&expanded)
            .map_err(|e| GeoImageError::InvalidConfiguration(e.to_string()))?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Every step must read only ports written by an earlier step.
    pub fn validate(&self) -> GeoImageResult<()> {
        if self.steps.is_empty() {
            return Err(GeoImageError::InvalidConfiguration(
                "pipeline has no steps".to_string(),
            ));
        }
        let mut available: HashSet<&str> = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if let Some(port) = step.inputs().into_iter().find(|p| !available.contains(p)) {
                return Err(GeoImageError::InvalidConfiguration(format!(
                    "step {} ({}) reads port '{}' before it is written",
                    index + 1,
                    step.node(),
                    port
                )));
            }
            available.extend(step.outputs());
        }
        Ok(())
    }

    pub fn run(&self, toolkit: &Toolkit) -> Result<Ports> {
        let mut ports = Ports::default();
        for (index, step) in self.steps.iter().enumerate() {
            info!(step = index + 1, node = step.node(), "Running pipeline step");
            step.run(toolkit, &mut ports)
                .with_context(|| format!("step {} ({}) failed", index + 1, step.node()))?;
        }
        info!(steps = self.steps.len(), ports = ports.len(), "Pipeline finished");
        Ok(ports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoimage_common::ErrorKind;

    #[test]
    fn test_parse_steps() {
        let yaml = r#"
steps:
  - node: read
    path: dem.tif
    image: dem
    profile: dem_profile
  - node: to_table
    image: dem
    table: pixels
  - node: from_table
    table: pixels
    template: dem
    columns: [Band_1]
    output: rebuilt
  - node: view_static
    image: rebuilt
    path: dem.png
    config: { vmin: 0, vmax: 100 }
"#;
        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        assert_eq!(pipeline.steps.len(), 4);
        assert_eq!(pipeline.steps[0].outputs(), vec!["dem", "dem_profile"]);
        assert_eq!(pipeline.steps[2].inputs(), vec!["pixels", "dem"]);
        assert_eq!(pipeline.steps[3].node(), "view_static");
    }

    #[test]
    fn test_node_configs_default() {
        let yaml = r#"
steps:
  - node: read
    path: dem.tif
    image: dem
  - node: load_table
    path: aoi.json
    table: aoi
  - node: clip
    image: dem
    shapes: aoi
    output: clipped
    config: { crop: false, bounds_policy: preserve }
  - node: sample
    image: clipped
    points: aoi
    output: values
"#;
        let pipeline = Pipeline::from_yaml(yaml).unwrap();
        match &pipeline.steps[2] {
            Step::Clip { config, .. } => {
                assert!(!config.crop);
                assert_eq!(config.bounds_policy, geoimage::BoundsPolicy::Preserve);
                assert_eq!(config.geometry_column, "geometry");
            }
            other => panic!("unexpected step {:?}", other),
        }
        match &pipeline.steps[3] {
            Step::Sample { config, .. } => {
                assert_eq!(config.out_of_grid, geoimage::OutOfGridPolicy::Nodata)
            }
            other => panic!("unexpected step {:?}", other),
        }
    }

    #[test]
    fn test_unwritten_port() {
        let yaml = r#"
steps:
  - node: write
    image: dem
    path: out.tif
"#;
        let err = Pipeline::from_yaml(yaml).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("'dem'"));
    }

    #[test]
    fn test_unknown_node() {
        let err = Pipeline::from_yaml("steps:\n  - node: reproject\n").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_port_types() {
        let mut ports = Ports::default();
        assert!(ports.is_empty());
        ports.insert("t", Port::Table(Table::new(vec![])));
        assert!(ports.contains("t"));
        assert_eq!(ports.len(), 1);
        assert!(ports.table("t").is_ok());
        assert!(ports.image("t").is_err());
        assert!(ports.image("missing").is_err());
    }
}
