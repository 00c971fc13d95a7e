//! GeoImage command line tool.
//!
//! One subcommand per node plus `run` for YAML pipelines. Images may be
//! GeoTIFF files or encoded envelopes (`.genv`); tables are JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use geoimage::config::DEFAULT_GEOMETRY_COLUMN;
use geoimage::{BoundsPolicy, ClipperConfig, OutOfGridPolicy, SamplerConfig, TableToImageConfig};
use geoimage_cli::nodes::{load_image, load_table, save_bytes, save_image, save_table};
use geoimage_cli::{exit_code, Pipeline, Settings, Toolkit};

#[derive(Parser, Debug)]
#[command(name = "geoimage")]
#[command(version, about = "Read, transform and visualize georeferenced rasters")]
struct Args {
    /// Log level (RUST_LOG takes precedence)
    #[arg(long, env = "GEOIMAGE_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Settings file (YAML)
    #[arg(long, env = "GEOIMAGE_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a GeoTIFF into an envelope and print its profile
    Read {
        /// Input GeoTIFF
        input: PathBuf,
        /// Envelope output file
        output: PathBuf,
        /// Write the profile table here instead of stdout
        #[arg(long)]
        profile: Option<PathBuf>,
    },
    /// Write an envelope as GeoTIFF
    Write {
        /// Input envelope
        input: PathBuf,
        /// Output GeoTIFF (.tif, .tiff, .gtiff)
        output: PathBuf,
    },
    /// One row per pixel with Band_1..Band_n, row and col
    ToTable {
        input: PathBuf,
        /// Output table (JSON)
        output: PathBuf,
    },
    /// First band as a grid table, one row per image row
    GridTable {
        input: PathBuf,
        /// Output table (JSON)
        output: PathBuf,
    },
    /// Build bands from table columns, georeferenced like a template image
    FromTable {
        /// Input table (JSON)
        table: PathBuf,
        /// Template image supplying shape and georeference
        template: PathBuf,
        output: PathBuf,
        /// Value columns, in band order
        #[arg(long, value_delimiter = ',', required = true)]
        columns: Vec<String>,
    },
    /// Append raster values under point geometries
    Sample {
        image: PathBuf,
        /// Point table (JSON)
        points: PathBuf,
        /// Output table (JSON)
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_GEOMETRY_COLUMN)]
        geometry_column: String,
        /// What to do with points outside the grid
        #[arg(long, value_enum, default_value_t = OutOfGrid::Nodata)]
        out_of_grid: OutOfGrid,
    },
    /// Mask (and by default crop) an image to polygons
    Clip {
        image: PathBuf,
        /// Polygon table (JSON)
        shapes: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = DEFAULT_GEOMETRY_COLUMN)]
        geometry_column: String,
        /// Keep the full extent, only mask
        #[arg(long)]
        no_crop: bool,
        /// Bounds carried on the clipped envelope
        #[arg(long, value_enum, default_value_t = Bounds::Recompute)]
        bounds: Bounds,
    },
    /// Interactive Leaflet map (HTML)
    View {
        image: PathBuf,
        output: PathBuf,
        /// "1" or three bands such as "3,2,1"
        #[arg(long, default_value = "1")]
        band: String,
        #[arg(long)]
        colormap: Option<String>,
        #[arg(long)]
        basemap: Option<String>,
        #[arg(long, default_value_t = 0.7)]
        opacity: f64,
    },
    /// Static PNG with colorbar
    ViewStatic {
        image: PathBuf,
        output: PathBuf,
        #[arg(long, default_value = "1")]
        band: String,
        #[arg(long)]
        colormap: Option<String>,
        #[arg(long, default_value_t = 0.1)]
        vmin: f64,
        #[arg(long, default_value_t = 1.0)]
        vmax: f64,
        #[arg(long)]
        title: Option<String>,
    },
    /// Run a YAML pipeline
    Run {
        /// Pipeline file
        pipeline: PathBuf,
    },
    /// List registered colormaps and basemaps
    List,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutOfGrid {
    Nodata,
    Fail,
}

impl From<OutOfGrid> for OutOfGridPolicy {
    fn from(value: OutOfGrid) -> Self {
        match value {
            OutOfGrid::Nodata => OutOfGridPolicy::Nodata,
            OutOfGrid::Fail => OutOfGridPolicy::Fail,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Bounds {
    Recompute,
    Preserve,
}

impl From<Bounds> for BoundsPolicy {
    fn from(value: Bounds) -> Self {
        match value {
            Bounds::Recompute => BoundsPolicy::Recompute,
            Bounds::Preserve => BoundsPolicy::Preserve,
        }
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Err(e) = init_tracing(&args) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "geoimage failed");
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if args.json_logs {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow::anyhow!(e))
}

fn run(args: Args) -> Result<()> {
    let settings = Settings::resolve(args.config.as_deref())?;
    let toolkit = Toolkit::new(settings).context("Invalid settings")?;

    match args.command {
        Command::Read {
            input,
            output,
            profile,
        } => {
            let (image, table) = toolkit.read(&input)?;
            save_image(&toolkit, &output, &image)?;
            match profile {
                Some(path) => save_table(&path, &table)?,
                None => {
                    for row in table.rows() {
                        println!("{:<12} {}", cell(&row[0]), cell(&row[1]));
                    }
                }
            }
        }
        Command::Write { input, output } => {
            let image = load(&toolkit, &input)?;
            toolkit.write(&image, &output)?;
        }
        Command::ToTable { input, output } => {
            let table = toolkit.to_table(&load(&toolkit, &input)?)?;
            save_table(&output, &table)?;
        }
        Command::GridTable { input, output } => {
            let table = toolkit.grid_table(&load(&toolkit, &input)?)?;
            save_table(&output, &table)?;
        }
        Command::FromTable {
            table,
            template,
            output,
            columns,
        } => {
            let image = toolkit.from_table(
                &load_table(&table)?,
                &load(&toolkit, &template)?,
                &TableToImageConfig::new(columns),
            )?;
            save_image(&toolkit, &output, &image)?;
        }
        Command::Sample {
            image,
            points,
            output,
            geometry_column,
            out_of_grid,
        } => {
            let config = SamplerConfig {
                geometry_column,
                out_of_grid: out_of_grid.into(),
            };
            let table = toolkit.sample(&load(&toolkit, &image)?, &load_table(&points)?, &config)?;
            save_table(&output, &table)?;
        }
        Command::Clip {
            image,
            shapes,
            output,
            geometry_column,
            no_crop,
            bounds,
        } => {
            let config = ClipperConfig {
                crop: !no_crop,
                geometry_column,
                bounds_policy: bounds.into(),
            };
            let clipped = toolkit.clip(&load(&toolkit, &image)?, &load_table(&shapes)?, &config)?;
            save_image(&toolkit, &output, &clipped)?;
        }
        Command::View {
            image,
            output,
            band,
            colormap,
            basemap,
            opacity,
        } => {
            let mut config = toolkit.interactive_defaults();
            config.band = band;
            config.opacity = opacity;
            if let Some(colormap) = colormap {
                config.colormap = colormap;
            }
            if let Some(basemap) = basemap {
                config.basemap = basemap;
            }
            let html = toolkit.view(&load(&toolkit, &image)?, &config)?;
            save_bytes(&output, html.as_bytes())?;
        }
        Command::ViewStatic {
            image,
            output,
            band,
            colormap,
            vmin,
            vmax,
            title,
        } => {
            let mut config = toolkit.static_defaults();
            config.band = band;
            config.vmin = vmin;
            config.vmax = vmax;
            if let Some(colormap) = colormap {
                config.colormap = colormap;
            }
            if let Some(title) = title {
                config.title = title;
            }
            let png = toolkit.view_static(&load(&toolkit, &image)?, &config)?;
            save_bytes(&output, &png)?;
        }
        Command::Run { pipeline } => {
            let pipeline = Pipeline::load(&pipeline)?;
            info!(steps = pipeline.steps.len(), "Loaded pipeline");
            pipeline.run(&toolkit)?;
        }
        Command::List => {
            println!("Colormaps:");
            for name in toolkit.colormaps().names() {
                println!("  {name}");
            }
            println!("Basemaps:");
            for name in toolkit.basemaps().names() {
                println!("  {name}");
            }
        }
    }
    Ok(())
}

fn load(toolkit: &Toolkit, path: &Path) -> Result<bytes::Bytes> {
    load_image(toolkit, path).with_context(|| format!("Failed to load image {:?}", path))
}

fn cell(value: &geoimage::Value) -> String {
    match value {
        geoimage::Value::Text(s) => s.clone(),
        other => format!("{:?}", other),
    }
}
