//! Visualization of raster envelopes.
//!
//! - Colormap and basemap registries
//! - Band selection and normalization
//! - PNG encoding
//! - Static PNG view with colorbar
//! - Interactive Leaflet HTML view

pub mod basemap;
pub mod colormap;
pub mod interactive;
pub mod normalize;
pub mod png;
pub mod selection;
pub mod static_view;

pub use basemap::{Basemap, BasemapRegistry, NO_BASEMAP};
pub use colormap::{Color, Colormap, ColormapRegistry};
pub use interactive::{render_interactive, InteractiveViewConfig};
pub use selection::BandSelection;
pub use static_view::{render_static, StaticViewConfig};
