//! Static PNG view of an envelope.
//!
//! One band is drawn through a colormap with fixed `vmin`/`vmax` and a
//! horizontal colorbar underneath; three bands are drawn as a true-color
//! composite. The title is drawn above the plot and also stored in a PNG
//! `tEXt` chunk.

use crate::colormap::{Colormap, ColormapRegistry, DEFAULT_COLORMAP};
use crate::normalize::{colorize, compose_rgb, composite_unit, scale_range};
use crate::png::create_png_with_text;
use crate::selection::BandSelection;
use geoimage::envelope::RasterEnvelope;
use geoimage::progress::Progress;
use geoimage_common::{GeoImageError, GeoImageResult};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut, text_size,
};
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Embedded font data - DejaVu Sans Mono
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

pub const DEFAULT_TITLE: &str = "Static GeoImage View";

const MARGIN: u32 = 40;
const COLORBAR_HEIGHT: u32 = 20;
const COLORBAR_GAP: u32 = 30;
const MIN_CANVAS: u32 = 200;
const TITLE_SIZE: f32 = 22.0;
const LABEL_SIZE: f32 = 14.0;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticViewConfig {
    pub band: String,
    pub colormap: String,
    pub vmin: f64,
    pub vmax: f64,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for StaticViewConfig {
    fn default() -> Self {
        Self {
            band: "1".to_string(),
            colormap: DEFAULT_COLORMAP.to_string(),
            vmin: 0.1,
            vmax: 1.0,
            title: DEFAULT_TITLE.to_string(),
            width: 800,
            height: 600,
        }
    }
}

impl StaticViewConfig {
    pub fn configure(&self, colormaps: &ColormapRegistry) -> GeoImageResult<()> {
        colormaps.get(&self.colormap)?;
        if !(self.vmin < self.vmax) {
            return Err(GeoImageError::InvalidConfiguration(format!(
                "vmin ({}) must be below vmax ({})",
                self.vmin, self.vmax
            )));
        }
        if self.width < MIN_CANVAS || self.height < MIN_CANVAS {
            return Err(GeoImageError::InvalidConfiguration(format!(
                "canvas {}x{} is smaller than {}x{}",
                self.width, self.height, MIN_CANVAS, MIN_CANVAS
            )));
        }
        Ok(())
    }
}

/// Render a static PNG of one or three bands.
pub fn render_static(
    envelope: &RasterEnvelope,
    config: &StaticViewConfig,
    colormaps: &ColormapRegistry,
    progress: &dyn Progress,
) -> GeoImageResult<Vec<u8>> {
    config.configure(colormaps)?;
    progress.report(0.1, "Loading raster data and metadata...");

    let selection = BandSelection::parse(&config.band, envelope.count())?;
    let georef = envelope.georeference();
    let bands = envelope.bands();
    let width = envelope.width();

    let mut canvas = RgbaImage::from_pixel(config.width, config.height, WHITE);
    let colormap = colormaps.get(&config.colormap)?;

    let (pixels, colorbar) = match selection {
        BandSelection::Single(b) => {
            progress.report(0.3, "Creating grayscale plot...");
            let values = scale_range(&bands[b - 1], georef, config.vmin, config.vmax);
            (colorize(&values, width, colormap), true)
        }
        BandSelection::Rgb([r, g, b]) => {
            progress.report(0.3, "Creating RGB plot...");
            let pixels = compose_rgb(
                &composite_unit(&bands[r - 1], georef),
                &composite_unit(&bands[g - 1], georef),
                &composite_unit(&bands[b - 1], georef),
                width,
            );
            (pixels, false)
        }
    };

    let raster = RgbaImage::from_raw(width as u32, envelope.height() as u32, pixels)
        .ok_or_else(|| GeoImageError::Render("pixel buffer does not match raster shape".to_string()))?;

    let plot_bottom = if colorbar {
        config.height - MARGIN - COLORBAR_HEIGHT - COLORBAR_GAP
    } else {
        config.height - MARGIN
    };
    let plot = Rect::at(MARGIN as i32, MARGIN as i32)
        .of_size(config.width - 2 * MARGIN, plot_bottom - MARGIN);
    draw_raster(&mut canvas, &raster, plot);

    let font = Font::try_from_bytes(FONT_DATA);
    if font.is_none() {
        warn!("Failed to load font, static view is drawn without text");
    }
    if let Some(font) = &font {
        draw_centered_text(&mut canvas, font, TITLE_SIZE, &config.title, config.width as i32 / 2, 9);
    }
    if colorbar {
        let bar = Rect::at((MARGIN * 2) as i32, (plot_bottom + COLORBAR_GAP) as i32)
            .of_size(config.width - 4 * MARGIN, COLORBAR_HEIGHT);
        draw_colorbar(&mut canvas, colormap, bar);
        if let Some(font) = &font {
            let mid = (config.vmin + config.vmax) / 2.0;
            let label_top = bar.bottom() + 8;
            for (x, value) in [
                (bar.left(), config.vmin),
                (bar.left() + bar.width() as i32 / 2, mid),
                (bar.right(), config.vmax),
            ] {
                draw_centered_text(&mut canvas, font, LABEL_SIZE, &tick_label(value), x, label_top);
            }
        }
    }

    progress.report(0.6, "Exporting plot...");
    let png = create_png_with_text(
        canvas.as_raw(),
        config.width as usize,
        config.height as usize,
        &[("Title", config.title.as_str())],
    )?;
    progress.report(0.9, "Static view rendered.");

    info!(
        bands = %selection,
        colormap = %config.colormap,
        bytes = png.len(),
        "Rendered static view"
    );
    Ok(png)
}

/// Scale the raster to fit `area` (nearest neighbour, aspect kept) and
/// blend it in centred.
fn draw_raster(canvas: &mut RgbaImage, raster: &RgbaImage, area: Rect) {
    let (w, h) = raster.dimensions();
    let scale = (area.width() as f64 / w as f64).min(area.height() as f64 / h as f64);
    let fit_w = ((w as f64 * scale).floor() as u32).max(1);
    let fit_h = ((h as f64 * scale).floor() as u32).max(1);
    let resized = imageops::resize(raster, fit_w, fit_h, imageops::FilterType::Nearest);

    let x = area.left() as i64 + (area.width() - fit_w) as i64 / 2;
    let y = area.top() as i64 + (area.height() - fit_h) as i64 / 2;
    debug!(fit_w, fit_h, x, y, "Placing raster on canvas");
    imageops::overlay(canvas, &resized, x, y);
}

/// Horizontal ramp from `vmin` (left) to `vmax` (right) with end and
/// centre ticks.
fn draw_colorbar(canvas: &mut RgbaImage, colormap: &Colormap, bar: Rect) {
    let steps = bar.width().max(2) - 1;
    for i in 0..bar.width() {
        let color = colormap.sample(i as f64 / steps as f64);
        draw_filled_rect_mut(
            canvas,
            Rect::at(bar.left() + i as i32, bar.top()).of_size(1, bar.height()),
            Rgba(color.to_array()),
        );
    }
    draw_hollow_rect_mut(canvas, bar, BLACK);

    let tick_top = (bar.bottom() + 1) as f32;
    for x in [bar.left(), bar.left() + bar.width() as i32 / 2, bar.right()] {
        draw_line_segment_mut(canvas, (x as f32, tick_top), (x as f32, tick_top + 5.0), BLACK);
    }
}

/// Draw `text` horizontally centred on `center_x` with its top at `top`.
fn draw_centered_text(
    canvas: &mut RgbaImage,
    font: &Font,
    size: f32,
    text: &str,
    center_x: i32,
    top: i32,
) {
    if text.is_empty() {
        return;
    }
    let scale = Scale::uniform(size);
    let (text_width, _) = text_size(scale, font, text);
    let x = (center_x - text_width / 2).max(0);
    draw_text_mut(canvas, BLACK, x, top, scale, font, text);
}

/// Up to three decimals, trailing zeros dropped; scientific notation for
/// very large or very small magnitudes.
fn tick_label(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-3..1e6).contains(&magnitude) {
        return format!("{:.2e}", value);
    }
    let text = format!("{:.3}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoimage::envelope::{Band, DataType, Georeference};
    use geoimage::progress::NoProgress;
    use geoimage_common::GeoTransform;

    fn envelope(count: usize) -> RasterEnvelope {
        let georef = Georeference::new(
            DataType::Float32,
            4,
            2,
            count,
            GeoTransform::from_origin(0.0, 2.0, 1.0, 1.0),
        );
        let bands = (0..count)
            .map(|_| Band::new(2, 4, vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0, f64::NAN, 0.5]).unwrap())
            .collect();
        RasterEnvelope::with_derived_bounds(bands, georef).unwrap()
    }

    #[test]
    fn test_single_band_canvas_size() {
        let png = render_static(
            &envelope(1),
            &StaticViewConfig::default(),
            &ColormapRegistry::with_defaults(),
            &NoProgress,
        )
        .unwrap();
        let img = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (800, 600));
    }

    fn has_ink(img: &RgbaImage, rows: std::ops::Range<u32>, cols: std::ops::Range<u32>) -> bool {
        rows.flat_map(|y| cols.clone().map(move |x| (x, y)))
            .any(|(x, y)| img.get_pixel(x, y).0[..3].iter().any(|c| *c < 128))
    }

    fn render(config: &StaticViewConfig) -> RgbaImage {
        let png = render_static(
            &envelope(1),
            config,
            &ColormapRegistry::with_defaults(),
            &NoProgress,
        )
        .unwrap();
        image::load_from_memory(&png).unwrap().to_rgba8()
    }

    #[test]
    fn test_title_is_drawn() {
        let img = render(&StaticViewConfig::default());
        assert!(has_ink(&img, 0..MARGIN, 0..800));

        let untitled = render(&StaticViewConfig {
            title: String::new(),
            ..Default::default()
        });
        assert!(!has_ink(&untitled, 0..MARGIN, 0..800));
    }

    #[test]
    fn test_colorbar_labels_are_drawn() {
        let img = render(&StaticViewConfig::default());
        // below the colorbar tick marks, around the vmin and vmax ends
        assert!(has_ink(&img, 566..590, 50..110));
        assert!(has_ink(&img, 566..590, 690..750));
    }

    #[test]
    fn test_tick_label() {
        assert_eq!(tick_label(0.1), "0.1");
        assert_eq!(tick_label(1.0), "1");
        assert_eq!(tick_label(0.55), "0.55");
        assert_eq!(tick_label(-2.5), "-2.5");
        assert_eq!(tick_label(0.0), "0");
        assert_eq!(tick_label(1.5e7), "1.50e7");
    }

    #[test]
    fn test_vmin_not_below_vmax() {
        let config = StaticViewConfig {
            vmin: 1.0,
            vmax: 1.0,
            ..Default::default()
        };
        let err = config.configure(&ColormapRegistry::with_defaults()).unwrap_err();
        assert_eq!(err.kind(), geoimage_common::ErrorKind::Configuration);
    }

    #[test]
    fn test_unknown_colormap() {
        let config = StaticViewConfig {
            colormap: "rainbow".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.configure(&ColormapRegistry::with_defaults()),
            Err(GeoImageError::UnknownColormap(_))
        ));
    }
}
