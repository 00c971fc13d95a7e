//! Named color ramps.

use geoimage_common::{GeoImageError, GeoImageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default palette for both views.
pub const DEFAULT_COLORMAP: &str = "viridis";

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Parse hex color string to RGB
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some((r, g, b))
}

/// Linear color interpolation
fn interpolate_color(color1: Color, color2: Color, t: f64) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;
    let mix = |a: u8, b: u8| (a as f64 * t_inv + b as f64 * t).round() as u8;

    Color::new(
        mix(color1.r, color2.r),
        mix(color1.g, color2.g),
        mix(color1.b, color2.b),
        mix(color1.a, color2.a),
    )
}

/// Evenly spaced color stops sampled by linear interpolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colormap {
    name: String,
    stops: Vec<Color>,
}

impl Colormap {
    /// Build from at least two hex stops (`#rrggbb`).
    pub fn from_hex(name: impl Into<String>, stops: &[&str]) -> GeoImageResult<Self> {
        let name = name.into();
        if stops.len() < 2 {
            return Err(GeoImageError::InvalidConfiguration(format!(
                "color map '{}' needs at least two stops",
                name
            )));
        }
        let stops = stops
            .iter()
            .map(|hex| {
                hex_to_rgb(hex)
                    .map(|(r, g, b)| Color::rgb(r, g, b))
                    .ok_or_else(|| {
                        GeoImageError::InvalidConfiguration(format!(
                            "color map '{}': invalid hex color '{}'",
                            name, hex
                        ))
                    })
            })
            .collect::<GeoImageResult<Vec<_>>>()?;
        Ok(Self { name, stops })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color at `t` in `[0, 1]`; values outside are clamped and NaN is
    /// transparent.
    pub fn sample(&self, t: f64) -> Color {
        if t.is_nan() {
            return Color::transparent();
        }
        let t = t.clamp(0.0, 1.0);
        let last = self.stops.len() - 1;
        let pos = t * last as f64;
        let low = (pos.floor() as usize).min(last);
        let high = (low + 1).min(last);
        interpolate_color(self.stops[low], self.stops[high], pos - low as f64)
    }
}

/// User-supplied palette, as it appears in a settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColormapDefinition {
    pub name: String,
    pub stops: Vec<String>,
}

/// Palettes available by name.
#[derive(Debug, Clone)]
pub struct ColormapRegistry {
    maps: BTreeMap<String, Colormap>,
}

impl Default for ColormapRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ColormapRegistry {
    pub fn empty() -> Self {
        Self {
            maps: BTreeMap::new(),
        }
    }

    /// Registry preloaded with the built-in palettes.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for (name, stops) in BUILTIN {
            // built-in stops are valid hex
            if let Ok(map) = Colormap::from_hex(*name, stops) {
                registry.maps.insert(map.name.clone(), map);
            }
        }
        registry
    }

    /// Add or replace a palette.
    pub fn register(&mut self, colormap: Colormap) {
        self.maps.insert(colormap.name.clone(), colormap);
    }

    pub fn register_definition(&mut self, def: &ColormapDefinition) -> GeoImageResult<()> {
        let stops: Vec<&str> = def.stops.iter().map(String::as_str).collect();
        self.register(Colormap::from_hex(def.name.clone(), &stops)?);
        Ok(())
    }

    pub fn get(&self, name: &str) -> GeoImageResult<&Colormap> {
        self.maps
            .get(name)
            .ok_or_else(|| GeoImageError::UnknownColormap(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.maps.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }
}

const BUILTIN: &[(&str, &[&str])] = &[
    (
        "viridis",
        &[
            "#440154", "#472d7b", "#3b528b", "#2c728e", "#21918c", "#28ae80", "#5ec962",
            "#addc30", "#fde725",
        ],
    ),
    (
        "plasma",
        &[
            "#0d0887", "#46039f", "#7201a8", "#9c179e", "#bd3786", "#d8576b", "#ed7953",
            "#fb9f3a", "#fdca26", "#f0f921",
        ],
    ),
    (
        "inferno",
        &[
            "#000004", "#1b0c41", "#4a0c6b", "#781c6d", "#a52c60", "#cf4446", "#ed6925",
            "#fb9b06", "#f7d13d", "#fcffa4",
        ],
    ),
    (
        "magma",
        &[
            "#000004", "#180f3d", "#440f76", "#721f81", "#9e2f7f", "#cd4071", "#f1605d",
            "#fd9668", "#feca8d", "#fcfdbf",
        ],
    ),
    (
        "cividis",
        &[
            "#00224e", "#123570", "#3b496c", "#575d6d", "#707173", "#8a8779", "#a69d75",
            "#c4b56c", "#e4cf5b", "#fee838",
        ],
    ),
    (
        "Greys",
        &[
            "#ffffff", "#f0f0f0", "#d9d9d9", "#bdbdbd", "#969696", "#737373", "#525252",
            "#252525", "#000000",
        ],
    ),
    (
        "Purples",
        &[
            "#fcfbfd", "#efedf5", "#dadaeb", "#bcbddc", "#9e9ac8", "#807dba", "#6a51a3",
            "#54278f", "#3f007d",
        ],
    ),
    (
        "Blues",
        &[
            "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5",
            "#08519c", "#08306b",
        ],
    ),
    (
        "Greens",
        &[
            "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45",
            "#006d2c", "#00441b",
        ],
    ),
    (
        "Oranges",
        &[
            "#fff5eb", "#fee6ce", "#fdd0a2", "#fdae6b", "#fd8d3c", "#f16913", "#d94801",
            "#a63603", "#7f2704",
        ],
    ),
    (
        "Reds",
        &[
            "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d",
            "#a50f15", "#67000d",
        ],
    ),
    (
        "YlOrBr",
        &[
            "#ffffe5", "#fff7bc", "#fee391", "#fec44f", "#fe9929", "#ec7014", "#cc4c02",
            "#993404", "#662506",
        ],
    ),
    (
        "YlGnBu",
        &[
            "#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4", "#1d91c0", "#225ea8",
            "#253494", "#081d58",
        ],
    ),
    ("cool", &["#00ffff", "#ff00ff"]),
    ("hot", &["#0b0000", "#ff0000", "#ffff00", "#ffffff"]),
    ("spring", &["#ff00ff", "#ffff00"]),
];
