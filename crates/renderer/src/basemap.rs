//! Tile layers for the interactive view.

use geoimage_common::{GeoImageError, GeoImageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Selecting this name renders the overlay without a tile layer.
pub const NO_BASEMAP: &str = "Don't show base map";

pub const DEFAULT_BASEMAP: &str = "OpenStreetMap";

/// A slippy-map tile source in Leaflet URL template form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basemap {
    pub name: String,
    pub url: String,
    pub attribution: String,
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
    /// Subdomains substituted for `{s}`.
    #[serde(default)]
    pub subdomains: Option<String>,
}

fn default_max_zoom() -> u8 {
    19
}

impl Basemap {
    pub fn new(name: &str, url: &str, attribution: &str, max_zoom: u8) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            attribution: attribution.to_string(),
            max_zoom,
            subdomains: None,
        }
    }

    pub fn with_subdomains(mut self, subdomains: &str) -> Self {
        self.subdomains = Some(subdomains.to_string());
        self
    }
}

/// Basemaps available by name.
#[derive(Debug, Clone)]
pub struct BasemapRegistry {
    maps: BTreeMap<String, Basemap>,
}

impl Default for BasemapRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl BasemapRegistry {
    pub fn empty() -> Self {
        Self {
            maps: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for basemap in builtin() {
            registry.register(basemap);
        }
        registry
    }

    pub fn register(&mut self, basemap: Basemap) {
        self.maps.insert(basemap.name.clone(), basemap);
    }

    /// Look up a basemap; [`NO_BASEMAP`] resolves to `None`.
    pub fn resolve(&self, name: &str) -> GeoImageResult<Option<&Basemap>> {
        if name == NO_BASEMAP {
            return Ok(None);
        }
        self.maps
            .get(name)
            .map(Some)
            .ok_or_else(|| GeoImageError::UnknownBasemap(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        name == NO_BASEMAP || self.maps.contains_key(name)
    }

    /// Registered names followed by [`NO_BASEMAP`].
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(NO_BASEMAP))
    }
}

fn builtin() -> Vec<Basemap> {
    const OSM: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";
    const CARTO: &str = "&copy; OpenStreetMap contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";
    const ESRI: &str = "Tiles &copy; Esri";
    const GIBS: &str = "Imagery provided by services from the Global Imagery Browse Services (GIBS), operated by NASA/GSFC/ESDIS";

    vec![
        Basemap::new(
            "OpenStreetMap",
            "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            OSM,
            19,
        )
        .with_subdomains("abc"),
        Basemap::new(
            "CartoDB",
            "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
            CARTO,
            20,
        )
        .with_subdomains("abcd"),
        Basemap::new(
            "CartoDB DarkMatter",
            "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
            CARTO,
            20,
        )
        .with_subdomains("abcd"),
        Basemap::new(
            "Esri",
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Street_Map/MapServer/tile/{z}/{y}/{x}",
            ESRI,
            18,
        ),
        Basemap::new(
            "Esri WorldImagery",
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            ESRI,
            18,
        ),
        Basemap::new(
            "OpenTopoMap",
            "https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png",
            "Map data: &copy; OpenStreetMap contributors, SRTM | Map style: &copy; OpenTopoMap (CC-BY-SA)",
            17,
        )
        .with_subdomains("abc"),
        Basemap::new(
            "OpenRailwayMap",
            "https://{s}.tiles.openrailwaymap.org/standard/{z}/{x}/{y}.png",
            "Map data: &copy; OpenStreetMap contributors | Map style: &copy; OpenRailwayMap (CC-BY-SA)",
            19,
        )
        .with_subdomains("abc"),
        Basemap::new(
            "Gaode",
            "https://webrd0{s}.is.autonavi.com/appmaptile?lang=zh_cn&size=1&scale=1&style=8&x={x}&y={y}&z={z}",
            "&copy; <a href=\"https://ditu.amap.com/\">高德地图</a>",
            19,
        )
        .with_subdomains("1234"),
        Basemap::new(
            "NASAGIBS",
            "https://gibs.earthdata.nasa.gov/wmts/epsg3857/best/BlueMarble_ShadedRelief_Bathymetry/default/GoogleMapsCompatible_Level8/{z}/{y}/{x}.jpeg",
            GIBS,
            8,
        ),
    ]
}
