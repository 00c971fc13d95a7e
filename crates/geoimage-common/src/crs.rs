//! Coordinate Reference System identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// EPSG code of WGS84 geographic coordinates (lon/lat in degrees).
pub const EPSG_WGS84: u32 = 4326;

/// EPSG code of Web Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// A coordinate reference system as carried by a raster or geometry column.
///
/// Only the identifier lives here; resolving it to projection parameters is
/// the job of the `projection` crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// An EPSG registry code.
    Epsg(u32),
    /// A PROJ definition string such as `+proj=utm +zone=32 +datum=WGS84`.
    Proj(String),
}

impl Crs {
    /// WGS84 geographic coordinates.
    pub fn wgs84() -> Self {
        Crs::Epsg(EPSG_WGS84)
    }

    /// Parse a CRS string.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:4326"
    /// - "CRS:84" (EPSG:4326 with lon/lat axis order)
    /// - "EPSG:900913" (legacy alias of EPSG:3857)
    /// - "+proj=..." PROJ definition strings
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let trimmed = s.trim();
        if trimmed.starts_with('+') {
            if !trimmed.contains("+proj=") {
                return Err(CrsParseError::InvalidProjString(s.to_string()));
            }
            return Ok(Crs::Proj(trimmed.to_string()));
        }

        let normalized = trimmed.to_uppercase();
        match normalized.as_str() {
            "CRS:84" | "WGS84" => return Ok(Crs::wgs84()),
            "EPSG:900913" => return Ok(Crs::Epsg(EPSG_WEB_MERCATOR)),
            _ => {}
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;
        let code: u32 = code
            .trim()
            .parse()
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))?;
        if code == 0 {
            return Err(CrsParseError::UnsupportedCrs(s.to_string()));
        }
        Ok(Crs::Epsg(code))
    }

    /// The EPSG code, if this CRS is registry based.
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Proj(_) => None,
        }
    }

    /// Whether this is WGS84 lon/lat.
    pub fn is_wgs84(&self) -> bool {
        matches!(self, Crs::Epsg(EPSG_WGS84))
    }
}

impl FromStr for Crs {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Crs::parse(s)
    }
}

impl TryFrom<String> for Crs {
    type Error = CrsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Crs::parse(&value)
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Proj(definition) => write!(f, "{}", definition),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Invalid PROJ string: {0}")]
    InvalidProjString(String),
}
