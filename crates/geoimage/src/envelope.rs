//! The in-memory raster exchange unit.
//!
//! A [`RasterEnvelope`] bundles a stack of equally shaped bands with the
//! [`Georeference`] describing how pixels map onto the world. Envelopes are
//! immutable once built: transforms produce new envelopes.

use geoimage_common::{BoundingBox, Crs, GeoImageError, GeoImageResult, GeoTransform};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Driver name written into every profile.
pub const GTIFF_DRIVER: &str = "GTiff";

/// Pixel sample type of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    pub fn is_integer(&self) -> bool {
        !self.is_float()
    }

    pub fn bits(&self) -> u16 {
        match self {
            DataType::Uint8 | DataType::Int8 => 8,
            DataType::Uint16 | DataType::Int16 => 16,
            DataType::Uint32 | DataType::Int32 | DataType::Float32 => 32,
            DataType::Float64 => 64,
        }
    }

    /// Representable `(min, max)` range.
    pub fn range(&self) -> (f64, f64) {
        match self {
            DataType::Uint8 => (u8::MIN as f64, u8::MAX as f64),
            DataType::Int8 => (i8::MIN as f64, i8::MAX as f64),
            DataType::Uint16 => (u16::MIN as f64, u16::MAX as f64),
            DataType::Int16 => (i16::MIN as f64, i16::MAX as f64),
            DataType::Uint32 => (u32::MIN as f64, u32::MAX as f64),
            DataType::Int32 => (i32::MIN as f64, i32::MAX as f64),
            DataType::Float32 => (f32::MIN as f64, f32::MAX as f64),
            DataType::Float64 => (f64::MIN, f64::MAX),
        }
    }

    /// Cast a value into this type's domain.
    ///
    /// Integers are rounded and saturated; NaN becomes `nan_fill` (integer
    /// types cannot hold NaN). Float32 is narrowed through `f32`.
    pub fn cast(&self, value: f64, nan_fill: f64) -> f64 {
        match self {
            DataType::Float64 => value,
            DataType::Float32 => value as f32 as f64,
            _ => {
                let v = if value.is_nan() { nan_fill } else { value };
                if v.is_nan() {
                    return 0.0;
                }
                let (lo, hi) = self.range();
                v.round().clamp(lo, hi)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Int8 => "int8",
            DataType::Uint16 => "uint16",
            DataType::Int16 => "int16",
            DataType::Uint32 => "uint32",
            DataType::Int32 => "int32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = GeoImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uint8" | "byte" => Ok(DataType::Uint8),
            "int8" => Ok(DataType::Int8),
            "uint16" => Ok(DataType::Uint16),
            "int16" => Ok(DataType::Int16),
            "uint32" => Ok(DataType::Uint32),
            "int32" => Ok(DataType::Int32),
            "float32" => Ok(DataType::Float32),
            "float64" => Ok(DataType::Float64),
            other => Err(GeoImageError::invalid_parameter(
                "dtype",
                format!("unknown data type '{}'", other),
            )),
        }
    }
}

/// Georeferencing profile of a raster: CRS, affine transform, nodata,
/// sample type and grid shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Georeference {
    pub driver: String,
    pub dtype: DataType,
    #[serde(default, with = "nodata_repr")]
    pub nodata: Option<f64>,
    pub width: usize,
    pub height: usize,
    pub count: usize,
    #[serde(default)]
    pub crs: Option<Crs>,
    pub transform: GeoTransform,
}

impl Georeference {
    pub fn new(
        dtype: DataType,
        width: usize,
        height: usize,
        count: usize,
        transform: GeoTransform,
    ) -> Self {
        Self {
            driver: GTIFF_DRIVER.to_string(),
            dtype,
            nodata: None,
            width,
            height,
            count,
            crs: None,
            transform,
        }
    }

    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = Some(crs);
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// World bounds of the grid under this transform.
    pub fn bounds(&self) -> BoundingBox {
        self.transform.bounds(self.width, self.height)
    }

    /// Inverse transform, failing when the transform is singular.
    pub fn inverse_transform(&self) -> GeoImageResult<GeoTransform> {
        self.transform
            .inverse()
            .ok_or_else(|| GeoImageError::NonInvertibleTransform(self.transform.to_string()))
    }

    /// Whether `value` counts as missing (NaN or equal to nodata).
    pub fn is_missing(&self, value: f64) -> bool {
        if value.is_nan() {
            return true;
        }
        match self.nodata {
            Some(nd) if nd.is_nan() => false,
            Some(nd) => value == nd,
            None => false,
        }
    }

    /// Value written into masked pixels.
    ///
    /// The profile nodata when set, else NaN for float and 0 for integer types.
    pub fn fill_value(&self) -> f64 {
        match self.nodata {
            Some(nd) => nd,
            None if self.dtype.is_float() => f64::NAN,
            None => 0.0,
        }
    }
}

/// One 2-D grid of samples, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    height: usize,
    width: usize,
    values: Vec<f64>,
}

impl Band {
    pub fn new(height: usize, width: usize, values: Vec<f64>) -> GeoImageResult<Self> {
        if height == 0 || width == 0 {
            return Err(GeoImageError::InvalidRaster(format!(
                "band shape {}x{} is empty",
                height, width
            )));
        }
        if values.len() != height * width {
            return Err(GeoImageError::InvalidRaster(format!(
                "band has {} values, expected {}x{}={}",
                values.len(),
                height,
                width,
                height * width
            )));
        }
        Ok(Self {
            height,
            width,
            values,
        })
    }

    /// Band with every pixel set to `value`.
    pub fn filled(height: usize, width: usize, value: f64) -> GeoImageResult<Self> {
        Self::new(height, width, vec![value; height * width])
    }

    /// Build from nested rows (outer = rows).
    pub fn from_rows(rows: Vec<Vec<f64>>) -> GeoImageResult<Self> {
        let height = rows.len();
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(GeoImageError::InvalidRaster("ragged rows".to_string()));
        }
        Self::new(height, width, rows.into_iter().flatten().collect())
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.height && col < self.width {
            Some(self.values[row * self.width + col])
        } else {
            None
        }
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.values[row * self.width..(row + 1) * self.width]
    }

    /// Copy of the `height x width` window starting at `(row_off, col_off)`.
    pub fn window(
        &self,
        row_off: usize,
        col_off: usize,
        height: usize,
        width: usize,
    ) -> GeoImageResult<Band> {
        if row_off + height > self.height || col_off + width > self.width {
            return Err(GeoImageError::InvalidRaster(format!(
                "window {}x{} at ({}, {}) exceeds {}x{} band",
                height, width, row_off, col_off, self.height, self.width
            )));
        }
        let mut values = Vec::with_capacity(height * width);
        for r in row_off..row_off + height {
            let start = r * self.width + col_off;
            values.extend_from_slice(&self.values[start..start + width]);
        }
        Band::new(height, width, values)
    }

    /// Finite `(min, max)` over values for which `keep` is true.
    pub fn min_max<F>(&self, keep: F) -> Option<(f64, f64)>
    where
        F: Fn(f64) -> bool,
    {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite() && keep(*v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// A multi-band raster plus its georeference and optional bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterEnvelope {
    bands: Vec<Band>,
    georeference: Georeference,
    bounds: Option<BoundingBox>,
}

impl RasterEnvelope {
    /// Build an envelope, checking that bands and profile agree.
    pub fn new(
        bands: Vec<Band>,
        georeference: Georeference,
        bounds: Option<BoundingBox>,
    ) -> GeoImageResult<Self> {
        let first = bands
            .first()
            .ok_or_else(|| GeoImageError::InvalidRaster("envelope has no bands".to_string()))?;
        let (height, width) = (first.height(), first.width());

        if let Some((i, band)) = bands
            .iter()
            .enumerate()
            .find(|(_, b)| b.height() != height || b.width() != width)
        {
            return Err(GeoImageError::InvalidRaster(format!(
                "band {} is {}x{}, band 1 is {}x{}",
                i + 1,
                band.height(),
                band.width(),
                height,
                width
            )));
        }

        if georeference.count != bands.len()
            || georeference.height != height
            || georeference.width != width
        {
            return Err(GeoImageError::InvalidRaster(format!(
                "profile describes {} bands of {}x{}, data has {} bands of {}x{}",
                georeference.count,
                georeference.height,
                georeference.width,
                bands.len(),
                height,
                width
            )));
        }

        Ok(Self {
            bands,
            georeference,
            bounds,
        })
    }

    /// Envelope whose bounds are derived from the transform.
    pub fn with_derived_bounds(bands: Vec<Band>, georeference: Georeference) -> GeoImageResult<Self> {
        let bounds = georeference.bounds();
        Self::new(bands, georeference, Some(bounds))
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Band by 1-based index.
    pub fn band(&self, index: usize) -> Option<&Band> {
        index.checked_sub(1).and_then(|i| self.bands.get(i))
    }

    pub fn georeference(&self) -> &Georeference {
        &self.georeference
    }

    /// Explicitly tracked bounds, if any.
    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    /// Tracked bounds, falling back to the transform-derived extent.
    pub fn effective_bounds(&self) -> BoundingBox {
        self.bounds.unwrap_or_else(|| self.georeference.bounds())
    }

    pub fn count(&self) -> usize {
        self.bands.len()
    }

    pub fn height(&self) -> usize {
        self.georeference.height
    }

    pub fn width(&self) -> usize {
        self.georeference.width
    }

    /// `(count, height, width)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.count(), self.height(), self.width())
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.georeference.crs.as_ref()
    }
}

/// Serde adapter keeping non-finite nodata values (NaN, ±inf) through JSON.
mod nodata_repr {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            None => serializer.serialize_none(),
            Some(v) if v.is_nan() => Repr::Text("nan".to_string()).serialize(serializer),
            Some(v) if v.is_infinite() && *v > 0.0 => {
                Repr::Text("inf".to_string()).serialize(serializer)
            }
            Some(v) if v.is_infinite() => Repr::Text("-inf".to_string()).serialize(serializer),
            Some(v) => Repr::Number(*v).serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Number(v)) => Ok(Some(v)),
            Some(Repr::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("invalid nodata '{}'", s))),
        }
    }
}
