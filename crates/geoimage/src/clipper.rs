//! Polygon masking and cropping.

use crate::config::{BoundsPolicy, ClipperConfig};
use crate::envelope::{Band, RasterEnvelope};
use crate::geometry::{Geometry, Polygon};
use crate::table::{ColumnType, Table, Value};
use geoimage_common::{BoundingBox, GeoImageError, GeoImageResult};
use projection::Transformer;
use tracing::{debug, info};

/// Pixel window `(row_off, col_off, height, width)`.
type Window = (usize, usize, usize, usize);

/// Mask (and optionally crop) a raster to the union of the polygons in
/// `config.geometry_column`.
///
/// A pixel is kept when its centre lies inside any polygon. Masked pixels
/// take the profile nodata, else NaN for float and 0 for integer types, and
/// that fill becomes the output nodata. The input envelope is untouched.
pub fn clip_raster(
    envelope: &RasterEnvelope,
    shapes: &Table,
    config: &ClipperConfig,
) -> GeoImageResult<RasterEnvelope> {
    let field = shapes
        .schema()
        .require(&config.geometry_column, &[ColumnType::Polygon])?
        .clone();

    let georef = envelope.georeference();
    let inverse = georef.inverse_transform()?;

    let transformer = match (field.crs.as_ref(), envelope.crs()) {
        (Some(s), Some(t)) if s != t => Some(Transformer::new(s, t)?),
        _ => None,
    };

    let mut geometries = Vec::new();
    for cell in shapes.column(&config.geometry_column)? {
        let geometry = match cell {
            Value::Null => continue,
            Value::Geometry(g) => g,
            other => {
                return Err(GeoImageError::InvalidGeometry(format!(
                    "'{}' holds {:?}",
                    config.geometry_column, other
                )))
            }
        };
        let geometry = match &transformer {
            Some(t) => geometry.try_map_coords(|x, y| Ok(t.transform_point(x, y)?))?,
            None => geometry.clone(),
        };
        geometries.push(geometry);
    }

    let polygons: Vec<(Polygon, BoundingBox)> = geometries
        .iter()
        .flat_map(Geometry::polygons)
        .filter_map(|p| p.bounds().map(|b| (p.clone(), b)))
        .collect();

    let raster_bounds = georef.bounds();
    if !polygons.iter().any(|(_, b)| b.intersects(&raster_bounds)) {
        return Err(GeoImageError::NoOverlap(format!(
            "{} polygon(s), raster extent {}",
            polygons.len(),
            raster_bounds
        )));
    }

    let window = if config.crop {
        let union = polygons
            .iter()
            .map(|(_, b)| *b)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(raster_bounds);
        crop_window(&union, &inverse, envelope.height(), envelope.width())?
    } else {
        (0, 0, envelope.height(), envelope.width())
    };
    let (row_off, col_off, height, width) = window;
    debug!(row_off, col_off, height, width, crop = config.crop, "Clip window");

    let fill = georef.fill_value();
    let mut mask = Vec::with_capacity(height * width);
    for r in 0..height {
        for c in 0..width {
            let (x, y) = georef.transform.pixel_center(r + row_off, c + col_off);
            mask.push(
                polygons
                    .iter()
                    .any(|(p, b)| b.contains_point(x, y) && p.contains_point(x, y)),
            );
        }
    }

    let kept = mask.iter().filter(|m| **m).count();
    if kept == 0 && !polygons.iter().any(|(p, _)| p.intersects_bbox(&raster_bounds)) {
        return Err(GeoImageError::NoOverlap(format!(
            "no polygon area falls on the raster extent {}",
            raster_bounds
        )));
    }

    let bands = envelope
        .bands()
        .iter()
        .map(|band| {
            let windowed = band.window(row_off, col_off, height, width)?;
            let values = windowed
                .into_values()
                .into_iter()
                .zip(&mask)
                .map(|(v, inside)| if *inside { v } else { fill })
                .collect();
            Band::new(height, width, values)
        })
        .collect::<GeoImageResult<Vec<_>>>()?;

    let mut out_georef = georef.clone();
    out_georef.transform = georef.transform.translate(col_off as f64, row_off as f64);
    out_georef.width = width;
    out_georef.height = height;
    out_georef.nodata = Some(fill);

    let bounds = match config.bounds_policy {
        BoundsPolicy::Recompute => Some(out_georef.bounds()),
        BoundsPolicy::Preserve => envelope.bounds().copied(),
    };

    info!(
        polygons = polygons.len(),
        height,
        width,
        kept_pixels = kept,
        "Clipped raster to polygons"
    );
    RasterEnvelope::new(bands, out_georef, bounds)
}

/// Pixel window covering `bounds`, clamped to the grid.
fn crop_window(
    bounds: &BoundingBox,
    inverse: &geoimage_common::GeoTransform,
    height: usize,
    width: usize,
) -> GeoImageResult<Window> {
    let corners = [
        inverse.pixel_to_world(bounds.left, bounds.bottom),
        inverse.pixel_to_world(bounds.left, bounds.top),
        inverse.pixel_to_world(bounds.right, bounds.bottom),
        inverse.pixel_to_world(bounds.right, bounds.top),
    ];
    let cols = corners.iter().map(|(c, _)| *c);
    let rows = corners.iter().map(|(_, r)| *r);

    let clamp = |v: f64, max: usize| -> usize {
        if v.is_nan() || v <= 0.0 {
            0
        } else if v >= max as f64 {
            max
        } else {
            v as usize
        }
    };

    let col_start = clamp(cols.clone().fold(f64::INFINITY, f64::min).floor(), width);
    let col_end = clamp(cols.fold(f64::NEG_INFINITY, f64::max).ceil(), width);
    let row_start = clamp(rows.clone().fold(f64::INFINITY, f64::min).floor(), height);
    let row_end = clamp(rows.fold(f64::NEG_INFINITY, f64::max).ceil(), height);

    if col_end <= col_start || row_end <= row_start {
        return Err(GeoImageError::NoOverlap(format!(
            "polygon extent {} covers no pixels",
            bounds
        )));
    }
    Ok((row_start, col_start, row_end - row_start, col_end - col_start))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{DataType, Georeference};
    use crate::table::Field;
    use geoimage_common::GeoTransform;

    fn envelope(dtype: DataType, nodata: Option<f64>) -> RasterEnvelope {
        let mut georef = Georeference::new(
            dtype,
            4,
            4,
            1,
            GeoTransform::from_origin(0.0, 4.0, 1.0, 1.0),
        );
        georef.nodata = nodata;
        let band = Band::new(4, 4, (1..=16).map(|v| v as f64).collect()).unwrap();
        RasterEnvelope::with_derived_bounds(vec![band], georef).unwrap()
    }

    fn shapes(wkt: &[&str]) -> Table {
        let mut t = Table::new(vec![Field::new("geometry", ColumnType::Polygon)]);
        for w in wkt {
            t.push_row(vec![Geometry::from_wkt(w).unwrap().into()]).unwrap();
        }
        t
    }

    #[test]
    fn test_crop_to_sub_square() {
        let env = envelope(DataType::Float32, Some(-9999.0));
        let out = clip_raster(
            &env,
            &shapes(&["POLYGON ((1 1, 3 1, 3 3, 1 3, 1 1))"]),
            &ClipperConfig::default(),
        )
        .unwrap();
        assert_eq!(out.shape(), (1, 2, 2));
        assert_eq!(out.bands()[0].values(), &[6.0, 7.0, 10.0, 11.0]);
        assert_eq!(out.georeference().transform.c, 1.0);
        assert_eq!(out.georeference().transform.f, 3.0);
        assert_eq!(out.bounds(), Some(&BoundingBox::new(1.0, 1.0, 3.0, 3.0)));
        // input untouched
        assert_eq!(env.shape(), (1, 4, 4));
    }

    #[test]
    fn test_preserve_bounds_policy() {
        let env = envelope(DataType::Float32, None);
        let config = ClipperConfig {
            bounds_policy: BoundsPolicy::Preserve,
            ..Default::default()
        };
        let out = clip_raster(&env, &shapes(&["POLYGON ((1 1, 3 1, 3 3, 1 3, 1 1))"]), &config)
            .unwrap();
        assert_eq!(out.bounds(), env.bounds());
    }

    #[test]
    fn test_mask_without_crop_uses_type_fill() {
        let env = envelope(DataType::Uint8, None);
        let config = ClipperConfig {
            crop: false,
            ..Default::default()
        };
        let out = clip_raster(&env, &shapes(&["POLYGON ((0 4, 1 4, 1 3, 0 3, 0 4))"]), &config)
            .unwrap();
        assert_eq!(out.shape(), (1, 4, 4));
        let values = out.bands()[0].values();
        assert_eq!(values[0], 1.0);
        assert!(values[1..].iter().all(|v| *v == 0.0));
        assert_eq!(out.georeference().nodata, Some(0.0));
    }

    #[test]
    fn test_hole_is_masked() {
        let env = envelope(DataType::Float64, None);
        let out = clip_raster(
            &env,
            &shapes(&["POLYGON ((0 0, 4 0, 4 4, 0 4, 0 0), (1 1, 3 1, 3 3, 1 3, 1 1))"]),
            &ClipperConfig::default(),
        )
        .unwrap();
        let values = out.bands()[0].values();
        assert!(values[5].is_nan());
        assert_eq!(values[0], 1.0);
    }

    #[test]
    fn test_disjoint_polygon_fails() {
        let env = envelope(DataType::Float32, None);
        for crop in [true, false] {
            let config = ClipperConfig {
                crop,
                ..Default::default()
            };
            for wkt in [
                "POLYGON ((10 10, 11 10, 11 11, 10 11, 10 10))",
                // bounding box overlaps the raster corner, the area does not
                "POLYGON ((3.9 10, 10 3.9, 10 10, 3.9 10))",
            ] {
                let err = clip_raster(&env, &shapes(&[wkt]), &config).unwrap_err();
                assert!(matches!(err, GeoImageError::NoOverlap(_)), "{} crop={}", wkt, crop);
            }
        }
    }
}
