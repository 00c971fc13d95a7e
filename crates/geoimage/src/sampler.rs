//! Point sampling of raster values.

use crate::bridge::band_column_name;
use crate::config::{OutOfGridPolicy, SamplerConfig};
use crate::envelope::RasterEnvelope;
use crate::table::{ColumnType, Field, Table, Value};
use geoimage_common::{Crs, GeoImageError, GeoImageResult};
use projection::Transformer;
use tracing::{debug, info, warn};

/// Append one `Band_i` column per band holding the value under each point.
///
/// Points are reprojected from the geometry column CRS into the raster CRS
/// (skipped when either is unknown) and resolved with the floor of the
/// inverse transform.
pub fn sample_points(
    envelope: &RasterEnvelope,
    points: &Table,
    config: &SamplerConfig,
) -> GeoImageResult<Table> {
    let field = points
        .schema()
        .require(&config.geometry_column, &[ColumnType::Point])?
        .clone();

    let georef = envelope.georeference();
    let inverse = georef.inverse_transform()?;
    let transformer = point_transformer(field.crs.as_ref(), envelope.crs())?;
    let missing = georef.nodata.unwrap_or(f64::NAN);
    let (count, height, width) = envelope.shape();

    let mut out_of_grid = 0usize;
    let mut sampled = Vec::with_capacity(points.num_rows());
    for (index, cell) in points.column(&config.geometry_column)?.enumerate() {
        let point = match cell {
            Value::Null => {
                sampled.push(vec![Value::Float(missing); count]);
                continue;
            }
            Value::Geometry(g) => g.as_point().ok_or_else(|| {
                GeoImageError::InvalidGeometry(format!(
                    "row {} of '{}' is not a point",
                    index, config.geometry_column
                ))
            })?,
            other => {
                return Err(GeoImageError::InvalidGeometry(format!(
                    "row {} of '{}' holds {:?}",
                    index, config.geometry_column, other
                )))
            }
        };

        let (x, y) = match &transformer {
            Some(t) => t.transform_point(point.x, point.y)?,
            None => (point.x, point.y),
        };

        let cell = inverse.rowcol(x, y);
        let inside = matches!(
            cell,
            Some((row, col)) if row >= 0 && col >= 0 && (row as usize) < height && (col as usize) < width
        );

        let (row, col) = cell.unwrap_or((i64::MIN, i64::MIN));
        if !inside {
            match config.out_of_grid {
                OutOfGridPolicy::Fail => {
                    return Err(GeoImageError::OutOfGrid {
                        x,
                        y,
                        row,
                        col,
                        height,
                        width,
                    })
                }
                OutOfGridPolicy::Nodata => {
                    warn!(
                        row = index,
                        x,
                        y,
                        pixel_row = row,
                        pixel_col = col,
                        "Sample point outside raster grid"
                    );
                    out_of_grid += 1;
                    sampled.push(vec![Value::Float(missing); count]);
                    continue;
                }
            }
        }

        let (row, col) = (row as usize, col as usize);
        sampled.push(
            envelope
                .bands()
                .iter()
                .map(|band| Value::Float(band.values()[row * width + col]))
                .collect(),
        );
    }

    let mut schema = points.schema().clone();
    let mut new_fields = Vec::with_capacity(count);
    for i in 1..=count {
        let name = schema.unique_name(&band_column_name(i));
        let field = Field::new(name, ColumnType::Float);
        schema.fields.push(field.clone());
        new_fields.push(field);
    }
    debug!(
        columns = ?new_fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
        "Appending sampled columns"
    );

    let mut output = points.clone();
    output.extend_columns(new_fields, sampled)?;

    info!(
        points = output.num_rows(),
        bands = count,
        out_of_grid,
        "Sampled raster at points"
    );
    Ok(output)
}

fn point_transformer(
    source: Option<&Crs>,
    target: Option<&Crs>,
) -> GeoImageResult<Option<Transformer>> {
    match (source, target) {
        (Some(s), Some(t)) if s != t => Ok(Some(Transformer::new(s, t)?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{Band, DataType, Georeference};
    use crate::geometry::{Geometry, Point};
    use geoimage_common::GeoTransform;

    fn envelope() -> RasterEnvelope {
        let georef = Georeference::new(
            DataType::Float32,
            3,
            2,
            2,
            GeoTransform::from_origin(100.0, 50.0, 10.0, 10.0),
        )
        .with_nodata(-1.0);
        let b1 = Band::new(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b2 = Band::new(2, 3, vec![10.0, 20.0, 30.0, 40.0, 50.0, 60.0]).unwrap();
        RasterEnvelope::new(vec![b1, b2], georef, None).unwrap()
    }

    fn table(points: &[(f64, f64)]) -> Table {
        let mut t = Table::new(vec![
            Field::new("Band_1", ColumnType::Text),
            Field::geometry("geometry", ColumnType::Point, None),
        ]);
        for &(x, y) in points {
            t.push_row(vec![
                Value::Text("a".into()),
                Geometry::Point(Point::new(x, y)).into(),
            ])
            .unwrap();
        }
        t
    }

    #[test]
    fn test_pixel_centre_sampling() {
        let env = envelope();
        let (x, y) = env.georeference().transform.pixel_center(1, 2);
        let out = sample_points(&env, &table(&[(x, y)]), &SamplerConfig::default()).unwrap();
        let names: Vec<&str> = out.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["Band_1", "geometry", "Band_1_1", "Band_2"]);
        assert_eq!(out.rows()[0][2], Value::Float(6.0));
        assert_eq!(out.rows()[0][3], Value::Float(60.0));
    }

    #[test]
    fn test_out_of_grid_nodata() {
        let out = sample_points(&envelope(), &table(&[(0.0, 0.0)]), &SamplerConfig::default())
            .unwrap();
        assert_eq!(out.rows()[0][2], Value::Float(-1.0));
    }

    #[test]
    fn test_out_of_grid_fail() {
        let config = SamplerConfig {
            out_of_grid: OutOfGridPolicy::Fail,
            ..Default::default()
        };
        // right edge belongs to the next, nonexistent column
        let err = sample_points(&envelope(), &table(&[(130.0, 45.0)]), &config).unwrap_err();
        assert!(matches!(err, GeoImageError::OutOfGrid { col: 3, .. }));
    }

    #[test]
    fn test_wrong_geometry_column() {
        let config = SamplerConfig {
            geometry_column: "Band_1".to_string(),
            ..Default::default()
        };
        let err = sample_points(&envelope(), &table(&[]), &config).unwrap_err();
        assert_eq!(err.kind(), geoimage_common::ErrorKind::Configuration);
    }
}
