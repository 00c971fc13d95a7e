//! End-to-end tests for the table bridge, point sampler, polygon clipper and
//! envelope codec.

use geoimage::bridge::{band_to_grid_table, bands_from_table, to_table};
use geoimage::codec::{self, EnvelopeVersion};
use geoimage::envelope::{Band, DataType, Georeference, RasterEnvelope};
use geoimage::geometry::{Geometry, Point};
use geoimage::table::{ColumnType, Field, Table, Value};
use geoimage::{clip_raster, sample_points, ClipperConfig, SamplerConfig};
use geoimage_common::{Crs, ErrorKind, GeoImageError, GeoTransform};
use test_utils::{
    assert_approx_eq, assert_bits_eq, create_grid_with_nans, create_test_grid, grid, wkt,
};

fn unit_envelope(values: Vec<f64>, nodata: Option<f64>) -> RasterEnvelope {
    let spec = grid::UNIT_4X4;
    let mut georef = Georeference::new(
        DataType::Float64,
        spec.width,
        spec.height,
        1,
        GeoTransform::from_origin(spec.west, spec.north, spec.xsize, spec.ysize),
    );
    georef.nodata = nodata;
    let band = Band::new(spec.height, spec.width, values).unwrap();
    RasterEnvelope::with_derived_bounds(vec![band], georef).unwrap()
}

fn polygons(shapes: &[&str]) -> Table {
    let mut table = Table::new(vec![Field::new("geometry", ColumnType::Polygon)]);
    for shape in shapes {
        table
            .push_row(vec![Geometry::from_wkt(shape).unwrap().into()])
            .unwrap();
    }
    table
}

// ============================================================================
// table bridge
// ============================================================================

#[test]
fn test_two_by_two_table_layout() {
    let georef = Georeference::new(
        DataType::Float32,
        2,
        2,
        1,
        GeoTransform::from_origin(0.0, 2.0, 1.0, 1.0),
    );
    let band = Band::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    let env = RasterEnvelope::with_derived_bounds(vec![band], georef).unwrap();

    let table = to_table(&env);
    let names: Vec<&str> = table.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["Band_1", "row", "col"]);
    let expected = [(1.0, 0, 0), (2.0, 0, 1), (3.0, 1, 0), (4.0, 1, 1)];
    for (row, (v, r, c)) in table.rows().iter().zip(expected) {
        assert_eq!(row[0], Value::Float(v));
        assert_eq!(row[1], Value::Int(r));
        assert_eq!(row[2], Value::Int(c));
    }
}

#[test]
fn test_bridge_roundtrip_is_bitwise() {
    let env = unit_envelope(create_grid_with_nans(4, 4, 3), Some(-1.0));
    let table = to_table(&env);
    let back = bands_from_table(&table, &["Band_1".to_string()], &env).unwrap();

    assert_bits_eq!(back.bands()[0].values(), env.bands()[0].values());
    assert_eq!(back.georeference(), env.georeference());
    assert_eq!(back.bounds(), env.bounds());
}

#[test]
fn test_bridge_survives_json() {
    let env = unit_envelope(create_test_grid(4, 4), None);
    let json = to_table(&env).to_json().unwrap();
    let table = Table::from_json(&json).unwrap();
    let back = bands_from_table(&table, &["Band_1".to_string()], &env).unwrap();
    assert_eq!(back.bands()[0].values(), env.bands()[0].values());
}

#[test]
fn test_from_table_rejects_wrong_row_count() {
    let env = unit_envelope(create_test_grid(4, 4), None);
    let table = to_table(&env);
    let mut short = Table::new(table.fields().to_vec());
    for row in table.rows().iter().take(15) {
        short.push_row(row.clone()).unwrap();
    }
    let err = bands_from_table(&short, &["Band_1".to_string()], &env).unwrap_err();
    assert!(matches!(
        err,
        GeoImageError::ShapeMismatch {
            expected: 16,
            actual: 15
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Value);
}

#[test]
fn test_grid_table_matches_first_band() {
    let env = unit_envelope(create_test_grid(4, 4), None);
    let table = band_to_grid_table(&env);
    assert_eq!(table.num_rows(), 4);
    assert_eq!(table.num_columns(), 4);
    assert_eq!(table.rows()[2][3], Value::Float(3002.0));
}

// ============================================================================
// point sampler
// ============================================================================

#[test]
fn test_sample_reprojected_points() {
    // 1 km cells in UTM 32N around Zurich
    let georef = Georeference::new(
        DataType::Float32,
        25,
        15,
        1,
        GeoTransform::from_origin(455_000.0, 5_255_000.0, 1000.0, 1000.0),
    )
    .with_crs(Crs::Epsg(32632));
    let band = Band::new(15, 25, create_test_grid(25, 15)).unwrap();
    let env = RasterEnvelope::with_derived_bounds(vec![band], georef).unwrap();

    let transformer = projection::Transformer::new(&Crs::Epsg(32632), &Crs::wgs84()).unwrap();
    let (lon, lat) = transformer.transform_point(467_500.0, 5_247_500.0).unwrap();

    let mut points = Table::new(vec![Field::geometry(
        "geometry",
        ColumnType::Point,
        Some(Crs::wgs84()),
    )]);
    points
        .push_row(vec![Geometry::Point(Point::new(lon, lat)).into()])
        .unwrap();

    let out = sample_points(&env, &points, &SamplerConfig::default()).unwrap();
    // pixel (row 7, col 12)
    assert_eq!(out.rows()[0][1], Value::Float(12_007.0));
}

#[test]
fn test_sampler_preserves_input_rows() {
    let env = unit_envelope(create_test_grid(4, 4), None);
    let mut points = Table::new(vec![
        Field::new("id", ColumnType::Int),
        Field::new("geometry", ColumnType::Point),
    ]);
    for (i, (x, y)) in [(0.5, 3.5), (3.5, 0.5), (-5.0, 2.0)].into_iter().enumerate() {
        points
            .push_row(vec![
                Value::Int(i as i64),
                Geometry::Point(Point::new(x, y)).into(),
            ])
            .unwrap();
    }
    points.push_row(vec![Value::Int(3), Value::Null]).unwrap();

    let out = sample_points(&env, &points, &SamplerConfig::default()).unwrap();
    assert_eq!(out.num_rows(), 4);
    assert_eq!(out.rows()[0][2], Value::Float(0.0));
    assert_eq!(out.rows()[1][2], Value::Float(3003.0));
    for row in &out.rows()[2..] {
        match row[2] {
            Value::Float(v) => assert!(v.is_nan()),
            ref other => panic!("unexpected {:?}", other),
        }
    }
}

// ============================================================================
// polygon clipper
// ============================================================================

#[test]
fn test_full_extent_crop_keeps_everything() {
    let env = unit_envelope(create_test_grid(4, 4), Some(-9999.0));
    let out = clip_raster(&env, &polygons(&[wkt::FULL_EXTENT]), &ClipperConfig::default()).unwrap();
    assert_eq!(out.shape(), env.shape());
    assert_eq!(out.bands()[0].values(), env.bands()[0].values());
    assert_eq!(out.georeference().transform, env.georeference().transform);
}

#[test]
fn test_frame_masks_centre() {
    let env = unit_envelope(create_test_grid(4, 4), Some(-9999.0));
    let out = clip_raster(&env, &polygons(&[wkt::FRAME]), &ClipperConfig::default()).unwrap();
    let band = &out.bands()[0];
    assert_eq!(band.get(1, 1), Some(-9999.0));
    assert_eq!(band.get(2, 2), Some(-9999.0));
    assert_eq!(band.get(0, 0), Some(0.0));
}

#[test]
fn test_union_of_polygons_crops_to_combined_extent() {
    let env = unit_envelope(create_test_grid(4, 4), None);
    let out = clip_raster(
        &env,
        &polygons(&[
            "POLYGON ((0 3, 1 3, 1 4, 0 4, 0 3))",
            "POLYGON ((3 0, 4 0, 4 1, 3 1, 3 0))",
        ]),
        &ClipperConfig::default(),
    )
    .unwrap();
    assert_eq!(out.shape(), (1, 4, 4));
    let band = &out.bands()[0];
    assert_eq!(band.get(0, 0), Some(0.0));
    assert_eq!(band.get(3, 3), Some(3003.0));
    assert!(band.get(1, 1).unwrap().is_nan());
}

#[test]
fn test_reprojected_polygon_clip() {
    let georef = Georeference::new(
        DataType::Float32,
        25,
        15,
        1,
        GeoTransform::from_origin(455_000.0, 5_255_000.0, 1000.0, 1000.0),
    )
    .with_crs(Crs::Epsg(32632));
    let band = Band::filled(15, 25, 1.0).unwrap();
    let env = RasterEnvelope::with_derived_bounds(vec![band], georef).unwrap();

    let mut shapes = Table::new(vec![Field::geometry(
        "geometry",
        ColumnType::Polygon,
        Some(Crs::wgs84()),
    )]);
    shapes
        .push_row(vec![Geometry::from_wkt(
            "POLYGON ((8.5 47.35, 8.6 47.35, 8.6 47.4, 8.5 47.4, 8.5 47.35))",
        )
        .unwrap()
        .into()])
        .unwrap();

    let out = clip_raster(&env, &shapes, &ClipperConfig::default()).unwrap();
    assert!(out.width() < 25);
    assert!(out.height() < 15);
    let bounds = out.bounds().unwrap();
    assert!(bounds.left >= 455_000.0 && bounds.right <= 480_000.0);
}

#[test]
fn test_disjoint_polygon_is_value_error() {
    let env = unit_envelope(create_test_grid(4, 4), None);
    let err = clip_raster(&env, &polygons(&[wkt::DISJOINT]), &ClipperConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Value);
}

// ============================================================================
// envelope codec
// ============================================================================

#[test]
fn test_codec_roundtrip_with_crs_and_nan() {
    let env = unit_envelope(create_grid_with_nans(4, 4, 5), Some(f64::NAN));
    let bytes = codec::encode(&env).unwrap();
    assert_eq!(codec::peek_version(&bytes).unwrap(), EnvelopeVersion::V2);

    let back = codec::decode(&bytes).unwrap();
    assert_bits_eq!(back.bands()[0].values(), env.bands()[0].values());
    assert!(back.georeference().nodata.unwrap().is_nan());
    assert_eq!(back.bounds(), env.bounds());
}

#[test]
fn test_codec_v1_has_no_bounds() {
    let env = unit_envelope(create_test_grid(4, 4), None);
    let bytes = codec::encode_version(&env, EnvelopeVersion::V1).unwrap();
    let back = codec::decode(&bytes).unwrap();
    assert_eq!(back.bounds(), None);
    assert_approx_eq!(back.effective_bounds().top, 4.0, 1e-12);
}
