//! End-to-end pipeline tests: GeoTIFF in, tables, clipped rasters and views
//! out, all through named ports.

use geoimage::envelope::{Band, DataType, Georeference, RasterEnvelope};
use geoimage::{read_raster, NoProgress, Table, Value};
use geoimage_cli::{exit_code, Pipeline, Settings, Toolkit};
use geoimage_common::GeoTransform;
use std::fs;
use std::path::Path;
use test_utils::fixtures::{grid, wkt};
use test_utils::generators::create_sequential_grid;
use test_utils::paths::temp_test_dir_with_prefix;

fn write_dem(dir: &Path) {
    let spec = grid::UNIT_4X4;
    let georef = Georeference::new(
        DataType::Float32,
        spec.width,
        spec.height,
        1,
        GeoTransform::from_origin(spec.west, spec.north, spec.xsize, spec.ysize),
    )
    .with_nodata(-9999.0);
    let band = Band::new(
        spec.height,
        spec.width,
        create_sequential_grid(spec.width, spec.height, 1.0),
    )
    .unwrap();
    let env = RasterEnvelope::with_derived_bounds(vec![band], georef).unwrap();
    geoimage::write_raster(&env, dir.join("dem.tif")).unwrap();
}

fn write_tables(dir: &Path) {
    let aoi = format!(
        r#"{{"fields":[{{"name":"geometry","type":"polygon"}}],"rows":[["{}"]]}}"#,
        wkt::CENTER_SQUARE
    );
    fs::write(dir.join("aoi.json"), aoi).unwrap();

    let points = r#"{"fields":[{"name":"id","type":"int"},{"name":"geometry","type":"point"}],
        "rows":[[1,"POINT (0.5 3.5)"],[2,"POINT (2.5 1.5)"]]}"#;
    fs::write(dir.join("points.json"), points).unwrap();
}

fn load_json_table(path: &Path) -> Table {
    Table::from_json(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_full_pipeline() {
    let dir = temp_test_dir_with_prefix("geoimage-pipeline");
    write_dem(dir.path());
    write_tables(dir.path());
    std::env::set_var("GEOIMAGE_PIPELINE_TEST_DIR", dir.path());

    let yaml = r#"
steps:
  - node: read
    path: ${GEOIMAGE_PIPELINE_TEST_DIR}/dem.tif
    image: dem
    profile: dem_profile
  - node: load_table
    path: ${GEOIMAGE_PIPELINE_TEST_DIR}/aoi.json
    table: aoi
  - node: clip
    image: dem
    shapes: aoi
    output: dem_aoi
  - node: write
    image: dem_aoi
    path: ${GEOIMAGE_PIPELINE_TEST_DIR}/dem_aoi.tif
  - node: to_table
    image: dem_aoi
    table: pixels
  - node: save_table
    table: pixels
    path: ${GEOIMAGE_PIPELINE_TEST_DIR}/pixels.json
  - node: load_table
    path: ${GEOIMAGE_PIPELINE_TEST_DIR}/points.json
    table: points
  - node: sample
    image: dem
    points: points
    output: values
  - node: save_table
    table: values
    path: ${GEOIMAGE_PIPELINE_TEST_DIR}/values.json
  - node: view_static
    image: dem
    path: ${GEOIMAGE_PIPELINE_TEST_DIR}/dem.png
    config: { vmin: 1, vmax: 16, title: DEM }
  - node: view
    image: dem_aoi
    path: ${GEOIMAGE_PIPELINE_TEST_DIR}/dem.html
    config: { basemap: "Don't show base map", opacity: 0.5 }
"#;
    let toolkit = Toolkit::new(Settings::default()).unwrap();
    let ports = Pipeline::from_yaml(yaml).unwrap().run(&toolkit).unwrap();
    assert!(ports.table("dem_profile").is_ok());

    let (clipped, _) = read_raster(dir.path().join("dem_aoi.tif"), &NoProgress).unwrap();
    assert_eq!(clipped.shape(), (1, 2, 2));
    assert_eq!(clipped.bands()[0].values(), &[6.0, 7.0, 10.0, 11.0]);

    let pixels = load_json_table(&dir.path().join("pixels.json"));
    assert_eq!(pixels.num_rows(), 4);

    let values = load_json_table(&dir.path().join("values.json"));
    assert_eq!(values.rows()[0][2], Value::Float(1.0));
    assert_eq!(values.rows()[1][2], Value::Float(11.0));

    let png = fs::read(dir.path().join("dem.png")).unwrap();
    assert_eq!(&png[1..4], b"PNG");

    let html = fs::read_to_string(dir.path().join("dem.html")).unwrap();
    assert!(html.contains("opacity: 0.5"));
    assert!(!html.contains("L.tileLayer"));
}

#[test]
fn test_missing_input_exit_code() {
    let yaml = r#"
steps:
  - node: read
    path: /nonexistent/geoimage/dem.tif
    image: dem
"#;
    let toolkit = Toolkit::new(Settings::default()).unwrap();
    let err = Pipeline::from_yaml(yaml).unwrap().run(&toolkit).unwrap_err();
    assert_eq!(exit_code(&err), 74);
    assert!(format!("{:#}", err).contains("step 1 (read)"));
}

#[test]
fn test_wrong_geometry_column_exit_code() {
    let dir = temp_test_dir_with_prefix("geoimage-pipeline");
    write_dem(dir.path());
    write_tables(dir.path());
    let yaml = format!(
        r#"
steps:
  - node: read
    path: {dir}/dem.tif
    image: dem
  - node: load_table
    path: {dir}/points.json
    table: points
  - node: clip
    image: dem
    shapes: points
    output: clipped
"#,
        dir = dir.path().display()
    );
    let toolkit = Toolkit::new(Settings::default()).unwrap();
    let err = Pipeline::from_yaml(&yaml).unwrap().run(&toolkit).unwrap_err();
    assert_eq!(exit_code(&err), 78);
}
