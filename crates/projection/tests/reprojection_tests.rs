//! Reprojection tests against a UTM zone.

use geoimage_common::{BoundingBox, Crs};
use projection::{transform_bounds, Transformer};

// ============================================================================
// UTM zone 32N
// ============================================================================

#[test]
fn test_utm_central_meridian_maps_to_false_easting() {
    let t = Transformer::new(&Crs::wgs84(), &Crs::Epsg(32632)).unwrap();
    let (x, y) = t.transform_point(9.0, 0.0).unwrap();
    assert!((x - 500_000.0).abs() < 1e-3);
    assert!(y.abs() < 1e-3);
}

#[test]
fn test_utm_bounds_contain_projected_corners() {
    let utm = BoundingBox::new(400_000.0, 5_000_000.0, 600_000.0, 5_200_000.0);
    let geo = transform_bounds(&Crs::Epsg(32632), &Crs::wgs84(), &utm).unwrap();

    let back = Transformer::new(&Crs::Epsg(32632), &Crs::wgs84()).unwrap();
    for (x, y) in [
        (utm.left, utm.bottom),
        (utm.right, utm.bottom),
        (utm.left, utm.top),
        (utm.right, utm.top),
        (500_000.0, utm.top),
    ] {
        let (lon, lat) = back.transform_point(x, y).unwrap();
        assert!(geo.contains_point(lon, lat), "({lon}, {lat}) outside {geo}");
    }
}

#[test]
fn test_transform_points_preserves_order() {
    let t = Transformer::new(&Crs::wgs84(), &Crs::Epsg(3857)).unwrap();
    let out = t.transform_points(&[(0.0, 0.0), (10.0, 0.0)]).unwrap();
    assert_eq!(out.len(), 2);
    assert!(out[0].0.abs() < 1e-6);
    assert!(out[1].0 > 1_000_000.0);
}

// ============================================================================
// Error handling
// ============================================================================

#[test]
fn test_unknown_epsg_is_error() {
    assert!(Transformer::new(&Crs::Epsg(999_999), &Crs::wgs84()).is_err());
}
