//! Band scaling to `[0, 1]` and colorization to RGBA.
//!
//! Missing samples (NaN or the profile nodata) come out as NaN and are
//! painted fully transparent.

use crate::colormap::{Color, Colormap};
use geoimage::envelope::{Band, DataType, Georeference};
use rayon::prelude::*;

/// Min-max normalize over non-missing values. A constant band maps to 0.
pub fn normalize(band: &Band, georef: &Georeference) -> Vec<f64> {
    match band.min_max(|v| !georef.is_missing(v)) {
        Some((lo, hi)) => scale(band, georef, lo, hi),
        None => vec![f64::NAN; band.values().len()],
    }
}

/// Linear scale of `[vmin, vmax]` onto `[0, 1]`, clamped.
pub fn scale_range(band: &Band, georef: &Georeference, vmin: f64, vmax: f64) -> Vec<f64> {
    scale(band, georef, vmin, vmax)
}

/// Scale for a true-color composite: integer types as 0 to 255, float
/// types as 0 to 1, clipped.
pub fn composite_unit(band: &Band, georef: &Georeference) -> Vec<f64> {
    let max = match georef.dtype {
        DataType::Float32 | DataType::Float64 => 1.0,
        _ => 255.0,
    };
    scale(band, georef, 0.0, max)
}

fn scale(band: &Band, georef: &Georeference, lo: f64, hi: f64) -> Vec<f64> {
    let range = hi - lo;
    band.values()
        .iter()
        .map(|&v| {
            if georef.is_missing(v) {
                f64::NAN
            } else if range.abs() < f64::EPSILON {
                0.0
            } else {
                ((v - lo) / range).clamp(0.0, 1.0)
            }
        })
        .collect()
}

/// RGBA pixels for normalized values through a colormap.
pub fn colorize(values: &[f64], width: usize, colormap: &Colormap) -> Vec<u8> {
    let mut pixels = vec![0u8; values.len() * 4];
    if width == 0 {
        return pixels;
    }
    pixels
        .par_chunks_mut(width * 4)
        .zip(values.par_chunks(width))
        .for_each(|(out, row)| {
            for (px, &v) in out.chunks_exact_mut(4).zip(row) {
                px.copy_from_slice(&colormap.sample(v).to_array());
            }
        });
    pixels
}

/// RGBA pixels from three normalized channels; a pixel missing in any
/// channel is transparent.
pub fn compose_rgb(r: &[f64], g: &[f64], b: &[f64], width: usize) -> Vec<u8> {
    let to_u8 = |v: f64| (v * 255.0).round() as u8;
    let mut pixels = vec![0u8; r.len() * 4];
    if width == 0 {
        return pixels;
    }
    pixels
        .par_chunks_mut(width * 4)
        .enumerate()
        .for_each(|(row, out)| {
            for (col, px) in out.chunks_exact_mut(4).enumerate() {
                let i = row * width + col;
                let color = if r[i].is_nan() || g[i].is_nan() || b[i].is_nan() {
                    Color::transparent()
                } else {
                    Color::rgb(to_u8(r[i]), to_u8(g[i]), to_u8(b[i]))
                };
                px.copy_from_slice(&color.to_array());
            }
        });
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::ColormapRegistry;
    use geoimage_common::GeoTransform;

    fn georef(dtype: DataType, nodata: Option<f64>) -> Georeference {
        let mut g = Georeference::new(dtype, 2, 2, 1, GeoTransform::identity());
        g.nodata = nodata;
        g
    }

    #[test]
    fn test_normalize_skips_nodata() {
        let band = Band::new(2, 2, vec![-9999.0, 10.0, 15.0, 20.0]).unwrap();
        let out = normalize(&band, &georef(DataType::Float32, Some(-9999.0)));
        assert!(out[0].is_nan());
        assert_eq!(&out[1..], &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_constant_band_is_zero() {
        let band = Band::filled(2, 2, 7.0).unwrap();
        let out = normalize(&band, &georef(DataType::Float32, None));
        assert!(out.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_all_missing() {
        let band = Band::filled(2, 2, f64::NAN).unwrap();
        let out = normalize(&band, &georef(DataType::Float32, None));
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_scale_range_clamps() {
        let band = Band::new(2, 2, vec![0.0, 0.1, 0.55, 2.0]).unwrap();
        let out = scale_range(&band, &georef(DataType::Float64, None), 0.1, 1.0);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[1], 0.0);
        assert!((out[2] - 0.5).abs() < 1e-12);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_composite_unit_by_dtype() {
        let band = Band::new(2, 2, vec![0.0, 51.0, 255.0, 300.0]).unwrap();
        let out = composite_unit(&band, &georef(DataType::Uint8, None));
        assert_eq!(out, vec![0.0, 0.2, 1.0, 1.0]);

        let band = Band::new(2, 2, vec![-0.5, 0.25, 1.0, 3.0]).unwrap();
        let out = composite_unit(&band, &georef(DataType::Float32, None));
        assert_eq!(out, vec![0.0, 0.25, 1.0, 1.0]);
    }

    #[test]
    fn test_colorize_transparency() {
        let registry = ColormapRegistry::with_defaults();
        let pixels = colorize(&[0.0, f64::NAN], 2, registry.get("Greys").unwrap());
        assert_eq!(&pixels[0..4], &[255, 255, 255, 255]);
        assert_eq!(pixels[7], 0);
    }

    #[test]
    fn test_compose_rgb() {
        let pixels = compose_rgb(&[1.0, 0.0], &[0.0, f64::NAN], &[0.0, 0.0], 2);
        assert_eq!(&pixels[0..4], &[255, 0, 0, 255]);
        assert_eq!(&pixels[4..8], &[0, 0, 0, 0]);
    }
}
