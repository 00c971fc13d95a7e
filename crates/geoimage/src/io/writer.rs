//! GeoTIFF writer.
//!
//! Uses tiff's low-level directory encoder so arbitrary band counts and
//! sample types share one code path. Pixels are written uncompressed in a
//! single chunky strip.

use super::geokeys::{
    self, TAG_GDAL_NODATA, TAG_GEO_ASCII_PARAMS, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_PIXEL_SCALE,
    TAG_MODEL_TIEPOINT, TAG_MODEL_TRANSFORMATION,
};
use crate::envelope::{Band, DataType, Georeference, RasterEnvelope};
use geoimage_common::{GeoImageError, GeoImageResult};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::info;

/// File extensions accepted by [`write_raster`] (case-insensitive).
pub const GEOTIFF_EXTENSIONS: [&str; 3] = ["tif", "tiff", "gtiff"];

/// Write an envelope to a GeoTIFF file.
pub fn write_raster(envelope: &RasterEnvelope, path: impl AsRef<Path>) -> GeoImageResult<()> {
    write_bands(envelope.bands(), envelope.georeference(), path)
}

/// Write bands under an explicit profile.
///
/// The profile's band count and grid size must match the data.
pub fn write_bands(
    bands: &[Band],
    georeference: &Georeference,
    path: impl AsRef<Path>,
) -> GeoImageResult<()> {
    let path = path.as_ref();
    check_extension(path)?;
    check_profile(bands, georeference)?;

    let file = File::create(path).map_err(|e| GeoImageError::file_write(path, e))?;
    let mut writer = BufWriter::new(file);
    encode_bands(bands, georeference, &mut writer)
        .map_err(|e| GeoImageError::file_write(path, e))?;
    writer.flush().map_err(|e| GeoImageError::file_write(path, e))?;

    info!(
        path = %path.display(),
        count = bands.len(),
        height = georeference.height,
        width = georeference.width,
        dtype = %georeference.dtype,
        "Wrote raster"
    );
    Ok(())
}

/// Encode an envelope as GeoTIFF into any seekable sink.
pub fn write_raster_to<W: Write + Seek>(envelope: &RasterEnvelope, sink: &mut W) -> GeoImageResult<()> {
    encode_bands(envelope.bands(), envelope.georeference(), sink)
        .map_err(|e| GeoImageError::file_write("<stream>", e))
}

fn check_extension(path: &Path) -> GeoImageResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match ext {
        Some(ext) if GEOTIFF_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(GeoImageError::UnsupportedFormat(format!(
            "'{}' is not a GeoTIFF path (expected .tif, .tiff or .gtiff)",
            path.display()
        ))),
    }
}

fn check_profile(bands: &[Band], georeference: &Georeference) -> GeoImageResult<()> {
    if bands.len() != georeference.count {
        return Err(GeoImageError::ProfileMismatch(format!(
            "profile count is {}, got {} bands",
            georeference.count,
            bands.len()
        )));
    }
    if let Some(band) = bands
        .iter()
        .find(|b| b.height() != georeference.height || b.width() != georeference.width)
    {
        return Err(GeoImageError::ProfileMismatch(format!(
            "profile grid is {}x{}, band is {}x{}",
            georeference.height,
            georeference.width,
            band.height(),
            band.width()
        )));
    }
    Ok(())
}

fn encode_bands<W: Write + Seek>(
    bands: &[Band],
    georef: &Georeference,
    sink: &mut W,
) -> Result<(), tiff::TiffError> {
    let count = bands.len();
    let width = georef.width as u32;
    let height = georef.height as u32;
    let dtype = georef.dtype;

    let mut encoder = TiffEncoder::new(sink)?;
    let mut dir = encoder.image_directory()?;

    dir.write_tag(Tag::ImageWidth, width)?;
    dir.write_tag(Tag::ImageLength, height)?;
    dir.write_tag(Tag::BitsPerSample, vec![dtype.bits(); count].as_slice())?;
    dir.write_tag(Tag::Compression, 1u16)?;

    // RGB only for exactly three bands, everything else is grey plus extras
    let photometric: u16 = if count == 3 { 2 } else { 1 };
    dir.write_tag(Tag::PhotometricInterpretation, photometric)?;
    dir.write_tag(Tag::SamplesPerPixel, count as u16)?;
    dir.write_tag(Tag::SampleFormat, vec![sample_format(dtype); count].as_slice())?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    dir.write_tag(Tag::RowsPerStrip, height)?;
    if count > 1 && count != 3 {
        dir.write_tag(Tag::ExtraSamples, vec![0u16; count - 1].as_slice())?;
    }

    let t = &georef.transform;
    if t.is_rectilinear() && t.a > 0.0 && t.e < 0.0 {
        let scale = [t.a, -t.e, 0.0];
        dir.write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), scale.as_slice())?;
        let tiepoint = [0.0, 0.0, 0.0, t.c, t.f, 0.0];
        dir.write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), tiepoint.as_slice())?;
    } else {
        let matrix = [
            t.a, t.b, 0.0, t.c, //
            t.d, t.e, 0.0, t.f, //
            0.0, 0.0, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        dir.write_tag(Tag::Unknown(TAG_MODEL_TRANSFORMATION), matrix.as_slice())?;
    }

    let geographic = georef
        .crs
        .as_ref()
        .map(projection::is_geographic)
        .unwrap_or(false);
    let (directory, ascii) = geokeys::build(georef.crs.as_ref(), geographic);
    dir.write_tag(Tag::Unknown(TAG_GEO_KEY_DIRECTORY), directory.as_slice())?;
    if let Some(ascii) = ascii {
        dir.write_tag(Tag::Unknown(TAG_GEO_ASCII_PARAMS), ascii.as_str())?;
    }
    if let Some(nodata) = georef.nodata {
        dir.write_tag(Tag::Unknown(TAG_GDAL_NODATA), nodata_text(nodata).as_str())?;
    }

    let fill = georef.nodata.unwrap_or(0.0);
    let pixel_bytes = interleave(bands, dtype, fill);
    let offset = dir.write_data(pixel_bytes.as_slice())?;
    // classic TIFF offsets are 32-bit
    let offset = u32::try_from(offset).map_err(|_| tiff::TiffError::LimitsExceeded)?;
    dir.write_tag(Tag::StripOffsets, offset)?;
    dir.write_tag(Tag::StripByteCounts, pixel_bytes.len() as u32)?;

    dir.finish()
}

fn sample_format(dtype: DataType) -> u16 {
    match dtype {
        DataType::Uint8 | DataType::Uint16 | DataType::Uint32 => 1,
        DataType::Int8 | DataType::Int16 | DataType::Int32 => 2,
        DataType::Float32 | DataType::Float64 => 3,
    }
}

fn nodata_text(nodata: f64) -> String {
    if nodata.is_nan() {
        "nan".to_string()
    } else if nodata.is_infinite() {
        if nodata > 0.0 { "inf" } else { "-inf" }.to_string()
    } else {
        nodata.to_string()
    }
}

/// Pixel-interleaved native-endian sample bytes.
fn interleave(bands: &[Band], dtype: DataType, nan_fill: f64) -> Vec<u8> {
    let cells = bands.first().map(|b| b.values().len()).unwrap_or(0);
    let mut out = Vec::with_capacity(cells * bands.len() * (dtype.bits() as usize / 8));
    for i in 0..cells {
        for band in bands {
            let v = dtype.cast(band.values()[i], nan_fill);
            match dtype {
                DataType::Uint8 => out.push(v as u8),
                DataType::Int8 => out.extend_from_slice(&(v as i8).to_ne_bytes()),
                DataType::Uint16 => out.extend_from_slice(&(v as u16).to_ne_bytes()),
                DataType::Int16 => out.extend_from_slice(&(v as i16).to_ne_bytes()),
                DataType::Uint32 => out.extend_from_slice(&(v as u32).to_ne_bytes()),
                DataType::Int32 => out.extend_from_slice(&(v as i32).to_ne_bytes()),
                DataType::Float32 => out.extend_from_slice(&(v as f32).to_ne_bytes()),
                DataType::Float64 => out.extend_from_slice(&v.to_ne_bytes()),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoimage_common::{ErrorKind, GeoTransform};

    fn georef(count: usize) -> Georeference {
        Georeference::new(
            DataType::Float32,
            2,
            2,
            count,
            GeoTransform::from_origin(0.0, 2.0, 1.0, 1.0),
        )
    }

    #[test]
    fn test_extension_check() {
        assert!(check_extension(Path::new("a.tif")).is_ok());
        assert!(check_extension(Path::new("a.TIFF")).is_ok());
        assert!(check_extension(Path::new("a.gtiff")).is_ok());
        let err = check_extension(Path::new("a.png")).unwrap_err();
        assert!(matches!(err, GeoImageError::UnsupportedFormat(_)));
        assert!(check_extension(Path::new("noext")).is_err());
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let band = Band::filled(2, 2, 1.0).unwrap();
        let err = write_bands(&[band], &georef(2), "/tmp/never-written.tif").unwrap_err();
        assert!(matches!(err, GeoImageError::ProfileMismatch(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_interleave_uint8() {
        let b1 = Band::new(1, 2, vec![1.0, 2.0]).unwrap();
        let b2 = Band::new(1, 2, vec![300.0, f64::NAN]).unwrap();
        assert_eq!(interleave(&[b1, b2], DataType::Uint8, 7.0), vec![1, 255, 2, 7]);
    }

    #[test]
    fn test_sample_format() {
        assert_eq!(sample_format(DataType::Uint16), 1);
        assert_eq!(sample_format(DataType::Int32), 2);
        assert_eq!(sample_format(DataType::Float64), 3);
    }
}
