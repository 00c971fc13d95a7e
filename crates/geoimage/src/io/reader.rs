//! GeoTIFF reader.

use super::geokeys::{
    self, TAG_GDAL_NODATA, TAG_GEO_ASCII_PARAMS, TAG_GEO_KEY_DIRECTORY, TAG_MODEL_PIXEL_SCALE,
    TAG_MODEL_TIEPOINT, TAG_MODEL_TRANSFORMATION,
};
use crate::envelope::{Band, DataType, Georeference, RasterEnvelope};
use crate::progress::Progress;
use crate::table::{ColumnType, Field, Table, Value};
use geoimage_common::{GeoImageError, GeoImageResult, GeoTransform};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, info, warn};

/// File-level facts that are not part of the georeference.
#[derive(Debug, Clone, PartialEq)]
pub struct FileLayout {
    pub compress: String,
    pub tiled: bool,
    pub interleave: String,
}

/// Read a GeoTIFF into an envelope plus a `Property`/`Value` profile table.
pub fn read_raster(
    path: impl AsRef<Path>,
    progress: &dyn Progress,
) -> GeoImageResult<(RasterEnvelope, Table)> {
    let path = path.as_ref();
    progress.report(
        0.1,
        "Reading file (This might take a while without progress changes)",
    );
    let file = File::open(path).map_err(|e| GeoImageError::file_read(path, e))?;
    let (envelope, layout) = decode(BufReader::new(file), path)?;
    let profile = profile_table(&envelope, &layout);
    progress.report(0.8, "Profile and metadata extracted...");

    info!(
        path = %path.display(),
        count = envelope.count(),
        height = envelope.height(),
        width = envelope.width(),
        dtype = %envelope.georeference().dtype,
        "Read raster"
    );
    Ok((envelope, profile))
}

/// Decode a GeoTIFF from any seekable source; `source` names it in errors.
pub fn decode<R: Read + Seek>(
    reader: R,
    source: &Path,
) -> GeoImageResult<(RasterEnvelope, FileLayout)> {
    let fail = |e: tiff::TiffError| GeoImageError::file_read(source, e);

    let mut decoder = Decoder::new(reader).map_err(fail)?;
    decoder = decoder.with_limits(Limits::unlimited());

    let (width_u32, height_u32) = decoder.dimensions().map_err(fail)?;
    let (width, height) = (width_u32 as usize, height_u32 as usize);

    let layout = FileLayout {
        compress: compression_name(decoder.get_tag_u32(Tag::Compression).ok()),
        tiled: decoder.get_tag_u32(Tag::TileWidth).is_ok(),
        interleave: match decoder.get_tag_u32(Tag::PlanarConfiguration).ok() {
            Some(2) => "band".to_string(),
            _ => "pixel".to_string(),
        },
    };

    let pixel_scale = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_PIXEL_SCALE))
        .ok();
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TIEPOINT))
        .ok();
    let model_transformation = decoder
        .get_tag_f64_vec(Tag::from_u16_exhaustive(TAG_MODEL_TRANSFORMATION))
        .ok();
    let geo_ascii = decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GEO_ASCII_PARAMS))
        .ok();
    let keys = decoder
        .get_tag_u16_vec(Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))
        .ok()
        .map(|dir| geokeys::parse(&dir, geo_ascii.as_deref()))
        .unwrap_or_default();
    let nodata = decoder
        .get_tag_ascii_string(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))
        .ok()
        .and_then(|s| parse_nodata(&s));

    let mut transform = match model_transformation {
        Some(m) if m.len() >= 8 => GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]),
        _ => match (pixel_scale, tiepoint) {
            (Some(scale), Some(tie)) if scale.len() >= 2 && tie.len() >= 6 => {
                let (sx, sy) = (scale[0], scale[1]);
                GeoTransform::new(sx, 0.0, tie[3] - tie[0] * sx, 0.0, -sy, tie[4] + tie[1] * sy)
            }
            _ => {
                warn!(source = %source.display(), "No georeferencing tags, using identity transform");
                GeoTransform::identity()
            }
        },
    };
    if keys.pixel_is_point {
        transform = transform.translate(-0.5, -0.5);
    }

    let samples_per_pixel = decoder
        .get_tag_u32(Tag::SamplesPerPixel)
        .map(|n| n as usize)
        .unwrap_or(1);
    let (dtype, planes) = if layout.interleave == "band" && samples_per_pixel > 1 {
        read_planes(&mut decoder, width, height, samples_per_pixel, source)?
    } else {
        let decoded = decoder.read_image().map_err(fail)?;
        let (dtype, samples) = decoded_samples(decoded)?;
        (dtype, deinterleave(samples, width, height, source)?)
    };
    let count = planes.len();
    debug!(count, width, height, dtype = %dtype, interleave = %layout.interleave, "Decoded pixel data");

    let bands = planes
        .into_iter()
        .map(|values| Band::new(height, width, values))
        .collect::<GeoImageResult<Vec<_>>>()?;

    let mut georeference = Georeference::new(dtype, width, height, count, transform);
    georeference.nodata = nodata;
    georeference.crs = keys.crs;

    let envelope = RasterEnvelope::with_derived_bounds(bands, georeference)?;
    Ok((envelope, layout))
}

/// Split pixel-interleaved samples into one plane per band.
fn deinterleave(
    samples: Vec<f64>,
    width: usize,
    height: usize,
    source: &Path,
) -> GeoImageResult<Vec<Vec<f64>>> {
    let cells = width * height;
    if cells == 0 || samples.len() % cells != 0 {
        return Err(GeoImageError::file_read(
            source,
            format!("{} samples do not fill a {}x{} grid", samples.len(), width, height),
        ));
    }
    let count = samples.len() / cells;
    let mut planes = vec![Vec::with_capacity(cells); count];
    for pixel in samples.chunks_exact(count) {
        for (plane, &value) in planes.iter_mut().zip(pixel) {
            plane.push(value);
        }
    }
    Ok(planes)
}

/// Band-interleaved layout: the chunks of plane 0 come first, then plane 1,
/// and so on. Each chunk holds one sample per pixel.
fn read_planes<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
    count: usize,
    source: &Path,
) -> GeoImageResult<(DataType, Vec<Vec<f64>>)> {
    let fail = |e: tiff::TiffError| GeoImageError::file_read(source, e);
    let (chunk_w, chunk_h) = decoder.chunk_dimensions();
    let (chunk_w, chunk_h) = (chunk_w as usize, chunk_h as usize);
    if chunk_w == 0 || chunk_h == 0 || width == 0 || height == 0 {
        return Err(GeoImageError::file_read(source, "empty chunk or image dimensions"));
    }
    let across = width.div_ceil(chunk_w);
    let per_plane = across * height.div_ceil(chunk_h);

    let mut dtype = None;
    let mut planes = Vec::with_capacity(count);
    for plane in 0..count {
        let mut values = vec![0.0; width * height];
        for i in 0..per_plane {
            let index = u32::try_from(plane * per_plane + i)
                .map_err(|_| GeoImageError::file_read(source, "too many chunks"))?;
            let (chunk_dtype, data) = decoded_samples(decoder.read_chunk(index).map_err(fail)?)?;
            dtype = Some(chunk_dtype);

            let row0 = (i / across) * chunk_h;
            let col0 = (i % across) * chunk_w;
            let data_w = chunk_w.min(width - col0);
            let data_h = chunk_h.min(height - row0);
            let stride = if data_h == 0 { 0 } else { data.len() / data_h };
            if stride < data_w {
                return Err(GeoImageError::file_read(
                    source,
                    format!("chunk {} holds {} samples, expected {}x{}", index, data.len(), data_w, data_h),
                ));
            }
            for r in 0..data_h {
                let start = (row0 + r) * width + col0;
                values[start..start + data_w].copy_from_slice(&data[r * stride..r * stride + data_w]);
            }
        }
        planes.push(values);
    }
    let dtype = dtype.ok_or_else(|| GeoImageError::file_read(source, "no pixel data"))?;
    Ok((dtype, planes))
}

/// Profile rows in the order `driver, dtype, nodata, width, height, count,
/// crs, transform, compress, tiled, interleave, bounds, shape`.
pub fn profile_table(envelope: &RasterEnvelope, layout: &FileLayout) -> Table {
    let georef = envelope.georeference();
    let bounds = envelope.effective_bounds();
    let (count, height, width) = envelope.shape();
    let t = &georef.transform;

    let entries = [
        ("driver", georef.driver.clone()),
        ("dtype", georef.dtype.to_string()),
        (
            "nodata",
            georef
                .nodata
                .map(|v| v.to_string())
                .unwrap_or_else(|| "None".to_string()),
        ),
        ("width", width.to_string()),
        ("height", height.to_string()),
        ("count", count.to_string()),
        (
            "crs",
            georef
                .crs
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "None".to_string()),
        ),
        (
            "transform",
            format!("Affine({}, {}, {}, {}, {}, {})", t.a, t.b, t.c, t.d, t.e, t.f),
        ),
        ("compress", layout.compress.clone()),
        ("tiled", layout.tiled.to_string()),
        ("interleave", layout.interleave.clone()),
        (
            "bounds",
            format!(
                "[{}, {}, {}, {}]",
                bounds.left, bounds.bottom, bounds.right, bounds.top
            ),
        ),
        ("shape", format!("({}, {}, {})", count, height, width)),
    ];

    let mut table = Table::new(vec![
        Field::new("Property", ColumnType::Text),
        Field::new("Value", ColumnType::Text),
    ]);
    table.replace_rows(
        entries
            .into_iter()
            .map(|(k, v)| vec![Value::Text(k.to_string()), Value::Text(v)])
            .collect(),
    );
    table
}

fn decoded_samples(decoded: DecodingResult) -> GeoImageResult<(DataType, Vec<f64>)> {
    #[allow(unreachable_patterns)]
    let out = match decoded {
        DecodingResult::U8(data) => (DataType::Uint8, data.into_iter().map(f64::from).collect()),
        DecodingResult::I8(data) => (DataType::Int8, data.into_iter().map(f64::from).collect()),
        DecodingResult::U16(data) => (DataType::Uint16, data.into_iter().map(f64::from).collect()),
        DecodingResult::I16(data) => (DataType::Int16, data.into_iter().map(f64::from).collect()),
        DecodingResult::U32(data) => (DataType::Uint32, data.into_iter().map(f64::from).collect()),
        DecodingResult::I32(data) => (DataType::Int32, data.into_iter().map(f64::from).collect()),
        DecodingResult::F32(data) => (DataType::Float32, data.into_iter().map(f64::from).collect()),
        DecodingResult::F64(data) => (DataType::Float64, data),
        DecodingResult::U64(data) => (DataType::Float64, data.into_iter().map(|v| v as f64).collect()),
        DecodingResult::I64(data) => (DataType::Float64, data.into_iter().map(|v| v as f64).collect()),
        _ => {
            return Err(GeoImageError::UnsupportedFormat(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };
    Ok(out)
}

fn compression_name(code: Option<u32>) -> String {
    match code {
        None | Some(1) => "None".to_string(),
        Some(5) => "lzw".to_string(),
        Some(7) => "jpeg".to_string(),
        Some(8) | Some(32946) => "deflate".to_string(),
        Some(32773) => "packbits".to_string(),
        Some(other) => other.to_string(),
    }
}

fn parse_nodata(text: &str) -> Option<f64> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match text.to_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        "inf" | "+inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        other => other.parse().ok(),
    }
}
