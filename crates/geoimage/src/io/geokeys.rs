//! GeoTIFF tag numbers and GeoKey directory handling.

use geoimage_common::Crs;

pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub const TAG_GEO_ASCII_PARAMS: u16 = 34737;
pub const TAG_GDAL_NODATA: u16 = 42113;

pub const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
pub const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
pub const GT_CITATION_GEO_KEY: u16 = 1026;
pub const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
pub const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

pub const MODEL_TYPE_PROJECTED: u16 = 1;
pub const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
pub const RASTER_PIXEL_IS_AREA: u16 = 1;
pub const RASTER_PIXEL_IS_POINT: u16 = 2;
pub const USER_DEFINED: u16 = 32767;

/// Georeferencing facts decoded from the GeoKey directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeys {
    pub crs: Option<Crs>,
    pub pixel_is_point: bool,
}

/// Decode a GeoKeyDirectory (`[version, revision, minor, count, key...]`).
///
/// `ascii` is the GeoAsciiParams text used for user-defined CRS citations.
pub fn parse(directory: &[u16], ascii: Option<&str>) -> GeoKeys {
    let mut keys = GeoKeys::default();
    if directory.len() < 4 {
        return keys;
    }

    let count = directory[3] as usize;
    let mut citation: Option<String> = None;
    let mut model_type = None;
    let mut geographic = None;
    let mut projected = None;

    for entry in directory[4..].chunks_exact(4).take(count) {
        let (key, location, len, value) = (entry[0], entry[1], entry[2], entry[3]);
        match (key, location) {
            (GT_MODEL_TYPE_GEO_KEY, 0) => model_type = Some(value),
            (GT_RASTER_TYPE_GEO_KEY, 0) => keys.pixel_is_point = value == RASTER_PIXEL_IS_POINT,
            (GEOGRAPHIC_TYPE_GEO_KEY, 0) => geographic = Some(value),
            (PROJECTED_CS_TYPE_GEO_KEY, 0) => projected = Some(value),
            (GT_CITATION_GEO_KEY, TAG_GEO_ASCII_PARAMS) => {
                citation = ascii.and_then(|text| {
                    let start = value as usize;
                    let end = (start + len as usize).min(text.len());
                    text.get(start..end)
                        .map(|s| s.trim_end_matches(['|', '\0']).trim().to_string())
                });
            }
            _ => {}
        }
    }

    let registered = |code: Option<u16>| code.filter(|c| *c != 0 && *c != USER_DEFINED);
    let proj_citation = citation.filter(|c| c.starts_with("+proj"));

    keys.crs = match model_type {
        Some(MODEL_TYPE_GEOGRAPHIC) => registered(geographic)
            .map(|c| Crs::Epsg(c as u32))
            .or_else(|| proj_citation.map(Crs::Proj)),
        _ => registered(projected)
            .or(registered(geographic))
            .map(|c| Crs::Epsg(c as u32))
            .or_else(|| proj_citation.map(Crs::Proj)),
    };
    keys
}

/// Build a GeoKey directory and the matching GeoAsciiParams text.
pub fn build(crs: Option<&Crs>, geographic: bool) -> (Vec<u16>, Option<String>) {
    let mut entries: Vec<[u16; 4]> = Vec::new();
    let mut ascii = None;

    let model = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    if crs.is_some() {
        entries.push([GT_MODEL_TYPE_GEO_KEY, 0, 1, model]);
    }
    entries.push([GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);

    let code_key = if geographic {
        GEOGRAPHIC_TYPE_GEO_KEY
    } else {
        PROJECTED_CS_TYPE_GEO_KEY
    };
    match crs {
        Some(Crs::Epsg(code)) if *code < USER_DEFINED as u32 => {
            entries.push([code_key, 0, 1, *code as u16]);
        }
        Some(other) => {
            let text = format!("{}|", other);
            entries.push([
                GT_CITATION_GEO_KEY,
                TAG_GEO_ASCII_PARAMS,
                text.len() as u16,
                0,
            ]);
            entries.push([code_key, 0, 1, USER_DEFINED]);
            ascii = Some(text);
        }
        None => {}
    }

    entries.sort_by_key(|e| e[0]);
    let mut directory = vec![1, 1, 0, entries.len() as u16];
    for entry in entries {
        directory.extend_from_slice(&entry);
    }
    (directory, ascii)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epsg_roundtrip() {
        let (dir, ascii) = build(Some(&Crs::Epsg(32632)), false);
        assert!(ascii.is_none());
        let keys = parse(&dir, None);
        assert_eq!(keys.crs, Some(Crs::Epsg(32632)));
        assert!(!keys.pixel_is_point);
    }

    #[test]
    fn test_geographic_roundtrip() {
        let (dir, _) = build(Some(&Crs::wgs84()), true);
        assert_eq!(parse(&dir, None).crs, Some(Crs::wgs84()));
    }

    #[test]
    fn test_proj_string_citation() {
        let crs = Crs::Proj("+proj=utm +zone=33 +datum=WGS84 +units=m +no_defs".to_string());
        let (dir, ascii) = build(Some(&crs), false);
        let keys = parse(&dir, ascii.as_deref());
        assert_eq!(keys.crs, Some(crs));
    }

    #[test]
    fn test_pixel_is_point() {
        let dir = [1, 1, 0, 1, GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_POINT];
        let keys = parse(&dir, None);
        assert!(keys.pixel_is_point);
        assert!(keys.crs.is_none());
    }
}
