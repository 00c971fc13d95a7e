//! CRS to PROJ string resolution.

use crate::ProjectionError;
use geoimage_common::Crs;

/// PROJ definition string for a CRS.
///
/// EPSG codes are looked up in the `crs-definitions` database; PROJ strings
/// are returned as given.
pub fn proj_string(crs: &Crs) -> Result<String, ProjectionError> {
    match crs {
        Crs::Epsg(code) => u16::try_from(*code)
            .ok()
            .and_then(crs_definitions::from_code)
            .map(|def| def.proj4.to_string())
            .ok_or(ProjectionError::UnknownEpsg(*code)),
        Crs::Proj(definition) => Ok(definition.clone()),
    }
}

/// Whether a CRS uses angular (lon/lat) coordinates.
pub fn is_geographic(crs: &Crs) -> bool {
    match proj_string(crs) {
        Ok(definition) => is_longlat_definition(&definition),
        // unknown codes in the 4000 block are geographic datums
        Err(_) => matches!(crs.epsg(), Some(code) if (4000..5000).contains(&code)),
    }
}

pub(crate) fn is_longlat_definition(definition: &str) -> bool {
    definition.contains("+proj=longlat") || definition.contains("+proj=latlong")
}
