//! Versioned binary wire form of a [`RasterEnvelope`].
//!
//! ```text
//! magic   b"GENV"
//! version u16 LE   (1 = grid + profile, 2 = grid + profile + bounds)
//! hlen    u32 LE   length of the JSON header
//! header  JSON     {"count","height","width","georeference",("bounds")}
//! payload count*height*width f64 LE, band-major, row-major
//! ```

use crate::envelope::{Band, Georeference, RasterEnvelope};
use bytes::{BufMut, Bytes, BytesMut};
use geoimage_common::{BoundingBox, GeoImageError, GeoImageResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MAGIC: &[u8; 4] = b"GENV";

/// magic + version + header length
const PREAMBLE_LEN: usize = 4 + 2 + 4;

/// Envelope wire versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum EnvelopeVersion {
    /// Grid and profile only.
    V1,
    /// Grid, profile and explicit bounds.
    V2,
}

impl EnvelopeVersion {
    pub const LATEST: EnvelopeVersion = EnvelopeVersion::V2;

    pub fn as_u16(&self) -> u16 {
        match self {
            EnvelopeVersion::V1 => 1,
            EnvelopeVersion::V2 => 2,
        }
    }
}

impl Default for EnvelopeVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl TryFrom<u16> for EnvelopeVersion {
    type Error = GeoImageError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(EnvelopeVersion::V1),
            2 => Ok(EnvelopeVersion::V2),
            found => Err(GeoImageError::UnsupportedEnvelopeVersion {
                found,
                supported: "1, 2".to_string(),
            }),
        }
    }
}

impl From<EnvelopeVersion> for u16 {
    fn from(v: EnvelopeVersion) -> Self {
        v.as_u16()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Header {
    count: usize,
    height: usize,
    width: usize,
    georeference: Georeference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundingBox>,
}

/// Encode an envelope at the latest wire version.
pub fn encode(envelope: &RasterEnvelope) -> GeoImageResult<Bytes> {
    encode_version(envelope, EnvelopeVersion::LATEST)
}

/// Encode an envelope at a specific wire version.
///
/// Version 2 always carries bounds (derived from the transform when the
/// envelope tracks none); version 1 drops them.
pub fn encode_version(envelope: &RasterEnvelope, version: EnvelopeVersion) -> GeoImageResult<Bytes> {
    let (count, height, width) = envelope.shape();
    let header = Header {
        count,
        height,
        width,
        georeference: envelope.georeference().clone(),
        bounds: match version {
            EnvelopeVersion::V1 => None,
            EnvelopeVersion::V2 => Some(envelope.effective_bounds()),
        },
    };
    let header_json = serde_json::to_vec(&header)?;
    let header_len = u32::try_from(header_json.len())
        .map_err(|_| GeoImageError::CorruptEnvelope("header too large".to_string()))?;

    let payload_len = count * height * width * 8;
    let mut buf = BytesMut::with_capacity(PREAMBLE_LEN + header_json.len() + payload_len);
    buf.put_slice(MAGIC);
    buf.put_u16_le(version.as_u16());
    buf.put_u32_le(header_len);
    buf.put_slice(&header_json);
    for band in envelope.bands() {
        for &v in band.values() {
            buf.put_f64_le(v);
        }
    }

    debug!(
        version = version.as_u16(),
        count,
        height,
        width,
        bytes = buf.len(),
        "Encoded envelope"
    );
    Ok(buf.freeze())
}

/// Wire version of an encoded envelope without decoding the payload.
pub fn peek_version(data: &[u8]) -> GeoImageResult<EnvelopeVersion> {
    if data.len() < PREAMBLE_LEN {
        return Err(GeoImageError::CorruptEnvelope(format!(
            "{} bytes is shorter than the envelope preamble",
            data.len()
        )));
    }
    if &data[0..4] != MAGIC {
        return Err(GeoImageError::CorruptEnvelope(
            "invalid magic bytes".to_string(),
        ));
    }
    EnvelopeVersion::try_from(u16::from_le_bytes([data[4], data[5]]))
}

/// Decode an envelope of any supported version.
pub fn decode(data: &[u8]) -> GeoImageResult<RasterEnvelope> {
    let version = peek_version(data)?;
    let header_len = u32::from_le_bytes([data[6], data[7], data[8], data[9]]) as usize;

    let header_end = PREAMBLE_LEN
        .checked_add(header_len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| {
            GeoImageError::CorruptEnvelope(format!(
                "header length {} exceeds {} available bytes",
                header_len,
                data.len() - PREAMBLE_LEN
            ))
        })?;

    let header: Header = serde_json::from_slice(&data[PREAMBLE_LEN..header_end])
        .map_err(|e| GeoImageError::CorruptEnvelope(format!("invalid header: {}", e)))?;

    match (version, header.bounds.is_some()) {
        (EnvelopeVersion::V1, true) => {
            return Err(GeoImageError::CorruptEnvelope(
                "version 1 envelope must not carry bounds".to_string(),
            ))
        }
        (EnvelopeVersion::V2, false) => {
            return Err(GeoImageError::CorruptEnvelope(
                "version 2 envelope is missing bounds".to_string(),
            ))
        }
        _ => {}
    }

    let cells = header
        .height
        .checked_mul(header.width)
        .ok_or_else(|| GeoImageError::CorruptEnvelope("grid shape overflows".to_string()))?;
    let payload = &data[header_end..];
    let expected = cells
        .checked_mul(header.count)
        .and_then(|n| n.checked_mul(8))
        .ok_or_else(|| GeoImageError::CorruptEnvelope("payload size overflows".to_string()))?;
    if payload.len() != expected {
        return Err(GeoImageError::CorruptEnvelope(format!(
            "payload is {} bytes, header describes {}",
            payload.len(),
            expected
        )));
    }

    let values: Vec<f64> = payload
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect();

    let bands = if cells == 0 {
        Vec::new()
    } else {
        values
            .chunks(cells)
            .map(|chunk| Band::new(header.height, header.width, chunk.to_vec()))
            .collect::<GeoImageResult<Vec<_>>>()?
    };

    if bands.len() != header.count {
        return Err(GeoImageError::CorruptEnvelope(format!(
            "header declares {} bands, payload holds {}",
            header.count,
            bands.len()
        )));
    }

    debug!(
        version = version.as_u16(),
        count = header.count,
        height = header.height,
        width = header.width,
        "Decoded envelope"
    );
    RasterEnvelope::new(bands, header.georeference, header.bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::DataType;
    use geoimage_common::GeoTransform;

    fn sample() -> RasterEnvelope {
        let georef = Georeference::new(
            DataType::Float32,
            3,
            2,
            1,
            GeoTransform::from_origin(10.0, 20.0, 0.5, 0.5),
        )
        .with_nodata(-9999.0);
        let band = Band::new(2, 3, vec![1.0, f64::NAN, 3.0, 4.0, 5.0, -9999.0]).unwrap();
        RasterEnvelope::with_derived_bounds(vec![band], georef).unwrap()
    }

    #[test]
    fn test_v2_carries_bounds() {
        let env = sample();
        let bytes = encode(&env).unwrap();
        assert_eq!(&bytes[0..4], MAGIC);
        assert_eq!(peek_version(&bytes).unwrap(), EnvelopeVersion::V2);

        let back = decode(&bytes).unwrap();
        assert_eq!(back.bounds(), env.bounds());
        assert_eq!(back.georeference(), env.georeference());
        let v = back.bands()[0].values();
        assert!(v[1].is_nan());
        assert_eq!(v[5], -9999.0);
    }

    #[test]
    fn test_v1_has_no_bounds() {
        let bytes = encode_version(&sample(), EnvelopeVersion::V1).unwrap();
        let back = decode(&bytes).unwrap();
        assert!(back.bounds().is_none());
        assert_eq!(
            back.effective_bounds(),
            BoundingBox::new(10.0, 19.0, 11.5, 20.0)
        );
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = encode(&sample()).unwrap().to_vec();
        bytes[0] = b'X';
        assert!(matches!(
            decode(&bytes),
            Err(GeoImageError::CorruptEnvelope(_))
        ));
    }

    #[test]
    fn test_unknown_version() {
        let mut bytes = encode(&sample()).unwrap().to_vec();
        bytes[4] = 7;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            GeoImageError::UnsupportedEnvelopeVersion { found: 7, .. }
        ));
        assert_eq!(err.kind(), geoimage_common::ErrorKind::Value);
    }

    #[test]
    fn test_truncated_payload() {
        let bytes = encode(&sample()).unwrap();
        assert!(decode(&bytes[..bytes.len() - 8]).is_err());
        assert!(decode(&bytes[..5]).is_err());
    }

    #[test]
    fn test_version_shape_disagreement() {
        // relabel a v2 blob as v1
        let mut bytes = encode(&sample()).unwrap().to_vec();
        bytes[4] = 1;
        assert!(matches!(
            decode(&bytes),
            Err(GeoImageError::CorruptEnvelope(_))
        ));
    }
}
