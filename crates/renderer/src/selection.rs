//! Band selection strings such as `"1"` or `"2, 3, 4"`.

use geoimage_common::{GeoImageError, GeoImageResult};
use std::fmt;

/// One or three validated 1-based band indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandSelection {
    Single(usize),
    Rgb([usize; 3]),
}

impl BandSelection {
    /// Parse a comma separated list and check it against `count` bands.
    pub fn parse(text: &str, count: usize) -> GeoImageResult<Self> {
        let indices = text
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<usize>().map_err(|_| {
                    GeoImageError::InvalidBandSelection(format!(
                        "'{}' is not a band number in '{}'",
                        part, text
                    ))
                })
            })
            .collect::<GeoImageResult<Vec<_>>>()?;

        if let Some(bad) = indices.iter().find(|i| **i == 0 || **i > count) {
            return Err(GeoImageError::InvalidBandSelection(format!(
                "band {} is outside 1..={}",
                bad, count
            )));
        }

        match indices.as_slice() {
            [b] => Ok(BandSelection::Single(*b)),
            [r, g, b] => Ok(BandSelection::Rgb([*r, *g, *b])),
            other => Err(GeoImageError::InvalidBandSelection(format!(
                "select 1 or 3 bands, got {}",
                other.len()
            ))),
        }
    }

    /// Selected 1-based indices in order.
    pub fn indices(&self) -> Vec<usize> {
        match self {
            BandSelection::Single(b) => vec![*b],
            BandSelection::Rgb(rgb) => rgb.to_vec(),
        }
    }
}

impl fmt::Display for BandSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandSelection::Single(b) => write!(f, "{}", b),
            BandSelection::Rgb([r, g, b]) => write!(f, "{}, {}, {}", r, g, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_rgb() {
        assert_eq!(BandSelection::parse("1", 1).unwrap(), BandSelection::Single(1));
        assert_eq!(
            BandSelection::parse(" 2,3 ,  4", 4).unwrap(),
            BandSelection::Rgb([2, 3, 4])
        );
    }

    #[test]
    fn test_two_bands_rejected() {
        let err = BandSelection::parse("1, 2", 3).unwrap_err();
        assert!(matches!(err, GeoImageError::InvalidBandSelection(_)));
        assert_eq!(err.kind(), geoimage_common::ErrorKind::Value);
    }

    #[test]
    fn test_out_of_range() {
        assert!(BandSelection::parse("0", 3).is_err());
        assert!(BandSelection::parse("4", 3).is_err());
    }

    #[test]
    fn test_not_a_number() {
        assert!(BandSelection::parse("red", 3).is_err());
        assert!(BandSelection::parse("", 3).is_err());
    }
}
