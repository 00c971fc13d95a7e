//! Point and polygon geometries with WKT parsing.

use geoimage_common::{BoundingBox, GeoImageError, GeoImageResult};
use std::fmt;
use std::str::FromStr;

/// A single coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A polygon with one exterior ring and zero or more holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub exterior: Vec<(f64, f64)>,
    pub interiors: Vec<Vec<(f64, f64)>>,
}

impl Polygon {
    pub fn new(exterior: Vec<(f64, f64)>) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }

    /// Even-odd containment across every ring, so holes are excluded.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        let mut inside = ring_crossings(&self.exterior, x, y);
        for hole in &self.interiors {
            if ring_crossings(hole, x, y) {
                inside = !inside;
            }
        }
        inside
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.exterior.iter().copied())
    }

    /// True when the polygon area and the rectangle share any point: a
    /// vertex inside the box, a box corner inside the polygon, or two
    /// crossing edges.
    pub fn intersects_bbox(&self, bbox: &BoundingBox) -> bool {
        if self.rings().flatten().any(|&(x, y)| bbox.contains_point(x, y)) {
            return true;
        }
        let corners = [
            (bbox.left, bbox.bottom),
            (bbox.right, bbox.bottom),
            (bbox.right, bbox.top),
            (bbox.left, bbox.top),
        ];
        if corners.iter().any(|&(x, y)| self.contains_point(x, y)) {
            return true;
        }
        let box_edges: Vec<_> = (0..4).map(|i| (corners[i], corners[(i + 1) % 4])).collect();
        self.rings().any(|ring| {
            ring.windows(2).any(|edge| {
                box_edges
                    .iter()
                    .any(|&(a, b)| segments_cross(edge[0], edge[1], a, b))
            })
        })
    }

    fn rings(&self) -> impl Iterator<Item = &Vec<(f64, f64)>> {
        std::iter::once(&self.exterior).chain(self.interiors.iter())
    }

    fn try_map<F>(&self, f: &mut F) -> GeoImageResult<Polygon>
    where
        F: FnMut(f64, f64) -> GeoImageResult<(f64, f64)>,
    {
        let mut map_ring = |ring: &Vec<(f64, f64)>| {
            ring.iter()
                .map(|&(x, y)| f(x, y))
                .collect::<GeoImageResult<Vec<_>>>()
        };
        let exterior = map_ring(&self.exterior)?;
        let interiors = self
            .interiors
            .iter()
            .map(&mut map_ring)
            .collect::<GeoImageResult<Vec<_>>>()?;
        Ok(Polygon {
            exterior,
            interiors,
        })
    }
}

fn orientation(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Proper or touching intersection of segments `p1-p2` and `q1-q2`.
fn segments_cross(p1: (f64, f64), p2: (f64, f64), q1: (f64, f64), q2: (f64, f64)) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    let on_segment = |a: (f64, f64), b: (f64, f64), c: (f64, f64)| {
        c.0 >= a.0.min(b.0) && c.0 <= a.0.max(b.0) && c.1 >= a.1.min(b.1) && c.1 <= a.1.max(b.1)
    };
    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}

/// Ray casting parity test for one ring.
fn ring_crossings(ring: &[(f64, f64)], x: f64, y: f64) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Geometry cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// Parse WKT: `POINT`, `POLYGON` or `MULTIPOLYGON` (Z values are dropped).
    pub fn from_wkt(wkt: &str) -> GeoImageResult<Geometry> {
        let wkt = wkt.trim();
        let body_start = wkt.find('(').ok_or_else(|| {
            GeoImageError::InvalidGeometry(format!("missing opening parenthesis in '{}'", wkt))
        })?;
        let upper = wkt[..body_start].trim().to_uppercase();
        let keyword = upper
            .strip_suffix(" Z")
            .or_else(|| upper.strip_suffix('Z'))
            .map(str::trim)
            .unwrap_or(&upper);
        let body = &wkt[body_start..];

        match keyword {
            "POINT" => {
                let (x, y) = parse_coordinate(strip_parens(body)?)?;
                Ok(Geometry::Point(Point::new(x, y)))
            }
            "POLYGON" => Ok(Geometry::Polygon(parse_polygon_body(body)?)),
            "MULTIPOLYGON" => {
                let polygons = split_top_level(strip_parens(body)?)?
                    .into_iter()
                    .map(parse_polygon_body)
                    .collect::<GeoImageResult<Vec<_>>>()?;
                Ok(Geometry::MultiPolygon(polygons))
            }
            other => Err(GeoImageError::InvalidGeometry(format!(
                "unsupported geometry type '{}'",
                other
            ))),
        }
    }

    pub fn to_wkt(&self) -> String {
        self.to_string()
    }

    /// Polygons contained in this geometry (empty for points).
    pub fn polygons(&self) -> Vec<&Polygon> {
        match self {
            Geometry::Point(_) => Vec::new(),
            Geometry::Polygon(p) => vec![p],
            Geometry::MultiPolygon(ps) => ps.iter().collect(),
        }
    }

    pub fn as_point(&self) -> Option<Point> {
        match self {
            Geometry::Point(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_polygonal(&self) -> bool {
        !matches!(self, Geometry::Point(_))
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        match self {
            Geometry::Point(p) => BoundingBox::from_points([(p.x, p.y)]),
            _ => self
                .polygons()
                .into_iter()
                .filter_map(Polygon::bounds)
                .reduce(|a, b| a.union(&b)),
        }
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.polygons().iter().any(|p| p.contains_point(x, y))
    }

    /// Apply a fallible coordinate mapping (e.g. reprojection) to every vertex.
    pub fn try_map_coords<F>(&self, mut f: F) -> GeoImageResult<Geometry>
    where
        F: FnMut(f64, f64) -> GeoImageResult<(f64, f64)>,
    {
        match self {
            Geometry::Point(p) => {
                let (x, y) = f(p.x, p.y)?;
                Ok(Geometry::Point(Point::new(x, y)))
            }
            Geometry::Polygon(p) => Ok(Geometry::Polygon(p.try_map(&mut f)?)),
            Geometry::MultiPolygon(ps) => Ok(Geometry::MultiPolygon(
                ps.iter()
                    .map(|p| p.try_map(&mut f))
                    .collect::<GeoImageResult<Vec<_>>>()?,
            )),
        }
    }
}

impl FromStr for Geometry {
    type Err = GeoImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Geometry::from_wkt(s)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(p) => write!(f, "POINT ({} {})", p.x, p.y),
            Geometry::Polygon(p) => write!(f, "POLYGON {}", PolygonBody(p)),
            Geometry::MultiPolygon(ps) => {
                f.write_str("MULTIPOLYGON (")?;
                for (i, p) in ps.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", PolygonBody(p))?;
                }
                f.write_str(")")
            }
        }
    }
}

struct PolygonBody<'a>(&'a Polygon);

impl fmt::Display for PolygonBody<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, ring) in self.0.rings().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str("(")?;
            for (k, (x, y)) in ring.iter().enumerate() {
                if k > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{} {}", x, y)?;
            }
            f.write_str(")")?;
        }
        f.write_str(")")
    }
}

/// `( ... )` → inner text.
fn strip_parens(s: &str) -> GeoImageResult<&str> {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('(') && s.ends_with(')') {
        Ok(&s[1..s.len() - 1])
    } else {
        Err(GeoImageError::InvalidGeometry(format!(
            "expected parenthesised list, got '{}'",
            s
        )))
    }
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(s: &str) -> GeoImageResult<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(GeoImageError::InvalidGeometry(
                        "unbalanced parentheses".to_string(),
                    ));
                }
            }
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(GeoImageError::InvalidGeometry(
            "unbalanced parentheses".to_string(),
        ));
    }
    parts.push(s[start..].trim());
    Ok(parts)
}

fn parse_polygon_body(body: &str) -> GeoImageResult<Polygon> {
    let mut rings = split_top_level(strip_parens(body)?)?
        .into_iter()
        .map(|ring| parse_ring(strip_parens(ring)?))
        .collect::<GeoImageResult<Vec<_>>>()?
        .into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| GeoImageError::InvalidGeometry("polygon has no rings".to_string()))?;
    Ok(Polygon {
        exterior,
        interiors: rings.collect(),
    })
}

fn parse_ring(coords: &str) -> GeoImageResult<Vec<(f64, f64)>> {
    let points = coords
        .split(',')
        .map(parse_coordinate)
        .collect::<GeoImageResult<Vec<_>>>()?;
    if points.len() < 3 {
        return Err(GeoImageError::InvalidGeometry(format!(
            "ring needs at least 3 points, got {}",
            points.len()
        )));
    }
    Ok(points)
}

fn parse_coordinate(pair: &str) -> GeoImageResult<(f64, f64)> {
    let pair = pair.trim();
    let parts: Vec<&str> = pair.split_whitespace().collect();
    if parts.len() != 2 && parts.len() != 3 {
        return Err(GeoImageError::InvalidGeometry(format!(
            "expected 'x y' coordinate, got '{}'",
            pair
        )));
    }
    let number = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| GeoImageError::InvalidGeometry(format!("invalid coordinate '{}'", s)))
    };
    Ok((number(parts[0])?, number(parts[1])?))
}
