//! Minimal geometry model and GeoPackage binary encoding.
//!
//! Only the shapes that occur in shapefiles are modeled: points, polylines
//! (encoded as WKB MultiLineString) and polygons (encoded as MultiPolygon,
//! since a shapefile polygon record may hold several outer rings).

/// A repaired 2D geometry ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Geom {
    Point(f64, f64),
    MultiLine(Vec<Vec<(f64, f64)>>),
    /// polygons -> rings (first ring outer) -> closed coordinate lists
    MultiPolygon(Vec<Vec<Vec<(f64, f64)>>>),
}

// ISO WKB geometry type codes.
const WKB_POINT: u32 = 1;
const WKB_LINESTRING: u32 = 2;
const WKB_POLYGON: u32 = 3;
const WKB_MULTILINESTRING: u32 = 5;
const WKB_MULTIPOLYGON: u32 = 6;

impl Geom {
    /// Geometry type name as used in `gpkg_geometry_columns`.
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Geom::Point(..) => "POINT",
            Geom::MultiLine(..) => "MULTILINESTRING",
            Geom::MultiPolygon(..) => "MULTIPOLYGON",
        }
    }

    /// Extends `(min_x, min_y, max_x, max_y)` with every coordinate.
    pub(crate) fn extend_bounds(&self, bounds: &mut Option<(f64, f64, f64, f64)>) {
        let mut visit = |x: f64, y: f64| match bounds {
            None => *bounds = Some((x, y, x, y)),
            Some((min_x, min_y, max_x, max_y)) => {
                *min_x = min_x.min(x);
                *min_y = min_y.min(y);
                *max_x = max_x.max(x);
                *max_y = max_y.max(y);
            }
        };
        match self {
            Geom::Point(x, y) => visit(*x, *y),
            Geom::MultiLine(lines) => {
                for line in lines {
                    for (x, y) in line {
                        visit(*x, *y);
                    }
                }
            }
            Geom::MultiPolygon(polygons) => {
                for rings in polygons {
                    for ring in rings {
                        for (x, y) in ring {
                            visit(*x, *y);
                        }
                    }
                }
            }
        }
    }
}

/// Encodes a geometry as a StandardGeoPackageBinary blob: the "GP" header
/// (version 0, little-endian flags, no envelope) followed by ISO WKB.
pub(crate) fn gpkg_blob(geom: &Geom, srs_id: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(b"GP");
    buf.push(0); // version
    buf.push(0b0000_0001); // little-endian, no envelope
    buf.extend_from_slice(&srs_id.to_le_bytes());
    write_wkb(geom, &mut buf);
    buf
}

fn write_wkb(geom: &Geom, buf: &mut Vec<u8>) {
    match geom {
        Geom::Point(x, y) => {
            write_header(WKB_POINT, buf);
            write_coord(*x, *y, buf);
        }
        Geom::MultiLine(lines) => {
            write_header(WKB_MULTILINESTRING, buf);
            write_u32(lines.len() as u32, buf);
            for line in lines {
                write_header(WKB_LINESTRING, buf);
                write_u32(line.len() as u32, buf);
                for (x, y) in line {
                    write_coord(*x, *y, buf);
                }
            }
        }
        Geom::MultiPolygon(polygons) => {
            write_header(WKB_MULTIPOLYGON, buf);
            write_u32(polygons.len() as u32, buf);
            for rings in polygons {
                write_header(WKB_POLYGON, buf);
                write_u32(rings.len() as u32, buf);
                for ring in rings {
                    write_u32(ring.len() as u32, buf);
                    for (x, y) in ring {
                        write_coord(*x, *y, buf);
                    }
                }
            }
        }
    }
}

fn write_header(geometry_type: u32, buf: &mut Vec<u8>) {
    buf.push(1); // little-endian
    write_u32(geometry_type, buf);
}

fn write_u32(value: u32, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn write_coord(x: f64, y: f64, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&x.to_le_bytes());
    buf.extend_from_slice(&y.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_blob_layout() {
        let blob = gpkg_blob(&Geom::Point(1.0, 2.0), 4326);
        // header: magic, version, flags, srs_id
        assert_eq!(&blob[0..2], b"GP");
        assert_eq!(blob[2], 0);
        assert_eq!(blob[3], 0b0000_0001);
        assert_eq!(i32::from_le_bytes(blob[4..8].try_into().unwrap()), 4326);
        // wkb: byte order + type + 2 doubles
        assert_eq!(blob[8], 1);
        assert_eq!(u32::from_le_bytes(blob[9..13].try_into().unwrap()), 1);
        assert_eq!(f64::from_le_bytes(blob[13..21].try_into().unwrap()), 1.0);
        assert_eq!(f64::from_le_bytes(blob[21..29].try_into().unwrap()), 2.0);
        assert_eq!(blob.len(), 29);
    }

    #[test]
    fn multipolygon_blob_counts() {
        let ring = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        let blob = gpkg_blob(&Geom::MultiPolygon(vec![vec![ring]]), 0);
        assert_eq!(u32::from_le_bytes(blob[9..13].try_into().unwrap()), 6); // MultiPolygon
        assert_eq!(u32::from_le_bytes(blob[13..17].try_into().unwrap()), 1); // 1 polygon
        assert_eq!(u32::from_le_bytes(blob[18..22].try_into().unwrap()), 3); // Polygon
        assert_eq!(u32::from_le_bytes(blob[22..26].try_into().unwrap()), 1); // 1 ring
        assert_eq!(u32::from_le_bytes(blob[26..30].try_into().unwrap()), 4); // 4 points
    }

    #[test]
    fn bounds_cover_all_parts() {
        let geom = Geom::MultiLine(vec![vec![(0.0, -1.0), (2.0, 5.0)], vec![(-3.0, 4.0)]]);
        let mut bounds = None;
        geom.extend_bounds(&mut bounds);
        assert_eq!(bounds, Some((-3.0, -1.0, 2.0, 5.0)));
    }

    #[test]
    fn type_names() {
        assert_eq!(Geom::Point(0.0, 0.0).type_name(), "POINT");
        assert_eq!(Geom::MultiLine(vec![]).type_name(), "MULTILINESTRING");
        assert_eq!(Geom::MultiPolygon(vec![]).type_name(), "MULTIPOLYGON");
    }
}
