//! Make-valid conversion: reads a vector geofile, repairs its geometries and
//! writes them in the destination format.
//!
//! The only pair the sample registry exercises is shapefile -> geopackage, so
//! that is the only one implemented; every other pair is an explicit error.
//! Repairs are structural: unclosed rings are closed, degenerate rings and
//! empty shapes dropped, and inner rings that precede any outer ring are
//! promoted to outer rings.

use super::wkb::{self, Geom};
use super::GeoFormat;
use crate::error::{Error, Result};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use shapefile::dbase::FieldValue;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// srs_id used when the source carries a `.prj` sidecar whose WKT we register
/// verbatim (no EPSG lookup is attempted).
const CUSTOM_SRS_ID: i32 = 100_000;

/// Converts `src` into `dst`, repairing geometry validity along the way. The
/// destination format is determined by the suffix of `dst`.
pub fn make_valid(src: &Path, dst: &Path) -> Result<()> {
    match (GeoFormat::from_path(src), GeoFormat::from_path(dst)) {
        (Some(GeoFormat::Shapefile), Some(GeoFormat::GeoPackage)) => shapefile_to_gpkg(src, dst),
        _ => Err(Error::UnsupportedConversion {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
        }),
    }
}

fn shapefile_to_gpkg(src: &Path, dst: &Path) -> Result<()> {
    let srs_wkt = fs::read_to_string(src.with_extension("prj")).ok();
    let srs_id = if srs_wkt.is_some() { CUSTOM_SRS_ID } else { 0 };

    let mut reader = shapefile::Reader::from_path(src).map_err(|e| Error::shapefile(src, e))?;

    let mut rows: Vec<(Option<Geom>, BTreeMap<String, Value>)> = Vec::new();
    let mut columns: Vec<(String, &'static str)> = Vec::new();
    let mut bounds: Option<(f64, f64, f64, f64)> = None;
    let mut geometry_type: Option<&'static str> = None;
    let mut dropped = 0usize;

    for shape_record in reader.iter_shapes_and_records() {
        let (shape, record) = shape_record.map_err(|e| Error::shapefile(src, e))?;

        let geom = shape_to_geom(shape);
        match &geom {
            Some(geom) => {
                geom.extend_bounds(&mut bounds);
                geometry_type = match geometry_type {
                    None => Some(geom.type_name()),
                    Some(name) if name == geom.type_name() => Some(name),
                    Some(_) => Some("GEOMETRY"),
                };
            }
            None => dropped += 1,
        }

        let mut fields = BTreeMap::new();
        for (name, value) in record.into_iter() {
            if rows.is_empty() {
                columns.push((name.clone(), field_sql_type(&value)));
            }
            fields.insert(name, field_to_value(&value));
        }
        if rows.is_empty() {
            // dBase field order is not preserved by the record map; sort for a
            // deterministic column layout.
            columns.sort_by(|a, b| a.0.cmp(&b.0));
        }
        rows.push((geom, fields));
    }

    let table = table_name(dst);
    write_gpkg(
        dst,
        &table,
        &columns,
        &rows,
        geometry_type.unwrap_or("GEOMETRY"),
        bounds,
        srs_id,
        srs_wkt.as_deref(),
    )?;

    tracing::debug!(
        "converted {} features to {} ({} without geometry)",
        rows.len(),
        dst.display(),
        dropped
    );
    Ok(())
}

/// Repairs and flattens a shapefile shape into the internal geometry model.
/// Returns `None` for null shapes, shapes with no surviving parts, and shape
/// kinds outside the point/polyline/polygon families.
fn shape_to_geom(shape: shapefile::Shape) -> Option<Geom> {
    use shapefile::{PolygonRing, Shape};

    macro_rules! lines {
        ($polyline:expr) => {{
            let parts: Vec<Vec<(f64, f64)>> = $polyline
                .parts()
                .iter()
                .map(|part| part.iter().map(|pt| (pt.x, pt.y)).collect::<Vec<_>>())
                .filter(|part| part.len() >= 2)
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(Geom::MultiLine(parts))
            }
        }};
    }
    macro_rules! polygons {
        ($polygon:expr) => {{
            let rings: Vec<(bool, Vec<(f64, f64)>)> = $polygon
                .rings()
                .iter()
                .map(|ring| match ring {
                    PolygonRing::Outer(points) => {
                        (true, points.iter().map(|pt| (pt.x, pt.y)).collect())
                    }
                    PolygonRing::Inner(points) => {
                        (false, points.iter().map(|pt| (pt.x, pt.y)).collect())
                    }
                })
                .collect();
            assemble_polygons(rings)
        }};
    }

    match shape {
        Shape::NullShape => None,
        Shape::Point(p) => Some(Geom::Point(p.x, p.y)),
        Shape::PointM(p) => Some(Geom::Point(p.x, p.y)),
        Shape::PointZ(p) => Some(Geom::Point(p.x, p.y)),
        Shape::Polyline(p) => lines!(p),
        Shape::PolylineM(p) => lines!(p),
        Shape::PolylineZ(p) => lines!(p),
        Shape::Polygon(p) => polygons!(p),
        Shape::PolygonM(p) => polygons!(p),
        Shape::PolygonZ(p) => polygons!(p),
        _ => None,
    }
}

/// Groups a flat ring sequence into polygons: each outer ring starts a new
/// polygon, inner rings attach to the most recent one. An inner ring arriving
/// before any outer ring is promoted to an outer ring.
fn assemble_polygons(rings: Vec<(bool, Vec<(f64, f64)>)>) -> Option<Geom> {
    let mut polygons: Vec<Vec<Vec<(f64, f64)>>> = Vec::new();
    for (outer, points) in rings {
        let ring = match close_ring(points) {
            Some(ring) => ring,
            None => continue,
        };
        if outer || polygons.is_empty() {
            polygons.push(vec![ring]);
        } else if let Some(last) = polygons.last_mut() {
            last.push(ring);
        }
    }
    if polygons.is_empty() {
        None
    } else {
        Some(Geom::MultiPolygon(polygons))
    }
}

/// Closes an unclosed ring by repeating its first coordinate; rings with fewer
/// than three distinct coordinates are dropped.
fn close_ring(mut points: Vec<(f64, f64)>) -> Option<Vec<(f64, f64)>> {
    if points.len() < 3 {
        return None;
    }
    if points.first() != points.last() {
        let first = points[0];
        points.push(first);
    }
    if points.len() < 4 {
        None
    } else {
        Some(points)
    }
}

fn field_sql_type(value: &FieldValue) -> &'static str {
    match value {
        FieldValue::Character(_) | FieldValue::Memo(_) | FieldValue::Date(_) => "TEXT",
        FieldValue::Numeric(_)
        | FieldValue::Float(_)
        | FieldValue::Double(_)
        | FieldValue::Currency(_) => "REAL",
        FieldValue::Integer(_) | FieldValue::Logical(_) => "INTEGER",
        _ => "TEXT",
    }
}

fn field_to_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Character(Some(s)) => Value::Text(s.clone()),
        FieldValue::Memo(s) => Value::Text(s.clone()),
        FieldValue::Numeric(Some(n)) => Value::Real(*n),
        FieldValue::Float(Some(f)) => Value::Real(f64::from(*f)),
        FieldValue::Double(d) => Value::Real(*d),
        FieldValue::Currency(c) => Value::Real(*c),
        FieldValue::Integer(i) => Value::Integer(i64::from(*i)),
        FieldValue::Logical(Some(b)) => Value::Integer(i64::from(*b)),
        FieldValue::Date(Some(d)) => {
            Value::Text(format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day()))
        }
        _ => Value::Null,
    }
}

/// Feature table name derived from the destination file stem.
fn table_name(dst: &Path) -> String {
    let stem = dst
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("features");
    let name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() {
        "features".to_string()
    } else {
        name
    }
}

#[allow(clippy::too_many_arguments)]
fn write_gpkg(
    dst: &Path,
    table: &str,
    columns: &[(String, &'static str)],
    rows: &[(Option<Geom>, BTreeMap<String, Value>)],
    geometry_type: &str,
    bounds: Option<(f64, f64, f64, f64)>,
    srs_id: i32,
    srs_wkt: Option<&str>,
) -> Result<()> {
    let mut conn = Connection::open(dst).map_err(|e| Error::sqlite(dst, e))?;

    conn.execute_batch(
        "PRAGMA application_id = 1196444487;
         PRAGMA user_version = 10200;
         CREATE TABLE gpkg_spatial_ref_sys (
             srs_name TEXT NOT NULL,
             srs_id INTEGER PRIMARY KEY,
             organization TEXT NOT NULL,
             organization_coordsys_id INTEGER NOT NULL,
             definition TEXT NOT NULL,
             description TEXT
         );
         CREATE TABLE gpkg_contents (
             table_name TEXT NOT NULL PRIMARY KEY,
             data_type TEXT NOT NULL,
             identifier TEXT UNIQUE,
             description TEXT DEFAULT '',
             last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
             min_x DOUBLE,
             min_y DOUBLE,
             max_x DOUBLE,
             max_y DOUBLE,
             srs_id INTEGER,
             CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id)
                 REFERENCES gpkg_spatial_ref_sys(srs_id)
         );
         CREATE TABLE gpkg_geometry_columns (
             table_name TEXT NOT NULL,
             column_name TEXT NOT NULL,
             geometry_type_name TEXT NOT NULL,
             srs_id INTEGER NOT NULL,
             z TINYINT NOT NULL,
             m TINYINT NOT NULL,
             CONSTRAINT pk_geom_cols PRIMARY KEY (table_name, column_name)
         );
         INSERT INTO gpkg_spatial_ref_sys VALUES
             ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined',
              'undefined cartesian coordinate reference system'),
             ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined',
              'undefined geographic coordinate reference system'),
             ('WGS 84 geodetic', 4326, 'EPSG', 4326,
              'GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]',
              'longitude/latitude coordinates in decimal degrees');",
    )
    .map_err(|e| Error::sqlite(dst, e))?;

    if let Some(wkt) = srs_wkt {
        conn.execute(
            "INSERT INTO gpkg_spatial_ref_sys
                 (srs_name, srs_id, organization, organization_coordsys_id, definition)
             VALUES ('unknown', ?1, 'NONE', ?1, ?2)",
            rusqlite::params![srs_id, wkt.trim()],
        )
        .map_err(|e| Error::sqlite(dst, e))?;
    }

    let mut create = format!(
        "CREATE TABLE \"{}\" (fid INTEGER PRIMARY KEY AUTOINCREMENT, geom BLOB",
        quote(table)
    );
    for (name, sql_type) in columns {
        create.push_str(&format!(", \"{}\" {}", quote(name), sql_type));
    }
    create.push(')');
    conn.execute(&create, []).map_err(|e| Error::sqlite(dst, e))?;

    let (min_x, min_y, max_x, max_y) = match bounds {
        Some((a, b, c, d)) => (Some(a), Some(b), Some(c), Some(d)),
        None => (None, None, None, None),
    };
    conn.execute(
        "INSERT INTO gpkg_contents
             (table_name, data_type, identifier, min_x, min_y, max_x, max_y, srs_id)
         VALUES (?1, 'features', ?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![table, min_x, min_y, max_x, max_y, srs_id],
    )
    .map_err(|e| Error::sqlite(dst, e))?;
    conn.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', ?2, ?3, 0, 0)",
        rusqlite::params![table, geometry_type, srs_id],
    )
    .map_err(|e| Error::sqlite(dst, e))?;

    let placeholders: Vec<String> = (1..=columns.len() + 1).map(|i| format!("?{i}")).collect();
    let column_names: String = columns
        .iter()
        .map(|(name, _)| format!(", \"{}\"", quote(name)))
        .collect();
    let insert = format!(
        "INSERT INTO \"{}\" (geom{}) VALUES ({})",
        quote(table),
        column_names,
        placeholders.join(", ")
    );

    let tx = conn.transaction().map_err(|e| Error::sqlite(dst, e))?;
    {
        let mut stmt = tx.prepare(&insert).map_err(|e| Error::sqlite(dst, e))?;
        for (geom, fields) in rows {
            let mut values: Vec<Value> = Vec::with_capacity(columns.len() + 1);
            values.push(match geom {
                Some(geom) => Value::Blob(wkb::gpkg_blob(geom, srs_id)),
                None => Value::Null,
            });
            for (name, _) in columns {
                values.push(fields.get(name).cloned().unwrap_or(Value::Null));
            }
            stmt.execute(params_from_iter(values))
                .map_err(|e| Error::sqlite(dst, e))?;
        }
    }
    tx.commit().map_err(|e| Error::sqlite(dst, e))?;
    Ok(())
}

fn quote(identifier: &str) -> String {
    identifier.replace('"', "\"\"")
}
