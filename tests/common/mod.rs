//! Shared fixtures: file:// sources, zip archives and small shapefiles.

use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;

pub fn init_logging() {
    geo_sampledata::logging::init();
}

/// file:// URL for a local path, so downloads need no network.
pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path).expect("absolute path").to_string()
}

pub fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

/// Zips every file in `dir` (non-recursive) into `archive`, optionally below
/// a directory prefix inside the archive.
pub fn zip_dir(dir: &Path, archive: &Path, prefix: &str) {
    let file = File::create(archive).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let mut names: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.is_file())
        .collect();
    names.sort();
    for path in names {
        let name = path.file_name().unwrap().to_str().unwrap();
        let entry_name = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };
        zip.start_file(entry_name, SimpleFileOptions::default()).unwrap();
        zip.write_all(&std::fs::read(&path).unwrap()).unwrap();
    }
    zip.finish().unwrap();
}

/// Writes a small polygon shapefile (`.shp` + `.shx` + `.dbf`) with `count`
/// unit squares and two attribute fields.
pub fn write_polygon_shapefile(path: &Path, count: usize) {
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("name").unwrap(), 30)
        .add_numeric_field(FieldName::try_from("area").unwrap(), 12, 3);
    let mut writer = shapefile::Writer::from_path(path, table).unwrap();

    for i in 0..count {
        let x = i as f64 * 10.0;
        let ring = PolygonRing::Outer(vec![
            Point::new(x, 0.0),
            Point::new(x + 1.0, 0.0),
            Point::new(x + 1.0, 1.0),
            Point::new(x, 1.0),
            Point::new(x, 0.0),
        ]);
        let polygon = Polygon::new(ring);

        let mut record = Record::default();
        record.insert(
            "name".to_string(),
            FieldValue::Character(Some(format!("parcel {i}"))),
        );
        record.insert("area".to_string(), FieldValue::Numeric(Some(1.0)));
        writer.write_shape_and_record(&polygon, &record).unwrap();
    }
}
