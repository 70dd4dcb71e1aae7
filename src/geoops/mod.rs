//! Geospatial file operations: format detection, feature counts, sidecar-aware
//! moves and the shapefile-to-geopackage conversion.

mod convert;
mod wkb;

pub use convert::make_valid;

use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

/// A recognized geospatial file format.
///
/// `ALL` is ordered the way archive searches should prefer matches: shapefile
/// first, then geopackage, then raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoFormat {
    Shapefile,
    GeoPackage,
    GeoTiff,
}

impl GeoFormat {
    pub const ALL: [GeoFormat; 3] = [GeoFormat::Shapefile, GeoFormat::GeoPackage, GeoFormat::GeoTiff];

    pub fn suffix(self) -> &'static str {
        match self {
            GeoFormat::Shapefile => ".shp",
            GeoFormat::GeoPackage => ".gpkg",
            GeoFormat::GeoTiff => ".tif",
        }
    }

    /// Detects the format from the file suffix, case-insensitively.
    pub fn from_path(path: &Path) -> Option<GeoFormat> {
        let suffix = suffix_of(path);
        GeoFormat::ALL.into_iter().find(|f| f.suffix() == suffix)
    }

    pub fn is_raster(self) -> bool {
        matches!(self, GeoFormat::GeoTiff)
    }

    pub fn is_vector(self) -> bool {
        !self.is_raster()
    }

    /// Companion suffixes that travel with the main file.
    pub fn sidecar_suffixes(self) -> &'static [&'static str] {
        match self {
            GeoFormat::Shapefile => &[".shx", ".dbf", ".prj", ".cpg", ".sbn", ".sbx", ".qix"],
            GeoFormat::GeoPackage | GeoFormat::GeoTiff => &[],
        }
    }
}

/// True if the path has a recognized geo format suffix.
pub fn is_geofile(path: &Path) -> bool {
    GeoFormat::from_path(path).is_some()
}

/// Lowercased file suffix including the dot (`".zip"`), or `""` if none.
pub(crate) fn suffix_of(path: &Path) -> String {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Number of features in a vector geofile, `None` for rasters and unrecognized
/// files. Shapefiles are counted by iterating records, geopackages by querying
/// the first `features` table registered in `gpkg_contents`.
pub fn feature_count(path: &Path) -> Result<Option<u64>> {
    match GeoFormat::from_path(path) {
        None | Some(GeoFormat::GeoTiff) => Ok(None),
        Some(GeoFormat::Shapefile) => {
            let mut reader =
                shapefile::Reader::from_path(path).map_err(|e| Error::shapefile(path, e))?;
            let mut count = 0u64;
            for shape_record in reader.iter_shapes_and_records() {
                shape_record.map_err(|e| Error::shapefile(path, e))?;
                count += 1;
            }
            Ok(Some(count))
        }
        Some(GeoFormat::GeoPackage) => {
            let conn = Connection::open(path).map_err(|e| Error::sqlite(path, e))?;
            let table: Option<String> = conn
                .query_row(
                    "SELECT table_name FROM gpkg_contents \
                     WHERE data_type = 'features' ORDER BY table_name LIMIT 1",
                    [],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| Error::sqlite(path, e))?;
            match table {
                None => Ok(None),
                Some(table) => {
                    let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
                    let count: i64 = conn
                        .query_row(&sql, [], |row| row.get(0))
                        .map_err(|e| Error::sqlite(path, e))?;
                    Ok(Some(count as u64))
                }
            }
        }
    }
}

/// Moves a geofile and any same-stem sidecar files next to it.
pub fn move_geofile(src: &Path, dst: &Path) -> Result<()> {
    let format = GeoFormat::from_path(src);
    move_file(src, dst)?;
    if let Some(format) = format {
        for suffix in format.sidecar_suffixes() {
            let sidecar = src.with_extension(&suffix[1..]);
            if sidecar.exists() {
                move_file(&sidecar, &dst.with_extension(&suffix[1..]))?;
            }
        }
    }
    Ok(())
}

/// Renames `src` to `dst`, falling back to copy + remove when the rename fails
/// (e.g. across filesystems: the default sampledata dir is often on tmpfs).
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    fs::copy(src, dst).map_err(|e| Error::io(dst, e))?;
    fs::remove_file(src).map_err(|e| Error::io(src, e))?;
    Ok(())
}
