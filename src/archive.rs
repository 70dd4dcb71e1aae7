//! Zip extraction and recursive geofile search.

use crate::error::{Error, Result};
use crate::geoops::{self, GeoFormat};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extracts a zip archive entry by entry into `dest_dir`.
///
/// Entry names are resolved with `enclosed_name` so a crafted archive cannot
/// escape `dest_dir`; entries with unresolvable names are skipped.
pub fn unzip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir).map_err(|e| Error::io(dest_dir, e))?;

    let file = File::open(archive_path).map_err(|e| Error::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| zip_err(archive_path, e))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| zip_err(archive_path, e))?;
        let outpath = match entry.enclosed_name() {
            Some(path) => dest_dir.join(path),
            None => continue,
        };

        if entry.is_dir() {
            fs::create_dir_all(&outpath).map_err(|e| Error::io(&outpath, e))?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            let mut outfile = File::create(&outpath).map_err(|e| Error::io(&outpath, e))?;
            io::copy(&mut entry, &mut outfile).map_err(|e| Error::io(&outpath, e))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let _ = fs::set_permissions(&outpath, fs::Permissions::from_mode(mode));
            }
        }
    }
    Ok(())
}

/// Recursively collects files with a recognized geo suffix under `dir`.
///
/// Results are grouped by format in `.shp`, `.gpkg`, `.tif` order (so a
/// shapefile wins over a stray raster when the caller takes the first match)
/// and sorted by file name within a format for deterministic selection.
pub fn find_geofiles(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for format in GeoFormat::ALL {
        let mut matches: Vec<PathBuf> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| geoops::suffix_of(path) == format.suffix())
            .collect();
        found.append(&mut matches);
    }
    found
}

fn zip_err(path: &Path, source: zip::result::ZipError) -> Error {
    Error::Zip {
        path: path.to_path_buf(),
        source,
    }
}
