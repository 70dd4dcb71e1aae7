//! Fetch-and-normalize routine and destination path resolution.
//!
//! The flow is linear: cache check, download, unzip if the source is an
//! archive, convert if the format differs, cleanup. File existence at the
//! destination path is the only cache signal; there is no expiry, checksum or
//! locking, and concurrent callers for the same uncached file are not
//! coordinated.

use crate::archive;
use crate::download;
use crate::error::{Error, Result};
use crate::geoops::{self, GeoFormat};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the shared sampledata directory under the platform tmp location.
const DEFAULT_SUBDIR: &str = "geofileops_sampledata";

/// Name of the scratch subdirectory for intermediate download artifacts.
const SCRATCH_SUBDIR: &str = "tmp";

/// Resolves the destination path for a sample file: `dst_dir/dst_name`, or a
/// fixed subfolder under the platform tmp dir when no directory is given.
/// Pure, no I/O.
pub fn resolve_dst_path(dst_name: &str, dst_dir: Option<&Path>) -> PathBuf {
    match dst_dir {
        Some(dir) => dir.join(dst_name),
        None => std::env::temp_dir().join(DEFAULT_SUBDIR).join(dst_name),
    }
}

/// Downloads a sample file and normalizes it into the format implied by the
/// suffix of `dst_name`.
///
/// If the destination file already exists it is returned as-is, without any
/// network access. Zipped sources are unpacked and the contained geofile is
/// moved or converted into place. Intermediate artifacts live in a scratch
/// subdirectory next to the destination, which is removed again whether the
/// call succeeds or fails.
pub fn download_samplefile(
    download_url: &str,
    download_suffix: &str,
    dst_name: &str,
    dst_dir: Option<&Path>,
) -> Result<PathBuf> {
    let dst_path = resolve_dst_path(dst_name, dst_dir);
    if dst_path.exists() {
        return Ok(dst_path);
    }

    // resolve_dst_path always joins a directory with a file name.
    let parent = dst_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;

    // Same suffix on both ends: a plain download is already in the target
    // format, no scratch dir is needed.
    let dst_suffix = geoops::suffix_of(&dst_path);
    if download_suffix.eq_ignore_ascii_case(&dst_suffix) {
        tracing::info!("download to {}", dst_path.display());
        download::download_to_path(download_url, &dst_path)?;
        return Ok(dst_path);
    }

    let scratch = ScratchDir::create(parent.join(SCRATCH_SUBDIR))?;
    let stem = dst_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(dst_name)
        .to_string();

    let mut work_path = scratch
        .path()
        .join(format!("{stem}{}", download_suffix.to_ascii_lowercase()));
    tracing::info!("download tmp data to {}", work_path.display());
    download::download_to_path(download_url, &work_path)?;

    if geoops::suffix_of(&work_path) == ".zip" {
        // Unzip into a sibling of the archive named after its stem, inside the
        // scratch dir so the guaranteed cleanup covers it.
        let unzip_dir = scratch.path().join(&stem);
        tracing::info!("unzip to {}", unzip_dir.display());
        archive::unzip(&work_path, &unzip_dir)?;

        let mut found = archive::find_geofiles(&unzip_dir);
        // One geofile, or two for shapefile-companion cases. The first match
        // wins; which of two files that is stays permissive on purpose.
        if matches!(found.len(), 1 | 2) {
            work_path = found.swap_remove(0);
        } else {
            return Err(Error::ArchiveContents {
                dir: scratch.path().to_path_buf(),
                found,
            });
        }
    }

    if work_path != dst_path {
        if geoops::suffix_of(&work_path) == dst_suffix {
            match GeoFormat::from_path(&dst_path) {
                Some(format) if format.is_raster() => {
                    geoops::move_file(&work_path, &dst_path)?;
                }
                _ => geoops::move_geofile(&work_path, &dst_path)?,
            }
        } else {
            tracing::info!("convert tmp file to {}", dst_path.display());
            geoops::make_valid(&work_path, &dst_path)?;
        }
    }

    drop(scratch);
    Ok(dst_path)
}

/// Scratch directory for intermediate artifacts. Creation removes a stale
/// directory left behind by a previously killed run; drop removes it again on
/// every exit path.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create(path: PathBuf) -> Result<Self> {
        if path.exists() {
            fs::remove_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        }
        fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        Ok(ScratchDir { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            if self.path.exists() {
                tracing::warn!("could not remove scratch dir {}: {}", self.path.display(), e);
            }
        }
    }
}
