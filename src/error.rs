//! Error taxonomy for sample file fetching and normalization.
//!
//! No variant is recoverable: download, extraction and conversion failures all
//! surface to the caller after scratch-dir cleanup has run.

use std::io;
use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Curl reported a transfer error (DNS, connection, timeout, ...).
    #[error("download of {url} failed: {source}")]
    Download {
        url: String,
        #[source]
        source: curl::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("GET {url} returned HTTP {status}")]
    Http { url: String, status: u32 },

    /// An extracted archive did not contain exactly 1 or 2 recognized geofiles.
    #[error("should find 1 geofile in {}, found {}:{}", .dir.display(), .found.len(), list_paths(.found))]
    ArchiveContents { dir: PathBuf, found: Vec<PathBuf> },

    /// The source/destination format pair has no conversion implemented.
    #[error("unsupported conversion from {} to {}", .from.display(), .to.display())]
    UnsupportedConversion { from: PathBuf, to: PathBuf },

    #[error("zip archive {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("shapefile {}: {source}", .path.display())]
    Shapefile {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },

    #[error("sqlite {}: {source}", .path.display())]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn sqlite(path: &Path, source: rusqlite::Error) -> Self {
        Error::Sqlite {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn shapefile(path: &Path, source: shapefile::Error) -> Self {
        Error::Shapefile {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn list_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("\n  {}", p.display()))
        .collect()
}
