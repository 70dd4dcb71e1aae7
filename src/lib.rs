//! Sample geodata fetching for geo benchmarking suites.
//!
//! Downloads benchmark datasets from their public URLs, caches them on disk
//! (file existence is the cache signal) and normalizes them into the target
//! format: zip archives are unpacked and shapefiles converted to geopackage.
//!
//! ```no_run
//! use geo_sampledata::SampleFile;
//!
//! let path = SampleFile::Agriprc2018.get_file_default()?;
//! # Ok::<(), geo_sampledata::Error>(())
//! ```

pub mod archive;
pub mod download;
pub mod error;
pub mod fetch;
pub mod geoops;
pub mod logging;
pub mod registry;

pub use error::{Error, Result};
pub use fetch::{download_samplefile, resolve_dst_path};
pub use registry::{Descriptor, SampleFile};
