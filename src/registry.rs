//! Registry of known benchmark sample datasets.

use crate::error::Result;
use crate::fetch;
use crate::geoops;
use std::path::{Path, PathBuf};

/// How to obtain and normalize one sample dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    /// Unique identifier, also used in log lines.
    pub name: &'static str,
    /// Source URL.
    pub url: &'static str,
    /// Suffix of the file served at `url`, e.g. ".zip".
    pub download_suffix: &'static str,
    /// Local file name; its suffix determines the target format.
    pub dst_name: &'static str,
}

/// The known sample datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFile {
    /// Flemish agricultural parcels 2018, zipped shapefile.
    Agriprc2018,
    /// Flemish agricultural parcels 2019, zipped shapefile.
    Agriprc2019,
    /// Sentinel-2 NDVI composite 2020, zipped GeoTIFF.
    S2Ndvi2020,
}

impl SampleFile {
    pub const ALL: [SampleFile; 3] = [
        SampleFile::Agriprc2018,
        SampleFile::Agriprc2019,
        SampleFile::S2Ndvi2020,
    ];

    pub fn descriptor(self) -> &'static Descriptor {
        match self {
            SampleFile::Agriprc2018 => &Descriptor {
                name: "agriprc_2018",
                url: "https://downloadagiv.blob.core.windows.net/landbouwgebruikspercelen/2018/Landbouwgebruikspercelen_LV_2018_GewVLA_Shape.zip",
                download_suffix: ".zip",
                dst_name: "agriprc_2018.gpkg",
            },
            SampleFile::Agriprc2019 => &Descriptor {
                name: "agriprc_2019",
                url: "https://downloadagiv.blob.core.windows.net/landbouwgebruikspercelen/2019/Landbouwgebruikspercelen_LV_2019_GewVLA_Shapefile.zip",
                download_suffix: ".zip",
                dst_name: "agriprc_2019.gpkg",
            },
            SampleFile::S2Ndvi2020 => &Descriptor {
                name: "s2_ndvi_2020",
                url: "https://www.landbouwvlaanderen.be/bestanden/gis/Droogte%202020%20Sentinel2_NDVI_Periodiek_31370_rgb.zip",
                download_suffix: ".zip",
                dst_name: "s2_ndvi_2020.tif",
            },
        }
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    /// Returns the ready-to-use local file, downloading and normalizing it
    /// into `dir` on the first call.
    pub fn get_file(self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        self.fetch(Some(dir.as_ref()))
    }

    /// Same as [`get_file`](Self::get_file), into the shared sampledata
    /// directory under the platform tmp location.
    pub fn get_file_default(self) -> Result<PathBuf> {
        self.fetch(None)
    }

    fn fetch(self, dir: Option<&Path>) -> Result<PathBuf> {
        let descriptor = self.descriptor();
        let path = fetch::download_samplefile(
            descriptor.url,
            descriptor.download_suffix,
            descriptor.dst_name,
            dir,
        )?;

        // Sanity signal only; an unreadable count is not worth failing over.
        if geoops::is_geofile(&path) {
            match geoops::feature_count(&path) {
                Ok(Some(count)) => {
                    tracing::debug!("sample file {} contains {} rows", descriptor.name, count);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("could not read feature count of {}: {}", path.display(), e);
                }
            }
        }
        Ok(path)
    }
}
