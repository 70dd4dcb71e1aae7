//! Single-stream blocking HTTP GET to a file.
//!
//! Writes the response body sequentially to the target path. No ranges, no
//! retries, no resume; a failed transfer removes the partial file so that a
//! half-written destination can never be mistaken for a cache hit.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

/// Downloads `url` to `dst` with a single blocking GET, following redirects.
/// Returns the number of bytes written. `file://` URLs are accepted (libcurl
/// reports response code 0 for them, which is treated as success).
pub fn download_to_path(url: &str, dst: &Path) -> Result<u64> {
    let result = fetch(url, dst);
    if result.is_err() {
        // Never leave a partial body behind: file existence is the cache signal.
        let _ = fs::remove_file(dst);
    }
    result
}

fn fetch(url: &str, dst: &Path) -> Result<u64> {
    let file = File::create(dst).map_err(|e| Error::io(dst, e))?;
    let mut writer = BufWriter::new(file);
    let mut write_error: Option<io::Error> = None;
    let mut written: u64 = 0;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(|e| download_err(url, e))?;
    easy.follow_location(true).map_err(|e| download_err(url, e))?;
    easy.max_redirections(10).map_err(|e| download_err(url, e))?;
    easy.connect_timeout(Duration::from_secs(30))
        .map_err(|e| download_err(url, e))?;
    easy.low_speed_limit(1024).map_err(|e| download_err(url, e))?;
    easy.low_speed_time(Duration::from_secs(60))
        .map_err(|e| download_err(url, e))?;

    let perform_result = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| match writer.write_all(data) {
                Ok(()) => {
                    written += data.len() as u64;
                    Ok(data.len())
                }
                Err(e) => {
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            })
            .map_err(|e| download_err(url, e))?;
        transfer.perform()
    };

    // A storage failure aborts the transfer, which curl then reports as a
    // write error; the io::Error is the interesting one.
    if let Some(e) = write_error {
        return Err(Error::io(dst, e));
    }
    perform_result.map_err(|e| download_err(url, e))?;
    writer.flush().map_err(|e| Error::io(dst, e))?;

    let status = easy.response_code().map_err(|e| download_err(url, e))?;
    if status != 0 && !(200..300).contains(&status) {
        return Err(Error::Http {
            url: url.to_string(),
            status,
        });
    }

    tracing::debug!(url, bytes = written, "download complete");
    Ok(written)
}

fn download_err(url: &str, source: curl::Error) -> Error {
    Error::Download {
        url: url.to_string(),
        source,
    }
}
