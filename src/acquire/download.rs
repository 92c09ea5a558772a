//! Blocking HTTP downloads with progress reporting.

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::raster::partial_path;

pub const GEO_COUNTRIES_URL: &str =
    "https://raw.githubusercontent.com/datasets/geo-countries/master/data/countries.geojson";

pub const NATURAL_EARTH_URL: &str =
    "https://naciscdn.org/naturalearth/10m/cultural/ne_10m_admin_0_countries.zip";

const USER_AGENT: &str = concat!("latlon-utils/", env!("CARGO_PKG_VERSION"));

/// Fetches remote files into local paths. Transfers are not retried.
pub struct Downloader {
    quiet: bool,
    timeout: Duration,
}

impl Downloader {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            timeout: Duration::from_secs(30 * 60),
        }
    }

    /// Log an acquisition step at `info`, or `debug` when quiet
    pub(crate) fn announce(&self, message: &str) {
        if self.quiet {
            debug!("{}", message);
        } else {
            info!("{}", message);
        }
    }

    /// Download `url` to `dest`.
    ///
    /// The body is streamed into `<dest>.part` and renamed on success.
    pub fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let transfer = |source| Error::Transfer {
            url: url.to_string(),
            source,
        };

        self.announce(&format!("Downloading {} to {}", url, dest.display()));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .build()
            .map_err(transfer)?;

        let response = client.get(url).send().map_err(transfer)?;
        if !response.status().is_success() {
            return Err(Error::TransferStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bar = self.progress_bar(response.content_length());
        let partial = partial_path(dest);
        let mut out = BufWriter::new(File::create(&partial)?);
        let mut reader = bar.wrap_read(response);

        let copied = std::io::copy(&mut reader, &mut out);
        bar.finish_and_clear();
        let bytes = copied.map_err(|e| {
            let _ = std::fs::remove_file(&partial);
            Error::Io(e)
        })?;

        out.flush()?;
        drop(out);
        std::fs::rename(&partial, dest)?;

        debug!("Downloaded {} bytes from {}", bytes, url);
        Ok(())
    }

    fn progress_bar(&self, len: Option<u64>) -> ProgressBar {
        if self.quiet {
            return ProgressBar::hidden();
        }
        match len {
            Some(len) => {
                let bar = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::default_bar().template(
                    "[{elapsed_precise}] {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})",
                ) {
                    bar.set_style(style);
                }
                bar
            }
            None => ProgressBar::new_spinner(),
        }
    }
}

/// Download the datasets/geo-countries GeoJSON into `dir`.
pub fn download_geo_countries(downloader: &Downloader, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(crate::pip::BoundaryKind::GeoJson.file_name());
    downloader.fetch(GEO_COUNTRIES_URL, &target)?;
    Ok(target)
}

/// Download and unpack the Natural Earth 10m admin-0 countries into `dir`.
///
/// Returns the path of the `.shp` file; its sidecar files sit next to it.
pub fn download_natural_earth(downloader: &Downloader, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let scratch = tempfile::Builder::new()
        .prefix("natural_earth_")
        .tempdir()?;
    let archive_path = scratch.path().join("ne_10m_admin_0_countries.zip");
    downloader.fetch(NATURAL_EARTH_URL, &archive_path)?;

    downloader.announce(&format!("Extracting {}", archive_path.display()));
    let mut archive = zip::ZipArchive::new(File::open(&archive_path)?)?;
    archive.extract(dir)?;

    let shp = dir.join(crate::pip::BoundaryKind::Shapefile.file_name());
    if !shp.exists() {
        return Err(Error::unavailable(
            shp.display().to_string(),
            "archive did not contain the admin-0 shapefile",
        ));
    }
    Ok(shp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_progress_bar_is_hidden() {
        let downloader = Downloader::new(true);
        assert!(downloader.progress_bar(Some(10)).is_hidden());
    }

    #[test]
    fn test_unreachable_host_is_transfer_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");
        let err = Downloader::new(true)
            .fetch("http://127.0.0.1:9/nothing", &dest)
            .unwrap_err();
        assert!(matches!(err, Error::Transfer { .. }));
        assert!(!dest.exists());
    }
}
