//! WorldClim v2.0 download and conversion into raster stores.

use chrono::Utc;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

use super::{raster_file_name, Downloader};
use crate::climate::{Resolution, Variable};
use crate::error::{Error, Result};
use crate::raster::{convert_geotiffs, Bounds, RasterMeta};

pub const WORLDCLIM_BASE_URL: &str = "http://biogeo.ucdavis.edu/data/worldclim/v2.0/tif/base/";

const WORLDCLIM_REFERENCE: &str = "Fick, S.E. and R.J. Hijmans, 2017. Worldclim 2: New 1-km \
    spatial resolution climate surfaces for global land areas. International Journal of \
    Climatology.";

fn archive_url(variable: Variable, resolution: Resolution) -> Result<Url> {
    let base = Url::parse(WORLDCLIM_BASE_URL)
        .map_err(|e| Error::Config(format!("bad WorldClim base URL: {}", e)))?;
    base.join(&format!("wc2.0_{}_{}.zip", resolution, variable))
        .map_err(|e| Error::Config(format!("bad WorldClim archive URL: {}", e)))
}

/// Download one WorldClim variable and convert it to a raster store in `dir`.
///
/// The archive is fetched and unpacked in a scratch directory; the twelve
/// monthly GeoTIFFs are merged into `<var>_<res>.grid`, optionally cropped to
/// `bounds`.
pub fn download_worldclim_variable(
    downloader: &Downloader,
    dir: &Path,
    variable: Variable,
    resolution: Resolution,
    bounds: Option<&Bounds>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let url = archive_url(variable, resolution)?;
    let target = dir.join(raster_file_name(variable, resolution));

    let scratch = tempfile::Builder::new().prefix("worldclim_").tempdir()?;
    let archive_path = scratch.path().join(format!("wc2.0_{}_{}.zip", resolution, variable));
    downloader.fetch(url.as_str(), &archive_path)?;

    downloader.announce(&format!("Extracting {}", archive_path.display()));
    let mut archive = zip::ZipArchive::new(File::open(&archive_path)?)?;
    archive.extract(scratch.path())?;

    let tiffs = monthly_tiffs(scratch.path(), variable, resolution)?;

    downloader.announce(&format!("Saving raster store to {}", target.display()));
    let meta = RasterMeta {
        name: variable.name().to_string(),
        long_name: variable.long_name().to_string(),
        units: variable.units().to_string(),
        history: format!(
            "{}: Downloaded {} data with latlon-utils ({}) from {}",
            Utc::now().to_rfc3339(),
            variable,
            env!("CARGO_PKG_VERSION"),
            url
        ),
        reference: WORLDCLIM_REFERENCE.to_string(),
    };
    convert_geotiffs(&tiffs, meta, bounds, &target)?;

    Ok(target)
}

/// Locate `wc2.0_<res>_<var>_01.tif` .. `_12.tif` below `dir`, in month order.
fn monthly_tiffs(dir: &Path, variable: Variable, resolution: Resolution) -> Result<Vec<PathBuf>> {
    let prefix = format!("wc2.0_{}_{}_", resolution, variable);

    let mut found: Vec<(u32, PathBuf)> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_str()?;
            let month: u32 = name.strip_prefix(&prefix)?.strip_suffix(".tif")?.parse().ok()?;
            Some((month, e.path().to_path_buf()))
        })
        .filter(|(month, _)| (1..=12).contains(month))
        .collect();
    found.sort();
    found.dedup_by_key(|(month, _)| *month);

    if found.len() != 12 {
        return Err(Error::unavailable(
            format!("{} {}", variable, resolution),
            format!("archive holds {} of 12 monthly GeoTIFFs", found.len()),
        ));
    }

    Ok(found.into_iter().map(|(_, p)| p).collect())
}
