//! Locating and fetching the datasets behind each lookup.
//!
//! Lookups ask a [`DataSource`] for local files. [`DataDir`] answers from the
//! configured cache directory, downloading and converting missing datasets.

mod data_dir;
mod download;
mod worldclim;

use std::path::PathBuf;

use crate::climate::{Resolution, Variable};
use crate::error::Result;
use crate::pip::BoundaryKind;

pub use data_dir::DataDir;
pub use download::{download_geo_countries, download_natural_earth, Downloader};
pub use worldclim::{download_worldclim_variable, WORLDCLIM_BASE_URL};

/// Resolves datasets to local files, acquiring them when needed.
pub trait DataSource {
    /// Path to the raster store for a variable at a resolution.
    ///
    /// Fails with `DataUnavailable` when the file is missing and could not be
    /// acquired, or `Transfer` on a network fault.
    fn resolve_raster(&self, variable: Variable, resolution: Resolution) -> Result<PathBuf>;

    /// Path to a boundary collection of the given kind.
    fn resolve_boundaries(&self, kind: BoundaryKind) -> Result<PathBuf>;
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn resolve_raster(&self, variable: Variable, resolution: Resolution) -> Result<PathBuf> {
        (**self).resolve_raster(variable, resolution)
    }

    fn resolve_boundaries(&self, kind: BoundaryKind) -> Result<PathBuf> {
        (**self).resolve_boundaries(kind)
    }
}

/// File name of the raster store for a variable and resolution
pub fn raster_file_name(variable: Variable, resolution: Resolution) -> String {
    format!("{}_{}.grid", variable, resolution)
}
