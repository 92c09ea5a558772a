//! Cache-directory backed [`DataSource`].

use std::path::{Path, PathBuf};
use tracing::debug;

use super::download::{download_geo_countries, download_natural_earth, Downloader};
use super::worldclim::download_worldclim_variable;
use super::{raster_file_name, DataSource};
use crate::climate::{Resolution, Variable};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::pip::BoundaryKind;

/// Datasets cached in one directory, fetched on first use
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
    download: bool,
    quiet: bool,
}

impl DataDir {
    /// Use the directory from `settings`, creating it if needed
    pub fn new(settings: &Settings) -> Result<Self> {
        std::fs::create_dir_all(&settings.data_dir)?;
        Ok(Self {
            root: settings.data_dir.clone(),
            download: settings.download,
            quiet: settings.quiet,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raster_path(&self, variable: Variable, resolution: Resolution) -> PathBuf {
        self.root.join(raster_file_name(variable, resolution))
    }

    pub fn boundary_path(&self, kind: BoundaryKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    fn downloader(&self) -> Downloader {
        Downloader::new(self.quiet)
    }

    /// Return `path` if it and its `sidecars` are present, otherwise run
    /// `acquire` and check again
    fn ensure<F>(
        &self,
        resource: &str,
        path: PathBuf,
        sidecars: &[PathBuf],
        acquire: F,
    ) -> Result<PathBuf>
    where
        F: FnOnce(&Downloader) -> Result<PathBuf>,
    {
        let complete = |path: &Path| path.exists() && sidecars.iter().all(|p| p.exists());

        if complete(&path) {
            debug!("Using cached {} at {}", resource, path.display());
            return Ok(path);
        }
        if !self.download {
            return Err(Error::unavailable(
                resource,
                format!("{} not found and downloads are disabled", path.display()),
            ));
        }

        match acquire(&self.downloader()) {
            Ok(_) if complete(&path) => Ok(path),
            Ok(other) => Err(Error::unavailable(
                resource,
                format!("acquisition produced {} instead", other.display()),
            )),
            Err(e @ (Error::Transfer { .. } | Error::TransferStatus { .. })) => Err(e),
            Err(e @ Error::DataUnavailable { .. }) => Err(e),
            Err(e) => Err(Error::unavailable(resource, e.to_string())),
        }
    }
}

impl DataSource for DataDir {
    fn resolve_raster(&self, variable: Variable, resolution: Resolution) -> Result<PathBuf> {
        let resource = format!("{} raster at {}", variable, resolution);
        self.ensure(&resource, self.raster_path(variable, resolution), &[], |dl| {
            download_worldclim_variable(dl, &self.root, variable, resolution, None)
        })
    }

    fn resolve_boundaries(&self, kind: BoundaryKind) -> Result<PathBuf> {
        let resource = format!("{} boundaries", kind);
        let path = self.boundary_path(kind);
        let sidecars = kind.sidecars(&path);
        self.ensure(&resource, path, &sidecars, |dl| match kind {
            BoundaryKind::GeoJson => download_geo_countries(dl, &self.root),
            BoundaryKind::Shapefile => download_natural_earth(dl, &self.root),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(dir: &Path) -> DataDir {
        let settings = Settings {
            data_dir: dir.to_path_buf(),
            resolution: Resolution::TenMinutes,
            download: false,
            quiet: true,
        };
        DataDir::new(&settings).unwrap()
    }

    #[test]
    fn test_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("cache");
        let data = offline(&root);
        assert!(root.is_dir());
        assert_eq!(data.root(), root.as_path());
    }

    #[test]
    fn test_existing_files_are_returned() {
        let dir = tempfile::tempdir().unwrap();
        let data = offline(dir.path());
        std::fs::write(dir.path().join("tavg_5m.grid"), b"").unwrap();
        std::fs::write(dir.path().join("countries.geojson"), b"{}").unwrap();

        let path = data
            .resolve_raster(Variable::Tavg, Resolution::FiveMinutes)
            .unwrap();
        assert_eq!(path, dir.path().join("tavg_5m.grid"));
        let path = data.resolve_boundaries(BoundaryKind::GeoJson).unwrap();
        assert_eq!(path, dir.path().join("countries.geojson"));
    }

    #[test]
    fn test_shapefile_requires_dbf() {
        let dir = tempfile::tempdir().unwrap();
        let data = offline(dir.path());
        let shp = dir.path().join(BoundaryKind::Shapefile.file_name());
        std::fs::write(&shp, b"").unwrap();

        let err = data.resolve_boundaries(BoundaryKind::Shapefile).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));

        std::fs::write(shp.with_extension("dbf"), b"").unwrap();
        assert_eq!(data.resolve_boundaries(BoundaryKind::Shapefile).unwrap(), shp);
    }

    #[test]
    fn test_missing_without_download_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let data = offline(dir.path());
        let err = data
            .resolve_raster(Variable::Prec, Resolution::ThirtySeconds)
            .unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
        let err = data.resolve_boundaries(BoundaryKind::Shapefile).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }
}
