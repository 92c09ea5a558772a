//! Runtime settings: data directory, default resolution, download behaviour.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::climate::Resolution;
use crate::error::{Error, Result};

/// Overrides the data directory
pub const DATA_DIR_ENV: &str = "LATLONDATA";
/// Overrides the default WorldClim resolution
pub const RESOLUTION_ENV: &str = "LATLONRES";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Where datasets are cached
    pub data_dir: PathBuf,
    /// Resolution used when a climate query does not name one
    pub resolution: Resolution,
    /// Fetch missing datasets instead of failing
    pub download: bool,
    /// Hide progress bars and demote acquisition logs to debug
    pub quiet: bool,
}

/// Settings file contents; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub data_dir: Option<PathBuf>,
    pub resolution: Option<Resolution>,
    pub download: Option<bool>,
    pub quiet: Option<bool>,
}

impl Settings {
    /// Settings from `LATLONDATA` and `LATLONRES`, with built-in defaults
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| var(key).filter(|v| !v.is_empty());

        let data_dir = match var(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir(var("HOME")),
        };

        let resolution = match var(RESOLUTION_ENV) {
            Some(res) => res
                .parse()
                .map_err(|e| Error::Config(format!("{}: {}", RESOLUTION_ENV, e)))?,
            None => Resolution::default(),
        };

        Ok(Self {
            data_dir,
            resolution,
            download: true,
            quiet: false,
        })
    }

    /// Environment settings overlaid with a TOML settings file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let file: SettingsFile = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        let mut settings = Self::from_env()?;
        settings.apply(file);
        Ok(settings)
    }

    /// Overlay the fields present in `file`
    pub fn apply(&mut self, file: SettingsFile) {
        if let Some(dir) = file.data_dir {
            self.data_dir = dir;
        }
        if let Some(res) = file.resolution {
            self.resolution = res;
        }
        if let Some(download) = file.download {
            self.download = download;
        }
        if let Some(quiet) = file.quiet {
            self.quiet = quiet;
        }
    }
}

fn default_data_dir(home: Option<String>) -> PathBuf {
    match home {
        Some(home) => Path::new(&home)
            .join(".local")
            .join("share")
            .join("latlon_utils"),
        None => PathBuf::from("latlon_utils"),
    }
}
