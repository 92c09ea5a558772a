//! Error types shared by the lookup and acquisition layers.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Batch inputs must pair every latitude with a longitude
    #[error("latitude and longitude shapes differ: {lat} vs {lon}")]
    ShapeMismatch { lat: usize, lon: usize },

    #[error("unknown climate variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown WorldClim resolution '{0}'")]
    UnknownResolution(String),

    #[error("unknown boundary kind '{0}'")]
    UnknownBoundaryKind(String),

    /// Backing file is missing and could not be acquired
    #[error("{resource} is unavailable: {reason}")]
    DataUnavailable { resource: String, reason: String },

    #[error("transfer of {url} failed: {source}")]
    Transfer {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("transfer of {url} failed with HTTP status {status}")]
    TransferStatus { url: String, status: u16 },

    #[error("invalid raster store: {0}")]
    InvalidRaster(String),

    #[error("invalid boundary data: {0}")]
    InvalidBoundaries(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("GeoTIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn unavailable(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::DataUnavailable {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

/// Reject batch inputs whose latitude and longitude lengths differ.
pub(crate) fn check_shapes(lat: &[f64], lon: &[f64]) -> Result<()> {
    if lat.len() != lon.len() {
        return Err(Error::ShapeMismatch {
            lat: lat.len(),
            lon: lon.len(),
        });
    }
    Ok(())
}

/// Map longitudes given in [180, 360) onto [-180, 0).
pub(crate) fn normalize_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else {
        lon
    }
}
