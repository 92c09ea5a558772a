//! latlon-utils - Climate and country lookups for latitude/longitude points
//!
//! Climate values come from the WorldClim v2.0 monthly grids, country names
//! from the geo-countries or Natural Earth boundary polygons. Missing
//! datasets are downloaded into the data directory on first use.

pub mod acquire;
pub mod climate;
pub mod config;
pub mod error;
pub mod grid;
pub mod pip;
pub mod raster;

#[cfg(test)]
pub(crate) mod test_support;

pub use acquire::{DataDir, DataSource};
pub use climate::{
    get_climate, get_climate_at, ClimateSeries, ClimateTable, Period, Resolution, Variable,
};
pub use config::Settings;
pub use error::{Error, Result};
pub use pip::{get_country, get_country_at, get_country_in, BoundaryKind, UNKNOWN_COUNTRY};
