//! Point-in-Polygon (PIP) country lookup.
//!
//! Loads national boundary polygons and returns the name of the first
//! polygon containing each query point, or `"unknown"`.

mod boundary;
mod index;
mod service;

pub use boundary::{BoundaryKind, BoundaryStore, Country};
pub use index::CountryIndex;
pub use service::{get_country, get_country_at, get_country_in, CountryResolver, UNKNOWN_COUNTRY};
