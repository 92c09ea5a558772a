//! Monthly climate rasters: the on-disk store and GeoTIFF conversion.

mod geotiff;
mod store;

pub use geotiff::{convert_geotiffs, Bounds, RasterMeta};
pub use store::{RasterHeader, RasterVariable, RasterWriter};

pub(crate) use store::partial_path;
