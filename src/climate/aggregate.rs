//! Nearest-cell climate lookups.

use tracing::{debug, info};

use super::table::{ClimateSeries, ClimateTable, PeriodValues};
use super::{Resolution, Variable};
use crate::acquire::DataSource;
use crate::error::{check_shapes, normalize_lon, Error, Result};
use crate::raster::RasterVariable;

/// Monthly, seasonal and annual climate for a batch of coordinates.
///
/// Each point takes the values of the grid cell whose centre is nearest
/// along each axis. Longitudes above 180 are shifted by -360. Rows keep the
/// input order, duplicates included, and are labelled with the coordinates
/// as given.
pub fn get_climate<S: DataSource>(
    source: &S,
    lat: &[f64],
    lon: &[f64],
    variables: &[Variable],
    resolution: Resolution,
) -> Result<ClimateTable> {
    check_shapes(lat, lon)?;

    // Resolve every dataset before reading any of them
    let paths = variables
        .iter()
        .map(|v| source.resolve_raster(*v, resolution))
        .collect::<Result<Vec<_>>>()?;

    let query_lon: Vec<f64> = lon.iter().copied().map(normalize_lon).collect();
    let coordinates: Vec<(f64, f64)> = lat.iter().copied().zip(lon.iter().copied()).collect();
    let mut table = ClimateTable::new(coordinates, variables.to_vec());

    for (pos, (variable, path)) in variables.iter().zip(&paths).enumerate() {
        let raster = RasterVariable::open(path)?;
        for (row, (&y, &x)) in lat.iter().zip(&query_lon).enumerate() {
            let monthly = raster.monthly(raster.lat().nearest(y), raster.lon().nearest(x))?;
            table.set(row, pos, PeriodValues::from_monthly(&monthly));
        }
        debug!("Sampled {} at {} points", variable, lat.len());
    }

    info!(
        "Extracted {} variables at {} points ({})",
        variables.len(),
        lat.len(),
        resolution
    );
    Ok(table)
}

/// Climate for a single coordinate, as a labelled series
pub fn get_climate_at<S: DataSource>(
    source: &S,
    lat: f64,
    lon: f64,
    variables: &[Variable],
    resolution: Resolution,
) -> Result<ClimateSeries> {
    get_climate(source, &[lat], &[lon], variables, resolution)?
        .into_series()
        .ok_or_else(|| Error::InvalidRaster("lookup returned no rows".to_string()))
}
