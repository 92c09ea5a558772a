//! Pre-fetch the WorldClim rasters and country boundaries.
//!
//! Populates a data directory so later lookups run offline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use latlon_utils::acquire::{
    download_geo_countries, download_natural_earth, download_worldclim_variable, Downloader,
};
use latlon_utils::climate::parse_variables;
use latlon_utils::raster::Bounds;
use latlon_utils::{Resolution, Settings, Variable};

#[derive(Parser, Debug)]
#[command(name = "latlon-download")]
#[command(about = "Download the datasets used by latlon lookups")]
struct Args {
    /// Target directory (default: $LATLONDATA or ~/.local/share/latlon_utils)
    outdir: Option<PathBuf>,

    /// WorldClim resolution (default: $LATLONRES or 10m)
    #[arg(short, long)]
    res: Option<Resolution>,

    /// Variables to download, or "all" (default: tavg prec)
    #[arg(short, long = "variable")]
    variables: Vec<String>,

    /// Minimum and maximum latitude to keep
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
    lat: Option<Vec<f64>>,

    /// Minimum and maximum longitude to keep
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
    lon: Option<Vec<f64>>,

    /// Skip the WorldClim rasters
    #[arg(long)]
    no_worldclim: bool,

    /// Skip the Natural Earth shapefile
    #[arg(long)]
    no_natural_earth: bool,

    /// Only log warnings and hide progress bars
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default = if args.quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = Settings::from_env().context("Invalid environment settings")?;
    let outdir = args.outdir.clone().unwrap_or(settings.data_dir);
    let resolution = args.res.unwrap_or(settings.resolution);

    let variables = if args.variables.iter().any(|v| v == "all") {
        Variable::all().to_vec()
    } else if args.variables.is_empty() {
        Variable::DEFAULT.to_vec()
    } else {
        parse_variables(&args.variables)?
    };

    let bounds = match (pair(args.lat.as_deref()), pair(args.lon.as_deref())) {
        (None, None) => None,
        (lat, lon) => Some(Bounds::new(
            lat.unwrap_or((-90.0, 90.0)),
            lon.unwrap_or((-180.0, 180.0)),
        )),
    };
    if let Some(bounds) = &bounds {
        info!("Cropping rasters to {:?}", bounds);
    }

    let downloader = Downloader::new(args.quiet);
    info!("Downloading into {}", outdir.display());

    if !args.no_worldclim {
        for variable in &variables {
            let path = download_worldclim_variable(
                &downloader,
                &outdir,
                *variable,
                resolution,
                bounds.as_ref(),
            )
            .with_context(|| format!("Failed to download {} at {}", variable, resolution))?;
            info!("Wrote {}", path.display());
        }
    } else {
        warn!("Skipping WorldClim rasters");
    }

    let path = download_geo_countries(&downloader, &outdir)
        .context("Failed to download countries.geojson")?;
    info!("Wrote {}", path.display());

    if !args.no_natural_earth {
        let path = download_natural_earth(&downloader, &outdir)
            .context("Failed to download Natural Earth countries")?;
        info!("Wrote {}", path.display());
    }

    info!("Done");
    Ok(())
}

fn pair(values: Option<&[f64]>) -> Option<(f64, f64)> {
    match values? {
        [a, b] => Some((*a, *b)),
        _ => None,
    }
}
