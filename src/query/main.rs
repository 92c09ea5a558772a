//! Command-line lookups of countries and climate for lat/lon points.
//!
//! Coordinates are given as `LAT LON` pairs. Missing datasets are fetched
//! into the data directory unless `--no-download` is set.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use latlon_utils::climate::parse_variables;
use latlon_utils::pip::{BoundaryStore, CountryResolver};
use latlon_utils::{
    get_climate, BoundaryKind, DataDir, DataSource, Resolution, Settings, Variable,
};

#[derive(Parser, Debug)]
#[command(name = "latlon")]
#[command(about = "Country and climate lookups for latitude/longitude points")]
struct Args {
    /// Dataset directory (default: $LATLONDATA or ~/.local/share/latlon_utils)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fail instead of downloading missing datasets
    #[arg(long, global = true)]
    no_download: bool,

    /// Only log warnings and hide progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the country containing each point, or "unknown"
    Country {
        /// LAT LON pairs
        #[arg(required = true, num_args = 2.., value_name = "LAT LON", allow_negative_numbers = true)]
        coords: Vec<f64>,

        /// Boundary dataset to test against
        #[arg(long, default_value = "geojson")]
        kind: BoundaryKind,

        /// Prefilter polygons with an R-tree
        #[arg(long)]
        index: bool,
    },
    /// Print monthly, seasonal and annual climate at each point
    Climate {
        /// LAT LON pairs
        #[arg(required = true, num_args = 2.., value_name = "LAT LON", allow_negative_numbers = true)]
        coords: Vec<f64>,

        /// Variables to extract (default: tavg prec)
        #[arg(short, long = "variable")]
        variables: Vec<String>,

        /// WorldClim resolution (default: $LATLONRES or 10m)
        #[arg(long)]
        res: Option<Resolution>,

        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.quiet)?;

    let mut settings = match &args.config {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::from_env().context("Invalid environment settings")?,
    };
    if let Some(dir) = &args.data_dir {
        settings.data_dir = dir.clone();
    }
    if args.no_download {
        settings.download = false;
    }
    if args.quiet {
        settings.quiet = true;
    }
    debug!("Settings: {:?}", settings);

    let data = DataDir::new(&settings).with_context(|| {
        format!(
            "Failed to create data directory {}",
            settings.data_dir.display()
        )
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Country {
            coords,
            kind,
            index,
        } => {
            let (lat, lon) = split_pairs(&coords)?;
            let path = data
                .resolve_boundaries(kind)
                .context("Country boundaries are unavailable")?;
            let store = BoundaryStore::load(&path, kind)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let resolver = if index {
                CountryResolver::indexed(store)
            } else {
                CountryResolver::new(store)
            };

            for name in resolver.countries(&lat, &lon)? {
                writeln!(out, "{}", name)?;
            }
        }
        Command::Climate {
            coords,
            variables,
            res,
            format,
        } => {
            let (lat, lon) = split_pairs(&coords)?;
            let variables = if variables.is_empty() {
                Variable::DEFAULT.to_vec()
            } else {
                parse_variables(&variables)?
            };
            let resolution = res.unwrap_or(settings.resolution);
            info!(
                "Looking up {} points at {} resolution",
                lat.len(),
                resolution
            );

            let table = get_climate(&data, &lat, &lon, &variables, resolution)
                .context("Climate lookup failed")?;
            match format {
                Format::Csv => table.write_csv(&mut out)?,
                Format::Json => {
                    serde_json::to_writer_pretty(&mut out, &table)?;
                    writeln!(out)?;
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn init_logging(quiet: bool) -> Result<()> {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Split `LAT LON LAT LON ...` into latitude and longitude columns
fn split_pairs(coords: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    if coords.len() % 2 != 0 {
        bail!(
            "Coordinates must be LAT LON pairs, got {} values",
            coords.len()
        );
    }
    Ok(coords.chunks_exact(2).map(|pair| (pair[0], pair[1])).unzip())
}
