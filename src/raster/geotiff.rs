//! Conversion of monthly GeoTIFF planes into a raster store.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::debug;

use super::store::{RasterHeader, RasterWriter};
use crate::error::{Error, Result};

const GDAL_NODATA_TAG: u16 = 42113;

/// Values at or below this are treated as nodata
const NODATA_FLOOR: f32 = -1e30;

/// Descriptive metadata for a converted raster
#[derive(Debug, Clone, Default)]
pub struct RasterMeta {
    pub name: String,
    pub long_name: String,
    pub units: String,
    pub history: String,
    pub reference: String,
}

/// Inclusive latitude/longitude window used to crop a conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lat: (f64, f64),
    pub lon: (f64, f64),
}

impl Bounds {
    /// Build from unordered `(a, b)` pairs
    pub fn new(lat: (f64, f64), lon: (f64, f64)) -> Self {
        let order = |(a, b): (f64, f64)| if a <= b { (a, b) } else { (b, a) };
        Self {
            lat: order(lat),
            lon: order(lon),
        }
    }

    fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.lat.0 && lat <= self.lat.1
    }

    fn contains_lon(&self, lon: f64) -> bool {
        lon >= self.lon.0 && lon <= self.lon.1
    }
}

/// Pixel grid of a north-up GeoTIFF
#[derive(Debug, Clone, Copy, PartialEq)]
struct GeoGrid {
    width: usize,
    height: usize,
    /// Longitude of the left edge
    west: f64,
    /// Latitude of the top edge
    north: f64,
    pixel_x: f64,
    pixel_y: f64,
}

impl GeoGrid {
    fn lon_centres(&self) -> Vec<f64> {
        (0..self.width)
            .map(|k| self.west + (k as f64 + 0.5) * self.pixel_x)
            .collect()
    }

    fn lat_centres(&self) -> Vec<f64> {
        (0..self.height)
            .map(|j| self.north - (j as f64 + 0.5) * self.pixel_y)
            .collect()
    }
}

fn open_decoder(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path)?;
    Ok(Decoder::new(BufReader::new(file))?.with_limits(Limits::unlimited()))
}

/// Read the grid from GeoTIFF tags, assuming a global extent when absent.
fn read_grid<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<GeoGrid> {
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    let grid = match (scale.as_deref(), tiepoint.as_deref()) {
        (Some([sx, sy, ..]), Some([i, j, _, x, y, ..])) => GeoGrid {
            width,
            height,
            west: x - i * sx,
            north: y + j * sy,
            pixel_x: *sx,
            pixel_y: *sy,
        },
        _ => {
            debug!("No georeferencing tags, assuming a global grid");
            GeoGrid {
                width,
                height,
                west: -180.0,
                north: 90.0,
                pixel_x: 360.0 / width as f64,
                pixel_y: 180.0 / height as f64,
            }
        }
    };

    if !(grid.pixel_x > 0.0 && grid.pixel_y > 0.0) {
        return Err(Error::InvalidRaster(
            "GeoTIFF pixel scale must be positive".to_string(),
        ));
    }
    Ok(grid)
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    let value = decoder.find_tag(Tag::Unknown(GDAL_NODATA_TAG)).ok()??;
    let text = value.into_string().ok()?;
    text.trim_matches(char::from(0)).trim().parse::<f64>().ok().map(|v| v as f32)
}

/// Decode the first band as `f32`, mapping nodata to NaN
fn read_plane<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Result<Vec<f32>> {
    let nodata = read_nodata(decoder);

    let mut plane: Vec<f32> = match decoder.read_image()? {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => {
            return Err(Error::InvalidRaster(
                "unsupported GeoTIFF sample format".to_string(),
            ))
        }
    };

    for v in plane.iter_mut() {
        if *v <= NODATA_FLOOR || Some(*v) == nodata {
            *v = f32::NAN;
        }
    }
    Ok(plane)
}

/// Merge one GeoTIFF per month into a raster store at `out`.
///
/// All inputs must share the first file's grid. Planes are streamed one at a
/// time so only a single month is held in memory.
pub fn convert_geotiffs(
    paths: &[PathBuf],
    meta: RasterMeta,
    bounds: Option<&Bounds>,
    out: &Path,
) -> Result<()> {
    let first = paths
        .first()
        .ok_or_else(|| Error::InvalidRaster("no GeoTIFF planes given".to_string()))?;
    let grid = read_grid(&mut open_decoder(first)?)?;

    let lat_all = grid.lat_centres();
    let lon_all = grid.lon_centres();
    let rows: Vec<usize> = (0..grid.height)
        .filter(|&j| bounds.map_or(true, |b| b.contains_lat(lat_all[j])))
        .collect();
    let cols: Vec<usize> = (0..grid.width)
        .filter(|&k| bounds.map_or(true, |b| b.contains_lon(lon_all[k])))
        .collect();

    if rows.is_empty() || cols.is_empty() {
        return Err(Error::InvalidRaster(format!(
            "bounds {:?} select no cells of {}",
            bounds,
            first.display()
        )));
    }

    let header = RasterHeader {
        name: meta.name,
        long_name: meta.long_name,
        units: meta.units,
        history: meta.history,
        reference: meta.reference,
        lat: rows.iter().map(|&j| lat_all[j]).collect(),
        lon: cols.iter().map(|&k| lon_all[k]).collect(),
        months: paths.len(),
    };
    let mut writer = RasterWriter::create(out, header)?;

    let mut cropped = Vec::with_capacity(rows.len() * cols.len());
    for path in paths {
        let mut decoder = open_decoder(path)?;
        let this = read_grid(&mut decoder)?;
        if this.width != grid.width || this.height != grid.height {
            return Err(Error::InvalidRaster(format!(
                "{} is {}x{}, expected {}x{}",
                path.display(),
                this.width,
                this.height,
                grid.width,
                grid.height
            )));
        }

        let plane = read_plane(&mut decoder)?;
        if plane.len() != grid.width * grid.height {
            return Err(Error::InvalidRaster(format!(
                "{} is not a single-band image",
                path.display()
            )));
        }

        cropped.clear();
        for &j in &rows {
            let row = &plane[j * grid.width..(j + 1) * grid.width];
            cropped.extend(cols.iter().map(|&k| row[k]));
        }
        writer.write_month(&cropped)?;
        debug!("Converted {}", path.display());
    }

    writer.finish()
}
