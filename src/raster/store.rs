//! Query-ready raster store: one variable, twelve months, regular lat-lon grid.
//!
//! Layout: `LLGRID01` magic, a little-endian `u64` header length, a JSON
//! [`RasterHeader`], then `months * nlat * nlon` little-endian `f32` cells in
//! `[month][lat][lon]` order.

use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::grid::Axis;

const MAGIC: &[u8; 8] = b"LLGRID01";
const PREAMBLE: usize = MAGIC.len() + 8;

/// Descriptive metadata and grid axes stored ahead of the cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterHeader {
    pub name: String,
    pub long_name: String,
    pub units: String,
    #[serde(default)]
    pub history: String,
    #[serde(default)]
    pub reference: String,
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub months: usize,
}

impl RasterHeader {
    fn cell_count(&self) -> Result<usize> {
        self.months
            .checked_mul(self.lat.len())
            .and_then(|n| n.checked_mul(self.lon.len()))
            .ok_or_else(|| {
                Error::InvalidRaster(format!("{} cell count overflows", self.name))
            })
    }
}

enum Cells {
    Owned(Vec<f32>),
    Mapped { map: Mmap, offset: usize },
}

/// A loaded raster variable
pub struct RasterVariable {
    header: RasterHeader,
    lat: Axis,
    lon: Axis,
    cells: Cells,
}

impl std::fmt::Debug for RasterVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterVariable")
            .field("name", &self.header.name)
            .field("months", &self.header.months)
            .field("nlat", &self.lat.len())
            .field("nlon", &self.lon.len())
            .finish()
    }
}

impl RasterVariable {
    /// Build an in-memory raster from cells in `[month][lat][lon]` order.
    pub fn from_cells(header: RasterHeader, cells: Vec<f32>) -> Result<Self> {
        let (lat, lon) = validate(&header)?;
        let expected = header.cell_count()?;
        if cells.len() != expected {
            return Err(Error::InvalidRaster(format!(
                "expected {} cells, got {}",
                expected,
                cells.len()
            )));
        }
        Ok(Self {
            header,
            lat,
            lon,
            cells: Cells::Owned(cells),
        })
    }

    /// Memory-map a raster store file.
    ///
    /// A missing or unreadable file is reported as unavailable data; a file
    /// that opens but does not parse is an invalid raster.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::unavailable(path.display().to_string(), e.to_string()))?;

        // SAFETY: store files are written to a temporary name and renamed into
        // place, so a mapped file is never modified underneath us.
        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| Error::unavailable(path.display().to_string(), e.to_string()))?;

        if map.len() < PREAMBLE || &map[..MAGIC.len()] != MAGIC {
            return Err(Error::InvalidRaster(format!(
                "{} is not a raster store",
                path.display()
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&map[MAGIC.len()..PREAMBLE]);
        let header_len = usize::try_from(u64::from_le_bytes(len_bytes))
            .map_err(|_| Error::InvalidRaster("header length overflows".to_string()))?;

        let header_end = PREAMBLE
            .checked_add(header_len)
            .filter(|end| *end <= map.len())
            .ok_or_else(|| Error::InvalidRaster("truncated header".to_string()))?;

        let header: RasterHeader = serde_json::from_slice(&map[PREAMBLE..header_end])
            .map_err(|e| Error::InvalidRaster(format!("bad header: {}", e)))?;
        let (lat, lon) = validate(&header)?;

        let expected = header
            .cell_count()?
            .checked_mul(4)
            .ok_or_else(|| Error::InvalidRaster(format!("{} size overflows", header.name)))?;
        if map.len() - header_end != expected {
            return Err(Error::InvalidRaster(format!(
                "{} holds {} data bytes, expected {}",
                path.display(),
                map.len() - header_end,
                expected
            )));
        }

        debug!(
            "Opened raster {} ({} x {} x {})",
            header.name,
            header.months,
            lat.len(),
            lon.len()
        );

        Ok(Self {
            header,
            lat,
            lon,
            cells: Cells::Mapped {
                map,
                offset: header_end,
            },
        })
    }

    pub fn header(&self) -> &RasterHeader {
        &self.header
    }

    pub fn lat(&self) -> &Axis {
        &self.lat
    }

    pub fn lon(&self) -> &Axis {
        &self.lon
    }

    pub fn months(&self) -> usize {
        self.header.months
    }

    /// Cell value; NaN marks missing data
    pub fn value(&self, month: usize, lat_idx: usize, lon_idx: usize) -> Option<f32> {
        if month >= self.header.months || lat_idx >= self.lat.len() || lon_idx >= self.lon.len() {
            return None;
        }
        let i = (month * self.lat.len() + lat_idx) * self.lon.len() + lon_idx;
        match &self.cells {
            Cells::Owned(cells) => cells.get(i).copied(),
            Cells::Mapped { map, offset } => {
                let start = offset + i * 4;
                let bytes: [u8; 4] = map.get(start..start + 4)?.try_into().ok()?;
                Some(f32::from_le_bytes(bytes))
            }
        }
    }

    /// The twelve monthly values of one cell
    pub fn monthly(&self, lat_idx: usize, lon_idx: usize) -> Result<[f64; 12]> {
        if self.header.months != 12 {
            return Err(Error::InvalidRaster(format!(
                "{} has {} months, expected 12",
                self.header.name, self.header.months
            )));
        }
        let mut out = [f64::NAN; 12];
        for (month, slot) in out.iter_mut().enumerate() {
            let v = self.value(month, lat_idx, lon_idx).ok_or_else(|| {
                Error::InvalidRaster(format!(
                    "cell ({}, {}) outside {}",
                    lat_idx, lon_idx, self.header.name
                ))
            })?;
            *slot = f64::from(v);
        }
        Ok(out)
    }

    /// Write this raster as a store file
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = RasterWriter::create(path, self.header.clone())?;
        let plane = self.lat.len() * self.lon.len();
        let mut buf = Vec::with_capacity(plane);
        for month in 0..self.header.months {
            buf.clear();
            for j in 0..self.lat.len() {
                for k in 0..self.lon.len() {
                    buf.push(self.value(month, j, k).unwrap_or(f32::NAN));
                }
            }
            writer.write_month(&buf)?;
        }
        writer.finish()
    }
}

fn validate(header: &RasterHeader) -> Result<(Axis, Axis)> {
    if header.months == 0 {
        return Err(Error::InvalidRaster(format!("{} has no months", header.name)));
    }
    let lat = Axis::new(header.lat.clone())?;
    let lon = Axis::new(header.lon.clone())?;
    Ok((lat, lon))
}

/// Streams a raster store to disk one month plane at a time.
///
/// Data goes to `<path>.part` and is renamed into place by [`finish`](Self::finish).
/// Dropping the writer before a successful finish removes the partial file.
pub struct RasterWriter {
    out: Option<BufWriter<File>>,
    partial: PathBuf,
    target: PathBuf,
    plane: usize,
    remaining: usize,
    finished: bool,
}

impl RasterWriter {
    pub fn create(path: &Path, header: RasterHeader) -> Result<Self> {
        validate(&header)?;
        let json = serde_json::to_vec(&header)?;
        let partial = partial_path(path);
        let out = BufWriter::new(File::create(&partial)?);

        let mut writer = Self {
            out: Some(out),
            partial,
            target: path.to_path_buf(),
            plane: header.lat.len() * header.lon.len(),
            remaining: header.months,
            finished: false,
        };
        if let Some(out) = writer.out.as_mut() {
            out.write_all(MAGIC)?;
            out.write_all(&(json.len() as u64).to_le_bytes())?;
            out.write_all(&json)?;
        }
        Ok(writer)
    }

    /// Append one month in `[lat][lon]` order
    pub fn write_month(&mut self, cells: &[f32]) -> Result<()> {
        if self.remaining == 0 {
            return Err(Error::InvalidRaster("too many months written".to_string()));
        }
        if cells.len() != self.plane {
            return Err(Error::InvalidRaster(format!(
                "month plane has {} cells, expected {}",
                cells.len(),
                self.plane
            )));
        }
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| Error::InvalidRaster("writer already finished".to_string()))?;
        for v in cells {
            out.write_all(&v.to_le_bytes())?;
        }
        self.remaining -= 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        if self.remaining != 0 {
            return Err(Error::InvalidRaster(format!(
                "{} months missing",
                self.remaining
            )));
        }
        if let Some(mut out) = self.out.take() {
            out.flush()?;
        }
        std::fs::rename(&self.partial, &self.target)?;
        self.finished = true;
        Ok(())
    }
}

impl Drop for RasterWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.out.take());
        if std::fs::remove_file(&self.partial).is_ok() {
            debug!("Removed incomplete {}", self.partial.display());
        }
    }
}

/// Sibling `.part` path used while a file is being written
pub(crate) fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(lat: Vec<f64>, lon: Vec<f64>) -> RasterHeader {
        RasterHeader {
            name: "tavg".to_string(),
            long_name: "average temperature".to_string(),
            units: "degC".to_string(),
            history: String::new(),
            reference: String::new(),
            lat,
            lon,
            months: 12,
        }
    }

    fn cells(nlat: usize, nlon: usize) -> Vec<f32> {
        (0..12 * nlat * nlon).map(|i| i as f32).collect()
    }

    #[test]
    fn test_save_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tavg_10m.grid");

        let raster =
            RasterVariable::from_cells(header(vec![50.0, 40.0], vec![0.0, 10.0]), cells(2, 2))
                .unwrap();
        raster.save(&path).unwrap();
        assert!(!partial_path(&path).exists());

        let loaded = RasterVariable::open(&path).unwrap();
        assert_eq!(loaded.header(), raster.header());
        for m in 0..12 {
            for j in 0..2 {
                for k in 0..2 {
                    assert_eq!(loaded.value(m, j, k), raster.value(m, j, k));
                }
            }
        }
        // month stride is nlat * nlon = 4
        let monthly = loaded.monthly(1, 0).unwrap();
        assert_eq!(monthly[0], 2.0);
        assert_eq!(monthly[1], 6.0);
        assert_eq!(loaded.value(12, 0, 0), None);
    }

    #[test]
    fn test_rejects_wrong_cell_count() {
        let err = RasterVariable::from_cells(header(vec![0.0], vec![0.0]), vec![1.0; 5]);
        assert!(matches!(err, Err(Error::InvalidRaster(_))));
    }

    #[test]
    fn test_open_missing_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = RasterVariable::open(&dir.path().join("nope.grid")).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }

    #[test]
    fn test_open_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tavg_10m.grid");
        let raster =
            RasterVariable::from_cells(header(vec![1.0, 0.0], vec![0.0]), cells(2, 1)).unwrap();
        raster.save(&path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        assert!(matches!(
            RasterVariable::open(&path),
            Err(Error::InvalidRaster(_))
        ));

        std::fs::write(&path, b"not a raster").unwrap();
        assert!(matches!(
            RasterVariable::open(&path),
            Err(Error::InvalidRaster(_))
        ));
    }

    #[test]
    fn test_writer_requires_all_months() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.grid");
        let mut writer = RasterWriter::create(&path, header(vec![0.0], vec![0.0])).unwrap();
        writer.write_month(&[1.0]).unwrap();
        assert!(writer.write_month(&[1.0, 2.0]).is_err());
        assert!(writer.finish().is_err());
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[test]
    fn test_dropped_writer_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.grid");
        let mut writer = RasterWriter::create(&path, header(vec![0.0], vec![0.0])).unwrap();
        writer.write_month(&[1.0]).unwrap();
        assert!(partial_path(&path).exists());

        drop(writer);
        assert!(!partial_path(&path).exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_overflowing_header_is_invalid() {
        let mut huge = header(vec![1.0, 0.0], vec![0.0, 1.0]);
        huge.months = usize::MAX / 2;
        assert!(matches!(
            RasterVariable::from_cells(huge.clone(), vec![0.0; 4]),
            Err(Error::InvalidRaster(_))
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.grid");
        let json = serde_json::to_vec(&huge).unwrap();
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&(json.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&json);
        bytes.extend_from_slice(&[0u8; 16]);
        std::fs::write(&path, bytes).unwrap();
        assert!(matches!(
            RasterVariable::open(&path),
            Err(Error::InvalidRaster(_))
        ));
    }
}
