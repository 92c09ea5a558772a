//! Offline fixtures shared by unit tests.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use crate::acquire::{raster_file_name, DataSource};
use crate::climate::{Resolution, Variable};
use crate::error::{Error, Result};
use crate::pip::BoundaryKind;
use crate::raster::{RasterHeader, RasterVariable};

/// Serves files from a directory and records every request; never downloads.
pub(crate) struct RecordingSource {
    root: PathBuf,
    rasters: RefCell<Vec<(Variable, Resolution)>>,
    boundaries: RefCell<Vec<BoundaryKind>>,
}

impl RecordingSource {
    pub(crate) fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            rasters: RefCell::new(Vec::new()),
            boundaries: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn raster_requests(&self) -> Vec<(Variable, Resolution)> {
        self.rasters.borrow().clone()
    }

    pub(crate) fn boundary_requests(&self) -> usize {
        self.boundaries.borrow().len()
    }

    fn existing(&self, name: String) -> Result<PathBuf> {
        let path = self.root.join(&name);
        if path.exists() {
            Ok(path)
        } else {
            Err(Error::unavailable(name, "not present in fixture directory"))
        }
    }
}

impl DataSource for RecordingSource {
    fn resolve_raster(&self, variable: Variable, resolution: Resolution) -> Result<PathBuf> {
        self.rasters.borrow_mut().push((variable, resolution));
        self.existing(raster_file_name(variable, resolution))
    }

    fn resolve_boundaries(&self, kind: BoundaryKind) -> Result<PathBuf> {
        self.boundaries.borrow_mut().push(kind);
        self.existing(kind.file_name().to_string())
    }
}

/// A rough Germany box plus a small Pacific island, as `countries.geojson`
pub(crate) fn write_countries(dir: &Path) {
    let text = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"ADMIN": "Germany", "ISO_A3": "DEU"},
                "geometry": {"type": "Polygon", "coordinates": [
                    [[5.9, 47.3], [15.0, 47.3], [15.0, 55.0], [5.9, 55.0], [5.9, 47.3]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"ADMIN": "Pacifica"},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[-170, 10], [-160, 10], [-160, 20], [-170, 20], [-170, 10]]]
                ]}
            }
        ]
    }"#;
    std::fs::write(dir.join(BoundaryKind::GeoJson.file_name()), text).unwrap();
}

/// Write a 12-month raster store; `cell(month, lat_idx, lon_idx)` gives each value
pub(crate) fn write_raster(
    dir: &Path,
    variable: Variable,
    resolution: Resolution,
    lat: Vec<f64>,
    lon: Vec<f64>,
    cell: impl Fn(usize, usize, usize) -> f32,
) -> PathBuf {
    let mut cells = Vec::with_capacity(12 * lat.len() * lon.len());
    for m in 0..12 {
        for j in 0..lat.len() {
            for k in 0..lon.len() {
                cells.push(cell(m, j, k));
            }
        }
    }
    let header = RasterHeader {
        name: variable.name().to_string(),
        long_name: variable.long_name().to_string(),
        units: variable.units().to_string(),
        history: String::new(),
        reference: String::new(),
        lat,
        lon,
        months: 12,
    };
    let path = dir.join(raster_file_name(variable, resolution));
    RasterVariable::from_cells(header, cells)
        .unwrap()
        .save(&path)
        .unwrap();
    path
}

/// Write one box polygon per `(name, (min_x, min_y, max_x, max_y))` with the
/// name stored in the `field` attribute column
pub(crate) fn write_shapefile(
    dir: &Path,
    file_name: &str,
    field: &str,
    countries: &[(&str, (f64, f64, f64, f64))],
) -> PathBuf {
    use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
    use shapefile::{Point, Polygon, PolygonRing};

    let path = dir.join(file_name);
    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from(field).unwrap(), 80);
    let mut writer = shapefile::Writer::from_path(&path, table).unwrap();

    for (name, (x0, y0, x1, y1)) in countries {
        let ring = PolygonRing::Outer(vec![
            Point::new(*x0, *y0),
            Point::new(*x0, *y1),
            Point::new(*x1, *y1),
            Point::new(*x1, *y0),
            Point::new(*x0, *y0),
        ]);
        let mut record = Record::default();
        record.insert(field.to_string(), FieldValue::Character(Some(name.to_string())));
        writer
            .write_shape_and_record(&Polygon::new(ring), &record)
            .unwrap();
    }
    path
}
