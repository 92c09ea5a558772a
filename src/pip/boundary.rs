//! Country boundary collections loaded from GeoJSON or shapefiles.

use geo::{BoundingRect, Coord, LineString, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson};
use serde::{Deserialize, Serialize};
use shapefile::dbase::{FieldValue, Record};
use shapefile::PolygonRing;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Feature properties checked, in order, for the country name
const NAME_PROPERTIES: &[&str] = &["ADMIN", "name", "NAME"];

/// Source format of a boundary collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    /// datasets/geo-countries `countries.geojson`
    #[default]
    GeoJson,
    /// Natural Earth 10m admin-0 countries shapefile
    Shapefile,
}

impl BoundaryKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            BoundaryKind::GeoJson => "countries.geojson",
            BoundaryKind::Shapefile => "ne_10m_admin_0_countries.shp",
        }
    }

    /// Files that must sit next to the main file for it to be readable
    pub fn sidecars(&self, path: &Path) -> Vec<PathBuf> {
        match self {
            BoundaryKind::GeoJson => Vec::new(),
            BoundaryKind::Shapefile => vec![path.with_extension("dbf")],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryKind::GeoJson => "geojson",
            BoundaryKind::Shapefile => "shapefile",
        }
    }
}

impl std::fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "geojson" => Ok(BoundaryKind::GeoJson),
            "shapefile" => Ok(BoundaryKind::Shapefile),
            other => Err(Error::UnknownBoundaryKind(other.to_string())),
        }
    }
}

/// A named country geometry in lon/lat
#[derive(Debug, Clone)]
pub struct Country {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

impl Country {
    pub fn new(name: impl Into<String>, geometry: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            geometry,
        }
    }

    /// Bounding box as `(min_lon, min_lat, max_lon, max_lat)`
    pub fn bbox(&self) -> Option<(f64, f64, f64, f64)> {
        self.geometry
            .bounding_rect()
            .map(|rect| (rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }
}

/// Countries in file order
#[derive(Debug, Clone, Default)]
pub struct BoundaryStore {
    countries: Vec<Country>,
}

impl BoundaryStore {
    pub fn new(countries: Vec<Country>) -> Self {
        Self { countries }
    }

    /// Load a boundary file of the given kind
    pub fn load(path: &Path, kind: BoundaryKind) -> Result<Self> {
        if !path.exists() {
            return Err(Error::unavailable(
                path.display().to_string(),
                "boundary file does not exist",
            ));
        }

        let store = match kind {
            BoundaryKind::GeoJson => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::unavailable(path.display().to_string(), e.to_string()))?;
                Self::from_geojson_str(&text)?
            }
            BoundaryKind::Shapefile => {
                if let Some(missing) = kind.sidecars(path).into_iter().find(|p| !p.exists()) {
                    return Err(Error::unavailable(
                        path.display().to_string(),
                        format!("{} does not exist", missing.display()),
                    ));
                }
                Self::from_shapefile(path).map_err(|e| match e {
                    Error::Shapefile(e) => {
                        Error::unavailable(path.display().to_string(), e.to_string())
                    }
                    other => other,
                })?
            }
        };

        if store.is_empty() {
            warn!("No country polygons found in {}", path.display());
        } else {
            info!("Loaded {} countries from {}", store.len(), path.display());
        }
        Ok(store)
    }

    /// Parse a GeoJSON feature collection (or a single feature)
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let features = match text.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(Error::InvalidBoundaries(
                    "expected features carrying country names, found a bare geometry".to_string(),
                ))
            }
        };

        let mut countries = Vec::with_capacity(features.len());
        for (i, feature) in features.into_iter().enumerate() {
            let Some(name) = feature_name(&feature) else {
                debug!("Skipping feature {} without a name property", i);
                continue;
            };
            let Some(geometry) = feature.geometry else {
                debug!("Skipping {} without geometry", name);
                continue;
            };
            let geometry: geo_types::Geometry<f64> = geometry.try_into()?;
            match into_multipolygon(geometry) {
                Some(geometry) => countries.push(Country::new(name, geometry)),
                None => debug!("Skipping {} with non-polygonal geometry", name),
            }
        }

        Ok(Self { countries })
    }

    /// Read polygons and their DBF `ADMIN` (or `NAME`) field
    pub fn from_shapefile(path: &Path) -> Result<Self> {
        let shapes =
            shapefile::read_as::<_, shapefile::Polygon, Record>(path)?;

        let mut countries = Vec::with_capacity(shapes.len());
        for (i, (polygon, record)) in shapes.into_iter().enumerate() {
            let Some(name) = record_name(&record) else {
                debug!("Skipping shape {} without a name field", i);
                continue;
            };
            let geometry = rings_to_multipolygon(polygon.rings());
            if geometry.0.is_empty() {
                debug!("Skipping {} without outer rings", name);
                continue;
            }
            countries.push(Country::new(name, geometry));
        }

        Ok(Self { countries })
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Country> {
        self.countries.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Country> {
        self.countries.iter()
    }
}

fn feature_name(feature: &Feature) -> Option<String> {
    NAME_PROPERTIES
        .iter()
        .find_map(|key| feature.property(key)?.as_str())
        .map(str::to_string)
}

fn record_name(record: &Record) -> Option<String> {
    ["ADMIN", "NAME"].iter().find_map(|key| match record.get(key) {
        Some(FieldValue::Character(Some(value))) => Some(value.trim().to_string()),
        _ => None,
    })
}

fn into_multipolygon(geometry: geo_types::Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        geo_types::Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon])),
        geo_types::Geometry::MultiPolygon(multi) => Some(multi),
        geo_types::Geometry::GeometryCollection(collection) => {
            let polygons: Vec<Polygon<f64>> = collection
                .into_iter()
                .filter_map(into_multipolygon)
                .flat_map(|mp| mp.0)
                .collect();
            (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

/// Group shapefile rings into polygons; inner rings belong to the preceding outer ring
fn rings_to_multipolygon(rings: &[PolygonRing<shapefile::Point>]) -> MultiPolygon<f64> {
    let to_line = |points: &[shapefile::Point]| {
        LineString::new(points.iter().map(|p| Coord { x: p.x, y: p.y }).collect())
    };

    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();
    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push((to_line(points), Vec::new())),
            PolygonRing::Inner(points) => match polygons.last_mut() {
                Some((_, holes)) => holes.push(to_line(points)),
                None => debug!("Dropping inner ring without an outer ring"),
            },
        }
    }

    MultiPolygon::new(
        polygons
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}
