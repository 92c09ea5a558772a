//! Country lookup for query points.

use geo::{Contains, Point};
use tracing::debug;

use super::{BoundaryKind, BoundaryStore, CountryIndex};
use crate::acquire::DataSource;
use crate::error::{check_shapes, normalize_lon, Result};

/// Result for points outside every polygon
pub const UNKNOWN_COUNTRY: &str = "unknown";

/// Point-in-polygon lookup over a loaded boundary store
pub struct CountryResolver {
    store: BoundaryStore,
    index: Option<CountryIndex>,
}

impl CountryResolver {
    /// Linear scan over every polygon in store order
    pub fn new(store: BoundaryStore) -> Self {
        Self { store, index: None }
    }

    /// Prefilter candidates with an R-tree; results match [`CountryResolver::new`]
    pub fn indexed(store: BoundaryStore) -> Self {
        let index = CountryIndex::build(&store);
        Self {
            store,
            index: Some(index),
        }
    }

    /// Name of the first country containing the point, if any
    pub fn lookup(&self, lat: f64, lon: f64) -> Option<&str> {
        let lon = normalize_lon(lon);
        let position = match &self.index {
            Some(index) => index.lookup(&self.store, lon, lat),
            None => {
                let point = Point::new(lon, lat);
                self.store
                    .iter()
                    .position(|country| country.geometry.contains(&point))
            }
        };
        position
            .and_then(|p| self.store.get(p))
            .map(|c| c.name.as_str())
    }

    /// Country name, or [`UNKNOWN_COUNTRY`]
    pub fn country(&self, lat: f64, lon: f64) -> String {
        self.lookup(lat, lon).unwrap_or(UNKNOWN_COUNTRY).to_string()
    }

    /// Names aligned with the input points
    pub fn countries(&self, lat: &[f64], lon: &[f64]) -> Result<Vec<String>> {
        check_shapes(lat, lon)?;
        Ok(lat
            .iter()
            .zip(lon)
            .map(|(&lat, &lon)| self.country(lat, lon))
            .collect())
    }

    pub fn store(&self) -> &BoundaryStore {
        &self.store
    }
}

/// Country names for a batch of points, using the geo-countries GeoJSON
pub fn get_country<S: DataSource>(source: &S, lat: &[f64], lon: &[f64]) -> Result<Vec<String>> {
    get_country_in(source, BoundaryKind::GeoJson, lat, lon)
}

/// Country name for a single point, using the geo-countries GeoJSON
pub fn get_country_at<S: DataSource>(source: &S, lat: f64, lon: f64) -> Result<String> {
    let names = get_country(source, &[lat], &[lon])?;
    Ok(names
        .into_iter()
        .next()
        .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()))
}

/// Country names for a batch of points against the chosen boundary set.
///
/// The boundary file is loaded once per call and dropped on return.
pub fn get_country_in<S: DataSource>(
    source: &S,
    kind: BoundaryKind,
    lat: &[f64],
    lon: &[f64],
) -> Result<Vec<String>> {
    check_shapes(lat, lon)?;

    let path = source.resolve_boundaries(kind)?;
    let resolver = CountryResolver::new(BoundaryStore::load(&path, kind)?);

    let names = resolver.countries(lat, lon)?;
    debug!(
        "Resolved {} points against {} countries",
        names.len(),
        resolver.store().len()
    );
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pip::Country;
    use crate::test_support::{write_countries, write_shapefile, RecordingSource};
    use geo::{polygon, MultiPolygon};

    fn germany_and_overlap() -> BoundaryStore {
        let germany = polygon![
            (x: 5.9, y: 47.3),
            (x: 15.0, y: 47.3),
            (x: 15.0, y: 55.0),
            (x: 5.9, y: 55.0),
            (x: 5.9, y: 47.3),
        ];
        // Overlaps Germany's eastern half; listed second so never wins there
        let neighbour = polygon![
            (x: 10.0, y: 45.0),
            (x: 20.0, y: 45.0),
            (x: 20.0, y: 52.0),
            (x: 10.0, y: 52.0),
            (x: 10.0, y: 45.0),
        ];
        let wrapped = polygon![
            (x: -170.0, y: 10.0),
            (x: -160.0, y: 10.0),
            (x: -160.0, y: 20.0),
            (x: -170.0, y: 20.0),
            (x: -170.0, y: 10.0),
        ];
        BoundaryStore::new(vec![
            Country::new("Germany", MultiPolygon::new(vec![germany])),
            Country::new("Neighbour", MultiPolygon::new(vec![neighbour])),
            Country::new("Pacifica", MultiPolygon::new(vec![wrapped])),
        ])
    }

    #[test]
    fn test_first_containing_polygon_wins() {
        let resolver = CountryResolver::new(germany_and_overlap());
        assert_eq!(resolver.country(50.0, 10.5), "Germany");
        assert_eq!(resolver.country(46.0, 15.0), "Neighbour");
    }

    #[test]
    fn test_unknown_fallback() {
        let resolver = CountryResolver::new(germany_and_overlap());
        assert_eq!(resolver.lookup(0.0, -140.0), None);
        assert_eq!(resolver.country(0.0, -140.0), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_longitudes_above_180_wrap() {
        let resolver = CountryResolver::new(germany_and_overlap());
        assert_eq!(resolver.country(15.0, 195.0), "Pacifica");
    }

    #[test]
    fn test_indexed_matches_linear() {
        let linear = CountryResolver::new(germany_and_overlap());
        let indexed = CountryResolver::indexed(germany_and_overlap());

        let mut lat = Vec::new();
        let mut lon = Vec::new();
        for i in 0..=40 {
            for j in 0..=40 {
                lat.push(40.0 + i as f64 * 0.5);
                lon.push(0.0 + j as f64 * 0.5);
            }
        }
        lat.push(15.0);
        lon.push(-165.0);

        assert_eq!(
            linear.countries(&lat, &lon).unwrap(),
            indexed.countries(&lat, &lon).unwrap()
        );
    }

    #[test]
    fn test_get_country_batch_and_scalar() {
        let dir = tempfile::tempdir().unwrap();
        write_countries(dir.path());
        let source = RecordingSource::new(dir.path());

        assert_eq!(get_country_at(&source, 50.0, 10.0).unwrap(), "Germany");

        let names = get_country(&source, &[50.0, 0.0, 50.0], &[10.0, -140.0, 10.0]).unwrap();
        assert_eq!(names, vec!["Germany", UNKNOWN_COUNTRY, "Germany"]);
        assert_eq!(source.boundary_requests(), 2);
    }

    #[test]
    fn test_get_country_from_shapefile() {
        let dir = tempfile::tempdir().unwrap();
        write_shapefile(
            dir.path(),
            BoundaryKind::Shapefile.file_name(),
            "ADMIN",
            &[("Germany", (5.9, 47.3, 15.0, 55.0))],
        );
        let source = RecordingSource::new(dir.path());

        let names =
            get_country_in(&source, BoundaryKind::Shapefile, &[50.0, 0.0], &[10.0, -140.0])
                .unwrap();
        assert_eq!(names, vec!["Germany", UNKNOWN_COUNTRY]);
    }

    #[test]
    fn test_shape_mismatch_does_no_io() {
        let dir = tempfile::tempdir().unwrap();
        let source = RecordingSource::new(dir.path());
        let err = get_country(&source, &[50.0, 51.0], &[10.0]).unwrap_err();
        assert!(matches!(err, crate::Error::ShapeMismatch { lat: 2, lon: 1 }));
        assert_eq!(source.boundary_requests(), 0);
    }

    #[test]
    fn test_missing_boundaries_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = RecordingSource::new(dir.path());
        let err = get_country_at(&source, 50.0, 10.0).unwrap_err();
        assert!(matches!(err, crate::Error::DataUnavailable { .. }));
    }
}
