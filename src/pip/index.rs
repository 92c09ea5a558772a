//! Optional R-tree prefilter for country lookups.

use geo::{Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use super::BoundaryStore;

/// Bounding box of one country, keyed by its position in the store
#[derive(Debug, Clone)]
struct IndexedCountry {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedCountry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over country bounding boxes.
///
/// Bounding boxes only narrow the candidates; every candidate is tested with
/// exact containment and the earliest store position wins, as in a linear scan.
pub struct CountryIndex {
    tree: RTree<IndexedCountry>,
}

impl CountryIndex {
    pub fn build(store: &BoundaryStore) -> Self {
        let indexed: Vec<IndexedCountry> = store
            .iter()
            .enumerate()
            .filter_map(|(position, country)| {
                let (min_x, min_y, max_x, max_y) = country.bbox()?;
                Some(IndexedCountry {
                    position,
                    envelope: AABB::from_corners([min_x, min_y], [max_x, max_y]),
                })
            })
            .collect();

        let tree = RTree::bulk_load(indexed);
        debug!("Country index built with {} entries", tree.size());
        Self { tree }
    }

    /// Store position of the first country containing the point
    pub fn lookup(&self, store: &BoundaryStore, lon: f64, lat: f64) -> Option<usize> {
        let point = Point::new(lon, lat);
        let query_envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ic| {
                store
                    .get(ic.position)
                    .map_or(false, |c| c.geometry.contains(&point))
            })
            .map(|ic| ic.position)
            .min()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
