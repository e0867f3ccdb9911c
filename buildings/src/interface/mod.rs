//! Interfaces de lookup de bâtiments (CTR, OSM) et sélection de la source

pub mod best;
pub mod ctr;
pub mod osm;

pub use best::{compare_coverage, select_best_source, select_within, Coverage, SelectedSource};
pub use ctr::{CtrInterface, DEFAULT_CTR_CODES};
pub use osm::OsmInterface;

use geo::Geometry;
use tracing::debug;

use crate::store::SpatialStore;
use crate::{BuildingError, BuildingRecord, HeightedPoint, Source};

/// Surface de requête commune aux deux sources
pub trait BuildingInterface {
    /// Source servie par cette interface
    fn source(&self) -> Source;

    /// Nombre de bâtiments visibles intersectant `shape`
    fn count_intersecting(&self, shape: &Geometry) -> Result<u64, BuildingError>;

    /// Bâtiments visibles intersectant `shape` (et `area` si fourni), triés par id
    fn fetch_intersecting(
        &self,
        shape: &Geometry,
        area: Option<&Geometry>,
    ) -> Result<Vec<BuildingRecord>, BuildingError>;

    /// Lookup exact, `None` si l'identifiant n'existe pas dans la source
    fn fetch_by_id(&self, id: i64) -> Result<Option<BuildingRecord>, BuildingError>;

    /// Emprise de la région nommée (nom insensible à la casse)
    fn province_area(&self, name: &str) -> Result<Geometry, BuildingError>;

    /// Point représentatif et hauteur de chaque bâtiment intersectant
    ///
    /// La résolution de hauteur est faite bâtiment par bâtiment: un bâtiment
    /// sans hauteur n'interrompt pas le lot, il porte `Err(DataUnavailable)`.
    fn collect_heighted_points(
        &self,
        shape: &Geometry,
        area: Option<&Geometry>,
    ) -> Result<Vec<HeightedPoint>, BuildingError> {
        let points: Vec<HeightedPoint> = self
            .fetch_intersecting(shape, area)?
            .iter()
            .map(BuildingRecord::heighted_point)
            .collect();

        debug!(
            source = %self.source(),
            total = points.len(),
            with_height = points.iter().filter(|p| p.has_height()).count(),
            "Collected heighted points"
        );

        Ok(points)
    }
}

/// Résout une région par son nom, normalisé en majuscules
pub(crate) fn resolve_region<S: SpatialStore>(
    store: &S,
    name: &str,
) -> Result<Geometry, BuildingError> {
    let normalized = name.trim().to_uppercase();
    store
        .find_region(&normalized)?
        .map(|region| region.geometry)
        .ok_or_else(|| BuildingError::RegionNotFound(name.to_string()))
}
