//! Interface sur la couche OSM (avec hauteurs DSM/DTM optionnelles)

use geo::Geometry;
use tracing::debug;

use super::{resolve_region, BuildingInterface};
use crate::store::{BuildingFilter, Extension, SpatialStore};
use crate::{BuildingError, BuildingRecord, Source};

/// Interface OSM: pas de filtre de classification
#[derive(Debug)]
pub struct OsmInterface<S> {
    store: S,
    extensions: Vec<Extension>,
}

impl<S: SpatialStore> OsmInterface<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            extensions: Vec::new(),
        }
    }

    /// Attache une table d'extension exposée sous `property`
    pub fn add_extension(&mut self, table: impl Into<String>, property: impl Into<String>) {
        self.extensions.push(Extension {
            table: table.into(),
            property: property.into(),
        });
    }
}

impl<S: SpatialStore> BuildingInterface for OsmInterface<S> {
    fn source(&self) -> Source {
        Source::Osm
    }

    fn count_intersecting(&self, shape: &Geometry) -> Result<u64, BuildingError> {
        let count = self
            .store
            .count_buildings(Source::Osm, &BuildingFilter::intersecting(shape))?;
        debug!(count, "OSM count");
        Ok(count)
    }

    fn fetch_intersecting(
        &self,
        shape: &Geometry,
        area: Option<&Geometry>,
    ) -> Result<Vec<BuildingRecord>, BuildingError> {
        let filter = match area {
            Some(area) => BuildingFilter::intersecting(area).and_intersecting(shape),
            None => BuildingFilter::intersecting(shape),
        };
        let buildings = self
            .store
            .fetch_buildings(Source::Osm, &filter, &self.extensions)?;
        debug!(count = buildings.len(), with_area = area.is_some(), "OSM fetch");
        Ok(buildings)
    }

    fn fetch_by_id(&self, id: i64) -> Result<Option<BuildingRecord>, BuildingError> {
        self.store.fetch_building(Source::Osm, id, &self.extensions)
    }

    fn province_area(&self, name: &str) -> Result<Geometry, BuildingError> {
        resolve_region(&self.store, name)
    }
}
