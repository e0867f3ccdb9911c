//! Store spatial en mémoire
//!
//! Scan linéaire avec les prédicats `geo`, destiné aux tests et aux petits
//! jeux de données chargés hors base.

use std::collections::HashMap;

use geo::Intersects;

use crate::store::{BuildingFilter, Extension, SpatialStore};
use crate::{BuildingError, BuildingRecord, Region, Source};

#[derive(Debug, Default)]
pub struct MemoryStore {
    ctr: Vec<BuildingRecord>,
    osm: Vec<BuildingRecord>,
    regions: Vec<Region>,
    /// table -> (id -> ligne)
    extensions: HashMap<String, HashMap<i64, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un bâtiment dans la couche correspondant à sa source
    pub fn insert(&mut self, building: BuildingRecord) {
        match building.source() {
            Source::Ctr => self.ctr.push(building),
            Source::Osm => self.osm.push(building),
        }
    }

    pub fn with_buildings<I>(mut self, buildings: I) -> Self
    where
        I: IntoIterator<Item = BuildingRecord>,
    {
        for building in buildings {
            self.insert(building);
        }
        self
    }

    pub fn with_region(mut self, name: impl Into<String>, geometry: geo::Geometry) -> Self {
        self.regions.push(Region {
            name: name.into(),
            geometry,
        });
        self
    }

    /// Ajoute une ligne dans une table d'extension
    pub fn with_extension_row(
        mut self,
        table: impl Into<String>,
        id: i64,
        row: serde_json::Value,
    ) -> Self {
        self.extensions
            .entry(table.into())
            .or_default()
            .insert(id, row);
        self
    }

    fn layer(&self, source: Source) -> &[BuildingRecord] {
        match source {
            Source::Ctr => &self.ctr,
            Source::Osm => &self.osm,
        }
    }

    fn matching(&self, source: Source, filter: &BuildingFilter<'_>) -> Vec<&BuildingRecord> {
        self.layer(source)
            .iter()
            .filter(|b| {
                filter.accepts_code(b.classification())
                    && filter.shapes.iter().all(|shape| b.geometry().intersects(*shape))
            })
            .collect()
    }

    fn extend(&self, building: &BuildingRecord, extensions: &[Extension]) -> BuildingRecord {
        extensions.iter().fold(building.clone(), |acc, ext| {
            match self
                .extensions
                .get(&ext.table)
                .and_then(|rows| rows.get(&building.id()))
            {
                Some(row) => acc.with_extension(ext.property.clone(), row.clone()),
                None => acc,
            }
        })
    }
}

impl SpatialStore for MemoryStore {
    fn count_buildings(
        &self,
        source: Source,
        filter: &BuildingFilter<'_>,
    ) -> Result<u64, BuildingError> {
        Ok(self.matching(source, filter).len() as u64)
    }

    fn fetch_buildings(
        &self,
        source: Source,
        filter: &BuildingFilter<'_>,
        extensions: &[Extension],
    ) -> Result<Vec<BuildingRecord>, BuildingError> {
        let mut buildings: Vec<BuildingRecord> = self
            .matching(source, filter)
            .into_iter()
            .map(|b| self.extend(b, extensions))
            .collect();
        buildings.sort_unstable_by_key(BuildingRecord::id);
        Ok(buildings)
    }

    fn fetch_building(
        &self,
        source: Source,
        id: i64,
        extensions: &[Extension],
    ) -> Result<Option<BuildingRecord>, BuildingError> {
        Ok(self
            .layer(source)
            .iter()
            .find(|b| b.id() == id)
            .map(|b| self.extend(b, extensions)))
    }

    fn find_region(&self, name: &str) -> Result<Option<Region>, BuildingError> {
        Ok(self
            .regions
            .iter()
            .find(|r| r.name.to_uppercase() == name)
            .cloned())
    }
}
