//! Sélection de la source la plus dense pour une région

use geo::Geometry;
use tracing::info;

use super::{BuildingInterface, CtrInterface, OsmInterface};
use crate::store::SpatialStore;
use crate::{BuildingError, BuildingRecord, HeightedPoint, Source};

/// Nombre de bâtiments visibles par source sur une même emprise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub ctr: u64,
    pub osm: u64,
}

impl Coverage {
    /// CTR uniquement si strictement plus dense; OSM gagne les égalités
    pub fn preferred(&self) -> Source {
        if self.ctr > self.osm {
            Source::Ctr
        } else {
            Source::Osm
        }
    }
}

/// Compte les bâtiments des deux sources sur `boundary`
pub fn compare_coverage<S: SpatialStore>(
    ctr: &CtrInterface<S>,
    osm: &OsmInterface<S>,
    boundary: &Geometry,
) -> Result<Coverage, BuildingError> {
    Ok(Coverage {
        ctr: ctr.count_intersecting(boundary)?,
        osm: osm.count_intersecting(boundary)?,
    })
}

/// Interface retenue par [`select_best_source`]
#[derive(Debug)]
pub enum SelectedSource<S> {
    Ctr(CtrInterface<S>),
    Osm(OsmInterface<S>),
}

/// Choisit l'interface dont la couverture est la plus dense sur la région
///
/// L'emprise est résolue une seule fois via la CTR puis réutilisée pour les
/// deux comptages. L'interface non retenue est libérée.
///
/// # Errors
///
/// `RegionNotFound` si la région n'existe pas; erreurs du store telles quelles.
pub fn select_best_source<S: SpatialStore>(
    ctr: CtrInterface<S>,
    osm: OsmInterface<S>,
    region: &str,
) -> Result<SelectedSource<S>, BuildingError> {
    let boundary = ctr.province_area(region)?;
    let (selected, _) = select_within(ctr, osm, &boundary)?;
    Ok(selected)
}

/// Arbitrage sur une emprise déjà connue, avec les comptages retenus
pub fn select_within<S: SpatialStore>(
    ctr: CtrInterface<S>,
    osm: OsmInterface<S>,
    boundary: &Geometry,
) -> Result<(SelectedSource<S>, Coverage), BuildingError> {
    let coverage = compare_coverage(&ctr, &osm, boundary)?;
    let chosen = coverage.preferred();

    info!(
        ctr = coverage.ctr,
        osm = coverage.osm,
        chosen = %chosen,
        "Selected building source"
    );

    let selected = match chosen {
        Source::Ctr => SelectedSource::Ctr(ctr),
        Source::Osm => SelectedSource::Osm(osm),
    };
    Ok((selected, coverage))
}

impl<S: SpatialStore> SelectedSource<S> {
    /// Attache une table d'extension à l'interface retenue
    pub fn add_extension(&mut self, table: impl Into<String>, property: impl Into<String>) {
        match self {
            SelectedSource::Ctr(ctr) => ctr.add_extension(table, property),
            SelectedSource::Osm(osm) => osm.add_extension(table, property),
        }
    }

    fn inner(&self) -> &dyn BuildingInterface {
        match self {
            SelectedSource::Ctr(ctr) => ctr,
            SelectedSource::Osm(osm) => osm,
        }
    }
}

impl<S: SpatialStore> BuildingInterface for SelectedSource<S> {
    fn source(&self) -> Source {
        self.inner().source()
    }

    fn count_intersecting(&self, shape: &Geometry) -> Result<u64, BuildingError> {
        self.inner().count_intersecting(shape)
    }

    fn fetch_intersecting(
        &self,
        shape: &Geometry,
        area: Option<&Geometry>,
    ) -> Result<Vec<BuildingRecord>, BuildingError> {
        self.inner().fetch_intersecting(shape, area)
    }

    fn fetch_by_id(&self, id: i64) -> Result<Option<BuildingRecord>, BuildingError> {
        self.inner().fetch_by_id(id)
    }

    fn province_area(&self, name: &str) -> Result<Geometry, BuildingError> {
        self.inner().province_area(name)
    }

    fn collect_heighted_points(
        &self,
        shape: &Geometry,
        area: Option<&Geometry>,
    ) -> Result<Vec<HeightedPoint>, BuildingError> {
        self.inner().collect_heighted_points(shape, area)
    }
}
