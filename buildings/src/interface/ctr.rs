//! Interface sur la couche CTR (Carta Tecnica Regionale)

use geo::Geometry;
use tracing::debug;

use super::{resolve_region, BuildingInterface};
use crate::store::{BuildingFilter, Extension, SpatialStore};
use crate::{BuildingError, BuildingRecord, Source};

/// Codes CTR retenus par défaut comme bâtiments
///
/// - `0201` édifice civil
/// - `0202` édifice industriel
/// - `0203` édifice religieux
/// - `0211` gare / maison de garde-barrière
/// - `0212` centrale électrique / sous-station
/// - `0215` hangar de pépinière
/// - `0216` étable / grange
/// - `0223` à `0228` complexes hospitalier, scolaire, sportif, religieux, social, cimetière
///
/// Sont exclus entre autres `0204` (inachevé), `0206` (portique), `0207`
/// (baraque), `0208` (auvent), `0209` (tente pressurisée), `0210` (serre)
/// et `0229` (camping).
pub const DEFAULT_CTR_CODES: [&str; 13] = [
    "0201", "0202", "0203", "0211", "0212", "0215", "0216", "0223", "0224", "0225", "0226",
    "0227", "0228",
];

/// Interface CTR: seuls les codes de la liste autorisée sont visibles
#[derive(Debug)]
pub struct CtrInterface<S> {
    store: S,
    codes: Vec<String>,
    extensions: Vec<Extension>,
}

impl<S: SpatialStore> CtrInterface<S> {
    /// Interface avec la liste de codes par défaut
    pub fn new(store: S) -> Self {
        Self::with_codes(store, DEFAULT_CTR_CODES.iter().map(|c| c.to_string()))
    }

    /// Interface avec une liste de codes explicite
    pub fn with_codes<I, C>(store: S, codes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            store,
            codes: codes.into_iter().map(Into::into).collect(),
            extensions: Vec::new(),
        }
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Attache une table d'extension exposée sous `property`
    pub fn add_extension(&mut self, table: impl Into<String>, property: impl Into<String>) {
        self.extensions.push(Extension {
            table: table.into(),
            property: property.into(),
        });
    }
}

impl<S: SpatialStore> BuildingInterface for CtrInterface<S> {
    fn source(&self) -> Source {
        Source::Ctr
    }

    fn count_intersecting(&self, shape: &Geometry) -> Result<u64, BuildingError> {
        let filter = BuildingFilter::intersecting(shape).with_codes(&self.codes);
        let count = self.store.count_buildings(Source::Ctr, &filter)?;
        debug!(count, codes = self.codes.len(), "CTR count");
        Ok(count)
    }

    fn fetch_intersecting(
        &self,
        shape: &Geometry,
        area: Option<&Geometry>,
    ) -> Result<Vec<BuildingRecord>, BuildingError> {
        let mut filter = BuildingFilter::intersecting(shape).with_codes(&self.codes);
        if let Some(area) = area {
            filter = filter.and_intersecting(area);
        }
        let buildings = self
            .store
            .fetch_buildings(Source::Ctr, &filter, &self.extensions)?;
        debug!(count = buildings.len(), with_area = area.is_some(), "CTR fetch");
        Ok(buildings)
    }

    fn fetch_by_id(&self, id: i64) -> Result<Option<BuildingRecord>, BuildingError> {
        self.store.fetch_building(Source::Ctr, id, &self.extensions)
    }

    fn province_area(&self, name: &str) -> Result<Geometry, BuildingError> {
        resolve_region(&self.store, name)
    }
}
