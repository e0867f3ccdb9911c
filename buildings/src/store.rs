//! Contrat du store spatial consommé par les interfaces
//!
//! Le store exécute les prédicats (intersection, filtre de codes, tri par id);
//! les interfaces se contentent de composer les filtres.

use geo::Geometry;

use crate::{BuildingError, BuildingRecord, Region, Source};

/// Donnée supplémentaire attachée 1:1 à un bâtiment, clé = même identifiant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Table source de l'extension
    pub table: String,
    /// Nom sous lequel la donnée est exposée sur le bâtiment
    pub property: String,
}

/// Nom de propriété par défaut d'une extension
pub const DEFAULT_EXTENSION_PROPERTY: &str = "eco_data";

/// Filtre de requête: intersection avec TOUTES les formes (ET logique)
/// et, éventuellement, code de classification dans la liste autorisée
#[derive(Debug, Clone, Default)]
pub struct BuildingFilter<'a> {
    pub shapes: Vec<&'a Geometry>,
    pub codes: Option<&'a [String]>,
}

impl<'a> BuildingFilter<'a> {
    pub fn intersecting(shape: &'a Geometry) -> Self {
        Self {
            shapes: vec![shape],
            codes: None,
        }
    }

    /// Ajoute une forme supplémentaire à intersecter
    pub fn and_intersecting(mut self, shape: &'a Geometry) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn with_codes(mut self, codes: &'a [String]) -> Self {
        self.codes = Some(codes);
        self
    }

    /// Vérifie un code de classification contre la liste autorisée
    pub fn accepts_code(&self, code: Option<&str>) -> bool {
        match (self.codes, code) {
            (None, _) => true,
            (Some(codes), Some(code)) => codes.iter().any(|c| c == code),
            (Some(_), None) => false,
        }
    }
}

/// Accès en lecture à des couches de bâtiments indexées spatialement
///
/// Chaque appel bloque jusqu'à la réponse du backend; aucune mise en cache.
pub trait SpatialStore {
    /// Nombre de bâtiments de `source` satisfaisant `filter`
    fn count_buildings(&self, source: Source, filter: &BuildingFilter<'_>)
        -> Result<u64, BuildingError>;

    /// Bâtiments satisfaisant `filter`, triés par identifiant croissant
    fn fetch_buildings(
        &self,
        source: Source,
        filter: &BuildingFilter<'_>,
        extensions: &[Extension],
    ) -> Result<Vec<BuildingRecord>, BuildingError>;

    /// Lookup exact par identifiant
    fn fetch_building(
        &self,
        source: Source,
        id: i64,
        extensions: &[Extension],
    ) -> Result<Option<BuildingRecord>, BuildingError>;

    /// Région dont le nom (déjà en majuscules) correspond exactement
    fn find_region(&self, name: &str) -> Result<Option<Region>, BuildingError>;
}

impl<S: SpatialStore + ?Sized> SpatialStore for &S {
    fn count_buildings(
        &self,
        source: Source,
        filter: &BuildingFilter<'_>,
    ) -> Result<u64, BuildingError> {
        (**self).count_buildings(source, filter)
    }

    fn fetch_buildings(
        &self,
        source: Source,
        filter: &BuildingFilter<'_>,
        extensions: &[Extension],
    ) -> Result<Vec<BuildingRecord>, BuildingError> {
        (**self).fetch_buildings(source, filter, extensions)
    }

    fn fetch_building(
        &self,
        source: Source,
        id: i64,
        extensions: &[Extension],
    ) -> Result<Option<BuildingRecord>, BuildingError> {
        (**self).fetch_building(source, id, extensions)
    }

    fn find_region(&self, name: &str) -> Result<Option<Region>, BuildingError> {
        (**self).find_region(name)
    }
}
