//! Types de données pour le crate buildings

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use geo::{Geometry, InteriorPoint, Point};

use crate::{BuildingError, DataUnavailable};

/// Hauteur d'antenne fixe (mètres) utilisable comme substitut
pub const DEFAULT_ANTENNA_HEIGHT: f64 = 4.0;

/// Jeu de données source d'un bâtiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Carta Tecnica Regionale
    Ctr,
    /// OpenStreetMap
    Osm,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Ctr => "CTR",
            Source::Osm => "OSM",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ctr" => Ok(Source::Ctr),
            "osm" => Ok(Source::Osm),
            _ => Err(format!("Invalid source: {}. Use: ctr, osm", s)),
        }
    }
}

/// Statistiques d'élévation liées 1:1 à un bâtiment OSM
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightRecord {
    /// Identifiant du bâtiment propriétaire
    pub id: i64,
    pub surface_min: f64,
    pub surface_avg: f64,
    pub surface_max: f64,
    pub terrain_min: f64,
    pub terrain_avg: f64,
    pub terrain_max: f64,
}

impl HeightRecord {
    /// Hauteur moyenne: DSM moyen moins DTM moyen
    pub fn average_height(&self) -> f64 {
        self.surface_avg - self.terrain_avg
    }
}

/// Attributs d'un bâtiment CTR
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CtrAttributes {
    pub foglio: Option<String>,
    /// Code de classification (ex: "0201" édifice civil)
    pub codice: String,
    pub record: Option<i32>,
    pub topon: Option<String>,
    pub area: Option<f64>,
    pub identif: Option<String>,
}

/// Attributs d'un bâtiment OSM
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OsmAttributes {
    pub osm_id: Option<i64>,
    pub code: Option<i32>,
    pub fclass: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    /// Ligne de hauteur liée, absente si aucune n'existe
    pub height: Option<HeightRecord>,
}

/// Attributs spécifiques à la source
#[derive(Debug, Clone, PartialEq)]
pub enum Attributes {
    Ctr(CtrAttributes),
    Osm(OsmAttributes),
}

impl Attributes {
    pub fn source(&self) -> Source {
        match self {
            Attributes::Ctr(_) => Source::Ctr,
            Attributes::Osm(_) => Source::Osm,
        }
    }
}

/// Un bâtiment géoréférencé issu d'un store
///
/// L'égalité et le hash ne portent que sur `id`: deux instances de même
/// identifiant sont interchangeables dans un set ou une map.
#[derive(Debug, Clone)]
pub struct BuildingRecord {
    id: i64,
    geometry: Geometry,
    srid: u32,
    point: Point,
    attributes: Attributes,
    extensions: BTreeMap<String, serde_json::Value>,
}

impl BuildingRecord {
    /// Construit un bâtiment et calcule son point représentatif
    ///
    /// # Errors
    ///
    /// `InvalidGeometry` si la géométrie n'est pas surfacique ou est vide.
    pub fn new(
        id: i64,
        geometry: Geometry,
        srid: u32,
        attributes: Attributes,
    ) -> Result<Self, BuildingError> {
        if !matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_)) {
            return Err(BuildingError::invalid_geometry(
                id,
                "expected Polygon or MultiPolygon",
            ));
        }

        let point = geometry
            .interior_point()
            .ok_or_else(|| BuildingError::invalid_geometry(id, "empty geometry"))?;

        Ok(Self {
            id,
            geometry,
            srid,
            point,
            attributes,
            extensions: BTreeMap::new(),
        })
    }

    /// Attache une donnée d'extension sous `property`
    pub fn with_extension(mut self, property: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions.insert(property.into(), value);
        self
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn srid(&self) -> u32 {
        self.srid
    }

    pub fn source(&self) -> Source {
        self.attributes.source()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Code de classification CTR, `None` pour OSM
    pub fn classification(&self) -> Option<&str> {
        match &self.attributes {
            Attributes::Ctr(ctr) => Some(ctr.codice.as_str()),
            Attributes::Osm(_) => None,
        }
    }

    /// Point intérieur utilisé comme proxy de localisation
    pub fn representative_point(&self) -> Point {
        self.point
    }

    /// Coordonnées (x, y) du point représentatif
    pub fn location(&self) -> (f64, f64) {
        (self.point.x(), self.point.y())
    }

    pub fn extension(&self, property: &str) -> Option<&serde_json::Value> {
        self.extensions.get(property)
    }

    pub fn extensions(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.extensions
    }

    /// Hauteur du bâtiment
    ///
    /// Toujours indisponible pour la CTR. Pour OSM, `dsm_avg - dtm_avg` dès
    /// qu'une ligne de hauteur est liée, même négatif; une ligne absente ou
    /// un échantillon non fini donne `MissingHeight`.
    pub fn height(&self) -> Result<f64, DataUnavailable> {
        match &self.attributes {
            Attributes::Ctr(_) => Err(DataUnavailable::CtrWithoutHeight),
            Attributes::Osm(osm) => {
                let height = osm
                    .height
                    .as_ref()
                    .ok_or(DataUnavailable::MissingHeight)?
                    .average_height();
                if height.is_finite() {
                    Ok(height)
                } else {
                    Err(DataUnavailable::MissingHeight)
                }
            }
        }
    }

    /// Associe le point représentatif et la hauteur (ou son absence)
    pub fn heighted_point(&self) -> HeightedPoint {
        HeightedPoint {
            location: self.point,
            height: self.height(),
            building: self.clone(),
        }
    }
}

impl PartialEq for BuildingRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BuildingRecord {}

impl Hash for BuildingRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for BuildingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.location();
        match &self.attributes {
            Attributes::Ctr(ctr) => write!(
                f,
                "Building ID: {}\nLongitude: {}\nLatitude: {}\nCodice: {}",
                self.id, x, y, ctr.codice
            ),
            Attributes::Osm(osm) => {
                if let Some(name) = osm.name.as_deref().filter(|n| !n.is_empty()) {
                    writeln!(f, "Name: {}", name)?;
                }
                write!(f, "Building ID: {}\nLongitude: {}\nLatitude: {}", self.id, x, y)
            }
        }
    }
}

/// Un bâtiment enrichi de sa localisation et de sa hauteur
///
/// La hauteur reste un `Result` par bâtiment: c'est à l'appelant de
/// décider s'il ignore le bâtiment ou substitue une valeur par défaut.
#[derive(Debug, Clone)]
pub struct HeightedPoint {
    pub location: Point,
    pub height: Result<f64, DataUnavailable>,
    pub building: BuildingRecord,
}

impl HeightedPoint {
    pub fn has_height(&self) -> bool {
        self.height.is_ok()
    }

    /// Hauteur, ou `default` si indisponible
    pub fn height_or(&self, default: f64) -> f64 {
        self.height.unwrap_or(default)
    }
}

/// Région nommée (ex: comune) bornant les requêtes
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub name: String,
    pub geometry: Geometry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Contains, LineString, Polygon};
    use std::collections::HashSet;

    fn square(x: f64, y: f64, size: f64) -> Geometry {
        Geometry::Polygon(polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ])
    }

    fn osm(id: i64, height: Option<(f64, f64)>) -> BuildingRecord {
        let height = height.map(|(dsm, dtm)| HeightRecord {
            id,
            surface_min: dsm - 1.0,
            surface_avg: dsm,
            surface_max: dsm + 1.0,
            terrain_min: dtm - 1.0,
            terrain_avg: dtm,
            terrain_max: dtm + 1.0,
        });
        BuildingRecord::new(
            id,
            square(0.0, 0.0, 1.0),
            4326,
            Attributes::Osm(OsmAttributes {
                height,
                ..Default::default()
            }),
        )
        .unwrap()
    }

    fn ctr(id: i64, codice: &str) -> BuildingRecord {
        BuildingRecord::new(
            id,
            square(0.0, 0.0, 1.0),
            4326,
            Attributes::Ctr(CtrAttributes {
                codice: codice.into(),
                ..Default::default()
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_ctr_never_has_height() {
        assert_eq!(ctr(1, "0201").height(), Err(DataUnavailable::CtrWithoutHeight));
    }

    #[test]
    fn test_osm_height_is_dsm_minus_dtm() {
        let building = osm(7, Some((312.5, 300.0)));
        assert_eq!(building.height(), Ok(12.5));
    }

    #[test]
    fn test_osm_without_height_row() {
        assert_eq!(osm(7, None).height(), Err(DataUnavailable::MissingHeight));
    }

    #[test]
    fn test_osm_negative_difference_is_returned() {
        assert_eq!(osm(7, Some((98.0, 100.0))).height(), Ok(-2.0));
    }

    #[test]
    fn test_osm_non_finite_height_is_unavailable() {
        assert_eq!(
            osm(7, Some((f64::NAN, 300.0))).height(),
            Err(DataUnavailable::MissingHeight)
        );
    }

    #[test]
    fn test_equality_on_id_only() {
        let a = osm(42, Some((10.0, 0.0)));
        let b = osm(42, None);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(!set.insert(b));
        assert_ne!(osm(1, None), osm(2, None));
    }

    #[test]
    fn test_representative_point_inside() {
        let building = ctr(3, "0202");
        let point = building.representative_point();
        match building.geometry() {
            Geometry::Polygon(polygon) => assert!(polygon.contains(&point)),
            other => panic!("unexpected geometry: {other:?}"),
        }
        assert_eq!(building.location(), (point.x(), point.y()));
        assert_eq!(building.srid(), 4326);
    }

    #[test]
    fn test_rejects_non_polygon() {
        let result = BuildingRecord::new(
            1,
            Geometry::Point(Point::new(0.0, 0.0)),
            4326,
            Attributes::Osm(OsmAttributes::default()),
        );
        assert!(matches!(result, Err(BuildingError::InvalidGeometry { id: 1, .. })));
    }

    #[test]
    fn test_rejects_empty_polygon() {
        let empty = Geometry::Polygon(Polygon::new(LineString::new(vec![]), vec![]));
        let result = BuildingRecord::new(1, empty, 4326, Attributes::Osm(OsmAttributes::default()));
        assert!(result.is_err());
    }

    #[test]
    fn test_heighted_point_default() {
        let point = ctr(5, "0201").heighted_point();
        assert!(!point.has_height());
        assert_eq!(point.height_or(DEFAULT_ANTENNA_HEIGHT), 4.0);
        assert_eq!(point.building.id(), 5);
    }

    #[test]
    fn test_display() {
        let text = ctr(9, "0203").to_string();
        assert!(text.starts_with("Building ID: 9"));
        assert!(text.contains("Codice: 0203"));

        let mut named = osm(10, None);
        if let Attributes::Osm(attrs) = &mut named.attributes {
            attrs.name = Some("Duomo".into());
        }
        assert!(named.to_string().starts_with("Name: Duomo\n"));
    }

    #[test]
    fn test_source_from_str() {
        assert_eq!("CTR".parse::<Source>(), Ok(Source::Ctr));
        assert_eq!("osm".parse::<Source>(), Ok(Source::Osm));
        assert!("foo".parse::<Source>().is_err());
    }
}
