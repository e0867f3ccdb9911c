//! Store spatial PostGIS
//!
//! Une instance = une session. Les prédicats (ST_Intersects, filtre de codes,
//! tri par gid) sont exécutés côté base.

use anyhow::Result;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;
use tracing::debug;

use buildings::{
    Attributes, BuildingError, BuildingFilter, BuildingRecord, CtrAttributes, Extension,
    HeightRecord, OsmAttributes, Region, Source, SpatialStore,
};

use super::connection::{DatabaseConfig, Session};
use super::geometry::{decode_wkb, encode_wkb};
use crate::config::{validate_identifier, Config};

type Param = Box<dyn ToSql + Sync + Send>;

/// Colonnes communes: gid, géométrie WKB, SRID
const BASE_COLUMNS: &str = "b.gid::bigint, ST_AsBinary(b.geom), ST_SRID(b.geom)";

const CTR_COLUMNS: &str = "b.foglio::text, b.codice::text, b.record::integer, b.topon::text, \
     b.area::double precision, b.identif::text";

const OSM_COLUMNS: &str = "b.osm_id::bigint, b.code::integer, b.fclass::text, b.name::text, \
     b.\"type\"::text, h.dsm_min::double precision, h.dsm_avg::double precision, \
     h.dsm_max::double precision, h.dtm_min::double precision, h.dtm_avg::double precision, \
     h.dtm_max::double precision";

/// Seules les géométries surfaciques non vides sont des bâtiments
const POLYGONAL: &str =
    "ST_GeometryType(b.geom) IN ('ST_Polygon', 'ST_MultiPolygon') AND NOT ST_IsEmpty(b.geom)";

/// Nombre de colonnes spécifiques avant les extensions
const CTR_COLUMN_COUNT: usize = 6;
const OSM_COLUMN_COUNT: usize = 11;

/// Store PostGIS pour les couches CTR et OSM
#[derive(Debug)]
pub struct PostgisStore {
    session: Session,
    config: Config,
}

impl PostgisStore {
    /// Ouvre une session dédiée à ce store
    pub fn connect(database: &DatabaseConfig, config: Config) -> Result<Self> {
        config.validate()?;
        let session = Session::connect(database)?;
        Ok(Self { session, config })
    }

    fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, BuildingError> {
        debug!(sql = %sql, params = params.len(), "PostGIS query");
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        self.session
            .block_on(self.session.client().query(sql, &refs))
            .map_err(BuildingError::store)
    }

    fn table(&self, source: Source) -> &str {
        match source {
            Source::Ctr => &self.config.ctr.table,
            Source::Osm => &self.config.osm.table,
        }
    }

    /// Requête SELECT complète (sans WHERE) pour une source
    fn select_sql(&self, source: Source, extensions: &[Extension]) -> Result<String, BuildingError> {
        let table = self.table(source);
        let (columns, join) = match source {
            Source::Ctr => (CTR_COLUMNS, String::new()),
            Source::Osm => (
                OSM_COLUMNS,
                format!(" LEFT JOIN {} h ON h.gid = b.gid", self.config.osm.height_table),
            ),
        };
        let extension_columns = extension_columns(extensions)?;
        Ok(format!(
            "SELECT {}, {}{} FROM {} b{}",
            BASE_COLUMNS, columns, extension_columns, table, join
        ))
    }

    fn decode(
        &self,
        source: Source,
        row: &Row,
        extensions: &[Extension],
    ) -> Result<BuildingRecord, BuildingError> {
        let id: i64 = row.try_get(0).map_err(BuildingError::store)?;
        let wkb: Vec<u8> = row.try_get(1).map_err(BuildingError::store)?;
        let srid: i32 = row.try_get(2).map_err(BuildingError::store)?;
        let geometry = decode_wkb(wkb).map_err(BuildingError::store)?;

        let (attributes, first_extension) = match source {
            Source::Ctr => (Attributes::Ctr(decode_ctr(row)?), 3 + CTR_COLUMN_COUNT),
            Source::Osm => (Attributes::Osm(decode_osm(row, id)?), 3 + OSM_COLUMN_COUNT),
        };

        let mut building = BuildingRecord::new(id, geometry, srid.max(0) as u32, attributes)?;
        for (offset, extension) in extensions.iter().enumerate() {
            let raw: Option<String> = row
                .try_get(first_extension + offset)
                .map_err(BuildingError::store)?;
            if let Some(raw) = raw {
                let value: serde_json::Value =
                    serde_json::from_str(&raw).map_err(BuildingError::store)?;
                building = building.with_extension(extension.property.clone(), value);
            }
        }
        Ok(building)
    }
}

/// Sous-requêtes corrélées, une par extension, renvoyant la ligne en JSON
fn extension_columns(extensions: &[Extension]) -> Result<String, BuildingError> {
    let mut sql = String::new();
    for (i, extension) in extensions.iter().enumerate() {
        validate_identifier(&extension.table)
            .map_err(|e| BuildingError::store(e.to_string()))?;
        sql.push_str(&format!(
            ", (SELECT row_to_json(e{i})::text FROM {table} e{i} WHERE e{i}.gid = b.gid LIMIT 1)",
            i = i,
            table = extension.table
        ));
    }
    Ok(sql)
}

/// Clause WHERE et paramètres d'un filtre
///
/// Les formes sont combinées en ET; le SRID n'est lié qu'en présence de formes.
/// Comptage et lecture partagent cette clause.
fn where_clause(filter: &BuildingFilter<'_>, srid: u32) -> Result<(String, Vec<Param>), BuildingError> {
    let mut params: Vec<Param> = Vec::new();
    let mut conditions = vec![POLYGONAL.to_string()];

    if !filter.shapes.is_empty() {
        params.push(Box::new(srid as i32));
    }
    for shape in &filter.shapes {
        let wkb = encode_wkb(shape).map_err(BuildingError::store)?;
        params.push(Box::new(wkb));
        conditions.push(format!(
            "ST_Intersects(b.geom, ST_GeomFromWKB(${}::bytea, $1::integer))",
            params.len()
        ));
    }
    if let Some(codes) = filter.codes {
        params.push(Box::new(codes.to_vec()));
        conditions.push(format!("b.codice::text = ANY(${}::text[])", params.len()));
    }

    Ok((conditions.join(" AND "), params))
}

fn decode_ctr(row: &Row) -> Result<CtrAttributes, BuildingError> {
    Ok(CtrAttributes {
        foglio: row.try_get(3).map_err(BuildingError::store)?,
        codice: row
            .try_get::<_, Option<String>>(4)
            .map_err(BuildingError::store)?
            .unwrap_or_default(),
        record: row.try_get(5).map_err(BuildingError::store)?,
        topon: row.try_get(6).map_err(BuildingError::store)?,
        area: row.try_get(7).map_err(BuildingError::store)?,
        identif: row.try_get(8).map_err(BuildingError::store)?,
    })
}

fn decode_osm(row: &Row, id: i64) -> Result<OsmAttributes, BuildingError> {
    Ok(OsmAttributes {
        osm_id: row.try_get(3).map_err(BuildingError::store)?,
        code: row.try_get(4).map_err(BuildingError::store)?,
        fclass: row.try_get(5).map_err(BuildingError::store)?,
        name: row.try_get(6).map_err(BuildingError::store)?,
        kind: row.try_get(7).map_err(BuildingError::store)?,
        height: decode_height(row, id, 8),
    })
}

/// Ligne de hauteur jointe; absente, incomplète ou illisible donne `None`
fn decode_height(row: &Row, id: i64, first: usize) -> Option<HeightRecord> {
    let sample = |i: usize| row.try_get::<_, Option<f64>>(first + i).ok().flatten();
    Some(HeightRecord {
        id,
        surface_min: sample(0)?,
        surface_avg: sample(1)?,
        surface_max: sample(2)?,
        terrain_min: sample(3)?,
        terrain_avg: sample(4)?,
        terrain_max: sample(5)?,
    })
}

impl SpatialStore for PostgisStore {
    fn count_buildings(
        &self,
        source: Source,
        filter: &BuildingFilter<'_>,
    ) -> Result<u64, BuildingError> {
        let (condition, params) = where_clause(filter, self.config.srid)?;
        let sql = format!(
            "SELECT count(*) FROM {} b WHERE {}",
            self.table(source),
            condition
        );
        let rows = self.query(&sql, &params)?;
        let count: i64 = match rows.first() {
            Some(row) => row.try_get(0).map_err(BuildingError::store)?,
            None => 0,
        };
        Ok(count.max(0) as u64)
    }

    fn fetch_buildings(
        &self,
        source: Source,
        filter: &BuildingFilter<'_>,
        extensions: &[Extension],
    ) -> Result<Vec<BuildingRecord>, BuildingError> {
        let (condition, params) = where_clause(filter, self.config.srid)?;
        let sql = format!(
            "{} WHERE {} ORDER BY b.gid",
            self.select_sql(source, extensions)?,
            condition
        );
        self.query(&sql, &params)?
            .iter()
            .map(|row| self.decode(source, row, extensions))
            .collect()
    }

    fn fetch_building(
        &self,
        source: Source,
        id: i64,
        extensions: &[Extension],
    ) -> Result<Option<BuildingRecord>, BuildingError> {
        let sql = format!(
            "{} WHERE b.gid = $1::bigint AND {} LIMIT 1",
            self.select_sql(source, extensions)?,
            POLYGONAL
        );
        let params: Vec<Param> = vec![Box::new(id)];
        self.query(&sql, &params)?
            .first()
            .map(|row| self.decode(source, row, extensions))
            .transpose()
    }

    fn find_region(&self, name: &str) -> Result<Option<Region>, BuildingError> {
        let regions = &self.config.regions;
        let sql = format!(
            "SELECT {name}::text, ST_AsBinary({geom}) FROM {table} WHERE upper({name}) = $1::text LIMIT 1",
            name = regions.name_column,
            geom = regions.geometry_column,
            table = regions.table
        );
        let params: Vec<Param> = vec![Box::new(name.to_string())];
        let rows = self.query(&sql, &params)?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };

        let region_name: Option<String> = row.try_get(0).map_err(BuildingError::store)?;
        let wkb: Vec<u8> = row.try_get(1).map_err(BuildingError::store)?;
        Ok(Some(Region {
            name: region_name.unwrap_or_else(|| name.to_string()),
            geometry: decode_wkb(wkb).map_err(BuildingError::store)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};

    fn square() -> Geometry {
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ])
    }

    #[test]
    fn test_where_clause_single_shape() {
        let shape = square();
        let (sql, params) = where_clause(&BuildingFilter::intersecting(&shape), 4326).unwrap();
        assert_eq!(
            sql,
            format!(
                "{} AND ST_Intersects(b.geom, ST_GeomFromWKB($2::bytea, $1::integer))",
                POLYGONAL
            )
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_where_clause_area_and_codes() {
        let shape = square();
        let area = square();
        let codes = vec!["0201".to_string()];
        let filter = BuildingFilter::intersecting(&shape)
            .and_intersecting(&area)
            .with_codes(&codes);
        let (sql, params) = where_clause(&filter, 4326).unwrap();
        assert_eq!(
            sql,
            format!(
                "{} AND \
                 ST_Intersects(b.geom, ST_GeomFromWKB($2::bytea, $1::integer)) AND \
                 ST_Intersects(b.geom, ST_GeomFromWKB($3::bytea, $1::integer)) AND \
                 b.codice::text = ANY($4::text[])",
                POLYGONAL
            )
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_where_clause_without_filter_keeps_polygonal_guard() {
        let (sql, params) = where_clause(&BuildingFilter::default(), 4326).unwrap();
        assert_eq!(sql, POLYGONAL);
        assert!(params.is_empty());
    }

    #[test]
    fn test_extension_columns() {
        let extensions = vec![Extension {
            table: "istat_economia".into(),
            property: "eco_data".into(),
        }];
        let sql = extension_columns(&extensions).unwrap();
        assert_eq!(
            sql,
            ", (SELECT row_to_json(e0)::text FROM istat_economia e0 WHERE e0.gid = b.gid LIMIT 1)"
        );
    }

    #[test]
    fn test_extension_columns_rejects_injection() {
        let extensions = vec![Extension {
            table: "eco; DROP TABLE osm_centro".into(),
            property: "eco_data".into(),
        }];
        assert!(matches!(
            extension_columns(&extensions),
            Err(BuildingError::Store(_))
        ));
    }
}
