//! Tests d'intégration PostgreSQL
//!
//! Ces tests nécessitent une base PostgreSQL avec PostGIS.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! docker run -d --name postgres-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgis/postgis
//! PGPASSWORD=test PGDATABASE=postgres cargo test --test postgres_integration -- --ignored
//! ```
//!
//! Chaque test utilise son propre schéma.

use anyhow::Result;
use geo::{polygon, Geometry};

use buildings::{
    compare_coverage, select_best_source, BuildingError, BuildingInterface, CtrInterface,
    DataUnavailable, OsmInterface, Source,
};
use buildings_pg::store::Session;
use buildings_pg::{open_interfaces, Config, DatabaseConfig, PostgisStore};

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry {
    Geometry::Polygon(polygon![
        (x: x0, y: y0),
        (x: x1, y: y0),
        (x: x1, y: y1),
        (x: x0, y: y1),
        (x: x0, y: y0),
    ])
}

fn test_config(schema: &str) -> Config {
    serde_json::from_value(serde_json::json!({
        "srid": 4326,
        "ctr": { "table": format!("{schema}.ctr_toscana") },
        "osm": {
            "table": format!("{schema}.osm_centro"),
            "height_table": format!("{schema}.osm_building_height")
        },
        "regions": { "table": format!("{schema}.comuni") },
        "extensions": [{ "table": format!("{schema}.economia") }]
    }))
    .expect("valid test config")
}

/// Recrée le schéma de test et ses données
///
/// Comune FIRENZE: x 11.0..11.3, y 43.7..43.9.
/// CTR: 3 bâtiments dont un code hors liste (0301) et un hors comune.
/// OSM: 3 bâtiments, hauteur complète pour 10, incomplète pour 11, absente pour 12;
/// plus une ligne (13) et un polygone vide (14) qui ne sont pas des bâtiments.
fn setup_schema(schema: &str) -> Result<()> {
    let session = Session::connect(&DatabaseConfig::from_env())?;
    let sql = format!(
        r#"
        CREATE EXTENSION IF NOT EXISTS postgis;
        DROP SCHEMA IF EXISTS {s} CASCADE;
        CREATE SCHEMA {s};

        CREATE TABLE {s}.comuni (gid SERIAL PRIMARY KEY, nome TEXT, geom geometry(Polygon, 4326));
        INSERT INTO {s}.comuni (nome, geom) VALUES
            ('Firenze', ST_MakeEnvelope(11.0, 43.7, 11.3, 43.9, 4326)),
            ('Prato', ST_MakeEnvelope(11.0, 43.9, 11.3, 44.0, 4326));

        CREATE TABLE {s}.ctr_toscana (
            gid BIGINT PRIMARY KEY, foglio TEXT, codice TEXT, record INTEGER,
            topon TEXT, area DOUBLE PRECISION, identif TEXT,
            geom geometry(MultiPolygon, 4326)
        );
        INSERT INTO {s}.ctr_toscana VALUES
            (1, '275', '0201', 1, 'Duomo', 120.5, 'A1',
             ST_Multi(ST_MakeEnvelope(11.10, 43.77, 11.11, 43.78, 4326))),
            (2, '275', '0301', 2, NULL, 30.0, 'A2',
             ST_Multi(ST_MakeEnvelope(11.12, 43.77, 11.13, 43.78, 4326))),
            (3, '276', '0202', 3, NULL, 80.0, 'A3',
             ST_Multi(ST_MakeEnvelope(11.50, 43.77, 11.51, 43.78, 4326)));

        CREATE TABLE {s}.osm_centro (
            gid BIGINT PRIMARY KEY, osm_id BIGINT, code INTEGER, fclass TEXT,
            name TEXT, "type" TEXT, geom geometry(Geometry, 4326)
        );
        INSERT INTO {s}.osm_centro VALUES
            (10, 1001, 1500, 'building', 'Palazzo Vecchio', 'yes',
             ST_Multi(ST_MakeEnvelope(11.10, 43.76, 11.11, 43.77, 4326))),
            (11, 1002, 1500, 'building', NULL, 'house',
             ST_Multi(ST_MakeEnvelope(11.20, 43.80, 11.21, 43.81, 4326))),
            (12, 1003, 1500, 'building', NULL, NULL,
             ST_Multi(ST_MakeEnvelope(11.25, 43.85, 11.26, 43.86, 4326))),
            (13, 1004, 1500, 'building', NULL, NULL,
             ST_GeomFromText('LINESTRING(11.05 43.75, 11.06 43.76)', 4326)),
            (14, 1005, 1500, 'building', NULL, NULL,
             ST_GeomFromText('POLYGON EMPTY', 4326));

        CREATE TABLE {s}.osm_building_height (
            gid BIGINT PRIMARY KEY,
            dsm_min DOUBLE PRECISION, dsm_avg DOUBLE PRECISION, dsm_max DOUBLE PRECISION,
            dtm_min DOUBLE PRECISION, dtm_avg DOUBLE PRECISION, dtm_max DOUBLE PRECISION
        );
        INSERT INTO {s}.osm_building_height VALUES
            (10, 100.0, 150.0, 200.0, 40.0, 50.0, 60.0),
            (11, 90.0, NULL, 95.0, 40.0, 45.0, 50.0);

        CREATE TABLE {s}.economia (gid BIGINT PRIMARY KEY, reddito INTEGER);
        INSERT INTO {s}.economia VALUES (1, 32000), (10, 41000);
        "#,
        s = schema
    );
    session.block_on(session.client().batch_execute(&sql))?;
    Ok(())
}

fn interfaces(schema: &str) -> (CtrInterface<PostgisStore>, OsmInterface<PostgisStore>) {
    setup_schema(schema).expect("Failed to setup schema");
    open_interfaces(&DatabaseConfig::from_env(), &test_config(schema))
        .expect("Failed to open interfaces")
}

/// Test de connexion basique
#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_database_connection() {
    let session = Session::connect(&DatabaseConfig::from_env()).expect("Failed to connect");
    session.test_connection().expect("Connection test failed");
}

#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_ctr_codes_filter_and_count() {
    let (ctr, _) = interfaces("bt_ctr_codes");
    let firenze = ctr.province_area("firenze").unwrap();

    let buildings = ctr.fetch_intersecting(&firenze, None).unwrap();
    let ids: Vec<i64> = buildings.iter().map(|b| b.id()).collect();
    assert_eq!(ids, vec![1]);
    assert_eq!(ctr.count_intersecting(&firenze).unwrap(), 1);
    assert_eq!(buildings[0].classification(), Some("0201"));
}

#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_osm_fetch_sorted_with_area() {
    let (_, osm) = interfaces("bt_osm_area");
    let firenze = osm.province_area("FIRENZE").unwrap();

    let all = osm.fetch_intersecting(&firenze, None).unwrap();
    let ids: Vec<i64> = all.iter().map(|b| b.id()).collect();
    assert_eq!(ids, vec![10, 11, 12]);
    assert_eq!(osm.count_intersecting(&firenze).unwrap(), 3);

    let east = rect(11.15, 43.7, 11.3, 43.9);
    let narrowed = osm.fetch_intersecting(&firenze, Some(&east)).unwrap();
    let ids: Vec<i64> = narrowed.iter().map(|b| b.id()).collect();
    assert_eq!(ids, vec![11, 12]);
}

#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_non_polygonal_rows_are_not_buildings() {
    let (_, osm) = interfaces("bt_non_polygonal");
    let everything = rect(10.0, 43.0, 12.0, 45.0);

    let count = osm.count_intersecting(&everything).unwrap();
    let fetched = osm.fetch_intersecting(&everything, None).unwrap();
    assert_eq!(count, 3);
    assert_eq!(fetched.len() as u64, count);
    assert!(osm.fetch_by_id(13).unwrap().is_none());
    assert!(osm.fetch_by_id(14).unwrap().is_none());
}

#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_osm_heights() {
    let (_, osm) = interfaces("bt_osm_heights");
    let firenze = osm.province_area("Firenze").unwrap();

    let points = osm.collect_heighted_points(&firenze, None).unwrap();
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].height, Ok(100.0));
    assert_eq!(points[1].height, Err(DataUnavailable::MissingHeight));
    assert_eq!(points[2].height, Err(DataUnavailable::MissingHeight));
}

#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_fetch_by_id_with_extension() {
    let (ctr, osm) = interfaces("bt_by_id");

    let building = ctr.fetch_by_id(1).unwrap().expect("building 1");
    assert_eq!(building.source(), Source::Ctr);
    assert_eq!(building.extension("eco_data").unwrap()["reddito"], 32000);
    assert_eq!(building.height(), Err(DataUnavailable::CtrWithoutHeight));

    let building = osm.fetch_by_id(10).unwrap().expect("building 10");
    assert_eq!(building.extension("eco_data").unwrap()["reddito"], 41000);
    assert!(osm.fetch_by_id(11).unwrap().unwrap().extension("eco_data").is_none());

    assert!(osm.fetch_by_id(999).unwrap().is_none());
}

#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_unknown_region() {
    let (ctr, _) = interfaces("bt_unknown_region");
    match ctr.province_area("Atlantide") {
        Err(BuildingError::RegionNotFound(name)) => assert_eq!(name, "Atlantide"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_select_best_source() {
    let (ctr, osm) = interfaces("bt_select");
    let firenze = ctr.province_area("Firenze").unwrap();

    let coverage = compare_coverage(&ctr, &osm, &firenze).unwrap();
    assert_eq!((coverage.ctr, coverage.osm), (1, 3));

    let best = select_best_source(ctr, osm, "firenze").unwrap();
    assert_eq!(best.source(), Source::Osm);
}

#[test]
#[ignore = "Requires PostgreSQL database"]
fn test_empty_region_tie_goes_to_osm() {
    let (ctr, osm) = interfaces("bt_tie");
    let best = select_best_source(ctr, osm, "Prato").unwrap();
    assert_eq!(best.source(), Source::Osm);
}
