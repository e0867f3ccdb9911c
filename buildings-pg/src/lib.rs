//! # buildings-pg
//!
//! Store PostGIS pour les couches de bâtiments CTR et OSM.
//!
//! ## Features
//!
//! - Une session PostgreSQL par interface, requêtes bloquantes
//! - Tables et codes CTR configurables (JSON ou preset embarqué)
//! - Tables d'extension jointes 1:1 sur `gid`
//! - Export GeoJSON des points avec hauteur
//! - CLI simple
//!
//! ## Usage CLI
//!
//! ```bash
//! # Source la plus dense pour un comune
//! buildings-pg select --region Firenze
//!
//! # Points avec hauteur vers GeoJSON
//! buildings-pg points --region Firenze --output ./firenze.geojson
//! ```

pub mod config;
pub mod export;
pub mod report;
pub mod store;

pub use config::Config;
pub use report::HeightReport;
pub use store::{DatabaseConfig, PostgisStore, SslMode};

use anyhow::Result;
use buildings::{CtrInterface, OsmInterface};

/// Ouvre les deux interfaces, chacune avec sa propre session
pub fn open_interfaces(
    database: &DatabaseConfig,
    config: &Config,
) -> Result<(CtrInterface<PostgisStore>, OsmInterface<PostgisStore>)> {
    Ok((open_ctr(database, config)?, open_osm(database, config)?))
}

/// Ouvre l'interface CTR avec les codes et extensions configurés
pub fn open_ctr(database: &DatabaseConfig, config: &Config) -> Result<CtrInterface<PostgisStore>> {
    let store = PostgisStore::connect(database, config.clone())?;
    let mut ctr = CtrInterface::with_codes(store, config.ctr.codes.iter().cloned());
    for extension in &config.extensions {
        ctr.add_extension(extension.table.clone(), extension.property.clone());
    }
    Ok(ctr)
}

/// Ouvre l'interface OSM avec les extensions configurées
pub fn open_osm(database: &DatabaseConfig, config: &Config) -> Result<OsmInterface<PostgisStore>> {
    let store = PostgisStore::connect(database, config.clone())?;
    let mut osm = OsmInterface::new(store);
    for extension in &config.extensions {
        osm.add_extension(extension.table.clone(), extension.property.clone());
    }
    Ok(osm)
}
