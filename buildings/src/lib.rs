//! # buildings
//!
//! Lookup de bâtiments avec hauteur sur deux sources interchangeables:
//! la CTR (cartographie régionale, précise mais à couverture partielle) et
//! OSM (couverture large, hauteurs DSM/DTM optionnelles).
//!
//! ## Features
//!
//! - Interface de requête unique (`BuildingInterface`) pour CTR et OSM
//! - Filtre CTR par codes de classification configurables
//! - Sélection de la source la plus dense pour une région
//! - Hauteur par bâtiment sous forme de `Result`, jamais bloquante pour un lot
//! - Store en mémoire (`MemoryStore`) pour les tests et l'usage hors base
//!
//! ## Usage
//!
//! ```rust,ignore
//! use buildings::{select_best_source, BuildingInterface, CtrInterface, OsmInterface};
//!
//! let best = select_best_source(CtrInterface::new(ctr_store), OsmInterface::new(osm_store), "Firenze")?;
//! let area = best.province_area("Firenze")?;
//! for point in best.collect_heighted_points(&area, None)? {
//!     let height = point.height_or(buildings::DEFAULT_ANTENNA_HEIGHT);
//!     println!("{:?}: {} m", point.location, height);
//! }
//! ```

pub mod error;
pub mod interface;
pub mod memory;
pub mod store;
pub mod types;

pub use error::{BuildingError, DataUnavailable, StoreError};
pub use interface::{
    compare_coverage, select_best_source, select_within, BuildingInterface, Coverage,
    CtrInterface, OsmInterface, SelectedSource, DEFAULT_CTR_CODES,
};
pub use memory::MemoryStore;
pub use store::{BuildingFilter, Extension, SpatialStore, DEFAULT_EXTENSION_PROPERTY};
pub use types::{
    Attributes, BuildingRecord, CtrAttributes, HeightRecord, HeightedPoint, OsmAttributes,
    Region, Source, DEFAULT_ANTENNA_HEIGHT,
};
