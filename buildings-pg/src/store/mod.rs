//! Store PostGIS: session, codec géométrique et requêtes

pub mod connection;
pub mod geometry;
pub mod postgis;

pub use connection::{DatabaseConfig, Session, SslMode};
pub use postgis::PostgisStore;
