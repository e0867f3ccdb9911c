//! Types d'erreurs pour le crate buildings

use thiserror::Error;

/// Erreur opaque remontée par un store spatial (driver, connexion, décodage)
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Hauteur indisponible pour un bâtiment donné
///
/// Toujours récupérable par l'appelant (skip ou hauteur par défaut).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DataUnavailable {
    /// La CTR ne porte jamais de donnée de hauteur
    #[error("CTR height data unavailable")]
    CtrWithoutHeight,

    /// Pas de ligne de hauteur exploitable liée au bâtiment OSM
    #[error("Missing OSM height data")]
    MissingHeight,
}

/// Erreurs des opérations de lookup
#[derive(Debug, Error)]
pub enum BuildingError {
    /// Aucune région ne correspond au nom (comparaison insensible à la casse)
    #[error("Region not found: {0}")]
    RegionNotFound(String),

    /// Géométrie inutilisable comme emprise de bâtiment
    #[error("Invalid geometry for building {id}: {reason}")]
    InvalidGeometry { id: i64, reason: String },

    /// Hauteur indisponible
    #[error(transparent)]
    DataUnavailable(#[from] DataUnavailable),

    /// Erreur du store, propagée telle quelle
    #[error(transparent)]
    Store(StoreError),
}

impl BuildingError {
    /// Encapsule une erreur du store sans la transformer
    pub fn store(err: impl Into<StoreError>) -> Self {
        Self::Store(err.into())
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(id: i64, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            id,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_message() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        let err = BuildingError::store(io);
        assert_eq!(err.to_string(), "connection reset");

        match err {
            BuildingError::Store(inner) => {
                assert!(inner.downcast_ref::<std::io::Error>().is_some());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_data_unavailable_converts() {
        let err: BuildingError = DataUnavailable::MissingHeight.into();
        assert!(matches!(
            err,
            BuildingError::DataUnavailable(DataUnavailable::MissingHeight)
        ));
        assert_eq!(err.to_string(), "Missing OSM height data");
    }
}
