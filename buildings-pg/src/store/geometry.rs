//! Encodage WKB des géométries de requête et décodage des résultats

use geo::Geometry;
use geozero::wkb::Wkb;
use geozero::ToGeo;
use thiserror::Error;
use wkb::geom_to_wkb;

/// Erreurs de conversion géométrique
#[derive(Debug, Error)]
pub enum CodecError {
    /// Géométrie non encodable en WKB
    #[error("Failed to convert geometry to WKB: {0}")]
    Encode(String),

    /// WKB renvoyé par PostGIS illisible
    #[error("Failed to decode WKB geometry: {0}")]
    Decode(#[from] geozero::error::GeozeroError),
}

/// Convertit une géométrie geo en WKB (sans SRID, fourni à `ST_GeomFromWKB`)
pub fn encode_wkb(geometry: &Geometry) -> Result<Vec<u8>, CodecError> {
    geom_to_wkb(geometry).map_err(|e| CodecError::Encode(format!("{:?}", e)))
}

/// Décode un WKB (`ST_AsBinary`) en géométrie geo
pub fn decode_wkb(bytes: Vec<u8>) -> Result<Geometry, CodecError> {
    Ok(Wkb(bytes).to_geo()?)
}

/// Lit une géométrie WKT (paramètres de la CLI)
pub fn parse_wkt(wkt: &str) -> Result<Geometry, CodecError> {
    Ok(geozero::wkt::Wkt(wkt).to_geo()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_wkb_roundtrip_polygon() {
        let geometry = Geometry::Polygon(polygon![
            (x: 11.25, y: 43.76),
            (x: 11.26, y: 43.76),
            (x: 11.26, y: 43.77),
            (x: 11.25, y: 43.76),
        ]);
        let bytes = encode_wkb(&geometry).unwrap();
        assert_eq!(decode_wkb(bytes).unwrap(), geometry);
    }

    #[test]
    fn test_parse_wkt() {
        let geometry = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        assert!(matches!(geometry, Geometry::Polygon(_)));
        assert!(parse_wkt("POLYGON((0 0,").is_err());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode_wkb(vec![0x01, 0x02]).is_err());
    }
}
