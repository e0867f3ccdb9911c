//! Configuration des tables PostGIS

use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use buildings::{DEFAULT_CTR_CODES, DEFAULT_EXTENSION_PROPERTY};

use crate::export::geojson::RESERVED_PROPERTIES;

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// SRID des géométries de requête
    #[serde(default = "default_srid")]
    pub srid: u32,

    pub ctr: CtrTable,

    pub osm: OsmTable,

    pub regions: RegionTable,

    /// Tables d'extension attachées aux deux sources
    #[serde(default)]
    pub extensions: Vec<ExtensionTable>,
}

/// Couche CTR
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CtrTable {
    pub table: String,

    /// Codes de classification considérés comme bâtiments
    #[serde(default = "default_codes")]
    pub codes: Vec<String>,
}

/// Couche OSM et sa table de hauteurs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OsmTable {
    pub table: String,
    pub height_table: String,
}

/// Table des régions (comuni)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionTable {
    pub table: String,

    #[serde(default = "default_name_column")]
    pub name_column: String,

    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,
}

/// Table d'extension jointe 1:1 sur `gid`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtensionTable {
    pub table: String,

    #[serde(default = "default_property")]
    pub property: String,
}

fn default_srid() -> u32 {
    4326
}

fn default_codes() -> Vec<String> {
    DEFAULT_CTR_CODES.iter().map(|c| c.to_string()).collect()
}

fn default_name_column() -> String {
    "nome".to_string()
}

fn default_geometry_column() -> String {
    "geom".to_string()
}

fn default_property() -> String {
    DEFAULT_EXTENSION_PROPERTY.to_string()
}

/// Identifiant SQL simple ou qualifié par un schéma
fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
            .expect("identifier regex is valid")
    })
}

/// Vérifie qu'un nom de table ou de colonne peut être interpolé dans le SQL
pub fn validate_identifier(name: &str) -> Result<()> {
    if identifier_pattern().is_match(name) {
        Ok(())
    } else {
        anyhow::bail!("Invalid SQL identifier: {:?}", name)
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "toscana" => Self::load_embedded(include_str!("presets/toscana.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: toscana", preset),
        }
    }

    /// Preset si le nom est connu, sinon chemin vers un fichier JSON
    pub fn resolve(spec: &str) -> Result<Self> {
        let path = Path::new(spec);
        if path.extension().is_some_and(|ext| ext == "json") || path.exists() {
            Self::load(path)
        } else {
            Self::from_preset(spec)
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse embedded config")?;
        config.validate()?;
        Ok(config)
    }

    /// Vérifie tous les identifiants SQL de la configuration
    pub fn validate(&self) -> Result<()> {
        let identifiers = [
            &self.ctr.table,
            &self.osm.table,
            &self.osm.height_table,
            &self.regions.table,
            &self.regions.name_column,
            &self.regions.geometry_column,
        ];
        for name in identifiers.into_iter().chain(self.extensions.iter().map(|e| &e.table)) {
            validate_identifier(name)?;
        }

        let mut properties = HashSet::new();
        for extension in &self.extensions {
            if RESERVED_PROPERTIES.contains(&extension.property.as_str()) {
                anyhow::bail!("Reserved extension property: {:?}", extension.property);
            }
            if !properties.insert(extension.property.as_str()) {
                anyhow::bail!("Duplicate extension property: {:?}", extension.property);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_toscana() {
        let config = Config::from_preset("toscana").unwrap();
        assert_eq!(config.srid, 4326);
        assert_eq!(config.ctr.table, "ctr_toscana");
        assert_eq!(config.ctr.codes.len(), 13);
        assert_eq!(config.osm.table, "osm_centro");
        assert_eq!(config.osm.height_table, "osm_building_height");
        assert!(config.extensions.is_empty());
    }

    #[test]
    fn test_unknown_preset() {
        assert!(Config::from_preset("lombardia").is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let json = r#"{
            "ctr": {"table": "ctr"},
            "osm": {"table": "osm", "height_table": "osm_h"},
            "regions": {"table": "public.comuni"},
            "extensions": [{"table": "eco"}]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.srid, 4326);
        assert_eq!(config.ctr.codes, default_codes());
        assert_eq!(config.regions.name_column, "nome");
        assert_eq!(config.extensions[0].property, "eco_data");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("osm_centro").is_ok());
        assert!(validate_identifier("public.osm_centro").is_ok());
        assert!(validate_identifier("osm; DROP TABLE x").is_err());
        assert!(validate_identifier("1table").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn test_reserved_extension_property_rejected() {
        let json = r#"{
            "ctr": {"table": "ctr"},
            "osm": {"table": "osm", "height_table": "osm_h"},
            "regions": {"table": "comuni"},
            "extensions": [{"table": "eco", "property": "height"}]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_extension_property_rejected() {
        let json = r#"{
            "ctr": {"table": "ctr"},
            "osm": {"table": "osm", "height_table": "osm_h"},
            "regions": {"table": "comuni"},
            "extensions": [{"table": "eco"}, {"table": "eco_2021"}]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_table_rejected() {
        let mut config = Config::from_preset("toscana").unwrap();
        config.osm.height_table = "h\"eight".to_string();
        assert!(config.validate().is_err());
    }
}
