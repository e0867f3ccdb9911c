//! Rapport de couverture des hauteurs
//!
//! Collecte, pour un lot de points, les bâtiments avec hauteur, ceux dont la
//! hauteur a été substituée et ceux ignorés.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use buildings::{Coverage, DataUnavailable, HeightedPoint, Source};

/// Traitement appliqué à un bâtiment sans hauteur
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MissingAction {
    /// Hauteur par défaut substituée
    Defaulted,
    /// Bâtiment exclu de l'export
    Skipped,
}

/// Bâtiment sans hauteur
#[derive(Debug, Clone, Serialize)]
pub struct MissingHeight {
    pub id: i64,
    pub reason: String,
    pub action: MissingAction,
}

/// Comptages CTR / OSM ayant servi à la sélection
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CoverageStats {
    pub ctr: u64,
    pub osm: u64,
}

impl From<Coverage> for CoverageStats {
    fn from(coverage: Coverage) -> Self {
        Self {
            ctr: coverage.ctr,
            osm: coverage.osm,
        }
    }
}

/// Rapport complet
#[derive(Debug, Clone, Serialize)]
pub struct HeightReport {
    pub source: String,
    pub region: Option<String>,
    pub coverage: Option<CoverageStats>,
    pub duration_secs: f64,
    pub total: usize,
    pub with_height: usize,
    pub defaulted: usize,
    pub skipped: usize,
    pub missing: Vec<MissingHeight>,
}

impl HeightReport {
    pub fn new(source: Source) -> Self {
        Self {
            source: source.to_string(),
            region: None,
            coverage: None,
            duration_secs: 0.0,
            total: 0,
            with_height: 0,
            defaulted: 0,
            skipped: 0,
            missing: Vec::new(),
        }
    }

    /// Enregistre un point avec hauteur
    pub fn record_height(&mut self) {
        self.total += 1;
        self.with_height += 1;
    }

    /// Enregistre un point sans hauteur
    pub fn record_missing(&mut self, id: i64, reason: DataUnavailable, action: MissingAction) {
        self.total += 1;
        match action {
            MissingAction::Defaulted => self.defaulted += 1,
            MissingAction::Skipped => self.skipped += 1,
        }
        self.missing.push(MissingHeight {
            id,
            reason: reason.to_string(),
            action,
        });
    }

    /// Enregistre un point selon sa hauteur et la politique choisie
    pub fn record_point(&mut self, point: &HeightedPoint, skip_missing: bool) {
        match point.height {
            Ok(_) => self.record_height(),
            Err(reason) => {
                let action = if skip_missing {
                    MissingAction::Skipped
                } else {
                    MissingAction::Defaulted
                };
                self.record_missing(point.building.id(), reason, action);
            }
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Nombre de points exportés
    pub fn exported(&self) -> usize {
        self.total - self.skipped
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        match &self.region {
            Some(region) => println!("HEIGHT REPORT - {} ({})", region, self.source),
            None => println!("HEIGHT REPORT - {}", self.source),
        }
        println!("{}", "=".repeat(60));

        if let Some(coverage) = &self.coverage {
            println!("\nCoverage: CTR {} / OSM {}", coverage.ctr, coverage.osm);
        }
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Buildings: {} total, {} with height, {} defaulted, {} skipped",
            self.total, self.with_height, self.defaulted, self.skipped
        );
        println!("Exported: {}", self.exported());

        if !self.missing.is_empty() {
            println!("\n--- MISSING HEIGHT ({}) ---", self.missing.len());
            for m in self.missing.iter().take(10) {
                println!("  [{}] {:?}: {}", m.id, m.action, m.reason);
            }
            if self.missing.len() > 10 {
                println!("  ... and {} more", self.missing.len() - 10);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} buildings, {} with height, {} defaulted, {} skipped, {} exported",
            self.source,
            self.total,
            self.with_height,
            self.defaulted,
            self.skipped,
            self.exported()
        )
    }
}
