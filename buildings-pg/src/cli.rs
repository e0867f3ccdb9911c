//! Définition et implémentation des commandes CLI
//!
//! - `select`: compare CTR et OSM sur une région
//! - `points`: points avec hauteur vers GeoJSON
//! - `show`: affiche un bâtiment par identifiant

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use geo::Geometry;
use tracing::{debug, info};

use buildings::{select_within, BuildingInterface, SelectedSource, Source, DEFAULT_ANTENNA_HEIGHT};
use buildings_pg::export::geojson::{export_to_geojson, write_collection};
use buildings_pg::report::HeightReport;
use buildings_pg::store::geometry::parse_wkt;
use buildings_pg::{open_ctr, open_interfaces, open_osm, Config, DatabaseConfig};

#[derive(Subcommand)]
pub enum Commands {
    /// Compare CTR and OSM coverage of a region and print the preferred source
    Select {
        /// Region name (case-insensitive)
        #[arg(short, long)]
        region: String,

        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Export building points with their heights to GeoJSON
    Points {
        /// Region name (case-insensitive)
        #[arg(short, long, conflicts_with = "shape", required_unless_present = "shape")]
        region: Option<String>,

        /// Query shape as WKT, in the configured SRID
        #[arg(long)]
        shape: Option<String>,

        /// Optional area (WKT) further restricting the query
        #[arg(long)]
        area: Option<String>,

        /// Building source: auto, ctr or osm
        #[arg(long, default_value = "auto")]
        source: SourceChoice,

        /// Height (meters) substituted when a building has none
        #[arg(long, default_value_t = DEFAULT_ANTENNA_HEIGHT)]
        default_height: f64,

        /// Drop buildings without height instead of defaulting
        #[arg(long)]
        skip_missing: bool,

        /// Output GeoJSON file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the height report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        db: DatabaseArgs,
    },

    /// Print a single building with its height
    Show {
        /// Building source: ctr or osm
        #[arg(long)]
        source: Source,

        /// Building identifier (gid)
        #[arg(long)]
        id: i64,

        #[command(flatten)]
        db: DatabaseArgs,
    },
}

/// Options de connexion et de configuration communes
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Config preset name (toscana) or path to a JSON config
    #[arg(long, default_value = "toscana")]
    pub config: String,

    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env PGDATABASE / terrain)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

impl DatabaseArgs {
    /// Configuration de connexion: environnement puis options CLI
    fn database_config(&self) -> DatabaseConfig {
        let mut config = DatabaseConfig::from_env();
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(database) = &self.database {
            config.dbname = database.clone();
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = Some(password.clone());
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(ssl) = &self.ssl {
            if let Ok(mode) = ssl.parse() {
                config.ssl_mode = mode;
            }
        }
        info!(
            user = %config.user,
            host = %config.host,
            port = config.port,
            dbname = %config.dbname,
            ssl = ?config.ssl_mode,
            "Database"
        );
        config
    }

    fn load(&self) -> Result<(DatabaseConfig, Config)> {
        let config = Config::resolve(&self.config)?;
        Ok((self.database_config(), config))
    }
}

/// Choix de la source pour `points`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceChoice {
    /// Source la plus dense sur l'emprise
    Auto,
    Fixed(Source),
}

impl FromStr for SourceChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(SourceChoice::Auto);
        }
        s.parse()
            .map(SourceChoice::Fixed)
            .map_err(|_| format!("Invalid source: {}. Use: auto, ctr, osm", s))
    }
}

/// Exécute la commande select
pub fn cmd_select(region: &str, db: &DatabaseArgs) -> Result<()> {
    let (database, config) = db.load()?;
    let (ctr, osm) = open_interfaces(&database, &config)?;

    let boundary = ctr.province_area(region)?;
    let (best, coverage) = select_within(ctr, osm, &boundary)?;
    println!("Region: {}", region);
    println!("CTR buildings: {}", coverage.ctr);
    println!("OSM buildings: {}", coverage.osm);
    println!("Selected source: {}", best.source());
    Ok(())
}

/// Options de la commande points
pub struct PointsOptions<'a> {
    pub region: Option<&'a str>,
    pub shape: Option<&'a str>,
    pub area: Option<&'a str>,
    pub source: SourceChoice,
    pub default_height: f64,
    pub skip_missing: bool,
    pub output: Option<&'a Path>,
    pub report: Option<&'a Path>,
}

/// Exécute la commande points
pub fn cmd_points(options: PointsOptions<'_>, db: &DatabaseArgs) -> Result<()> {
    let start = Instant::now();
    let (database, config) = db.load()?;

    let area = options
        .area
        .map(|wkt| parse_wkt(wkt).context("Invalid --area geometry"))
        .transpose()?;

    let (interface, shape, coverage) = match options.source {
        SourceChoice::Auto => {
            let (ctr, osm) = open_interfaces(&database, &config)?;
            let shape = query_shape(&ctr, options.region, options.shape)?;
            let (interface, coverage) = select_within(ctr, osm, &shape)?;
            (interface, shape, Some(coverage))
        }
        SourceChoice::Fixed(Source::Ctr) => {
            let ctr = open_ctr(&database, &config)?;
            let shape = query_shape(&ctr, options.region, options.shape)?;
            (SelectedSource::Ctr(ctr), shape, None)
        }
        SourceChoice::Fixed(Source::Osm) => {
            let osm = open_osm(&database, &config)?;
            let shape = query_shape(&osm, options.region, options.shape)?;
            (SelectedSource::Osm(osm), shape, None)
        }
    };

    info!(source = %interface.source(), "Collecting heighted points");
    let points = interface.collect_heighted_points(&shape, area.as_ref())?;

    let mut report = HeightReport::new(interface.source());
    report.region = options.region.map(str::to_string);
    report.coverage = coverage.map(Into::into);
    for point in &points {
        report.record_point(point, options.skip_missing);
    }

    let exported: Vec<_> = points
        .iter()
        .filter(|p| !options.skip_missing || p.has_height())
        .collect();
    debug!(exported = exported.len(), "Points to export");

    match options.output {
        Some(path) => {
            export_to_geojson(exported, config.srid, options.default_height, path)?;
            info!(output = %path.display(), "GeoJSON written");
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            write_collection(&mut writer, exported, config.srid, options.default_height)?;
            writeln!(writer)?;
            writer.flush()?;
        }
    }

    report.set_duration(start.elapsed());
    if let Some(path) = options.report {
        report.save_to_file(path)?;
        info!(report = %path.display(), "Report saved");
    }
    // Sur stdout, le rapport ne doit pas se mêler au GeoJSON
    if options.output.is_some() {
        report.display();
    } else {
        info!("{}", report.summary());
    }

    Ok(())
}

/// Emprise de requête: WKT explicite ou région nommée
fn query_shape(
    interface: &dyn BuildingInterface,
    region: Option<&str>,
    shape: Option<&str>,
) -> Result<Geometry> {
    match (region, shape) {
        (_, Some(wkt)) => parse_wkt(wkt).context("Invalid --shape geometry"),
        (Some(region), None) => Ok(interface.province_area(region)?),
        (None, None) => bail!("Either --region or --shape is required"),
    }
}

/// Exécute la commande show
pub fn cmd_show(source: Source, id: i64, db: &DatabaseArgs) -> Result<()> {
    let (database, config) = db.load()?;
    let interface = match source {
        Source::Ctr => SelectedSource::Ctr(open_ctr(&database, &config)?),
        Source::Osm => SelectedSource::Osm(open_osm(&database, &config)?),
    };

    let Some(building) = interface.fetch_by_id(id)? else {
        bail!("Building {} not found in {}", id, source);
    };

    let (x, y) = building.location();
    println!("{}", building);
    println!("Point: ({}, {}) EPSG:{}", x, y, building.srid());
    match building.height() {
        Ok(height) => println!("Height: {:.2} m", height),
        Err(reason) => println!("Height: unavailable ({})", reason),
    }
    for (property, value) in building.extensions() {
        println!("{}: {}", property, value);
    }
    Ok(())
}
