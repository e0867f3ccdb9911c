//! Point d'entrée CLI pour buildings-pg

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod cli;

use cli::{Commands, PointsOptions};

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Lookup de bâtiments CTR / OSM avec hauteur
#[derive(Parser)]
#[command(name = "buildings-pg")]
#[command(author, version)]
#[command(about = "Lookup de bâtiments CTR / OSM et de leur hauteur dans PostGIS")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> Result<()> {
    load_env();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Select { region, db } => {
            info!(region = %region, "Selecting building source");
            cli::cmd_select(&region, &db)?;
        }
        Commands::Points {
            region,
            shape,
            area,
            source,
            default_height,
            skip_missing,
            output,
            report,
            db,
        } => {
            let options = PointsOptions {
                region: region.as_deref(),
                shape: shape.as_deref(),
                area: area.as_deref(),
                source,
                default_height,
                skip_missing,
                output: output.as_deref(),
                report: report.as_deref(),
            };
            cli::cmd_points(options, &db)?;
        }
        Commands::Show { source, id, db } => {
            cli::cmd_show(source, id, &db)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stderr: stdout peut porter le GeoJSON
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
