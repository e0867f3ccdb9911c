//! Connexion PostgreSQL pilotée par un runtime tokio mono-thread

use anyhow::{Context, Result};
use tokio::runtime::{Builder, Runtime};
use tokio_postgres::config::SslMode as PgSslMode;
use tokio_postgres::{Client, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{debug, warn};

/// Mode SSL pour la connexion PostgreSQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// Pas de SSL (défaut)
    #[default]
    Disable,
    /// SSL préféré mais non requis
    Prefer,
    /// SSL requis
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" | "yes" => Ok(SslMode::Require),
            _ => Err(format!("Invalid SSL mode: {}. Use: disable, prefer, require", s)),
        }
    }
}

/// Configuration de la base de données
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub ssl_mode: SslMode,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "terrain".into(),
            user: "postgres".into(),
            password: None,
            ssl_mode: SslMode::Disable,
        }
    }
}

impl DatabaseConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("PGHOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("PGPORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            dbname: std::env::var("PGDATABASE").unwrap_or_else(|_| "terrain".into()),
            user: std::env::var("PGUSER").unwrap_or_else(|_| "postgres".into()),
            password: std::env::var("PGPASSWORD").ok(),
            ssl_mode: std::env::var("PGSSLMODE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let mut cfg = tokio_postgres::Config::new();
        cfg.host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .application_name("buildings-pg");
        if let Some(password) = &self.password {
            cfg.password(password);
        }
        cfg.ssl_mode(match self.ssl_mode {
            SslMode::Disable => PgSslMode::Disable,
            SslMode::Prefer => PgSslMode::Prefer,
            SslMode::Require => PgSslMode::Require,
        });
        cfg
    }
}

/// Crée la configuration TLS pour rustls
fn make_tls_connector() -> MakeRustlsConnect {
    let root_store = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    MakeRustlsConnect::new(config)
}

/// Session PostgreSQL unique et son runtime
///
/// Chaque requête bloque via `block_on`; la session est fermée au drop.
pub struct Session {
    runtime: Runtime,
    client: Client,
}

impl Session {
    /// Ouvre une session
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to build tokio runtime")?;

        let pg_config = config.pg_config();
        let client = match config.ssl_mode {
            SslMode::Disable => {
                let (client, connection) = runtime
                    .block_on(pg_config.connect(NoTls))
                    .context("Failed to connect to PostgreSQL")?;
                runtime.spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection closed with error: {e}");
                    }
                });
                client
            }
            SslMode::Prefer | SslMode::Require => {
                let (client, connection) = runtime
                    .block_on(pg_config.connect(make_tls_connector()))
                    .context("Failed to connect to PostgreSQL with TLS")?;
                runtime.spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("PostgreSQL connection closed with error: {e}");
                    }
                });
                client
            }
        };

        debug!(host = %config.host, dbname = %config.dbname, "PostgreSQL session opened");

        Ok(Self { runtime, client })
    }

    /// Exécute une future sur le runtime de la session
    pub fn block_on<F: std::future::Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Teste la connexion à la base
    pub fn test_connection(&self) -> Result<()> {
        self.block_on(self.client.execute("SELECT 1", &[]))
            .context("Connection test failed")?;
        Ok(())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("closed", &self.client.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_parse() {
        assert_eq!("disable".parse::<SslMode>(), Ok(SslMode::Disable));
        assert_eq!("ON".parse::<SslMode>(), Ok(SslMode::Require));
        assert_eq!("prefer".parse::<SslMode>(), Ok(SslMode::Prefer));
        assert!("maybe".parse::<SslMode>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.port, 5432);
        assert_eq!(config.ssl_mode, SslMode::Disable);
        assert!(config.password.is_none());
    }
}
