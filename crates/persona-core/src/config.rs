//! Gateway configuration
//!
//! Layered with figment: built-in defaults, then an optional TOML file, then
//! `PERSONA_*` environment variables. The binary merges its CLI flags on top.

use crate::middleware::BodyLimitConfig;
use crate::server::ServerConfig;
use crate::store::DatabaseOptions;
use crate::{Error, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "PERSONA_";

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "persona.toml";

/// How long in-flight connections may take to finish at shutdown
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of the fallback 404
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotFoundFormat {
    /// `Página no encontrada` as plain text
    #[default]
    Text,
    /// The `{"error": ...}` envelope used by every other failure
    Json,
}

/// Which store backend the binary opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Mysql,
    /// In-process rows, lost on exit
    Memory,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKind::Mysql => f.write_str("mysql"),
            StoreKind::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database host
    pub host: String,
    pub db_port: u16,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Listening port
    pub port: u16,
    /// Listening address
    pub bind: String,
    /// Runtime worker threads; `0` means one per CPU
    pub workers: usize,
    /// Maximum JSON body, e.g. `100kb`
    pub body_limit: String,
    pub not_found_format: NotFoundFormat,
    pub store: StoreKind,

    pub log_level: String,
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            db_port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: "db_curso_app".to_string(),
            port: 3000,
            bind: "0.0.0.0".to_string(),
            workers: 1,
            body_limit: "100kb".to_string(),
            not_found_format: NotFoundFormat::Text,
            store: StoreKind::Mysql,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Defaults, TOML file (if it exists), then environment
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract and check a config from any figment
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(path))
    }

    fn validate(&self) -> Result<()> {
        self.body_limit_bytes()?;
        self.listen_addr()?;
        if self.host.is_empty() {
            return Err(Error::InvalidConfig {
                key: "host",
                message: "database host must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn body_limit_bytes(&self) -> Result<usize> {
        BodyLimitConfig::parse(&self.body_limit)
            .map(|limit| limit.max_size)
            .ok_or_else(|| Error::InvalidConfig {
                key: "body_limit",
                message: format!("cannot parse size `{}`", self.body_limit),
            })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind.parse().map_err(|_| Error::InvalidConfig {
            key: "bind",
            message: format!("`{}` is not an IP address", self.bind),
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Worker thread count with `0` resolved against the CPU count
    pub fn worker_threads(&self, cpus: usize) -> usize {
        if self.workers == 0 {
            cpus.max(1)
        } else {
            self.workers
        }
    }

    pub fn database_options(&self) -> DatabaseOptions {
        DatabaseOptions {
            host: self.host.clone(),
            port: self.db_port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }

    pub fn server_config(&self) -> Result<ServerConfig> {
        Ok(ServerConfig {
            addr: self.listen_addr()?,
            drain_timeout: DRAIN_TIMEOUT,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(toml: &str) -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(toml));
        Config::from_figment(&figment)
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.body_limit_bytes().unwrap(), 100 * 1024);
        assert_eq!(config.listen_addr().unwrap().to_string(), "0.0.0.0:3000");
        assert_eq!(config.not_found_format, NotFoundFormat::Text);
        assert_eq!(config.store, StoreKind::Mysql);
    }

    #[test]
    fn test_toml_overrides() {
        let config = from_toml(
            r#"
            host = "db.internal"
            password = "s3cret"
            port = 8080
            not_found_format = "json"
            store = "memory"
            body_limit = "1mb"
            "#,
        )
        .unwrap();
        assert_eq!(config.host, "db.internal");
        assert_eq!(config.port, 8080);
        assert_eq!(config.user, "root");
        assert_eq!(config.not_found_format, NotFoundFormat::Json);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.body_limit_bytes().unwrap(), 1024 * 1024);

        let db = config.database_options();
        assert_eq!(db.host, "db.internal");
        assert_eq!(db.port, 3306);
        assert_eq!(db.password, "s3cret");
        assert_eq!(db.database, "db_curso_app");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            from_toml(r#"body_limit = "lots""#),
            Err(Error::InvalidConfig { key: "body_limit", .. })
        ));
        assert!(matches!(
            from_toml(r#"bind = "localhost""#),
            Err(Error::InvalidConfig { key: "bind", .. })
        ));
        assert!(matches!(
            from_toml(r#"store = "postgres""#),
            Err(Error::Figment(_))
        ));
    }

    #[test]
    fn test_environment_layer() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("persona.toml", "port = 4000\nuser = \"app\"")?;
            jail.set_env("PERSONA_PORT", "5000");
            jail.set_env("PERSONA_JSON_LOGS", "true");

            let config = Config::load("persona.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.port, 5000);
            assert_eq!(config.user, "app");
            assert!(config.json_logs);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_is_fine() {
        figment::Jail::expect_with(|_| {
            let config = Config::load("does-not-exist.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.database, "db_curso_app");
            Ok(())
        });
    }

    #[test]
    fn test_worker_threads() {
        let mut config = Config::default();
        assert_eq!(config.worker_threads(8), 1);
        config.workers = 0;
        assert_eq!(config.worker_threads(8), 8);
        config.workers = 3;
        assert_eq!(config.worker_threads(8), 3);
    }
}
