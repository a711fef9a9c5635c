//! Configuration file parsing.
//!
//! Reads `pgshift.toml`. Every field has a default, so the file is
//! optional; CLI flags override whatever the file provides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub migrations: MigrationsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Full connection URL. When set, the individual fields are ignored.
    pub url: Option<String>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub dbname: Option<String>,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: default_host(),
            port: default_port(),
            dbname: None,
            username: default_username(),
            password: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// Connection string for the driver: the URL verbatim when given,
    /// otherwise keyword/value pairs from the individual fields.
    pub fn conn_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }

        let mut parts = vec![
            format!("host={}", self.host),
            format!("port={}", self.port),
            format!("user={}", self.username),
        ];
        if let Some(dbname) = &self.dbname {
            parts.push(format!("dbname={}", dbname));
        }
        if !self.password.is_empty() {
            parts.push(format!("password={}", self.password));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MigrationsConfig {
    /// Directory holding `<id>.up.sql` / `<id>.down.sql` pairs.
    #[serde(default = "default_migrations_dir")]
    pub dir: PathBuf,

    /// Path to the desired-schema SQL file.
    #[serde(default = "default_schema_path")]
    pub schema: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_migrations_dir(),
            schema: default_schema_path(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_username() -> String {
    "postgres".to_string()
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("schema.sql")
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Validate after CLI overrides are merged in: a command that talks to
    /// the database needs either a URL or a database name.
    pub fn validate_connection(&self) -> Result<(), ConfigError> {
        if self.database.url.is_none() && self.database.dbname.is_none() {
            return Err(ConfigError::Validation(
                "no database configured: set database.url or database.dbname \
                 (or pass --url / --dbname)"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database.host, "127.0.0.1");
        assert_eq!(config.database.port, 5432);
        assert_eq!(config.database.username, "postgres");
        assert_eq!(config.migrations.dir, PathBuf::from("migrations"));
        assert_eq!(config.migrations.schema, PathBuf::from("schema.sql"));
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [database]
            dbname = "app"
            password = "secret"

            [migrations]
            dir = "db/migrations"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.dbname.as_deref(), Some("app"));
        assert_eq!(config.database.host, "127.0.0.1");
        assert_eq!(config.migrations.dir, PathBuf::from("db/migrations"));
        assert_eq!(config.migrations.schema, PathBuf::from("schema.sql"));
    }

    #[test]
    fn test_conn_string_from_fields() {
        let config: Config = toml::from_str(
            r#"
            [database]
            dbname = "app"
            password = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database.conn_string(),
            "host=127.0.0.1 port=5432 user=postgres dbname=app password=secret"
        );
    }

    #[test]
    fn test_conn_string_omits_empty_password() {
        let mut config = Config::default();
        config.database.dbname = Some("app".into());
        assert!(!config.database.conn_string().contains("password"));
    }

    #[test]
    fn test_url_wins_over_fields() {
        let mut config = Config::default();
        config.database.url = Some("postgres://u:p@db:5432/app".into());
        config.database.dbname = Some("ignored".into());
        assert_eq!(config.database.conn_string(), "postgres://u:p@db:5432/app");
    }

    #[test]
    fn test_validation_requires_a_database() {
        let config = Config::default();
        let err = config.validate_connection().unwrap_err();
        assert!(err.to_string().contains("no database configured"));

        let mut config = Config::default();
        config.database.url = Some("postgres://localhost/app".into());
        assert!(config.validate_connection().is_ok());
    }
}
