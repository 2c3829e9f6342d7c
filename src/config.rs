use serde::Deserialize;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("invalid database URL format")]
    InvalidDatabaseUrl,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::MissingRequired("DATABASE_URL"));
        }
        if !self.url.starts_with("postgres://") && !self.url.starts_with("postgresql://") {
            return Err(ConfigError::InvalidDatabaseUrl);
        }
        Ok(())
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_run_migrations() -> bool {
    true
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3050))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,

    #[serde(default)]
    pub storage_backend: StorageBackend,

    #[serde(skip)]
    pub database: DatabaseConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    // `vars` replaces the process environment when given.
    pub fn load_from(vars: Option<config::Map<String, String>>) -> Result<Self, ConfigError> {
        let mut app: AppConfig = config::Config::builder()
            .add_source(config::Environment::default().source(vars.clone()))
            .build()?
            .try_deserialize()?;

        app.database = config::Config::builder()
            .add_source(config::Environment::with_prefix("DATABASE").source(vars))
            .build()?
            .try_deserialize()?;

        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.storage_backend {
            StorageBackend::Memory => Ok(()),
            StorageBackend::Postgres => self.database.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::load_from(Some(vars))
    }

    #[test]
    fn defaults_to_memory_on_port_3050() {
        let config = load(&[]).unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.bind_addr.port(), 3050);
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn memory_ignores_a_missing_database_url() {
        let config = load(&[("STORAGE_BACKEND", "memory"), ("BIND_ADDR", "127.0.0.1:8080")]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.database.url.is_empty());
    }

    #[test]
    fn postgres_requires_a_database_url() {
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "postgres")]),
            Err(ConfigError::MissingRequired("DATABASE_URL"))
        ));
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "postgres"), ("DATABASE_URL", "mysql://x")]),
            Err(ConfigError::InvalidDatabaseUrl)
        ));
    }

    #[test]
    fn postgres_settings_are_read() {
        let config = load(&[
            ("STORAGE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/cycles"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("DATABASE_RUN_MIGRATIONS", "false"),
        ])
        .unwrap();
        assert_eq!(config.storage_backend, StorageBackend::Postgres);
        assert_eq!(
            config.database,
            DatabaseConfig {
                url: "postgres://localhost/cycles".into(),
                max_connections: 12,
                run_migrations: false,
            }
        );
    }

    #[test]
    fn rejects_unknown_backend_and_bad_values() {
        assert!(matches!(
            load(&[("STORAGE_BACKEND", "sqlite")]),
            Err(ConfigError::Load(_))
        ));
        assert!(matches!(load(&[("BIND_ADDR", "nowhere")]), Err(ConfigError::Load(_))));
        assert!(matches!(
            load(&[("DATABASE_MAX_CONNECTIONS", "lots")]),
            Err(ConfigError::Load(_))
        ));
    }
}
