//! # configs
//!
//! Layered application settings:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/{THOUGHTBOARD_ENV}.toml` (optional)
//! 4. `THOUGHTBOARD__SECTION__KEY` environment variables
//!
//! A `.env` file in the working directory is loaded first, so its variables
//! take part in step 4.

use std::fmt;
use std::path::Path;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

pub const ENV_PREFIX: &str = "THOUGHTBOARD";
pub const ENV_NAME_VAR: &str = "THOUGHTBOARD_ENV";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub database: DatabaseSettings,
    pub feed: FeedSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::Sqlite => f.write_str("sqlite"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeedSettings {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub filter: String,
    pub format: LogFormat,
}

impl Settings {
    /// Loads `.env`, then every layer from `./config`.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::Invalid(format!(".env: {e}"))),
        }
        let env_name = std::env::var(ENV_NAME_VAR)
            .unwrap_or_else(|_| "development".to_owned());
        Self::from_builder(Self::layered(Path::new("config"), &env_name)?)
    }

    /// Defaults, optional files under `dir`, then the environment.
    pub fn layered(dir: &Path, env_name: &str) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let env_file = dir.join(format!("{env_name}.toml"));
        Ok(Self::defaults()?
            .add_source(File::from(dir.join("default.toml")).required(false))
            .add_source(File::from(env_file).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__")))
    }

    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("storage.backend", "memory")?
            .set_default("database.max_connections", 5)?
            .set_default("feed.default_page_size", 20)?
            .set_default("feed.max_page_size", 100)?
            .set_default("log.filter", "info")?
            .set_default("log.format", "json")?)
    }

    /// Builds, deserializes and validates.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be non-zero".into()));
        }
        if self.feed.default_page_size == 0 {
            return Err(ConfigError::Invalid(
                "feed.default_page_size must be at least 1".into(),
            ));
        }
        if self.feed.default_page_size > self.feed.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "feed.default_page_size ({}) exceeds feed.max_page_size ({})",
                self.feed.default_page_size, self.feed.max_page_size
            )));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.storage.backend == StorageBackend::Sqlite && self.database_url().is_none() {
            return Err(ConfigError::Invalid(
                "storage.backend = sqlite requires database.url".into(),
            ));
        }
        Ok(())
    }

    /// The database URL, if one is set and non-empty.
    pub fn database_url(&self) -> Option<&str> {
        self.database
            .url
            .as_ref()
            .map(|url| url.expose_secret())
            .filter(|url| !url.trim().is_empty())
    }
}
