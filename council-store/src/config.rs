use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{json::JsonStore, migrations, pool, postgres::PgStore, ConversationStore};

/// Storage backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Json,
    Postgres,
}

/// Storage configuration, loaded from `~/.council/config.toml` with
/// environment overrides. Missing file means defaults: JSON documents
/// under `~/.council/conversations`.
///
/// ```toml
/// [storage]
/// backend = "postgres"
/// database_url = "postgres://localhost/council"
/// max_connections = 5
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            data_dir: default_data_dir(),
            database_url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    storage: Option<StoreConfig>,
}

fn council_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".council")
}

fn default_data_dir() -> PathBuf {
    council_home().join("conversations")
}

fn default_database_url() -> String {
    "postgres://localhost/council".to_owned()
}

fn default_max_connections() -> u32 {
    pool::DEFAULT_MAX_CONNECTIONS
}

impl StoreConfig {
    /// Config file path: `~/.council/config.toml`.
    pub fn config_path() -> PathBuf {
        council_home().join("config.toml")
    }

    /// Load configuration: file if present, then environment
    /// overrides (`COUNCIL_BACKEND`, `COUNCIL_DATA_DIR`,
    /// `DATABASE_URL`), then defaults.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path:?}"))?;
            Self::parse(&content)
                .with_context(|| format!("failed to parse config file {path:?}"))?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(file.storage.unwrap_or_default())
    }

    fn apply_env(&mut self) {
        if let Ok(backend) = env::var("COUNCIL_BACKEND") {
            match backend.to_ascii_lowercase().as_str() {
                "json" => self.backend = Backend::Json,
                "postgres" => self.backend = Backend::Postgres,
                other => {
                    tracing::warn!("ignoring unknown COUNCIL_BACKEND value '{other}'");
                }
            }
        }
        if let Ok(data_dir) = env::var("COUNCIL_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database_url = url;
        }
    }

    /// Build the configured backend. For Postgres this connects the
    /// pool and runs migrations; the returned handle owns the pool
    /// for the life of the process.
    pub async fn open_store(&self) -> Result<Box<dyn ConversationStore>> {
        match self.backend {
            Backend::Json => {
                tracing::debug!(data_dir = %self.data_dir.display(), "opening JSON store");
                Ok(Box::new(JsonStore::new(&self.data_dir)))
            }
            Backend::Postgres => {
                let pool = pool::create_pool(&self.database_url, self.max_connections)
                    .await
                    .context("failed to connect to postgres")?;
                migrations::run(&pool).await?;
                Ok(Box::new(PgStore::new(pool)))
            }
        }
    }
}
