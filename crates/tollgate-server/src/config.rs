use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:8080"
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps; tokens do not survive a restart.
    Memory,
    /// Postgres via TOLLGATE storage tables.
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,

    /// Postgres URL; required when backend = "postgres". Env
    /// `TOLLGATE_DATABASE_URL` takes precedence.
    #[serde(default)]
    pub database_url: String,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Memory
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            database_url: String::new(),
        }
    }
}

impl StorageConfig {
    pub fn effective_database_url(&self) -> String {
        env::var("TOLLGATE_DATABASE_URL").unwrap_or_else(|_| self.database_url.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Validity window applied at creation time, in days.
    #[serde(default = "default_validity_days")]
    pub validity_days: i64,
}

fn default_validity_days() -> i64 {
    tollgate_core::DEFAULT_VALIDITY_DAYS
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            validity_days: default_validity_days(),
        }
    }
}

/// Load the config file, falling back to defaults when none exists.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let path = config_path();
    if !path.exists() {
        tracing::info!(path = %path.display(), "no config file found, using defaults");
        return Ok(AppConfig::default());
    }
    let raw = fs::read_to_string(&path)?;
    let cfg: AppConfig = toml::from_str(&raw)?;
    Ok(cfg)
}

fn config_path() -> PathBuf {
    if let Ok(p) = env::var("TOLLGATE_SERVER_CONFIG") {
        return PathBuf::from(p);
    }
    PathBuf::from("config.toml")
}
