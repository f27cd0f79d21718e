use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub search: SearchConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

/// Connection settings for the search engine holding the product index.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    /// `"elasticsearch"` or `"memory"`.
    pub backend: String,
    pub url: String,
    pub username: String,
    pub password: String,
    /// Takes precedence over basic auth when set.
    pub api_key: Option<String>,
    pub index: String,
    pub verify_certs: bool,
    pub ca_cert_path: Option<String>,
    pub timeout_secs: u64,
    pub max_retries: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_app_dir()
            .join("catalog.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: "elasticsearch".into(),
            url: "http://localhost:9200".into(),
            username: "elastic".into(),
            password: "changeme".into(),
            api_key: None,
            index: "product-recommendations".into(),
            verify_certs: false,
            ca_cert_path: None,
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_app_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { default_top_k: 5 }
    }
}

/// Returns `~/.prodvec/`, or `./.prodvec/` when no home directory is known.
pub fn default_app_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prodvec")
}

/// Returns the default config file path: `~/.prodvec/config.toml`
pub fn default_config_path() -> PathBuf {
    default_app_dir().join("config.toml")
}

impl AppConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            AppConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Split out so tests need not touch the process env.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(val) = lookup("PRODVEC_HOST") {
            self.server.host = val;
        }
        if let Some(val) = lookup("PRODVEC_PORT") {
            self.server.port = val
                .parse()
                .with_context(|| format!("invalid PRODVEC_PORT: {val}"))?;
        }
        if let Some(val) = lookup("PRODVEC_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Some(val) = lookup("PRODVEC_DB") {
            self.storage.db_path = val;
        }
        if let Some(val) = lookup("PRODVEC_SEARCH_BACKEND") {
            self.search.backend = val;
        }
        if let Some(val) = lookup("ELASTICSEARCH_URL") {
            self.search.url = val;
        }
        if let Some(val) = lookup("ELASTICSEARCH_USERNAME") {
            self.search.username = val;
        }
        if let Some(val) = lookup("ELASTICSEARCH_PASSWORD") {
            self.search.password = val;
        }
        if let Some(val) = lookup("ELASTICSEARCH_API_KEY") {
            self.search.api_key = Some(val);
        }
        if let Some(val) = lookup("ELASTICSEARCH_INDEX") {
            self.search.index = val;
        }
        if let Some(val) = lookup("ELASTICSEARCH_VERIFY_CERTS") {
            self.search.verify_certs = parse_bool(&val)
                .with_context(|| format!("invalid ELASTICSEARCH_VERIFY_CERTS: {val}"))?;
        }
        if let Some(val) = lookup("ELASTICSEARCH_CERT_PATH") {
            self.search.ca_cert_path = Some(val);
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
