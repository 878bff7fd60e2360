use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::knowledge::links::{LinkConfig, DEFAULT_MAX_LINKS, DEFAULT_THRESHOLD};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct TesseraConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub linking: LinkingConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// `"local"` (ONNX) or `"none"`.
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

/// Related-link selection defaults.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkingConfig {
    pub threshold: f64,
    pub max_links: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub min_score: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            host: "127.0.0.1".into(),
            port: 7437,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_tessera_dir()
            .join("knowledge.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_tessera_dir()
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

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_links: DEFAULT_MAX_LINKS,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            min_score: 0.0,
        }
    }
}

impl LinkingConfig {
    /// Validate into the value handed to the link builder.
    pub fn link_config(&self) -> Result<LinkConfig> {
        LinkConfig::new(self.threshold, self.max_links).context("invalid [linking] config")
    }
}

/// Returns `~/.tessera/`, or `./.tessera/` when no home directory is known.
pub fn default_tessera_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tessera")
}

/// Returns the default config file path: `~/.tessera/config.toml`
pub fn default_config_path() -> PathBuf {
    default_tessera_dir().join("config.toml")
}

impl TesseraConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
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
            TesseraConfig::default()
        };

        config.apply_env_overrides()?;
        config.linking.link_config()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (TESSERA_DB, TESSERA_LOG_LEVEL, TESSERA_LINK_THRESHOLD, TESSERA_MAX_LINKS).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("TESSERA_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("TESSERA_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("TESSERA_LINK_THRESHOLD") {
            self.linking.threshold = val
                .parse()
                .with_context(|| format!("TESSERA_LINK_THRESHOLD is not a number: {val}"))?;
        }
        if let Ok(val) = std::env::var("TESSERA_MAX_LINKS") {
            self.linking.max_links = val
                .parse()
                .with_context(|| format!("TESSERA_MAX_LINKS is not an integer: {val}"))?;
        }
        Ok(())
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
