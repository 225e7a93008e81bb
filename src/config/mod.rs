mod parser;

use crate::constants::*;
use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub use parser::{load_config, parse_config};

/// Main configuration of the orchestrator process
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Path of the SQLite database file
    pub database_path: String,
    /// Path of the persisted vector index file
    pub index_path: String,
    /// Cost added to a step and its task when the step completes
    pub step_cost: f64,
    /// Embedding backend used by long-term memory
    pub embedder: EmbedderConfig,
    /// Admission limits applied by the HTTP layer
    pub rate_limit: RateLimitConfig,
    pub api: ApiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            index_path: DEFAULT_INDEX_PATH.to_string(),
            step_cost: DEFAULT_STEP_COST,
            embedder: EmbedderConfig::default(),
            rate_limit: RateLimitConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderProvider {
    /// Deterministic local token hashing, no network access
    #[default]
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint
    Openai,
}

impl std::str::FromStr for EmbedderProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hashing" => Ok(EmbedderProvider::Hashing),
            "openai" => Ok(EmbedderProvider::Openai),
            other => Err(Error::Config(format!("unknown embedder provider '{}'", other))),
        }
    }
}

/// Configuration of the embedding backend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EmbedderConfig {
    pub provider: EmbedderProvider,
    /// Model name sent to remote providers
    pub model: String,
    /// Vector length; must match any existing index file
    pub dimension: usize,
    /// Base URL of a remote provider, e.g. `https://api.openai.com/v1/`
    pub api_base: Option<String>,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            provider: EmbedderProvider::default(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_EMBEDDING_DIM,
            api_base: None,
        }
    }
}

/// Fixed-window admission limits
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Task creations allowed per user and window
    pub per_user: u32,
    /// Requests allowed per window on shared keys such as memory search
    pub per_task: u32,
    /// Window length as a humantime string, e.g. `60s` or `1m`
    pub window: String,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_user: DEFAULT_RATE_LIMIT_PER_USER,
            per_task: DEFAULT_RATE_LIMIT_PER_TASK,
            window: DEFAULT_RATE_LIMIT_WINDOW.to_string(),
        }
    }
}

impl RateLimitConfig {
    pub fn window_duration(&self) -> Result<Duration, Error> {
        humantime::parse_duration(&self.window)
            .map_err(|e| Error::Config(format!("invalid rate limit window '{}': {}", self.window, e)))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_API_PORT,
        }
    }
}

impl AppConfig {
    /// Applies overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), Error> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up through `lookup`
    ///
    /// Recognized keys: `DATABASE_PATH`, `VECTOR_INDEX_PATH`, `STEP_COST`,
    /// `EMBEDDER_PROVIDER`, `EMBEDDING_MODEL`, `EMBEDDING_DIM`, `EMBEDDER_API_BASE`,
    /// `RATE_LIMIT_PER_USER`, `RATE_LIMIT_PER_TASK`, `RATE_LIMIT_WINDOW`, `API_PORT`.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DATABASE_PATH") {
            self.database_path = v;
        }
        if let Some(v) = lookup("VECTOR_INDEX_PATH") {
            self.index_path = v;
        }
        if let Some(v) = lookup("STEP_COST") {
            self.step_cost = parse_env("STEP_COST", &v)?;
        }
        if let Some(v) = lookup("EMBEDDER_PROVIDER") {
            self.embedder.provider = v.parse()?;
        }
        if let Some(v) = lookup("EMBEDDING_MODEL") {
            self.embedder.model = v;
        }
        if let Some(v) = lookup("EMBEDDING_DIM") {
            self.embedder.dimension = parse_env("EMBEDDING_DIM", &v)?;
        }
        if let Some(v) = lookup("EMBEDDER_API_BASE") {
            self.embedder.api_base = Some(v);
        }
        if let Some(v) = lookup("RATE_LIMIT_PER_USER") {
            self.rate_limit.per_user = parse_env("RATE_LIMIT_PER_USER", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_PER_TASK") {
            self.rate_limit.per_task = parse_env("RATE_LIMIT_PER_TASK", &v)?;
        }
        if let Some(v) = lookup("RATE_LIMIT_WINDOW") {
            self.rate_limit.window = v;
        }
        if let Some(v) = lookup("API_PORT") {
            self.api.port = parse_env("API_PORT", &v)?;
        }
        Ok(())
    }

    /// Checks values serde cannot check on its own
    pub fn validate(&self) -> Result<(), Error> {
        if !self.step_cost.is_finite() || self.step_cost < 0.0 {
            return Err(Error::Config(format!(
                "step_cost must be a non-negative number, got {}",
                self.step_cost
            )));
        }
        if self.embedder.dimension == 0 {
            return Err(Error::Config("embedder.dimension must be positive".to_string()));
        }
        if let Some(base) = &self.embedder.api_base {
            Url::parse(base)
                .map_err(|e| Error::Config(format!("invalid embedder.api_base '{}': {}", base, e)))?;
        }
        self.rate_limit.window_duration()?;
        Ok(())
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| Error::Config(format!("invalid value '{}' for {}: {}", raw, key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.step_cost, 0.01);
        assert_eq!(config.embedder.dimension, 384);
        assert_eq!(
            config.rate_limit.window_duration().unwrap(),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn env_overrides_replace_values() {
        let env: HashMap<&str, &str> = [
            ("DATABASE_PATH", "/tmp/x.db"),
            ("EMBEDDING_DIM", "16"),
            ("EMBEDDER_PROVIDER", "OpenAI"),
            ("RATE_LIMIT_PER_USER", "5"),
            ("RATE_LIMIT_WINDOW", "2m"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env_overrides_from(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.database_path, "/tmp/x.db");
        assert_eq!(config.embedder.dimension, 16);
        assert_eq!(config.embedder.provider, EmbedderProvider::Openai);
        assert_eq!(config.rate_limit.per_user, 5);
        assert_eq!(
            config.rate_limit.window_duration().unwrap(),
            Duration::from_secs(120)
        );
        assert_eq!(config.index_path, DEFAULT_INDEX_PATH);
    }

    #[test]
    fn malformed_env_value_is_an_error() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides_from(|k| {
            (k == "EMBEDDING_DIM").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.step_cost = -1.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.rate_limit.window = "soon".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.embedder.api_base = Some("::nope".to_string());
        assert!(config.validate().is_err());
    }
}
