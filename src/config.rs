//! YAML configuration for the `logdup` binary and [`crate::build_engine`].
//!
//! ```yaml
//! version: "1.0"
//!
//! # Alternatively `fingerprint.normalize`; not both.
//! normalizer:
//!   mask: true
//!   lowercase: true
//!   collapse_whitespace: true
//!   min_length: 0
//!
//! fingerprint:
//!   shingle_size: 5
//!   num_hashes: 128
//!   bands: 32
//!   seed: 17293822573397606061
//!
//! vector_store:
//!   backend: qdrant
//!   url: "http://localhost:6334"
//!   collection: "logs"
//!   distance: cosine
//!
//! lookup_store:
//!   backend: postgres
//!   host: "localhost"
//!   user: "logdup"
//!   database: "logs"
//!   table: "log_lookup"
//!
//! pipeline:
//!   insert_sim_threshold: 0.9
//!   sim_sync_batch_size: 100
//!
//! log_level: "info"
//! log_json: false
//! ```
//!
//! Store endpoints and credentials can be overridden from the environment:
//! `LOGDUP_QDRANT_URL`, `LOGDUP_QDRANT_API_KEY`, `LOGDUP_QDRANT_COLLECTION`,
//! `LOGDUP_PG_HOST`, `LOGDUP_PG_PORT`, `LOGDUP_PG_USER`, `LOGDUP_PG_PASSWORD`,
//! `LOGDUP_PG_DATABASE`, `LOGDUP_PG_TABLE` and `LOGDUP_LOG_LEVEL`. An
//! override only applies to the backend the file selects.

use std::fs;
use std::path::Path;

use canonical::NormalizeConfig;
use dedup::DedupConfig;
use index::{Distance, LookupBackendConfig, VectorBackendConfig};
use perceptual::FingerprintConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(flatten)]
    pub backend: VectorBackendConfig,
    #[serde(default)]
    pub distance: Distance,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: VectorBackendConfig::default(),
            distance: Distance::Cosine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogdupConfig {
    #[serde(default = "default_version")]
    pub version: String,

    /// Normalizer settings for the fingerprinter. Alternative to
    /// `fingerprint.normalize`; setting both is a validation error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<NormalizeConfig>,

    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub lookup_store: LookupBackendConfig,

    #[serde(default)]
    pub pipeline: DedupConfig,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,
}

impl Default for LogdupConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            normalizer: None,
            fingerprint: FingerprintConfig::default(),
            vector_store: VectorStoreConfig::default(),
            lookup_store: LookupBackendConfig::default(),
            pipeline: DedupConfig::default(),
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl LogdupConfig {
    /// Read, apply `LOGDUP_*` overrides, validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        let mut config: LogdupConfig = serde_yaml::from_str(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate without consulting the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: LogdupConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a config file.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let mut config = LogdupConfig::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Fingerprinter settings with the `normalizer` section folded in.
    pub fn fingerprint_config(&self) -> FingerprintConfig {
        match &self.normalizer {
            Some(normalizer) => self.fingerprint.clone().with_normalize(normalizer.clone()),
            None => self.fingerprint.clone(),
        }
    }

    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(level) = var("LOGDUP_LOG_LEVEL") {
            self.log_level = level;
        }

        if let VectorBackendConfig::Qdrant {
            url,
            collection,
            api_key,
        } = &mut self.vector_store.backend
        {
            if let Some(v) = var("LOGDUP_QDRANT_URL") {
                *url = v;
            }
            if let Some(v) = var("LOGDUP_QDRANT_COLLECTION") {
                *collection = v;
            }
            if let Some(v) = var("LOGDUP_QDRANT_API_KEY") {
                *api_key = Some(v);
            }
        }

        if let LookupBackendConfig::Postgres {
            host,
            port,
            user,
            password,
            database,
            table,
        } = &mut self.lookup_store
        {
            if let Some(v) = var("LOGDUP_PG_HOST") {
                *host = v;
            }
            if let Some(p) = var("LOGDUP_PG_PORT").and_then(|v| v.parse().ok()) {
                *port = p;
            }
            if let Some(v) = var("LOGDUP_PG_USER") {
                *user = v;
            }
            if let Some(v) = var("LOGDUP_PG_PASSWORD") {
                *password = Some(v);
            }
            if let Some(v) = var("LOGDUP_PG_DATABASE") {
                *database = v;
            }
            if let Some(v) = var("LOGDUP_PG_TABLE") {
                *table = v;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        if self.normalizer.is_some() && self.fingerprint.normalize != NormalizeConfig::default() {
            return Err(ConfigLoadError::Validation(
                "set either `normalizer` or `fingerprint.normalize`, not both".into(),
            ));
        }
        self.fingerprint_config()
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.pipeline
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        if self.vector_store.backend.collection().trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "vector_store.collection must not be empty".into(),
            ));
        }
        if let VectorBackendConfig::Qdrant { url, .. } = &self.vector_store.backend {
            if url.trim().is_empty() {
                return Err(ConfigLoadError::Validation(
                    "vector_store.url must not be empty".into(),
                ));
            }
        }
        if self.log_level.trim().is_empty() {
            return Err(ConfigLoadError::Validation(
                "log_level must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
