//! Configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::{Config, MemoryKind, VectorStoreProvider};

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid max_tokens: must be positive")]
    InvalidMaxTokens,

    #[error("Invalid safety_margin: {0}. Must be in (0, 1]")]
    InvalidSafetyMargin(f64),

    #[error("Invalid memory_count_threshold: must be positive")]
    InvalidMemoryCountThreshold,

    #[error("Invalid embedding_size_threshold: must be positive")]
    InvalidEmbeddingSizeThreshold,

    #[error("Invalid context_usage_threshold: {0}. Must be in (0, 1]")]
    InvalidContextUsageThreshold(f64),

    #[error("Invalid decay_lambda: {0}. Must be positive")]
    InvalidDecayLambda(f64),

    #[error("Invalid scoring weight: {0}. Must be non-negative")]
    InvalidScoringWeight(f64),

    #[error("Invalid batch_size: must be positive")]
    InvalidBatchSize,

    #[error("Invalid retention_days: must be positive")]
    InvalidRetentionDays,

    #[error("Invalid consolidation_interval_secs: must be positive")]
    InvalidConsolidationInterval,

    #[error("Invalid max_memory_size: must be positive")]
    InvalidMaxMemorySize,

    #[error("Invalid strength_threshold: {0}. Must be in [0, 1]")]
    InvalidStrengthThreshold(f64),

    #[error("Vector store url cannot be empty")]
    EmptyStoreUrl,

    #[error("Missing collection for memory kind: {0}")]
    MissingCollection(String),

    #[error("Collection name for {0} cannot be empty")]
    EmptyCollectionName(String),

    #[error("Collection names must be unique: {0}")]
    DuplicateCollectionName(String),

    #[error("Invalid vector_dimension: must be positive")]
    InvalidVectorDimension,

    #[error("Invalid timeout: must be positive")]
    InvalidTimeout,

    #[error("Model provider url cannot be empty")]
    EmptyModelUrl,

    #[error("Model name cannot be empty: {0}")]
    EmptyModelName(String),

    #[error("Invalid cache_capacity: must be positive when caching is enabled")]
    InvalidCacheCapacity,

    #[error("Invalid max_retries: must be at least 1")]
    InvalidMaxRetries,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults
    /// 2. engram.yaml (project config)
    /// 3. engram.local.yaml (local overrides, optional)
    /// 4. Environment variables (`ENGRAM_` prefix, `__` nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file("engram.yaml"))
            .merge(Yaml::file("engram.local.yaml"))
            .merge(Env::prefixed("ENGRAM_").split("__"))
            .extract()
            .context("Failed to extract configuration")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let memory = &config.memory;
        if memory.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens);
        }
        if memory.safety_margin <= 0.0 || memory.safety_margin > 1.0 {
            return Err(ConfigError::InvalidSafetyMargin(memory.safety_margin));
        }
        if memory.memory_count_threshold == 0 {
            return Err(ConfigError::InvalidMemoryCountThreshold);
        }
        if memory.embedding_size_threshold == 0 {
            return Err(ConfigError::InvalidEmbeddingSizeThreshold);
        }
        if memory.context_usage_threshold <= 0.0 || memory.context_usage_threshold > 1.0 {
            return Err(ConfigError::InvalidContextUsageThreshold(
                memory.context_usage_threshold,
            ));
        }
        if memory.decay_lambda <= 0.0 {
            return Err(ConfigError::InvalidDecayLambda(memory.decay_lambda));
        }
        for weight in [memory.access_weight, memory.relevance_weight] {
            if weight < 0.0 {
                return Err(ConfigError::InvalidScoringWeight(weight));
            }
        }

        let journal = &config.journal;
        if journal.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if journal.retention_days == 0 {
            return Err(ConfigError::InvalidRetentionDays);
        }
        if journal.consolidation_interval_secs == 0 {
            return Err(ConfigError::InvalidConsolidationInterval);
        }
        if journal.max_memory_size == 0 {
            return Err(ConfigError::InvalidMaxMemorySize);
        }
        if !(0.0..=1.0).contains(&journal.strength_threshold) {
            return Err(ConfigError::InvalidStrengthThreshold(
                journal.strength_threshold,
            ));
        }

        let store = &config.vector_store;
        if store.provider == VectorStoreProvider::Qdrant && store.url.is_empty() {
            return Err(ConfigError::EmptyStoreUrl);
        }
        let mut seen = std::collections::HashSet::new();
        for kind in MemoryKind::all() {
            let name = store
                .collection_for(kind)
                .ok_or_else(|| ConfigError::MissingCollection(kind.as_str().to_string()))?;
            if name.is_empty() {
                return Err(ConfigError::EmptyCollectionName(kind.as_str().to_string()));
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::DuplicateCollectionName(name.to_string()));
            }
        }
        if store.associations_collection.is_empty() {
            return Err(ConfigError::EmptyCollectionName("associations".to_string()));
        }
        if !seen.insert(store.associations_collection.clone()) {
            return Err(ConfigError::DuplicateCollectionName(
                store.associations_collection.clone(),
            ));
        }
        if store.vector_dimension == 0 {
            return Err(ConfigError::InvalidVectorDimension);
        }
        if store.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let model = &config.model;
        if model.url.is_empty() {
            return Err(ConfigError::EmptyModelUrl);
        }
        if model.embedding_model.is_empty() {
            return Err(ConfigError::EmptyModelName("embedding_model".to_string()));
        }
        if model.consolidation_model.is_empty() {
            return Err(ConfigError::EmptyModelName(
                "consolidation_model".to_string(),
            ));
        }
        if model.cache_enabled && model.cache_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity);
        }
        if model.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries);
        }
        if model.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
