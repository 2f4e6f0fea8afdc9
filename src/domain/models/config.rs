//! Configuration model for the engram engine.
//!
//! Every section has serde defaults so a bare config file (or none at all)
//! yields a runnable local setup. Validation lives in the loader.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::memory::MemoryKind;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Consolidation and scoring parameters
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Journal behavior
    #[serde(default)]
    pub journal: JournalConfig,

    /// Vector store backend
    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    /// Embedding / consolidation model provider
    #[serde(default)]
    pub model: ModelConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            journal: JournalConfig::default(),
            vector_store: VectorStoreConfig::default(),
            model: ModelConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Consolidation scheduling and scoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Context-window token budget available to the summarizer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,

    /// Fraction of the budget the processor may fill, in (0, 1]
    #[serde(default = "default_safety_margin")]
    pub safety_margin: f64,

    /// Episodic count that triggers consolidation; also the selection size
    #[serde(default = "default_memory_count_threshold")]
    pub memory_count_threshold: usize,

    /// Accumulated embedding payload (bytes) that triggers consolidation
    #[serde(default = "default_embedding_size_threshold")]
    pub embedding_size_threshold: u64,

    /// Context usage ratio that triggers consolidation, in (0, 1]
    #[serde(default = "default_context_usage_threshold")]
    pub context_usage_threshold: f64,

    /// Exponential decay rate λ (per hour since last access)
    #[serde(default = "default_decay_lambda")]
    pub decay_lambda: f64,

    /// Weight of access frequency in the composite score
    #[serde(default = "default_access_weight")]
    pub access_weight: f64,

    /// Weight of relevance in the composite score
    #[serde(default = "default_relevance_weight")]
    pub relevance_weight: f64,

    /// Processor event queue capacity; 0 rejects every trigger
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

const fn default_max_tokens() -> u64 {
    8192
}

const fn default_safety_margin() -> f64 {
    0.8
}

const fn default_memory_count_threshold() -> usize {
    10
}

const fn default_embedding_size_threshold() -> u64 {
    10 * 1024 * 1024
}

const fn default_context_usage_threshold() -> f64 {
    0.8
}

const fn default_decay_lambda() -> f64 {
    0.01
}

const fn default_access_weight() -> f64 {
    0.3
}

const fn default_relevance_weight() -> f64 {
    0.7
}

const fn default_queue_capacity() -> usize {
    100
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            safety_margin: default_safety_margin(),
            memory_count_threshold: default_memory_count_threshold(),
            embedding_size_threshold: default_embedding_size_threshold(),
            context_usage_threshold: default_context_usage_threshold(),
            decay_lambda: default_decay_lambda(),
            access_weight: default_access_weight(),
            relevance_weight: default_relevance_weight(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Journal behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JournalConfig {
    /// Default page size for retrieval
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Days episodic memories are kept before retention sweeps may remove them
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Seconds between periodic consolidation opportunities
    #[serde(default = "default_consolidation_interval")]
    pub consolidation_interval_secs: u64,

    /// Maximum accepted content length in bytes
    #[serde(default = "default_max_memory_size")]
    pub max_memory_size: usize,

    /// Minimum strength below which entries are eligible for sweeping
    #[serde(default = "default_strength_threshold")]
    pub strength_threshold: f64,

    /// Delete source memories after a successful consolidation
    #[serde(default)]
    pub delete_after_consolidation: bool,
}

const fn default_batch_size() -> usize {
    50
}

const fn default_retention_days() -> u32 {
    90
}

const fn default_consolidation_interval() -> u64 {
    300
}

const fn default_max_memory_size() -> usize {
    65536
}

const fn default_strength_threshold() -> f64 {
    0.1
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            retention_days: default_retention_days(),
            consolidation_interval_secs: default_consolidation_interval(),
            max_memory_size: default_max_memory_size(),
            strength_threshold: default_strength_threshold(),
            delete_after_consolidation: false,
        }
    }
}

/// Vector store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProvider {
    /// Qdrant over its REST API
    Qdrant,
    /// In-process store (tests, local development)
    Memory,
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct VectorStoreConfig {
    /// Backend provider
    #[serde(default = "default_store_provider")]
    pub provider: VectorStoreProvider,

    /// Base URL of the remote store
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Collection name per memory kind
    #[serde(default = "default_memory_collections")]
    pub memory_collections: HashMap<String, String>,

    /// Collection name for association records
    #[serde(default = "default_associations_collection")]
    pub associations_collection: String,

    /// Embedding dimension D shared by all memory collections
    #[serde(default = "default_vector_dimension")]
    pub vector_dimension: usize,

    /// Keep payloads on disk rather than in memory
    #[serde(default = "default_true")]
    pub on_disk_payload: bool,

    /// Transport timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
}

fn default_store_provider() -> VectorStoreProvider {
    VectorStoreProvider::Qdrant
}

fn default_store_url() -> String {
    "http://localhost:6333".to_string()
}

fn default_memory_collections() -> HashMap<String, String> {
    MemoryKind::all()
        .iter()
        .map(|kind| (kind.as_str().to_string(), format!("{kind}_memories")))
        .collect()
}

fn default_associations_collection() -> String {
    "associations".to_string()
}

const fn default_vector_dimension() -> usize {
    3072
}

const fn default_true() -> bool {
    true
}

const fn default_store_timeout() -> u64 {
    30
}

impl VectorStoreConfig {
    /// Collection name for a memory kind, if configured.
    pub fn collection_for(&self, kind: MemoryKind) -> Option<&str> {
        self.memory_collections.get(kind.as_str()).map(String::as_str)
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: default_store_provider(),
            url: default_store_url(),
            memory_collections: default_memory_collections(),
            associations_collection: default_associations_collection(),
            vector_dimension: default_vector_dimension(),
            on_disk_payload: default_true(),
            timeout_secs: default_store_timeout(),
            insecure: false,
        }
    }
}

/// Embedding / consolidation model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelConfig {
    /// Provider name (informational; the Ollama adapter is the in-tree one)
    #[serde(default = "default_model_provider")]
    pub provider: String,

    /// Base URL of the model server
    #[serde(default = "default_model_url")]
    pub url: String,

    /// Model used for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Model used for consolidation summaries
    #[serde(default = "default_consolidation_model")]
    pub consolidation_model: String,

    /// Cache embeddings keyed by input text
    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    /// Maximum cached embeddings
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Cache entry lifetime in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Request timeout in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// Retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_model_provider() -> String {
    "ollama".to_string()
}

fn default_model_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

fn default_consolidation_model() -> String {
    "llama3.1:8b".to_string()
}

const fn default_cache_capacity() -> usize {
    1024
}

const fn default_cache_ttl() -> u64 {
    3600
}

const fn default_model_timeout() -> u64 {
    30
}

const fn default_max_retries() -> u32 {
    3
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_model_provider(),
            url: default_model_url(),
            embedding_model: default_embedding_model(),
            consolidation_model: default_consolidation_model(),
            cache_enabled: default_true(),
            cache_capacity: default_cache_capacity(),
            cache_ttl_secs: default_cache_ttl(),
            timeout_secs: default_model_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}
