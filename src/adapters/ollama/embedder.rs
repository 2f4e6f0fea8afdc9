//! Ollama embedding provider.
//!
//! Wraps the raw client with retry-on-transient and an LRU cache keyed by
//! the input text. Cache entries expire after the configured TTL.

use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::ModelConfig;
use crate::domain::ports::Embedder;

use super::client::OllamaClient;
use super::retry::RetryPolicy;

struct CachedEmbedding {
    vector: Vec<f32>,
    inserted_at: Instant,
}

/// [`Embedder`] backed by an Ollama server.
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    dimension: usize,
    retry: RetryPolicy,
    cache: Option<Mutex<LruCache<String, CachedEmbedding>>>,
    cache_ttl: Duration,
}

impl OllamaEmbedder {
    pub fn new(
        client: Arc<OllamaClient>,
        config: &ModelConfig,
        dimension: usize,
    ) -> Self {
        let cache = if config.cache_enabled {
            let capacity = NonZeroUsize::new(config.cache_capacity).unwrap_or(NonZeroUsize::MIN);
            Some(Mutex::new(LruCache::new(capacity)))
        } else {
            None
        };
        Self {
            client,
            model: config.embedding_model.clone(),
            dimension,
            retry: RetryPolicy::new(config.max_retries),
            cache,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        }
    }

    fn cache_get(&self, text: &str) -> Option<Vec<f32>> {
        let cache = self.cache.as_ref()?;
        let mut cache = cache.lock().ok()?;
        match cache.get(text) {
            Some(cached) if cached.inserted_at.elapsed() < self.cache_ttl => {
                Some(cached.vector.clone())
            }
            Some(_) => {
                cache.pop(text);
                None
            }
            None => None,
        }
    }

    fn cache_put(&self, text: &str, vector: &[f32]) {
        if let Some(cache) = self.cache.as_ref() {
            if let Ok(mut cache) = cache.lock() {
                cache.put(
                    text.to_string(),
                    CachedEmbedding {
                        vector: vector.to_vec(),
                        inserted_at: Instant::now(),
                    },
                );
            }
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        if text.is_empty() {
            return Err(MemoryError::BadInput("cannot embed empty text".to_string()));
        }
        if let Some(vector) = self.cache_get(text) {
            debug!(model = %self.model, "embedding cache hit");
            return Ok(vector);
        }

        let vector = self
            .retry
            .execute(|| self.client.embeddings(&self.model, text))
            .await?;

        if vector.len() != self.dimension {
            return Err(MemoryError::EmbedderUnavailable(format!(
                "model {} produced dimension {} but {} is configured",
                self.model,
                vector.len(),
                self.dimension
            )));
        }

        self.cache_put(text, &vector);
        Ok(vector)
    }

    async fn health(&self) -> MemoryResult<()> {
        self.client.health().await
    }
}
