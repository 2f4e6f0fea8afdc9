//! Embedding provider port.

use async_trait::async_trait;

use crate::domain::errors::MemoryResult;

/// Converts text into dense vectors for similarity search.
///
/// Implementations may cache embeddings keyed by the input string; the
/// journal treats repeated calls with identical input as equivalent.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Provider name (e.g., "ollama").
    fn name(&self) -> &'static str;

    /// Embedding dimension produced by this provider/model.
    fn dimension(&self) -> usize;

    /// Generate an embedding for the given text.
    ///
    /// Fails with `EmbedderUnavailable` after retries are exhausted.
    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>>;

    /// Provider reachability check.
    async fn health(&self) -> MemoryResult<()>;
}
