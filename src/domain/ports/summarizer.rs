//! Consolidation model port.

use async_trait::async_trait;

use crate::domain::errors::MemoryResult;

/// Synthesizes one piece of semantic knowledge from several memory texts.
///
/// The provider has a finite context window; callers are responsible for
/// keeping the combined input under budget (the processor's context
/// monitor enforces this).
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Provider name (e.g., "ollama").
    fn name(&self) -> &'static str;

    /// Produce a consolidated summary of the given texts, in input order.
    ///
    /// Fails with `SummarizerFailed` after retries are exhausted.
    async fn consolidate(&self, texts: &[String]) -> MemoryResult<String>;

    /// Provider reachability check.
    async fn health(&self) -> MemoryResult<()>;
}
