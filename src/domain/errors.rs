//! Error types for the engram memory engine.
//!
//! One taxonomy covers the whole pipeline: caller contract violations,
//! store transport failures, external model failures, and processor
//! lifecycle errors. Background tasks log these instead of propagating.

use thiserror::Error;

/// Errors surfaced by the memory engine.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Caller violated an input contract (empty content, zero limit where
    /// disallowed, embedding dimension mismatch).
    #[error("Bad input: {0}")]
    BadInput(String),

    /// No record with the given id exists.
    #[error("Memory not found: {0}")]
    NotFound(String),

    /// Memory kind has no configured collection.
    #[error("No collection configured for memory kind: {0}")]
    UnknownKind(String),

    /// Transport or remote error against the vector or association store.
    #[error("Vector store unavailable: {0}")]
    StoreUnavailable(String),

    /// Embedding provider failed or is unreachable.
    #[error("Embedder unavailable: {0}")]
    EmbedderUnavailable(String),

    /// Consolidation model failed or is unreachable.
    #[error("Summarizer failed: {0}")]
    SummarizerFailed(String),

    /// Processor event queue is at capacity.
    #[error("Processor queue full")]
    QueueFull,

    /// Processor is not running.
    #[error("Processor not running")]
    NotRunning,

    /// Operation was canceled by deadline or shutdown.
    #[error("Operation canceled: {0}")]
    Canceled(String),

    /// Stored record could not be decoded into a domain type.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Returns true if this error is transient and could succeed on retry.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable(_)
                | Self::EmbedderUnavailable(_)
                | Self::SummarizerFailed(_)
                | Self::QueueFull
        )
    }

    /// Returns true if this error represents a permanent failure.
    pub const fn is_permanent(&self) -> bool {
        !self.is_transient()
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        MemoryError::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for MemoryError {
    fn from(err: reqwest::Error) -> Self {
        MemoryError::StoreUnavailable(err.to_string())
    }
}
