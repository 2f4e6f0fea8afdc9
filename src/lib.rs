//! Engram - persistent memory engine for LLM sessions
//!
//! Ingests conversational events as episodic memories, embeds them through
//! an external model provider, discovers associations between them on
//! background tasks, and consolidates episodic traces into semantic
//! knowledge under a context-window budget:
//! - Typed memory collections over a vector store (Qdrant or in-process)
//! - Automatic temporal / semantic / contextual association graph
//! - Deterministic importance scoring with exponential decay
//! - Event-driven consolidation with a bounded queue and a single worker

pub mod adapters;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export key types for convenience
pub use domain::errors::{MemoryError, MemoryResult};
pub use domain::models::{MemoryAssociation, MemoryEntry, MemoryKind};
pub use infrastructure::setup::{build_engine, Engine};
pub use services::{Journal, MemoryProcessor};
