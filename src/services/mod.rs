//! Application services: the memory lifecycle engine.

pub mod analyzer;
pub mod context_monitor;
pub mod journal;
pub mod processor;
pub mod scorer;
pub mod tracker;

pub use analyzer::{cosine_similarity, AssociationAnalyzer};
pub use context_monitor::ContextMonitor;
pub use journal::{Journal, MemoryStats};
pub use processor::MemoryProcessor;
pub use scorer::{MemoryScorer, ScoringParams};
pub use tracker::AssociationTracker;
