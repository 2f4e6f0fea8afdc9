//! Ports: async traits implemented by adapters.

pub mod association_store;
pub mod embedder;
pub mod memory_store;
pub mod summarizer;

pub use association_store::{AssociationPage, AssociationStore};
pub use embedder::Embedder;
pub use memory_store::{MemoryPage, MemoryStore};
pub use summarizer::Summarizer;
