//! Qdrant REST adapter.
//!
//! One collection per memory kind plus a dedicated association collection.
//! Initialization is idempotent and run on every startup.

pub mod association_store;
pub mod client;
pub mod memory_store;
pub mod payload;
pub mod types;

pub use association_store::QdrantAssociationStore;
pub use client::QdrantClient;
pub use memory_store::QdrantMemoryStore;
