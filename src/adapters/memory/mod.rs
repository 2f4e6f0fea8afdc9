//! In-process store adapters for tests and local development.

pub mod association_store;
pub mod memory_store;

pub use association_store::InMemoryAssociationStore;
pub use memory_store::InMemoryMemoryStore;
