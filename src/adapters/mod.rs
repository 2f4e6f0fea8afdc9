//! Adapters implementing the domain ports against concrete backends.

pub mod memory;
pub mod ollama;
pub mod qdrant;
