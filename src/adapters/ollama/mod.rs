//! Ollama model provider adapter: embeddings and consolidation.

pub mod client;
pub mod embedder;
pub mod retry;
pub mod summarizer;

pub use client::OllamaClient;
pub use embedder::OllamaEmbedder;
pub use retry::RetryPolicy;
pub use summarizer::OllamaSummarizer;
