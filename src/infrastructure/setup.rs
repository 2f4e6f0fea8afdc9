//! Service wiring: build the journal and processor from configuration.

use anyhow::{Context, Result};
use chrono::Duration;
use std::sync::Arc;
use tracing::info;

use crate::adapters::memory::{InMemoryAssociationStore, InMemoryMemoryStore};
use crate::adapters::ollama::{OllamaClient, OllamaEmbedder, OllamaSummarizer};
use crate::adapters::qdrant::{QdrantAssociationStore, QdrantClient, QdrantMemoryStore};
use crate::domain::models::{Config, VectorStoreProvider};
use crate::domain::ports::{AssociationStore, MemoryStore};
use crate::services::{
    AssociationAnalyzer, AssociationTracker, ContextMonitor, Journal, MemoryProcessor,
    MemoryScorer, ScoringParams,
};

/// The wired memory engine.
pub struct Engine {
    pub journal: Arc<Journal>,
    pub processor: Arc<MemoryProcessor>,
}

/// Build stores, providers, and services from configuration, running the
/// idempotent collection-initialization protocol for remote stores.
pub async fn build_engine(config: &Config) -> Result<Engine> {
    let (memory_store, association_store): (Arc<dyn MemoryStore>, Arc<dyn AssociationStore>) =
        match config.vector_store.provider {
            VectorStoreProvider::Qdrant => {
                let client = Arc::new(
                    QdrantClient::new(&config.vector_store)
                        .context("failed to build vector store client")?,
                );
                let memory_store =
                    QdrantMemoryStore::new(Arc::clone(&client), config.vector_store.clone());
                memory_store
                    .initialize()
                    .await
                    .context("failed to initialize memory collections")?;
                let association_store =
                    QdrantAssociationStore::new(Arc::clone(&client), &config.vector_store);
                association_store
                    .initialize()
                    .await
                    .context("failed to initialize association collection")?;
                info!(url = %config.vector_store.url, "connected to vector store");
                (Arc::new(memory_store), Arc::new(association_store))
            }
            VectorStoreProvider::Memory => {
                info!("using in-process vector store");
                (
                    Arc::new(InMemoryMemoryStore::new(config.vector_store.vector_dimension)),
                    Arc::new(InMemoryAssociationStore::new()),
                )
            }
        };

    let ollama = Arc::new(OllamaClient::new(&config.model).context("failed to build model client")?);
    let embedder = Arc::new(OllamaEmbedder::new(
        Arc::clone(&ollama),
        &config.model,
        config.vector_store.vector_dimension,
    ));
    let summarizer = Arc::new(OllamaSummarizer::new(ollama, &config.model));

    let scorer = MemoryScorer::new(ScoringParams {
        decay_lambda: config.memory.decay_lambda,
        access_weight: config.memory.access_weight,
        relevance_weight: config.memory.relevance_weight,
    });
    let analyzer = AssociationAnalyzer::new(Duration::hours(1), 0.8);
    let tracker = Arc::new(AssociationTracker::new(association_store));

    let journal = Arc::new(Journal::new(
        config.journal.clone(),
        memory_store,
        tracker,
        embedder,
        summarizer,
        scorer,
        analyzer,
    ));

    let monitor = Arc::new(ContextMonitor::new(
        config.memory.max_tokens,
        config.memory.safety_margin,
    ));
    let processor = Arc::new(MemoryProcessor::new(
        Arc::clone(&journal),
        monitor,
        &config.memory,
    ));

    Ok(Engine { journal, processor })
}
