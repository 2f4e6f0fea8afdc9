//! Memory journal: the capture → associate → consolidate façade.
//!
//! Capture is synchronous up to the durable store write; association
//! analysis runs on a spawned task whose failures are logged, never
//! surfaced. Consolidation folds a batch of memories into one semantic
//! entry through the external summarizer.

use futures::future;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::{
    JournalConfig, Metadata, MetadataValue, MemoryAssociation, MemoryEntry, MemoryKind,
};
use crate::domain::ports::{Embedder, MemoryStore, Summarizer};
use crate::services::analyzer::AssociationAnalyzer;
use crate::services::scorer::MemoryScorer;
use crate::services::tracker::AssociationTracker;

/// How many recent episodic entries the association passes compare against.
const ANALYZER_CANDIDATE_WINDOW: usize = 100;

/// Per-kind counts plus the grand total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryStats {
    pub counts: HashMap<MemoryKind, u64>,
    pub total: u64,
}

impl MemoryStats {
    pub fn count_for(&self, kind: MemoryKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

/// Central memory lifecycle service.
pub struct Journal {
    config: JournalConfig,
    memory_store: Arc<dyn MemoryStore>,
    tracker: Arc<AssociationTracker>,
    embedder: Arc<dyn Embedder>,
    summarizer: Arc<dyn Summarizer>,
    scorer: MemoryScorer,
    analyzer: AssociationAnalyzer,
    /// Flipped on shutdown so in-flight analysis tasks exit early
    shutdown_tx: watch::Sender<bool>,
}

impl Journal {
    pub fn new(
        config: JournalConfig,
        memory_store: Arc<dyn MemoryStore>,
        tracker: Arc<AssociationTracker>,
        embedder: Arc<dyn Embedder>,
        summarizer: Arc<dyn Summarizer>,
        scorer: MemoryScorer,
        analyzer: AssociationAnalyzer,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            config,
            memory_store,
            tracker,
            embedder,
            summarizer,
            scorer,
            analyzer,
            shutdown_tx,
        }
    }

    /// Capture a context event as an episodic memory.
    ///
    /// Embeds, scores, and durably stores the entry before returning.
    /// Association analysis runs on a background task afterwards; a read
    /// immediately after capture may observe empty `association_ids`.
    pub async fn capture(
        &self,
        source: &str,
        content: &str,
        metadata: Metadata,
    ) -> MemoryResult<MemoryEntry> {
        if source.is_empty() {
            return Err(MemoryError::BadInput("source cannot be empty".to_string()));
        }
        if content.is_empty() {
            return Err(MemoryError::BadInput("content cannot be empty".to_string()));
        }
        if content.len() > self.config.max_memory_size {
            return Err(MemoryError::BadInput(format!(
                "content length {} exceeds maximum {}",
                content.len(),
                self.config.max_memory_size
            )));
        }

        let embedding = self.embedder.embed(content).await?;

        let mut entry = MemoryEntry::episodic(source, content)
            .with_embedding(embedding)
            .with_metadata(metadata);
        entry.score = self.scorer.score(&entry);

        self.memory_store.store(&entry).await?;
        debug!(memory_id = %entry.id, source, "captured episodic memory");

        let task = AnalysisTask {
            memory_store: Arc::clone(&self.memory_store),
            tracker: Arc::clone(&self.tracker),
            analyzer: self.analyzer.clone(),
            shutdown_rx: self.shutdown_tx.subscribe(),
        };
        let entry_for_analysis = entry.clone();
        tokio::spawn(task.run(entry_for_analysis));

        Ok(entry)
    }

    /// Most recent episodic memories. A zero limit applies the configured
    /// batch size.
    pub async fn get_memories(&self, limit: usize) -> MemoryResult<Vec<MemoryEntry>> {
        let limit = if limit == 0 {
            self.config.batch_size
        } else {
            limit
        };
        self.memory_store.get_recent(MemoryKind::Episodic, limit).await
    }
}

/// Detached association analysis for one freshly captured entry.
///
/// Owns clones of everything it touches so the originating request can
/// return immediately; cancellation comes from the journal's shutdown
/// channel, not the request. Edges persist through the association
/// tracker so its indexes stay coherent with the store.
struct AnalysisTask {
    memory_store: Arc<dyn MemoryStore>,
    tracker: Arc<AssociationTracker>,
    analyzer: AssociationAnalyzer,
    shutdown_rx: watch::Receiver<bool>,
}

impl AnalysisTask {
    async fn run(self, entry: MemoryEntry) {
        if *self.shutdown_rx.borrow() {
            return;
        }
        let mut shutdown_rx = self.shutdown_rx.clone();
        tokio::select! {
            () = self.run_association_analysis(&entry) => {}
            _ = shutdown_rx.changed() => {
                debug!(memory_id = %entry.id, "association analysis canceled by shutdown");
            }
        }
    }

    async fn run_association_analysis(&self, entry: &MemoryEntry) {
        let candidates = match self
            .memory_store
            .get_recent(MemoryKind::Episodic, ANALYZER_CANDIDATE_WINDOW)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(memory_id = %entry.id, error = %e, "association analysis could not fetch candidates");
                return;
            }
        };

        let associations = self.analyzer.analyze(entry, &candidates);
        if associations.is_empty() {
            return;
        }

        let mut stored: Vec<MemoryAssociation> = Vec::new();
        for association in associations {
            match self
                .tracker
                .create_association(
                    association.source_id,
                    association.target_id,
                    association.kind,
                    association.strength,
                    association.metadata,
                )
                .await
            {
                Ok(created) => stored.push(created),
                Err(e) => {
                    warn!(
                        memory_id = %entry.id,
                        error = %e,
                        "failed to persist association"
                    );
                }
            }
        }
        if stored.is_empty() {
            return;
        }

        // Back-patch the new entry with the ids that actually landed
        let mut patched = entry.clone();
        for association in &stored {
            if !patched.has_association(association.id) {
                patched.association_ids.push(association.id);
            }
        }
        if let Err(e) = self.memory_store.store(&patched).await {
            warn!(memory_id = %entry.id, error = %e, "failed to back-patch association ids");
        }

        // New edges also belong to the candidates they point at; patch each
        // target so both endpoints can reach the edge
        let mut by_target: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for association in &stored {
            by_target
                .entry(association.target_id)
                .or_default()
                .push(association.id);
        }
        for (target_id, association_ids) in by_target {
            match self.memory_store.retrieve(MemoryKind::Episodic, target_id).await {
                Ok(mut target) => {
                    let mut changed = false;
                    for id in association_ids {
                        if !target.has_association(id) {
                            target.association_ids.push(id);
                            changed = true;
                        }
                    }
                    if changed {
                        if let Err(e) = self.memory_store.store(&target).await {
                            warn!(memory_id = %target_id, error = %e, "failed to back-patch target");
                        }
                    }
                }
                Err(e) => {
                    debug!(memory_id = %target_id, error = %e, "target gone before back-patch");
                }
            }
        }
        debug!(
            memory_id = %entry.id,
            associations = patched.association_ids.len(),
            "association analysis complete"
        );
    }
}

impl Journal {
    /// Fetch one episodic memory and record the access.
    ///
    /// The read never fails because of the tracking write-back; a failed
    /// write-back is logged and the updated entry returned anyway.
    pub async fn get_memory_by_id(&self, id: Uuid) -> MemoryResult<MemoryEntry> {
        let mut entry = self.memory_store.retrieve(MemoryKind::Episodic, id).await?;
        self.scorer.update_access(&mut entry);
        if let Err(e) = self.memory_store.store(&entry).await {
            warn!(memory_id = %id, error = %e, "failed to persist access tracking");
        }
        Ok(entry)
    }

    /// Embed the query text and search one kind's collection.
    pub async fn query_similar(
        &self,
        content: &str,
        kind: MemoryKind,
        limit: usize,
    ) -> MemoryResult<Vec<MemoryEntry>> {
        if content.is_empty() {
            return Err(MemoryError::BadInput("query cannot be empty".to_string()));
        }
        let vector = self.embedder.embed(content).await?;
        self.memory_store.query(kind, &vector, limit).await
    }

    /// Consolidate a batch of memories into one semantic entry.
    ///
    /// Nothing is persisted when the summarizer or the embedding of its
    /// summary fails. Source deletion afterwards is policy-gated and
    /// best-effort.
    pub async fn consolidate(&self, memories: &[MemoryEntry]) -> MemoryResult<()> {
        if memories.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = memories.iter().map(|m| m.content.clone()).collect();
        let summary = self.summarizer.consolidate(&texts).await?;
        let embedding = self.embedder.embed(&summary).await?;

        let source_ids: Vec<String> = memories.iter().map(|m| m.id.to_string()).collect();
        let mut metadata = Metadata::new();
        metadata.insert(
            "source_memories".to_string(),
            MetadataValue::Int(memories.len() as i64),
        );
        metadata.insert(
            "consolidation_timestamp".to_string(),
            MetadataValue::Int(chrono::Utc::now().timestamp()),
        );
        metadata.insert(
            "consolidated_from".to_string(),
            MetadataValue::Str(source_ids.join(",")),
        );

        let mut entry = MemoryEntry::semantic("consolidation", summary)
            .with_embedding(embedding)
            .with_metadata(metadata);
        entry.score = self.scorer.score(&entry);

        self.memory_store.store(&entry).await?;
        info!(
            semantic_id = %entry.id,
            sources = memories.len(),
            "consolidated memories into semantic entry"
        );

        if self.config.delete_after_consolidation {
            self.delete_sources(memories).await;
        }
        Ok(())
    }

    /// Best-effort removal of consolidated source memories.
    async fn delete_sources(&self, memories: &[MemoryEntry]) {
        let mut by_kind: HashMap<MemoryKind, Vec<Uuid>> = HashMap::new();
        for memory in memories {
            by_kind.entry(memory.kind).or_default().push(memory.id);
        }
        for (kind, ids) in by_kind {
            if let Err(e) = self.memory_store.delete(kind, &ids).await {
                warn!(kind = %kind, error = %e, "failed to delete consolidated sources");
            }
        }
    }

    /// Exact per-kind counts, collected concurrently.
    pub async fn memory_stats(&self) -> MemoryResult<MemoryStats> {
        let kinds = MemoryKind::all();
        let per_kind =
            future::try_join_all(kinds.iter().map(|&kind| self.memory_store.count(kind))).await?;

        let counts: HashMap<MemoryKind, u64> =
            kinds.iter().copied().zip(per_kind.iter().copied()).collect();
        let total = per_kind.iter().sum();
        Ok(MemoryStats { counts, total })
    }

    /// Store and embedder reachability.
    pub async fn health_check(&self) -> MemoryResult<()> {
        self.memory_store.count(MemoryKind::Episodic).await?;
        self.embedder.health().await
    }

    /// Cancel in-flight background analysis tasks. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Scorer shared with the processor for selection.
    pub fn scorer(&self) -> &MemoryScorer {
        &self.scorer
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
