//! Memory processor: event-driven consolidation orchestration.
//!
//! A single worker drains a bounded queue of typed trigger events, so no
//! two consolidations run concurrently within one processor instance.
//! `trigger` never blocks: it enqueues or reports `QueueFull`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::{
    MemoryConfig, MemoryEntry, ProcessorEvent, ThresholdKind, TriggerKind,
};
use crate::services::context_monitor::ContextMonitor;
use crate::services::journal::Journal;

/// Association-count boost applied on top of the composite score during
/// selection: better-connected memories win ties.
fn association_boost(entry: &MemoryEntry) -> f64 {
    1.0 + 0.2 * (1.0 + entry.association_ids.len() as f64).ln()
}

/// Event handling state shared between the processor handle and its
/// worker task.
struct ProcessorCore {
    journal: Arc<Journal>,
    monitor: Arc<ContextMonitor>,
    memory_count_threshold: usize,
}

impl ProcessorCore {
    async fn handle_event(&self, event: ProcessorEvent) {
        debug!(trigger = %event.trigger, event_id = %event.id, "processing event");
        let result = match event.trigger {
            TriggerKind::ContextInit => self.handle_context_init(event).await,
            TriggerKind::NewContext => self.handle_new_context(event).await,
            TriggerKind::ThresholdReached => self.handle_threshold_reached(event).await,
            TriggerKind::ConversationEnd => self.handle_conversation_end(event).await,
        };
        if let Err(e) = result {
            warn!(error = %e, "event handling failed");
        }
    }

    /// Memories for an event: the caller's batch when present, otherwise a
    /// pull of recent episodic entries.
    async fn event_memories(
        &self,
        event: ProcessorEvent,
        pull: usize,
    ) -> MemoryResult<Vec<MemoryEntry>> {
        if event.memories.is_empty() {
            self.journal.get_memories(pull).await
        } else {
            Ok(event.memories)
        }
    }

    async fn handle_context_init(&self, event: ProcessorEvent) -> MemoryResult<()> {
        let memories = self
            .event_memories(event, self.memory_count_threshold)
            .await?;
        if memories.is_empty() {
            return Ok(());
        }
        if !self.monitor.can_proceed(&memories).await {
            info!("skipping context-init consolidation: over budget");
            return Ok(());
        }
        let selected = self.select_top(memories, self.memory_count_threshold);
        self.journal.consolidate(&selected).await
    }

    async fn handle_new_context(&self, event: ProcessorEvent) -> MemoryResult<()> {
        let memories = self
            .event_memories(event, self.memory_count_threshold * 2)
            .await?;
        if memories.len() < self.memory_count_threshold {
            debug!(
                available = memories.len(),
                threshold = self.memory_count_threshold,
                "skipping new-context consolidation: below threshold"
            );
            return Ok(());
        }
        if !self.monitor.can_proceed(&memories).await {
            info!("skipping new-context consolidation: over budget");
            return Ok(());
        }
        let selected = self.select_top(memories, self.memory_count_threshold);
        self.journal.consolidate(&selected).await
    }

    async fn handle_threshold_reached(&self, event: ProcessorEvent) -> MemoryResult<()> {
        let memories = self
            .event_memories(event, self.memory_count_threshold * 2)
            .await?;
        if memories.is_empty() {
            return Ok(());
        }
        if !self.monitor.can_proceed(&memories).await {
            info!("over budget at threshold: falling back to early consolidation");
            return self.early_consolidation().await;
        }
        let selected = self.select_top(memories, self.memory_count_threshold);
        self.journal.consolidate(&selected).await
    }

    async fn handle_conversation_end(&self, event: ProcessorEvent) -> MemoryResult<()> {
        let memories = self
            .event_memories(event, self.memory_count_threshold * 3)
            .await?;
        if memories.is_empty() {
            return Ok(());
        }
        // Final flush: the safety margin no longer applies
        let selected = self.select_top(memories, self.memory_count_threshold);
        self.journal.consolidate(&selected).await
    }

    /// Pressure-release path: a much smaller pull and selection so the
    /// consolidation prompt fits even when the context is nearly full.
    async fn early_consolidation(&self) -> MemoryResult<()> {
        let pull = (self.memory_count_threshold / 2).max(1);
        let take = (self.memory_count_threshold / 3).max(1);

        let memories = self.journal.get_memories(pull).await?;
        if memories.is_empty() {
            return Ok(());
        }
        let selected = self.select_top(memories, take);
        info!(selected = selected.len(), "early consolidation");
        self.journal.consolidate(&selected).await
    }

    /// Importance-ranked selection with the association-count boost.
    fn select_top(&self, mut memories: Vec<MemoryEntry>, take: usize) -> Vec<MemoryEntry> {
        let scorer = self.journal.scorer();
        let now = chrono::Utc::now();
        let mut ranked: Vec<(f64, MemoryEntry)> = memories
            .drain(..)
            .map(|entry| {
                let composite = scorer.score_at(&entry, now).composite_score;
                (composite * association_boost(&entry), entry)
            })
            .collect();
        ranked.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(take);
        ranked.into_iter().map(|(_, entry)| entry).collect()
    }
}

/// Event-driven consolidation orchestrator.
pub struct MemoryProcessor {
    core: Arc<ProcessorCore>,
    embedding_size_threshold: u64,
    context_usage_threshold: f64,
    queue_capacity: usize,
    running: AtomicBool,
    sender: Mutex<Option<mpsc::Sender<ProcessorEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryProcessor {
    pub fn new(journal: Arc<Journal>, monitor: Arc<ContextMonitor>, config: &MemoryConfig) -> Self {
        Self {
            core: Arc::new(ProcessorCore {
                journal,
                monitor,
                memory_count_threshold: config.memory_count_threshold,
            }),
            embedding_size_threshold: config.embedding_size_threshold,
            context_usage_threshold: config.context_usage_threshold,
            queue_capacity: config.queue_capacity,
            running: AtomicBool::new(false),
            sender: Mutex::new(None),
            worker: Mutex::new(None),
        }
    }

    /// Spawn the worker and start accepting triggers. Idempotent.
    pub async fn start(&self) -> MemoryResult<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        // A zero-capacity queue still needs a live channel; trigger
        // rejects before ever reaching it.
        let (tx, mut rx) = mpsc::channel(self.queue_capacity.max(1));
        *self.sender.lock().await = Some(tx);

        let core = Arc::clone(&self.core);
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                core.handle_event(event).await;
            }
            debug!("processor queue drained, worker exiting");
        });
        *self.worker.lock().await = Some(handle);
        info!("memory processor started");
        Ok(())
    }

    /// Stop accepting triggers, close the queue, and wait for the worker
    /// to drain what was already enqueued.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.sender.lock().await.take();
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "processor worker ended abnormally");
            }
        }
        info!("memory processor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Build an event for a trigger, snapshotting the context budget.
    pub async fn event(&self, trigger: TriggerKind) -> ProcessorEvent {
        ProcessorEvent::new(trigger, self.core.monitor.snapshot().await)
    }

    /// Enqueue an event without blocking.
    ///
    /// Returns `NotRunning` before `start` or after `stop`, and
    /// `QueueFull` when the queue is at capacity (always, for a
    /// zero-capacity queue).
    pub async fn trigger(&self, event: ProcessorEvent) -> MemoryResult<()> {
        if !self.is_running() {
            return Err(MemoryError::NotRunning);
        }
        if self.queue_capacity == 0 {
            return Err(MemoryError::QueueFull);
        }
        let sender = self.sender.lock().await;
        let Some(sender) = sender.as_ref() else {
            return Err(MemoryError::NotRunning);
        };
        sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MemoryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => MemoryError::NotRunning,
        })
    }

    /// Record the session's token usage on the shared monitor.
    pub async fn update_context_usage(&self, tokens: u64) {
        self.core.monitor.update_usage(tokens).await;
    }

    /// Which configured limit, if any, the current state has crossed.
    pub async fn exceeded_threshold(
        &self,
        episodic_count: u64,
        embedding_bytes: u64,
    ) -> Option<ThresholdKind> {
        if episodic_count >= self.core.memory_count_threshold as u64 {
            return Some(ThresholdKind::MemoryCount);
        }
        if embedding_bytes >= self.embedding_size_threshold {
            return Some(ThresholdKind::EmbeddingSize);
        }
        if self.core.monitor.usage_ratio().await >= self.context_usage_threshold {
            return Some(ThresholdKind::ContextUsage);
        }
        None
    }

    /// Importance-ranked selection of the configured batch size.
    pub fn select_for_consolidation(&self, memories: Vec<MemoryEntry>) -> Vec<MemoryEntry> {
        self.core
            .select_top(memories, self.core.memory_count_threshold)
    }

    /// Cluster memories by shared associations with a greedy union: two
    /// memories belong together when their association-id lists intersect
    /// or one references the other directly. Singleton groups are dropped.
    pub fn group_by_associations(memories: Vec<MemoryEntry>) -> Vec<Vec<MemoryEntry>> {
        let mut remaining: Vec<Option<MemoryEntry>> = memories.into_iter().map(Some).collect();
        let mut groups = Vec::new();

        for seed_index in 0..remaining.len() {
            let Some(seed) = remaining[seed_index].take() else {
                continue;
            };
            let mut group = vec![seed];

            for candidate_slot in remaining.iter_mut().skip(seed_index + 1) {
                let joins = candidate_slot.as_ref().is_some_and(|candidate| {
                    group
                        .iter()
                        .any(|member| Self::shares_association(member, candidate))
                });
                if joins {
                    if let Some(candidate) = candidate_slot.take() {
                        group.push(candidate);
                    }
                }
            }

            if group.len() > 1 {
                groups.push(group);
            }
        }
        groups
    }

    fn shares_association(a: &MemoryEntry, b: &MemoryEntry) -> bool {
        a.association_ids.iter().any(|id| b.association_ids.contains(id))
            || a.association_ids.contains(&b.id)
            || b.association_ids.contains(&a.id)
    }

    /// Group a candidate batch by shared associations and consolidate each
    /// multi-memory group separately. Returns the number of groups
    /// consolidated. Used by the request-facing consolidate surface.
    pub async fn consolidate_grouped(&self, memories: Vec<MemoryEntry>) -> MemoryResult<usize> {
        let groups = Self::group_by_associations(memories);
        let mut consolidated = 0;
        for group in groups {
            match self.core.journal.consolidate(&group).await {
                Ok(()) => consolidated += 1,
                Err(e) => warn!(error = %e, group_size = group.len(), "group consolidation failed"),
            }
        }
        Ok(consolidated)
    }
}
