//! Shared test fixtures: scripted model providers and journal wiring.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Duration;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use engram::adapters::memory::{InMemoryAssociationStore, InMemoryMemoryStore};
use engram::domain::errors::{MemoryError, MemoryResult};
use engram::domain::models::JournalConfig;
use engram::domain::ports::{Embedder, Summarizer};
use engram::services::{
    AssociationAnalyzer, AssociationTracker, Journal, MemoryScorer, ScoringParams,
};

pub const TEST_DIMENSION: usize = 8;

/// Deterministic embedder: identical text always embeds to the identical
/// vector, so self-similarity queries rank exactly.
pub struct ScriptedEmbedder {
    dimension: usize,
    fail: AtomicBool,
    calls: AtomicU32,
}

impl ScriptedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: AtomicBool::new(false),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The vector this embedder produces for a text.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        // Simple seeded generator over the text bytes
        let mut state: u64 = 0x9E37_79B9;
        for byte in text.bytes() {
            state = state.wrapping_mul(31).wrapping_add(u64::from(byte));
        }
        (0..self.dimension)
            .map(|i| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                // Keep components positive so norms never vanish
                0.1 + ((state >> 33) % 1000) as f32 / 1000.0 + i as f32 * 0.001
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> MemoryResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(MemoryError::EmbedderUnavailable(
                "scripted outage".to_string(),
            ));
        }
        Ok(self.vector_for(text))
    }

    async fn health(&self) -> MemoryResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(MemoryError::EmbedderUnavailable(
                "scripted outage".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

/// Summarizer that records every batch it is handed.
pub struct ScriptedSummarizer {
    fail: AtomicBool,
    batches: Mutex<Vec<usize>>,
}

impl ScriptedSummarizer {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Sizes of the batches consolidated so far, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn consolidate(&self, texts: &[String]) -> MemoryResult<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MemoryError::SummarizerFailed("scripted outage".to_string()));
        }
        self.batches.lock().unwrap().push(texts.len());
        Ok(format!("Consolidated knowledge from {} memories", texts.len()))
    }

    async fn health(&self) -> MemoryResult<()> {
        Ok(())
    }
}

/// Everything a test needs to drive the journal.
pub struct TestHarness {
    pub journal: Arc<Journal>,
    pub memory_store: Arc<InMemoryMemoryStore>,
    pub association_store: Arc<InMemoryAssociationStore>,
    pub tracker: Arc<AssociationTracker>,
    pub embedder: Arc<ScriptedEmbedder>,
    pub summarizer: Arc<ScriptedSummarizer>,
}

pub fn build_harness(journal_config: JournalConfig) -> TestHarness {
    let memory_store = Arc::new(InMemoryMemoryStore::new(TEST_DIMENSION));
    let association_store = Arc::new(InMemoryAssociationStore::new());
    let tracker = Arc::new(AssociationTracker::new(association_store.clone()));
    let embedder = Arc::new(ScriptedEmbedder::new(TEST_DIMENSION));
    let summarizer = Arc::new(ScriptedSummarizer::new());

    let journal = Arc::new(Journal::new(
        journal_config,
        memory_store.clone(),
        tracker.clone(),
        embedder.clone(),
        summarizer.clone(),
        MemoryScorer::new(ScoringParams::default()),
        AssociationAnalyzer::new(Duration::hours(1), 0.8),
    ));

    TestHarness {
        journal,
        memory_store,
        association_store,
        tracker,
        embedder,
        summarizer,
    }
}

pub fn default_harness() -> TestHarness {
    build_harness(JournalConfig::default())
}

/// Poll an async condition until it holds or the timeout elapses.
pub async fn wait_until<F, Fut>(timeout_ms: u64, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
    loop {
        if condition().await {
            return true;
        }
        if std::time::Instant::now() > deadline {
            return false;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
}
