//! Context budget guard for consolidation.
//!
//! Tracks how many tokens the current session context holds and decides
//! whether a batch of memories fits under the summarizer's window with
//! the configured safety margin to spare.

use tokio::sync::RwLock;

use crate::domain::models::{ContextSnapshot, MemoryEntry};

/// Fixed overhead added to every consolidation prompt estimate.
const PROMPT_OVERHEAD: u64 = 1000;

/// Shared token budget monitor.
pub struct ContextMonitor {
    max_tokens: u64,
    safety_margin: f64,
    current_tokens: RwLock<u64>,
}

impl ContextMonitor {
    pub fn new(max_tokens: u64, safety_margin: f64) -> Self {
        Self {
            max_tokens,
            safety_margin,
            current_tokens: RwLock::new(0),
        }
    }

    /// Estimated cost of consolidating a batch: total content length plus
    /// the prompt overhead.
    pub fn estimate_cost(memories: &[MemoryEntry]) -> u64 {
        memories.iter().map(|m| m.content.len() as u64).sum::<u64>() + PROMPT_OVERHEAD
    }

    /// Whether the batch fits under `max_tokens * safety_margin` on top of
    /// current usage.
    pub async fn can_proceed(&self, memories: &[MemoryEntry]) -> bool {
        let current = *self.current_tokens.read().await;
        let cost = Self::estimate_cost(memories);
        (current + cost) as f64 <= self.max_tokens as f64 * self.safety_margin
    }

    /// Record the session's current token usage. Safe from any task.
    pub async fn update_usage(&self, tokens: u64) {
        let mut current = self.current_tokens.write().await;
        *current = tokens;
    }

    /// Current usage as a fraction of the configured budget.
    pub async fn usage_ratio(&self) -> f64 {
        let current = *self.current_tokens.read().await;
        if self.max_tokens == 0 {
            return 0.0;
        }
        current as f64 / self.max_tokens as f64
    }

    /// Point-in-time snapshot for event envelopes.
    pub async fn snapshot(&self) -> ContextSnapshot {
        let current = *self.current_tokens.read().await;
        ContextSnapshot::new(current, self.max_tokens)
    }
}
