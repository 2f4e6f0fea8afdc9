//! Processor event model.
//!
//! Consolidation is driven by typed events flowing through the memory
//! processor's bounded queue. Each event carries its trigger, an optional
//! memory batch supplied by the caller, and a snapshot of the context
//! budget at emission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::memory::MemoryEntry;

/// What caused a consolidation event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Session restart: fold surviving episodic memories forward
    ContextInit,
    /// A new conversational turn arrived
    NewContext,
    /// A configured threshold was crossed
    ThresholdReached,
    /// Session is ending: final flush
    ConversationEnd,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContextInit => "context_init",
            Self::NewContext => "new_context",
            Self::ThresholdReached => "threshold_reached",
            Self::ConversationEnd => "conversation_end",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which configured limit tripped a `ThresholdReached` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    /// Stored episodic count crossed `memory_count_threshold`
    MemoryCount,
    /// Accumulated embedding payload crossed `embedding_size_threshold` bytes
    EmbeddingSize,
    /// Context usage ratio crossed `context_usage_threshold`
    ContextUsage,
}

/// Snapshot of the context budget at event emission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Tokens currently in use
    pub current_tokens: u64,
    /// Configured budget ceiling
    pub max_tokens: u64,
}

impl ContextSnapshot {
    pub fn new(current_tokens: u64, max_tokens: u64) -> Self {
        Self {
            current_tokens,
            max_tokens,
        }
    }

    /// Fraction of the budget in use; 0 when no budget is configured.
    pub fn usage_ratio(&self) -> f64 {
        if self.max_tokens == 0 {
            return 0.0;
        }
        self.current_tokens as f64 / self.max_tokens as f64
    }
}

/// An event enqueued on the memory processor.
#[derive(Debug, Clone)]
pub struct ProcessorEvent {
    /// Unique event id, for log correlation
    pub id: Uuid,
    /// What caused the event
    pub trigger: TriggerKind,
    /// Memories handed in by the caller; the processor pulls its own
    /// candidates when this is empty
    pub memories: Vec<MemoryEntry>,
    /// Context budget at emission time
    pub context: ContextSnapshot,
    /// When the event was emitted
    pub timestamp: DateTime<Utc>,
}

impl ProcessorEvent {
    pub fn new(trigger: TriggerKind, context: ContextSnapshot) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger,
            memories: Vec::new(),
            context,
            timestamp: Utc::now(),
        }
    }

    /// Attach an explicit memory batch.
    pub fn with_memories(mut self, memories: Vec<MemoryEntry>) -> Self {
        self.memories = memories;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_display() {
        assert_eq!(TriggerKind::ContextInit.to_string(), "context_init");
        assert_eq!(
            TriggerKind::ConversationEnd.to_string(),
            "conversation_end"
        );
    }

    #[test]
    fn test_usage_ratio() {
        let snapshot = ContextSnapshot::new(500, 1000);
        assert!((snapshot.usage_ratio() - 0.5).abs() < f64::EPSILON);

        let empty = ContextSnapshot::new(100, 0);
        assert!(empty.usage_ratio().abs() < f64::EPSILON);
    }

    #[test]
    fn test_event_carries_batch() {
        let event = ProcessorEvent::new(TriggerKind::NewContext, ContextSnapshot::new(0, 1000))
            .with_memories(vec![MemoryEntry::episodic("test", "content")]);
        assert_eq!(event.memories.len(), 1);
        assert_eq!(event.trigger, TriggerKind::NewContext);
    }
}
