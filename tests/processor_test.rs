//! Processor integration tests: lifecycle, backpressure, and the
//! budget-aware consolidation paths.

mod common;

use std::sync::Arc;

use engram::domain::errors::MemoryError;
use engram::domain::models::{
    ContextSnapshot, Metadata, MemoryConfig, MemoryKind, ProcessorEvent, ThresholdKind,
    TriggerKind,
};
use engram::domain::ports::MemoryStore;
use engram::services::{ContextMonitor, MemoryProcessor};

use common::{default_harness, wait_until, TestHarness};

fn processor_with(
    harness: &TestHarness,
    config: &MemoryConfig,
) -> (Arc<MemoryProcessor>, Arc<ContextMonitor>) {
    let monitor = Arc::new(ContextMonitor::new(
        config.max_tokens,
        config.safety_margin,
    ));
    let processor = Arc::new(MemoryProcessor::new(
        harness.journal.clone(),
        monitor.clone(),
        config,
    ));
    (processor, monitor)
}

fn test_config() -> MemoryConfig {
    MemoryConfig {
        max_tokens: 100_000,
        safety_margin: 0.8,
        memory_count_threshold: 3,
        queue_capacity: 10,
        ..MemoryConfig::default()
    }
}

#[tokio::test]
async fn test_trigger_before_start_is_not_running() {
    let harness = default_harness();
    let (processor, _) = processor_with(&harness, &test_config());

    let event = ProcessorEvent::new(TriggerKind::NewContext, ContextSnapshot::new(0, 1000));
    let err = processor.trigger(event).await.unwrap_err();
    assert!(matches!(err, MemoryError::NotRunning));
}

#[tokio::test]
async fn test_trigger_after_stop_is_not_running() {
    let harness = default_harness();
    let (processor, _) = processor_with(&harness, &test_config());

    processor.start().await.unwrap();
    processor.stop().await;

    let event = processor.event(TriggerKind::NewContext).await;
    let err = processor.trigger(event).await.unwrap_err();
    assert!(matches!(err, MemoryError::NotRunning));
}

#[tokio::test]
async fn test_start_is_idempotent() {
    let harness = default_harness();
    let (processor, _) = processor_with(&harness, &test_config());

    processor.start().await.unwrap();
    processor.start().await.unwrap();
    assert!(processor.is_running());
    processor.stop().await;
    assert!(!processor.is_running());
}

#[tokio::test]
async fn test_zero_capacity_queue_always_full() {
    let harness = default_harness();
    let config = MemoryConfig {
        queue_capacity: 0,
        ..test_config()
    };
    let (processor, _) = processor_with(&harness, &config);
    processor.start().await.unwrap();

    for _ in 0..3 {
        let event = processor.event(TriggerKind::NewContext).await;
        let err = processor.trigger(event).await.unwrap_err();
        assert!(matches!(err, MemoryError::QueueFull));
    }
    processor.stop().await;
}

#[tokio::test]
async fn test_conversation_end_flushes_before_stop_returns() {
    let harness = default_harness();
    let (processor, _) = processor_with(&harness, &test_config());
    processor.start().await.unwrap();

    for i in 0..4 {
        harness
            .journal
            .capture("session", format!("event {i}").as_str(), Metadata::new())
            .await
            .unwrap();
    }

    let event = processor.event(TriggerKind::ConversationEnd).await;
    processor.trigger(event).await.unwrap();
    // stop drains the queue, so the consolidation has happened by now
    processor.stop().await;

    assert_eq!(harness.summarizer.call_count(), 1);
    let stats = harness.journal.memory_stats().await.unwrap();
    assert_eq!(stats.count_for(MemoryKind::Semantic), 1);
}

#[tokio::test]
async fn test_new_context_skips_below_threshold() {
    let harness = default_harness();
    let (processor, _) = processor_with(&harness, &test_config());
    processor.start().await.unwrap();

    // Two memories, threshold three
    for i in 0..2 {
        harness
            .journal
            .capture("session", format!("event {i}").as_str(), Metadata::new())
            .await
            .unwrap();
    }

    let event = processor.event(TriggerKind::NewContext).await;
    processor.trigger(event).await.unwrap();
    processor.stop().await;

    assert_eq!(harness.summarizer.call_count(), 0);
}

#[tokio::test]
async fn test_new_context_consolidates_at_threshold() {
    let harness = default_harness();
    let (processor, _) = processor_with(&harness, &test_config());
    processor.start().await.unwrap();

    for i in 0..5 {
        harness
            .journal
            .capture("session", format!("event {i}").as_str(), Metadata::new())
            .await
            .unwrap();
    }

    let event = processor.event(TriggerKind::NewContext).await;
    processor.trigger(event).await.unwrap();
    processor.stop().await;

    assert_eq!(harness.summarizer.call_count(), 1);
    // Selection is capped at the threshold
    assert!(harness.summarizer.batch_sizes()[0] <= 3);
}

#[tokio::test]
async fn test_threshold_over_budget_falls_back_to_early_consolidation() {
    let harness = default_harness();
    // Tight budget: max 1000 tokens, half usable, 400 already used
    let config = MemoryConfig {
        max_tokens: 1000,
        safety_margin: 0.5,
        memory_count_threshold: 9,
        queue_capacity: 10,
        ..MemoryConfig::default()
    };
    let (processor, monitor) = processor_with(&harness, &config);
    monitor.update_usage(400).await;
    processor.start().await.unwrap();

    // Twenty 200-char memories: estimated cost 4000 + 1000 overhead,
    // far over the 500-token safe limit
    let mut batch = Vec::new();
    for i in 0..20 {
        let entry = harness
            .journal
            .capture("session", format!("{i:0>200}").as_str(), Metadata::new())
            .await
            .unwrap();
        batch.push(entry);
    }

    let event = processor
        .event(TriggerKind::ThresholdReached)
        .await
        .with_memories(batch);
    processor.trigger(event).await.unwrap();
    processor.stop().await;

    // The oversized batch was never consolidated; the pressure-release
    // path ran once with at most threshold/3 memories
    let sizes = harness.summarizer.batch_sizes();
    assert_eq!(sizes.len(), 1);
    assert!(
        sizes[0] <= 3,
        "early consolidation must select at most a third of the threshold"
    );
}

#[tokio::test]
async fn test_context_init_skips_when_over_budget() {
    let harness = default_harness();
    let config = MemoryConfig {
        max_tokens: 100,
        safety_margin: 0.5,
        memory_count_threshold: 3,
        queue_capacity: 10,
        ..MemoryConfig::default()
    };
    let (processor, _) = processor_with(&harness, &config);
    processor.start().await.unwrap();

    harness
        .journal
        .capture("session", "survivor from the previous session", Metadata::new())
        .await
        .unwrap();

    let event = processor.event(TriggerKind::ContextInit).await;
    processor.trigger(event).await.unwrap();
    processor.stop().await;

    // Budget can never fit the 1000-token prompt overhead: silently skipped
    assert_eq!(harness.summarizer.call_count(), 0);
}

#[tokio::test]
async fn test_queue_overflow_reports_full() {
    let harness = default_harness();
    let config = MemoryConfig {
        queue_capacity: 1,
        ..test_config()
    };
    let (processor, _) = processor_with(&harness, &config);
    processor.start().await.unwrap();

    // Hold the worker on a slow pull by not capturing anything; events
    // drain fast, so race-free overflow needs a filled queue first
    let mut saw_full = false;
    for _ in 0..50 {
        let event = processor.event(TriggerKind::NewContext).await;
        match processor.trigger(event).await {
            Err(MemoryError::QueueFull) => {
                saw_full = true;
                break;
            }
            Ok(()) | Err(_) => {}
        }
    }
    processor.stop().await;
    assert!(saw_full, "a capacity-1 queue under burst load must overflow");
}

#[tokio::test]
async fn test_update_context_usage_is_shared() {
    let harness = default_harness();
    let (processor, monitor) = processor_with(&harness, &test_config());

    processor.update_context_usage(5000).await;
    let snapshot = monitor.snapshot().await;
    assert_eq!(snapshot.current_tokens, 5000);
}

#[tokio::test]
async fn test_exceeded_threshold_detection() {
    let harness = default_harness();
    let config = MemoryConfig {
        memory_count_threshold: 10,
        embedding_size_threshold: 1_000_000,
        context_usage_threshold: 0.9,
        ..test_config()
    };
    let (processor, _) = processor_with(&harness, &config);

    assert_eq!(processor.exceeded_threshold(3, 100).await, None);
    assert_eq!(
        processor.exceeded_threshold(10, 100).await,
        Some(ThresholdKind::MemoryCount)
    );
    assert_eq!(
        processor.exceeded_threshold(3, 2_000_000).await,
        Some(ThresholdKind::EmbeddingSize)
    );

    processor.update_context_usage(95_000).await;
    assert_eq!(
        processor.exceeded_threshold(3, 100).await,
        Some(ThresholdKind::ContextUsage)
    );
}

#[tokio::test]
async fn test_events_handled_in_enqueue_order() {
    let harness = default_harness();
    let (processor, _) = processor_with(&harness, &test_config());
    processor.start().await.unwrap();

    for i in 0..5 {
        harness
            .journal
            .capture("session", format!("event {i}").as_str(), Metadata::new())
            .await
            .unwrap();
    }

    // Both events consolidate; the single worker runs them sequentially
    let first = processor.event(TriggerKind::ConversationEnd).await;
    let second = processor.event(TriggerKind::ConversationEnd).await;
    processor.trigger(first).await.unwrap();
    processor.trigger(second).await.unwrap();
    processor.stop().await;

    assert_eq!(harness.summarizer.call_count(), 2);
}

#[tokio::test]
async fn test_consolidate_grouped_handles_each_group() {
    let harness = default_harness();
    let (processor, _) = processor_with(&harness, &test_config());

    // Two same-source captures form a contextual edge and thus one group
    let a = harness
        .journal
        .capture("groupA", "first", Metadata::new())
        .await
        .unwrap();
    harness
        .journal
        .capture("groupA", "second", Metadata::new())
        .await
        .unwrap();

    let settled = wait_until(2000, || async {
        harness
            .memory_store
            .retrieve(MemoryKind::Episodic, a.id)
            .await
            .map(|e| !e.association_ids.is_empty())
            .unwrap_or(false)
    })
    .await;
    assert!(settled);

    let memories = harness.journal.get_memories(10).await.unwrap();
    let groups = processor.consolidate_grouped(memories).await.unwrap();
    assert_eq!(groups, 1);
    assert_eq!(harness.summarizer.call_count(), 1);
}
