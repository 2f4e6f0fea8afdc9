//! Deterministic importance scoring.
//!
//! Pure computation, no I/O. The composite score combines intrinsic
//! importance, exponential time decay, and log-scaled access frequency:
//!
//! ```text
//! composite = base_importance
//!           * (ln(1 + accesses) * w_access + relevance * w_relevance)
//!           * decay
//! ```
//!
//! Decay is floored at 0.01 so no memory becomes permanently unreachable.

use chrono::{DateTime, Utc};

use crate::domain::models::{
    MetadataValue, MemoryEntry, MemoryScore, META_ACCESS_COUNT,
};

/// Minimum decay factor.
const DECAY_FLOOR: f64 = 0.01;

/// Scoring parameters, taken from `MemoryConfig`.
#[derive(Debug, Clone)]
pub struct ScoringParams {
    /// Exponential decay rate per hour since last access
    pub decay_lambda: f64,
    /// Weight of access frequency in the composite
    pub access_weight: f64,
    /// Weight of relevance in the composite
    pub relevance_weight: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            decay_lambda: 0.01,
            access_weight: 0.3,
            relevance_weight: 0.7,
        }
    }
}

/// Stateless scorer shared across the journal and processor.
#[derive(Debug, Clone)]
pub struct MemoryScorer {
    params: ScoringParams,
}

impl MemoryScorer {
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }

    /// Compute the score as of now.
    pub fn score(&self, entry: &MemoryEntry) -> MemoryScore {
        self.score_at(entry, Utc::now())
    }

    /// Compute the score as of a fixed instant. Two calls with identical
    /// input produce identical output.
    pub fn score_at(&self, entry: &MemoryEntry, now: DateTime<Utc>) -> MemoryScore {
        let access_frequency = Self::resolve_access_frequency(entry);

        let hours_idle = (now - entry.accessed_at).num_seconds().max(0) as f64 / 3600.0;
        let decay_factor = (-self.params.decay_lambda * hours_idle).exp().max(DECAY_FLOOR);

        let length_bonus = 1.0 + 0.1 * (1.0 + entry.content.len() as f64 / 1000.0).ln();
        let base_importance =
            (entry.strength * entry.kind.importance_factor() * length_bonus).min(1.0);

        let relevance_score = entry.strength;
        let normalized_access = (1.0 + f64::from(access_frequency)).ln();

        let composite_score = base_importance
            * (normalized_access * self.params.access_weight
                + relevance_score * self.params.relevance_weight)
            * decay_factor;

        MemoryScore {
            base_importance,
            decay_factor,
            access_frequency,
            last_accessed: entry.accessed_at,
            relevance_score,
            composite_score,
        }
    }

    /// Record an access: bump the counter, stamp the timestamps, mirror the
    /// counter to metadata, and recompute the score. Persistence is the
    /// caller's job.
    pub fn update_access(&self, entry: &mut MemoryEntry) {
        let now = Utc::now();
        let next = Self::resolve_access_frequency(entry) + 1;

        entry.accessed_at = now;
        entry.score.access_frequency = next;
        entry.metadata.insert(
            META_ACCESS_COUNT.to_string(),
            MetadataValue::Int(i64::from(next)),
        );
        entry.score = self.score_at(entry, now);
    }

    /// Top `n` entries by composite score, stably sorted descending.
    pub fn top_n(&self, mut entries: Vec<MemoryEntry>, n: usize) -> Vec<MemoryEntry> {
        let now = Utc::now();
        for entry in &mut entries {
            entry.score = self.score_at(entry, now);
        }
        entries.sort_by(|a, b| {
            b.score
                .composite_score
                .partial_cmp(&a.score.composite_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        entries.truncate(n);
        entries
    }

    /// Access count resolution: the live counter when positive, else the
    /// legacy metadata mirror, else 1.
    fn resolve_access_frequency(entry: &MemoryEntry) -> u32 {
        if entry.score.access_frequency > 0 {
            return entry.score.access_frequency;
        }
        entry
            .metadata
            .get(META_ACCESS_COUNT)
            .and_then(MetadataValue::as_int)
            .filter(|&count| count > 0)
            .map_or(1, |count| count as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn scorer() -> MemoryScorer {
        MemoryScorer::new(ScoringParams::default())
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let entry = MemoryEntry::episodic("test", "some content");
        let now = Utc::now();
        let a = scorer().score_at(&entry, now);
        let b = scorer().score_at(&entry, now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_bounds() {
        let entry = MemoryEntry::episodic("test", "x".repeat(50_000));
        let score = scorer().score_at(&entry, Utc::now());
        assert!(score.base_importance <= 1.0);
        assert!(score.base_importance >= 0.0);
        assert!(score.decay_factor >= DECAY_FLOOR);
        assert!(score.decay_factor <= 1.0);
        assert!(score.composite_score >= 0.0);
    }

    #[test]
    fn test_decay_floor_holds_for_ancient_memories() {
        let past = Utc::now() - Duration::days(365 * 10);
        let entry = MemoryEntry::episodic("test", "old").with_timestamps(past, past);
        let score = scorer().score_at(&entry, Utc::now());
        assert!((score.decay_factor - DECAY_FLOOR).abs() < f64::EPSILON);
        assert!(score.composite_score > 0.0, "floored decay keeps memories reachable");
    }

    #[test]
    fn test_fresh_memory_has_no_decay() {
        let entry = MemoryEntry::episodic("test", "fresh");
        let score = scorer().score_at(&entry, entry.accessed_at);
        assert!((score.decay_factor - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_semantic_outscores_episodic() {
        let now = Utc::now();
        let episodic = MemoryEntry::episodic("test", "content").with_timestamps(now, now);
        let mut semantic = MemoryEntry::semantic("test", "content").with_timestamps(now, now);
        semantic.id = episodic.id;

        let s = scorer();
        assert!(
            s.score_at(&semantic, now).composite_score
                > s.score_at(&episodic, now).composite_score
        );
    }

    #[test]
    fn test_longer_content_scores_higher() {
        let now = Utc::now();
        let short = MemoryEntry::episodic("test", "x").with_timestamps(now, now);
        let long = MemoryEntry::episodic("test", "x".repeat(3000)).with_timestamps(now, now);

        let s = scorer();
        assert!(
            s.score_at(&long, now).base_importance > s.score_at(&short, now).base_importance
        );
    }

    #[test]
    fn test_update_access_increments_by_one() {
        let mut entry = MemoryEntry::episodic("test", "content");
        let before = entry.score.access_frequency;
        let before_time = Utc::now();

        scorer().update_access(&mut entry);

        assert_eq!(entry.score.access_frequency, before + 1);
        assert!(entry.accessed_at >= before_time);
        assert_eq!(
            entry.metadata.get(META_ACCESS_COUNT).and_then(MetadataValue::as_int),
            Some(i64::from(before + 1))
        );
    }

    #[test]
    fn test_update_access_seeds_from_legacy_metadata() {
        let mut entry = MemoryEntry::episodic("test", "content");
        entry.score.access_frequency = 0;
        entry
            .metadata
            .insert(META_ACCESS_COUNT.to_string(), MetadataValue::Int(9));

        scorer().update_access(&mut entry);
        assert_eq!(entry.score.access_frequency, 10);
    }

    #[test]
    fn test_access_frequency_defaults_to_one() {
        let mut entry = MemoryEntry::episodic("test", "content");
        entry.score.access_frequency = 0;
        entry.metadata.remove(META_ACCESS_COUNT);
        let score = scorer().score_at(&entry, Utc::now());
        assert_eq!(score.access_frequency, 1);
    }

    #[test]
    fn test_top_n_orders_and_truncates() {
        let now = Utc::now();
        let weak = {
            let past = now - Duration::days(30);
            MemoryEntry::episodic("test", "weak").with_timestamps(past, past)
        };
        let strong = MemoryEntry::episodic("test", "strong").with_timestamps(now, now);
        let mid = {
            let past = now - Duration::days(3);
            MemoryEntry::episodic("test", "mid").with_timestamps(past, past)
        };

        let top = scorer().top_n(vec![weak.clone(), strong.clone(), mid.clone()], 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, strong.id);
        assert_eq!(top[1].id, mid.id);
    }

    #[test]
    fn test_top_n_with_n_larger_than_input() {
        let entries = vec![MemoryEntry::episodic("test", "only")];
        let top = scorer().top_n(entries, 10);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_kind_factor_applied_before_clamp() {
        // Weak memories still rank by kind even after the clamp on strong ones
        let now = Utc::now();
        let mut weak_episodic = MemoryEntry::episodic("test", "content").with_timestamps(now, now);
        weak_episodic.strength = 0.4;
        let mut weak_semantic = MemoryEntry::semantic("test", "content").with_timestamps(now, now);
        weak_semantic.strength = 0.4;

        let s = scorer();
        let episodic_base = s.score_at(&weak_episodic, now).base_importance;
        let semantic_base = s.score_at(&weak_semantic, now).base_importance;
        assert!(semantic_base > episodic_base);
        assert!((semantic_base / episodic_base - 1.5).abs() < 1e-9);
    }
}
