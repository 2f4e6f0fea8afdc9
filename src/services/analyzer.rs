//! Association analyzer.
//!
//! Derives typed edges between a newly captured memory and a window of
//! recent candidates. Three independent passes (temporal, semantic,
//! contextual) that share no state and may run in any order.

use chrono::{Duration, Utc};

use crate::domain::models::{
    AssociationKind, Metadata, MetadataValue, MemoryAssociation, MemoryEntry,
};

/// Cosine similarity between two vectors.
///
/// Returns 0 when either norm is zero or the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += f64::from(x) * f64::from(y);
        norm_a += f64::from(x) * f64::from(x);
        norm_b += f64::from(y) * f64::from(y);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Analyzer with the thresholds the journal configures.
#[derive(Debug, Clone)]
pub struct AssociationAnalyzer {
    /// Window for the temporal pass
    temporal_window: Duration,
    /// Minimum cosine similarity for the semantic pass
    semantic_threshold: f64,
}

/// Fixed strength of contextual (shared-source) edges.
const CONTEXTUAL_STRENGTH: f64 = 0.7;

/// Floor for temporal edge strength inside the window.
const TEMPORAL_STRENGTH_FLOOR: f64 = 0.1;

impl Default for AssociationAnalyzer {
    fn default() -> Self {
        Self {
            temporal_window: Duration::hours(1),
            semantic_threshold: 0.8,
        }
    }
}

impl AssociationAnalyzer {
    pub fn new(temporal_window: Duration, semantic_threshold: f64) -> Self {
        Self {
            temporal_window,
            semantic_threshold,
        }
    }

    /// Run all three passes and collect the produced edges.
    pub fn analyze(
        &self,
        entry: &MemoryEntry,
        candidates: &[MemoryEntry],
    ) -> Vec<MemoryAssociation> {
        let mut associations = self.temporal(entry, candidates);
        associations.extend(self.semantic(entry, candidates));
        associations.extend(self.contextual(entry, candidates));
        associations
    }

    /// Temporal pass: candidates captured within the window are linked
    /// with strength falling linearly from 1 toward the floor.
    pub fn temporal(
        &self,
        entry: &MemoryEntry,
        candidates: &[MemoryEntry],
    ) -> Vec<MemoryAssociation> {
        let window_seconds = self.temporal_window.num_seconds();
        if window_seconds <= 0 {
            return Vec::new();
        }
        let now = Utc::now().timestamp();

        candidates
            .iter()
            .filter(|candidate| candidate.id != entry.id)
            .filter_map(|candidate| {
                let delta = (entry.created_at - candidate.created_at).num_seconds().abs();
                if delta > window_seconds {
                    return None;
                }
                let strength = (1.0 - delta as f64 / window_seconds as f64)
                    .max(TEMPORAL_STRENGTH_FLOOR);
                let mut metadata = Metadata::new();
                metadata.insert(
                    "time_diff_minutes".to_string(),
                    MetadataValue::Int(delta / 60),
                );
                metadata.insert("created_at".to_string(), MetadataValue::Int(now));
                Some(
                    MemoryAssociation::new(
                        entry.id,
                        candidate.id,
                        AssociationKind::Temporal,
                        strength,
                    )
                    .with_metadata(metadata),
                )
            })
            .collect()
    }

    /// Semantic pass: candidates whose embedding is close enough in cosine
    /// space are linked with the similarity as strength. Missing or
    /// mismatched embeddings produce no edge.
    pub fn semantic(
        &self,
        entry: &MemoryEntry,
        candidates: &[MemoryEntry],
    ) -> Vec<MemoryAssociation> {
        if entry.embedding.is_empty() {
            return Vec::new();
        }
        let now = Utc::now().timestamp();

        candidates
            .iter()
            .filter(|candidate| candidate.id != entry.id)
            .filter(|candidate| candidate.embedding.len() == entry.embedding.len())
            .filter(|candidate| !candidate.embedding.is_empty())
            .filter_map(|candidate| {
                let similarity = cosine_similarity(&entry.embedding, &candidate.embedding);
                if similarity < self.semantic_threshold {
                    return None;
                }
                let mut metadata = Metadata::new();
                metadata.insert(
                    "similarity_score".to_string(),
                    MetadataValue::Float(similarity),
                );
                metadata.insert("created_at".to_string(), MetadataValue::Int(now));
                Some(
                    MemoryAssociation::new(
                        entry.id,
                        candidate.id,
                        AssociationKind::Semantic,
                        similarity,
                    )
                    .with_metadata(metadata),
                )
            })
            .collect()
    }

    /// Contextual pass: candidates sharing the entry's `source` metadata
    /// are linked at fixed strength.
    pub fn contextual(
        &self,
        entry: &MemoryEntry,
        candidates: &[MemoryEntry],
    ) -> Vec<MemoryAssociation> {
        let Some(source) = entry.source() else {
            return Vec::new();
        };
        let now = Utc::now().timestamp();

        candidates
            .iter()
            .filter(|candidate| candidate.id != entry.id)
            .filter(|candidate| candidate.source() == Some(source))
            .map(|candidate| {
                let mut metadata = Metadata::new();
                metadata.insert(
                    "shared_context".to_string(),
                    MetadataValue::Str(source.to_string()),
                );
                metadata.insert("created_at".to_string(), MetadataValue::Int(now));
                MemoryAssociation::new(
                    entry.id,
                    candidate.id,
                    AssociationKind::Contextual,
                    CONTEXTUAL_STRENGTH,
                )
                .with_metadata(metadata)
            })
            .collect()
    }
}
