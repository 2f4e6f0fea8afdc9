//! Association domain model.
//!
//! Associations are directed, typed, strength-weighted edges between two
//! memory ids, produced automatically by the analyzer. They live in their
//! own store and are looked up bidirectionally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::memory::Metadata;

/// Kind of relationship between two memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationKind {
    /// Captured close together in time
    Temporal,
    /// Similar embedding content
    Semantic,
    /// One led to the other (reserved; no analyzer pass emits it yet)
    Causal,
    /// Shared capture context
    Contextual,
}

impl AssociationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Temporal => "temporal",
            Self::Semantic => "semantic",
            Self::Causal => "causal",
            Self::Contextual => "contextual",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "temporal" => Some(Self::Temporal),
            "semantic" => Some(Self::Semantic),
            "causal" => Some(Self::Causal),
            "contextual" => Some(Self::Contextual),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge between two memory entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAssociation {
    /// Unique identifier
    pub id: Uuid,
    /// Memory the edge starts from
    pub source_id: Uuid,
    /// Memory the edge points to
    pub target_id: Uuid,
    /// Relationship kind
    pub kind: AssociationKind,
    /// Edge strength in [0, 1]
    pub strength: f64,
    /// When the edge was created
    pub created_at: DateTime<Utc>,
    /// When the edge was last adjusted
    pub updated_at: DateTime<Utc>,
    /// Pass-specific details (time delta, similarity, shared context)
    pub metadata: Metadata,
}

impl MemoryAssociation {
    /// Create an edge between two distinct memories. Strength is clamped
    /// into [0, 1].
    pub fn new(source_id: Uuid, target_id: Uuid, kind: AssociationKind, strength: f64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            source_id,
            target_id,
            kind,
            strength: strength.clamp(0.0, 1.0),
            created_at: now,
            updated_at: now,
            metadata: Metadata::new(),
        }
    }

    /// Attach pass-specific metadata.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether this edge touches the given memory on either end.
    pub fn touches(&self, memory_id: Uuid) -> bool {
        self.source_id == memory_id || self.target_id == memory_id
    }

    /// The opposite endpoint, if the given memory is one of the two.
    pub fn other_endpoint(&self, memory_id: Uuid) -> Option<Uuid> {
        if self.source_id == memory_id {
            Some(self.target_id)
        } else if self.target_id == memory_id {
            Some(self.source_id)
        } else {
            None
        }
    }

    /// Adjust strength in place, clamping into [0, 1].
    pub fn set_strength(&mut self, strength: f64) {
        self.strength = strength.clamp(0.0, 1.0);
        self.updated_at = Utc::now();
    }

    /// Validate the distinct-endpoint invariant and strength range.
    pub fn validate(&self) -> Result<(), String> {
        if self.source_id == self.target_id {
            return Err(format!(
                "Association endpoints must be distinct: {}",
                self.source_id
            ));
        }
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(format!("Association strength out of range: {}", self.strength));
        }
        Ok(())
    }
}
