//! Memory domain model.
//!
//! Typed memory entries flowing through the capture → associate →
//! consolidate lifecycle:
//! - Episodic: raw time-stamped capture of a single context event
//! - Semantic: consolidated knowledge synthesized from episodic traces
//! - Procedural: learned how-to knowledge
//! - Metacognitive: knowledge about the system's own reasoning

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Metadata key that every entry carries: where the memory came from.
pub const META_SOURCE: &str = "source";
/// Metadata key for the unix timestamp of capture.
pub const META_CAPTURED_AT: &str = "captured_at";
/// Legacy metadata key mirroring the access counter.
pub const META_ACCESS_COUNT: &str = "access_count";

/// Memory kind classification. Each kind lives in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Raw capture of a single context event
    Episodic,
    /// Consolidated, synthesized knowledge
    Semantic,
    /// Learned procedures and skills
    Procedural,
    /// Self-referential knowledge about reasoning
    Metacognitive,
}

impl MemoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
            Self::Metacognitive => "metacognitive",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "episodic" => Some(Self::Episodic),
            "semantic" => Some(Self::Semantic),
            "procedural" => Some(Self::Procedural),
            "metacognitive" => Some(Self::Metacognitive),
            _ => None,
        }
    }

    /// All kinds, in collection-initialization order.
    pub fn all() -> [MemoryKind; 4] {
        [
            Self::Episodic,
            Self::Semantic,
            Self::Procedural,
            Self::Metacognitive,
        ]
    }

    /// Importance multiplier applied by the scorer. Consolidated knowledge
    /// outweighs raw captures.
    pub fn importance_factor(&self) -> f64 {
        match self {
            Self::Semantic => 1.5,
            Self::Metacognitive => 1.4,
            Self::Procedural => 1.3,
            Self::Episodic => 1.0,
        }
    }
}

impl std::fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A primitive metadata value.
///
/// Metadata is restricted to primitives so every backend can index it.
/// Anything else arriving from the outside is coerced to a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetadataValue {
    /// Coerce an arbitrary JSON value into a metadata primitive.
    ///
    /// Null maps to None; arrays and objects are stringified.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i))
                } else {
                    n.as_f64().map(Self::Float)
                }
            }
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            other => Some(Self::Str(other.to_string())),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::json!(i),
            Self::Float(f) => serde_json::json!(f),
            Self::Str(s) => serde_json::Value::String(s.clone()),
        }
    }

    /// Integer view, coercing from a numeric string if needed.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(f) => Some(*f as i64),
            Self::Str(s) => s.parse().ok(),
            Self::Bool(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Metadata map carried by entries and associations.
pub type Metadata = HashMap<String, MetadataValue>;

/// Importance score attached to every entry, recomputed on access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryScore {
    /// Intrinsic importance in [0, 1]
    pub base_importance: f64,
    /// Exponential time discount, floored at 0.01
    pub decay_factor: f64,
    /// Number of recorded accesses, at least 1
    pub access_frequency: u32,
    /// When the entry was last accessed
    pub last_accessed: DateTime<Utc>,
    /// Relevance in [0, 1]
    pub relevance_score: f64,
    /// Combined ranking score, non-negative
    pub composite_score: f64,
}

impl MemoryScore {
    /// Fresh score for a newly captured entry.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            base_importance: 1.0,
            decay_factor: 1.0,
            access_frequency: 1,
            last_accessed: now,
            relevance_score: 1.0,
            composite_score: 0.0,
        }
    }
}

/// A memory entry: the unit of capture, retrieval, and consolidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier, stable for the memory's lifetime
    pub id: Uuid,
    /// Which collection this entry lives in
    pub kind: MemoryKind,
    /// Opaque text payload
    pub content: String,
    /// Dense embedding of `content`; length must match the configured dimension
    pub embedding: Vec<f32>,
    /// Primitive metadata; always carries `source` and `captured_at`
    pub metadata: Metadata,
    /// When the entry was captured
    pub created_at: DateTime<Utc>,
    /// When the entry was last read
    pub accessed_at: DateTime<Utc>,
    /// Memory strength in [0, 1]; fresh entries start at 1.0
    pub strength: f64,
    /// Importance score, recomputed on access
    pub score: MemoryScore,
    /// Ids of association records touching this entry
    pub association_ids: Vec<Uuid>,
}

impl MemoryEntry {
    /// Create an entry of the given kind with fresh timestamps and full
    /// strength. `source` is recorded in metadata along with the capture
    /// time.
    pub fn new(kind: MemoryKind, source: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut metadata = Metadata::new();
        metadata.insert(META_SOURCE.to_string(), MetadataValue::Str(source.into()));
        metadata.insert(
            META_CAPTURED_AT.to_string(),
            MetadataValue::Int(now.timestamp()),
        );
        Self {
            id: Uuid::new_v4(),
            kind,
            content: content.into(),
            embedding: Vec::new(),
            metadata,
            created_at: now,
            accessed_at: now,
            strength: 1.0,
            score: MemoryScore::initial(now),
            association_ids: Vec::new(),
        }
    }

    /// Create an episodic entry.
    pub fn episodic(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MemoryKind::Episodic, source, content)
    }

    /// Create a semantic entry.
    pub fn semantic(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(MemoryKind::Semantic, source, content)
    }

    /// Set the embedding vector.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Merge extra metadata, keeping reserved keys already present.
    pub fn with_metadata(mut self, extra: Metadata) -> Self {
        for (k, v) in extra {
            self.metadata.entry(k).or_insert(v);
        }
        self
    }

    /// Set creation and access timestamps (tests and replay paths).
    pub fn with_timestamps(mut self, created_at: DateTime<Utc>, accessed_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self.accessed_at = accessed_at;
        self.score.last_accessed = accessed_at;
        self.metadata.insert(
            META_CAPTURED_AT.to_string(),
            MetadataValue::Int(created_at.timestamp()),
        );
        self
    }

    /// The `source` metadata value, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(META_SOURCE).and_then(MetadataValue::as_str)
    }

    /// Creation time as unix seconds, the range-indexed payload field.
    pub fn created_at_unix(&self) -> i64 {
        self.created_at.timestamp()
    }

    /// Whether this entry already references the given association.
    pub fn has_association(&self, association_id: Uuid) -> bool {
        self.association_ids.contains(&association_id)
    }

    /// Validate entry invariants. Embedding dimension is checked by the
    /// store, which knows the configured dimension.
    pub fn validate(&self) -> Result<(), String> {
        if self.content.is_empty() {
            return Err("Memory content cannot be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(format!("Memory strength out of range: {}", self.strength));
        }
        if self.source().is_none() {
            return Err("Memory metadata must carry a source".to_string());
        }
        Ok(())
    }
}
