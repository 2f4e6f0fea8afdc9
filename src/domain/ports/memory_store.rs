//! Memory store port.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::MemoryResult;
use crate::domain::models::{MemoryEntry, MemoryKind};

/// One page of a cursor-paginated scan.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    /// Entries in created_at-descending order
    pub entries: Vec<MemoryEntry>,
    /// Continuation token; `None` when this is the last page
    pub next_cursor: Option<String>,
}

/// Storage interface for typed memory collections.
///
/// One physical collection per [`MemoryKind`], all sharing the configured
/// vector dimension. Upserts are idempotent by id; per-id writes are
/// linearized by the backend (last writer wins).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Upsert an entry into its kind's collection.
    ///
    /// Fails with `BadInput` when the embedding length does not match the
    /// configured dimension, and `UnknownKind` when the kind has no
    /// configured collection.
    async fn store(&self, entry: &MemoryEntry) -> MemoryResult<()>;

    /// Cosine-similarity top-k over one kind's collection.
    ///
    /// Ties break deterministically: score descending, then created_at
    /// descending, then id ascending. Empty collections yield an empty Vec.
    async fn query(
        &self,
        kind: MemoryKind,
        vector: &[f32],
        limit: usize,
    ) -> MemoryResult<Vec<MemoryEntry>>;

    /// Exact fetch by id. Fails with `NotFound` when absent.
    async fn retrieve(&self, kind: MemoryKind, id: Uuid) -> MemoryResult<MemoryEntry>;

    /// Most recent entries in created_at-descending order.
    ///
    /// This is an ordered scan over the range-indexed timestamp field,
    /// never a similarity query.
    async fn get_recent(&self, kind: MemoryKind, limit: usize) -> MemoryResult<Vec<MemoryEntry>>;

    /// Exact count of one kind's collection.
    async fn count(&self, kind: MemoryKind) -> MemoryResult<u64>;

    /// Batch delete by id. Empty input and missing ids are not errors.
    async fn delete(&self, kind: MemoryKind, ids: &[Uuid]) -> MemoryResult<()>;

    /// Cursor-paginated full scan in created_at-descending order.
    ///
    /// `None` cursor starts at the beginning; a `None` next_cursor marks
    /// the final page. Paginating to exhaustion visits every entry exactly
    /// once.
    async fn get_all(
        &self,
        kind: MemoryKind,
        cursor: Option<&str>,
        limit: usize,
    ) -> MemoryResult<MemoryPage>;
}
