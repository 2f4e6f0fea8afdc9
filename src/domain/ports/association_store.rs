//! Association store port.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::MemoryResult;
use crate::domain::models::MemoryAssociation;

/// One page of a cursor-paginated association scan.
#[derive(Debug, Clone)]
pub struct AssociationPage {
    pub associations: Vec<MemoryAssociation>,
    /// Continuation token; `None` when this is the last page
    pub next_cursor: Option<String>,
}

/// Storage interface for association records.
///
/// Associations are retrieved by payload filters only, never by vector
/// similarity. Lookups are bidirectional: an association is returned for a
/// memory id matching either endpoint.
#[async_trait]
pub trait AssociationStore: Send + Sync {
    /// Upsert a single association by id.
    async fn store(&self, association: &MemoryAssociation) -> MemoryResult<()>;

    /// Upsert a batch of associations. Empty input is a no-op success.
    async fn bulk_store(&self, associations: &[MemoryAssociation]) -> MemoryResult<()>;

    /// All associations where the memory id matches either endpoint.
    async fn get_by_memory_id(&self, memory_id: Uuid) -> MemoryResult<Vec<MemoryAssociation>>;

    /// Batched form of [`get_by_memory_id`]: memory id → its associations.
    ///
    /// [`get_by_memory_id`]: AssociationStore::get_by_memory_id
    async fn get_by_memory_ids(
        &self,
        memory_ids: &[Uuid],
    ) -> MemoryResult<HashMap<Uuid, Vec<MemoryAssociation>>>;

    /// Batch delete by association id. Missing ids are not errors.
    async fn delete(&self, ids: &[Uuid]) -> MemoryResult<()>;

    /// Delete every association touching the given memory.
    async fn delete_by_memory_id(&self, memory_id: Uuid) -> MemoryResult<()>;

    /// Exact count of stored associations.
    async fn count(&self) -> MemoryResult<u64>;

    /// Cursor-paginated full scan.
    async fn get_all(&self, cursor: Option<&str>, limit: usize) -> MemoryResult<AssociationPage>;
}
