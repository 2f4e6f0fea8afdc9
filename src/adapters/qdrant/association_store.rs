//! Qdrant-backed association store.
//!
//! Associations live in a single collection with a 1-dimensional dummy
//! vector; every lookup goes through payload filters, never similarity.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::{MemoryAssociation, VectorStoreConfig};
use crate::domain::ports::{AssociationPage, AssociationStore};

use super::client::QdrantClient;
use super::payload::{association_to_point, point_to_association};
use super::types::{Filter, ScrollRequest, UpsertPointsRequest};

/// Page size used when draining filtered lookups.
const FILTER_PAGE_SIZE: usize = 256;

/// [`AssociationStore`] over the dedicated Qdrant association collection.
pub struct QdrantAssociationStore {
    client: Arc<QdrantClient>,
    collection: String,
    on_disk_payload: bool,
}

impl QdrantAssociationStore {
    pub fn new(client: Arc<QdrantClient>, config: &VectorStoreConfig) -> Self {
        Self {
            client,
            collection: config.associations_collection.clone(),
            on_disk_payload: config.on_disk_payload,
        }
    }

    /// Create the association collection. Safe to call on every startup.
    pub async fn initialize(&self) -> MemoryResult<()> {
        self.client
            .ensure_collection(&self.collection, 1, self.on_disk_payload)
            .await?;
        for field in ["source_id", "target_id"] {
            self.client
                .ensure_field_index(&self.collection, field, "keyword")
                .await?;
        }
        Ok(())
    }

    fn endpoint_filter(memory_id: Uuid) -> Filter {
        Filter::any_match([
            ("source_id", memory_id.to_string()),
            ("target_id", memory_id.to_string()),
        ])
    }

    /// Drain every point matching a filter across scroll pages.
    async fn scroll_all(&self, filter: Filter) -> MemoryResult<Vec<MemoryAssociation>> {
        let mut offset: Option<String> = None;
        let mut associations = Vec::new();
        loop {
            let request = ScrollRequest {
                limit: FILTER_PAGE_SIZE,
                with_payload: true,
                with_vector: false,
                filter: Some(filter.clone()),
                order_by: None,
                offset: offset.take(),
            };
            let result = self.client.scroll(&self.collection, &request).await?;
            for point in &result.points {
                match point_to_association(point) {
                    Ok(association) => associations.push(association),
                    Err(e) => {
                        warn!(collection = %self.collection, error = %e, "skipping undecodable association");
                    }
                }
            }
            match result.next_page_offset {
                Some(next) => offset = Some(super::types::point_id_string(&next)),
                None => break,
            }
        }
        Ok(associations)
    }
}

#[async_trait]
impl AssociationStore for QdrantAssociationStore {
    async fn store(&self, association: &MemoryAssociation) -> MemoryResult<()> {
        association.validate().map_err(MemoryError::BadInput)?;
        let request = UpsertPointsRequest {
            points: vec![association_to_point(association)],
        };
        self.client.upsert_points(&self.collection, &request).await
    }

    async fn bulk_store(&self, associations: &[MemoryAssociation]) -> MemoryResult<()> {
        if associations.is_empty() {
            return Ok(());
        }
        for association in associations {
            association.validate().map_err(MemoryError::BadInput)?;
        }
        let request = UpsertPointsRequest {
            points: associations.iter().map(association_to_point).collect(),
        };
        self.client.upsert_points(&self.collection, &request).await
    }

    async fn get_by_memory_id(&self, memory_id: Uuid) -> MemoryResult<Vec<MemoryAssociation>> {
        self.scroll_all(Self::endpoint_filter(memory_id)).await
    }

    async fn get_by_memory_ids(
        &self,
        memory_ids: &[Uuid],
    ) -> MemoryResult<HashMap<Uuid, Vec<MemoryAssociation>>> {
        let mut result = HashMap::new();
        for &memory_id in memory_ids {
            let associations = self.get_by_memory_id(memory_id).await?;
            result.insert(memory_id, associations);
        }
        Ok(result)
    }

    async fn delete(&self, ids: &[Uuid]) -> MemoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        self.client
            .delete_points(&self.collection, ids.iter().map(Uuid::to_string).collect())
            .await
    }

    async fn delete_by_memory_id(&self, memory_id: Uuid) -> MemoryResult<()> {
        self.client
            .delete_by_filter(&self.collection, Self::endpoint_filter(memory_id))
            .await
    }

    async fn count(&self) -> MemoryResult<u64> {
        self.client.count(&self.collection, None).await
    }

    async fn get_all(&self, cursor: Option<&str>, limit: usize) -> MemoryResult<AssociationPage> {
        let cursor = cursor.filter(|c| !c.is_empty());
        let request = ScrollRequest {
            limit,
            with_payload: true,
            with_vector: false,
            filter: None,
            order_by: None,
            offset: cursor.map(String::from),
        };
        let result = self.client.scroll(&self.collection, &request).await?;

        let mut associations = Vec::with_capacity(result.points.len());
        for point in &result.points {
            match point_to_association(point) {
                Ok(association) => associations.push(association),
                Err(e) => {
                    warn!(collection = %self.collection, error = %e, "skipping undecodable association");
                }
            }
        }
        let next_cursor = result
            .next_page_offset
            .as_ref()
            .map(super::types::point_id_string);
        Ok(AssociationPage {
            associations,
            next_cursor,
        })
    }
}
