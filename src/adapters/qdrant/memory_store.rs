//! Qdrant-backed memory store.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::{MemoryEntry, MemoryKind, VectorStoreConfig};
use crate::domain::ports::{MemoryPage, MemoryStore};

use super::client::QdrantClient;
use super::payload::{entry_to_point, point_to_entry};
use super::types::{
    OrderBy, RetrievePointsRequest, ScrollRequest, SearchRequest, UpsertPointsRequest,
};

/// [`MemoryStore`] over one Qdrant deployment, one collection per kind.
pub struct QdrantMemoryStore {
    client: Arc<QdrantClient>,
    config: VectorStoreConfig,
}

impl QdrantMemoryStore {
    pub fn new(client: Arc<QdrantClient>, config: VectorStoreConfig) -> Self {
        Self { client, config }
    }

    /// Create every configured memory collection with its `created_at`
    /// range index. Safe to call on every startup.
    pub async fn initialize(&self) -> MemoryResult<()> {
        for kind in MemoryKind::all() {
            let collection = self.collection(kind)?;
            self.client
                .ensure_collection(
                    collection,
                    self.config.vector_dimension,
                    self.config.on_disk_payload,
                )
                .await?;
            self.client
                .ensure_field_index(collection, "created_at", "integer")
                .await?;
        }
        Ok(())
    }

    fn collection(&self, kind: MemoryKind) -> MemoryResult<&str> {
        self.config
            .collection_for(kind)
            .ok_or_else(|| MemoryError::UnknownKind(kind.as_str().to_string()))
    }

    fn ordered_scroll_request(limit: usize, offset: Option<&str>) -> ScrollRequest {
        ScrollRequest {
            limit,
            with_payload: true,
            with_vector: true,
            filter: None,
            order_by: Some(OrderBy {
                key: "created_at".to_string(),
                direction: "desc".to_string(),
            }),
            offset: offset.map(String::from),
        }
    }

    /// Reachability probe.
    pub async fn health(&self) -> MemoryResult<()> {
        self.client.health().await
    }
}

#[async_trait]
impl MemoryStore for QdrantMemoryStore {
    async fn store(&self, entry: &MemoryEntry) -> MemoryResult<()> {
        let collection = self.collection(entry.kind)?;
        entry.validate().map_err(MemoryError::BadInput)?;
        if entry.embedding.len() != self.config.vector_dimension {
            return Err(MemoryError::BadInput(format!(
                "embedding dimension {} does not match configured dimension {}",
                entry.embedding.len(),
                self.config.vector_dimension
            )));
        }
        let request = UpsertPointsRequest {
            points: vec![entry_to_point(entry)],
        };
        self.client.upsert_points(collection, &request).await
    }

    async fn query(
        &self,
        kind: MemoryKind,
        vector: &[f32],
        limit: usize,
    ) -> MemoryResult<Vec<MemoryEntry>> {
        let collection = self.collection(kind)?;
        let request = SearchRequest {
            vector: vector.to_vec(),
            limit,
            with_payload: true,
            with_vector: true,
        };
        let points = self.client.search(collection, &request).await?;

        let mut entries = Vec::with_capacity(points.len());
        for point in &points {
            match point_to_entry(&point.id, &point.payload, point.vector.as_ref(), kind) {
                Ok(entry) => entries.push((point.score, entry)),
                Err(e) => warn!(collection, error = %e, "skipping undecodable point"),
            }
        }
        // Qdrant orders by score; make ties deterministic
        entries.sort_by(|(sa, a), (sb, b)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(entries.into_iter().map(|(_, e)| e).collect())
    }

    async fn retrieve(&self, kind: MemoryKind, id: Uuid) -> MemoryResult<MemoryEntry> {
        let collection = self.collection(kind)?;
        let request = RetrievePointsRequest {
            ids: vec![id.to_string()],
            with_payload: true,
            with_vector: true,
        };
        let points = self.client.retrieve_points(collection, &request).await?;
        let point = points
            .first()
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;
        point_to_entry(&point.id, &point.payload, point.vector.as_ref(), kind)
    }

    async fn get_recent(&self, kind: MemoryKind, limit: usize) -> MemoryResult<Vec<MemoryEntry>> {
        let collection = self.collection(kind)?;
        let request = Self::ordered_scroll_request(limit, None);
        let result = self.client.scroll(collection, &request).await?;

        let mut entries = Vec::with_capacity(result.points.len());
        for point in &result.points {
            match point_to_entry(&point.id, &point.payload, point.vector.as_ref(), kind) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(collection, error = %e, "skipping undecodable point"),
            }
        }
        Ok(entries)
    }

    async fn count(&self, kind: MemoryKind) -> MemoryResult<u64> {
        let collection = self.collection(kind)?;
        self.client.count(collection, None).await
    }

    async fn delete(&self, kind: MemoryKind, ids: &[Uuid]) -> MemoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let collection = self.collection(kind)?;
        self.client
            .delete_points(collection, ids.iter().map(Uuid::to_string).collect())
            .await
    }

    async fn get_all(
        &self,
        kind: MemoryKind,
        cursor: Option<&str>,
        limit: usize,
    ) -> MemoryResult<MemoryPage> {
        let collection = self.collection(kind)?;
        let cursor = cursor.filter(|c| !c.is_empty());
        let request = Self::ordered_scroll_request(limit, cursor);
        let result = self.client.scroll(collection, &request).await?;

        let mut entries = Vec::with_capacity(result.points.len());
        for point in &result.points {
            match point_to_entry(&point.id, &point.payload, point.vector.as_ref(), kind) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(collection, error = %e, "skipping undecodable point"),
            }
        }
        let next_cursor = if entries.len() == limit && limit > 0 {
            entries.last().map(|e| e.id.to_string())
        } else {
            None
        };
        Ok(MemoryPage {
            entries,
            next_cursor,
        })
    }
}
