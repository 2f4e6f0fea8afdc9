//! In-process memory store.
//!
//! Implements the same semantics as the remote adapter over
//! `RwLock<HashMap>` state: idempotent upserts, cosine top-k with
//! deterministic tie-breaks, ordered recency scans, and cursor pagination.
//! Used by the test suite and the `provider: memory` configuration.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::{MemoryEntry, MemoryKind};
use crate::domain::ports::{MemoryPage, MemoryStore};
use crate::services::analyzer::cosine_similarity;

/// In-process implementation of [`MemoryStore`].
pub struct InMemoryMemoryStore {
    dimension: usize,
    kinds: HashSet<MemoryKind>,
    collections: RwLock<HashMap<MemoryKind, HashMap<Uuid, MemoryEntry>>>,
}

impl InMemoryMemoryStore {
    /// Store with collections for every memory kind.
    pub fn new(dimension: usize) -> Self {
        Self::with_kinds(dimension, &MemoryKind::all())
    }

    /// Store with collections for a subset of kinds; other kinds fail with
    /// `UnknownKind`, matching a partially configured remote deployment.
    pub fn with_kinds(dimension: usize, kinds: &[MemoryKind]) -> Self {
        Self {
            dimension,
            kinds: kinds.iter().copied().collect(),
            collections: RwLock::new(kinds.iter().map(|k| (*k, HashMap::new())).collect()),
        }
    }

    fn check_kind(&self, kind: MemoryKind) -> MemoryResult<()> {
        if self.kinds.contains(&kind) {
            Ok(())
        } else {
            Err(MemoryError::UnknownKind(kind.as_str().to_string()))
        }
    }

    /// Entries of one kind sorted created_at-descending with id tie-break.
    async fn sorted_by_recency(&self, kind: MemoryKind) -> MemoryResult<Vec<MemoryEntry>> {
        self.check_kind(kind)?;
        let collections = self.collections.read().await;
        let mut entries: Vec<MemoryEntry> = collections
            .get(&kind)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default();
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(entries)
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn store(&self, entry: &MemoryEntry) -> MemoryResult<()> {
        self.check_kind(entry.kind)?;
        entry.validate().map_err(MemoryError::BadInput)?;
        if entry.embedding.len() != self.dimension {
            return Err(MemoryError::BadInput(format!(
                "embedding dimension {} does not match configured dimension {}",
                entry.embedding.len(),
                self.dimension
            )));
        }
        let mut collections = self.collections.write().await;
        collections
            .entry(entry.kind)
            .or_default()
            .insert(entry.id, entry.clone());
        Ok(())
    }

    async fn query(
        &self,
        kind: MemoryKind,
        vector: &[f32],
        limit: usize,
    ) -> MemoryResult<Vec<MemoryEntry>> {
        self.check_kind(kind)?;
        let collections = self.collections.read().await;
        let mut scored: Vec<(f64, MemoryEntry)> = collections
            .get(&kind)
            .map(|c| {
                c.values()
                    .map(|e| (cosine_similarity(&e.embedding, vector), e.clone()))
                    .collect()
            })
            .unwrap_or_default();
        scored.sort_by(|(sa, a), (sb, b)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(scored.into_iter().take(limit).map(|(_, e)| e).collect())
    }

    async fn retrieve(&self, kind: MemoryKind, id: Uuid) -> MemoryResult<MemoryEntry> {
        self.check_kind(kind)?;
        let collections = self.collections.read().await;
        collections
            .get(&kind)
            .and_then(|c| c.get(&id))
            .cloned()
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))
    }

    async fn get_recent(&self, kind: MemoryKind, limit: usize) -> MemoryResult<Vec<MemoryEntry>> {
        let mut entries = self.sorted_by_recency(kind).await?;
        entries.truncate(limit);
        Ok(entries)
    }

    async fn count(&self, kind: MemoryKind) -> MemoryResult<u64> {
        self.check_kind(kind)?;
        let collections = self.collections.read().await;
        Ok(collections.get(&kind).map_or(0, |c| c.len() as u64))
    }

    async fn delete(&self, kind: MemoryKind, ids: &[Uuid]) -> MemoryResult<()> {
        self.check_kind(kind)?;
        if ids.is_empty() {
            return Ok(());
        }
        let mut collections = self.collections.write().await;
        if let Some(collection) = collections.get_mut(&kind) {
            for id in ids {
                collection.remove(id);
            }
        }
        Ok(())
    }

    async fn get_all(
        &self,
        kind: MemoryKind,
        cursor: Option<&str>,
        limit: usize,
    ) -> MemoryResult<MemoryPage> {
        let entries = self.sorted_by_recency(kind).await?;

        let start = match cursor {
            None | Some("") => 0,
            Some(cursor) => {
                let cursor_id: Uuid = cursor
                    .parse()
                    .map_err(|_| MemoryError::BadInput(format!("invalid cursor: {cursor}")))?;
                match entries.iter().position(|e| e.id == cursor_id) {
                    // Resume after the last entry of the previous page
                    Some(pos) => pos + 1,
                    // Cursor entry was deleted between pages; the scan ends
                    None => entries.len(),
                }
            }
        };

        let page: Vec<MemoryEntry> = entries.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = if start + page.len() < entries.len() {
            page.last().map(|e| e.id.to_string())
        } else {
            None
        };
        Ok(MemoryPage {
            entries: page,
            next_cursor,
        })
    }
}
