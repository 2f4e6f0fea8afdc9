//! Association tracker: a write-through cache over the association store.
//!
//! Keeps three in-process indexes under one reader-writer lock: a primary
//! `id → association` map and two secondary maps from source and target
//! memory ids. Reads hit the maps; writes go through to the store and then
//! update the maps. Caches populate lazily per memory id; there is no
//! cross-process coherence.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::{AssociationKind, Metadata, MemoryAssociation};
use crate::domain::ports::AssociationStore;

#[derive(Default)]
struct TrackerIndex {
    by_id: HashMap<Uuid, MemoryAssociation>,
    by_source: HashMap<Uuid, Vec<Uuid>>,
    by_target: HashMap<Uuid, Vec<Uuid>>,
    /// Memory ids whose associations have been pulled from the store
    loaded: HashSet<Uuid>,
}

impl TrackerIndex {
    fn insert(&mut self, association: MemoryAssociation) {
        let id = association.id;
        self.by_source
            .entry(association.source_id)
            .or_default()
            .push(id);
        self.by_target
            .entry(association.target_id)
            .or_default()
            .push(id);
        // Re-inserting an id must not duplicate the secondary entries
        if let Some(previous) = self.by_id.insert(id, association) {
            Self::dedup(&mut self.by_source, previous.source_id);
            Self::dedup(&mut self.by_target, previous.target_id);
        }
    }

    fn dedup(index: &mut HashMap<Uuid, Vec<Uuid>>, key: Uuid) {
        if let Some(ids) = index.get_mut(&key) {
            let mut seen = HashSet::new();
            ids.retain(|id| seen.insert(*id));
        }
    }

    fn remove(&mut self, id: Uuid) {
        if let Some(association) = self.by_id.remove(&id) {
            if let Some(ids) = self.by_source.get_mut(&association.source_id) {
                ids.retain(|&i| i != id);
            }
            if let Some(ids) = self.by_target.get_mut(&association.target_id) {
                ids.retain(|&i| i != id);
            }
        }
    }

    /// Merged lookup across both secondary indexes. An edge whose source
    /// and target were cached separately appears once per index entry;
    /// deduplication is the caller's concern.
    fn lookup(&self, memory_id: Uuid) -> Vec<MemoryAssociation> {
        let mut result = Vec::new();
        for index in [&self.by_source, &self.by_target] {
            if let Some(ids) = index.get(&memory_id) {
                result.extend(ids.iter().filter_map(|id| self.by_id.get(id)).cloned());
            }
        }
        result
    }
}

/// Cache-fronted view of the association store.
pub struct AssociationTracker {
    store: Arc<dyn AssociationStore>,
    index: RwLock<TrackerIndex>,
}

impl AssociationTracker {
    pub fn new(store: Arc<dyn AssociationStore>) -> Self {
        Self {
            store,
            index: RwLock::new(TrackerIndex::default()),
        }
    }

    /// Pull a memory's associations into the cache on first access.
    async fn ensure_loaded(&self, memory_id: Uuid) -> MemoryResult<()> {
        {
            let index = self.index.read().await;
            if index.loaded.contains(&memory_id) {
                return Ok(());
            }
        }
        let associations = self.store.get_by_memory_id(memory_id).await?;
        let mut index = self.index.write().await;
        for association in associations {
            index.insert(association);
        }
        index.loaded.insert(memory_id);
        Ok(())
    }

    /// All associations touching a memory, from the cache.
    pub async fn get_associations_for(
        &self,
        memory_id: Uuid,
    ) -> MemoryResult<Vec<MemoryAssociation>> {
        self.ensure_loaded(memory_id).await?;
        let index = self.index.read().await;
        Ok(index.lookup(memory_id))
    }

    /// Create and persist a new association, then index it.
    pub async fn create_association(
        &self,
        source_id: Uuid,
        target_id: Uuid,
        kind: AssociationKind,
        strength: f64,
        metadata: Metadata,
    ) -> MemoryResult<MemoryAssociation> {
        let association = MemoryAssociation::new(source_id, target_id, kind, strength)
            .with_metadata(metadata);
        association.validate().map_err(MemoryError::BadInput)?;

        self.store.store(&association).await?;
        let mut index = self.index.write().await;
        index.insert(association.clone());
        Ok(association)
    }

    /// Adjust an association's strength, writing through to the store.
    ///
    /// The association must be cached; load a memory's edges with
    /// [`get_associations_for`] before adjusting them.
    ///
    /// [`get_associations_for`]: AssociationTracker::get_associations_for
    pub async fn update_strength(&self, id: Uuid, strength: f64) -> MemoryResult<MemoryAssociation> {
        let mut association = {
            let index = self.index.read().await;
            index
                .by_id
                .get(&id)
                .cloned()
                .ok_or_else(|| MemoryError::NotFound(id.to_string()))?
        };

        association.set_strength(strength);
        self.store.store(&association).await?;
        let mut index = self.index.write().await;
        index.insert(association.clone());
        Ok(association)
    }

    /// Delete an association from the store and the cache.
    pub async fn remove_association(&self, id: Uuid) -> MemoryResult<()> {
        self.store.delete(&[id]).await?;
        let mut index = self.index.write().await;
        index.remove(id);
        Ok(())
    }
}
