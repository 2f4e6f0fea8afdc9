//! In-process association store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::MemoryAssociation;
use crate::domain::ports::{AssociationPage, AssociationStore};

/// In-process implementation of [`AssociationStore`].
#[derive(Default)]
pub struct InMemoryAssociationStore {
    records: RwLock<HashMap<Uuid, MemoryAssociation>>,
}

impl InMemoryAssociationStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn sorted(&self) -> Vec<MemoryAssociation> {
        let records = self.records.read().await;
        let mut all: Vec<MemoryAssociation> = records.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }
}

#[async_trait]
impl AssociationStore for InMemoryAssociationStore {
    async fn store(&self, association: &MemoryAssociation) -> MemoryResult<()> {
        association
            .validate()
            .map_err(MemoryError::BadInput)?;
        let mut records = self.records.write().await;
        records.insert(association.id, association.clone());
        Ok(())
    }

    async fn bulk_store(&self, associations: &[MemoryAssociation]) -> MemoryResult<()> {
        for association in associations {
            association.validate().map_err(MemoryError::BadInput)?;
        }
        let mut records = self.records.write().await;
        for association in associations {
            records.insert(association.id, association.clone());
        }
        Ok(())
    }

    async fn get_by_memory_id(&self, memory_id: Uuid) -> MemoryResult<Vec<MemoryAssociation>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|a| a.touches(memory_id))
            .cloned()
            .collect())
    }

    async fn get_by_memory_ids(
        &self,
        memory_ids: &[Uuid],
    ) -> MemoryResult<HashMap<Uuid, Vec<MemoryAssociation>>> {
        let records = self.records.read().await;
        let mut result: HashMap<Uuid, Vec<MemoryAssociation>> = HashMap::new();
        for &memory_id in memory_ids {
            let matches: Vec<MemoryAssociation> = records
                .values()
                .filter(|a| a.touches(memory_id))
                .cloned()
                .collect();
            result.insert(memory_id, matches);
        }
        Ok(result)
    }

    async fn delete(&self, ids: &[Uuid]) -> MemoryResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut records = self.records.write().await;
        for id in ids {
            records.remove(id);
        }
        Ok(())
    }

    async fn delete_by_memory_id(&self, memory_id: Uuid) -> MemoryResult<()> {
        let mut records = self.records.write().await;
        records.retain(|_, a| !a.touches(memory_id));
        Ok(())
    }

    async fn count(&self) -> MemoryResult<u64> {
        let records = self.records.read().await;
        Ok(records.len() as u64)
    }

    async fn get_all(&self, cursor: Option<&str>, limit: usize) -> MemoryResult<AssociationPage> {
        let all = self.sorted().await;

        let start = match cursor {
            None | Some("") => 0,
            Some(cursor) => {
                let cursor_id: Uuid = cursor
                    .parse()
                    .map_err(|_| MemoryError::BadInput(format!("invalid cursor: {cursor}")))?;
                match all.iter().position(|a| a.id == cursor_id) {
                    Some(pos) => pos + 1,
                    None => all.len(),
                }
            }
        };

        let page: Vec<MemoryAssociation> = all.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = if start + page.len() < all.len() {
            page.last().map(|a| a.id.to_string())
        } else {
            None
        };
        Ok(AssociationPage {
            associations: page,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AssociationKind;

    fn edge(source: Uuid, target: Uuid) -> MemoryAssociation {
        MemoryAssociation::new(source, target, AssociationKind::Temporal, 0.5)
    }

    #[tokio::test]
    async fn test_bidirectional_lookup() {
        let store = InMemoryAssociationStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        store.store(&edge(a, b)).await.unwrap();
        store.store(&edge(c, a)).await.unwrap();
        store.store(&edge(b, c)).await.unwrap();

        // Matches both as source and as target in a single call
        let for_a = store.get_by_memory_id(a).await.unwrap();
        assert_eq!(for_a.len(), 2);
        assert!(for_a.iter().all(|assoc| assoc.touches(a)));
    }

    #[tokio::test]
    async fn test_batched_lookup() {
        let store = InMemoryAssociationStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.store(&edge(a, b)).await.unwrap();

        let map = store.get_by_memory_ids(&[a, b, Uuid::new_v4()]).await.unwrap();
        assert_eq!(map[&a].len(), 1);
        assert_eq!(map[&b].len(), 1);
        assert_eq!(map.values().filter(|v| v.is_empty()).count(), 1);
    }

    #[tokio::test]
    async fn test_store_rejects_self_edge() {
        let store = InMemoryAssociationStore::new();
        let id = Uuid::new_v4();
        let err = store.store(&edge(id, id)).await.unwrap_err();
        assert!(matches!(err, MemoryError::BadInput(_)));
    }

    #[tokio::test]
    async fn test_bulk_store_and_count() {
        let store = InMemoryAssociationStore::new();
        let edges: Vec<MemoryAssociation> = (0..4)
            .map(|_| edge(Uuid::new_v4(), Uuid::new_v4()))
            .collect();
        store.bulk_store(&edges).await.unwrap();
        store.bulk_store(&[]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_delete_by_memory_id_sweeps_both_ends() {
        let store = InMemoryAssociationStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        store.store(&edge(a, b)).await.unwrap();
        store.store(&edge(c, a)).await.unwrap();
        store.store(&edge(b, c)).await.unwrap();

        store.delete_by_memory_id(a).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        assert!(store.get_by_memory_id(a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pagination_visits_all() {
        let store = InMemoryAssociationStore::new();
        for _ in 0..5 {
            store
                .store(&edge(Uuid::new_v4(), Uuid::new_v4()))
                .await
                .unwrap();
        }

        let mut seen = 0;
        let mut cursor: Option<String> = None;
        loop {
            let page = store.get_all(cursor.as_deref(), 2).await.unwrap();
            seen += page.associations.len();
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        assert_eq!(seen, 5);
    }
}
