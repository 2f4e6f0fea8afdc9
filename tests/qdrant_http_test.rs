//! Qdrant adapter tests against a mock HTTP server: request shapes,
//! response parsing, and error mapping.

use std::sync::Arc;
use uuid::Uuid;

use engram::adapters::qdrant::{QdrantAssociationStore, QdrantClient, QdrantMemoryStore};
use engram::domain::errors::MemoryError;
use engram::domain::models::{
    AssociationKind, MemoryAssociation, MemoryEntry, MemoryKind, VectorStoreConfig,
};
use engram::domain::ports::{AssociationStore, MemoryStore};

const DIMENSION: usize = 3;

fn config_for(url: &str) -> VectorStoreConfig {
    VectorStoreConfig {
        url: url.to_string(),
        vector_dimension: DIMENSION,
        ..VectorStoreConfig::default()
    }
}

fn memory_store(server: &mockito::ServerGuard) -> QdrantMemoryStore {
    let config = config_for(&server.url());
    let client = Arc::new(QdrantClient::new(&config).unwrap());
    QdrantMemoryStore::new(client, config)
}

fn association_store(server: &mockito::ServerGuard) -> QdrantAssociationStore {
    let config = config_for(&server.url());
    let client = Arc::new(QdrantClient::new(&config).unwrap());
    QdrantAssociationStore::new(client, &config)
}

fn point_payload(entry: &MemoryEntry) -> serde_json::Value {
    serde_json::json!({
        "content": entry.content,
        "kind": entry.kind.as_str(),
        "created_at": entry.created_at_unix(),
        "accessed_at": entry.accessed_at.to_rfc3339(),
        "strength": entry.strength,
        "association_ids": [],
        "source": "mcp",
    })
}

#[tokio::test]
async fn test_ensure_collection_creates_when_missing() {
    let mut server = mockito::Server::new_async().await;
    let get = server
        .mock("GET", "/collections/sessions")
        .with_status(404)
        .with_body(r#"{"status":{"error":"Not found"}}"#)
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/collections/sessions")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "vectors": {"size": DIMENSION, "distance": "Cosine"},
            "on_disk_payload": true,
        })))
        .with_status(200)
        .with_body(r#"{"result": true, "status": "ok"}"#)
        .create_async()
        .await;

    let config = config_for(&server.url());
    let client = QdrantClient::new(&config).unwrap();
    client.ensure_collection("sessions", DIMENSION, true).await.unwrap();

    get.assert_async().await;
    put.assert_async().await;
}

#[tokio::test]
async fn test_ensure_collection_skips_existing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/collections/sessions")
        .with_status(200)
        .with_body(r#"{"result": {"status": "green"}, "status": "ok"}"#)
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/collections/sessions")
        .expect(0)
        .create_async()
        .await;

    let config = config_for(&server.url());
    let client = QdrantClient::new(&config).unwrap();
    client.ensure_collection("sessions", DIMENSION, true).await.unwrap();
    put.assert_async().await;
}

#[tokio::test]
async fn test_store_upserts_with_payload() {
    let mut server = mockito::Server::new_async().await;
    let entry = MemoryEntry::episodic("mcp", "Learn Go channels")
        .with_embedding(vec![0.1, 0.2, 0.3]);

    let upsert = server
        .mock("PUT", "/collections/episodic_memories/points?wait=true")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "points": [{
                "id": entry.id.to_string(),
                "payload": {
                    "content": "Learn Go channels",
                    "kind": "episodic",
                    "source": "mcp",
                },
            }],
        })))
        .with_status(200)
        .with_body(r#"{"result": {"status": "completed"}, "status": "ok"}"#)
        .create_async()
        .await;

    memory_store(&server).store(&entry).await.unwrap();
    upsert.assert_async().await;
}

#[tokio::test]
async fn test_store_rejects_dimension_mismatch_without_request() {
    let server = mockito::Server::new_async().await;
    let entry = MemoryEntry::episodic("mcp", "content").with_embedding(vec![0.1]);

    let err = memory_store(&server).store(&entry).await.unwrap_err();
    assert!(matches!(err, MemoryError::BadInput(_)));
}

#[tokio::test]
async fn test_store_rejects_invalid_entry_without_request() {
    let server = mockito::Server::new_async().await;
    let mut entry = MemoryEntry::episodic("mcp", "content").with_embedding(vec![0.0; DIMENSION]);
    entry.strength = -0.5;

    let err = memory_store(&server).store(&entry).await.unwrap_err();
    assert!(matches!(err, MemoryError::BadInput(_)));
}

#[tokio::test]
async fn test_store_maps_server_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", "/collections/episodic_memories/points?wait=true")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;

    let entry = MemoryEntry::episodic("mcp", "content").with_embedding(vec![0.0; DIMENSION]);
    let err = memory_store(&server).store(&entry).await.unwrap_err();
    assert!(matches!(err, MemoryError::StoreUnavailable(_)));
}

#[tokio::test]
async fn test_query_parses_scored_points() {
    let mut server = mockito::Server::new_async().await;
    let entry = MemoryEntry::episodic("mcp", "stored content").with_embedding(vec![0.1, 0.2, 0.3]);

    let body = serde_json::json!({
        "result": [{
            "id": entry.id.to_string(),
            "version": 1,
            "score": 0.93,
            "payload": point_payload(&entry),
            "vector": [0.1, 0.2, 0.3],
        }],
        "status": "ok",
    });
    server
        .mock("POST", "/collections/episodic_memories/points/search")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "limit": 5,
            "with_payload": true,
            "with_vector": true,
        })))
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let results = memory_store(&server)
        .query(MemoryKind::Episodic, &[0.1, 0.2, 0.3], 5)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, entry.id);
    assert_eq!(results[0].content, "stored content");
    assert_eq!(results[0].embedding, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn test_retrieve_missing_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/collections/episodic_memories/points")
        .with_status(200)
        .with_body(r#"{"result": [], "status": "ok"}"#)
        .create_async()
        .await;

    let err = memory_store(&server)
        .retrieve(MemoryKind::Episodic, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, MemoryError::NotFound(_)));
}

#[tokio::test]
async fn test_get_recent_requests_ordered_scroll() {
    let mut server = mockito::Server::new_async().await;
    let entry = MemoryEntry::episodic("mcp", "recent").with_embedding(vec![0.1, 0.2, 0.3]);

    let body = serde_json::json!({
        "result": {
            "points": [{
                "id": entry.id.to_string(),
                "payload": point_payload(&entry),
                "vector": [0.1, 0.2, 0.3],
            }],
            "next_page_offset": null,
        },
        "status": "ok",
    });
    let scroll = server
        .mock("POST", "/collections/episodic_memories/points/scroll")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "limit": 10,
            "order_by": {"key": "created_at", "direction": "desc"},
        })))
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let results = memory_store(&server)
        .get_recent(MemoryKind::Episodic, 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, entry.id);
    scroll.assert_async().await;
}

#[tokio::test]
async fn test_count_parses_result() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/collections/episodic_memories/points/count")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({"exact": true})))
        .with_status(200)
        .with_body(r#"{"result": {"count": 42}, "status": "ok"}"#)
        .create_async()
        .await;

    let count = memory_store(&server).count(MemoryKind::Episodic).await.unwrap();
    assert_eq!(count, 42);
}

#[tokio::test]
async fn test_unknown_kind_never_hits_transport() {
    let server = mockito::Server::new_async().await;
    let mut config = config_for(&server.url());
    config.memory_collections.remove("procedural");
    let client = Arc::new(QdrantClient::new(&config).unwrap());
    let store = QdrantMemoryStore::new(client, config);

    let err = store.count(MemoryKind::Procedural).await.unwrap_err();
    assert!(matches!(err, MemoryError::UnknownKind(_)));
}

#[tokio::test]
async fn test_association_lookup_filters_both_endpoints() {
    let mut server = mockito::Server::new_async().await;
    let memory_id = Uuid::new_v4();
    let association = MemoryAssociation::new(
        memory_id,
        Uuid::new_v4(),
        AssociationKind::Contextual,
        0.7,
    );

    let body = serde_json::json!({
        "result": {
            "points": [{
                "id": association.id.to_string(),
                "payload": {
                    "source_id": association.source_id.to_string(),
                    "target_id": association.target_id.to_string(),
                    "kind": "contextual",
                    "strength": 0.7,
                    "created_at": association.created_at.to_rfc3339(),
                    "updated_at": association.updated_at.to_rfc3339(),
                },
            }],
            "next_page_offset": null,
        },
        "status": "ok",
    });
    let scroll = server
        .mock("POST", "/collections/associations/points/scroll")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "filter": {
                "should": [
                    {"key": "source_id", "match": {"value": memory_id.to_string()}},
                    {"key": "target_id", "match": {"value": memory_id.to_string()}},
                ],
            },
        })))
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let results = association_store(&server)
        .get_by_memory_id(memory_id)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, association.id);
    assert_eq!(results[0].kind, AssociationKind::Contextual);
    scroll.assert_async().await;
}

#[tokio::test]
async fn test_association_bulk_store_single_request() {
    let mut server = mockito::Server::new_async().await;
    let associations: Vec<MemoryAssociation> = (0..3)
        .map(|_| MemoryAssociation::new(Uuid::new_v4(), Uuid::new_v4(), AssociationKind::Temporal, 0.5))
        .collect();

    let upsert = server
        .mock("PUT", "/collections/associations/points?wait=true")
        .with_status(200)
        .with_body(r#"{"result": {"status": "completed"}, "status": "ok"}"#)
        .expect(1)
        .create_async()
        .await;

    association_store(&server)
        .bulk_store(&associations)
        .await
        .unwrap();
    upsert.assert_async().await;
}

#[tokio::test]
async fn test_skips_undecodable_points_and_returns_rest() {
    let mut server = mockito::Server::new_async().await;
    let good = MemoryEntry::episodic("mcp", "good").with_embedding(vec![0.1, 0.2, 0.3]);

    // One malformed point (no content) alongside a valid one
    let body = serde_json::json!({
        "result": {
            "points": [
                {
                    "id": Uuid::new_v4().to_string(),
                    "payload": {"kind": "episodic"},
                    "vector": [0.0, 0.0, 0.0],
                },
                {
                    "id": good.id.to_string(),
                    "payload": point_payload(&good),
                    "vector": [0.1, 0.2, 0.3],
                },
            ],
            "next_page_offset": null,
        },
        "status": "ok",
    });
    server
        .mock("POST", "/collections/episodic_memories/points/scroll")
        .with_status(200)
        .with_body(body.to_string())
        .create_async()
        .await;

    let results = memory_store(&server)
        .get_recent(MemoryKind::Episodic, 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, good.id);
}

#[tokio::test]
async fn test_delete_empty_is_noop_without_request() {
    let server = mockito::Server::new_async().await;
    // No mock registered: any request would surface as StoreUnavailable
    memory_store(&server)
        .delete(MemoryKind::Episodic, &[])
        .await
        .unwrap();
}
