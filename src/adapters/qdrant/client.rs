//! Low-level Qdrant REST client.
//!
//! Thin transport layer: URL construction, request dispatch, envelope
//! unwrapping, and error mapping. Collection semantics live in the store
//! adapters built on top.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::VectorStoreConfig;

use super::types::{
    ApiResponse, CountRequest, CountResult, CreateCollectionRequest, CreateFieldIndexRequest,
    DeleteByFilterRequest, DeletePointsRequest, Filter, RetrievePointsRequest, RetrievedPoint,
    ScoredPoint, ScrollRequest, ScrollResult, SearchRequest, UpsertPointsRequest, VectorParams,
};

/// REST client for one Qdrant deployment.
pub struct QdrantClient {
    base_url: String,
    client: reqwest::Client,
}

impl QdrantClient {
    pub fn new(config: &VectorStoreConfig) -> MemoryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| MemoryError::StoreUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> MemoryResult<T> {
        let response = request
            .send()
            .await
            .map_err(|e| MemoryError::StoreUnavailable(format!("{context}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(MemoryError::StoreUnavailable(format!(
                "{context}: HTTP {status}: {body}"
            )));
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| MemoryError::Serialization(format!("{context}: {e}")))?;
        Ok(envelope.result)
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> MemoryResult<T> {
        self.execute(self.client.post(self.url(path)).json(body), context)
            .await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        context: &str,
    ) -> MemoryResult<T> {
        self.execute(self.client.put(self.url(path)).json(body), context)
            .await
    }

    /// Whether a collection exists.
    pub async fn collection_exists(&self, name: &str) -> MemoryResult<bool> {
        let response = self
            .client
            .get(self.url(&format!("/collections/{name}")))
            .send()
            .await
            .map_err(|e| MemoryError::StoreUnavailable(format!("get collection {name}: {e}")))?;
        match response.status() {
            s if s.is_success() => Ok(true),
            reqwest::StatusCode::NOT_FOUND => Ok(false),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(MemoryError::StoreUnavailable(format!(
                    "get collection {name}: HTTP {s}: {body}"
                )))
            }
        }
    }

    /// Create a collection with cosine distance. Idempotent: existing
    /// collections are left untouched.
    pub async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        on_disk_payload: bool,
    ) -> MemoryResult<()> {
        if self.collection_exists(name).await? {
            return Ok(());
        }
        let body = CreateCollectionRequest {
            vectors: VectorParams {
                size: dimension,
                distance: "Cosine".to_string(),
            },
            on_disk_payload,
        };
        let _: serde_json::Value = self
            .put(
                &format!("/collections/{name}"),
                &body,
                &format!("create collection {name}"),
            )
            .await?;
        Ok(())
    }

    /// Create a payload field index. A conflict from a pre-existing index
    /// is treated as success so initialization stays idempotent.
    pub async fn ensure_field_index(
        &self,
        collection: &str,
        field_name: &str,
        field_schema: &str,
    ) -> MemoryResult<()> {
        let body = CreateFieldIndexRequest {
            field_name: field_name.to_string(),
            field_schema: field_schema.to_string(),
        };
        let result: MemoryResult<serde_json::Value> = self
            .put(
                &format!("/collections/{collection}/index"),
                &body,
                &format!("create index {collection}.{field_name}"),
            )
            .await;
        match result {
            Ok(_) => Ok(()),
            Err(MemoryError::StoreUnavailable(message)) if message.contains("already exists") => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Upsert points, waiting for the write to apply.
    pub async fn upsert_points(&self, collection: &str, body: &UpsertPointsRequest) -> MemoryResult<()> {
        let _: serde_json::Value = self
            .put(
                &format!("/collections/{collection}/points?wait=true"),
                body,
                &format!("upsert into {collection}"),
            )
            .await?;
        Ok(())
    }

    /// Cosine top-k search.
    pub async fn search(
        &self,
        collection: &str,
        body: &SearchRequest,
    ) -> MemoryResult<Vec<ScoredPoint>> {
        self.post(
            &format!("/collections/{collection}/points/search"),
            body,
            &format!("search {collection}"),
        )
        .await
    }

    /// Exact retrieval by point ids.
    pub async fn retrieve_points(
        &self,
        collection: &str,
        body: &RetrievePointsRequest,
    ) -> MemoryResult<Vec<RetrievedPoint>> {
        self.post(
            &format!("/collections/{collection}/points"),
            body,
            &format!("retrieve from {collection}"),
        )
        .await
    }

    /// Paginated scan, optionally filtered and ordered.
    pub async fn scroll(&self, collection: &str, body: &ScrollRequest) -> MemoryResult<ScrollResult> {
        self.post(
            &format!("/collections/{collection}/points/scroll"),
            body,
            &format!("scroll {collection}"),
        )
        .await
    }

    /// Exact point count, optionally filtered.
    pub async fn count(&self, collection: &str, filter: Option<Filter>) -> MemoryResult<u64> {
        let body = CountRequest {
            exact: true,
            filter,
        };
        let result: CountResult = self
            .post(
                &format!("/collections/{collection}/points/count"),
                &body,
                &format!("count {collection}"),
            )
            .await?;
        Ok(result.count)
    }

    /// Delete points by id, waiting for the write to apply.
    pub async fn delete_points(&self, collection: &str, ids: Vec<String>) -> MemoryResult<()> {
        let body = DeletePointsRequest { points: ids };
        let _: serde_json::Value = self
            .post(
                &format!("/collections/{collection}/points/delete?wait=true"),
                &body,
                &format!("delete from {collection}"),
            )
            .await?;
        Ok(())
    }

    /// Delete points matching a payload filter.
    pub async fn delete_by_filter(&self, collection: &str, filter: Filter) -> MemoryResult<()> {
        let body = DeleteByFilterRequest { filter };
        let _: serde_json::Value = self
            .post(
                &format!("/collections/{collection}/points/delete?wait=true"),
                &body,
                &format!("delete by filter from {collection}"),
            )
            .await?;
        Ok(())
    }

    /// Reachability probe against the collections listing.
    pub async fn health(&self) -> MemoryResult<()> {
        let response = self
            .client
            .get(self.url("/collections"))
            .send()
            .await
            .map_err(|e| MemoryError::StoreUnavailable(format!("health check: {e}")))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(MemoryError::StoreUnavailable(format!(
                "health check: HTTP {}",
                response.status()
            )))
        }
    }
}
