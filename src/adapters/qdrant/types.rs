//! Request/response types for the Qdrant REST API.
//!
//! Only the subset of the API surface the engine uses is modeled. Every
//! response arrives wrapped in a `{"result": ..., "status": "ok"}`
//! envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Vector space parameters for collection creation.
#[derive(Debug, Serialize)]
pub struct VectorParams {
    pub size: usize,
    pub distance: String,
}

/// Body of `PUT /collections/{name}`.
#[derive(Debug, Serialize)]
pub struct CreateCollectionRequest {
    pub vectors: VectorParams,
    pub on_disk_payload: bool,
}

/// Body of `PUT /collections/{name}/index`.
#[derive(Debug, Serialize)]
pub struct CreateFieldIndexRequest {
    pub field_name: String,
    pub field_schema: String,
}

/// A point to upsert: id, vector, and arbitrary JSON payload.
#[derive(Debug, Serialize)]
pub struct PointStruct {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, Value>,
}

/// Body of `PUT /collections/{name}/points`.
#[derive(Debug, Serialize)]
pub struct UpsertPointsRequest {
    pub points: Vec<PointStruct>,
}

/// Body of `POST /collections/{name}/points/search`.
#[derive(Debug, Serialize)]
pub struct SearchRequest {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub with_payload: bool,
    pub with_vector: bool,
}

/// Body of `POST /collections/{name}/points` (retrieve by ids).
#[derive(Debug, Serialize)]
pub struct RetrievePointsRequest {
    pub ids: Vec<String>,
    pub with_payload: bool,
    pub with_vector: bool,
}

/// Ordered-scan clause for scroll requests.
#[derive(Debug, Clone, Serialize)]
pub struct OrderBy {
    pub key: String,
    pub direction: String,
}

/// Body of `POST /collections/{name}/points/scroll`.
#[derive(Debug, Serialize)]
pub struct ScrollRequest {
    pub limit: usize,
    pub with_payload: bool,
    pub with_vector: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<OrderBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

/// Body of `POST /collections/{name}/points/count`.
#[derive(Debug, Serialize)]
pub struct CountRequest {
    pub exact: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
}

/// Body of `POST /collections/{name}/points/delete` by ids.
#[derive(Debug, Serialize)]
pub struct DeletePointsRequest {
    pub points: Vec<String>,
}

/// Body of `POST /collections/{name}/points/delete` by filter.
#[derive(Debug, Serialize)]
pub struct DeleteByFilterRequest {
    pub filter: Filter,
}

/// Payload filter: `must` clauses AND together, `should` clauses OR.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Filter {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<Condition>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<Condition>,
}

impl Filter {
    /// OR of exact-match conditions over payload fields.
    pub fn any_match(conditions: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        Self {
            must: Vec::new(),
            should: conditions
                .into_iter()
                .map(|(key, value)| Condition::matches(key, value))
                .collect(),
        }
    }
}

/// A single match condition on a payload field.
#[derive(Debug, Clone, Serialize)]
pub struct Condition {
    pub key: String,
    #[serde(rename = "match")]
    pub match_value: MatchValue,
}

impl Condition {
    pub fn matches(key: &str, value: String) -> Self {
        Self {
            key: key.to_string(),
            match_value: MatchValue { value },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchValue {
    pub value: String,
}

/// Standard response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub result: T,
    #[serde(default)]
    pub status: Value,
}

/// A point returned by search (with similarity score).
#[derive(Debug, Deserialize)]
pub struct ScoredPoint {
    pub id: Value,
    pub score: f32,
    #[serde(default)]
    pub payload: HashMap<String, Value>,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

/// A point returned by retrieve/scroll (no score).
#[derive(Debug, Deserialize)]
pub struct RetrievedPoint {
    pub id: Value,
    #[serde(default)]
    pub payload: HashMap<String, Value>,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

/// Result of a scroll request.
#[derive(Debug, Deserialize)]
pub struct ScrollResult {
    pub points: Vec<RetrievedPoint>,
    #[serde(default)]
    pub next_page_offset: Option<Value>,
}

/// Result of a count request.
#[derive(Debug, Deserialize)]
pub struct CountResult {
    pub count: u64,
}

/// Point id as a plain string, whether Qdrant sent a string or a number.
pub fn point_id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
