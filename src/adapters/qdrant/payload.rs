//! Conversion between domain records and Qdrant point payloads.
//!
//! Memory payloads keep `created_at` as unix seconds so the range index
//! can drive ordered scans; `accessed_at` stays RFC3339 for readability.
//! Metadata keys are flattened into the payload next to the reserved
//! fields and split back out on read.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::{MemoryError, MemoryResult};
use crate::domain::models::{
    AssociationKind, Metadata, MetadataValue, MemoryAssociation, MemoryEntry, MemoryKind,
    MemoryScore, META_ACCESS_COUNT,
};

use super::types::{point_id_string, PointStruct, RetrievedPoint};

const MEMORY_RESERVED: &[&str] = &[
    "content",
    "kind",
    "created_at",
    "accessed_at",
    "strength",
    "association_ids",
];

const ASSOCIATION_RESERVED: &[&str] = &[
    "source_id",
    "target_id",
    "kind",
    "strength",
    "created_at",
    "updated_at",
];

/// Build the upsert point for a memory entry.
pub fn entry_to_point(entry: &MemoryEntry) -> PointStruct {
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert("content".to_string(), Value::String(entry.content.clone()));
    payload.insert(
        "kind".to_string(),
        Value::String(entry.kind.as_str().to_string()),
    );
    payload.insert(
        "created_at".to_string(),
        serde_json::json!(entry.created_at_unix()),
    );
    payload.insert(
        "accessed_at".to_string(),
        Value::String(entry.accessed_at.to_rfc3339()),
    );
    payload.insert("strength".to_string(), serde_json::json!(entry.strength));
    payload.insert(
        "association_ids".to_string(),
        Value::Array(
            entry
                .association_ids
                .iter()
                .map(|id| Value::String(id.to_string()))
                .collect(),
        ),
    );
    for (key, value) in &entry.metadata {
        if !MEMORY_RESERVED.contains(&key.as_str()) {
            payload.insert(key.clone(), value.to_json());
        }
    }
    PointStruct {
        id: entry.id.to_string(),
        vector: entry.embedding.clone(),
        payload,
    }
}

/// Rebuild a memory entry from a stored point.
pub fn point_to_entry(
    id: &Value,
    payload: &HashMap<String, Value>,
    vector: Option<&Vec<f32>>,
    kind: MemoryKind,
) -> MemoryResult<MemoryEntry> {
    let id: Uuid = point_id_string(id)
        .parse()
        .map_err(|_| MemoryError::Serialization(format!("invalid point id: {id}")))?;

    let content = payload
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| MemoryError::Serialization(format!("point {id} missing content")))?
        .to_string();

    let created_at = payload
        .get("created_at")
        .and_then(Value::as_i64)
        .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
        .ok_or_else(|| MemoryError::Serialization(format!("point {id} missing created_at")))?;

    let accessed_at = payload
        .get("accessed_at")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or(created_at, |dt| dt.with_timezone(&Utc));

    let strength = payload
        .get("strength")
        .and_then(Value::as_f64)
        .unwrap_or(1.0);

    let association_ids: Vec<Uuid> = payload
        .get("association_ids")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .filter_map(|s| s.parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let mut metadata = Metadata::new();
    for (key, value) in payload {
        if MEMORY_RESERVED.contains(&key.as_str()) {
            continue;
        }
        if let Some(primitive) = MetadataValue::from_json(value) {
            metadata.insert(key.clone(), primitive);
        }
    }

    // The score is derived state: seed it from the persisted access counter
    // and let the scorer recompute the rest on the next access.
    let mut score = MemoryScore::initial(accessed_at);
    if let Some(count) = metadata.get(META_ACCESS_COUNT).and_then(MetadataValue::as_int) {
        if count > 0 {
            score.access_frequency = count as u32;
        }
    }

    Ok(MemoryEntry {
        id,
        kind,
        content,
        embedding: vector.cloned().unwrap_or_default(),
        metadata,
        created_at,
        accessed_at,
        strength,
        score,
        association_ids,
    })
}

/// Build the upsert point for an association. The vector space is a
/// 1-dimensional dummy; associations are only ever fetched by filter.
pub fn association_to_point(association: &MemoryAssociation) -> PointStruct {
    let mut payload: HashMap<String, Value> = HashMap::new();
    payload.insert(
        "source_id".to_string(),
        Value::String(association.source_id.to_string()),
    );
    payload.insert(
        "target_id".to_string(),
        Value::String(association.target_id.to_string()),
    );
    payload.insert(
        "kind".to_string(),
        Value::String(association.kind.as_str().to_string()),
    );
    payload.insert(
        "strength".to_string(),
        serde_json::json!(association.strength),
    );
    payload.insert(
        "created_at".to_string(),
        Value::String(association.created_at.to_rfc3339()),
    );
    payload.insert(
        "updated_at".to_string(),
        Value::String(association.updated_at.to_rfc3339()),
    );
    for (key, value) in &association.metadata {
        if !ASSOCIATION_RESERVED.contains(&key.as_str()) {
            payload.insert(key.clone(), value.to_json());
        }
    }
    PointStruct {
        id: association.id.to_string(),
        vector: vec![0.0],
        payload,
    }
}

/// Rebuild an association from a stored point.
pub fn point_to_association(point: &RetrievedPoint) -> MemoryResult<MemoryAssociation> {
    let id: Uuid = point_id_string(&point.id)
        .parse()
        .map_err(|_| MemoryError::Serialization(format!("invalid point id: {}", point.id)))?;

    let uuid_field = |key: &str| -> MemoryResult<Uuid> {
        point
            .payload
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| MemoryError::Serialization(format!("association {id} missing {key}")))
    };

    let kind = point
        .payload
        .get("kind")
        .and_then(Value::as_str)
        .and_then(AssociationKind::from_str)
        .ok_or_else(|| MemoryError::Serialization(format!("association {id} missing kind")))?;

    let time_field = |key: &str| -> DateTime<Utc> {
        point
            .payload
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map_or_else(Utc::now, |dt| dt.with_timezone(&Utc))
    };

    let mut metadata = Metadata::new();
    for (key, value) in &point.payload {
        if ASSOCIATION_RESERVED.contains(&key.as_str()) {
            continue;
        }
        if let Some(primitive) = MetadataValue::from_json(value) {
            metadata.insert(key.clone(), primitive);
        }
    }

    Ok(MemoryAssociation {
        id,
        source_id: uuid_field("source_id")?,
        target_id: uuid_field("target_id")?,
        kind,
        strength: point
            .payload
            .get("strength")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        created_at: time_field("created_at"),
        updated_at: time_field("updated_at"),
        metadata,
    })
}
