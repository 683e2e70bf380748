use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::{AppError, Result};

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    pub fn new(id: &str, data: Fields) -> Self {
        Self { id: id.to_string(), data }
    }

    /// Decode into a model; the document id is injected as the `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let mut data = self.data.clone();
        data.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChange {
    pub collection: String,
    pub kind: ChangeKind,
    pub document: Document,
}

/// Document database with realtime change notification.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// All documents of a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<Document>>;

    /// Insert under a freshly generated id and return it.
    async fn add(&self, collection: &str, data: Fields) -> Result<String>;

    /// Create or replace.
    async fn set(&self, collection: &str, id: &str, data: Fields) -> Result<()>;

    /// Merge top-level fields into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<()>;

    async fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// Atomic integer add. Missing or non-integer fields count as zero.
    async fn increment(&self, collection: &str, id: &str, field: &str, delta: i64) -> Result<()>;

    fn subscribe(&self, collection: &str) -> broadcast::Receiver<DocumentChange>;
}

/// Serialize a model into document fields.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Validation(format!("expected a JSON object, got {}", other))),
    }
}

pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
) -> Result<T> {
    store
        .get(collection, id)
        .await?
        .ok_or_else(|| AppError::not_found(collection, id))?
        .decode()
}

/// Decode a whole collection, skipping documents that no longer fit the model.
pub async fn list_as<T: DeserializeOwned>(store: &dyn DocumentStore, collection: &str) -> Result<Vec<T>> {
    let documents = store.list(collection).await?;
    Ok(documents
        .iter()
        .filter_map(|doc| match doc.decode() {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Skipping malformed document {}/{}: {}", collection, doc.id, e);
                None
            }
        })
        .collect())
}
