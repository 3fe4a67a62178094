//! In-memory document store.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::query::{matches, sort_documents};
use super::{document_id, DocumentStore, FindQuery, FindResult};
use crate::error::StoreError;

/// Process-local document store.
///
/// Collections are created on first write and keep insertion order, which is
/// the order used to break sort ties. Documents get an `id` (UUID v4 unless
/// one is supplied) plus `createdAt`/`updatedAt` timestamps. Ids are unique
/// per collection.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Value>>>,
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert documents as-is, bypassing id generation and timestamps.
    pub async fn seed(&self, collection: &str, docs: impl IntoIterator<Item = Value>) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .extend(docs);
    }

    /// All documents of a collection in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of documents in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<FindResult, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(FindResult::default());
        };

        let mut matched = Vec::new();
        for doc in docs {
            if matches(doc, &query.filter)? {
                matched.push(doc.clone());
            }
        }

        if let Some(ref sort) = query.sort {
            sort_documents(&mut matched, sort);
        }

        let total_docs = matched.len();
        if let Some(limit) = query.limit.filter(|l| *l > 0) {
            matched.truncate(limit);
        }

        Ok(FindResult {
            docs: matched,
            total_docs,
        })
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).and_then(|docs| {
            docs.iter()
                .find(|doc| document_id(doc).as_deref() == Some(id))
                .cloned()
        }))
    }

    async fn create(&self, collection: &str, data: Value) -> Result<Value, StoreError> {
        let Value::Object(mut doc) = data else {
            return Err(StoreError::Rejected(format!(
                "documents in '{}' must be JSON objects",
                collection
            )));
        };

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let supplied = match doc.get("id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };

        let id = match supplied {
            Some(id) => {
                if docs.iter().any(|d| document_id(d).as_deref() == Some(id.as_str())) {
                    return Err(StoreError::Rejected(format!(
                        "duplicate id '{}' in '{}'",
                        id, collection
                    )));
                }
                id
            }
            None => uuid::Uuid::new_v4().to_string(),
        };

        let now = Utc::now().to_rfc3339();
        doc.insert("id".to_string(), Value::String(id));
        doc.insert("createdAt".to_string(), Value::String(now.clone()));
        doc.insert("updatedAt".to_string(), Value::String(now));

        let doc = Value::Object(doc);
        docs.push(doc.clone());

        tracing::trace!(collection = %collection, "Document created");
        Ok(doc)
    }

    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<Value, StoreError> {
        let Value::Object(patch) = data else {
            return Err(StoreError::Rejected(format!(
                "updates to '{}' must be JSON objects",
                collection
            )));
        };

        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| {
                docs.iter_mut()
                    .find(|doc| document_id(doc).as_deref() == Some(id))
            })
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        if let Value::Object(fields) = doc {
            for (key, value) in patch {
                if key != "id" {
                    fields.insert(key, value);
                }
            }
            fields.insert(
                "updatedAt".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }

        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.get_mut(collection);

        let position = docs
            .as_ref()
            .and_then(|docs| docs.iter().position(|doc| document_id(doc).as_deref() == Some(id)));

        match (docs, position) {
            (Some(docs), Some(index)) => {
                docs.remove(index);
                Ok(())
            }
            _ => Err(StoreError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_assigns_id_and_timestamps() {
        let store = InMemoryDocumentStore::new();
        let doc = store.create("leads", json!({"email": "a@b.com"})).await.unwrap();

        assert!(doc["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(doc["createdAt"].is_string());
        assert_eq!(doc["email"], json!("a@b.com"));
        assert_eq!(store.count("leads").await, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates_and_non_objects() {
        let store = InMemoryDocumentStore::new();
        store.create("leads", json!({"id": "l1"})).await.unwrap();

        let err = store.create("leads", json!({"id": "l1"})).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));

        let err = store.create("leads", json!("text")).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_find_by_id_and_update() {
        let store = InMemoryDocumentStore::new();
        store.seed("leads", [json!({"id": 7, "status": "new"})]).await;

        let found = store.find_by_id("leads", "7").await.unwrap();
        assert_eq!(found.unwrap()["status"], json!("new"));
        assert!(store.find_by_id("leads", "8").await.unwrap().is_none());

        let updated = store
            .update("leads", "7", json!({"status": "contacted", "id": "hijack"}))
            .await
            .unwrap();
        assert_eq!(updated["status"], json!("contacted"));
        assert_eq!(updated["id"], json!(7));

        let err = store.update("leads", "missing", json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_filters_sorts_and_limits() {
        let store = InMemoryDocumentStore::new();
        store
            .seed(
                "rules",
                [
                    json!({"id": "a", "event": "x", "priority": 1}),
                    json!({"id": "b", "event": "y", "priority": 9}),
                    json!({"id": "c", "event": "x", "priority": 3}),
                ],
            )
            .await;

        let query = FindQuery::filter(json!({"event": {"equals": "x"}})).with_sort("-priority");
        let result = store.find("rules", &query).await.unwrap();
        assert_eq!(result.total_docs, 2);
        assert_eq!(result.docs[0]["id"], json!("c"));

        let result = store.find("rules", &query.with_limit(1)).await.unwrap();
        assert_eq!(result.docs.len(), 1);
        assert_eq!(result.total_docs, 2);

        let empty = store.find("unknown", &FindQuery::all()).await.unwrap();
        assert!(empty.docs.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryDocumentStore::new();
        store.seed("leads", [json!({"id": "l1"}), json!({"id": "l2"})]).await;

        store.delete("leads", "l1").await.unwrap();
        assert_eq!(store.count("leads").await, 1);

        let err = store.delete("leads", "l1").await.unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound { .. }));
    }
}
