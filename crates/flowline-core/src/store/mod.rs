//! Document store collaborator.
//!
//! Steps and the rule matcher read and write records through the
//! [`DocumentStore`] trait. Two implementations ship with the crate:
//! - [`InMemoryDocumentStore`] - process-local collections, used in tests and
//!   single-process deployments
//! - [`RestDocumentStore`] - a Payload-style REST API over HTTP

mod memory;
mod query;
mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::StoreError;

pub use memory::InMemoryDocumentStore;
pub use query::{matches, sort_documents};
pub use rest::RestDocumentStore;

/// Query passed to [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindQuery {
    /// Filter clause (`{"field": {"equals": value}}`). `null` matches all.
    #[serde(rename = "where", default)]
    pub filter: Value,

    /// Maximum number of documents to return. `None` returns all matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,

    /// Sort key: `field` ascending, `-field` descending. Comma separated for
    /// multiple keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

impl FindQuery {
    /// Query matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Query with the given filter clause.
    pub fn filter(filter: Value) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Limit the number of returned documents.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the sort key.
    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }
}

/// Result of [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindResult {
    /// Matched documents, sorted and limited.
    pub docs: Vec<Value>,

    /// Number of matched documents before the limit was applied.
    #[serde(default)]
    pub total_docs: usize,
}

/// CRUD surface of the external record service.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find documents in a collection.
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<FindResult, StoreError>;

    /// Fetch one document by id. Missing documents yield `Ok(None)`.
    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Create a document and return it as stored.
    async fn create(&self, collection: &str, data: Value) -> Result<Value, StoreError>;

    /// Patch a document and return it as stored.
    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<Value, StoreError>;

    /// Delete a document.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;
}

/// Document id as text. Numeric ids are stringified.
pub fn document_id(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_query_builder() {
        let query = FindQuery::filter(json!({"active": {"equals": true}}))
            .with_limit(1)
            .with_sort("-priority");

        assert_eq!(query.limit, Some(1));
        assert_eq!(query.sort.as_deref(), Some("-priority"));

        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["where"]["active"]["equals"], json!(true));
    }

    #[test]
    fn test_find_result_deserialization() {
        let result: FindResult =
            serde_json::from_value(json!({"docs": [{"id": "a"}], "totalDocs": 7, "page": 1}))
                .unwrap();
        assert_eq!(result.docs.len(), 1);
        assert_eq!(result.total_docs, 7);
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id(&json!({"id": "abc"})), Some("abc".to_string()));
        assert_eq!(document_id(&json!({"id": 12})), Some("12".to_string()));
        assert_eq!(document_id(&json!({"name": "x"})), None);
    }
}
