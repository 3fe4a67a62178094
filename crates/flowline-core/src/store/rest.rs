//! REST document store client.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::{DocumentStore, FindQuery, FindResult};
use crate::error::StoreError;
use crate::template;

/// Document store backed by a Payload-style REST API.
///
/// Endpoints:
/// - `GET    {base}/api/{collection}?where[..]=..&limit=..&sort=..`
/// - `GET    {base}/api/{collection}/{id}`
/// - `POST   {base}/api/{collection}`
/// - `PATCH  {base}/api/{collection}/{id}`
/// - `DELETE {base}/api/{collection}/{id}`
#[derive(Clone)]
pub struct RestDocumentStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestDocumentStore {
    /// Create a new REST store client.
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/api/{}", self.base_url, collection)
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, collection, id)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.api_key {
            Some(ref key) => request.header(reqwest::header::AUTHORIZATION, key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        Ok(self.authorize(request).send().await?)
    }
}

/// Flatten a JSON filter into bracketed query pairs (`where[a][equals]=1`).
pub(crate) fn flatten_query(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_query(&format!("{}[{}]", prefix, key), nested, out);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_query(&format!("{}[{}]", prefix, index), nested, out);
            }
        }
        other => out.push((prefix.to_string(), template::stringify(other))),
    }
}

/// Map a non-success response to a store error.
async fn error_from_response(response: Response, collection: &str, id: Option<&str>) -> StoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => StoreError::RecordNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        },
        (StatusCode::NOT_FOUND, None) => StoreError::CollectionNotFound(collection.to_string()),
        (status, _) if status.is_client_error() => {
            StoreError::Rejected(format!("Status {}: {}", status, body))
        }
        (status, _) => StoreError::Unavailable(format!("Status {}: {}", status, body)),
    }
}

/// Mutations answer `{"doc": {...}, "message": ".."}`; reads answer the bare doc.
fn unwrap_doc(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("doc") => {
            map.remove("doc").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    async fn find(&self, collection: &str, query: &FindQuery) -> Result<FindResult, StoreError> {
        let mut params = Vec::new();
        if !query.filter.is_null() {
            flatten_query("where", &query.filter, &mut params);
        }
        match query.limit {
            Some(limit) => params.push(("limit".to_string(), limit.to_string())),
            None => params.push(("pagination".to_string(), "false".to_string())),
        }
        if let Some(ref sort) = query.sort {
            params.push(("sort".to_string(), sort.clone()));
        }

        let response = self
            .send(self.client.get(self.collection_url(collection)).query(&params))
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, collection, None).await);
        }

        Ok(response.json().await?)
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let response = self
            .send(self.client.get(self.document_url(collection, id)))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(error_from_response(response, collection, Some(id)).await);
        }

        Ok(Some(response.json().await?))
    }

    async fn create(&self, collection: &str, data: Value) -> Result<Value, StoreError> {
        let response = self
            .send(self.client.post(self.collection_url(collection)).json(&data))
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, collection, None).await);
        }

        Ok(unwrap_doc(response.json().await?))
    }

    async fn update(&self, collection: &str, id: &str, data: Value) -> Result<Value, StoreError> {
        let response = self
            .send(self.client.patch(self.document_url(collection, id)).json(&data))
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, collection, Some(id)).await);
        }

        Ok(unwrap_doc(response.json().await?))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .send(self.client.delete(self.document_url(collection, id)))
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response, collection, Some(id)).await);
        }

        Ok(())
    }
}
