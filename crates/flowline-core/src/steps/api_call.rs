//! `apiCall` step.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::error::StepError;
use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};

/// One request header. Both parts may contain templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

/// Issue one HTTP request and keep the parsed JSON response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallStep {
    /// Target URL (templated).
    pub url: String,

    /// HTTP method (templated, default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: Vec<Header>,

    /// Request body (templated). Defaults to the whole context for non-GET
    /// requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    /// Context key receiving the parsed response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl ApiCallStep {
    /// Resolve the request against the current context.
    pub fn build_request(&self, ctx: &ExecutionContext) -> Result<HttpRequest, StepError> {
        let url = ctx.resolve_string(&self.url);
        if url.trim().is_empty() {
            return Err(StepError::Configuration("apiCall url is empty".to_string()));
        }

        let method: HttpMethod = ctx.resolve_string(&self.method).parse()?;

        let headers = self
            .headers
            .iter()
            .map(|h| (ctx.resolve_string(&h.key), ctx.resolve_string(&h.value)))
            .filter(|(key, _)| !key.trim().is_empty())
            .collect();

        let body = match self.body {
            Some(ref body) if !is_blank(body) => Some(ctx.resolve(body)),
            _ if method != HttpMethod::GET => Some(ctx.to_value()),
            _ => None,
        };

        Ok(HttpRequest {
            url,
            method,
            headers,
            body,
        })
    }

    /// Send the request and return the raw response.
    pub async fn send(
        &self,
        ctx: &ExecutionContext,
        http: &dyn HttpClient,
    ) -> Result<HttpResponse, StepError> {
        let request = self.build_request(ctx)?;

        tracing::debug!(
            url = %request.url,
            method = %request.method,
            "Executing API call"
        );

        let response = http.fetch(request).await?;
        if !response.is_success() {
            tracing::warn!(status = response.status, url = %self.url, "API call returned non-success status");
        }

        Ok(response)
    }

    /// Send the request and parse the response body as JSON.
    pub async fn run(&self, ctx: &ExecutionContext, http: &dyn HttpClient) -> Result<Value, StepError> {
        self.send(ctx, http).await?.json()
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
