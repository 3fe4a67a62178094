//! HTTP task.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::context::ExecutionContext;
use crate::error::TaskError;
use crate::registry::Task;
use crate::services::Services;
use crate::steps::ApiCallStep;

/// `apiCall {url, method, headers, body}` -> `{status}`.
pub struct ApiCallTask {
    services: Services,
}

impl ApiCallTask {
    pub fn new(services: Services) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Task for ApiCallTask {
    fn name(&self) -> &'static str {
        "apiCall"
    }

    async fn execute(&self, input: Value) -> Result<Value, TaskError> {
        let step: ApiCallStep = serde_json::from_value(input)?;
        let response = step
            .send(&ExecutionContext::default(), self.services.http.as_ref())
            .await?;

        Ok(json!({"status": response.status}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{services, RecordingHttpClient};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reports_status_without_parsing_body() {
        let http = Arc::new(RecordingHttpClient::responding(204, ""));
        let (services, _, _) = services(http.clone());
        let task = ApiCallTask::new(services);

        let output = task
            .execute(json!({"url": "http://hooks/ping", "method": "POST", "body": {"ok": true}}))
            .await
            .unwrap();

        assert_eq!(output, json!({"status": 204}));
        assert_eq!(http.requests()[0].body, Some(json!({"ok": true})));
    }
}
