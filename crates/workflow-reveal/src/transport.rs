use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt as _;
use tracing::debug;

use crate::config::PipelineConfig;
use crate::errors::RevealError;

/// Raw response body chunks of one workflow run.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, RevealError>> + Send + 'static>>;

/// A single workflow-execution request.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowRequest {
    pub session_id: uuid::Uuid,
    pub endpoint: String,
    pub body: serde_json::Value,
    pub timeout: Option<Duration>,
}

impl WorkflowRequest {
    /// Builds the request for `input` using the endpoint, input field and
    /// overrides of `config`.
    pub fn new(session_id: uuid::Uuid, config: &PipelineConfig, input: &str) -> Self {
        Self {
            session_id,
            endpoint: config.endpoint.clone(),
            body: build_request_body(config, input),
            timeout: config.request_timeout,
        }
    }
}

pub(crate) fn build_request_body(config: &PipelineConfig, input: &str) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert(
        config.input_field.clone(),
        serde_json::Value::String(input.to_string()),
    );
    let overrides = [
        ("workflow_id", &config.overrides.workflow_id),
        ("bot_id", &config.overrides.bot_id),
        ("app_id", &config.overrides.app_id),
    ];
    for (key, value) in overrides {
        if let Some(value) = value {
            body.insert(key.to_string(), serde_json::Value::String(value.clone()));
        }
    }
    serde_json::Value::Object(body)
}

/// Opens the streamed response of a workflow run.
///
/// Implementations return `Err` for request failures and non-success
/// statuses; read failures after that are items of the returned stream.
#[async_trait::async_trait]
pub trait WorkflowTransport: Send + Sync {
    async fn open(&self, request: WorkflowRequest) -> Result<ByteStream, RevealError>;
}

/// HTTP transport posting JSON with `reqwest`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, RevealError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RevealError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Uses an existing client (shared pools, proxies, custom TLS).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl WorkflowTransport for ReqwestTransport {
    async fn open(&self, request: WorkflowRequest) -> Result<ByteStream, RevealError> {
        debug!(session_id = %request.session_id, endpoint = %request.endpoint, "starting workflow stream");
        let mut http_req = self
            .client
            .post(&request.endpoint)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&request.body);
        if let Some(timeout) = request.timeout {
            http_req = http_req.timeout(timeout);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| RevealError::transport(format!("stream request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RevealError::status(
                error_message_from_body(&body, status),
                status.as_u16(),
            ));
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| RevealError::transport(format!("stream read failed: {e}")))
        });
        Ok(Box::pin(stream))
    }
}

/// Message for a non-success response: the body's `error` field when it is
/// JSON, else the status reason phrase.
pub(crate) fn error_message_from_body(body: &str, status: reqwest::StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        })
        .or_else(|| status.canonical_reason().map(ToOwned::to_owned))
        .unwrap_or_else(|| status.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowOverrides;
    use reqwest::StatusCode;

    #[test]
    fn body_uses_configured_input_field() {
        let body = build_request_body(&PipelineConfig::video_runner(), "https://v.test/1");
        assert_eq!(body, serde_json::json!({"input": "https://v.test/1"}));

        let config = PipelineConfig::home_runner().overrides(WorkflowOverrides {
            workflow_id: Some("7538006170724941870".into()),
            bot_id: None,
            app_id: Some("app".into()),
        });
        let body = build_request_body(&config, "https://h.test/u");
        assert_eq!(
            body,
            serde_json::json!({
                "home_url": "https://h.test/u",
                "workflow_id": "7538006170724941870",
                "app_id": "app"
            })
        );
    }

    #[test]
    fn error_body_field_wins_over_status_text() {
        assert_eq!(
            error_message_from_body(r#"{"error":"workflow not found"}"#, StatusCode::NOT_FOUND),
            "workflow not found"
        );
        assert_eq!(
            error_message_from_body("<html>", StatusCode::BAD_GATEWAY),
            "Bad Gateway"
        );
        assert_eq!(
            error_message_from_body(r#"{"error":""}"#, StatusCode::INTERNAL_SERVER_ERROR),
            "Internal Server Error"
        );
    }

    #[test]
    fn request_carries_session_and_timeout() {
        let session_id = uuid::Uuid::new_v4();
        let config = PipelineConfig::video_runner().request_timeout(Duration::from_secs(5));
        let request = WorkflowRequest::new(session_id, &config, "https://v.test");
        assert_eq!(request.session_id, session_id);
        assert_eq!(request.timeout, Some(Duration::from_secs(5)));
        assert_eq!(request.endpoint, config.endpoint);
    }
}
