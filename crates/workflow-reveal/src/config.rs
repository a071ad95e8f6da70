use std::time::Duration;

use crate::errors::RevealError;
use crate::extract::PayloadShape;
use crate::reveal::DEFAULT_REVEAL_INTERVAL;
use crate::segment::{DEFAULT_MAX_CHUNK_CHARS, DEFAULT_MIN_CHUNK_CHARS, Segmenter};

const VIDEO_RUNNER_ENDPOINT: &str = "http://guiqiantec.com:3010/api/coze/run-workflow/stream";
const HOME_RUNNER_ENDPOINT: &str = "http://localhost:3000/api/coze/home/stream";

/// Optional workflow/bot/app identifiers forwarded with the request.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkflowOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

/// Everything that differs between two instances of the pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Workflow-execution endpoint receiving the `POST`.
    pub endpoint: String,
    /// Request body field carrying the operator input.
    pub input_field: String,
    pub overrides: WorkflowOverrides,
    /// Delay between two revealed chunks.
    pub reveal_interval: Duration,
    pub min_chunk_chars: usize,
    pub max_chunk_chars: usize,
    pub payload_shape: PayloadShape,
    /// Keep every raw frame in the view's debug log.
    pub debug: bool,
    /// Optional overall request timeout. `None` leaves streaming unbounded.
    pub request_timeout: Option<Duration>,
}

impl PipelineConfig {
    /// Creates a config with default pacing for the given endpoint.
    pub fn new(endpoint: impl Into<String>, input_field: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            input_field: input_field.into(),
            overrides: WorkflowOverrides::default(),
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            min_chunk_chars: DEFAULT_MIN_CHUNK_CHARS,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            payload_shape: PayloadShape::WithLink,
            debug: true,
            request_timeout: None,
        }
    }

    /// Runs a workflow for a single video link; payloads carry a link.
    pub fn video_runner() -> Self {
        Self::new(VIDEO_RUNNER_ENDPOINT, "input")
    }

    /// Runs a workflow for a profile home page; payloads carry no link.
    pub fn home_runner() -> Self {
        Self::new(HOME_RUNNER_ENDPOINT, "home_url").payload_shape(PayloadShape::TextOnly)
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn overrides(mut self, overrides: WorkflowOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn reveal_interval(mut self, interval: Duration) -> Self {
        self.reveal_interval = interval;
        self
    }

    pub fn chunk_bounds(mut self, min_chars: usize, max_chars: usize) -> Self {
        self.min_chunk_chars = min_chars;
        self.max_chunk_chars = max_chars;
        self
    }

    pub fn payload_shape(mut self, shape: PayloadShape) -> Self {
        self.payload_shape = shape;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Applies `WORKFLOW_REVEAL_*` and identifier overrides from the
    /// environment. Unparseable values are logged and ignored.
    ///
    /// Variables: `WORKFLOW_REVEAL_ENDPOINT`, `WORKFLOW_REVEAL_INTERVAL_MS`,
    /// `WORKFLOW_REVEAL_MIN_CHUNK`, `WORKFLOW_REVEAL_MAX_CHUNK`,
    /// `WORKFLOW_REVEAL_DEBUG`, `WORKFLOW_ID`, `BOT_ID`, `APP_ID`.
    pub fn with_env(mut self) -> Self {
        if let Some(endpoint) = env_string("WORKFLOW_REVEAL_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(ms) = env_parse::<u64>("WORKFLOW_REVEAL_INTERVAL_MS") {
            self.reveal_interval = Duration::from_millis(ms);
        }
        if let Some(min) = env_parse::<usize>("WORKFLOW_REVEAL_MIN_CHUNK") {
            self.min_chunk_chars = min;
        }
        if let Some(max) = env_parse::<usize>("WORKFLOW_REVEAL_MAX_CHUNK") {
            self.max_chunk_chars = max;
        }
        if let Some(debug) = std::env::var("WORKFLOW_REVEAL_DEBUG")
            .ok()
            .and_then(|v| parse_bool(&v))
        {
            self.debug = debug;
        }
        if let Some(id) = env_string("WORKFLOW_ID") {
            self.overrides.workflow_id = Some(id);
        }
        if let Some(id) = env_string("BOT_ID") {
            self.overrides.bot_id = Some(id);
        }
        if let Some(id) = env_string("APP_ID") {
            self.overrides.app_id = Some(id);
        }
        self
    }

    /// Checks bounds and the endpoint before any session is started.
    pub fn validate(&self) -> Result<(), RevealError> {
        if self.input_field.trim().is_empty() {
            return Err(RevealError::Config("input_field must not be empty".into()));
        }
        if self.max_chunk_chars == 0 {
            return Err(RevealError::Config(
                "max_chunk_chars must be greater than 0".into(),
            ));
        }
        if self.min_chunk_chars > self.max_chunk_chars {
            return Err(RevealError::Config(format!(
                "min_chunk_chars ({}) must not exceed max_chunk_chars ({})",
                self.min_chunk_chars, self.max_chunk_chars
            )));
        }
        if self.reveal_interval.is_zero() {
            return Err(RevealError::Config(
                "reveal_interval must be greater than 0".into(),
            ));
        }
        url::Url::parse(&self.endpoint)
            .map_err(|e| RevealError::Config(format!("invalid endpoint {}: {e}", self.endpoint)))?;
        Ok(())
    }

    pub fn segmenter(&self) -> Segmenter {
        Segmenter::new(self.min_chunk_chars, self.max_chunk_chars)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_only_in_endpoint_field_and_shape() {
        let video = PipelineConfig::video_runner();
        let home = PipelineConfig::home_runner();
        assert_eq!(video.input_field, "input");
        assert_eq!(home.input_field, "home_url");
        assert_eq!(video.payload_shape, PayloadShape::WithLink);
        assert_eq!(home.payload_shape, PayloadShape::TextOnly);
        assert_eq!(video.reveal_interval, home.reveal_interval);
        assert_eq!(video.segmenter(), home.segmenter());
        assert!(video.validate().is_ok());
        assert!(home.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_chunk_bounds() {
        let err = PipelineConfig::video_runner()
            .chunk_bounds(10, 5)
            .validate()
            .expect_err("inverted bounds");
        assert!(matches!(err, RevealError::Config(msg) if msg.contains("min_chunk_chars")));
    }

    #[test]
    fn validate_rejects_relative_endpoint_and_zero_interval() {
        assert!(
            PipelineConfig::video_runner()
                .endpoint("/api/stream")
                .validate()
                .is_err()
        );
        assert!(
            PipelineConfig::video_runner()
                .reveal_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn overrides_skip_absent_fields_when_serialized() {
        let overrides = WorkflowOverrides {
            bot_id: Some("b".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&overrides).expect("serialize"),
            serde_json::json!({"bot_id": "b"})
        );
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
