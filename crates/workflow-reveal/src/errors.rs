/// Errors surfaced by the reveal pipeline.
///
/// Payload parse/recovery failures never reach the caller; they degrade to
/// opaque text inside the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RevealError {
    /// Invalid pipeline configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Operator input rejected before any network activity.
    #[error("validation error: {0}")]
    Validation(String),
    /// Request failed, returned a non-success status, or the body read failed.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
    },
    /// The workflow reported an error event mid-stream.
    #[error("upstream error: {0}")]
    Upstream(String),
    /// The session was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,
    /// Internal invariant violation (for example a session task that panicked).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl RevealError {
    /// Creates a transport error without a status code.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: None,
        }
    }

    /// Creates a transport error carrying the HTTP status code.
    pub fn status(message: impl Into<String>, status_code: u16) -> Self {
        Self::Transport {
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Returns the user-facing message for this error.
    ///
    /// Transport and upstream errors are surfaced verbatim; the other kinds
    /// keep their display prefix.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { message, .. } => message.clone(),
            Self::Upstream(message) | Self::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for errors the caller caused by cancelling.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
