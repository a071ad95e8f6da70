use tokio::sync::watch;

use crate::errors::RevealError;

/// Lifecycle of the controller's current session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionPhase {
    /// True once the session has stopped consuming the stream.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Observable state rendered by the front end.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ViewState {
    /// Session that owns this state; `None` before the first accepted submit.
    pub session_id: Option<uuid::Uuid>,
    pub phase: SessionPhase,
    /// Revealed text. Only ever appended to within a session.
    pub text: String,
    pub title: String,
    pub link: Option<String>,
    pub error: Option<String>,
    /// True while the request is being consumed.
    pub busy: bool,
    /// Every raw frame followed by a blank line, when debug is enabled.
    pub raw_log: Option<String>,
    /// Typed cause behind `error`, or `Cancelled`.
    #[serde(skip)]
    pub failure: Option<RevealError>,
}

impl ViewState {
    pub(crate) fn running(session_id: uuid::Uuid, debug: bool) -> Self {
        Self {
            session_id: Some(session_id),
            phase: SessionPhase::Running,
            busy: true,
            raw_log: debug.then(String::new),
            ..Self::default()
        }
    }

    pub(crate) fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            phase: SessionPhase::Failed,
            error: Some(message.clone()),
            failure: Some(RevealError::Validation(message)),
            ..Self::default()
        }
    }

    /// `Err` with the typed cause when the session failed or was cancelled.
    pub fn outcome(&self) -> Result<(), RevealError> {
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

/// Mirrors a session's view mutations into the controller's shared view,
/// as long as that view still belongs to the session.
#[derive(Clone, Debug)]
pub(crate) struct ViewPublisher {
    tx: watch::Sender<ViewState>,
    session_id: uuid::Uuid,
}

impl ViewPublisher {
    pub(crate) fn new(tx: watch::Sender<ViewState>, session_id: uuid::Uuid) -> Self {
        Self { tx, session_id }
    }

    pub(crate) fn apply(&self, update: &dyn Fn(&mut ViewState)) {
        self.tx.send_if_modified(|view| {
            if view.session_id != Some(self.session_id) {
                return false;
            }
            update(view);
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superseded_sessions_cannot_write() {
        let old = uuid::Uuid::new_v4();
        let current = uuid::Uuid::new_v4();
        let (tx, rx) = watch::channel(ViewState::running(current, false));
        ViewPublisher::new(tx.clone(), old).apply(&|view| view.text.push_str("stale"));
        assert_eq!(rx.borrow().text, "");
        ViewPublisher::new(tx, current).apply(&|view| view.text.push_str("fresh"));
        assert_eq!(rx.borrow().text, "fresh");
    }

    #[test]
    fn terminal_phases() {
        assert!(!SessionPhase::Running.is_terminal());
        assert!(SessionPhase::Cancelled.is_terminal());
        assert!(ViewState::rejected("bad").phase.is_terminal());
    }

    #[test]
    fn outcome_carries_the_typed_failure() {
        assert_eq!(
            ViewState::rejected("bad").outcome(),
            Err(RevealError::Validation("bad".into()))
        );
        assert_eq!(ViewState::default().outcome(), Ok(()));
    }

    #[test]
    fn failure_is_not_serialized() {
        let value = serde_json::to_value(ViewState::rejected("bad")).expect("serialize");
        assert!(value.get("failure").is_none());
        assert_eq!(value["error"], "bad");
        assert_eq!(value["phase"], "failed");
    }
}
