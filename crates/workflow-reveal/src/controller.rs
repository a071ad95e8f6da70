use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::errors::RevealError;
use crate::session::StreamSession;
use crate::sse::FrameSplitter;
use crate::transport::{ReqwestTransport, WorkflowRequest, WorkflowTransport};
use crate::view::{ViewPublisher, ViewState};

/// Shown when the operator input is not an absolute URL.
pub const INVALID_LINK_MESSAGE: &str = "please enter a valid link";

/// Handle used to request cancellation of a running session.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The transfer is dropped at the session's next suspension point and the
    /// view moves to `Cancelled` without an error message.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// A started session.
pub struct SessionHandle {
    session_id: uuid::Uuid,
    abort: AbortHandle,
    join: JoinHandle<ViewState>,
}

impl SessionHandle {
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Waits until the session stops consuming the stream and has revealed
    /// every queued chunk, returning its final view.
    pub async fn wait(self) -> Result<ViewState, RevealError> {
        self.join
            .await
            .map_err(|e| RevealError::Protocol(format!("session task failed: {e}")))
    }
}

/// Runs one pipeline instance: validates input, starts sessions and exposes
/// their state.
///
/// Only one session is active at a time; submitting again cancels the
/// previous session first.
pub struct RevealController {
    config: PipelineConfig,
    transport: Arc<dyn WorkflowTransport>,
    view_tx: watch::Sender<ViewState>,
    active: Option<AbortHandle>,
}

impl RevealController {
    /// Creates a controller after validating `config`.
    pub fn new(
        config: PipelineConfig,
        transport: Arc<dyn WorkflowTransport>,
    ) -> Result<Self, RevealError> {
        config.validate()?;
        let (view_tx, _) = watch::channel(ViewState::default());
        Ok(Self {
            config,
            transport,
            view_tx,
            active: None,
        })
    }

    /// Creates a controller backed by [`ReqwestTransport`].
    pub fn with_reqwest(config: PipelineConfig) -> Result<Self, RevealError> {
        Self::new(config, Arc::new(ReqwestTransport::new()?))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Subscribes to view updates.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> ViewState {
        self.view_tx.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.view_tx.borrow().busy
    }

    /// Starts a session for `input`.
    ///
    /// Must be called within a tokio runtime. Input that is not an absolute
    /// URL is rejected with [`RevealError::Validation`] before any request.
    pub fn submit(&mut self, input: &str) -> Result<SessionHandle, RevealError> {
        self.cancel();

        let input = input.trim();
        if let Err(e) = url::Url::parse(input) {
            debug!(input, error = %e, "rejected submit");
            self.view_tx.send_replace(ViewState::rejected(INVALID_LINK_MESSAGE));
            return Err(RevealError::Validation(INVALID_LINK_MESSAGE.into()));
        }

        let session_id = uuid::Uuid::new_v4();
        self.view_tx
            .send_replace(ViewState::running(session_id, self.config.debug));
        let session = StreamSession::new(session_id, &self.config)
            .with_publisher(ViewPublisher::new(self.view_tx.clone(), session_id));
        let request = WorkflowRequest::new(session_id, &self.config, input);

        let (abort_tx, abort_rx) = watch::channel(false);
        let abort = AbortHandle { tx: abort_tx };
        info!(session_id = %session_id, endpoint = %self.config.endpoint, "session started");
        let join = tokio::spawn(run_session(
            session,
            self.transport.clone(),
            request,
            abort_rx,
        ));
        self.active = Some(abort.clone());

        Ok(SessionHandle {
            session_id,
            abort,
            join,
        })
    }

    /// Cancels the active session, if any. Returns whether one was signalled.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(abort) => {
                abort.abort();
                true
            }
            None => false,
        }
    }
}

/// Resolves once cancellation is requested. Never resolves if every abort
/// handle was dropped without aborting.
async fn aborted(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

/// Drives one session: reads frames, feeds the pipeline and paces reveals,
/// all from a single task.
pub(crate) async fn run_session(
    mut session: StreamSession,
    transport: Arc<dyn WorkflowTransport>,
    request: WorkflowRequest,
    mut abort_rx: watch::Receiver<bool>,
) -> ViewState {
    let session_id = session.session_id();

    let opened = tokio::select! {
        biased;
        _ = aborted(&mut abort_rx) => None,
        opened = transport.open(request) => Some(opened),
    };
    let mut bytes = match opened {
        None => {
            info!(session_id = %session_id, "session cancelled before the stream opened");
            session.cancel();
            return session.into_view();
        }
        Some(Err(err)) => {
            warn!(session_id = %session_id, error = %err, "workflow request failed");
            session.fail(&err);
            return session.into_view();
        }
        Some(Ok(bytes)) => bytes,
    };

    let mut splitter = FrameSplitter::default();
    let mut reading = true;
    let mut frames_seen = 0_u64;
    'session: loop {
        let deadline = session.deadline();
        if !reading && deadline.is_none() {
            break;
        }
        tokio::select! {
            biased;
            _ = aborted(&mut abort_rx) => {
                info!(session_id = %session_id, "session cancelled");
                session.cancel();
                break;
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                session.reveal_next(Instant::now());
            }
            next = bytes.next(), if reading => {
                match next {
                    Some(Ok(chunk)) => {
                        for frame in splitter.push_chunk(&chunk) {
                            frames_seen += 1;
                            let effect = session.handle_frame(&frame, Instant::now());
                            debug!(session_id = %session_id, seq = frames_seen, ?effect, "frame");
                            tokio::task::yield_now().await;
                            if *abort_rx.borrow() {
                                info!(session_id = %session_id, "session cancelled mid-read");
                                session.cancel();
                                break 'session;
                            }
                        }
                    }
                    Some(Err(err)) => {
                        warn!(session_id = %session_id, error = %err, "workflow stream failed");
                        session.fail(&err);
                        reading = false;
                    }
                    None => {
                        if let Some(frame) = std::mem::take(&mut splitter).finish() {
                            frames_seen += 1;
                            session.handle_frame(&frame, Instant::now());
                        }
                        info!(session_id = %session_id, frames = frames_seen, "workflow stream ended");
                        session.complete();
                        reading = false;
                    }
                }
            }
        }
    }
    // Dropping the byte stream here releases the transfer.
    drop(bytes);
    session.into_view()
}
