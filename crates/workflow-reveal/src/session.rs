use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::delta::DeltaTracker;
use crate::errors::RevealError;
use crate::extract::{PayloadShape, content_source, display_text, extract_payload, truthy};
use crate::recover::recover;
use crate::reveal::RevealScheduler;
use crate::segment::Segmenter;
use crate::sse::{ParsedEvent, parse_frame};
use crate::view::{SessionPhase, ViewPublisher, ViewState};

/// Shown when an upstream error event carries no message.
pub const DEFAULT_UPSTREAM_ERROR: &str = "upstream error";

/// What a frame did to the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameEffect {
    /// Blank frame, skipped.
    Skipped,
    /// Keep-alive.
    Ping,
    /// Upstream reported an error; consumption continues.
    UpstreamError(String),
    /// Upstream reported completion; consumption continues until end of data.
    Done,
    /// Content event; `chunks` new chunks were queued.
    Content { node_key: String, chunks: usize },
}

/// State of one request, from submit to completion.
///
/// Owned by the session task; every mutation of the view goes through
/// [`StreamSession::update_view`] so the shared view mirrors it.
#[derive(Debug)]
pub struct StreamSession {
    session_id: uuid::Uuid,
    shape: PayloadShape,
    segmenter: Segmenter,
    delta: DeltaTracker,
    scheduler: RevealScheduler,
    active_node_key: String,
    cancelled: bool,
    view: ViewState,
    publisher: Option<ViewPublisher>,
}

impl StreamSession {
    /// Creates a detached session whose view is only kept locally.
    pub fn new(session_id: uuid::Uuid, config: &PipelineConfig) -> Self {
        Self {
            session_id,
            shape: config.payload_shape,
            segmenter: config.segmenter(),
            delta: DeltaTracker::default(),
            scheduler: RevealScheduler::new(config.reveal_interval),
            active_node_key: String::new(),
            cancelled: false,
            view: ViewState::running(session_id, config.debug),
            publisher: None,
        }
    }

    pub(crate) fn with_publisher(mut self, publisher: ViewPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn into_view(self) -> ViewState {
        self.view
    }

    pub fn cumulative_text(&self) -> &str {
        self.delta.cumulative()
    }

    pub fn pending_chunks(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn is_draining(&self) -> bool {
        self.scheduler.is_draining()
    }

    pub fn active_node_key(&self) -> &str {
        &self.active_node_key
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Next reveal tick, if chunks are queued or a drain is winding down.
    pub fn deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    fn update_view(&mut self, update: impl Fn(&mut ViewState)) {
        update(&mut self.view);
        if let Some(publisher) = &self.publisher {
            publisher.apply(&update);
        }
    }

    /// Logs (in debug mode) and dispatches one raw frame.
    pub fn handle_frame(&mut self, frame: &str, now: Instant) -> FrameEffect {
        let Some(event) = parse_frame(frame) else {
            return FrameEffect::Skipped;
        };
        if self.view.raw_log.is_some() {
            self.update_view(|view| {
                if let Some(log) = view.raw_log.as_mut() {
                    log.push_str(frame);
                    log.push_str("\n\n");
                }
            });
        }
        self.apply_event(&event, now)
    }

    /// Dispatches a parsed event by name.
    pub fn apply_event(&mut self, event: &ParsedEvent, now: Instant) -> FrameEffect {
        let recovered = recover(&event.data);
        match event.event.as_str() {
            "PING" => FrameEffect::Ping,
            "Error" | "error" => {
                let message = recovered
                    .as_value()
                    .and_then(|value| {
                        ["error_message", "message"].into_iter().find_map(|key| {
                            value.get(key).filter(|v| truthy(v)).and_then(display_text)
                        })
                    })
                    .unwrap_or_else(|| DEFAULT_UPSTREAM_ERROR.to_string());
                warn!(session_id = %self.session_id, error = %message, "upstream reported an error");
                self.update_view(|view| {
                    view.phase = SessionPhase::Failed;
                    view.error = Some(message.clone());
                    view.failure = Some(RevealError::Upstream(message.clone()));
                });
                FrameEffect::UpstreamError(message)
            }
            "Done" | "done" => {
                debug!(session_id = %self.session_id, "upstream reported done; waiting for end of data");
                FrameEffect::Done
            }
            name => {
                let source = content_source(name, &recovered, &event.data);
                let payload = extract_payload(&source, self.shape);
                if !payload.title.is_empty() {
                    self.update_view(|view| view.title = payload.title.clone());
                }
                if let Some(link) = payload.link.as_ref().filter(|l| !l.is_empty()) {
                    self.update_view(|view| view.link = Some(link.clone()));
                }

                // A new node keeps appending to the same text buffer.
                let node_key = payload.node_key().to_string();
                if node_key != self.active_node_key {
                    debug!(
                        session_id = %self.session_id,
                        from = %self.active_node_key,
                        to = %node_key,
                        "node changed"
                    );
                    self.active_node_key = node_key.clone();
                }

                let chunks = self.enqueue_text(&payload.text, now);
                FrameEffect::Content { node_key, chunks }
            }
        }
    }

    /// Runs the delta engine and segmenter over a cumulative snapshot and
    /// queues the resulting chunks. Returns the number of chunks queued.
    fn enqueue_text(&mut self, new_full: &str, now: Instant) -> usize {
        if new_full.is_empty() {
            return 0;
        }
        let Some(delta) = self.delta.advance(new_full) else {
            return 0;
        };
        let chunks = self.segmenter.segment(&delta);
        let count = chunks.len();
        debug!(session_id = %self.session_id, delta_chars = delta.chars().count(), chunks = count, "queued delta");
        self.scheduler.enqueue(chunks, now);
        count
    }

    /// Reveal tick: appends at most one chunk to the view.
    pub fn reveal_next(&mut self, now: Instant) -> Option<String> {
        let chunk = self.scheduler.tick(now)?;
        self.update_view(|view| view.text.push_str(&chunk));
        Some(chunk)
    }

    /// End of data. A session that saw an upstream error stays failed.
    pub fn complete(&mut self) {
        self.update_view(|view| {
            if view.phase == SessionPhase::Running {
                view.phase = SessionPhase::Completed;
            }
            view.busy = false;
        });
    }

    /// Transport failure; the stream is no longer consumed.
    pub fn fail(&mut self, err: &RevealError) {
        let message = err.user_message();
        self.update_view(|view| {
            view.phase = SessionPhase::Failed;
            view.error = Some(message.clone());
            view.failure = Some(err.clone());
            view.busy = false;
        });
    }

    /// Caller cancellation: drops queued chunks and reports no error.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.scheduler.clear();
        self.update_view(|view| {
            view.phase = SessionPhase::Cancelled;
            view.failure = Some(RevealError::Cancelled);
            view.busy = false;
        });
    }
}
