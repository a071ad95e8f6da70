//! Incremental stream-to-display pipeline for streamed workflow runs.
//!
//! A workflow endpoint answers a `POST` with event-stream frames whose
//! payloads carry the *whole* text produced so far. The pipeline splits the
//! byte stream into frames, recovers loosely formatted JSON payloads, keeps
//! only the newly appended text, cuts it into readable chunks and reveals them
//! at a fixed cadence.
//!
//! ```no_run
//! use workflow_reveal::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), RevealError> {
//! let mut controller = RevealController::with_reqwest(PipelineConfig::video_runner().with_env())?;
//! let mut view = controller.subscribe();
//! let session = controller.submit("https://www.douyin.com/video/7522")?;
//!
//! tokio::spawn(async move {
//!     while view.changed().await.is_ok() {
//!         println!("{}", view.borrow_and_update().text);
//!     }
//! });
//!
//! let last = session.wait().await?;
//! println!("{:?}: {}", last.phase, last.text);
//! # Ok(())
//! # }
//! ```

/// Pipeline configuration and the two page presets.
pub mod config;
/// Session controller: submit, cancel, observe.
pub mod controller;
/// Cumulative-text delta engine.
pub mod delta;
/// Public error type.
pub mod errors;
/// Canonical record extraction from event payloads.
pub mod extract;
/// Process-wide tracing setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Best-effort JSON recovery.
pub mod recover;
/// Fixed-cadence reveal scheduler.
pub mod reveal;
/// Boundary-aware text segmenter.
pub mod segment;
/// Per-request session state.
pub mod session;
/// Event-stream framing.
pub mod sse;
/// Workflow transport contract and the HTTP implementation.
pub mod transport;
/// Observable UI state.
pub mod view;

pub use config::{PipelineConfig, WorkflowOverrides};
pub use controller::{AbortHandle, RevealController, SessionHandle};
pub use errors::RevealError;
pub use extract::{CanonicalPayload, PayloadShape};
pub use recover::Recovered;
pub use segment::Segmenter;
pub use session::StreamSession;
pub use transport::{ByteStream, ReqwestTransport, WorkflowRequest, WorkflowTransport};
pub use view::{SessionPhase, ViewState};
