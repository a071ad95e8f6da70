//! Common imports for typical usage.
pub use crate::{
    AbortHandle, PayloadShape, PipelineConfig, RevealController, RevealError, SessionHandle,
    SessionPhase, ViewState, WorkflowOverrides,
};
