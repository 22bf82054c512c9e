//! Event sink system for observability.
//!
//! The pipeline engine reports every state entry, completion and failure
//! through an [`EventSink`]; the default sink forwards them to `tracing`.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event emitted when a run begins.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Event emitted when a run ends in `Finished`.
pub const PIPELINE_FINISHED: &str = "pipeline.finished";
/// Event emitted when a run ends in `Failed`.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
/// Event emitted on every state visit.
pub const STATE_ENTERED: &str = "state.entered";
/// Event emitted when a state succeeds.
pub const STATE_COMPLETED: &str = "state.completed";
/// Event emitted when a state fails.
pub const STATE_FAILED: &str = "state.failed";
/// Event emitted when one grasp candidate fails and the next will be tried.
pub const CANDIDATE_FAILED: &str = "motion.candidate_failed";
