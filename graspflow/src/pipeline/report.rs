//! Run reports.

use crate::context::{ContextSnapshot, PipelineContext};
use crate::core::{Outcome, StateId};
use crate::errors::{FailureInfo, GraspflowError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Everything a caller needs to know about one finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    /// Unique id of this run.
    pub run_id: Uuid,
    /// Configured behavior name.
    pub behavior_name: String,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// The context as the last state left it.
    pub context: PipelineContext,
    /// States entered, in order.
    pub visited: Vec<StateId>,
    /// The error that ended the run, if it failed.
    #[serde(skip)]
    pub error: Option<GraspflowError>,
    /// Serializable form of `error`.
    pub failure: Option<FailureInfo>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl PipelineRun {
    /// True if the run ended in `Finished`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.outcome == Outcome::Finished
    }

    /// The state that reported the terminal failure.
    #[must_use]
    pub fn failed_state(&self) -> Option<StateId> {
        self.error.as_ref().and(self.visited.last().copied())
    }

    /// Compact JSON summary for logs and events.
    #[must_use]
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "run_id": self.run_id.to_string(),
            "behavior": self.behavior_name,
            "outcome": self.outcome,
            "visited": self.visited,
            "failure": self.failure,
            "duration_ms": self.duration_ms,
            "context": ContextSnapshot::from(&self.context).to_value(),
        })
    }
}
