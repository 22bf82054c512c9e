//! State identifiers and outcome enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The named states of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateId {
    /// Segment the scene into object instances.
    Segment,
    /// Choose one instance as the grasp target.
    SelectInstance,
    /// Sample grasp candidates for the target.
    SampleGrasps,
    /// Drive the motion executor through the candidates.
    ExecuteMotion,
}

impl StateId {
    /// All states in their fixed execution order.
    pub const ORDER: [Self; 4] = [
        Self::Segment,
        Self::SelectInstance,
        Self::SampleGrasps,
        Self::ExecuteMotion,
    ];

    /// Stable label used in logs and events.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Segment => "Segment",
            Self::SelectInstance => "SelectInstance",
            Self::SampleGrasps => "SampleGrasps",
            Self::ExecuteMotion => "ExecuteMotion",
        }
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Terminal outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// A motion attempt succeeded.
    Finished,
    /// A state reported an error or candidates were exhausted.
    Failed,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Result reported by the motion service for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionStatus {
    /// The motion succeeded.
    Done,
    /// This candidate failed; another may be tried.
    Next,
    /// A fatal failure; stop trying.
    Failed,
}

impl fmt::Display for MotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::Next => write!(f, "next"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
