//! Pipeline states.
//!
//! Each state is a thin adapter: validate inputs, call one service through
//! the gateway, validate and parse the response, then write its outputs to
//! the context or report a failure.

mod motion;
mod sample;
mod segment;
mod select;

pub use motion::{ExecuteMotionState, MotionStep};
pub use sample::SampleGraspsState;
pub use segment::{SegmentState, SegmentationSource, DEFAULT_CLOUD_OUTPUT_BASE};
pub use select::{
    InstanceSelector, LargestInstanceSelector, LowestIdSelector, SelectInstanceState, Selection,
};

use crate::context::{ContextField, PipelineContext};
use crate::core::StateId;
use crate::errors::{GraspflowError, Result};
use crate::events::EventSink;
use async_trait::async_trait;
use std::fmt::Debug;

/// What a state reports back to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum StateOutcome {
    /// The state did its work; the engine follows the success edge.
    Done,
    /// The state failed; the engine routes to `Failed`.
    Failed(GraspflowError),
}

impl StateOutcome {
    /// Returns true for [`StateOutcome::Done`].
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl From<Result<()>> for StateOutcome {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::Done,
            Err(e) => Self::Failed(e),
        }
    }
}

/// Trait for pipeline states.
///
/// `reads` and `writes` declare the context fields the state consumes and
/// produces; the pipeline builder checks them so that no state reads a field
/// before an earlier state has written it.
#[async_trait]
pub trait PipelineState: Send + Sync + Debug {
    /// Which state this is.
    fn id(&self) -> StateId;

    /// Context fields this state consumes.
    fn reads(&self) -> &'static [ContextField];

    /// Context fields this state produces.
    fn writes(&self) -> &'static [ContextField];

    /// Checks the state's inputs before any service is called.
    ///
    /// Implementations run this at the top of `execute`.
    fn validate(&self, _ctx: &PipelineContext) -> Result<()> {
        Ok(())
    }

    /// Runs the state against the context.
    async fn execute(&self, ctx: &mut PipelineContext, events: &dyn EventSink) -> StateOutcome;
}
