//! Motion execution over the ranked grasp candidates.
//!
//! This is the pipeline's only retry loop. Each attempt executes the
//! candidate under `grasp_cursor`; a `next` reply advances the cursor and
//! tries again, so the loop runs at most once per candidate.

use super::{PipelineState, StateOutcome};
use crate::config::PipelineConfig;
use crate::context::{ContextField, PipelineContext};
use crate::core::{MotionStatus, Pose, StateId};
use crate::errors::GraspflowError;
use crate::events::{EventSink, CANDIDATE_FAILED};
use crate::services::{MotionClient, MotionRequest, ServiceGateway};
use async_trait::async_trait;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const READS: &[ContextField] = &[ContextField::GraspCandidates, ContextField::GraspCursor];
const WRITES: &[ContextField] = &[ContextField::GraspCursor, ContextField::DiagnosticMessage];

/// Result of a single candidate attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionStep {
    /// The motion succeeded.
    Done,
    /// The candidate failed and the cursor moved to the next one.
    Next,
    /// Fatal error or no candidates left.
    Failed(GraspflowError),
}

/// Executes grasp candidates in order until one succeeds.
pub struct ExecuteMotionState {
    client: Arc<MotionClient>,
    gateway: ServiceGateway,
    timeout: Duration,
}

impl ExecuteMotionState {
    /// Creates the state from pipeline configuration.
    #[must_use]
    pub fn new(client: Arc<MotionClient>, config: &PipelineConfig) -> Self {
        Self {
            client,
            gateway: ServiceGateway::new(config.poll.clone()),
            timeout: config.motion.timeout(),
        }
    }

    /// Attempts the candidate under the cursor.
    ///
    /// The cursor only moves forward: by one on a `next` reply with more
    /// candidates left, or to the end when the candidates are exhausted.
    /// Service errors leave it where it is.
    pub async fn attempt_current(&self, ctx: &mut PipelineContext) -> MotionStep {
        let total = ctx.grasp_candidates.len();
        if ctx.candidates_exhausted() {
            ctx.grasp_cursor = total;
            ctx.set_message(exhausted_message(total));
            return MotionStep::Failed(GraspflowError::MotionFailure(exhausted_message(total)));
        }

        let index = ctx.grasp_cursor;
        let score = ctx.current_candidate().and_then(|c| c.score);
        info!(
            service = %self.client.name(),
            candidate = index,
            total,
            score = ?score,
            "Executing grasp candidate"
        );

        let request = MotionRequest {
            grasp_poses: poses(ctx),
            grasp_index: index,
        };
        let response = match self.gateway.call(&*self.client, request, self.timeout).await {
            Ok(response) => response,
            Err(e) => return MotionStep::Failed(e),
        };

        match response.outcome {
            MotionStatus::Done => {
                info!(candidate = index, "Motion succeeded");
                let message = if response.message.is_empty() {
                    format!("grasp candidate {index} executed")
                } else {
                    response.message
                };
                ctx.set_message(message);
                MotionStep::Done
            }
            MotionStatus::Next if ctx.has_next_candidate() => {
                warn!(
                    candidate = index,
                    reason = %response.message,
                    "Grasp candidate failed, trying next"
                );
                ctx.grasp_cursor += 1;
                ctx.set_message(response.message);
                MotionStep::Next
            }
            MotionStatus::Next => {
                ctx.grasp_cursor = total;
                MotionStep::Failed(GraspflowError::MotionFailure(exhausted_message(total)))
            }
            MotionStatus::Failed => {
                let message = if response.message.is_empty() {
                    format!("motion failed on grasp candidate {index}")
                } else {
                    response.message
                };
                MotionStep::Failed(GraspflowError::MotionFailure(message))
            }
        }
    }
}

fn exhausted_message(total: usize) -> String {
    format!("all {total} grasp candidates exhausted")
}

fn poses(ctx: &PipelineContext) -> Vec<Pose> {
    ctx.grasp_candidates.iter().map(|c| c.pose).collect()
}

impl fmt::Debug for ExecuteMotionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecuteMotionState")
            .field("service", &self.client.name())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineState for ExecuteMotionState {
    fn id(&self) -> StateId {
        StateId::ExecuteMotion
    }

    fn reads(&self) -> &'static [ContextField] {
        READS
    }

    fn writes(&self) -> &'static [ContextField] {
        WRITES
    }

    async fn execute(&self, ctx: &mut PipelineContext, events: &dyn EventSink) -> StateOutcome {
        // Every attempt either finishes, fails, or advances the cursor, so
        // this runs at most once per candidate.
        for _ in 0..=ctx.grasp_candidates.len() {
            let attempted = ctx.grasp_cursor;
            match self.attempt_current(ctx).await {
                MotionStep::Done => return StateOutcome::Done,
                MotionStep::Next => events.emit(
                    CANDIDATE_FAILED,
                    Some(json!({
                        "candidate": attempted,
                        "next": ctx.grasp_cursor,
                        "total": ctx.grasp_candidates.len(),
                        "message": ctx.diagnostic_message,
                    })),
                ),
                MotionStep::Failed(e) => {
                    error!(error = %e, cursor = ctx.grasp_cursor, "Motion state failed");
                    return StateOutcome::Failed(e);
                }
            }
        }
        let total = ctx.grasp_candidates.len();
        ctx.grasp_cursor = total;
        StateOutcome::Failed(GraspflowError::MotionFailure(exhausted_message(total)))
    }
}
