//! The pipeline engine.

use super::report::PipelineRun;
use super::transitions::{transition, Next};
use crate::config::PipelineConfig;
use crate::context::{ContextSnapshot, PipelineContext};
use crate::core::{Outcome, StateId};
use crate::errors::{FailureInfo, GraspflowError};
use crate::events::{
    EventSink, PIPELINE_FAILED, PIPELINE_FINISHED, PIPELINE_STARTED, STATE_COMPLETED,
    STATE_ENTERED, STATE_FAILED,
};
use crate::states::{PipelineState, StateOutcome};
use chrono::Utc;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

/// A built pipeline: the four states, their configuration and an event sink.
///
/// One state runs at a time. The engine owns the context for the duration of
/// a run and lends it to the active state.
pub struct Pipeline {
    config: PipelineConfig,
    states: Vec<Box<dyn PipelineState>>,
    events: Arc<dyn EventSink>,
}

impl Pipeline {
    pub(super) fn new(
        config: PipelineConfig,
        states: Vec<Box<dyn PipelineState>>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            states,
            events,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the ids of the states in execution order.
    #[must_use]
    pub fn state_ids(&self) -> Vec<StateId> {
        self.states.iter().map(|s| s.id()).collect()
    }

    fn state(&self, id: StateId) -> Option<&dyn PipelineState> {
        self.states.iter().find(|s| s.id() == id).map(|s| s.as_ref())
    }

    /// Runs the pipeline with an empty context, so segmentation uses the
    /// configured default image.
    pub async fn run_default(&self) -> PipelineRun {
        self.run(PipelineContext::new()).await
    }

    /// Runs the pipeline to a terminal outcome.
    ///
    /// Never returns an error: every failure ends the run in
    /// [`Outcome::Failed`] with the error recorded in the report and its
    /// [`GraspflowError::diagnostic`] text in `diagnostic_message`.
    pub async fn run(&self, ctx: PipelineContext) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id, behavior = %self.config.behavior_name);
        self.run_inner(run_id, ctx).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid, mut ctx: PipelineContext) -> PipelineRun {
        let started_at = Utc::now();
        let started = Instant::now();
        let mut visited = Vec::with_capacity(StateId::ORDER.len());
        let mut failure: Option<(StateId, GraspflowError)> = None;

        info!(image = %ctx.image_name, "Pipeline started");
        self.events.emit(
            PIPELINE_STARTED,
            Some(json!({
                "run_id": run_id.to_string(),
                "behavior": self.config.behavior_name,
                "image_name": ctx.image_name,
            })),
        );

        let mut current = StateId::Segment;
        let outcome = loop {
            visited.push(current);
            self.events.emit(STATE_ENTERED, Some(json!({"state": current.label()})));

            let result = match self.state(current) {
                Some(state) => state.execute(&mut ctx, self.events.as_ref()).await,
                None => StateOutcome::Failed(GraspflowError::ContractViolation {
                    state: current.to_string(),
                    field: "state not registered".to_string(),
                }),
            };

            match &result {
                StateOutcome::Done => {
                    info!(state = %current, "State completed");
                    self.events.emit(
                        STATE_COMPLETED,
                        Some(json!({
                            "state": current.label(),
                            "context": ContextSnapshot::from(&ctx).to_value(),
                        })),
                    );
                }
                StateOutcome::Failed(e) => {
                    error!(
                        state = %current,
                        code = e.code(),
                        service_error = e.is_service_error(),
                        error = %e,
                        "State failed"
                    );
                    ctx.set_message(e.diagnostic());
                    self.events.emit(
                        STATE_FAILED,
                        Some(json!({
                            "state": current.label(),
                            "service_error": e.is_service_error(),
                            "error": e.to_dict(),
                        })),
                    );
                }
            }

            let next = transition(current, &result);
            if let StateOutcome::Failed(e) = result {
                failure = Some((current, e));
            }
            match next {
                Next::State(state) => current = state,
                Next::Terminal(outcome) => break outcome,
            }
        };

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        let failure_info = failure
            .as_ref()
            .map(|(state, e)| FailureInfo::new(state.label(), e));

        let event = match outcome {
            Outcome::Finished => PIPELINE_FINISHED,
            Outcome::Failed => PIPELINE_FAILED,
        };
        info!(%outcome, duration_ms, cursor = ctx.grasp_cursor, "Pipeline ended");
        self.events.emit(
            event,
            Some(json!({
                "run_id": run_id.to_string(),
                "outcome": outcome,
                "duration_ms": duration_ms,
                "failure": failure_info,
            })),
        );

        PipelineRun {
            run_id,
            behavior_name: self.config.behavior_name.clone(),
            outcome,
            context: ctx,
            visited,
            error: failure.map(|(_, e)| e),
            failure: failure_info,
            started_at,
            finished_at: Utc::now(),
            duration_ms,
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("behavior", &self.config.behavior_name)
            .field("states", &self.states)
            .finish_non_exhaustive()
    }
}
