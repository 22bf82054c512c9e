//! Grasp sampling for the selected instance.

use super::{PipelineState, StateOutcome};
use crate::config::{PipelineConfig, SamplingConfig};
use crate::context::{ContextField, PipelineContext};
use crate::core::{GraspCandidate, StateId};
use crate::errors::{GraspflowError, Result};
use crate::events::EventSink;
use crate::services::{
    GraspSamplingClient, GraspSamplingRequest, GraspSamplingResponse, ServiceGateway,
};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

const READS: &[ContextField] = &[
    ContextField::InstanceIdList,
    ContextField::TargetInstanceId,
    ContextField::SceneName,
];
const WRITES: &[ContextField] = &[
    ContextField::GraspCandidates,
    ContextField::GraspCursor,
    ContextField::DiagnosticMessage,
];

/// Requests grasp candidates for the target instance.
pub struct SampleGraspsState {
    client: Arc<GraspSamplingClient>,
    gateway: ServiceGateway,
    timeout: Duration,
    sampling: SamplingConfig,
}

impl SampleGraspsState {
    /// Creates the state from pipeline configuration.
    #[must_use]
    pub fn new(client: Arc<GraspSamplingClient>, config: &PipelineConfig) -> Self {
        Self {
            client,
            gateway: ServiceGateway::new(config.poll.clone()),
            timeout: config.grasp_sampling.timeout(),
            sampling: config.sampling.clone(),
        }
    }

    fn request(&self, ctx: &PipelineContext) -> GraspSamplingRequest {
        GraspSamplingRequest {
            dataset_root: self.sampling.dataset_root.clone(),
            dataset_name: self.sampling.dataset_name.clone(),
            checkpoint_path: self.sampling.checkpoint_path.clone(),
            sam_encoder_type: self.sampling.sam_encoder_type.clone(),
            no_grasps: self.sampling.no_grasps,
            seen_set: self.sampling.seen_set,
            target_instance_id: ctx.target_instance_id,
            scene_name: ctx.scene_name.clone(),
        }
    }

    async fn sample(&self, ctx: &mut PipelineContext) -> Result<()> {
        self.validate(ctx)?;
        info!(
            service = %self.client.name(),
            target = ctx.target_instance_id,
            requested = self.sampling.no_grasps,
            "Requesting grasp candidates"
        );

        let request = self.request(ctx);
        let response = self.gateway.call(&*self.client, request, self.timeout).await?;
        let message = response.message.clone();
        let candidates = rank_candidates(response)?;

        info!(count = candidates.len(), "Received grasp candidates");
        ctx.grasp_candidates = candidates;
        ctx.grasp_cursor = 0;
        ctx.set_message(message);
        Ok(())
    }
}

/// Turns a sampling response into candidates, best first.
///
/// Without scores the sampler's own order is kept. With scores the poses are
/// stably sorted by descending score, NaN last.
fn rank_candidates(response: GraspSamplingResponse) -> Result<Vec<GraspCandidate>> {
    if !response.done {
        let message = if response.message.is_empty() {
            "Grasp sampling failed.".to_string()
        } else {
            response.message
        };
        return Err(GraspflowError::GraspSamplingFailure(message));
    }
    if response.grasp_target_poses.is_empty() {
        return Err(GraspflowError::GraspSamplingFailure(
            "no grasp candidates returned".to_string(),
        ));
    }

    if response.grasp_scores.is_empty() {
        return Ok(response
            .grasp_target_poses
            .into_iter()
            .map(GraspCandidate::unscored)
            .collect());
    }

    if response.grasp_scores.len() != response.grasp_target_poses.len() {
        return Err(GraspflowError::ParseError(format!(
            "{} grasp scores for {} poses",
            response.grasp_scores.len(),
            response.grasp_target_poses.len()
        )));
    }

    let mut candidates: Vec<GraspCandidate> = response
        .grasp_target_poses
        .into_iter()
        .zip(response.grasp_scores)
        .map(|(pose, score)| GraspCandidate::scored(pose, score))
        .collect();
    candidates.sort_by(|a, b| descending_score(a.score, b.score));
    Ok(candidates)
}

fn descending_score(a: Option<f64>, b: Option<f64>) -> Ordering {
    let (a, b) = (a.unwrap_or(f64::NAN), b.unwrap_or(f64::NAN));
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

impl fmt::Debug for SampleGraspsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleGraspsState")
            .field("service", &self.client.name())
            .field("timeout", &self.timeout)
            .field("sampling", &self.sampling)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineState for SampleGraspsState {
    fn id(&self) -> StateId {
        StateId::SampleGrasps
    }

    fn reads(&self) -> &'static [ContextField] {
        READS
    }

    fn writes(&self) -> &'static [ContextField] {
        WRITES
    }

    fn validate(&self, ctx: &PipelineContext) -> Result<()> {
        if !ctx.instance_id_list.contains(&ctx.target_instance_id) {
            return Err(GraspflowError::InvalidSelection {
                selected: ctx.target_instance_id,
                available: ctx.instance_id_list.clone(),
            });
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut PipelineContext, _events: &dyn EventSink) -> StateOutcome {
        let result = self.sample(ctx).await;
        if let Err(ref e) = result {
            error!(error = %e, "Grasp sampling state failed");
        }
        result.into()
    }
}
