//! Pipeline builder with validation.

use super::Pipeline;
use crate::config::PipelineConfig;
use crate::context::ContextField;
use crate::errors::{BuildError, GraspflowError};
use crate::events::{EventSink, LoggingEventSink};
use crate::services::{
    CloudSegmentationClient, GraspSamplingClient, MotionClient, SegmentationClient,
};
use crate::states::{
    ExecuteMotionState, InstanceSelector, LowestIdSelector, PipelineState, SampleGraspsState,
    SegmentState, SegmentationSource, SelectInstanceState,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Builder for creating validated pipelines.
pub struct PipelineBuilder {
    config: PipelineConfig,
    segmentation: Option<SegmentationSource>,
    grasp_sampling: Option<Arc<GraspSamplingClient>>,
    motion: Option<Arc<MotionClient>>,
    selector: Arc<dyn InstanceSelector>,
    events: Arc<dyn EventSink>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl PipelineBuilder {
    /// Creates a builder around `config` with the default selector and a
    /// logging event sink.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            segmentation: None,
            grasp_sampling: None,
            motion: None,
            selector: Arc::new(LowestIdSelector),
            events: Arc::new(LoggingEventSink::default()),
        }
    }

    /// Segments a named image with `client`.
    #[must_use]
    pub fn segmentation(mut self, client: Arc<SegmentationClient>) -> Self {
        self.segmentation = Some(SegmentationSource::Image(client));
        self
    }

    /// Segments the context's point cloud with `client`, replacing any image
    /// segmentation client.
    #[must_use]
    pub fn cloud_segmentation(mut self, client: Arc<CloudSegmentationClient>) -> Self {
        self.segmentation = Some(SegmentationSource::Cloud(client));
        self
    }

    /// Sets the grasp-sampling client.
    #[must_use]
    pub fn grasp_sampling(mut self, client: Arc<GraspSamplingClient>) -> Self {
        self.grasp_sampling = Some(client);
        self
    }

    /// Sets the motion client.
    #[must_use]
    pub fn motion(mut self, client: Arc<MotionClient>) -> Self {
        self.motion = Some(client);
        self
    }

    /// Replaces the instance selection strategy.
    #[must_use]
    pub fn selector(mut self, selector: Arc<dyn InstanceSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the configuration the pipeline will be built with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Builds the pipeline.
    ///
    /// # Errors
    ///
    /// - [`BuildError::Config`] if the configuration does not validate.
    /// - [`BuildError::MissingClient`] if a service client was not supplied.
    /// - [`BuildError::Contract`] if a state reads a field no earlier state writes.
    pub fn build(self) -> Result<Pipeline, BuildError> {
        self.config.validate()?;

        let segmentation = self.segmentation.ok_or(BuildError::MissingClient("segmentation"))?;
        let grasp_sampling = self
            .grasp_sampling
            .ok_or(BuildError::MissingClient("grasp sampling"))?;
        let motion = self.motion.ok_or(BuildError::MissingClient("motion"))?;

        let states: Vec<Box<dyn PipelineState>> = vec![
            Box::new(SegmentState::with_source(segmentation, &self.config)),
            Box::new(SelectInstanceState::new(self.selector, &self.config)),
            Box::new(SampleGraspsState::new(grasp_sampling, &self.config)),
            Box::new(ExecuteMotionState::new(motion, &self.config)),
        ];
        validate_contracts(&states)?;

        Ok(Pipeline::new(self.config, states, self.events))
    }
}

impl fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("behavior", &self.config.behavior_name)
            .field("segmentation", &self.segmentation)
            .field(
                "grasp_sampling",
                &self.grasp_sampling.as_ref().map(|c| c.name().to_string()),
            )
            .field("motion", &self.motion.as_ref().map(|c| c.name().to_string()))
            .finish_non_exhaustive()
    }
}

/// Checks that every field a state reads was written by an earlier state
/// or is seeded by the caller.
///
/// # Errors
///
/// Returns [`GraspflowError::ContractViolation`] naming the first offending
/// state and field.
pub fn validate_contracts(states: &[Box<dyn PipelineState>]) -> Result<(), GraspflowError> {
    let mut produced: BTreeSet<ContextField> = ContextField::SEEDED.into_iter().collect();

    for state in states {
        if let Some(missing) = state.reads().iter().find(|f| !produced.contains(*f)) {
            return Err(GraspflowError::ContractViolation {
                state: state.id().to_string(),
                field: missing.to_string(),
            });
        }
        produced.extend(state.writes().iter().copied());
    }
    Ok(())
}
