//! # Graspflow
//!
//! A perception-to-grasp pipeline engine.
//!
//! A run moves through four states in a fixed order:
//!
//! - **Segment**: ask the segmentation service for a per-pixel instance map
//!   and split it into one binary mask per instance
//! - **SelectInstance**: pick the grasp target with a pluggable strategy
//! - **SampleGrasps**: ask the grasp sampler for candidate poses, best first
//! - **ExecuteMotion**: try candidates in order until one succeeds
//!
//! Every run ends in `Finished` or `Failed`. Service transports live behind
//! the [`services::ServiceClient`] trait; every call waits for the service
//! with a bounded poll before issuing exactly one request.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use graspflow::prelude::*;
//!
//! let pipeline = PipelineBuilder::new(PipelineConfig::from_path("graspflow.json")?)
//!     .segmentation(segmentation_client)
//!     .grasp_sampling(sampling_client)
//!     .motion(motion_client)
//!     .build()?;
//!
//! let run = pipeline.run_default().await;
//! println!("{}: {}", run.outcome, run.context.diagnostic_message);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod masks;
pub mod observability;
pub mod pipeline;
pub mod services;
pub mod states;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{PipelineConfig, SamplingConfig, ServiceEndpoint};
    pub use crate::context::{ContextField, ContextSnapshot, PipelineContext};
    pub use crate::core::{
        CameraInfo, GraspCandidate, Grid, InstanceGrid, InstanceMask, MotionStatus, Outcome,
        PointCloud, Pose, StateId,
    };
    pub use crate::errors::{BuildError, ConfigError, FailureInfo, GraspflowError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::masks::{build_masks, InstanceMasks};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{Pipeline, PipelineBuilder, PipelineRun};
    pub use crate::services::{PollConfig, ServiceClient, ServiceGateway};
    pub use crate::states::{
        InstanceSelector, LargestInstanceSelector, LowestIdSelector, PipelineState,
        SegmentationSource, Selection, StateOutcome,
    };
}
