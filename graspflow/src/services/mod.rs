//! Service gateway and message types.
//!
//! This module provides:
//! - The [`ServiceClient`] seam every transport implements
//! - [`ServiceGateway`], which guards each call with a bounded availability wait
//! - The poll schedule and the [`wait_until`] primitive behind it
//! - Request/response types for image and cloud segmentation, grasp sampling
//!   and motion

mod gateway;
mod messages;
mod poll;

pub use gateway::{ServiceClient, ServiceGateway};
pub use messages::{
    CloudSegmentationRequest, GraspSamplingRequest, GraspSamplingResponse, MotionRequest,
    MotionResponse, SegmentationRequest, SegmentationResponse,
};
pub use poll::{wait_until, BackoffStrategy, JitterStrategy, PollConfig};

/// Client for the segmentation service.
pub type SegmentationClient =
    dyn ServiceClient<Request = SegmentationRequest, Response = SegmentationResponse>;

/// Client for the cloud segmentation service.
pub type CloudSegmentationClient =
    dyn ServiceClient<Request = CloudSegmentationRequest, Response = SegmentationResponse>;

/// Client for the grasp-sampling service.
pub type GraspSamplingClient =
    dyn ServiceClient<Request = GraspSamplingRequest, Response = GraspSamplingResponse>;

/// Client for the motion service.
pub type MotionClient = dyn ServiceClient<Request = MotionRequest, Response = MotionResponse>;
