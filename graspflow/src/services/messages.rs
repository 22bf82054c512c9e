//! Request and response shapes for the three external services.
//!
//! These mirror the service definitions the transport layer speaks; how they
//! are encoded on the wire is up to each [`super::ServiceClient`].

use crate::core::{CameraInfo, MotionStatus, PointCloud, Pose};
use serde::{Deserialize, Serialize};

/// Request for the segmentation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationRequest {
    /// Name of the image (or capture) to segment.
    pub image_name: String,
}

/// Request for the cloud segmentation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudSegmentationRequest {
    /// Cloud to segment.
    pub cloud: PointCloud,
    /// Calibration of the capturing camera, when known.
    #[serde(default)]
    pub camera_info: Option<CameraInfo>,
}

/// Response from either segmentation service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentationResponse {
    /// Whether segmentation succeeded.
    pub success: bool,
    /// JSON document with `instance_ids`, `result_dir`, `base_output_dir`.
    #[serde(default)]
    pub json_result: String,
    /// Server-side log text.
    #[serde(default)]
    pub log_output: String,
    /// Output directory, when the server reports it outside the document.
    #[serde(default)]
    pub result_dir: String,
}

/// Request for the grasp-sampling service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraspSamplingRequest {
    /// Dataset root directory.
    pub dataset_root: String,
    /// Dataset (scene source) name.
    pub dataset_name: String,
    /// Model checkpoint path.
    pub checkpoint_path: String,
    /// Image encoder variant.
    pub sam_encoder_type: String,
    /// Number of grasps requested.
    pub no_grasps: u32,
    /// Whether the object belongs to the seen set.
    pub seen_set: bool,
    /// Instance chosen as the grasp target.
    #[serde(default)]
    pub target_instance_id: i32,
    /// Scene the target belongs to.
    #[serde(default)]
    pub scene_name: String,
}

/// Response from the grasp-sampling service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraspSamplingResponse {
    /// Whether sampling succeeded.
    pub done: bool,
    /// Sampled poses in the sampler's ranking order.
    #[serde(default)]
    pub grasp_target_poses: Vec<Pose>,
    /// Optional per-pose scores, same length as the poses.
    #[serde(default)]
    pub grasp_scores: Vec<f64>,
    /// Status text.
    #[serde(default)]
    pub message: String,
}

/// Request for the motion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionRequest {
    /// All candidate poses, best first.
    pub grasp_poses: Vec<Pose>,
    /// Index of the pose to execute.
    pub grasp_index: usize,
}

/// Response from the motion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionResponse {
    /// How the attempt went.
    pub outcome: MotionStatus,
    /// Status text.
    #[serde(default)]
    pub message: String,
}

impl MotionResponse {
    /// A response with the given outcome and no message.
    #[must_use]
    pub fn new(outcome: MotionStatus) -> Self {
        Self {
            outcome,
            message: String::new(),
        }
    }
}
