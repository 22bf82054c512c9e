//! Canned service responses and a bundle of scripted services.

use std::sync::Arc;

use super::ScriptedService;
use crate::core::{CameraInfo, MotionStatus, PointCloud, Pose};
use crate::services::{
    CloudSegmentationRequest, GraspSamplingRequest, GraspSamplingResponse, MotionRequest,
    MotionResponse, SegmentationRequest, SegmentationResponse,
};

/// A successful segmentation response carrying `rows` as the instance grid.
#[must_use]
pub fn segmentation_ok(rows: &[Vec<i32>]) -> SegmentationResponse {
    segmentation_with_document(&serde_json::json!({
        "instance_ids": rows,
        "result_dir": "/tmp/ucn_io/out/segmentation_from_rgbd",
    }))
}

/// A successful segmentation response with an arbitrary document.
#[must_use]
pub fn segmentation_with_document(document: &serde_json::Value) -> SegmentationResponse {
    SegmentationResponse {
        success: true,
        json_result: document.to_string(),
        log_output: "segmentation ok".to_string(),
        result_dir: String::new(),
    }
}

/// A segmentation response reporting failure.
#[must_use]
pub fn segmentation_failed(log: &str) -> SegmentationResponse {
    SegmentationResponse {
        success: false,
        json_result: String::new(),
        log_output: log.to_string(),
        result_dir: String::new(),
    }
}

/// A small organized cloud of `width x height` zeroed XYZ float points.
#[must_use]
pub fn point_cloud(width: u32, height: u32) -> PointCloud {
    let point_step = 12;
    PointCloud {
        frame_id: "camera_depth_optical_frame".to_string(),
        width,
        height,
        point_step,
        row_step: point_step * width,
        is_dense: true,
        data: vec![0; (point_step * width * height) as usize],
    }
}

/// Calibration for a 640x480 camera.
#[must_use]
pub fn camera_info() -> CameraInfo {
    CameraInfo {
        frame_id: "camera_color_optical_frame".to_string(),
        width: 640,
        height: 480,
        k: [615.0, 0.0, 320.0, 0.0, 615.0, 240.0, 0.0, 0.0, 1.0],
    }
}

/// A successful sampling response with one pose per score.
///
/// Pose `i` sits at `x = i`, so tests can tell which pose landed where.
#[must_use]
pub fn sampling_ok(scores: &[f64]) -> GraspSamplingResponse {
    GraspSamplingResponse {
        done: true,
        grasp_target_poses: (0..scores.len()).map(|i| Pose::at(i as f64, 0.0, 0.0)).collect(),
        grasp_scores: scores.to_vec(),
        message: format!("sampled {} grasps", scores.len()),
    }
}

/// A motion response with the given outcome.
#[must_use]
pub fn motion(outcome: MotionStatus) -> MotionResponse {
    MotionResponse {
        outcome,
        message: format!("motion {outcome}"),
    }
}

/// Scripted segmentation service.
pub type ScriptedSegmentation = ScriptedService<SegmentationRequest, SegmentationResponse>;
/// Scripted cloud segmentation service.
pub type ScriptedCloudSegmentation =
    ScriptedService<CloudSegmentationRequest, SegmentationResponse>;
/// Scripted grasp-sampling service.
pub type ScriptedSampling = ScriptedService<GraspSamplingRequest, GraspSamplingResponse>;
/// Scripted motion service.
pub type ScriptedMotion = ScriptedService<MotionRequest, MotionResponse>;

/// One scripted instance of each external service.
#[derive(Debug, Clone)]
pub struct TestServices {
    /// Segmentation service.
    pub segmentation: Arc<ScriptedSegmentation>,
    /// Grasp-sampling service.
    pub sampling: Arc<ScriptedSampling>,
    /// Motion service.
    pub motion: Arc<ScriptedMotion>,
}

impl Default for TestServices {
    fn default() -> Self {
        Self::new()
    }
}

impl TestServices {
    /// Creates always-available services with empty scripts.
    #[must_use]
    pub fn new() -> Self {
        Self {
            segmentation: Arc::new(ScriptedService::new("/segmentation_rgbd")),
            sampling: Arc::new(ScriptedService::new("/run_graspsam")),
            motion: Arc::new(ScriptedService::new("/move_to_pose")),
        }
    }

    /// Total calls made to the sampling and motion services.
    #[must_use]
    pub fn downstream_calls(&self) -> usize {
        self.sampling.call_count() + self.motion.call_count()
    }
}
