//! The typed context threaded through every pipeline state.

use crate::core::{CameraInfo, GraspCandidate, InstanceGrid, InstanceMask, PointCloud};
use serde::Serialize;

/// The single mutable record flowing through a pipeline run.
///
/// Created once per run, mutated field-by-field by each state on success,
/// and handed back in the run report. The engine owns it and lends it to
/// exactly one state at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineContext {
    /// Image to segment. Empty means "use the configured default".
    pub image_name: String,
    /// Cloud to segment when segmenting from a point cloud.
    #[serde(skip)]
    pub cloud_in: Option<PointCloud>,
    /// Calibration sent along with `cloud_in`, if known.
    pub camera_info: Option<CameraInfo>,
    /// Full structured segmentation document.
    pub segmentation_result: serde_json::Value,
    /// Where the segmentation service put its outputs; may be empty.
    pub result_directory: String,
    /// Per-instance class labels, as reported by cloud segmentation.
    pub classes: Vec<serde_json::Value>,
    /// Per-instance bounding boxes, as reported by cloud segmentation.
    pub bboxes: Vec<serde_json::Value>,
    /// Per-pixel instance labels.
    pub instance_id_grid: InstanceGrid,
    /// Sorted unique non-background ids in the grid.
    pub instance_id_list: Vec<i32>,
    /// One mask per entry of `instance_id_list`, same order.
    #[serde(skip)]
    pub instance_masks: Vec<InstanceMask>,
    /// The instance chosen for grasping.
    pub target_instance_id: i32,
    /// Scene the target belongs to.
    pub scene_name: String,
    /// Grasp candidates, best first.
    pub grasp_candidates: Vec<GraspCandidate>,
    /// Index of the candidate currently being executed.
    pub grasp_cursor: usize,
    /// Last human-readable status or error text.
    pub diagnostic_message: String,
}

impl PipelineContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context that will segment the named image.
    #[must_use]
    pub fn with_image_name(mut self, image_name: impl Into<String>) -> Self {
        self.image_name = image_name.into();
        self
    }

    /// Creates a context that will segment `cloud`.
    #[must_use]
    pub fn with_cloud(mut self, cloud: PointCloud, camera_info: Option<CameraInfo>) -> Self {
        self.cloud_in = Some(cloud);
        self.camera_info = camera_info;
        self
    }

    /// Replaces the diagnostic message.
    pub fn set_message(&mut self, message: impl Into<String>) {
        self.diagnostic_message = message.into();
    }

    /// The candidate under the cursor, if any remain.
    #[must_use]
    pub fn current_candidate(&self) -> Option<&GraspCandidate> {
        self.grasp_candidates.get(self.grasp_cursor)
    }

    /// True once the cursor has moved past the last candidate.
    #[must_use]
    pub fn candidates_exhausted(&self) -> bool {
        self.grasp_cursor >= self.grasp_candidates.len()
    }

    /// True if another candidate follows the current one.
    #[must_use]
    pub fn has_next_candidate(&self) -> bool {
        self.grasp_cursor + 1 < self.grasp_candidates.len()
    }

    /// Mask belonging to `instance_id`, if it is a known instance.
    #[must_use]
    pub fn mask_for(&self, instance_id: i32) -> Option<&InstanceMask> {
        self.instance_id_list
            .binary_search(&instance_id)
            .ok()
            .and_then(|i| self.instance_masks.get(i))
    }
}
