//! Names of context fields, used to declare state read/write contracts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A field of [`super::PipelineContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextField {
    /// `image_name`
    ImageName,
    /// `cloud_in`
    CloudIn,
    /// `camera_info`
    CameraInfo,
    /// `segmentation_result`
    SegmentationResult,
    /// `result_directory`
    ResultDirectory,
    /// `classes`
    Classes,
    /// `bboxes`
    Bboxes,
    /// `instance_id_grid`
    InstanceIdGrid,
    /// `instance_id_list`
    InstanceIdList,
    /// `instance_masks`
    InstanceMasks,
    /// `target_instance_id`
    TargetInstanceId,
    /// `scene_name`
    SceneName,
    /// `grasp_candidates`
    GraspCandidates,
    /// `grasp_cursor`
    GraspCursor,
    /// `diagnostic_message`
    DiagnosticMessage,
}

impl ContextField {
    /// Fields meaningful before any state has run.
    pub const SEEDED: [Self; 4] = [
        Self::ImageName,
        Self::CloudIn,
        Self::CameraInfo,
        Self::DiagnosticMessage,
    ];

    /// Field name as it appears on the context struct.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImageName => "image_name",
            Self::CloudIn => "cloud_in",
            Self::CameraInfo => "camera_info",
            Self::SegmentationResult => "segmentation_result",
            Self::ResultDirectory => "result_directory",
            Self::Classes => "classes",
            Self::Bboxes => "bboxes",
            Self::InstanceIdGrid => "instance_id_grid",
            Self::InstanceIdList => "instance_id_list",
            Self::InstanceMasks => "instance_masks",
            Self::TargetInstanceId => "target_instance_id",
            Self::SceneName => "scene_name",
            Self::GraspCandidates => "grasp_candidates",
            Self::GraspCursor => "grasp_cursor",
            Self::DiagnosticMessage => "diagnostic_message",
        }
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
