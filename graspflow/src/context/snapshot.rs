//! Compact, serializable view of a context for events and logs.

use super::PipelineContext;
use serde::{Deserialize, Serialize};

/// A point-in-time summary of a [`PipelineContext`].
///
/// Grids and masks are reduced to shapes and counts so the snapshot stays
/// small enough to attach to every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Image name.
    pub image_name: String,
    /// Result directory.
    pub result_directory: String,
    /// `(rows, cols)` of the instance grid.
    pub grid_shape: (usize, usize),
    /// Instance ids.
    pub instance_ids: Vec<i32>,
    /// Selected target.
    pub target_instance_id: i32,
    /// Scene name.
    pub scene_name: String,
    /// Number of grasp candidates.
    pub candidate_count: usize,
    /// Candidate cursor.
    pub grasp_cursor: usize,
    /// Diagnostic message.
    pub diagnostic_message: String,
}

impl From<&PipelineContext> for ContextSnapshot {
    fn from(ctx: &PipelineContext) -> Self {
        Self {
            image_name: ctx.image_name.clone(),
            result_directory: ctx.result_directory.clone(),
            grid_shape: ctx.instance_id_grid.shape(),
            instance_ids: ctx.instance_id_list.clone(),
            target_instance_id: ctx.target_instance_id,
            scene_name: ctx.scene_name.clone(),
            candidate_count: ctx.grasp_candidates.len(),
            grasp_cursor: ctx.grasp_cursor,
            diagnostic_message: ctx.diagnostic_message.clone(),
        }
    }
}

impl ContextSnapshot {
    /// Converts to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
