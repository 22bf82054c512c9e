//! Target instance selection.

use super::{PipelineState, StateOutcome};
use crate::config::PipelineConfig;
use crate::context::{ContextField, PipelineContext};
use crate::core::StateId;
use crate::errors::{GraspflowError, Result};
use crate::events::EventSink;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

const READS: &[ContextField] = &[ContextField::InstanceIdList, ContextField::InstanceMasks];
const WRITES: &[ContextField] = &[
    ContextField::TargetInstanceId,
    ContextField::SceneName,
    ContextField::DiagnosticMessage,
];

/// The instance a selector picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Chosen instance id; must be in the context's instance list.
    pub target_instance_id: i32,
    /// Scene override. `None` uses the configured default scene.
    pub scene_name: Option<String>,
}

impl Selection {
    /// Selects `id` in the default scene.
    #[must_use]
    pub fn instance(id: i32) -> Self {
        Self {
            target_instance_id: id,
            scene_name: None,
        }
    }

    /// Sets the scene name.
    #[must_use]
    pub fn in_scene(mut self, scene: impl Into<String>) -> Self {
        self.scene_name = Some(scene.into());
        self
    }
}

/// Strategy that picks the grasp target among segmented instances.
///
/// Only called with a non-empty instance list. Returning `None` is treated
/// the same as an empty list.
#[cfg_attr(test, mockall::automock)]
pub trait InstanceSelector: Send + Sync {
    /// Chooses a target from the segmented context.
    fn select(&self, ctx: &PipelineContext) -> Option<Selection>;
}

/// Picks the lowest instance id.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestIdSelector;

impl InstanceSelector for LowestIdSelector {
    fn select(&self, ctx: &PipelineContext) -> Option<Selection> {
        ctx.instance_id_list.first().copied().map(Selection::instance)
    }
}

/// Picks the instance covering the most pixels; ties go to the lower id.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestInstanceSelector;

impl InstanceSelector for LargestInstanceSelector {
    fn select(&self, ctx: &PipelineContext) -> Option<Selection> {
        ctx.instance_id_list
            .iter()
            .filter_map(|&id| ctx.mask_for(id).map(|mask| (id, mask.count_set())))
            // max_by_key keeps the last maximum, so compare on (pixels, -id).
            .max_by_key(|&(id, pixels)| (pixels, std::cmp::Reverse(id)))
            .map(|(id, _)| Selection::instance(id))
    }
}

/// Chooses `target_instance_id` and `scene_name`.
pub struct SelectInstanceState {
    selector: Arc<dyn InstanceSelector>,
    default_scene_name: String,
}

impl SelectInstanceState {
    /// Creates the state with the given strategy.
    #[must_use]
    pub fn new(selector: Arc<dyn InstanceSelector>, config: &PipelineConfig) -> Self {
        Self {
            selector,
            default_scene_name: config.default_scene_name.clone(),
        }
    }

    fn choose(&self, ctx: &mut PipelineContext) -> Result<()> {
        self.validate(ctx)?;
        let selection = self
            .selector
            .select(ctx)
            .ok_or(GraspflowError::NoCandidateInstances)?;

        if !ctx.instance_id_list.contains(&selection.target_instance_id) {
            return Err(GraspflowError::InvalidSelection {
                selected: selection.target_instance_id,
                available: ctx.instance_id_list.clone(),
            });
        }

        let scene = selection
            .scene_name
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| self.default_scene_name.clone());
        info!(
            target = selection.target_instance_id,
            scene = %scene,
            candidates = ctx.instance_id_list.len(),
            "Selected target instance"
        );

        ctx.target_instance_id = selection.target_instance_id;
        ctx.set_message(format!(
            "selected instance {} in scene {scene}",
            selection.target_instance_id
        ));
        ctx.scene_name = scene;
        Ok(())
    }
}

impl fmt::Debug for SelectInstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectInstanceState")
            .field("default_scene_name", &self.default_scene_name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineState for SelectInstanceState {
    fn id(&self) -> StateId {
        StateId::SelectInstance
    }

    fn reads(&self) -> &'static [ContextField] {
        READS
    }

    fn writes(&self) -> &'static [ContextField] {
        WRITES
    }

    fn validate(&self, ctx: &PipelineContext) -> Result<()> {
        if ctx.instance_id_list.is_empty() {
            return Err(GraspflowError::NoCandidateInstances);
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut PipelineContext, _events: &dyn EventSink) -> StateOutcome {
        let result = self.choose(ctx);
        if let Err(ref e) = result {
            error!(error = %e, "Instance selection failed");
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Grid;
    use crate::events::NoOpEventSink;
    use crate::masks::build_masks;
    use pretty_assertions::assert_eq;

    fn segmented(rows: &[Vec<i32>]) -> PipelineContext {
        let grid = Grid::from_rows(rows).unwrap();
        let built = build_masks(&grid, 0);
        PipelineContext {
            instance_id_grid: grid,
            instance_id_list: built.ids,
            instance_masks: built.masks,
            ..PipelineContext::default()
        }
    }

    fn state(selector: impl InstanceSelector + 'static) -> SelectInstanceState {
        SelectInstanceState::new(Arc::new(selector), &PipelineConfig::default())
    }

    #[test]
    fn test_lowest_id_selector() {
        let ctx = segmented(&[vec![0, 7, 3], vec![3, 7, 7]]);
        assert_eq!(LowestIdSelector.select(&ctx), Some(Selection::instance(3)));
        assert_eq!(LowestIdSelector.select(&PipelineContext::new()), None);
    }

    #[test]
    fn test_largest_instance_selector() {
        let ctx = segmented(&[vec![0, 7, 3], vec![3, 7, 7]]);
        assert_eq!(LargestInstanceSelector.select(&ctx), Some(Selection::instance(7)));
    }

    #[test]
    fn test_largest_instance_selector_skips_ids_without_masks() {
        let ctx = PipelineContext {
            instance_id_list: vec![4, 6],
            instance_masks: vec![Grid::from_rows(&[vec![1, 0], vec![0, 0]]).unwrap()],
            ..PipelineContext::default()
        };
        assert_eq!(LargestInstanceSelector.select(&ctx), Some(Selection::instance(4)));
    }

    #[test]
    fn test_largest_instance_selector_tie_goes_to_lower_id() {
        let ctx = segmented(&[vec![5, 5], vec![2, 2]]);
        assert_eq!(LargestInstanceSelector.select(&ctx), Some(Selection::instance(2)));
    }

    #[tokio::test]
    async fn test_default_selection_uses_default_scene() {
        let mut ctx = segmented(&[vec![0, 3], vec![3, 3]]);

        let outcome = state(LowestIdSelector).execute(&mut ctx, &NoOpEventSink).await;

        assert!(outcome.is_done());
        assert_eq!(ctx.target_instance_id, 3);
        assert_eq!(ctx.scene_name, "scene_from_ucn");
        assert_eq!(ctx.diagnostic_message, "selected instance 3 in scene scene_from_ucn");
    }

    #[tokio::test]
    async fn test_empty_list_fails() {
        let mut ctx = PipelineContext::new();

        let outcome = state(LowestIdSelector).execute(&mut ctx, &NoOpEventSink).await;

        assert_eq!(outcome, StateOutcome::Failed(GraspflowError::NoCandidateInstances));
    }

    #[tokio::test]
    async fn test_selector_never_called_on_empty_list() {
        let mut selector = MockInstanceSelector::new();
        selector.expect_select().times(0);
        let mut ctx = PipelineContext::new();

        let outcome = state(selector).execute(&mut ctx, &NoOpEventSink).await;

        assert!(!outcome.is_done());
    }

    #[tokio::test]
    async fn test_selector_scene_override() {
        let mut selector = MockInstanceSelector::new();
        selector
            .expect_select()
            .times(1)
            .returning(|_| Some(Selection::instance(2).in_scene("shelf_left")));
        let mut ctx = segmented(&[vec![1, 2]]);

        let outcome = state(selector).execute(&mut ctx, &NoOpEventSink).await;

        assert!(outcome.is_done());
        assert_eq!(ctx.target_instance_id, 2);
        assert_eq!(ctx.scene_name, "shelf_left");
    }

    #[tokio::test]
    async fn test_selector_declines() {
        let mut selector = MockInstanceSelector::new();
        selector.expect_select().returning(|_| None);
        let mut ctx = segmented(&[vec![1, 2]]);

        let outcome = state(selector).execute(&mut ctx, &NoOpEventSink).await;

        assert_eq!(outcome, StateOutcome::Failed(GraspflowError::NoCandidateInstances));
    }

    #[tokio::test]
    async fn test_selection_outside_list_fails() {
        let mut selector = MockInstanceSelector::new();
        selector
            .expect_select()
            .returning(|_| Some(Selection::instance(9)));
        let mut ctx = segmented(&[vec![1, 2]]);

        let outcome = state(selector).execute(&mut ctx, &NoOpEventSink).await;

        assert_eq!(
            outcome,
            StateOutcome::Failed(GraspflowError::InvalidSelection {
                selected: 9,
                available: vec![1, 2],
            })
        );
        assert_eq!(ctx.target_instance_id, 0);
    }
}
