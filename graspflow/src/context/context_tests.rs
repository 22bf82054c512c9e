//! Tests for the context module.

#[cfg(test)]
mod tests {
    use crate::context::{ContextField, ContextSnapshot, PipelineContext};
    use crate::core::{CameraInfo, GraspCandidate, Grid, PointCloud, Pose};

    fn with_candidates(n: usize) -> PipelineContext {
        let mut ctx = PipelineContext::new();
        ctx.grasp_candidates = (0..n)
            .map(|i| GraspCandidate::unscored(Pose::at(i as f64, 0.0, 0.0)))
            .collect();
        ctx
    }

    #[test]
    fn test_default_context() {
        let ctx = PipelineContext::new();
        assert!(ctx.image_name.is_empty());
        assert_eq!(ctx.grasp_cursor, 0);
        assert!(ctx.candidates_exhausted());
        assert!(ctx.current_candidate().is_none());
    }

    #[test]
    fn test_with_image_name() {
        let ctx = PipelineContext::new().with_image_name("shelf_01");
        assert_eq!(ctx.image_name, "shelf_01");
    }

    #[test]
    fn test_with_cloud() {
        let cloud = PointCloud {
            width: 4,
            height: 2,
            ..PointCloud::default()
        };
        let ctx = PipelineContext::new().with_cloud(cloud, Some(CameraInfo::default()));

        assert_eq!(ctx.cloud_in.as_ref().map(PointCloud::len), Some(8));
        assert!(ctx.camera_info.is_some());
        assert!(ctx.image_name.is_empty());
    }

    #[test]
    fn test_cursor_helpers() {
        let mut ctx = with_candidates(2);
        assert!(ctx.has_next_candidate());
        assert!(!ctx.candidates_exhausted());

        ctx.grasp_cursor = 1;
        assert!(!ctx.has_next_candidate());
        assert_eq!(ctx.current_candidate().unwrap().pose.position.x, 1.0);

        ctx.grasp_cursor = 2;
        assert!(ctx.candidates_exhausted());
        assert!(ctx.current_candidate().is_none());
    }

    #[test]
    fn test_message_is_overwritten() {
        let mut ctx = PipelineContext::new();
        ctx.set_message("first");
        ctx.set_message("second");
        assert_eq!(ctx.diagnostic_message, "second");
    }

    #[test]
    fn test_mask_for() {
        let mut ctx = PipelineContext::new();
        ctx.instance_id_list = vec![2, 5];
        ctx.instance_masks = vec![
            Grid::from_rows(&[vec![1, 0]]).unwrap(),
            Grid::from_rows(&[vec![0, 1]]).unwrap(),
        ];

        assert_eq!(ctx.mask_for(5).unwrap().as_slice(), &[0, 1]);
        assert!(ctx.mask_for(3).is_none());
    }

    #[test]
    fn test_snapshot() {
        let mut ctx = with_candidates(3);
        ctx.image_name = "from_rgbd".to_string();
        ctx.instance_id_grid = Grid::from_rows(&[vec![0, 1, 1]]).unwrap();
        ctx.instance_id_list = vec![1];
        ctx.grasp_cursor = 1;

        let snapshot = ContextSnapshot::from(&ctx);
        assert_eq!(snapshot.grid_shape, (1, 3));
        assert_eq!(snapshot.candidate_count, 3);
        assert_eq!(snapshot.to_value()["grasp_cursor"], 1);
    }

    #[test]
    fn test_field_names() {
        assert_eq!(ContextField::GraspCursor.to_string(), "grasp_cursor");
        assert_eq!(ContextField::CloudIn.to_string(), "cloud_in");
        assert!(ContextField::SEEDED.contains(&ContextField::ImageName));
        assert!(ContextField::SEEDED.contains(&ContextField::CloudIn));
        assert!(!ContextField::SEEDED.contains(&ContextField::Classes));
    }
}
