//! Scene segmentation from a named image or a point cloud.

use super::{PipelineState, StateOutcome};
use crate::config::PipelineConfig;
use crate::context::{ContextField, PipelineContext};
use crate::core::{InstanceGrid, StateId};
use crate::errors::{GraspflowError, Result};
use crate::events::EventSink;
use crate::masks::build_masks;
use crate::services::{
    CloudSegmentationClient, CloudSegmentationRequest, SegmentationClient, SegmentationRequest,
    SegmentationResponse, ServiceGateway,
};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Base directory for cloud results when neither the document nor the
/// configuration names one.
pub const DEFAULT_CLOUD_OUTPUT_BASE: &str = "/tmp/ucn_io/out";

const IMAGE_READS: &[ContextField] = &[ContextField::ImageName];
const CLOUD_READS: &[ContextField] = &[
    ContextField::ImageName,
    ContextField::CloudIn,
    ContextField::CameraInfo,
];
const WRITES: &[ContextField] = &[
    ContextField::ImageName,
    ContextField::SegmentationResult,
    ContextField::ResultDirectory,
    ContextField::Classes,
    ContextField::Bboxes,
    ContextField::InstanceIdGrid,
    ContextField::InstanceIdList,
    ContextField::InstanceMasks,
    ContextField::DiagnosticMessage,
];

/// The service the Segment state asks for an instance map.
#[derive(Clone)]
pub enum SegmentationSource {
    /// Segments a stored RGB-D image by name.
    Image(Arc<SegmentationClient>),
    /// Segments the context's `cloud_in`.
    Cloud(Arc<CloudSegmentationClient>),
}

impl SegmentationSource {
    fn service_name(&self) -> &str {
        match self {
            Self::Image(client) => client.name(),
            Self::Cloud(client) => client.name(),
        }
    }

    fn is_cloud(&self) -> bool {
        matches!(self, Self::Cloud(_))
    }
}

impl fmt::Debug for SegmentationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_cloud() { "Cloud" } else { "Image" };
        f.debug_tuple(kind).field(&self.service_name()).finish()
    }
}

/// Calls a segmentation service and turns its label grid into masks.
pub struct SegmentState {
    source: SegmentationSource,
    gateway: ServiceGateway,
    timeout: Duration,
    default_image_name: String,
    background_id: i32,
    fallback_output_dir: Option<String>,
}

impl SegmentState {
    /// Creates an image-segmenting state from pipeline configuration.
    #[must_use]
    pub fn new(client: Arc<SegmentationClient>, config: &PipelineConfig) -> Self {
        Self::with_source(SegmentationSource::Image(client), config)
    }

    /// Creates a cloud-segmenting state from pipeline configuration.
    #[must_use]
    pub fn from_cloud(client: Arc<CloudSegmentationClient>, config: &PipelineConfig) -> Self {
        Self::with_source(SegmentationSource::Cloud(client), config)
    }

    /// Creates the state for either source.
    #[must_use]
    pub fn with_source(source: SegmentationSource, config: &PipelineConfig) -> Self {
        let (endpoint, default_image_name) = if source.is_cloud() {
            (&config.cloud_segmentation, &config.default_cloud_image_name)
        } else {
            (&config.segmentation, &config.default_image_name)
        };
        Self {
            timeout: endpoint.timeout(),
            default_image_name: default_image_name.clone(),
            source,
            gateway: ServiceGateway::new(config.poll.clone()),
            background_id: config.background_id,
            fallback_output_dir: config.fallback_output_dir.clone(),
        }
    }

    fn image_name(&self, ctx: &PipelineContext) -> String {
        if ctx.image_name.trim().is_empty() {
            self.default_image_name.clone()
        } else {
            ctx.image_name.clone()
        }
    }

    async fn request(
        &self,
        ctx: &PipelineContext,
        image_name: &str,
    ) -> Result<SegmentationResponse> {
        match &self.source {
            SegmentationSource::Image(client) => {
                let request = SegmentationRequest {
                    image_name: image_name.to_string(),
                };
                self.gateway.call(&**client, request, self.timeout).await
            }
            SegmentationSource::Cloud(client) => {
                let cloud = ctx.cloud_in.clone().ok_or_else(missing_cloud)?;
                let request = CloudSegmentationRequest {
                    cloud,
                    camera_info: ctx.camera_info.clone(),
                };
                self.gateway.call(&**client, request, self.timeout).await
            }
        }
    }

    async fn segment(&self, ctx: &mut PipelineContext) -> Result<()> {
        self.validate(ctx)?;
        let image_name = self.image_name(ctx);
        info!(
            service = %self.source.service_name(),
            image = %image_name,
            "Requesting segmentation"
        );
        let response = self.request(ctx, &image_name).await?;
        self.apply(ctx, &image_name, response)
    }

    fn apply(
        &self,
        ctx: &mut PipelineContext,
        image_name: &str,
        response: SegmentationResponse,
    ) -> Result<()> {
        if !response.success {
            let log = if response.log_output.is_empty() {
                "Segmentation failed.".to_string()
            } else {
                response.log_output
            };
            ctx.set_message(log.clone());
            return Err(GraspflowError::SegmentationFailure(log));
        }

        let document: serde_json::Value = serde_json::from_str(&response.json_result)
            .map_err(|e| GraspflowError::ParseError(format!("json_result: {e}")))?;
        if !document.is_object() {
            return Err(GraspflowError::ParseError(
                "json_result is not a JSON object".to_string(),
            ));
        }

        // Cloud segmentation may legitimately find nothing.
        let grid = match document.get("instance_ids").filter(|v| !v.is_null()) {
            Some(raw) => InstanceGrid::from_json(raw)?,
            None if self.source.is_cloud() => InstanceGrid::default(),
            None => return Err(GraspflowError::MissingField("instance_ids".to_string())),
        };
        let classes = json_array(&document, "classes")?;
        let bboxes = json_array(&document, "bboxes")?;
        let (rows, cols) = grid.shape();
        let built = build_masks(&grid, self.background_id);
        info!(
            rows,
            cols,
            instances = ?built.ids,
            classes = classes.len(),
            "Received instance map"
        );

        ctx.result_directory =
            self.resolve_result_directory(&document, &response.result_dir, image_name);
        ctx.image_name = image_name.to_string();
        ctx.segmentation_result = document;
        ctx.classes = classes;
        ctx.bboxes = bboxes;
        ctx.instance_id_grid = grid;
        ctx.instance_id_list = built.ids;
        ctx.instance_masks = built.masks;
        ctx.set_message(response.log_output);
        Ok(())
    }

    /// Document `result_dir`, then the response field, then a base directory
    /// joined with the output leaf.
    ///
    /// The base is the document's `base_output_dir`, else the configured
    /// fallback; cloud segmentation finally falls back to
    /// [`DEFAULT_CLOUD_OUTPUT_BASE`]. Image results land in
    /// `segmentation_<image>`, cloud results in `segmentation_output`.
    fn resolve_result_directory(
        &self,
        document: &serde_json::Value,
        response_dir: &str,
        image_name: &str,
    ) -> String {
        let non_empty = |key: &str| {
            document
                .get(key)
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(dir) = non_empty("result_dir") {
            return dir;
        }
        if !response_dir.is_empty() {
            return response_dir.to_string();
        }

        let leaf = if self.source.is_cloud() {
            "segmentation_output".to_string()
        } else {
            format!("segmentation_{image_name}")
        };
        non_empty("base_output_dir")
            .or_else(|| self.fallback_output_dir.clone().filter(|s| !s.is_empty()))
            .or_else(|| self.source.is_cloud().then(|| DEFAULT_CLOUD_OUTPUT_BASE.to_string()))
            .map(|base| {
                std::path::Path::new(&base)
                    .join(&leaf)
                    .to_string_lossy()
                    .into_owned()
            })
            .unwrap_or_default()
    }
}

fn missing_cloud() -> GraspflowError {
    GraspflowError::MissingInput(ContextField::CloudIn.to_string())
}

/// An optional array member of the document; absent or null reads as empty.
fn json_array(document: &serde_json::Value, key: &str) -> Result<Vec<serde_json::Value>> {
    match document.get(key) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(GraspflowError::ParseError(format!("{key} is not an array"))),
    }
}

impl fmt::Debug for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentState")
            .field("source", &self.source)
            .field("timeout", &self.timeout)
            .field("background_id", &self.background_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PipelineState for SegmentState {
    fn id(&self) -> StateId {
        StateId::Segment
    }

    fn reads(&self) -> &'static [ContextField] {
        if self.source.is_cloud() {
            CLOUD_READS
        } else {
            IMAGE_READS
        }
    }

    fn writes(&self) -> &'static [ContextField] {
        WRITES
    }

    fn validate(&self, ctx: &PipelineContext) -> Result<()> {
        if self.source.is_cloud() && ctx.cloud_in.is_none() {
            return Err(missing_cloud());
        }
        Ok(())
    }

    async fn execute(&self, ctx: &mut PipelineContext, _events: &dyn EventSink) -> StateOutcome {
        let result = self.segment(ctx).await;
        if let Err(ref e) = result {
            error!(error = %e, "Segmentation state failed");
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoOpEventSink;
    use crate::testing::{
        camera_info, point_cloud, segmentation_failed, segmentation_ok, segmentation_with_document,
        ScriptedCloudSegmentation, ScriptedSegmentation,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn state(svc: &Arc<ScriptedSegmentation>, config: &PipelineConfig) -> SegmentState {
        SegmentState::new(svc.clone(), config)
    }

    async fn run(
        svc: &Arc<ScriptedSegmentation>,
        config: &PipelineConfig,
        ctx: &mut PipelineContext,
    ) -> StateOutcome {
        state(svc, config).execute(ctx, &NoOpEventSink).await
    }

    async fn run_cloud(
        svc: &Arc<ScriptedCloudSegmentation>,
        config: &PipelineConfig,
        ctx: &mut PipelineContext,
    ) -> StateOutcome {
        let state = SegmentState::from_cloud(svc.clone(), config);
        state.execute(ctx, &NoOpEventSink).await
    }

    fn cloud_service() -> Arc<ScriptedCloudSegmentation> {
        Arc::new(ScriptedCloudSegmentation::new("run_segmentation_cloud"))
    }

    #[tokio::test]
    async fn test_success_fills_context() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_ok(&[vec![0, 0, 1], vec![1, 2, 2]]));
        let mut ctx = PipelineContext::new();

        let outcome = run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert!(outcome.is_done());
        assert_eq!(ctx.image_name, "from_rgbd");
        assert_eq!(ctx.instance_id_list, vec![1, 2]);
        assert_eq!(ctx.instance_masks.len(), 2);
        assert_eq!(ctx.instance_masks[1].to_rows(), vec![vec![0, 0, 0], vec![0, 1, 1]]);
        assert_eq!(ctx.instance_id_grid.shape(), (2, 3));
        assert_eq!(ctx.result_directory, "/tmp/ucn_io/out/segmentation_from_rgbd");
        assert_eq!(ctx.diagnostic_message, "segmentation ok");
        assert!(ctx.segmentation_result.get("instance_ids").is_some());
        assert_eq!(svc.requests()[0].image_name, "from_rgbd");
    }

    #[tokio::test]
    async fn test_uses_context_image_name() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_ok(&[vec![1]]));
        let mut ctx = PipelineContext::new().with_image_name("table_top");

        run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert_eq!(svc.requests()[0].image_name, "table_top");
        assert_eq!(ctx.image_name, "table_top");
    }

    #[tokio::test]
    async fn test_reported_failure() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_failed("camera timeout"));
        let mut ctx = PipelineContext::new();

        let outcome = run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert_eq!(
            outcome,
            StateOutcome::Failed(GraspflowError::SegmentationFailure("camera timeout".to_string()))
        );
        assert!(ctx.instance_id_list.is_empty());
        assert_eq!(ctx.diagnostic_message, "camera timeout");
    }

    #[tokio::test]
    async fn test_reported_failure_without_log() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_failed(""));
        let mut ctx = PipelineContext::new();

        let outcome = run(&svc, &PipelineConfig::default(), &mut ctx).await;

        let expected = GraspflowError::SegmentationFailure("Segmentation failed.".to_string());
        assert_eq!(outcome, StateOutcome::Failed(expected));
        assert_eq!(ctx.diagnostic_message, "Segmentation failed.");
    }

    #[tokio::test]
    async fn test_undecodable_document() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        let mut response = segmentation_ok(&[vec![1]]);
        response.json_result = "{instance_ids: [[1]]".to_string();
        svc.push_ok(response);
        let mut ctx = PipelineContext::new();

        let outcome = run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert!(matches!(outcome, StateOutcome::Failed(GraspflowError::ParseError(_))));
    }

    #[tokio::test]
    async fn test_missing_instance_grid() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_with_document(&json!({"result_dir": "/tmp/out"})));
        let mut ctx = PipelineContext::new();

        let outcome = run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert_eq!(
            outcome,
            StateOutcome::Failed(GraspflowError::MissingField("instance_ids".to_string()))
        );
    }

    #[tokio::test]
    async fn test_ragged_grid() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_with_document(&json!({"instance_ids": [[0, 1], [1]]})));
        let mut ctx = PipelineContext::new();

        let outcome = run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert!(matches!(outcome, StateOutcome::Failed(GraspflowError::InvalidGrid(_))));
    }

    #[tokio::test]
    async fn test_result_dir_from_response_field() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        let mut response = segmentation_with_document(&json!({"instance_ids": [[1]]}));
        response.result_dir = "/data/run_7".to_string();
        svc.push_ok(response);
        let mut ctx = PipelineContext::new();

        run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert_eq!(ctx.result_directory, "/data/run_7");
    }

    #[tokio::test]
    async fn test_result_dir_from_base_output_dir() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_with_document(&json!({
            "instance_ids": [[1]],
            "result_dir": "",
            "base_output_dir": "/tmp/ucn_io/out",
        })));
        let mut ctx = PipelineContext::new().with_image_name("bin_3");

        run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert_eq!(ctx.result_directory, "/tmp/ucn_io/out/segmentation_bin_3");
    }

    #[tokio::test]
    async fn test_result_dir_from_configured_fallback() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_with_document(&json!({"instance_ids": [[1]]})));
        let config = PipelineConfig::default().with_fallback_output_dir("/var/graspflow");
        let mut ctx = PipelineContext::new();

        run(&svc, &config, &mut ctx).await;

        assert_eq!(ctx.result_directory, "/var/graspflow/segmentation_from_rgbd");
    }

    #[tokio::test]
    async fn test_result_dir_undeterminable() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_with_document(&json!({"instance_ids": [[1]]})));
        let mut ctx = PipelineContext::new();

        let outcome = run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert!(outcome.is_done());
        assert!(ctx.result_directory.is_empty());
    }

    #[tokio::test]
    async fn test_custom_background() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        svc.push_ok(segmentation_ok(&[vec![-1, 4], vec![4, 9]]));
        let config = PipelineConfig::default().with_background_id(-1);
        let mut ctx = PipelineContext::new();

        run(&svc, &config, &mut ctx).await;

        assert_eq!(ctx.instance_id_list, vec![4, 9]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_unavailable() {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd").unavailable());
        let mut ctx = PipelineContext::new();

        let outcome = run(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert!(matches!(
            outcome,
            StateOutcome::Failed(GraspflowError::ServiceUnavailable { .. })
        ));
        assert_eq!(svc.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cloud_success_fills_context() {
        let svc = cloud_service();
        svc.push_ok(segmentation_with_document(&json!({
            "instance_ids": [[0, 3], [3, 3]],
            "classes": ["mug"],
            "bboxes": [[0, 1, 1, 1]],
        })));
        let mut ctx = PipelineContext::new().with_cloud(point_cloud(2, 2), Some(camera_info()));

        let outcome = run_cloud(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert!(outcome.is_done());
        assert_eq!(ctx.image_name, "from_cloud");
        assert_eq!(ctx.instance_id_list, vec![3]);
        assert_eq!(ctx.classes, vec![json!("mug")]);
        assert_eq!(ctx.bboxes, vec![json!([0, 1, 1, 1])]);
        assert_eq!(ctx.result_directory, "/tmp/ucn_io/out/segmentation_output");

        let request = &svc.requests()[0];
        assert_eq!(request.cloud.len(), 4);
        assert_eq!(request.camera_info, Some(camera_info()));
    }

    #[tokio::test]
    async fn test_cloud_without_instances_is_empty() {
        let svc = cloud_service();
        svc.push_ok(segmentation_with_document(&json!({"base_output_dir": "/data/ucn"})));
        let mut ctx = PipelineContext::new().with_cloud(point_cloud(1, 1), None);

        let outcome = run_cloud(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert!(outcome.is_done());
        assert!(ctx.instance_id_list.is_empty());
        assert!(ctx.classes.is_empty());
        assert_eq!(ctx.result_directory, "/data/ucn/segmentation_output");
        assert_eq!(svc.requests()[0].camera_info, None);
    }

    #[tokio::test]
    async fn test_cloud_missing_fails_before_call() {
        let svc = cloud_service();
        svc.push_ok(segmentation_ok(&[vec![1]]));
        let mut ctx = PipelineContext::new();

        let outcome = run_cloud(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert_eq!(
            outcome,
            StateOutcome::Failed(GraspflowError::MissingInput("cloud_in".to_string()))
        );
        assert_eq!(svc.availability_probes(), 0);
        assert_eq!(svc.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cloud_classes_must_be_array() {
        let svc = cloud_service();
        svc.push_ok(segmentation_with_document(&json!({"classes": "mug"})));
        let mut ctx = PipelineContext::new().with_cloud(point_cloud(1, 1), None);

        let outcome = run_cloud(&svc, &PipelineConfig::default(), &mut ctx).await;

        assert!(matches!(outcome, StateOutcome::Failed(GraspflowError::ParseError(_))));
    }

    #[test]
    fn test_cloud_reads_cloud_fields() {
        let state = SegmentState::from_cloud(cloud_service(), &PipelineConfig::default());
        assert!(state.reads().contains(&ContextField::CloudIn));

        let image = state_for_image();
        assert!(!image.reads().contains(&ContextField::CloudIn));
    }

    fn state_for_image() -> SegmentState {
        let svc = Arc::new(ScriptedSegmentation::new("/segmentation_rgbd"));
        state(&svc, &PipelineConfig::default())
    }
}
