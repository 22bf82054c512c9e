//! Static configuration supplied at pipeline construction time.
//!
//! Every field has a default matching the stock perception-to-grasp
//! behavior, so an empty JSON object is a valid configuration.

use crate::errors::ConfigError;
use crate::services::PollConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

#[allow(clippy::expect_used)]
static SERVICE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?[A-Za-z][A-Za-z0-9_]*(/[A-Za-z][A-Za-z0-9_]*)*$")
        .expect("service name pattern is valid")
});

/// Longest availability timeout a configuration may ask for, in seconds.
pub const MAX_TIMEOUT_SECONDS: f64 = 86_400.0;

/// Name and availability timeout of one external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Service name as known to the transport.
    pub name: String,
    /// How long to wait for the service to become available, in seconds.
    pub timeout_seconds: f64,
}

impl ServiceEndpoint {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(name: impl Into<String>, timeout_seconds: f64) -> Self {
        Self {
            name: name.into(),
            timeout_seconds,
        }
    }

    /// Availability timeout as a `Duration`.
    ///
    /// Saturates instead of panicking on an unvalidated endpoint: negative or
    /// NaN becomes zero, anything too large for a `Duration` becomes
    /// `Duration::MAX`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        match Duration::try_from_secs_f64(self.timeout_seconds) {
            Ok(timeout) => timeout,
            Err(_) if self.timeout_seconds > 0.0 => Duration::MAX,
            Err(_) => Duration::ZERO,
        }
    }

    fn validate(&self, field: &str) -> Result<(), ConfigError> {
        if !SERVICE_NAME.is_match(&self.name) {
            return Err(ConfigError::invalid(
                format!("{field}.name"),
                format!("'{}' is not a valid service name", self.name),
            ));
        }
        if !self.timeout_seconds.is_finite() || self.timeout_seconds <= 0.0 {
            return Err(ConfigError::invalid(
                format!("{field}.timeout_seconds"),
                "must be a positive number of seconds",
            ));
        }
        if self.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(ConfigError::invalid(
                format!("{field}.timeout_seconds"),
                format!("must be at most {MAX_TIMEOUT_SECONDS} seconds"),
            ));
        }
        Ok(())
    }
}

fn default_segmentation() -> ServiceEndpoint {
    ServiceEndpoint::new("/segmentation_rgbd", 5.0)
}

fn default_cloud_segmentation() -> ServiceEndpoint {
    ServiceEndpoint::new("run_segmentation_cloud", 5.0)
}

fn default_grasp_sampling() -> ServiceEndpoint {
    ServiceEndpoint::new("/run_graspsam", 2.0)
}

fn default_motion() -> ServiceEndpoint {
    ServiceEndpoint::new("/move_to_pose", 5.0)
}

fn default_dataset_root() -> String {
    "./datasets/sample_scene_ucn".to_string()
}

fn default_dataset_name() -> String {
    "from_rgbd".to_string()
}

fn default_checkpoint_path() -> String {
    "pretrained_checkpoint/mobile_sam.pt".to_string()
}

fn default_encoder_type() -> String {
    "vit_t".to_string()
}

fn default_no_grasps() -> u32 {
    10
}

/// Parameters forwarded to the grasp sampler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Dataset root directory.
    #[serde(default = "default_dataset_root")]
    pub dataset_root: String,
    /// Dataset name.
    #[serde(default = "default_dataset_name")]
    pub dataset_name: String,
    /// Model checkpoint path.
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,
    /// Image encoder variant.
    #[serde(default = "default_encoder_type")]
    pub sam_encoder_type: String,
    /// Number of grasps to request.
    #[serde(default = "default_no_grasps")]
    pub no_grasps: u32,
    /// Whether targets come from the seen object set.
    #[serde(default)]
    pub seen_set: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            dataset_root: default_dataset_root(),
            dataset_name: default_dataset_name(),
            checkpoint_path: default_checkpoint_path(),
            sam_encoder_type: default_encoder_type(),
            no_grasps: default_no_grasps(),
            seen_set: false,
        }
    }
}

fn default_behavior_name() -> String {
    "UnseenObjClusterGraspSamPipeline".to_string()
}

fn default_image_name() -> String {
    "from_rgbd".to_string()
}

fn default_cloud_image_name() -> String {
    "from_cloud".to_string()
}

fn default_scene_name() -> String {
    "scene_from_ucn".to_string()
}

/// Configuration for one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name used in logs and events.
    #[serde(default = "default_behavior_name")]
    pub behavior_name: String,
    /// Image name used when the context carries none.
    #[serde(default = "default_image_name")]
    pub default_image_name: String,
    /// Image name recorded for cloud segmentation when the context carries none.
    #[serde(default = "default_cloud_image_name")]
    pub default_cloud_image_name: String,
    /// Label treated as background in the instance grid.
    #[serde(default)]
    pub background_id: i32,
    /// Scene name used when the selector supplies none.
    #[serde(default = "default_scene_name")]
    pub default_scene_name: String,
    /// Base directory for results when the segmentation output names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_output_dir: Option<String>,
    /// Segmentation service.
    #[serde(default = "default_segmentation")]
    pub segmentation: ServiceEndpoint,
    /// Cloud segmentation service.
    #[serde(default = "default_cloud_segmentation")]
    pub cloud_segmentation: ServiceEndpoint,
    /// Grasp-sampling service.
    #[serde(default = "default_grasp_sampling")]
    pub grasp_sampling: ServiceEndpoint,
    /// Motion service.
    #[serde(default = "default_motion")]
    pub motion: ServiceEndpoint,
    /// Sampler parameters.
    #[serde(default)]
    pub sampling: SamplingConfig,
    /// Availability poll schedule.
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            behavior_name: default_behavior_name(),
            default_image_name: default_image_name(),
            default_cloud_image_name: default_cloud_image_name(),
            background_id: 0,
            default_scene_name: default_scene_name(),
            fallback_output_dir: None,
            segmentation: default_segmentation(),
            cloud_segmentation: default_cloud_segmentation(),
            grasp_sampling: default_grasp_sampling(),
            motion: default_motion(),
            sampling: SamplingConfig::default(),
            poll: PollConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets the default image name.
    #[must_use]
    pub fn with_default_image_name(mut self, name: impl Into<String>) -> Self {
        self.default_image_name = name.into();
        self
    }

    /// Sets the background label.
    #[must_use]
    pub fn with_background_id(mut self, id: i32) -> Self {
        self.background_id = id;
        self
    }

    /// Sets the default scene name.
    #[must_use]
    pub fn with_default_scene_name(mut self, name: impl Into<String>) -> Self {
        self.default_scene_name = name.into();
        self
    }

    /// Sets the fallback output directory.
    #[must_use]
    pub fn with_fallback_output_dir(mut self, dir: impl Into<String>) -> Self {
        self.fallback_output_dir = Some(dir.into());
        self
    }

    /// Sets the sampler parameters.
    #[must_use]
    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    /// Sets the poll schedule.
    #[must_use]
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Checks every field for well-formedness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_image_name.trim().is_empty() {
            return Err(ConfigError::invalid("default_image_name", "must not be empty"));
        }
        if self.default_cloud_image_name.trim().is_empty() {
            return Err(ConfigError::invalid("default_cloud_image_name", "must not be empty"));
        }
        if self.default_scene_name.trim().is_empty() {
            return Err(ConfigError::invalid("default_scene_name", "must not be empty"));
        }
        self.segmentation.validate("segmentation")?;
        self.cloud_segmentation.validate("cloud_segmentation")?;
        self.grasp_sampling.validate("grasp_sampling")?;
        self.motion.validate("motion")?;
        if self.sampling.no_grasps == 0 {
            return Err(ConfigError::invalid("sampling.no_grasps", "must be at least 1"));
        }
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::invalid("poll.interval_ms", "must be at least 1"));
        }
        Ok(())
    }
}
