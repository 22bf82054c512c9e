//! Testing utilities for graspflow pipelines.
//!
//! This module provides:
//! - Scripted in-memory service clients
//! - Canned service responses and sensor inputs
//! - A bundle of the three scripted services a pipeline needs

mod fixtures;
mod mocks;

pub use fixtures::{
    camera_info, motion, point_cloud, sampling_ok, segmentation_failed, segmentation_ok,
    segmentation_with_document, ScriptedCloudSegmentation, ScriptedMotion, ScriptedSampling,
    ScriptedSegmentation, TestServices,
};
pub use mocks::ScriptedService;
