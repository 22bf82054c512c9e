//! Raw sensor inputs for cloud-based segmentation.

use serde::{Deserialize, Serialize};

/// A packed point cloud as produced by a depth sensor.
///
/// The buffer is opaque here; only the segmentation service interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointCloud {
    /// Coordinate frame of the points.
    pub frame_id: String,
    /// Points per row.
    pub width: u32,
    /// Rows; 1 for an unordered cloud.
    pub height: u32,
    /// Bytes per point.
    pub point_step: u32,
    /// Bytes per row.
    pub row_step: u32,
    /// True if the cloud has no invalid points.
    pub is_dense: bool,
    /// Packed point data, `row_step * height` bytes.
    pub data: Vec<u8>,
}

impl PointCloud {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// True if the cloud holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pinhole calibration of the camera that produced a cloud.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Coordinate frame of the camera.
    pub frame_id: String,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Row-major 3x3 intrinsic matrix.
    pub k: [f64; 9],
}
