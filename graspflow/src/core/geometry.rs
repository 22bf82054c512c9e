//! Pose and grasp candidate types.

use serde::{Deserialize, Serialize};

/// A point in 3-D space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// An orientation as a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
    /// W component.
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// A gripper pose: position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// Position.
    pub position: Point,
    /// Orientation.
    pub orientation: Quaternion,
}

impl Pose {
    /// Creates a pose at a position with identity orientation.
    #[must_use]
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Point { x, y, z },
            orientation: Quaternion::default(),
        }
    }
}

/// A proposed grasp with its confidence score.
///
/// `score` is `None` when the sampler returned poses without scores; the
/// sampler's own ordering is then authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraspCandidate {
    /// Target gripper pose.
    pub pose: Pose,
    /// Confidence score, higher is better.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl GraspCandidate {
    /// Creates a scored candidate.
    #[must_use]
    pub fn scored(pose: Pose, score: f64) -> Self {
        Self {
            pose,
            score: Some(score),
        }
    }

    /// Creates a candidate without a score.
    #[must_use]
    pub fn unscored(pose: Pose) -> Self {
        Self { pose, score: None }
    }
}
