//! Core domain model types for graspflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - State identifiers and terminal outcomes
//! - Poses and grasp candidates
//! - Dense 2-D grids for instance labels and masks
//! - Raw sensor inputs for cloud segmentation

mod geometry;
mod grid;
mod sensor;
mod status;

pub use geometry::{GraspCandidate, Point, Pose, Quaternion};
pub use grid::{Grid, InstanceGrid, InstanceMask};
pub use sensor::{CameraInfo, PointCloud};
pub use status::{MotionStatus, Outcome, StateId};
