#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Camera calibration from planar targets.
pub mod calibration;

/// Linear algebra utilities.
pub mod linalg;

/// Operations on 3D points.
pub mod ops;

/// Pose estimation algorithms.
pub mod pose;
