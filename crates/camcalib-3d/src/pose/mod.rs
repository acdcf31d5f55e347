//! # Pose estimation
//!
//! Geometry of a planar target seen by a pinhole camera.
//!
//! - [`find_homography_dlt`]: plane to image homography (normalized DLT)
//! - [`pose_from_homography`]: camera pose from a plane to image homography

mod homography;
pub use homography::*;

mod planar;
pub use planar::*;
