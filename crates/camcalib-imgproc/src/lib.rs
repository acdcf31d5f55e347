#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// camera intrinsics, lens distortion and optimal camera matrix module.
pub mod calibration;

/// chessboard corner detection module.
pub mod chessboard;

/// color transformations module.
pub mod color;

/// image cropping module.
pub mod crop;

/// utilities for drawing on images.
pub mod draw;

/// image filtering module.
pub mod filter;

/// utilities to interpolate pixel values.
pub mod interpolation;

/// sub-pixel corner refinement module.
pub mod subpix;

/// image undistortion module.
pub mod undistort;
