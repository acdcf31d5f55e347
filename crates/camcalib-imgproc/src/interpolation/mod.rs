//! Pixel interpolation methods for image transformations.
//!
//! Samples falling outside the source image read as zero (constant black border).

mod bilinear;

/// Grid generation and coordinate mapping utilities.
pub mod grid;

mod interpolate;
mod remap;

pub use interpolate::{interpolate_pixel, InterpolationMode};
pub use remap::remap;
