use super::bilinear::bilinear_interpolation;
use camcalib_image::Image;

/// Interpolation mode for the remap operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    /// Bilinear interpolation
    Bilinear,
}

/// Kernel for interpolating a pixel value
///
/// # Arguments
///
/// * `image` - The input image container with shape (height, width, C).
/// * `u` - The x coordinate of the pixel to interpolate.
/// * `v` - The y coordinate of the pixel to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Returns
///
/// The interpolated pixel values, zero where the sample falls outside the image.
pub fn interpolate_pixel<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
    interpolation: InterpolationMode,
) -> [f32; C] {
    match interpolation {
        InterpolationMode::Bilinear => bilinear_interpolation(image, u, v),
    }
}
