use crate::calibration::distortion::{generate_correction_map_polynomial, PolynomialDistortion};
use crate::calibration::CameraIntrinsic;
use crate::interpolation::{remap, InterpolationMode};
use camcalib_image::{Image, ImageError};

/// Remove the lens distortion of an image.
///
/// The destination image is rendered with `new_intrinsic`; its size selects the size of
/// the undistorted image. Destination pixels whose source falls outside `src` are black.
///
/// # Arguments
///
/// * `src` - The distorted image with shape (H, W, C).
/// * `dst` - The undistorted image with shape (H', W', C).
/// * `intrinsic` - The intrinsic parameters of the camera that captured `src`.
/// * `new_intrinsic` - The intrinsic parameters of the undistorted image.
/// * `distortion` - The distortion parameters of the camera.
pub fn undistort_image<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    intrinsic: &CameraIntrinsic,
    new_intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
) -> Result<(), ImageError> {
    let (map_x, map_y) =
        generate_correction_map_polynomial(intrinsic, new_intrinsic, distortion, &dst.size())?;

    remap(src, dst, &map_x, &map_y, InterpolationMode::Bilinear)
}
