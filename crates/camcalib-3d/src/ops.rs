use crate::linalg::{mat33_mul_vec3, rotation_from_axis_angle};
use camcalib_imgproc::calibration::{
    distortion::{distort_normalized, PolynomialDistortion},
    CameraIntrinsic,
};

/// Project 3D points to 2D image coordinates.
///
/// The points are moved to the camera frame with `rvec` and `tvec`, projected on the
/// normalized image plane, distorted and finally mapped to pixels.
///
/// # Arguments
///
/// * `points_3d` - Array of 3D points in world coordinates.
/// * `rvec` - The world to camera rotation as an axis-angle vector.
/// * `tvec` - The world to camera translation.
/// * `intrinsic` - Camera intrinsic parameters.
/// * `distortion` - Lens distortion parameters.
///
/// # Returns
///
/// A vector of 2D image coordinates `[u, v]` for each input point.
/// Points behind the camera (z <= 0) have NaN coordinates.
///
/// # Example
///
/// ```
/// use camcalib_3d::ops::project_points;
/// use camcalib_imgproc::calibration::{distortion::PolynomialDistortion, CameraIntrinsic};
///
/// let intrinsic = CameraIntrinsic {
///     fx: 500.0,
///     fy: 500.0,
///     cx: 320.0,
///     cy: 240.0,
/// };
/// let points = project_points(
///     &[[1.0, 2.0, 5.0], [0.0, 0.0, 3.0]],
///     &[0.0; 3],
///     &[0.0; 3],
///     &intrinsic,
///     &PolynomialDistortion::default(),
/// );
/// assert_eq!(points[1], [320.0, 240.0]);
/// ```
pub fn project_points(
    points_3d: &[[f64; 3]],
    rvec: &[f64; 3],
    tvec: &[f64; 3],
    intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
) -> Vec<[f64; 2]> {
    let rotation = rotation_from_axis_angle(rvec);

    points_3d
        .iter()
        .map(|p| {
            let pc = mat33_mul_vec3(&rotation, p);
            let pc = [pc[0] + tvec[0], pc[1] + tvec[1], pc[2] + tvec[2]];
            if pc[2] <= 0.0 {
                return [f64::NAN, f64::NAN];
            }

            let (xd, yd) = distort_normalized(pc[0] / pc[2], pc[1] / pc[2], distortion);
            let (u, v) = intrinsic.denormalize(xd, yd);
            [u, v]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_project_points_translation() {
        let intrinsic = CameraIntrinsic {
            fx: 100.0,
            fy: 200.0,
            cx: 50.0,
            cy: 40.0,
        };
        let points = project_points(
            &[[1.0, 1.0, 0.0], [0.0, 0.0, -5.0]],
            &[0.0; 3],
            &[0.0, 0.0, 2.0],
            &intrinsic,
            &PolynomialDistortion::default(),
        );

        assert_relative_eq!(points[0][0], 100.0);
        assert_relative_eq!(points[0][1], 140.0);
        assert!(points[1][0].is_nan() && points[1][1].is_nan());
    }

    #[test]
    fn test_project_points_radial_distortion() {
        let intrinsic = CameraIntrinsic {
            fx: 100.0,
            fy: 100.0,
            cx: 0.0,
            cy: 0.0,
        };
        let distortion = PolynomialDistortion {
            k1: 0.1,
            ..Default::default()
        };
        let points = project_points(
            &[[1.0, 0.0, 1.0]],
            &[0.0; 3],
            &[0.0; 3],
            &intrinsic,
            &distortion,
        );

        // r^2 = 1, so the point moves outwards by k1
        assert_relative_eq!(points[0][0], 110.0, epsilon = 1e-9);
        assert_relative_eq!(points[0][1], 0.0, epsilon = 1e-9);
    }
}
