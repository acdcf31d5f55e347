use super::HomographyError;
use crate::linalg;
use camcalib_imgproc::calibration::CameraIntrinsic;

/// Recover the pose of a plane from its homography to the image.
///
/// The plane is `z = 0` in world coordinates. With `K^-1 H = lambda [r1 r2 t]` the
/// rotation is completed with `r3 = r1 x r2` and projected onto SO(3). The sign of
/// `lambda` is chosen so that the plane lies in front of the camera.
///
/// # Arguments
///
/// * `homography` - The plane to image homography.
/// * `intrinsic` - The intrinsic parameters of the camera.
///
/// # Returns
///
/// The world to camera rotation as an axis-angle vector and the translation.
///
/// # Errors
///
/// Returns an error if the homography does not describe a plane in front of the camera.
pub fn pose_from_homography(
    homography: &[[f64; 3]; 3],
    intrinsic: &CameraIntrinsic,
) -> Result<([f64; 3], [f64; 3]), HomographyError> {
    let k_inv = |j: usize| {
        let c = [homography[0][j], homography[1][j], homography[2][j]];
        [
            (c[0] - intrinsic.cx * c[2]) / intrinsic.fx,
            (c[1] - intrinsic.cy * c[2]) / intrinsic.fy,
            c[2],
        ]
    };
    let (h1, h2, h3) = (k_inv(0), k_inv(1), k_inv(2));

    let norm1 = linalg::dot_product3(&h1, &h1).sqrt();
    let norm2 = linalg::dot_product3(&h2, &h2).sqrt();
    if !(norm1 + norm2).is_normal() {
        return Err(HomographyError::DegenerateConfiguration);
    }

    let mut lambda = 2.0 / (norm1 + norm2);
    if h3[2] * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1 = h1.map(|v| v * lambda);
    let r2 = h2.map(|v| v * lambda);
    let tvec = h3.map(|v| v * lambda);

    let mut r3 = [0.0; 3];
    linalg::cross_vec3(&r1, &r2, &mut r3);

    let approx = [
        [r1[0], r2[0], r3[0]],
        [r1[1], r2[1], r3[1]],
        [r1[2], r2[2], r3[2]],
    ];
    let rotation = linalg::closest_rotation(&approx);

    Ok((linalg::axis_angle_from_rotation(&rotation), tvec))
}
