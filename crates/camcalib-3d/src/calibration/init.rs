use super::CalibrationError;
use crate::linalg;
use camcalib_image::ImageSize;
use camcalib_imgproc::calibration::CameraIntrinsic;
use faer::prelude::SpSolverLstsq;

fn normalized(v: [f64; 3]) -> [f64; 3] {
    let n = linalg::dot_product3(&v, &v).sqrt();
    v.map(|x| x / n)
}

/// Closed-form estimate of the focal lengths from plane to image homographies.
///
/// The principal point is fixed at the image centre. Each homography gives two
/// orthogonality constraints on the image of the absolute conic (between its two
/// columns and between their sum and difference), solved in the least squares sense.
/// When the views do not constrain the focal lengths (e.g. a single fronto-parallel
/// view) the focal length falls back to the largest image side.
pub(crate) fn init_intrinsics(
    homographies: &[[[f64; 3]; 3]],
    image_size: ImageSize,
) -> Result<CameraIntrinsic, CalibrationError> {
    if homographies.is_empty() {
        return Err(CalibrationError::NoObservations);
    }

    let cx = (image_size.width as f64 - 1.0) / 2.0;
    let cy = (image_size.height as f64 - 1.0) / 2.0;

    let n = homographies.len();
    let mut mat_a = faer::Mat::<f64>::zeros(2 * n, 2);
    let mut mat_b = faer::Mat::<f64>::zeros(2 * n, 1);

    for (i, h) in homographies.iter().enumerate() {
        // move the principal point to the origin
        let mut h = *h;
        for j in 0..3 {
            h[0][j] -= h[2][j] * cx;
            h[1][j] -= h[2][j] * cy;
        }

        let u = [h[0][0], h[1][0], h[2][0]];
        let v = [h[0][1], h[1][1], h[2][1]];
        let d1 = [0, 1, 2].map(|k| (u[k] + v[k]) / 2.0);
        let d2 = [0, 1, 2].map(|k| (u[k] - v[k]) / 2.0);
        let (u, v, d1, d2) = (normalized(u), normalized(v), normalized(d1), normalized(d2));

        mat_a.write(2 * i, 0, u[0] * v[0]);
        mat_a.write(2 * i, 1, u[1] * v[1]);
        mat_b.write(2 * i, 0, -u[2] * v[2]);

        mat_a.write(2 * i + 1, 0, d1[0] * d2[0]);
        mat_a.write(2 * i + 1, 1, d1[1] * d2[1]);
        mat_b.write(2 * i + 1, 0, -d1[2] * d2[2]);
    }

    let f = mat_a.qr().solve_lstsq(mat_b);
    let fx = (1.0 / f.read(0, 0)).abs().sqrt();
    let fy = (1.0 / f.read(1, 0)).abs().sqrt();

    let valid = |v: f64| v.is_finite() && v > 0.0;
    let (fx, fy) = if valid(fx) && valid(fy) {
        (fx, fy)
    } else {
        let f = image_size.width.max(image_size.height) as f64;
        log::warn!("focal length is not observable from the views, starting from {f}");
        (f, f)
    };

    Ok(CameraIntrinsic { fx, fy, cx, cy })
}
