/// Compute the determinant of a 3x3 matrix.
pub fn det_mat33(m: &[[f64; 3]; 3]) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// Multiply two 3x3 matrices.
pub fn mat33_mul(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    out
}

/// Multiply a 3x3 matrix with a 3d vector.
pub fn mat33_mul_vec3(m: &[[f64; 3]; 3], v: &[f64; 3]) -> [f64; 3] {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

/// Compute the cross product of two 3d vectors.
///
/// # Arguments
///
/// * `a` - The first vector.
/// * `b` - The second vector.
/// * `out` - The output vector.
pub fn cross_vec3(a: &[f64; 3], b: &[f64; 3], out: &mut [f64; 3]) {
    out[0] = a[1] * b[2] - a[2] * b[1];
    out[1] = a[2] * b[0] - a[0] * b[2];
    out[2] = a[0] * b[1] - a[1] * b[0];
}

/// Compute the dot product of two 3d vectors.
pub fn dot_product3(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Scale a 3x3 matrix so that its bottom-right element is one.
///
/// The matrix is left unchanged if that element is zero.
pub fn normalize_mat33_inplace(m: &mut [[f64; 3]; 3]) {
    let s = m[2][2];
    if s == 0.0 {
        return;
    }
    m.iter_mut().flatten().for_each(|v| *v /= s);
}

/// Compute the inverse of a 3x3 matrix.
///
/// # Returns
///
/// The inverse, or `None` if the matrix is singular.
pub fn inverse_mat33(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = det_mat33(m);
    if !det.is_finite() || det.abs() < f64::EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}

/// Convert an axis-angle rotation vector to a rotation matrix (Rodrigues formula).
///
/// # Arguments
///
/// * `rvec` - The rotation axis scaled by the rotation angle in radians.
///
/// # Returns
///
/// The 3x3 rotation matrix.
pub fn rotation_from_axis_angle(rvec: &[f64; 3]) -> [[f64; 3]; 3] {
    let theta = dot_product3(rvec, rvec).sqrt();
    if theta < 1e-12 {
        return [
            [1.0, -rvec[2], rvec[1]],
            [rvec[2], 1.0, -rvec[0]],
            [-rvec[1], rvec[0], 1.0],
        ];
    }

    let [x, y, z] = rvec.map(|v| v / theta);
    let (s, c) = theta.sin_cos();
    let t = 1.0 - c;

    [
        [c + x * x * t, x * y * t - z * s, x * z * t + y * s],
        [y * x * t + z * s, c + y * y * t, y * z * t - x * s],
        [z * x * t - y * s, z * y * t + x * s, c + z * z * t],
    ]
}

/// Convert a rotation matrix to an axis-angle rotation vector.
///
/// The rotation angle of the result lies in `[0, pi]`.
pub fn axis_angle_from_rotation(r: &[[f64; 3]; 3]) -> [f64; 3] {
    let cos = ((r[0][0] + r[1][1] + r[2][2] - 1.0) / 2.0).clamp(-1.0, 1.0);
    let theta = cos.acos();
    let sin = theta.sin();
    let v = [r[2][1] - r[1][2], r[0][2] - r[2][0], r[1][0] - r[0][1]];

    if sin > 1e-6 {
        let scale = theta / (2.0 * sin);
        return v.map(|x| x * scale);
    }

    if cos > 0.0 {
        // small angle: R ~ I + [r]x
        return v.map(|x| x / 2.0);
    }

    // angle close to pi: R ~ 2 k k^T - I
    let diag = [0, 1, 2].map(|i| ((r[i][i] + 1.0) / 2.0).max(0.0).sqrt());
    let mut i = 0;
    for j in 1..3 {
        if diag[j] > diag[i] {
            i = j;
        }
    }
    let mut axis = [0.0; 3];
    for (j, a) in axis.iter_mut().enumerate() {
        *a = if j == i {
            diag[i]
        } else {
            (r[i][j] + r[j][i]) / (4.0 * diag[i])
        };
    }
    let norm = dot_product3(&axis, &axis).sqrt();
    axis.map(|a| a / norm * theta)
}

/// Find the rotation matrix closest to a 3x3 matrix in the Frobenius norm.
///
/// The result is `U * V^T` from the singular value decomposition of `m`, with the sign of
/// the last column of `U` flipped when needed to obtain a proper rotation.
pub fn closest_rotation(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mat = faer::mat![
        [m[0][0], m[0][1], m[0][2]],
        [m[1][0], m[1][1], m[1][2]],
        [m[2][0], m[2][1], m[2][2]],
    ];
    let svd = mat.svd();
    let mut u = svd.u().to_owned();
    let v = svd.v();

    let mut rot = from_faer_mat33(&(u.as_ref() * v.transpose()));
    if det_mat33(&rot) < 0.0 {
        for i in 0..3 {
            u.write(i, 2, -u.read(i, 2));
        }
        rot = from_faer_mat33(&(u.as_ref() * v.transpose()));
    }
    rot
}

fn from_faer_mat33(m: &faer::Mat<f64>) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = m.read(i, j);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_mat33_eq(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3], epsilon: f64) {
        for (x, y) in a.iter().flatten().zip(b.iter().flatten()) {
            assert_relative_eq!(*x, *y, epsilon = epsilon);
        }
    }

    #[test]
    fn test_det_and_inverse() {
        #[rustfmt::skip]
        let m = [
            [2.0, 0.0, 1.0],
            [1.0, 3.0, 0.0],
            [0.0, 1.0, 4.0],
        ];
        assert_relative_eq!(det_mat33(&m), 25.0, epsilon = 1e-12);

        let inv = inverse_mat33(&m).unwrap_or_default();
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_mat33_eq(&mat33_mul(&m, &inv), &identity, 1e-12);

        let singular = [[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 1.0, 1.0]];
        assert!(inverse_mat33(&singular).is_none());
    }

    #[test]
    fn test_cross_and_dot() {
        let mut out = [0.0; 3];
        cross_vec3(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &mut out);
        assert_eq!(out, [0.0, 0.0, 1.0]);
        assert_eq!(dot_product3(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
    }

    #[test]
    fn test_axis_angle_roundtrip() {
        for rvec in [
            [0.1, -0.2, 0.3],
            [1e-9, 0.0, -2e-9],
            [0.0, 0.0, 0.0],
            [3.0, 0.5, -1.0],
            [0.0, std::f64::consts::PI, 0.0],
        ] {
            let r = rotation_from_axis_angle(&rvec);
            assert_relative_eq!(det_mat33(&r), 1.0, epsilon = 1e-9);

            let back = rotation_from_axis_angle(&axis_angle_from_rotation(&r));
            assert_mat33_eq(&back, &r, 1e-9);
        }
    }

    #[test]
    fn test_rotation_about_z() {
        let r = rotation_from_axis_angle(&[0.0, 0.0, std::f64::consts::FRAC_PI_2]);
        let p = mat33_mul_vec3(&r, &[1.0, 0.0, 0.0]);
        assert_relative_eq!(p[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_closest_rotation() {
        let r = rotation_from_axis_angle(&[0.3, -0.1, 0.7]);

        // scaled and slightly perturbed rotation
        let mut noisy = r.map(|row| row.map(|v| v * 1.3));
        noisy[0][1] += 0.01;
        noisy[2][0] -= 0.02;

        let fixed = closest_rotation(&noisy);
        assert_relative_eq!(det_mat33(&fixed), 1.0, epsilon = 1e-9);
        assert_mat33_eq(&fixed, &r, 0.03);

        // a reflection is turned into a rotation
        let reflection = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];
        assert_relative_eq!(det_mat33(&closest_rotation(&reflection)), 1.0, epsilon = 1e-9);
    }
}
