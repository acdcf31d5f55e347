use crate::linalg;

/// Smallest ratio between the 8th and the largest singular value of the DLT system.
const RANK_TOLERANCE: f64 = 1e-10;

/// Error types for the homography estimation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum HomographyError {
    /// Not enough correspondences to estimate a homography.
    #[error("Homography requires at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimum number of correspondences.
        required: usize,
        /// Number of correspondences provided.
        actual: usize,
    },

    /// The source and destination point sets have different lengths.
    #[error("Mismatched number of points: {0} source vs {1} destination")]
    MismatchedLengths(usize, usize),

    /// The correspondences do not constrain a unique homography (e.g. collinear points).
    #[error("Degenerate point configuration")]
    DegenerateConfiguration,
}

/// Estimate the homography mapping `src` to `dst` with the normalized DLT algorithm.
///
/// Both point sets are centred and scaled so that their mean distance to the origin is
/// `sqrt(2)` before solving the linear system with a singular value decomposition.
///
/// # Arguments
///
/// * `src` - The source 2d points, at least 4.
/// * `dst` - The destination 2d points, same length as `src`.
///
/// # Returns
///
/// The 3x3 homography normalized so that its bottom-right element is one.
///
/// # Errors
///
/// Returns an error if there are less than 4 points or if they are degenerate.
pub fn find_homography_dlt(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<[[f64; 3]; 3], HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::MismatchedLengths(src.len(), dst.len()));
    }
    if src.len() < 4 {
        return Err(HomographyError::InsufficientCorrespondences {
            required: 4,
            actual: src.len(),
        });
    }

    let (src_n, t_src) = normalize_points_2d(src);
    let (dst_n, t_dst) = normalize_points_2d(dst);

    // construct matrix A
    let n = src_n.len();
    let mut mat_a = faer::Mat::<f64>::zeros(2 * n, 9);
    for (i, (x1, x2)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        mat_a.write(2 * i, 0, x1[0]);
        mat_a.write(2 * i, 1, x1[1]);
        mat_a.write(2 * i, 2, 1.0);
        mat_a.write(2 * i, 6, -x2[0] * x1[0]);
        mat_a.write(2 * i, 7, -x2[0] * x1[1]);
        mat_a.write(2 * i, 8, -x2[0]);

        mat_a.write(2 * i + 1, 3, x1[0]);
        mat_a.write(2 * i + 1, 4, x1[1]);
        mat_a.write(2 * i + 1, 5, 1.0);
        mat_a.write(2 * i + 1, 6, -x2[1] * x1[0]);
        mat_a.write(2 * i + 1, 7, -x2[1] * x1[1]);
        mat_a.write(2 * i + 1, 8, -x2[1]);
    }

    // the solution is the right singular vector of the smallest singular value
    let svd = mat_a.svd();
    let s = svd.s_diagonal();
    if s[0].is_nan() || s[0] <= 0.0 || s[7] / s[0] < RANK_TOLERANCE {
        return Err(HomographyError::DegenerateConfiguration);
    }
    let h = svd.v().col(8);
    let homo_n = [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], h[8]]];

    // denormalize: H = T_dst^-1 * H_n * T_src
    let t_dst_inv =
        linalg::inverse_mat33(&t_dst).ok_or(HomographyError::DegenerateConfiguration)?;
    let mut homo = linalg::mat33_mul(&t_dst_inv, &linalg::mat33_mul(&homo_n, &t_src));

    if homo[2][2].abs() < f64::EPSILON {
        return Err(HomographyError::DegenerateConfiguration);
    }
    linalg::normalize_mat33_inplace(&mut homo);

    if !homo.iter().flatten().all(|v| v.is_finite()) {
        return Err(HomographyError::DegenerateConfiguration);
    }

    Ok(homo)
}

// similarity transform moving the centroid to the origin with mean distance sqrt(2)
fn normalize_points_2d(x: &[[f64; 2]]) -> (Vec<[f64; 2]>, [[f64; 3]; 3]) {
    let n = x.len() as f64;
    let (mut mx, mut my) = (0.0, 0.0);
    for p in x {
        mx += p[0];
        my += p[1];
    }
    mx /= n;
    my /= n;

    let mean_dist = x
        .iter()
        .map(|p| (p[0] - mx).hypot(p[1] - my))
        .sum::<f64>()
        / n;
    let scale = if mean_dist > 0.0 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let xn = x
        .iter()
        .map(|p| [(p[0] - mx) * scale, (p[1] - my) * scale])
        .collect();

    let t = [
        [scale, 0.0, -scale * mx],
        [0.0, scale, -scale * my],
        [0.0, 0.0, 1.0],
    ];
    (xn, t)
}
