use super::TermCriteria;
use crate::ops::project_points;
use camcalib_imgproc::calibration::{distortion::PolynomialDistortion, CameraIntrinsic};
use faer::prelude::SpSolver;

/// Parameters shared by every view: `fx, fy, cx, cy, k1, k2, p1, p2, k3`.
pub(crate) const NUM_INTRINSIC: usize = 9;
/// Parameters of one view: rotation vector then translation.
pub(crate) const NUM_POSE: usize = 6;

// relative step of the central differences
const JACOBIAN_STEP: f64 = 1e-6;
const INITIAL_LAMBDA: f64 = 1e-3;
const MIN_LAMBDA: f64 = 1e-12;
const MAX_LAMBDA: f64 = 1e12;
const MIN_DIAGONAL: f64 = 1e-12;

/// Unpack the camera model from a parameter vector.
pub(crate) fn camera_from_params(params: &[f64]) -> (CameraIntrinsic, PolynomialDistortion) {
    let intrinsic = CameraIntrinsic {
        fx: params[0],
        fy: params[1],
        cx: params[2],
        cy: params[3],
    };
    let distortion = PolynomialDistortion {
        k1: params[4],
        k2: params[5],
        p1: params[6],
        p2: params[7],
        k3: params[8],
        ..Default::default()
    };
    (intrinsic, distortion)
}

/// Pose of a view as `(rvec, tvec)`.
pub(crate) fn pose_from_params(params: &[f64], view: usize) -> ([f64; 3], [f64; 3]) {
    let p = &params[NUM_INTRINSIC + NUM_POSE * view..NUM_INTRINSIC + NUM_POSE * (view + 1)];
    ([p[0], p[1], p[2]], [p[3], p[4], p[5]])
}

/// Reprojection problem over all the views.
pub(crate) struct ReprojectionProblem<'a> {
    object_points: &'a [Vec<[f64; 3]>],
    image_points: &'a [Vec<[f64; 2]>],
    // first residual of each view
    offsets: Vec<usize>,
    num_residuals: usize,
}

impl<'a> ReprojectionProblem<'a> {
    pub(crate) fn new(
        object_points: &'a [Vec<[f64; 3]>],
        image_points: &'a [Vec<[f64; 2]>],
    ) -> Self {
        let mut offsets = Vec::with_capacity(object_points.len());
        let mut num_residuals = 0;
        for points in object_points {
            offsets.push(num_residuals);
            num_residuals += 2 * points.len();
        }

        Self {
            object_points,
            image_points,
            offsets,
            num_residuals,
        }
    }

    fn num_views(&self) -> usize {
        self.object_points.len()
    }

    fn view_residuals(&self, params: &[f64], view: usize, out: &mut [f64]) {
        let (intrinsic, distortion) = camera_from_params(params);
        let (rvec, tvec) = pose_from_params(params, view);

        let projected = project_points(
            &self.object_points[view],
            &rvec,
            &tvec,
            &intrinsic,
            &distortion,
        );

        for (i, (p, q)) in projected.iter().zip(&self.image_points[view]).enumerate() {
            out[2 * i] = p[0] - q[0];
            out[2 * i + 1] = p[1] - q[1];
        }
    }

    /// Residuals `projected - observed` of all the views, `[du, dv]` per point.
    pub(crate) fn residuals(&self, params: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.num_residuals];
        for view in 0..self.num_views() {
            let start = self.offsets[view];
            let len = 2 * self.object_points[view].len();
            self.view_residuals(params, view, &mut out[start..start + len]);
        }
        out
    }

    // central differences; a pose parameter only moves the residuals of its own view
    fn jacobian(&self, params: &[f64], free: &[usize]) -> faer::Mat<f64> {
        let mut jac = faer::Mat::<f64>::zeros(self.num_residuals, free.len());
        let max_len = self.object_points.iter().map(|p| 2 * p.len()).max().unwrap_or(0);
        let (mut plus, mut minus) = (vec![0.0; max_len], vec![0.0; max_len]);

        for (col, &p) in free.iter().enumerate() {
            let h = JACOBIAN_STEP * params[p].abs().max(1.0);
            let mut params_plus = params.to_vec();
            let mut params_minus = params.to_vec();
            params_plus[p] += h;
            params_minus[p] -= h;

            let views = if p < NUM_INTRINSIC {
                0..self.num_views()
            } else {
                let view = (p - NUM_INTRINSIC) / NUM_POSE;
                view..view + 1
            };

            for view in views {
                let len = 2 * self.object_points[view].len();
                self.view_residuals(&params_plus, view, &mut plus[..len]);
                self.view_residuals(&params_minus, view, &mut minus[..len]);
                for k in 0..len {
                    jac.write(self.offsets[view] + k, col, (plus[k] - minus[k]) / (2.0 * h));
                }
            }
        }

        jac
    }
}

fn sum_squares(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Minimize the reprojection error with Levenberg-Marquardt.
///
/// Only the parameters listed in `free` are optimized. The damping is applied on the
/// diagonal of the normal equations.
///
/// # Returns
///
/// The final sum of squared residuals.
pub(crate) fn levenberg_marquardt(
    problem: &ReprojectionProblem,
    params: &mut [f64],
    free: &[usize],
    criteria: &TermCriteria,
) -> f64 {
    let mut residuals = problem.residuals(params);
    let mut cost = sum_squares(&residuals);
    let mut lambda = INITIAL_LAMBDA;
    let n = free.len();

    for iteration in 0..criteria.max_iterations {
        let jac = problem.jacobian(params, free);
        let res = faer::Mat::<f64>::from_fn(residuals.len(), 1, |i, _| residuals[i]);
        let jtj = jac.transpose() * jac.as_ref();
        let jtr = jac.transpose() * res.as_ref();

        let mut step = None;
        while lambda <= MAX_LAMBDA {
            let mut mat_a = jtj.clone();
            for i in 0..n {
                let d = jtj.read(i, i);
                mat_a.write(i, i, d + lambda * d.max(MIN_DIAGONAL));
            }
            let rhs = faer::Mat::<f64>::from_fn(n, 1, |i, _| -jtr.read(i, 0));
            let delta = mat_a.partial_piv_lu().solve(rhs);

            let mut candidate = params.to_vec();
            for (k, &p) in free.iter().enumerate() {
                candidate[p] += delta.read(k, 0);
            }
            let candidate_residuals = problem.residuals(&candidate);
            let candidate_cost = sum_squares(&candidate_residuals);

            if candidate_cost < cost {
                let step_norm = (0..n).map(|k| delta.read(k, 0).powi(2)).sum::<f64>().sqrt();
                params.copy_from_slice(&candidate);
                residuals = candidate_residuals;
                cost = candidate_cost;
                lambda = (lambda / 10.0).max(MIN_LAMBDA);
                step = Some(step_norm);
                break;
            }
            lambda *= 10.0;
        }

        log::debug!(
            "iteration {}: cost {:.6e}, lambda {:.1e}",
            iteration,
            cost,
            lambda
        );

        let Some(step_norm) = step else {
            // no step decreases the cost anymore
            break;
        };
        let param_norm = free.iter().map(|&p| params[p].powi(2)).sum::<f64>().sqrt();
        if step_norm <= criteria.epsilon * (param_norm + criteria.epsilon) {
            break;
        }
    }

    cost
}
