//! # Camera calibration
//!
//! Intrinsic calibration of a pinhole camera with polynomial lens distortion from several
//! views of a planar target (Zhang's method):
//!
//! 1. a homography per view,
//! 2. closed-form focal lengths with the principal point at the image centre,
//! 3. a pose per view from its homography,
//! 4. joint Levenberg-Marquardt refinement of the reprojection error.

mod init;
mod lm;

use crate::pose::{find_homography_dlt, pose_from_homography, HomographyError};
use camcalib_image::ImageSize;
use camcalib_imgproc::calibration::{distortion::PolynomialDistortion, CameraIntrinsic};
use lm::{camera_from_params, pose_from_params, ReprojectionProblem, NUM_INTRINSIC};

/// Error types for the camera calibration.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalibrationError {
    /// No view was given to the calibration.
    #[error("Calibration requires at least one view")]
    NoObservations,

    /// The object and image point lists have different lengths.
    #[error("Mismatched array lengths: {left_name} ({left_len}) != {right_name} ({right_len})")]
    MismatchedArrayLengths {
        /// Label for the left-hand list.
        left_name: &'static str,
        /// Length of the left-hand list.
        left_len: usize,
        /// Label for the right-hand list.
        right_name: &'static str,
        /// Length of the right-hand list.
        right_len: usize,
    },

    /// A view has too few correspondences.
    #[error("View {view} has {actual} points, at least {required} are required")]
    InsufficientPoints {
        /// Index of the view.
        view: usize,
        /// Minimum number of points.
        required: usize,
        /// Number of points in the view.
        actual: usize,
    },

    /// The object points of a view are not on the `z = 0` plane.
    #[error("Object points of view {0} are not on the z = 0 plane")]
    NonPlanarObjectPoints(usize),

    /// The image size is empty.
    #[error("Invalid image size {0}x{1}")]
    InvalidImageSize(usize, usize),

    /// The homography of a view could not be estimated.
    #[error("View {view}: {source}")]
    Homography {
        /// Index of the view.
        view: usize,
        /// The underlying error.
        #[source]
        source: HomographyError,
    },

    /// The optimization ended in a non finite solution.
    #[error("Degenerate configuration: {0}")]
    DegenerateConfiguration(String),
}

/// Parameters held fixed during the calibration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CalibrationFlags {
    /// Keep the third radial coefficient `k3` at zero.
    pub fix_k3: bool,
    /// Keep the principal point at the image centre.
    pub fix_principal_point: bool,
    /// Keep the tangential coefficients `p1` and `p2` at zero.
    pub zero_tangent_dist: bool,
}

/// Termination criteria of the optimization.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TermCriteria {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Stop when the relative change of the parameters falls below this value.
    pub epsilon: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            epsilon: f64::EPSILON,
        }
    }
}

/// The result of a camera calibration.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationOutput {
    /// The intrinsic parameters of the camera.
    pub intrinsic: CameraIntrinsic,
    /// The lens distortion of the camera.
    pub distortion: PolynomialDistortion,
    /// The world to camera rotation of each view as an axis-angle vector.
    pub rvecs: Vec<[f64; 3]>,
    /// The world to camera translation of each view.
    pub tvecs: Vec<[f64; 3]>,
    /// The root mean square reprojection error in pixels.
    pub rms: f64,
}

impl CalibrationOutput {
    /// The row-major 3x3 camera matrix.
    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        self.intrinsic.to_matrix()
    }

    /// The distortion coefficients `(k1, k2, p1, p2, k3)`.
    pub fn dist_coeffs(&self) -> [f64; 5] {
        self.distortion.to_coeffs5()
    }
}

/// Build the object points of a chessboard.
///
/// # Arguments
///
/// * `width` - Number of internal corners per row.
/// * `height` - Number of rows of internal corners.
/// * `square_size` - Side length of a square.
///
/// # Returns
///
/// The `width * height` corners in row-major order, corner `(col, row)` being at
/// `(col * square_size, row * square_size, 0)`.
pub fn chessboard_object_points(width: usize, height: usize, square_size: f64) -> Vec<[f64; 3]> {
    (0..height)
        .flat_map(|row| {
            (0..width).map(move |col| [col as f64 * square_size, row as f64 * square_size, 0.0])
        })
        .collect()
}

fn validate_views(
    object_points: &[Vec<[f64; 3]>],
    image_points: &[Vec<[f64; 2]>],
    image_size: ImageSize,
) -> Result<(), CalibrationError> {
    if object_points.len() != image_points.len() {
        return Err(CalibrationError::MismatchedArrayLengths {
            left_name: "object_points",
            left_len: object_points.len(),
            right_name: "image_points",
            right_len: image_points.len(),
        });
    }
    if object_points.is_empty() {
        return Err(CalibrationError::NoObservations);
    }
    if image_size.width == 0 || image_size.height == 0 {
        return Err(CalibrationError::InvalidImageSize(
            image_size.width,
            image_size.height,
        ));
    }

    for (view, (obj, img)) in object_points.iter().zip(image_points).enumerate() {
        if obj.len() != img.len() {
            return Err(CalibrationError::MismatchedArrayLengths {
                left_name: "view object points",
                left_len: obj.len(),
                right_name: "view image points",
                right_len: img.len(),
            });
        }
        if obj.len() < 4 {
            return Err(CalibrationError::InsufficientPoints {
                view,
                required: 4,
                actual: obj.len(),
            });
        }
        if obj.iter().any(|p| p[2].abs() > 1e-12) {
            return Err(CalibrationError::NonPlanarObjectPoints(view));
        }
    }

    Ok(())
}

/// Calibrate a camera from views of a planar target.
///
/// Estimates the intrinsic parameters, the distortion coefficients `(k1, k2, p1, p2, k3)`
/// and the pose of each view by minimizing the reprojection error of the object points.
///
/// # Arguments
///
/// * `object_points` - Per view, the target points on the `z = 0` plane.
/// * `image_points` - Per view, the observed pixel coordinates of the target points.
/// * `image_size` - The size of the images.
/// * `flags` - Parameters held fixed.
/// * `criteria` - Termination criteria of the optimization.
///
/// # Errors
///
/// Returns an error if there is no view, if the inputs are inconsistent, if a view has
/// less than 4 points or non planar object points, or if the views are degenerate.
pub fn calibrate_camera(
    object_points: &[Vec<[f64; 3]>],
    image_points: &[Vec<[f64; 2]>],
    image_size: ImageSize,
    flags: CalibrationFlags,
    criteria: TermCriteria,
) -> Result<CalibrationOutput, CalibrationError> {
    validate_views(object_points, image_points, image_size)?;

    let homographies = object_points
        .iter()
        .zip(image_points)
        .enumerate()
        .map(|(view, (obj, img))| {
            let plane = obj.iter().map(|p| [p[0], p[1]]).collect::<Vec<_>>();
            find_homography_dlt(&plane, img)
                .map_err(|source| CalibrationError::Homography { view, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let intrinsic = init::init_intrinsics(&homographies, image_size)?;
    log::debug!(
        "initial focal lengths fx = {:.3}, fy = {:.3}",
        intrinsic.fx,
        intrinsic.fy
    );

    let mut params = vec![intrinsic.fx, intrinsic.fy, intrinsic.cx, intrinsic.cy];
    params.extend([0.0; NUM_INTRINSIC - 4]);
    for (view, h) in homographies.iter().enumerate() {
        let (rvec, tvec) = pose_from_homography(h, &intrinsic)
            .map_err(|source| CalibrationError::Homography { view, source })?;
        params.extend(rvec);
        params.extend(tvec);
    }

    let free = (0..params.len())
        .filter(|&p| match p {
            2 | 3 => !flags.fix_principal_point,
            6 | 7 => !flags.zero_tangent_dist,
            8 => !flags.fix_k3,
            _ => true,
        })
        .collect::<Vec<_>>();

    let problem = ReprojectionProblem::new(object_points, image_points);
    let cost = lm::levenberg_marquardt(&problem, &mut params, &free, &criteria);

    if !cost.is_finite() || !params.iter().all(|v| v.is_finite()) {
        return Err(CalibrationError::DegenerateConfiguration(
            "the optimization diverged".to_string(),
        ));
    }

    let num_points = object_points.iter().map(|p| p.len()).sum::<usize>();
    let rms = (cost / num_points as f64).sqrt();

    let (intrinsic, distortion) = camera_from_params(&params);
    if intrinsic.fx <= 0.0 || intrinsic.fy <= 0.0 {
        return Err(CalibrationError::DegenerateConfiguration(format!(
            "non positive focal length ({}, {})",
            intrinsic.fx, intrinsic.fy
        )));
    }

    let (rvecs, tvecs): (Vec<_>, Vec<_>) = (0..object_points.len())
        .map(|view| pose_from_params(&params, view))
        .unzip();

    Ok(CalibrationOutput {
        intrinsic,
        distortion,
        rvecs,
        tvecs,
        rms,
    })
}
