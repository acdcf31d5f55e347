//! The calibration pipeline.
//!
//! A run goes through three stages:
//!
//! 1. detect: load every input as grayscale, find the pattern and refine its corners,
//!    then write the corner visualization `<debug_dir>/<stem>_chess.png`.
//! 2. calibrate: estimate the camera model from the views where the pattern was found,
//!    then write `data.yaml` and `data.json`.
//! 3. undistort: undistort the visualization of every view and write it next to it
//!    with the `_undistorted.png` suffix.

use crate::backend::{
    CameraCalibrator, CornerDetector, NativeCalibrator, NativeCornerDetector, NativeUndistorter,
    Undistorter,
};
use crate::config::CalibrationConfig;
use crate::error::CalibError;
use crate::input::resolve_inputs;
use crate::pattern::PatternSpec;
use crate::session::{CalibrationSession, ImageObservation};
use crate::writer::{write_calibration, CalibrationResult};
use camcalib_3d::calibration::{CalibrationError, CalibrationOutput};
use camcalib_image::{Image, ImageSize};
use camcalib_imgproc::chessboard::{draw_chessboard_corners, ChessboardDetection};
use camcalib_imgproc::color::rgb_from_gray;
use camcalib_io::functional::{read_image_any_gray8, read_image_any_rgb8};
use camcalib_io::png::write_image_png_rgb8;
use std::path::{Path, PathBuf};

/// Suffix of the corner visualizations.
pub const CHESS_SUFFIX: &str = "_chess.png";

/// Suffix appended to a visualization path to name its undistorted preview.
pub const UNDISTORTED_SUFFIX: &str = "_undistorted.png";

/// Summary of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// The persisted result.
    pub result: CalibrationResult,
    /// The root mean square reprojection error in pixels.
    pub rms: f64,
    /// Number of images that could be loaded.
    pub num_images: usize,
    /// Number of images where the pattern was found.
    pub num_views: usize,
    /// Path of `data.yaml`.
    pub yaml_path: PathBuf,
    /// Path of `data.json`.
    pub json_path: PathBuf,
    /// Paths of the undistorted previews.
    pub undistorted: Vec<PathBuf>,
}

/// A calibration pipeline made of its three backends.
#[derive(Clone, Debug, Default)]
pub struct Pipeline<D, C, U> {
    /// Finds the pattern in each image.
    pub detector: D,
    /// Estimates the camera model.
    pub calibrator: C,
    /// Produces the undistorted previews.
    pub undistorter: U,
}

impl Pipeline<NativeCornerDetector, NativeCalibrator, NativeUndistorter> {
    /// The pipeline backed by the camcalib algorithms.
    pub fn native() -> Self {
        Self::default()
    }
}

impl<D, C, U> Pipeline<D, C, U>
where
    D: CornerDetector,
    C: CameraCalibrator,
    U: Undistorter,
{
    /// Run the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, if the pattern was found in no
    /// image, if the calibration fails or if an output cannot be written. Nothing is
    /// written to `output_dir` when no pattern was found.
    pub fn run(&self, config: &CalibrationConfig) -> Result<RunSummary, CalibError> {
        config.validate()?;

        let inputs = resolve_inputs(&config.image_glob)?;
        log::info!("{} image(s) match {:?}", inputs.len(), config.image_glob);

        let mut session = CalibrationSession::new(config.pattern);
        detect_stage(
            &self.detector,
            &inputs,
            config.debug_dir.as_deref(),
            &mut session,
        )?;

        let (output, image_size) = calibrate_stage(&self.calibrator, &session)?;
        let result = CalibrationResult::new(&output, image_size);

        create_dir(&config.output_dir)?;
        let (yaml_path, json_path) = write_calibration(&config.output_dir, &result)?;

        let undistorted = undistort_stage(&self.undistorter, &session, &result)?;

        Ok(RunSummary {
            result,
            rms: output.rms,
            num_images: session.observations().len(),
            num_views: session.num_views(),
            yaml_path,
            json_path,
            undistorted,
        })
    }
}

/// Run the native pipeline.
pub fn run(config: &CalibrationConfig) -> Result<RunSummary, CalibError> {
    Pipeline::native().run(config)
}

fn create_dir(dir: &Path) -> Result<(), CalibError> {
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|source| CalibError::File {
        path: dir.to_path_buf(),
        source,
    })
}

// `<debug_dir>/<stem>_chess.png`, named after the whole path when it has no stem
fn visualization_path(debug_dir: &Path, source: &Path) -> PathBuf {
    let stem = match source.file_stem() {
        Some(stem) => stem.to_string_lossy().into_owned(),
        None => {
            let flat = source.to_string_lossy().replace(['/', '\\'], "_");
            log::warn!("{} has no file stem, naming its visualization {flat}", source.display());
            flat
        }
    };
    debug_dir.join(format!("{stem}{CHESS_SUFFIX}"))
}

fn write_visualization(
    debug_dir: &Path,
    source: &Path,
    image: &Image<u8, 1>,
    pattern: &PatternSpec,
    detection: &ChessboardDetection,
) -> Result<PathBuf, CalibError> {
    let mut vis = Image::<u8, 3>::from_size_val(image.size(), 0)?;
    rgb_from_gray(image, &mut vis)?;
    draw_chessboard_corners(&mut vis, pattern.size(), &detection.corners, detection.found);

    let path = visualization_path(debug_dir, source);
    write_image_png_rgb8(&path, &vis)?;

    Ok(path)
}

/// Detect the pattern in every input and record the outcome in the session.
///
/// Inputs that cannot be loaded are logged and skipped. When `debug_dir` is given it is
/// created if missing and receives the corner visualization of every loaded image,
/// whether the pattern was found or not.
///
/// # Errors
///
/// Returns an error if the detector fails or if a visualization cannot be written.
pub fn detect_stage<D: CornerDetector + ?Sized>(
    detector: &D,
    inputs: &[PathBuf],
    debug_dir: Option<&Path>,
    session: &mut CalibrationSession,
) -> Result<(), CalibError> {
    if let Some(dir) = debug_dir {
        create_dir(dir)?;
    }

    for path in inputs {
        log::info!("processing {}", path.display());

        let image = match read_image_any_gray8(path) {
            Ok(image) => image,
            Err(e) => {
                log::warn!("failed to load {}: {}", path.display(), e);
                continue;
            }
        };

        let pattern = *session.pattern();
        let detection = detector.detect(&image, &pattern)?;

        let debug_path = debug_dir
            .map(|dir| write_visualization(dir, path, &image, &pattern, &detection))
            .transpose()?;

        if !detection.found {
            log::warn!("chessboard not found in {}", path.display());
        }

        session.record(ImageObservation {
            source: path.clone(),
            image_size: image.size(),
            found: detection.found,
            corners: detection.corners,
            debug_path,
        });
    }

    log::info!(
        "chessboard found in {} of {} image(s)",
        session.num_views(),
        session.observations().len()
    );

    Ok(())
}

/// Calibrate the camera from the views of the session.
///
/// # Errors
///
/// Returns [`CalibrationError::NoObservations`] if the pattern was found in no image,
/// or the error of the calibrator.
///
/// # Returns
///
/// The calibration output and the image size it was computed for.
pub fn calibrate_stage<C: CameraCalibrator + ?Sized>(
    calibrator: &C,
    session: &CalibrationSession,
) -> Result<(CalibrationOutput, ImageSize), CalibError> {
    let image_size = session
        .image_size()
        .filter(|_| session.num_views() > 0)
        .ok_or(CalibrationError::NoObservations)?;

    let output = calibrator.calibrate(
        session.object_points(),
        session.image_points(),
        image_size,
    )?;

    log::info!("RMS: {}", output.rms);
    log::info!("camera matrix: {:?}", output.camera_matrix());
    log::info!("distortion coefficients: {:?}", output.dist_coeffs());

    Ok((output, image_size))
}

/// Write the undistorted preview of the visualization of every view.
///
/// # Returns
///
/// The paths of the written previews.
///
/// # Errors
///
/// Returns an error if a visualization cannot be read back or a preview written.
pub fn undistort_stage<U: Undistorter + ?Sized>(
    undistorter: &U,
    session: &CalibrationSession,
    result: &CalibrationResult,
) -> Result<Vec<PathBuf>, CalibError> {
    let intrinsic = result.intrinsic();
    let distortion = result.distortion()?;

    session
        .undistort_queue()
        .map(|path| {
            let image = read_image_any_rgb8(path)?;
            let undistorted = undistorter.undistort(&image, &intrinsic, &distortion)?;

            let mut out_path = path.as_os_str().to_owned();
            out_path.push(UNDISTORTED_SUFFIX);
            let out_path = PathBuf::from(out_path);

            write_image_png_rgb8(&out_path, &undistorted)?;
            log::info!("undistorted image written to {}", out_path.display());

            Ok(out_path)
        })
        .collect()
}
