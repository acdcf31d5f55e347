use crate::error::CalibError;
use camcalib_3d::calibration::CalibrationOutput;
use camcalib_image::ImageSize;
use camcalib_imgproc::calibration::{
    distortion::{DistortionError, PolynomialDistortion},
    CameraIntrinsic,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

/// Name of the YAML result file.
pub const YAML_FILE: &str = "data.yaml";

/// Name of the JSON result file.
pub const JSON_FILE: &str = "data.json";

/// The persisted calibration result.
///
/// The distortion coefficients `(k1, k2, p1, p2, k3)` are stored as a single row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// The row-major 3x3 camera matrix.
    pub camera_matrix: [[f64; 3]; 3],
    /// The distortion coefficients as a 1x5 matrix.
    pub dist_coeff: [[f64; 5]; 1],
    /// The height of the calibrated images.
    pub height: usize,
    /// The width of the calibrated images.
    pub width: usize,
}

impl CalibrationResult {
    /// Create the result of a calibration of images of the given size.
    pub fn new(output: &CalibrationOutput, image_size: ImageSize) -> Self {
        Self {
            camera_matrix: output.camera_matrix(),
            dist_coeff: [output.dist_coeffs()],
            height: image_size.height,
            width: image_size.width,
        }
    }

    /// The intrinsic parameters of the camera.
    pub fn intrinsic(&self) -> CameraIntrinsic {
        CameraIntrinsic::from_matrix(&self.camera_matrix)
    }

    /// The lens distortion of the camera.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored row is not a supported coefficient vector.
    pub fn distortion(&self) -> Result<PolynomialDistortion, DistortionError> {
        PolynomialDistortion::from_coeffs(&self.dist_coeff[0])
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, CalibError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| CalibError::File {
            path: path.to_path_buf(),
            source,
        })
}

fn open(path: &Path) -> Result<BufReader<File>, CalibError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| CalibError::File {
            path: path.to_path_buf(),
            source,
        })
}

/// Write the result as YAML.
pub fn write_yaml(path: impl AsRef<Path>, result: &CalibrationResult) -> Result<(), CalibError> {
    serde_yaml::to_writer(create(path.as_ref())?, result)?;
    Ok(())
}

/// Write the result as JSON.
pub fn write_json(path: impl AsRef<Path>, result: &CalibrationResult) -> Result<(), CalibError> {
    serde_json::to_writer(create(path.as_ref())?, result)?;
    Ok(())
}

/// Read a result written by [`write_yaml`].
pub fn read_yaml(path: impl AsRef<Path>) -> Result<CalibrationResult, CalibError> {
    Ok(serde_yaml::from_reader(open(path.as_ref())?)?)
}

/// Read a result written by [`write_json`].
pub fn read_json(path: impl AsRef<Path>) -> Result<CalibrationResult, CalibError> {
    Ok(serde_json::from_reader(open(path.as_ref())?)?)
}

/// Write `data.yaml` and `data.json` into `output_dir`.
///
/// # Returns
///
/// The paths of the YAML and JSON files.
///
/// # Errors
///
/// Returns an error if a file cannot be created or serialized.
pub fn write_calibration(
    output_dir: impl AsRef<Path>,
    result: &CalibrationResult,
) -> Result<(PathBuf, PathBuf), CalibError> {
    let yaml_path = output_dir.as_ref().join(YAML_FILE);
    let json_path = output_dir.as_ref().join(JSON_FILE);

    write_yaml(&yaml_path, result)?;
    write_json(&json_path, result)?;

    log::info!(
        "calibration written to {} and {}",
        yaml_path.display(),
        json_path.display()
    );

    Ok((yaml_path, json_path))
}
