use crate::config::ConfigError;
use camcalib_3d::calibration::CalibrationError;
use camcalib_image::ImageError;
use camcalib_imgproc::calibration::distortion::DistortionError;
use camcalib_imgproc::chessboard::ChessboardError;
use camcalib_io::error::IoError;

/// An error type for the calibration pipeline.
#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    /// The run is misconfigured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failed to read or write an image.
    #[error(transparent)]
    Io(#[from] IoError),

    /// Error from the underlying image operations.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error from the chessboard detector.
    #[error(transparent)]
    Chessboard(#[from] ChessboardError),

    /// The stored distortion coefficients are invalid.
    #[error(transparent)]
    Distortion(#[from] DistortionError),

    /// The calibration failed.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Filesystem error outside of the image codecs.
    #[error("Failed to access {path}")]
    File {
        /// The path being accessed.
        path: std::path::PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the result as YAML.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Failed to serialize the result as JSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
