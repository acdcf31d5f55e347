use crate::pattern::PatternSpec;
use std::path::PathBuf;

/// An error type for the configuration of a calibration run.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    /// The pattern needs at least two internal corners along each side.
    #[error("Invalid pattern size {0}x{1}, expected at least 2x2 internal corners")]
    InvalidPatternSize(usize, usize),

    /// The square size must be a positive number.
    #[error("Invalid square size {0}, expected a positive number")]
    InvalidSquareSize(f64),

    /// The input pattern is not a valid glob.
    #[error("Invalid glob pattern {pattern:?}: {reason}")]
    InvalidGlob {
        /// The rejected pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Configuration of a calibration run.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationConfig {
    /// Glob pattern selecting the input images.
    pub image_glob: String,
    /// Directory receiving the corner visualizations and the undistorted previews.
    ///
    /// No debug output is produced when `None`.
    pub debug_dir: Option<PathBuf>,
    /// Directory receiving `data.yaml` and `data.json`.
    pub output_dir: PathBuf,
    /// The calibration target.
    pub pattern: PatternSpec,
}

impl CalibrationConfig {
    /// Check that the configuration describes a valid run.
    ///
    /// # Errors
    ///
    /// Returns an error if the glob pattern or the calibration target is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        glob::Pattern::new(&self.image_glob).map_err(|e| ConfigError::InvalidGlob {
            pattern: self.image_glob.clone(),
            reason: e.msg.to_string(),
        })?;
        PatternSpec::new(
            self.pattern.width,
            self.pattern.height,
            self.pattern.square_size,
        )?;
        Ok(())
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            image_glob: "data/*.jpg".to_string(),
            debug_dir: Some(PathBuf::from("./output/")),
            output_dir: PathBuf::from("."),
            pattern: PatternSpec {
                width: 7,
                height: 5,
                square_size: 1.0,
            },
        }
    }
}
