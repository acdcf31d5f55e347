use crate::config::ConfigError;
use camcalib_3d::calibration::chessboard_object_points;

/// A planar chessboard target.
///
/// The size counts the internal corners of the board, where four squares meet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatternSpec {
    /// Number of internal corners along a row.
    pub width: usize,
    /// Number of internal corners along a column.
    pub height: usize,
    /// Side length of a square in world units.
    pub square_size: f64,
}

impl PatternSpec {
    /// Create a new pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if a side has less than two internal corners or if the square
    /// size is not a positive number.
    pub fn new(width: usize, height: usize, square_size: f64) -> Result<Self, ConfigError> {
        if width < 2 || height < 2 {
            return Err(ConfigError::InvalidPatternSize(width, height));
        }
        if !(square_size.is_finite() && square_size > 0.0) {
            return Err(ConfigError::InvalidSquareSize(square_size));
        }
        Ok(Self {
            width,
            height,
            square_size,
        })
    }

    /// The pattern size as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of internal corners of the board.
    pub fn num_corners(&self) -> usize {
        self.width * self.height
    }

    /// The 3d coordinates of the internal corners in the board frame.
    ///
    /// Points are row-major with `x` varying fastest and lie on the plane `z = 0`.
    pub fn object_points(&self) -> Vec<[f64; 3]> {
        chessboard_object_points(self.width, self.height, self.square_size)
    }
}
