mod draw;
mod grid;
mod response;
mod synthetic;

pub use draw::draw_chessboard_corners;
pub use grid::assemble_grid;
pub use response::{chess_response, find_response_peaks, CornerCandidate, RING_RADIUS};
pub use synthetic::render_chessboard;

use crate::filter::gaussian_blur;
use camcalib_image::{Image, ImageError};

/// An error type for the chessboard module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ChessboardError {
    /// The pattern needs at least two internal corners along each side.
    #[error("Invalid pattern size {0}x{1}, expected at least 2x2 internal corners")]
    InvalidPatternSize(usize, usize),

    /// The board to image homography cannot be inverted.
    #[error("The homography is singular")]
    SingularHomography,

    /// Error from the underlying image operations.
    #[error(transparent)]
    ImageError(#[from] ImageError),
}

/// Parameters of the chessboard detector.
#[derive(Clone, Debug, PartialEq)]
pub struct ChessboardParams {
    /// Standard deviation of the gaussian blur applied before the corner response.
    pub blur_sigma: f32,
    /// Minimum response relative to the strongest one to keep a candidate.
    pub threshold_rel: f32,
    /// Minimum absolute response to keep a candidate.
    pub min_response: f32,
    /// Radius of the non-maximum suppression.
    pub nms_radius: usize,
    /// Number of seed candidates tried when assembling the grid.
    pub max_seeds: usize,
}

impl Default for ChessboardParams {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            threshold_rel: 0.2,
            min_response: 100.0,
            nms_radius: 3,
            max_seeds: 10,
        }
    }
}

/// The result of a chessboard detection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChessboardDetection {
    /// Whether the complete pattern was found.
    pub found: bool,
    /// When found, the internal corners in row-major order with `width` corners per row.
    /// Otherwise the raw corner candidates, strongest first.
    pub corners: Vec<[f32; 2]>,
}

/// Find the internal corners of a chessboard.
///
/// See [`find_chessboard_corners_with_params`].
pub fn find_chessboard_corners(
    image: &Image<u8, 1>,
    pattern_size: (usize, usize),
) -> Result<ChessboardDetection, ChessboardError> {
    find_chessboard_corners_with_params(image, pattern_size, &ChessboardParams::default())
}

/// Find the internal corners of a chessboard with custom detector parameters.
///
/// X-junction candidates are extracted from the ChESS response of the smoothed image and
/// then organised into a `width x height` lattice. The corners are ordered row by row,
/// starting from the corner closest to the image origin.
///
/// # Arguments
///
/// * `image` - The grayscale image.
/// * `pattern_size` - The number of internal corners `(width, height)`.
/// * `params` - The detector parameters.
///
/// # Returns
///
/// The detection. When the pattern is not found the candidates are returned so that
/// they can be visualized.
///
/// # Errors
///
/// Returns an error if the pattern has less than 2 internal corners along a side.
pub fn find_chessboard_corners_with_params(
    image: &Image<u8, 1>,
    pattern_size: (usize, usize),
    params: &ChessboardParams,
) -> Result<ChessboardDetection, ChessboardError> {
    let (width, height) = pattern_size;
    if width < 2 || height < 2 {
        return Err(ChessboardError::InvalidPatternSize(width, height));
    }

    let gray = image.cast_and_scale::<f32>(1.0)?;
    let mut blurred = Image::from_size_val(gray.size(), 0.0f32)?;
    gaussian_blur(
        &gray,
        &mut blurred,
        (5, 5),
        (params.blur_sigma, params.blur_sigma),
    )?;

    let mut response = Image::from_size_val(gray.size(), 0.0f32)?;
    chess_response(&blurred, &mut response)?;

    let mut candidates = find_response_peaks(
        &response,
        params.threshold_rel,
        params.min_response,
        params.nms_radius,
    );
    candidates.truncate((4 * width * height).max(200));

    log::debug!("{} corner candidates", candidates.len());

    let points = candidates.iter().map(|c| c.pos).collect::<Vec<_>>();

    Ok(match assemble_grid(&points, width, height, params.max_seeds) {
        Some(corners) => ChessboardDetection {
            found: true,
            corners,
        },
        None => ChessboardDetection {
            found: false,
            corners: points,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_size() -> Result<(), ChessboardError> {
        let image = Image::<u8, 1>::from_size_val([32, 32].into(), 0)?;
        assert_eq!(
            find_chessboard_corners(&image, (1, 5)),
            Err(ChessboardError::InvalidPatternSize(1, 5))
        );
        Ok(())
    }

    #[test]
    fn test_solid_image_not_found() -> Result<(), ChessboardError> {
        let image = Image::<u8, 1>::from_size_val([64, 48].into(), 90)?;
        let detection = find_chessboard_corners(&image, (7, 5))?;

        assert!(!detection.found);
        assert!(detection.corners.is_empty());

        Ok(())
    }
}
