use super::ChessboardError;
use camcalib_image::{Image, ImageSize};

const DARK: f64 = 30.0;
const LIGHT: f64 = 225.0;

fn invert_homography(h: &[[f64; 3]; 3]) -> Result<[[f64; 3]; 3], ChessboardError> {
    let [[a, b, c], [d, e, f], [g, k, i]] = *h;

    let co_a = e * i - f * k;
    let co_b = -(d * i - f * g);
    let co_c = d * k - e * g;
    let det = a * co_a + b * co_b + c * co_c;

    if !det.is_finite() || det.abs() < f64::EPSILON {
        return Err(ChessboardError::SingularHomography);
    }

    Ok([
        [co_a / det, -(b * i - c * k) / det, (b * f - c * e) / det],
        [co_b / det, (a * i - c * g) / det, -(a * f - c * d) / det],
        [co_c / det, -(a * k - b * g) / det, (a * e - b * d) / det],
    ])
}

/// Render a chessboard seen through a homography.
///
/// The board has `(width + 1) x (height + 1)` squares of unit size, so that its internal
/// corners lie at the integer board coordinates `(i, j)` with `i < width` and
/// `j < height`. The square containing `(0, 0)` at its bottom-right corner is dark.
/// Everything outside the board is light.
///
/// # Arguments
///
/// * `size` - The size of the rendered image.
/// * `board_to_image` - Homography mapping board coordinates to pixel coordinates.
/// * `pattern_size` - The number of internal corners `(width, height)`.
/// * `supersample` - Samples per pixel side used for anti-aliasing.
///
/// # Errors
///
/// Returns an error if the homography cannot be inverted.
pub fn render_chessboard(
    size: ImageSize,
    board_to_image: &[[f64; 3]; 3],
    pattern_size: (usize, usize),
    supersample: usize,
) -> Result<Image<u8, 1>, ChessboardError> {
    let hi = invert_homography(board_to_image)?;
    let (pw, ph) = (pattern_size.0 as f64, pattern_size.1 as f64);
    let ss = supersample.max(1);
    let offsets = (0..ss)
        .map(|s| -0.5 + (s as f64 + 0.5) / ss as f64)
        .collect::<Vec<_>>();

    let shade = |u: f64, v: f64| {
        let bw = hi[2][0] * u + hi[2][1] * v + hi[2][2];
        if bw <= 0.0 {
            return LIGHT;
        }
        let bx = (hi[0][0] * u + hi[0][1] * v + hi[0][2]) / bw;
        let by = (hi[1][0] * u + hi[1][1] * v + hi[1][2]) / bw;

        let inside = bx >= -1.0 && bx < pw && by >= -1.0 && by < ph;
        let parity = (bx.floor() + by.floor()).rem_euclid(2.0);
        if inside && parity == 0.0 {
            DARK
        } else {
            LIGHT
        }
    };

    let mut data = Vec::with_capacity(size.area());
    for y in 0..size.height {
        for x in 0..size.width {
            let mut acc = 0.0;
            for oy in offsets.iter() {
                for ox in offsets.iter() {
                    acc += shade(x as f64 + ox, y as f64 + oy);
                }
            }
            data.push((acc / (ss * ss) as f64).round() as u8);
        }
    }

    Ok(Image::new(size, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_axis_aligned_board() -> Result<(), ChessboardError> {
        // 10 pixels per square, corner (0, 0) at pixel (20, 20)
        #[rustfmt::skip]
        let h = [
            [10.0, 0.0, 20.0],
            [0.0, 10.0, 20.0],
            [0.0, 0.0, 1.0],
        ];
        let image = render_chessboard([80, 70].into(), &h, (3, 2), 2)?;

        assert_eq!(image.size(), [80, 70].into());
        // square [-1, 0) x [-1, 0) is dark, its right neighbour light
        assert_eq!(image.get_pixel(15, 15, 0)?, &30);
        assert_eq!(image.get_pixel(25, 15, 0)?, &225);
        assert_eq!(image.get_pixel(25, 25, 0)?, &30);
        // outside the board
        assert_eq!(image.get_pixel(2, 2, 0)?, &225);
        assert_eq!(image.get_pixel(75, 65, 0)?, &225);

        Ok(())
    }

    #[test]
    fn test_render_singular_homography() {
        let h = [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(matches!(
            render_chessboard([10, 10].into(), &h, (3, 2), 1),
            Err(ChessboardError::SingularHomography)
        ));
    }
}
