use crate::draw::{draw_circle, draw_line};
use camcalib_image::Image;

const CORNER_RADIUS: i64 = 4;
const MISSED_COLOR: [u8; 3] = [255, 0, 0];
const ROW_COLORS: [[u8; 3]; 7] = [
    [255, 0, 0],
    [255, 128, 0],
    [200, 200, 0],
    [0, 255, 0],
    [0, 200, 200],
    [0, 0, 255],
    [255, 0, 255],
];

fn to_pixel(p: &[f32; 2]) -> (i64, i64) {
    (p[0].round() as i64, p[1].round() as i64)
}

/// Overlay chessboard corners on an image.
///
/// When the pattern was found each corner is drawn as a circle coloured by its row and
/// consecutive corners are joined by lines. Otherwise every corner is drawn as a red
/// circle with a cross.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `pattern_size` - The number of internal corners `(width, height)`.
/// * `corners` - The corners to draw, row-major when `found`.
/// * `found` - Whether the corners form the complete pattern.
pub fn draw_chessboard_corners(
    img: &mut Image<u8, 3>,
    pattern_size: (usize, usize),
    corners: &[[f32; 2]],
    found: bool,
) {
    if !found || pattern_size.0 == 0 {
        let r = CORNER_RADIUS;
        for (x, y) in corners.iter().map(to_pixel) {
            draw_line(img, (x - r, y - r), (x + r, y + r), MISSED_COLOR, 1);
            draw_line(img, (x - r, y + r), (x + r, y - r), MISSED_COLOR, 1);
            draw_circle(img, (x, y), r, MISSED_COLOR, 1);
        }
        return;
    }

    let mut prev: Option<(i64, i64)> = None;
    for (i, corner) in corners.iter().enumerate() {
        let color = ROW_COLORS[(i / pattern_size.0) % ROW_COLORS.len()];
        let p = to_pixel(corner);
        if let Some(prev) = prev {
            draw_line(img, prev, p, color, 1);
        }
        draw_circle(img, p, CORNER_RADIUS, color, 1);
        prev = Some(p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcalib_image::ImageError;

    #[test]
    fn test_draw_found_rows() -> Result<(), ImageError> {
        let mut img = Image::<u8, 3>::from_size_val([40, 40].into(), 0)?;
        let corners = [[10.0, 10.0], [30.0, 10.0], [10.0, 30.0], [30.0, 30.0]];
        draw_chessboard_corners(&mut img, (2, 2), &corners, true);

        // first row red, second row orange, both on the circle at radius 4
        assert_eq!(img.get([10, 14, 0]), Some(&255));
        assert_eq!(img.get([10, 14, 1]), Some(&0));
        assert_eq!(img.get([30, 34, 1]), Some(&128));
        // line between the two corners of the first row
        assert_eq!(img.get([10, 20, 0]), Some(&255));

        Ok(())
    }

    #[test]
    fn test_draw_not_found_cross() -> Result<(), ImageError> {
        let mut img = Image::<u8, 3>::from_size_val([20, 20].into(), 0)?;
        draw_chessboard_corners(&mut img, (7, 5), &[[10.0, 10.0]], false);

        assert_eq!(img.get([10, 10, 0]), Some(&255));
        assert_eq!(img.get([12, 12, 0]), Some(&255));
        assert_eq!(img.get([12, 12, 2]), Some(&0));
        assert_eq!(img.get([0, 0, 0]), Some(&0));

        Ok(())
    }
}
