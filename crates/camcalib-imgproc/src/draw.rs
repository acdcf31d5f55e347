use camcalib_image::Image;

// writes the color if the pixel lies inside the image
#[inline]
fn set_pixel<const C: usize>(img: &mut Image<u8, C>, x: i64, y: i64, color: [u8; C]) {
    if x < 0 || y < 0 || x >= img.cols() as i64 || y >= img.rows() as i64 {
        return;
    }
    let start = (y as usize * img.cols() + x as usize) * C;
    img.as_slice_mut()[start..start + C].copy_from_slice(&color);
}

/// Draws a line on an image inplace using Bresenham's line algorithm.
///
/// Pixels falling outside the image are skipped.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `p0` - The start point of the line as a tuple of (x, y).
/// * `p1` - The end point of the line as a tuple of (x, y).
/// * `color` - The color of the line as an array of `C` elements.
/// * `thickness` - The thickness of the line.
pub fn draw_line<const C: usize>(
    img: &mut Image<u8, C>,
    p0: (i64, i64),
    p1: (i64, i64),
    color: [u8; C],
    thickness: usize,
) {
    let (mut x0, mut y0) = p0;
    let (x1, y1) = p1;

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut err = dx - dy;
    let half_thickness = thickness as i64 / 2;

    loop {
        for i in -half_thickness..=half_thickness {
            for j in -half_thickness..=half_thickness {
                set_pixel(img, x0 + i, y0 + j, color);
            }
        }

        if x0 == x1 && y0 == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x0 += sx;
        }
        if e2 < dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Draws a circle outline on an image inplace using the midpoint circle algorithm.
///
/// # Arguments
///
/// * `img` - The image to draw on.
/// * `center` - The center of the circle as a tuple of (x, y).
/// * `radius` - The radius of the circle in pixels.
/// * `color` - The color of the circle as an array of `C` elements.
/// * `thickness` - The thickness of the outline, grown symmetrically around `radius`.
pub fn draw_circle<const C: usize>(
    img: &mut Image<u8, C>,
    center: (i64, i64),
    radius: i64,
    color: [u8; C],
    thickness: usize,
) {
    let half_thickness = thickness as i64 / 2;
    let r_min = (radius - half_thickness).max(0);
    let r_max = radius + half_thickness;

    for r in r_min..=r_max {
        draw_circle_outline(img, center, r, color);
    }
}

fn draw_circle_outline<const C: usize>(
    img: &mut Image<u8, C>,
    center: (i64, i64),
    radius: i64,
    color: [u8; C],
) {
    let (cx, cy) = center;

    if radius == 0 {
        set_pixel(img, cx, cy, color);
        return;
    }

    let (mut x, mut y) = (radius, 0);
    let mut err = 1 - radius;

    while x >= y {
        for (px, py) in [
            (cx + x, cy + y),
            (cx - x, cy + y),
            (cx + x, cy - y),
            (cx - x, cy - y),
            (cx + y, cy + x),
            (cx - y, cy + x),
            (cx + y, cy - x),
            (cx - y, cy - x),
        ] {
            set_pixel(img, px, py, color);
        }

        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcalib_image::{Image, ImageError, ImageSize};

    #[rustfmt::skip]
    #[test]
    fn test_draw_line() -> Result<(), ImageError> {
        let mut img = Image::new(
            ImageSize { width: 5, height: 5 }, vec![0u8; 25],
        )?;
        draw_line(&mut img, (0, 0), (4, 4), [255], 1);
        assert_eq!(
            img.as_slice(),
            &[
                255,   0,   0,   0,   0,
                  0, 255,   0,   0,   0,
                  0,   0, 255,   0,   0,
                  0,   0,   0, 255,   0,
                  0,   0,   0,   0, 255,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_draw_line_clipped() -> Result<(), ImageError> {
        let mut img = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 4,
                height: 2,
            },
            0,
        )?;
        draw_line(&mut img, (-3, 1), (10, 1), [0, 255, 0], 1);
        for x in 0..4 {
            assert_eq!(img.get_pixel(x, 1, 1)?, &255);
            assert_eq!(img.get_pixel(x, 0, 1)?, &0);
        }
        Ok(())
    }

    #[rustfmt::skip]
    #[test]
    fn test_draw_circle() -> Result<(), ImageError> {
        let mut img = Image::new(
            ImageSize { width: 5, height: 5 }, vec![0u8; 25],
        )?;
        draw_circle(&mut img, (2, 2), 2, [9], 1);
        assert_eq!(
            img.as_slice(),
            &[
                0, 9, 9, 9, 0,
                9, 0, 0, 0, 9,
                9, 0, 0, 0, 9,
                9, 0, 0, 0, 9,
                0, 9, 9, 9, 0,
            ]
        );
        Ok(())
    }

    #[rustfmt::skip]
    #[test]
    fn test_draw_circle_small() -> Result<(), ImageError> {
        let mut img = Image::new(
            ImageSize { width: 5, height: 5 }, vec![0u8; 25],
        )?;
        draw_circle(&mut img, (2, 2), 1, [1], 1);
        assert_eq!(
            img.as_slice(),
            &[
                0, 0, 0, 0, 0,
                0, 0, 1, 0, 0,
                0, 1, 0, 1, 0,
                0, 0, 1, 0, 0,
                0, 0, 0, 0, 0,
            ]
        );
        Ok(())
    }
}
