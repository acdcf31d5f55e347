use camcalib_image::{Image, ImageError};

/// Termination criteria of an iterative refinement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TermCriteria {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Stop once an update moves the estimate by less than this distance.
    pub epsilon: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            epsilon: 0.1,
        }
    }
}

// bilinear sample replicating the border pixels
fn sample_replicate(data: &[f32], cols: usize, rows: usize, x: f64, y: f64) -> f64 {
    let x = x.clamp(0.0, (cols - 1) as f64);
    let y = y.clamp(0.0, (rows - 1) as f64);

    let (x0, y0) = (x.floor() as usize, y.floor() as usize);
    let (x1, y1) = ((x0 + 1).min(cols - 1), (y0 + 1).min(rows - 1));
    let (fx, fy) = (x - x0 as f64, y - y0 as f64);

    let p00 = data[y0 * cols + x0] as f64;
    let p01 = data[y0 * cols + x1] as f64;
    let p10 = data[y1 * cols + x0] as f64;
    let p11 = data[y1 * cols + x1] as f64;

    (p00 * (1.0 - fx) + p01 * fx) * (1.0 - fy) + (p10 * (1.0 - fx) + p11 * fx) * fy
}

/// Refine corner locations to sub-pixel accuracy.
///
/// Each corner is moved to the point where the image gradients inside a window around it
/// are orthogonal to the vectors joining the point and the window pixels. Window pixels
/// are weighted by a gaussian centred on the corner.
///
/// A corner whose refined position leaves its search window keeps its initial position.
///
/// # Arguments
///
/// * `image` - The grayscale image.
/// * `corners` - The corners to refine as `[x, y]`, updated inplace.
/// * `win_size` - Half of the side length of the search window `(half_width, half_height)`.
/// * `criteria` - When to stop iterating on each corner.
///
/// # Errors
///
/// Returns an error if the window is empty or larger than the image.
pub fn corner_sub_pix(
    image: &Image<u8, 1>,
    corners: &mut [[f32; 2]],
    win_size: (usize, usize),
    criteria: TermCriteria,
) -> Result<(), ImageError> {
    let (win_w, win_h) = win_size;
    let (cols, rows) = (image.cols(), image.rows());

    if win_w == 0 || win_h == 0 || cols < 2 * win_w + 3 || rows < 2 * win_h + 3 {
        return Err(ImageError::InvalidImageSize(cols, rows, win_w, win_h));
    }

    let data = image.as_slice().iter().map(|&v| v as f32).collect::<Vec<_>>();

    // gaussian weights over the window
    let mask_x = (-(win_w as i64)..=win_w as i64)
        .map(|i| {
            let t = i as f64 / win_w as f64;
            (-t * t).exp()
        })
        .collect::<Vec<_>>();
    let mask_y = (-(win_h as i64)..=win_h as i64)
        .map(|i| {
            let t = i as f64 / win_h as f64;
            (-t * t).exp()
        })
        .collect::<Vec<_>>();

    let (patch_w, patch_h) = (2 * win_w + 3, 2 * win_h + 3);
    let mut patch = vec![0.0f64; patch_w * patch_h];
    let max_iterations = criteria.max_iterations.max(1);
    let eps_sq = criteria.epsilon * criteria.epsilon;

    for corner in corners.iter_mut() {
        let initial = (corner[0] as f64, corner[1] as f64);
        let (mut cx, mut cy) = initial;

        for _ in 0..max_iterations {
            // sample the window plus a one pixel margin for the gradients
            for (i, row) in patch.chunks_exact_mut(patch_w).enumerate() {
                let y = cy + i as f64 - (win_h + 1) as f64;
                for (j, p) in row.iter_mut().enumerate() {
                    let x = cx + j as f64 - (win_w + 1) as f64;
                    *p = sample_replicate(&data, cols, rows, x, y);
                }
            }

            let (mut a, mut b, mut c, mut bb1, mut bb2) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for (i, &my) in mask_y.iter().enumerate() {
                let py = i as f64 - win_h as f64;
                for (j, &mx) in mask_x.iter().enumerate() {
                    let px = j as f64 - win_w as f64;
                    let m = mx * my;

                    let tgx = patch[(i + 1) * patch_w + j + 2] - patch[(i + 1) * patch_w + j];
                    let tgy = patch[(i + 2) * patch_w + j + 1] - patch[i * patch_w + j + 1];

                    let gxx = tgx * tgx * m;
                    let gxy = tgx * tgy * m;
                    let gyy = tgy * tgy * m;

                    a += gxx;
                    b += gxy;
                    c += gyy;
                    bb1 += gxx * px + gxy * py;
                    bb2 += gxy * px + gyy * py;
                }
            }

            let det = a * c - b * b;
            if det.abs() <= f64::EPSILON * f64::EPSILON {
                break;
            }

            let scale = 1.0 / det;
            let nx = cx + c * scale * bb1 - b * scale * bb2;
            let ny = cy - b * scale * bb1 + a * scale * bb2;
            let moved_sq = (nx - cx).powi(2) + (ny - cy).powi(2);
            cx = nx;
            cy = ny;

            if cx < 0.0 || cx >= cols as f64 || cy < 0.0 || cy >= rows as f64 {
                break;
            }
            if moved_sq <= eps_sq {
                break;
            }
        }

        // reject corners that escaped the search window
        if (cx - initial.0).abs() > win_w as f64 || (cy - initial.1).abs() > win_h as f64 {
            log::debug!(
                "corner ({:.1}, {:.1}) left its window, keeping it",
                initial.0,
                initial.1
            );
            (cx, cy) = initial;
        }

        *corner = [cx as f32, cy as f32];
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{corner_sub_pix, TermCriteria};
    use camcalib_image::{Image, ImageError, ImageSize};

    // 2x2 checker with the X junction at (cx, cy), anti-aliased by area coverage
    fn checker(size: ImageSize, cx: f64, cy: f64) -> Result<Image<u8, 1>, ImageError> {
        let ss = 8;
        let mut data = Vec::with_capacity(size.area());
        for y in 0..size.height {
            for x in 0..size.width {
                let mut acc = 0.0;
                for sy in 0..ss {
                    for sx in 0..ss {
                        let u = x as f64 - 0.5 + (sx as f64 + 0.5) / ss as f64;
                        let v = y as f64 - 0.5 + (sy as f64 + 0.5) / ss as f64;
                        if (u < cx) == (v < cy) {
                            acc += 255.0;
                        }
                    }
                }
                data.push((acc / (ss * ss) as f64).round() as u8);
            }
        }
        Image::new(size, data)
    }

    #[test]
    fn test_refine_moves_to_junction() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 40,
            height: 40,
        };
        let image = checker(size, 20.3, 18.6)?;

        let mut corners = [[21.0f32, 18.0]];
        corner_sub_pix(&image, &mut corners, (5, 5), TermCriteria::default())?;

        assert!((corners[0][0] - 20.3).abs() < 0.1, "{:?}", corners);
        assert!((corners[0][1] - 18.6).abs() < 0.1, "{:?}", corners);

        Ok(())
    }

    #[test]
    fn test_flat_window_keeps_corner() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([30, 30].into(), 128)?;

        let mut corners = [[12.0f32, 15.0]];
        corner_sub_pix(&image, &mut corners, (5, 5), TermCriteria::default())?;

        assert_eq!(corners, [[12.0, 15.0]]);

        Ok(())
    }

    #[test]
    fn test_window_larger_than_image() -> Result<(), ImageError> {
        let image = Image::<u8, 1>::from_size_val([8, 8].into(), 0)?;
        let mut corners = [[4.0f32, 4.0]];
        assert!(corner_sub_pix(&image, &mut corners, (5, 5), TermCriteria::default()).is_err());

        Ok(())
    }
}
