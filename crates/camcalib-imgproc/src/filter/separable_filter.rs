use camcalib_image::{Image, ImageError};

/// Apply a separable filter to an image.
///
/// The horizontal kernel is applied first and the vertical kernel on its result.
/// Pixels outside the image replicate the nearest border pixel.
///
/// # Arguments
///
/// * `src` - The source image with shape (H, W, C).
/// * `dst` - The destination image with shape (H, W, C).
/// * `kernel_x` - The horizontal kernel.
/// * `kernel_y` - The vertical kernel.
///
/// # Errors
///
/// Returns an error if `src` and `dst` do not have the same size.
pub fn separable_filter<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    kernel_x: &[f32],
    kernel_y: &[f32],
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (rows, cols) = (src.rows(), src.cols());
    if rows == 0 || cols == 0 {
        return Ok(());
    }

    let half_x = (kernel_x.len() / 2) as isize;
    let half_y = (kernel_y.len() / 2) as isize;
    let max_col = cols as isize - 1;
    let max_row = rows as isize - 1;

    let src_data = src.as_slice();
    let mut temp = vec![0.0f32; src_data.len()];

    // horizontal pass
    for r in 0..rows {
        let row_offset = r * cols * C;
        for c in 0..cols {
            let mut acc = [0.0f32; C];
            for (i, &k) in kernel_x.iter().enumerate() {
                let x = (c as isize + i as isize - half_x).clamp(0, max_col) as usize;
                let idx = row_offset + x * C;
                for (ch, acc_val) in acc.iter_mut().enumerate() {
                    *acc_val += src_data[idx + ch] * k;
                }
            }
            temp[row_offset + c * C..row_offset + (c + 1) * C].copy_from_slice(&acc);
        }
    }

    // vertical pass
    let dst_data = dst.as_slice_mut();
    for r in 0..rows {
        let row_offset = r * cols * C;
        for c in 0..cols {
            let mut acc = [0.0f32; C];
            for (i, &k) in kernel_y.iter().enumerate() {
                let y = (r as isize + i as isize - half_y).clamp(0, max_row) as usize;
                let idx = y * cols * C + c * C;
                for (ch, acc_val) in acc.iter_mut().enumerate() {
                    *acc_val += temp[idx + ch] * k;
                }
            }
            dst_data[row_offset + c * C..row_offset + (c + 1) * C].copy_from_slice(&acc);
        }
    }

    Ok(())
}
