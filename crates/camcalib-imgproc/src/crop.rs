use camcalib_image::{Image, ImageError};

/// Crop an image to a specified region.
///
/// The size of the region is given by the size of the destination image.
///
/// # Arguments
///
/// * `src` - The source image to crop.
/// * `dst` - The destination image to store the cropped image.
/// * `x` - The x-coordinate of the top-left corner of the region to crop.
/// * `y` - The y-coordinate of the top-left corner of the region to crop.
///
/// # Errors
///
/// Returns [`ImageError::InvalidCropRegion`] if the region does not fit inside the source image.
///
/// # Examples
///
/// ```rust
/// use camcalib_image::{Image, ImageSize};
/// use camcalib_imgproc::crop::crop_image;
///
/// let image = Image::<_, 1>::new(ImageSize { width: 4, height: 4 }, vec![
///     0u8, 1, 2, 3,
///     4u8, 5, 6, 7,
///     8u8, 9, 10, 11,
///     12u8, 13, 14, 15
/// ]).unwrap();
///
/// let mut cropped = Image::<_, 1>::from_size_val(ImageSize { width: 2, height: 2 }, 0u8).unwrap();
///
/// crop_image(&image, &mut cropped, 1, 1).unwrap();
///
/// assert_eq!(cropped.as_slice(), &[5u8, 6, 9, 10]);
/// ```
pub fn crop_image<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    x: usize,
    y: usize,
) -> Result<(), ImageError>
where
    T: Copy,
{
    let (dst_cols, dst_rows) = (dst.cols(), dst.rows());

    if x + dst_cols > src.cols() || y + dst_rows > src.rows() {
        return Err(ImageError::InvalidCropRegion(x, y, dst_cols, dst_rows));
    }

    if dst_cols == 0 {
        return Ok(());
    }

    let src_stride = src.cols() * C;
    let src_data = src.as_slice();

    dst.as_slice_mut()
        .chunks_exact_mut(dst_cols * C)
        .enumerate()
        .for_each(|(i, dst_row)| {
            // get the slice at the top left corner
            let offset = (y + i) * src_stride + x * C;
            dst_row.copy_from_slice(&src_data[offset..offset + dst_cols * C]);
        });

    Ok(())
}
