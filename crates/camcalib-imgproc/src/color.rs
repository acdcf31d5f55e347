use camcalib_image::{Image, ImageError};

/// Convert a grayscale image to an RGB image by replicating the grayscale value across all channels.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dst` - The output RGB image.
///
/// Precondition: the input and output images must have the same size.
///
/// # Example
///
/// ```
/// use camcalib_image::{Image, ImageSize};
/// use camcalib_imgproc::color::rgb_from_gray;
///
/// let image = Image::<u8, 1>::new(
///     ImageSize {
///         width: 2,
///         height: 1,
///     },
///     vec![10, 200],
/// )
/// .unwrap();
///
/// let mut rgb = Image::<u8, 3>::from_size_val(image.size(), 0).unwrap();
///
/// rgb_from_gray(&image, &mut rgb).unwrap();
/// assert_eq!(rgb.as_slice(), &[10, 10, 10, 200, 200, 200]);
/// ```
pub fn rgb_from_gray<T>(src: &Image<T, 1>, dst: &mut Image<T, 3>) -> Result<(), ImageError>
where
    T: Copy,
{
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    src.as_slice()
        .iter()
        .zip(dst.as_slice_mut().chunks_exact_mut(3))
        .for_each(|(&gray, dst_pixel)| {
            dst_pixel.copy_from_slice(&[gray, gray, gray]);
        });

    Ok(())
}
