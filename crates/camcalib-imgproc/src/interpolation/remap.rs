use super::interpolate::{interpolate_pixel, InterpolationMode};
use camcalib_image::{Image, ImageError};

/// Apply generic geometric transformation to an image.
///
/// Each destination pixel `(x, y)` reads the source at `(map_x[y, x], map_y[y, x])`.
///
/// # Arguments
///
/// * `src` - The input image container with shape (height, width, C).
/// * `dst` - The output image container with shape (height, width, C).
/// * `map_x` - The x coordinates of the pixels to interpolate.
/// * `map_y` - The y coordinates of the pixels to interpolate.
/// * `interpolation` - The interpolation mode to use.
///
/// # Errors
///
/// * The mapx and mapy must have the same size.
/// * The output image must have the same size as the mapx and mapy.
pub fn remap<const C: usize>(
    src: &Image<f32, C>,
    dst: &mut Image<f32, C>,
    map_x: &Image<f32, 1>,
    map_y: &Image<f32, 1>,
    interpolation: InterpolationMode,
) -> Result<(), ImageError> {
    if map_x.size() != map_y.size() {
        return Err(ImageError::InvalidImageSize(
            map_x.cols(),
            map_x.rows(),
            map_y.cols(),
            map_y.rows(),
        ));
    }

    if dst.size() != map_x.size() {
        return Err(ImageError::InvalidImageSize(
            map_x.cols(),
            map_x.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    dst.as_slice_mut()
        .chunks_exact_mut(C)
        .zip(map_x.as_slice().iter().zip(map_y.as_slice()))
        .for_each(|(dst_pixel, (&x, &y))| {
            dst_pixel.copy_from_slice(&interpolate_pixel(src, x, y, interpolation));
        });

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::interpolation::InterpolationMode;
    use camcalib_image::{Image, ImageError, ImageSize};

    #[test]
    fn test_remap_smoke() -> Result<(), ImageError> {
        let image = Image::<_, 1>::new(
            ImageSize {
                width: 3,
                height: 3,
            },
            vec![0f32, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
        )?;

        let new_size = ImageSize {
            width: 2,
            height: 2,
        };

        let map_x = Image::<_, 1>::new(new_size, vec![0.0, 2.0, 0.0, 2.0])?;
        let map_y = Image::<_, 1>::new(new_size, vec![0.0, 0.0, 2.0, 2.0])?;

        let mut image_transformed = Image::<_, 1>::from_size_val(new_size, 0.0)?;

        super::remap(
            &image,
            &mut image_transformed,
            &map_x,
            &map_y,
            InterpolationMode::Bilinear,
        )?;

        for (a, b) in image_transformed.as_slice().iter().zip([0.0, 2.0, 6.0, 8.0]) {
            assert!((a - b).abs() < 1e-6);
        }

        Ok(())
    }

    #[test]
    fn test_remap_outside_is_black() -> Result<(), ImageError> {
        let image = Image::<f32, 3>::from_size_val([2, 2].into(), 100.0)?;
        let size = ImageSize {
            width: 2,
            height: 1,
        };
        let map_x = Image::<_, 1>::new(size, vec![0.0, 50.0])?;
        let map_y = Image::<_, 1>::new(size, vec![1.0, -50.0])?;
        let mut dst = Image::<f32, 3>::from_size_val(size, 7.0)?;

        super::remap(&image, &mut dst, &map_x, &map_y, InterpolationMode::Bilinear)?;

        assert_eq!(dst.as_slice(), &[100.0, 100.0, 100.0, 0.0, 0.0, 0.0]);

        Ok(())
    }

    #[test]
    fn test_remap_size_mismatch() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;
        let map_x = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;
        let map_y = Image::<f32, 1>::from_size_val([3, 2].into(), 0.0)?;
        let mut dst = Image::<f32, 1>::from_size_val([2, 2].into(), 0.0)?;

        let res = super::remap(&image, &mut dst, &map_x, &map_y, InterpolationMode::Bilinear);
        assert!(res.is_err());

        Ok(())
    }
}
