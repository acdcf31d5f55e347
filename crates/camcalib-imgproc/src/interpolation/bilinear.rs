use camcalib_image::Image;

/// Kernel for bilinear interpolation
///
/// Neighbours outside the image contribute zero.
pub(crate) fn bilinear_interpolation<const C: usize>(
    image: &Image<f32, C>,
    u: f32,
    v: f32,
) -> [f32; C] {
    let mut pixel = [0.0; C];
    if !u.is_finite() || !v.is_finite() {
        return pixel;
    }

    let (cols, rows) = (image.cols() as i64, image.rows() as i64);

    let (u0, v0) = (u.floor(), v.floor());
    let (frac_u, frac_v) = (u - u0, v - v0);
    let (iu0, iv0) = (u0 as i64, v0 as i64);

    let data = image.as_slice();
    let neighbours = [
        (iu0, iv0, (1.0 - frac_u) * (1.0 - frac_v)),
        (iu0 + 1, iv0, frac_u * (1.0 - frac_v)),
        (iu0, iv0 + 1, (1.0 - frac_u) * frac_v),
        (iu0 + 1, iv0 + 1, frac_u * frac_v),
    ];

    for (iu, iv, w) in neighbours {
        if iu < 0 || iv < 0 || iu >= cols || iv >= rows || w == 0.0 {
            continue;
        }
        let base = (iv as usize * cols as usize + iu as usize) * C;
        for (k, p) in pixel.iter_mut().enumerate() {
            *p += data[base + k] * w;
        }
    }

    pixel
}

#[cfg(test)]
mod tests {
    use camcalib_image::{Image, ImageError, ImageSize};

    #[test]
    fn test_bilinear_inside_and_outside() -> Result<(), ImageError> {
        let image = Image::<f32, 1>::new(
            ImageSize {
                width: 2,
                height: 2,
            },
            vec![0.0, 10.0, 20.0, 30.0],
        )?;

        assert_eq!(super::bilinear_interpolation(&image, 0.5, 0.5), [15.0]);
        assert_eq!(super::bilinear_interpolation(&image, 1.0, 1.0), [30.0]);
        // half of the footprint falls outside the image
        assert_eq!(super::bilinear_interpolation(&image, 1.5, 0.0), [5.0]);
        assert_eq!(super::bilinear_interpolation(&image, -5.0, 0.0), [0.0]);

        Ok(())
    }
}
