use camcalib_image::{Image, ImageError, ImageSize};

/// Create a pair of coordinate maps by evaluating a function on every pixel.
///
/// # Arguments
///
/// * `cols` - The number of columns indicating the width of the grid
/// * `rows` - The number of rows indicating the height of the grid
/// * `f` - Maps a destination pixel `(x, y)` to a source coordinate.
///
/// # Returns
///
/// A tuple of single channel images `(map_x, map_y)` of shape (rows, cols).
pub fn meshgrid_from_fn(
    cols: usize,
    rows: usize,
    f: impl Fn(usize, usize) -> Result<(f32, f32), ImageError>,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    let mut map_x = Vec::with_capacity(rows * cols);
    let mut map_y = Vec::with_capacity(rows * cols);

    for y in 0..rows {
        for x in 0..cols {
            let (u, v) = f(x, y)?;
            map_x.push(u);
            map_y.push(v);
        }
    }

    let size = ImageSize {
        width: cols,
        height: rows,
    };

    Ok((Image::new(size, map_x)?, Image::new(size, map_y)?))
}

#[cfg(test)]
mod tests {
    use camcalib_image::ImageError;

    #[test]
    fn test_meshgrid_identity() -> Result<(), ImageError> {
        let (map_x, map_y) = super::meshgrid_from_fn(3, 2, |x, y| Ok((x as f32, y as f32)))?;

        assert_eq!(map_x.size().width, 3);
        assert_eq!(map_x.size().height, 2);
        assert_eq!(map_x.as_slice(), &[0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
        assert_eq!(map_y.as_slice(), &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);

        Ok(())
    }
}
