use camcalib_image::{Image, ImageError};

/// Radius of the sampling ring of the ChESS detector.
pub const RING_RADIUS: usize = 5;

// 16 samples on a circle of radius 5; sample n + 4 is a quarter turn after sample n
const RING: [(isize, isize); 16] = [
    (0, -5),
    (2, -5),
    (3, -3),
    (5, -2),
    (5, 0),
    (5, 2),
    (3, 3),
    (2, 5),
    (0, 5),
    (-2, 5),
    (-3, 3),
    (-5, 2),
    (-5, 0),
    (-5, -2),
    (-3, -3),
    (-2, -5),
];

/// A local maximum of the corner response.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CornerCandidate {
    /// Sub-pixel position `[x, y]` of the candidate.
    pub pos: [f32; 2],
    /// Response value at the peak.
    pub strength: f32,
}

/// Compute the ChESS corner response of an image.
///
/// The response is large and positive at X-junctions (the point where four squares of a
/// chessboard meet) and negative on edges:
///
/// `R = sum_response - diff_response - 16 * mean_response`
///
/// Pixels closer than [`RING_RADIUS`] to the border have a response of zero.
///
/// # Arguments
///
/// * `src` - The grayscale image.
/// * `dst` - The response image, same size as `src`.
pub fn chess_response(src: &Image<f32, 1>, dst: &mut Image<f32, 1>) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }

    let (cols, rows) = (src.cols(), src.rows());
    let r = RING_RADIUS;
    let data = src.as_slice();
    let out = dst.as_slice_mut();
    out.iter_mut().for_each(|v| *v = 0.0);

    if cols <= 2 * r || rows <= 2 * r {
        return Ok(());
    }

    let offsets = RING.map(|(dx, dy)| dy * cols as isize + dx);

    for y in r..rows - r {
        for x in r..cols - r {
            let idx = y * cols + x;
            let s = offsets.map(|off| data[(idx as isize + off) as usize]);

            let sum_response = (0..4)
                .map(|n| (s[n] + s[n + 8] - s[n + 4] - s[n + 12]).abs())
                .sum::<f32>();
            let diff_response = (0..8).map(|n| (s[n] - s[n + 8]).abs()).sum::<f32>();

            let ring_mean = s.iter().sum::<f32>() / 16.0;
            let local_mean =
                (data[idx] + data[idx - 1] + data[idx + 1] + data[idx - cols] + data[idx + cols])
                    / 5.0;
            let mean_response = (ring_mean - local_mean).abs();

            out[idx] = sum_response - diff_response - 16.0 * mean_response;
        }
    }

    Ok(())
}

/// Extract the local maxima of a response image.
///
/// A pixel is kept when its response exceeds `max(threshold_rel * max_response,
/// min_response)` and no pixel within `nms_radius` is larger. Ties are resolved in favour
/// of the first pixel in raster order. Each peak is refined with the centroid of the
/// positive response in its 3x3 neighbourhood.
///
/// # Returns
///
/// The candidates sorted by decreasing strength.
pub fn find_response_peaks(
    response: &Image<f32, 1>,
    threshold_rel: f32,
    min_response: f32,
    nms_radius: usize,
) -> Vec<CornerCandidate> {
    let (cols, rows) = (response.cols(), response.rows());
    let data = response.as_slice();
    let border = RING_RADIUS + 1;

    if cols <= 2 * border || rows <= 2 * border {
        return Vec::new();
    }

    let max_response = data.iter().copied().fold(f32::MIN, f32::max);
    let threshold = (threshold_rel * max_response).max(min_response);
    if max_response <= threshold {
        return Vec::new();
    }

    let nms = nms_radius as isize;
    let mut candidates = Vec::new();

    for y in border..rows - border {
        'pixels: for x in border..cols - border {
            let v = data[y * cols + x];
            if v <= threshold {
                continue;
            }

            for dy in -nms..=nms {
                for dx in -nms..=nms {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let (nx, ny) = (x as isize + dx, y as isize + dy);
                    if nx < 0 || ny < 0 || nx >= cols as isize || ny >= rows as isize {
                        continue;
                    }
                    let nv = data[ny as usize * cols + nx as usize];
                    let earlier = dy < 0 || (dy == 0 && dx < 0);
                    if nv > v || (nv == v && earlier) {
                        continue 'pixels;
                    }
                }
            }

            // centroid of the positive response around the peak
            let (mut sw, mut sx, mut sy) = (0.0f32, 0.0f32, 0.0f32);
            for dy in -1..=1isize {
                for dx in -1..=1isize {
                    let nx = (x as isize + dx) as usize;
                    let ny = (y as isize + dy) as usize;
                    let w = data[ny * cols + nx].max(0.0);
                    sw += w;
                    sx += w * dx as f32;
                    sy += w * dy as f32;
                }
            }

            candidates.push(CornerCandidate {
                pos: [x as f32 + sx / sw, y as f32 + sy / sw],
                strength: v,
            });
        }
    }

    candidates.sort_by(|a, b| b.strength.total_cmp(&a.strength));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use camcalib_image::ImageSize;

    // axis aligned 2x2 checker centred on (cx, cy)
    fn checker(size: ImageSize, cx: usize, cy: usize) -> Result<Image<f32, 1>, ImageError> {
        let mut data = Vec::with_capacity(size.area());
        for y in 0..size.height {
            for x in 0..size.width {
                let dark = (x < cx) == (y < cy);
                data.push(if dark { 20.0 } else { 230.0 });
            }
        }
        Image::new(size, data)
    }

    #[test]
    fn test_response_peaks_at_junction() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 31,
            height: 27,
        };
        let image = checker(size, 15, 13)?;
        let mut response = Image::from_size_val(size, 0.0)?;
        chess_response(&image, &mut response)?;

        let peaks = find_response_peaks(&response, 0.2, 10.0, 3);
        assert!(!peaks.is_empty());

        // the junction lies between pixels 14 and 15 along x, 12 and 13 along y
        let [x, y] = peaks[0].pos;
        assert!((x - 14.5).abs() <= 0.6, "{x}");
        assert!((y - 12.5).abs() <= 0.6, "{y}");
        assert!(peaks[0].strength > 0.0);

        Ok(())
    }

    #[test]
    fn test_edge_has_negative_response() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 21,
            height: 21,
        };
        let data = (0..size.area())
            .map(|i| if i % size.width < 10 { 0.0 } else { 255.0 })
            .collect();
        let image = Image::new(size, data)?;
        let mut response = Image::from_size_val(size, 0.0)?;
        chess_response(&image, &mut response)?;

        assert!(response.as_slice().iter().all(|&v| v <= 0.0));
        assert!(find_response_peaks(&response, 0.2, 10.0, 3).is_empty());

        Ok(())
    }

    #[test]
    fn test_flat_image_has_no_peaks() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 20,
            height: 20,
        };
        let image = Image::from_size_val(size, 77.0)?;
        let mut response = Image::from_size_val(size, 1.0)?;
        chess_response(&image, &mut response)?;

        assert!(response.as_slice().iter().all(|&v| v == 0.0));
        assert!(find_response_peaks(&response, 0.2, 10.0, 3).is_empty());

        Ok(())
    }
}
