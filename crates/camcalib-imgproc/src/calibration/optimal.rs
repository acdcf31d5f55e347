use super::distortion::{undistort_normalized, PolynomialDistortion};
use super::CameraIntrinsic;
use camcalib_image::ImageSize;

// samples per image side used to trace the undistorted image outline
const GRID_SAMPLES: usize = 9;

/// A rectangular region of interest in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Roi {
    /// The x-coordinate of the top-left corner.
    pub x: usize,
    /// The y-coordinate of the top-left corner.
    pub y: usize,
    /// The width of the region.
    pub width: usize,
    /// The height of the region.
    pub height: usize,
}

impl Roi {
    /// Whether the region covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

// axis-aligned rectangle in floating point coordinates: (x, y, width, height)
#[derive(Clone, Copy, Debug)]
struct Rect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

// Undistort a grid over the image and return the largest rectangle inscribed in the
// undistorted outline and the smallest one containing it. The rectangles are in
// normalized coordinates, or in pixels when `new_intrinsic` is given.
fn undistorted_rectangles(
    intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
    new_intrinsic: Option<&CameraIntrinsic>,
    size: &ImageSize,
) -> (Rect, Rect) {
    let n = GRID_SAMPLES;
    let step_x = (size.width as f64 - 1.0) / (n - 1) as f64;
    let step_y = (size.height as f64 - 1.0) / (n - 1) as f64;

    let (mut ix0, mut ix1, mut iy0, mut iy1) = (f64::MIN, f64::MAX, f64::MIN, f64::MAX);
    let (mut ox0, mut ox1, mut oy0, mut oy1) = (f64::MAX, f64::MIN, f64::MAX, f64::MIN);

    for j in 0..n {
        for i in 0..n {
            let (xd, yd) = intrinsic.normalize(i as f64 * step_x, j as f64 * step_y);
            let (xu, yu) = undistort_normalized(xd, yd, distortion);
            let (px, py) = match new_intrinsic {
                Some(k) => k.denormalize(xu, yu),
                None => (xu, yu),
            };

            ox0 = ox0.min(px);
            ox1 = ox1.max(px);
            oy0 = oy0.min(py);
            oy1 = oy1.max(py);

            if i == 0 {
                ix0 = ix0.max(px);
            }
            if i == n - 1 {
                ix1 = ix1.min(px);
            }
            if j == 0 {
                iy0 = iy0.max(py);
            }
            if j == n - 1 {
                iy1 = iy1.min(py);
            }
        }
    }

    let inner = Rect {
        x: ix0,
        y: iy0,
        width: ix1 - ix0,
        height: iy1 - iy0,
    };
    let outer = Rect {
        x: ox0,
        y: oy0,
        width: ox1 - ox0,
        height: oy1 - oy0,
    };

    (inner, outer)
}

/// Compute a new camera matrix for an undistorted image and its valid pixel region.
///
/// With `alpha = 0` the new image only shows valid pixels (the undistorted image is
/// zoomed so that no black border remains). With `alpha = 1` every source pixel is
/// kept in view, at the cost of black regions near the borders.
///
/// # Arguments
///
/// * `intrinsic` - The intrinsic parameters of the camera.
/// * `distortion` - The distortion parameters of the camera.
/// * `size` - The size of the distorted image.
/// * `alpha` - Free scaling parameter between 0 and 1.
/// * `new_size` - The size of the undistorted image.
///
/// # Returns
///
/// The new intrinsics and the region of the undistorted image that only contains
/// valid pixels, clipped to `new_size`. The region is empty when no valid pixel remains.
pub fn get_optimal_new_camera_matrix(
    intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
    size: &ImageSize,
    alpha: f64,
    new_size: &ImageSize,
) -> (CameraIntrinsic, Roi) {
    let alpha = alpha.clamp(0.0, 1.0);
    let (inner, outer) = undistorted_rectangles(intrinsic, distortion, None, size);

    let new_w = new_size.width as f64 - 1.0;
    let new_h = new_size.height as f64 - 1.0;

    // projection mapping the inner rectangle to the viewport
    let fx0 = new_w / inner.width;
    let fy0 = new_h / inner.height;
    let cx0 = -fx0 * inner.x;
    let cy0 = -fy0 * inner.y;

    // projection mapping the outer rectangle to the viewport
    let fx1 = new_w / outer.width;
    let fy1 = new_h / outer.height;
    let cx1 = -fx1 * outer.x;
    let cy1 = -fy1 * outer.y;

    let new_intrinsic = CameraIntrinsic {
        fx: fx0 * (1.0 - alpha) + fx1 * alpha,
        fy: fy0 * (1.0 - alpha) + fy1 * alpha,
        cx: cx0 * (1.0 - alpha) + cx1 * alpha,
        cy: cy0 * (1.0 - alpha) + cy1 * alpha,
    };

    let (inner, _) = undistorted_rectangles(intrinsic, distortion, Some(&new_intrinsic), size);
    let roi = clip_rect(&inner, new_size);

    (new_intrinsic, roi)
}

// round the rectangle inwards and intersect it with the image
fn clip_rect(rect: &Rect, size: &ImageSize) -> Roi {
    if ![rect.x, rect.y, rect.width, rect.height]
        .iter()
        .all(|v| v.is_finite())
    {
        return Roi::default();
    }

    let x0 = rect.x.ceil() as i64;
    let y0 = rect.y.ceil() as i64;
    let x1 = x0 + rect.width.floor() as i64;
    let y1 = y0 + rect.height.floor() as i64;

    let x0 = x0.clamp(0, size.width as i64);
    let y0 = y0.clamp(0, size.height as i64);
    let x1 = x1.clamp(0, size.width as i64);
    let y1 = y1.clamp(0, size.height as i64);

    if x1 <= x0 || y1 <= y0 {
        return Roi::default();
    }

    Roi {
        x: x0 as usize,
        y: y0 as usize,
        width: (x1 - x0) as usize,
        height: (y1 - y0) as usize,
    }
}
