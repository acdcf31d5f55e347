/// lens distortion model module.
pub mod distortion;

/// optimal new camera matrix module.
pub mod optimal;

/// Represents the instrinsic parameters of a pinhole camera
///
/// # Fields
///
/// * `fx` - The focal length in the x direction
/// * `fy` - The focal length in the y direction
/// * `cx` - The x coordinate of the principal point
/// * `cy` - The y coordinate of the principal point
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsic {
    /// The focal length in the x direction
    pub fx: f64,
    /// The focal length in the y direction
    pub fy: f64,
    /// The x coordinate of the principal point
    pub cx: f64,
    /// The y coordinate of the principal point
    pub cy: f64,
}

impl CameraIntrinsic {
    /// Build the intrinsics from a row-major 3x3 camera matrix, ignoring any skew term.
    pub fn from_matrix(k: &[[f64; 3]; 3]) -> Self {
        Self {
            fx: k[0][0],
            fy: k[1][1],
            cx: k[0][2],
            cy: k[1][2],
        }
    }

    /// The row-major 3x3 camera matrix.
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Project a normalized image coordinate to pixels.
    #[inline]
    pub fn denormalize(&self, x: f64, y: f64) -> (f64, f64) {
        (self.fx * x + self.cx, self.fy * y + self.cy)
    }

    /// Back-project a pixel to normalized image coordinates.
    #[inline]
    pub fn normalize(&self, u: f64, v: f64) -> (f64, f64) {
        ((u - self.cx) / self.fx, (v - self.cy) / self.fy)
    }
}
