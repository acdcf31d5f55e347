use super::CameraIntrinsic;
use crate::interpolation::grid::meshgrid_from_fn;
use camcalib_image::{Image, ImageError, ImageSize};

/// Number of fixed-point iterations used to invert the distortion model.
const UNDISTORT_ITERATIONS: usize = 5;

/// An error type for the distortion module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum DistortionError {
    /// Error when the coefficient vector has an unsupported length.
    #[error("Expected 4, 5 or 8 distortion coefficients, got {0}")]
    InvalidCoefficientCount(usize),
}

/// Represents the polynomial distortion parameters of a camera
///
/// The radial term is the rational model
/// `(1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)`;
/// with `k4 = k5 = k6 = 0` it reduces to the five-term Brown–Conrady model.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PolynomialDistortion {
    /// The first radial distortion coefficient
    pub k1: f64,
    /// The second radial distortion coefficient
    pub k2: f64,
    /// The third radial distortion coefficient
    pub k3: f64,
    /// The fourth radial distortion coefficient
    pub k4: f64,
    /// The fifth radial distortion coefficient
    pub k5: f64,
    /// The sixth radial distortion coefficient
    pub k6: f64,
    /// The first tangential distortion coefficient
    pub p1: f64,
    /// The second tangential distortion coefficient
    pub p2: f64,
}

impl PolynomialDistortion {
    /// Build the distortion from a coefficient vector in the usual
    /// `(k1, k2, p1, p2[, k3[, k4, k5, k6]])` order.
    ///
    /// # Errors
    ///
    /// Returns an error if the vector does not hold 4, 5 or 8 coefficients.
    pub fn from_coeffs(coeffs: &[f64]) -> Result<Self, DistortionError> {
        if !matches!(coeffs.len(), 4 | 5 | 8) {
            return Err(DistortionError::InvalidCoefficientCount(coeffs.len()));
        }
        let at = |i: usize| coeffs.get(i).copied().unwrap_or(0.0);

        Ok(Self {
            k1: at(0),
            k2: at(1),
            p1: at(2),
            p2: at(3),
            k3: at(4),
            k4: at(5),
            k5: at(6),
            k6: at(7),
        })
    }

    /// The five-term coefficient vector `(k1, k2, p1, p2, k3)`.
    pub fn to_coeffs5(&self) -> [f64; 5] {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
    }
}

/// Distort a point given in normalized image coordinates.
///
/// # Returns
///
/// The distorted normalized coordinates `(xd, yd)`.
pub fn distort_normalized(x: f64, y: f64, distortion: &PolynomialDistortion) -> (f64, f64) {
    let d = distortion;
    let r2 = x * x + y * y;

    // radial distortion
    let kr = (1.0 + ((d.k3 * r2 + d.k2) * r2 + d.k1) * r2)
        / (1.0 + ((d.k6 * r2 + d.k5) * r2 + d.k4) * r2);

    // tangential distortion
    let xd = x * kr + 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
    let yd = y * kr + d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;

    (xd, yd)
}

/// Remove the distortion of a point given in normalized image coordinates.
///
/// The model has no closed-form inverse, so the undistorted point is found by
/// fixed-point iteration starting at the distorted point.
pub fn undistort_normalized(xd: f64, yd: f64, distortion: &PolynomialDistortion) -> (f64, f64) {
    let d = distortion;
    let (mut x, mut y) = (xd, yd);

    for _ in 0..UNDISTORT_ITERATIONS {
        let r2 = x * x + y * y;
        let icdist = (1.0 + ((d.k6 * r2 + d.k5) * r2 + d.k4) * r2)
            / (1.0 + ((d.k3 * r2 + d.k2) * r2 + d.k1) * r2);
        if icdist.is_nan() || icdist <= 0.0 {
            return (xd, yd);
        }
        let delta_x = 2.0 * d.p1 * x * y + d.p2 * (r2 + 2.0 * x * x);
        let delta_y = d.p1 * (r2 + 2.0 * y * y) + 2.0 * d.p2 * x * y;
        x = (xd - delta_x) * icdist;
        y = (yd - delta_y) * icdist;
    }

    (x, y)
}

/// Generate the undistortion map for a polynomial distortion model
///
/// Every pixel of the undistorted image, expressed with `new_intrinsic`, is mapped to
/// the location where the distorted camera observed it.
///
/// # Arguments
///
/// * `intrinsic` - The intrinsic parameters of the camera
/// * `new_intrinsic` - The intrinsic parameters of the undistorted image
/// * `distortion` - The distortion parameters of the camera
/// * `size` - The size of the undistorted image
///
/// # Returns
///
/// * `map_x` - The x map for undistorting the image
/// * `map_y` - The y map for undistorting the image
pub fn generate_correction_map_polynomial(
    intrinsic: &CameraIntrinsic,
    new_intrinsic: &CameraIntrinsic,
    distortion: &PolynomialDistortion,
    size: &ImageSize,
) -> Result<(Image<f32, 1>, Image<f32, 1>), ImageError> {
    meshgrid_from_fn(size.width, size.height, |x, y| {
        let (xn, yn) = new_intrinsic.normalize(x as f64, y as f64);
        let (xd, yd) = distort_normalized(xn, yn, distortion);
        let (u, v) = intrinsic.denormalize(xd, yd);
        Ok((u as f32, v as f32))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn barrel() -> (CameraIntrinsic, PolynomialDistortion) {
        let intrinsic = CameraIntrinsic {
            fx: 577.48583984375,
            fy: 652.8748779296875,
            cx: 320.0,
            cy: 240.0,
        };
        let distortion = PolynomialDistortion {
            k1: -0.21,
            k2: 0.05,
            p1: 0.001,
            p2: -0.0005,
            ..Default::default()
        };
        (intrinsic, distortion)
    }

    #[test]
    fn test_from_coeffs() -> Result<(), DistortionError> {
        let d = PolynomialDistortion::from_coeffs(&[0.1, 0.2, 0.3, 0.4, 0.5])?;
        assert_eq!((d.k1, d.k2, d.p1, d.p2, d.k3), (0.1, 0.2, 0.3, 0.4, 0.5));
        assert_eq!(d.to_coeffs5(), [0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(d.k4, 0.0);

        let d = PolynomialDistortion::from_coeffs(&[0.1, 0.2, 0.3, 0.4])?;
        assert_eq!(d.k3, 0.0);

        assert_eq!(
            PolynomialDistortion::from_coeffs(&[0.1, 0.2]),
            Err(DistortionError::InvalidCoefficientCount(2))
        );
        Ok(())
    }

    #[test]
    fn test_distort_identity() {
        let (xd, yd) = distort_normalized(0.3, -0.2, &PolynomialDistortion::default());
        assert_relative_eq!(xd, 0.3, epsilon = 1e-12);
        assert_relative_eq!(yd, -0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_distort_principal_point_is_fixed() {
        let (_, distortion) = barrel();
        assert_eq!(distort_normalized(0.0, 0.0, &distortion), (0.0, 0.0));
    }

    #[test]
    fn test_undistort_inverts_distort() {
        let (intrinsic, distortion) = barrel();
        for (u, v) in [(100.0, 20.0), (600.0, 400.0), (320.0, 50.0)] {
            let (xn, yn) = intrinsic.normalize(u, v);
            let (xd, yd) = distort_normalized(xn, yn, &distortion);
            let (xu, yu) = undistort_normalized(xd, yd, &distortion);
            let (uu, vu) = intrinsic.denormalize(xu, yu);
            assert_relative_eq!(uu, u, epsilon = 0.05);
            assert_relative_eq!(vu, v, epsilon = 0.05);
        }
    }

    #[test]
    fn test_correction_map_polynomial() -> Result<(), ImageError> {
        let (intrinsic, distortion) = barrel();
        let size = ImageSize {
            width: 8,
            height: 4,
        };

        let (map_x, map_y) =
            generate_correction_map_polynomial(&intrinsic, &intrinsic, &distortion, &size)?;

        assert_eq!(map_x.size(), size);
        assert_eq!(map_y.size(), size);

        let (xn, yn) = intrinsic.normalize(3.0, 2.0);
        let (xd, yd) = distort_normalized(xn, yn, &distortion);
        let (u, v) = intrinsic.denormalize(xd, yd);
        assert_relative_eq!(map_x.as_slice()[2 * 8 + 3], u as f32, epsilon = 1e-3);
        assert_relative_eq!(map_y.as_slice()[2 * 8 + 3], v as f32, epsilon = 1e-3);

        Ok(())
    }
}
