use crate::error::CalibError;
use crate::pattern::PatternSpec;
use camcalib_3d::calibration::{
    calibrate_camera, CalibrationFlags, CalibrationOutput, TermCriteria,
};
use camcalib_image::{Image, ImageSize};
use camcalib_imgproc::calibration::{
    distortion::PolynomialDistortion, optimal::get_optimal_new_camera_matrix, CameraIntrinsic,
};
use camcalib_imgproc::chessboard::{
    find_chessboard_corners_with_params, ChessboardDetection, ChessboardParams,
};
use camcalib_imgproc::crop::crop_image;
use camcalib_imgproc::subpix::{self, corner_sub_pix};
use camcalib_imgproc::undistort::undistort_image;

/// Finds the internal corners of a chessboard in a grayscale image.
pub trait CornerDetector {
    /// Detect the pattern in `image`.
    ///
    /// When the pattern is found the corners are refined and returned row-major.
    /// Otherwise the partial candidates are returned for visualization only.
    fn detect(
        &self,
        image: &Image<u8, 1>,
        pattern: &PatternSpec,
    ) -> Result<ChessboardDetection, CalibError>;
}

/// Estimates the camera model from the accumulated views.
pub trait CameraCalibrator {
    /// Calibrate from one set of object and image points per view.
    fn calibrate(
        &self,
        object_points: &[Vec<[f64; 3]>],
        image_points: &[Vec<[f64; 2]>],
        image_size: ImageSize,
    ) -> Result<CalibrationOutput, CalibError>;
}

/// Produces the undistorted preview of an image.
pub trait Undistorter {
    /// Undistort `image` with the calibrated camera model.
    fn undistort(
        &self,
        image: &Image<u8, 3>,
        intrinsic: &CameraIntrinsic,
        distortion: &PolynomialDistortion,
    ) -> Result<Image<u8, 3>, CalibError>;
}

/// Chessboard detector followed by the sub-pixel refinement of the corners.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeCornerDetector {
    /// Parameters of the detector.
    pub params: ChessboardParams,
    /// Half size of the refinement window.
    pub win_size: (usize, usize),
    /// When to stop refining a corner.
    pub criteria: subpix::TermCriteria,
}

impl Default for NativeCornerDetector {
    fn default() -> Self {
        Self {
            params: ChessboardParams::default(),
            win_size: (5, 5),
            criteria: subpix::TermCriteria {
                max_iterations: 30,
                epsilon: 0.1,
            },
        }
    }
}

impl CornerDetector for NativeCornerDetector {
    fn detect(
        &self,
        image: &Image<u8, 1>,
        pattern: &PatternSpec,
    ) -> Result<ChessboardDetection, CalibError> {
        let mut detection =
            find_chessboard_corners_with_params(image, pattern.size(), &self.params)?;
        if detection.found {
            corner_sub_pix(image, &mut detection.corners, self.win_size, self.criteria)?;
        }
        Ok(detection)
    }
}

/// Levenberg-Marquardt calibration with the third radial coefficient fixed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeCalibrator {
    /// Parameters held fixed.
    pub flags: CalibrationFlags,
    /// Termination criteria of the optimization.
    pub criteria: TermCriteria,
}

impl Default for NativeCalibrator {
    fn default() -> Self {
        Self {
            flags: CalibrationFlags {
                fix_k3: true,
                ..Default::default()
            },
            criteria: TermCriteria::default(),
        }
    }
}

impl CameraCalibrator for NativeCalibrator {
    fn calibrate(
        &self,
        object_points: &[Vec<[f64; 3]>],
        image_points: &[Vec<[f64; 2]>],
        image_size: ImageSize,
    ) -> Result<CalibrationOutput, CalibError> {
        Ok(calibrate_camera(
            object_points,
            image_points,
            image_size,
            self.flags,
            self.criteria,
        )?)
    }
}

/// Undistortion through the optimal new camera matrix, cropped to its valid region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NativeUndistorter {
    /// Free scaling parameter of the new camera matrix, 1 keeps every source pixel.
    pub alpha: f64,
}

impl Default for NativeUndistorter {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

impl Undistorter for NativeUndistorter {
    fn undistort(
        &self,
        image: &Image<u8, 3>,
        intrinsic: &CameraIntrinsic,
        distortion: &PolynomialDistortion,
    ) -> Result<Image<u8, 3>, CalibError> {
        let size = image.size();
        let (new_intrinsic, roi) =
            get_optimal_new_camera_matrix(intrinsic, distortion, &size, self.alpha, &size);

        let src = image.cast_and_scale::<f32>(1.0)?;
        let mut dst = Image::<f32, 3>::from_size_val(size, 0.0)?;
        undistort_image(&src, &mut dst, intrinsic, &new_intrinsic, distortion)?;

        let undistorted = Image::new(
            size,
            dst.into_vec()
                .into_iter()
                .map(|v| v.round().clamp(0.0, 255.0) as u8)
                .collect(),
        )?;

        if roi.is_empty() {
            log::warn!("no valid pixel left after undistortion, keeping the full image");
            return Ok(undistorted);
        }

        let mut cropped = Image::from_size_val(
            ImageSize {
                width: roi.width,
                height: roi.height,
            },
            0u8,
        )?;
        crop_image(&undistorted, &mut cropped, roi.x, roi.y)?;

        Ok(cropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undistort_without_distortion() -> Result<(), CalibError> {
        let size = ImageSize {
            width: 32,
            height: 24,
        };
        let data = (0..size.area() * 3).map(|i| (i % 251) as u8).collect();
        let image = Image::<u8, 3>::new(size, data)?;

        let intrinsic = CameraIntrinsic {
            fx: 40.0,
            fy: 40.0,
            cx: 15.5,
            cy: 11.5,
        };
        let undistorted =
            NativeUndistorter::default().undistort(&image, &intrinsic, &Default::default())?;

        assert!(undistorted.width() <= size.width);
        assert!(undistorted.height() <= size.height);
        assert!(undistorted.width() > 0 && undistorted.height() > 0);

        Ok(())
    }

    #[test]
    fn test_detect_blank_image() -> Result<(), CalibError> {
        let size = ImageSize {
            width: 64,
            height: 48,
        };
        let image = Image::<u8, 1>::from_size_val(size, 128)?;
        let pattern = PatternSpec::new(7, 5, 1.0)?;

        let detection = NativeCornerDetector::default().detect(&image, &pattern)?;
        assert!(!detection.found);

        Ok(())
    }
}
