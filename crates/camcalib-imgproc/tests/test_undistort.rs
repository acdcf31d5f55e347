use camcalib_image::{Image, ImageError, ImageSize};
use camcalib_imgproc::calibration::distortion::PolynomialDistortion;
use camcalib_imgproc::calibration::optimal::get_optimal_new_camera_matrix;
use camcalib_imgproc::calibration::CameraIntrinsic;
use camcalib_imgproc::crop::crop_image;
use camcalib_imgproc::undistort::undistort_image;

fn camera() -> CameraIntrinsic {
    CameraIntrinsic {
        fx: 100.0,
        fy: 100.0,
        cx: 31.5,
        cy: 23.5,
    }
}

#[test]
fn test_undistort_image_identity() -> Result<(), ImageError> {
    let size = ImageSize {
        width: 64,
        height: 48,
    };
    let data = (0..size.width * size.height * 3)
        .map(|i| (i % 251) as f32)
        .collect::<Vec<_>>();
    let src = Image::<f32, 3>::new(size, data)?;
    let mut dst = Image::<f32, 3>::from_size_val(size, 0.0)?;

    undistort_image(
        &src,
        &mut dst,
        &camera(),
        &camera(),
        &PolynomialDistortion::default(),
    )?;

    for (a, b) in dst.as_slice().iter().zip(src.as_slice()) {
        assert!((a - b).abs() < 1e-3);
    }

    Ok(())
}

#[test]
fn test_undistort_and_crop_to_roi() -> Result<(), ImageError> {
    let size = ImageSize {
        width: 64,
        height: 48,
    };
    let distortion = PolynomialDistortion {
        k1: -0.4,
        k2: 0.1,
        ..Default::default()
    };
    let src = Image::<f32, 1>::from_size_val(size, 200.0)?;

    let (new_intrinsic, roi) =
        get_optimal_new_camera_matrix(&camera(), &distortion, &size, 1.0, &size);
    assert!(!roi.is_empty());

    let mut undistorted = Image::<f32, 1>::from_size_val(size, 0.0)?;
    undistort_image(&src, &mut undistorted, &camera(), &new_intrinsic, &distortion)?;

    let mut cropped = Image::<f32, 1>::from_size_val([roi.width, roi.height].into(), 0.0)?;
    crop_image(&undistorted, &mut cropped, roi.x, roi.y)?;

    assert!(cropped.width() <= size.width && cropped.height() <= size.height);

    // the valid region only sees the source image, away from its border
    let center = cropped.get([roi.height / 2, roi.width / 2, 0]).copied();
    assert_eq!(center.map(|v| (v - 200.0).abs() < 1e-3), Some(true));

    Ok(())
}
