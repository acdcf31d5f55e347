use approx::assert_relative_eq;
use camcalib_3d::calibration::{
    calibrate_camera, chessboard_object_points, CalibrationError, CalibrationFlags, TermCriteria,
};
use camcalib_3d::ops::project_points;
use camcalib_image::ImageSize;
use camcalib_imgproc::calibration::{distortion::PolynomialDistortion, CameraIntrinsic};

const SIZE: ImageSize = ImageSize {
    width: 640,
    height: 480,
};

const POSES: [([f64; 3], [f64; 3]); 4] = [
    ([0.3, -0.2, 0.05], [-0.09, -0.06, 0.5]),
    ([-0.25, 0.3, -0.1], [-0.1, -0.05, 0.45]),
    ([0.1, 0.35, 0.2], [-0.05, -0.08, 0.55]),
    ([-0.3, -0.25, 0.0], [-0.12, -0.04, 0.6]),
];

fn intrinsic() -> CameraIntrinsic {
    CameraIntrinsic {
        fx: 520.0,
        fy: 510.0,
        cx: 322.0,
        cy: 238.0,
    }
}

fn synthetic_views(
    distortion: &PolynomialDistortion,
) -> (Vec<Vec<[f64; 3]>>, Vec<Vec<[f64; 2]>>) {
    let obj = chessboard_object_points(7, 5, 0.03);
    let image_points = POSES
        .iter()
        .map(|(rvec, tvec)| project_points(&obj, rvec, tvec, &intrinsic(), distortion))
        .collect();
    (vec![obj; POSES.len()], image_points)
}

#[test]
fn test_calibrate_recovers_camera() -> Result<(), CalibrationError> {
    let distortion = PolynomialDistortion {
        k1: -0.2,
        k2: 0.05,
        p1: 0.001,
        p2: -0.002,
        ..Default::default()
    };
    let (object_points, image_points) = synthetic_views(&distortion);

    let flags = CalibrationFlags {
        fix_k3: true,
        ..Default::default()
    };
    let output = calibrate_camera(
        &object_points,
        &image_points,
        SIZE,
        flags,
        TermCriteria::default(),
    )?;

    assert!(output.rms < 1e-6, "rms {}", output.rms);

    let k = intrinsic();
    assert_relative_eq!(output.intrinsic.fx, k.fx, epsilon = 1e-3);
    assert_relative_eq!(output.intrinsic.fy, k.fy, epsilon = 1e-3);
    assert_relative_eq!(output.intrinsic.cx, k.cx, epsilon = 1e-3);
    assert_relative_eq!(output.intrinsic.cy, k.cy, epsilon = 1e-3);

    let coeffs = output.dist_coeffs();
    assert_relative_eq!(coeffs[0], -0.2, epsilon = 1e-5);
    assert_relative_eq!(coeffs[1], 0.05, epsilon = 1e-5);
    assert_relative_eq!(coeffs[2], 0.001, epsilon = 1e-6);
    assert_relative_eq!(coeffs[3], -0.002, epsilon = 1e-6);
    assert_eq!(coeffs[4], 0.0);

    for (i, (rvec, tvec)) in POSES.iter().enumerate() {
        for j in 0..3 {
            assert_relative_eq!(output.rvecs[i][j], rvec[j], epsilon = 1e-6);
            assert_relative_eq!(output.tvecs[i][j], tvec[j], epsilon = 1e-6);
        }
    }

    Ok(())
}

#[test]
fn test_calibrate_with_fixed_parameters() -> Result<(), CalibrationError> {
    let distortion = PolynomialDistortion {
        k1: -0.1,
        ..Default::default()
    };
    let (object_points, image_points) = synthetic_views(&distortion);

    let flags = CalibrationFlags {
        fix_k3: true,
        fix_principal_point: true,
        zero_tangent_dist: true,
    };
    let output = calibrate_camera(
        &object_points,
        &image_points,
        SIZE,
        flags,
        TermCriteria::default(),
    )?;

    // the principal point stays at the image centre
    assert_eq!(output.intrinsic.cx, 319.5);
    assert_eq!(output.intrinsic.cy, 239.5);
    assert_eq!(output.distortion.p1, 0.0);
    assert_eq!(output.distortion.p2, 0.0);
    assert_eq!(output.distortion.k3, 0.0);

    // the principal point is off by a few pixels, the rest absorbs it
    assert!(output.rms < 1.0, "rms {}", output.rms);
    assert!(output.intrinsic.fx > 0.0 && output.intrinsic.fy > 0.0);

    Ok(())
}
