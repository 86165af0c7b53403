mod common;

use rawtoaces::colour::math::{
    aces_to_xyz, d65_white_xyz, mat_vec, to_flat, xyz_d65_to_aces,
};
use rawtoaces::colour::metadata_solver::{
    camera_xyz_matrix_and_white_point, color_temperature_to_xyz, find_xyz_to_camera_matrix,
    light_source_to_color_temp, xyz_to_camera_weighted_matrix, xyz_to_color_temperature,
};
use rawtoaces::colour::{Calibration, Metadata, MetadataSolver};
use rawtoaces::types::IDENTITY3;

use common::assert_matrix_close;

fn identity_calibrations() -> [Calibration; 2] {
    let identity = to_flat(&IDENTITY3);
    [
        Calibration {
            illuminant: 17,
            xyz_to_rgb: identity,
            camera_calibration: identity,
        },
        Calibration {
            illuminant: 21,
            xyz_to_rgb: identity,
            camera_calibration: identity,
        },
    ]
}

#[test]
fn test_light_source_codes() {
    assert_eq!(light_source_to_color_temp(17), 2856.0);
    assert_eq!(light_source_to_color_temp(21), 6500.0);
    assert_eq!(light_source_to_color_temp(32768 + 4200), 4200.0);
    // Unknown codes fall back to daylight.
    assert_eq!(light_source_to_color_temp(99), 5500.0);
}

#[test]
fn test_d65_color_temperature() {
    let cct = xyz_to_color_temperature(&d65_white_xyz());
    assert!((cct - 6504.0).abs() < 60.0, "cct = {cct}");
}

#[test]
fn test_planckian_round_trip_through_robertson() {
    for cct in [2856.0, 4000.0, 5000.0, 6500.0] {
        let xyz = color_temperature_to_xyz(cct);
        let back = xyz_to_color_temperature(&xyz);
        assert!((back - cct).abs() / cct < 0.01, "{cct} -> {back}");
    }
}

#[test]
fn test_weighted_matrix_interpolates_and_clamps() {
    let start = [1.0; 9];
    let end = [3.0; 9];
    let mid = xyz_to_camera_weighted_matrix(250.0, 300.0, 200.0, &start, &end);
    assert!(mid.iter().all(|v| (v - 2.0).abs() < 1e-12));

    let before = xyz_to_camera_weighted_matrix(400.0, 300.0, 200.0, &start, &end);
    assert_eq!(before, start);
    let after = xyz_to_camera_weighted_matrix(100.0, 300.0, 200.0, &start, &end);
    assert_eq!(after, end);
}

#[test]
fn test_missing_calibration_uses_first_matrix() {
    let mut metadata = Metadata::default();
    metadata.calibration[0].xyz_to_rgb = [2.0; 9];
    let matrix = find_xyz_to_camera_matrix(&metadata, Some(&[1.0, 1.0, 1.0]));
    assert_eq!(matrix, [2.0; 9]);
}

#[test]
fn test_missing_neutral_uses_first_matrix() {
    let mut calibrations = identity_calibrations();
    calibrations[0].xyz_to_rgb = [0.5; 9];
    let metadata = Metadata {
        calibration: calibrations,
        neutral_rgb: None,
        baseline_exposure: 0.0,
    };
    assert_eq!(find_xyz_to_camera_matrix(&metadata, None), [0.5; 9]);
}

#[test]
fn test_baseline_exposure_scales_camera_matrix() {
    let metadata = Metadata {
        calibration: identity_calibrations(),
        neutral_rgb: Some(d65_white_xyz()),
        baseline_exposure: 1.0,
    };
    let (matrix, white) = camera_xyz_matrix_and_white_point(&metadata).unwrap();
    assert_matrix_close(&matrix, &[[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]], 1e-12);
    assert!((white[1] - 1.0).abs() < 1e-12);
    let d65 = d65_white_xyz();
    assert!((white[0] - d65[0]).abs() < 1e-9);
    assert!((white[2] - d65[2]).abs() < 1e-9);
}

#[test]
fn test_aces_white_camera_needs_no_adaptation() {
    let aces_white = mat_vec(&aces_to_xyz(), &[1.0, 1.0, 1.0]);
    let solver = MetadataSolver::new(Metadata {
        calibration: identity_calibrations(),
        neutral_rgb: Some(aces_white),
        baseline_exposure: 0.0,
    });

    assert_matrix_close(&solver.calculate_cat_matrix().unwrap(), &IDENTITY3, 1e-9);
    assert_matrix_close(&solver.calculate_idt_matrix().unwrap(), &xyz_d65_to_aces(), 1e-9);
}

#[test]
fn test_singular_calibration_is_error() {
    let metadata = Metadata {
        calibration: [Calibration::default(), Calibration::default()],
        neutral_rgb: None,
        baseline_exposure: 0.0,
    };
    assert!(MetadataSolver::new(metadata).calculate_idt_matrix().is_err());
}
