mod common;

use rawtoaces::colour::Calibration;
use rawtoaces::colour::math::{aces_to_xyz, cat_d65_to_aces, mat_mul, mat_vec, to_flat, xyz_d65_to_aces, xyz_to_aces};
use rawtoaces::convert::ImageConverter;
use rawtoaces::convert::converter::illuminant_search_multipliers;
use rawtoaces::image::{DngMetadata, ImageBuf, OutputColour, RawMetadata};
use rawtoaces::types::{HighlightMode, IDENTITY3, MatrixMethod, PixelBox, WbMethod};
use rawtoaces_test_utils::SyntheticDecoder;
use rawtoaces_test_utils::builders::SettingsBuilder;

use common::assert_matrix_close;

fn settings() -> SettingsBuilder {
    SettingsBuilder::new().data_dir("/nonexistent/rawtoaces-data")
}

fn camera_metadata() -> RawMetadata {
    SyntheticDecoder::new("Sony", "A7", 8, 6).metadata
}

fn dng_metadata() -> RawMetadata {
    let identity = to_flat(&IDENTITY3);
    let aces_white = mat_vec(&aces_to_xyz(), &[1.0, 1.0, 1.0]);
    RawMetadata {
        dng: Some(DngMetadata {
            version: 0x0104_0000,
            baseline_exposure: 0.0,
            as_shot_neutral: Some(aces_white),
            calibrations: [
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
            ],
        }),
        ..camera_metadata()
    }
}

#[test]
fn test_metadata_white_balance_uses_camera_multipliers() {
    let mut converter = ImageConverter::new(settings().build());
    let options = converter.configure(&camera_metadata()).unwrap();

    assert_eq!(options.user_mul, Some([2.0, 1.0, 1.5, 1.0]));
    assert_eq!(converter.wb_multipliers(), &[2.0, 1.0, 1.5, 1.0]);
    // No spectral data, so the file's matrix and a CAT are used.
    assert_eq!(options.output_colour, OutputColour::Xyz);
    assert_eq!(options.use_camera_matrix, 3);
    assert!(converter.idt_matrix().is_none());
    assert_matrix_close(converter.cat_matrix().unwrap(), &cat_d65_to_aces(), 1e-12);
}

#[test]
fn test_custom_white_balance_and_matrix() {
    let custom = [[0.9, 0.1, 0.0], [0.0, 1.0, 0.0], [0.0, 0.2, 0.8]];
    let mut converter = ImageConverter::new(
        settings()
            .wb_method(WbMethod::Custom)
            .custom_wb(&[1.8, 1.0, 1.4, 1.0])
            .mat_method(MatrixMethod::Custom)
            .custom_mat(&[0.9, 0.1, 0.0, 0.0, 1.0, 0.0, 0.0, 0.2, 0.8])
            .build(),
    );
    let options = converter.configure(&camera_metadata()).unwrap();

    assert_eq!(options.user_mul, Some([1.8, 1.0, 1.4, 1.0]));
    assert_eq!(options.output_colour, OutputColour::Raw);
    assert_eq!(converter.idt_matrix(), Some(&custom));
    assert!(converter.cat_matrix().is_none());
}

#[test]
fn test_box_white_balance() {
    let mut converter = ImageConverter::new(settings().wb_method(WbMethod::Box).build());
    let options = converter.configure(&camera_metadata()).unwrap();
    assert!(options.use_auto_wb);
    assert_eq!(options.grey_box, None);
    assert!(converter.wb_multipliers().is_empty());

    let mut converter = ImageConverter::new(
        settings()
            .wb_method(WbMethod::Box)
            .wb_box(&[2, 2, 4, 2])
            .build(),
    );
    let options = converter.configure(&camera_metadata()).unwrap();
    assert!(!options.use_auto_wb);
    assert_eq!(options.grey_box, Some(PixelBox::new(2, 2, 4, 2)));
}

#[test]
fn test_decode_options_follow_settings() {
    let mut converter = ImageConverter::new(
        settings()
            .crop_box(&[1, 2, 3, 4])
            .half_size(true)
            .mat_method(MatrixMethod::Custom)
            .build(),
    );
    let options = converter.configure(&camera_metadata()).unwrap();
    assert_eq!(options.crop_box, Some(PixelBox::new(1, 2, 3, 4)));
    assert!(options.half_size);
    assert_eq!(options.user_flip, None);
    assert_eq!(options.user_black, None);
    assert_eq!(options.user_sat, None);
    assert_eq!(options.highlight_mode, HighlightMode::Clip);
    assert_eq!(options.chromatic_aberration, None);

    converter.settings.flip = 6;
    converter.settings.black_level = 128;
    converter.settings.highlight_mode = 2;
    converter.settings.chromatic_aberration = [1.001, 0.999];
    let options = converter.configure(&camera_metadata()).unwrap();
    assert_eq!(options.user_flip, Some(6));
    assert_eq!(options.user_black, Some(128.0));
    assert_eq!(options.highlight_mode, HighlightMode::Unclip);
    assert_eq!(options.chromatic_aberration, Some([1.001, 0.999]));

    // Both factors have to differ from one.
    converter.settings.chromatic_aberration = [1.0, 0.999];
    let options = converter.configure(&camera_metadata()).unwrap();
    assert_eq!(options.chromatic_aberration, None);
}

#[test]
fn test_adobe_matrix_method() {
    let mut converter = ImageConverter::new(settings().mat_method(MatrixMethod::Adobe).build());
    let options = converter.configure(&camera_metadata()).unwrap();
    assert_eq!(options.output_colour, OutputColour::Xyz);
    assert_eq!(options.use_camera_matrix, 1);
    assert!(converter.cat_matrix().is_some());
}

#[test]
fn test_dng_metadata_matrix() {
    let mut converter = ImageConverter::new(settings().build());
    let options = converter.configure(&dng_metadata()).unwrap();

    assert!(options.use_camera_wb);
    assert_eq!(options.use_camera_matrix, 1);
    assert!(converter.cat_matrix().is_none());
    assert_matrix_close(converter.idt_matrix().unwrap(), &xyz_d65_to_aces(), 1e-9);
}

#[test]
fn test_spectral_method_without_data_fails() {
    let mut converter = ImageConverter::new(settings().mat_method(MatrixMethod::Spectral).build());
    assert!(converter.configure(&camera_metadata()).is_err());

    let mut converter = ImageConverter::new(
        settings()
            .wb_method(WbMethod::Illuminant)
            .illuminant("D55")
            .mat_method(MatrixMethod::Custom)
            .build(),
    );
    assert!(converter.configure(&camera_metadata()).is_err());
}

#[test]
fn test_matrix_and_scale_application() {
    let mut converter = ImageConverter::new(settings().headroom(2.0).scale(1.5).build());
    converter.configure(&camera_metadata()).unwrap();

    let mut image = ImageBuf::from_pixels(1, 1, vec![[0.2, 0.4, 0.6]]).unwrap();
    converter.apply_matrix(&mut image);
    let combined = mat_mul(&xyz_to_aces(), &cat_d65_to_aces());
    let expected = mat_vec(&combined, &[0.2, 0.4, 0.6]);
    let p = image.pixel(0, 0);
    for ch in 0..3 {
        assert!((f64::from(p[ch]) - expected[ch]).abs() < 1e-5);
    }

    converter.apply_scale(&mut image);
    assert!((f64::from(image.pixel(0, 0)[1]) - expected[1] * 3.0).abs() < 1e-5);
}

#[test]
fn test_illuminant_search_multipliers() {
    // User multipliers keep their first green; the second is ignored.
    assert_eq!(
        illuminant_search_multipliers(&[2.0, 1.0, 1.5, 3.0], [9.0; 4]),
        [2.0, 1.0, 1.5]
    );
    // The file's greens are averaged, then everything is scaled by the minimum.
    assert_eq!(
        illuminant_search_multipliers(&[], [4.0, 2.0, 3.0, 4.0]),
        [4.0 / 3.0, 1.0, 1.0]
    );
    assert_eq!(
        illuminant_search_multipliers(&[], [4.0, 2.0, 3.0, 0.0]),
        [2.0, 1.0, 1.5]
    );
    // A zero channel leaves the values unscaled.
    assert_eq!(
        illuminant_search_multipliers(&[0.0, 2.0, 1.0, 2.0], [1.0; 4]),
        [0.0, 2.0, 1.0]
    );
}
