mod common;

use exr::math::Vec2;
use exr::meta::MetaData;
use exr::meta::attribute::{AttributeValue, Text};
use exr::prelude::Compression;
use rawtoaces::errors::RawToAcesError;
use rawtoaces::image::exr_writer::{
    BASELINE_EXPOSURE_ATTR, CAMERA_MAKE_ATTR, CAMERA_MODEL_ATTR, ORIENTATION_ATTR,
};
use rawtoaces::image::{ExrMetadata, ImageBuf, write_aces_exr};
use rawtoaces::types::{CropMode, WbMethod};
use rawtoaces_test_utils::{SyntheticDecoder, TestDatabase, init_tracing};

use common::{MAKE, MODEL, converter, settings_for, touch};

fn read_header(path: &std::path::Path) -> exr::meta::header::Header {
    let meta = MetaData::read_from_file(path, false).expect("read exr header");
    meta.headers[0].clone()
}

fn attribute(header: &exr::meta::header::Header, name: &str) -> Option<AttributeValue> {
    let name = Text::from(name);
    header
        .own_attributes
        .other
        .get(&name)
        .or_else(|| header.shared_attributes.other.get(&name))
        .cloned()
}

fn text(value: Option<AttributeValue>) -> Option<String> {
    match value {
        Some(AttributeValue::Text(text)) => Some(text.to_string()),
        _ => None,
    }
}

#[test]
fn test_spectral_conversion_writes_aces_container() {
    init_tracing();
    let db = TestDatabase::with_camera(MAKE, MODEL);
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.cr3");
    touch(&input);

    let mut converter = converter(settings_for(&db), SyntheticDecoder::new(MAKE, MODEL, 8, 6));
    let output = converter.process_image(&input).unwrap();

    assert_eq!(output, dir.path().join("shot_aces.exr"));
    assert!(output.exists());
    assert!(converter.idt_matrix().is_some());
    assert!(converter.cat_matrix().is_none());

    let header = read_header(&output);
    assert_eq!(header.layer_size, Vec2(8, 6));
    assert_eq!(header.compression, Compression::Uncompressed);
    let names: Vec<String> = header.channels.list.iter().map(|c| c.name.to_string()).collect();
    assert_eq!(names, vec!["B", "G", "R"]);

    let chromaticities = header.shared_attributes.chromaticities.expect("chromaticities");
    assert!((chromaticities.red.0 - 0.7347).abs() < 1e-4);
    assert!((chromaticities.white.0 - 0.32168).abs() < 1e-4);

    let flag = Text::from("acesImageContainerFlag");
    let value = header
        .own_attributes
        .other
        .get(&flag)
        .or_else(|| header.shared_attributes.other.get(&flag));
    assert_eq!(value, Some(&AttributeValue::I32(1)));
}

#[test]
fn test_unknown_camera_falls_back_to_metadata() {
    init_tracing();
    let db = TestDatabase::new();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.nef");
    touch(&input);

    let mut converter = converter(
        settings_for(&db),
        SyntheticDecoder::new("Nikon", "D850", 8, 6),
    );
    let output = converter.process_image(&input).unwrap();

    assert!(output.exists());
    assert!(converter.idt_matrix().is_none());
    assert!(converter.cat_matrix().is_some());
    assert_eq!(converter.wb_multipliers(), &[2.0, 1.0, 1.5, 1.0]);
}

#[test]
fn test_illuminant_white_balance_from_spectral_data() {
    let db = TestDatabase::with_camera(MAKE, MODEL);
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.cr3");
    touch(&input);

    let settings = settings_for(&db)
        .wb_method(WbMethod::Illuminant)
        .illuminant("3200K");
    let mut converter = converter(settings, SyntheticDecoder::new(MAKE, MODEL, 8, 6));
    converter.process_image(&input).unwrap();

    let wb = converter.wb_multipliers();
    assert_eq!(wb.len(), 3);
    assert_eq!(wb[1], 1.0);
}

#[test]
fn test_hard_crop_shrinks_the_output() {
    let db = TestDatabase::new();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.arw");
    touch(&input);

    let settings = settings_for(&db).crop_mode(CropMode::Hard);
    let mut converter = converter(settings, SyntheticDecoder::new("Sony", "A7", 8, 6));
    let output = converter.process_image(&input).unwrap();

    assert_eq!(read_header(&output).layer_size, Vec2(6, 4));
}

#[test]
fn test_existing_output_needs_overwrite() {
    let db = TestDatabase::new();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.arw");
    touch(&input);
    touch(&dir.path().join("shot_aces.exr"));

    let decoder = SyntheticDecoder::new("Sony", "A7", 4, 4);
    let mut refusing = converter(settings_for(&db), decoder.clone());
    let err = refusing.process_image(&input).unwrap_err();
    assert!(matches!(err, RawToAcesError::OutputPath(_)));
    assert!(err.to_string().contains("already exists. Use --overwrite"));

    let mut overwriting = converter(settings_for(&db).overwrite(true), decoder);
    overwriting.process_image(&input).unwrap();
    assert!(std::fs::metadata(dir.path().join("shot_aces.exr")).unwrap().len() > 3);
}

#[test]
fn test_output_directory_is_relative_to_input() {
    let db = TestDatabase::new();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.arw");
    touch(&input);
    let decoder = SyntheticDecoder::new("Sony", "A7", 4, 4);

    let mut missing = converter(settings_for(&db).output_dir("out"), decoder.clone());
    let err = missing.process_image(&input).unwrap_err();
    assert!(err.to_string().contains("does not exist"), "{err}");

    let mut creating = converter(
        settings_for(&db).output_dir("out/nested").create_dirs(true),
        decoder,
    );
    let output = creating.process_image(&input).unwrap();
    assert_eq!(output, dir.path().join("out").join("nested").join("shot_aces.exr"));
    assert!(output.exists());
}

#[test]
fn test_invalid_inputs() {
    let db = TestDatabase::new();
    let mut converter = converter(settings_for(&db), SyntheticDecoder::new("Sony", "A7", 4, 4));

    let err = converter.process_image(std::path::Path::new("")).unwrap_err();
    assert_eq!(err.to_string(), "Image error: Empty input filename provided.");

    let err = converter
        .process_image(&db.path().join("missing.arw"))
        .unwrap_err();
    assert!(err.to_string().contains("Input file does not exist"));

    let err = converter.make_output_path(std::path::Path::new("")).unwrap_err();
    assert!(err.to_string().contains("Empty input path provided."));
}

#[test]
fn test_listings() {
    let db = TestDatabase::with_camera(MAKE, MODEL);
    db.add_illuminant("iso7589");
    let converter = converter(settings_for(&db), SyntheticDecoder::new(MAKE, MODEL, 4, 4));

    assert_eq!(converter.supported_cameras(), vec!["Canon / EOS_R6".to_string()]);
    assert_eq!(
        converter.supported_illuminants(),
        vec![
            "Day-light (e.g., D60, D6025)".to_string(),
            "Blackbody (e.g., 3200K)".to_string(),
            "iso7589".to_string(),
        ]
    );
}

#[test]
fn test_check_illuminant() {
    let db = TestDatabase::new();
    db.add_illuminant("iso7589");
    let decoder = SyntheticDecoder::new(MAKE, MODEL, 4, 4);

    let ok = converter(
        settings_for(&db).wb_method(WbMethod::Illuminant).illuminant("ISO7589"),
        decoder.clone(),
    );
    assert!(ok.check_illuminant().is_ok());

    let daylight = converter(
        settings_for(&db).wb_method(WbMethod::Illuminant).illuminant("D60"),
        decoder.clone(),
    );
    assert!(daylight.check_illuminant().is_ok());

    let missing = converter(
        settings_for(&db).wb_method(WbMethod::Illuminant).illuminant("tungsten"),
        decoder.clone(),
    );
    let err = missing.check_illuminant().unwrap_err();
    assert!(err.to_string().contains("--list-illuminants"));

    // Only checked in illuminant mode.
    assert!(converter(settings_for(&db), decoder).check_illuminant().is_ok());
}

#[test]
fn test_camera_details_reach_the_header() {
    let db = TestDatabase::new();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.nef");
    touch(&input);

    let decoder = SyntheticDecoder::new("Nikon", "D850", 8, 6).with_orientation(3);
    let mut converter = converter(settings_for(&db), decoder);
    let output = converter.process_image(&input).unwrap();

    let header = read_header(&output);
    assert_eq!(text(attribute(&header, CAMERA_MAKE_ATTR)).as_deref(), Some("Nikon"));
    assert_eq!(text(attribute(&header, CAMERA_MODEL_ATTR)).as_deref(), Some("D850"));
    assert_eq!(attribute(&header, ORIENTATION_ATTR), Some(AttributeValue::I32(3)));
    // Not a DNG, so there is no baseline exposure.
    assert_eq!(attribute(&header, BASELINE_EXPOSURE_ATTR), None);
}

#[test]
fn test_dng_exposure_and_missing_names() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("plain_aces.exr");
    let image = ImageBuf::from_pixels(2, 2, vec![[0.18, 0.18, 0.18]; 4]).unwrap();
    let metadata = ExrMetadata {
        camera_make: String::new(),
        camera_model: "Q2".to_string(),
        orientation: 0,
        baseline_exposure: Some(0.5),
    };

    write_aces_exr(&output, &image, &metadata).unwrap();

    let header = read_header(&output);
    assert_eq!(attribute(&header, CAMERA_MAKE_ATTR), None);
    assert_eq!(text(attribute(&header, CAMERA_MODEL_ATTR)).as_deref(), Some("Q2"));
    assert_eq!(
        attribute(&header, BASELINE_EXPOSURE_ATTR),
        Some(AttributeValue::F32(0.5))
    );
}

#[test]
fn test_soft_crop_keeps_pixels_and_sets_display_window() {
    let db = TestDatabase::new();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("shot.arw");
    touch(&input);

    let settings = settings_for(&db).crop_mode(CropMode::Soft);
    let mut converter = converter(settings, SyntheticDecoder::new("Sony", "A7", 8, 6));
    let output = converter.process_image(&input).unwrap();

    let header = read_header(&output);
    assert_eq!(header.layer_size, Vec2(8, 6));
    let display = header.shared_attributes.display_window;
    assert_eq!(display.position, Vec2(1, 1));
    assert_eq!(display.size, Vec2(6, 4));
}
