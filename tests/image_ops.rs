mod common;

use rawtoaces::convert::ImageConverter;
use rawtoaces::image::{
    CfaPattern, DecodeOptions, ImageBuf, OutputColour, RawImage, RawMetadata, SensorData, develop,
    read_dng_metadata,
};
use rawtoaces::types::{CropMode, DemosaicAlgorithm, HighlightMode, PixelBox};
use rawtoaces_test_utils::SyntheticDecoder;
use rawtoaces_test_utils::builders::SettingsBuilder;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

fn normalised(level: f32) -> f32 {
    (level - 64.0) / (4095.0 - 64.0)
}

/// Options that leave the sensor values untouched apart from levels.
fn neutral_options() -> DecodeOptions {
    DecodeOptions {
        user_mul: Some([1.0; 4]),
        ..DecodeOptions::default()
    }
}

/// Three-channel image whose samples encode their position.
fn rgb_raw(width: usize, height: usize) -> RawImage {
    let mut values = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        for x in 0..width {
            let v = (x + width * y) as f32 / 10.0;
            values.extend_from_slice(&[v, v, v]);
        }
    }
    RawImage {
        metadata: RawMetadata {
            width,
            height,
            white_level: 1.0,
            ..RawMetadata::default()
        },
        sensor: SensorData::Rgb { values },
    }
}

/// RGGB frame with black 0 and white 1, sample values from `value(x, y)`.
fn bayer_raw(width: usize, height: usize, value: impl Fn(usize, usize) -> f32) -> RawImage {
    let values = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| value(x, y))
        .collect();
    RawImage {
        metadata: RawMetadata {
            width,
            height,
            white_level: 1.0,
            ..RawMetadata::default()
        },
        sensor: SensorData::Cfa {
            pattern: CfaPattern::bayer("RGGB").unwrap(),
            values,
        },
    }
}

#[test]
fn test_bayer_pattern_layout() {
    let pattern = CfaPattern::bayer("RGGB").unwrap();
    assert_eq!(pattern.color_at(0, 0), 0);
    assert_eq!(pattern.color_at(0, 1), 1);
    assert_eq!(pattern.color_at(1, 0), 3);
    assert_eq!(pattern.color_at(1, 1), 2);
    // The pattern repeats.
    assert_eq!(pattern.color_at(2, 3), 1);

    assert!(CfaPattern::bayer("RGB").is_err());
    assert!(CfaPattern::new(2, 2, vec![0, 1, 2]).is_err());
}

#[test]
fn test_buffer_matrix_and_scale() {
    let mut image = ImageBuf::from_pixels(2, 1, vec![[1.0, 2.0, 3.0], [0.0, 0.0, 1.0]]).unwrap();
    image.apply_matrix(&[[0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
    assert_eq!(image.pixel(0, 0), [3.0, 2.0, 1.0]);
    assert_eq!(image.pixel(1, 0), [1.0, 0.0, 0.0]);

    image.scale(0.5);
    assert_eq!(image.pixel(0, 0), [1.5, 1.0, 0.5]);

    assert!(ImageBuf::from_pixels(2, 2, vec![[0.0; 3]]).is_err());
}

#[test]
fn test_buffer_crop_starts_at_origin() {
    let pixels = (0..12).map(|i| [i as f32, 0.0, 0.0]).collect();
    let image = ImageBuf::from_pixels(4, 3, pixels).unwrap();

    let cropped = image.crop(&PixelBox::new(1, 1, 2, 2)).unwrap();
    assert_eq!((cropped.width(), cropped.height()), (2, 2));
    assert_eq!(cropped.pixel(0, 0)[0], 5.0);
    assert_eq!(cropped.pixel(1, 1)[0], 10.0);
    assert_eq!(cropped.data_window, PixelBox::new(0, 0, 2, 2));

    // Regions reaching past the edge are clamped.
    let clamped = image.crop(&PixelBox::new(2, 1, 10, 10)).unwrap();
    assert_eq!((clamped.width(), clamped.height()), (2, 2));

    assert!(image.crop(&PixelBox::new(10, 10, 2, 2)).is_err());
}

#[test]
fn test_develop_flat_bayer_frame() {
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 8, 6);
    let image = develop(&decoder.image().unwrap(), &neutral_options()).unwrap();

    assert_eq!((image.width(), image.height()), (8, 6));
    let expected = [normalised(1000.0), normalised(1800.0), normalised(1200.0)];
    for p in image.pixels() {
        for ch in 0..3 {
            assert!(approx(p[ch], expected[ch]), "{p:?} vs {expected:?}");
        }
    }
    // The default crop of the sensor becomes the display window.
    assert_eq!(image.display_window, PixelBox::new(1, 1, 6, 4));
}

#[test]
fn test_develop_auto_wb_neutralises_flat_frame() {
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 8, 6);
    let options = DecodeOptions {
        use_auto_wb: true,
        ..DecodeOptions::default()
    };
    let image = develop(&decoder.image().unwrap(), &options).unwrap();

    let [r, g, b] = image.pixel(3, 3);
    assert!(approx(r, g) && approx(g, b), "{r} {g} {b}");
    assert!(approx(g, normalised(1800.0)));
}

#[test]
fn test_develop_clips_white_balanced_highlights() {
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 4, 4).with_levels([3000.0; 4]);
    let options = DecodeOptions {
        user_mul: Some([4.0, 1.0, 1.0, 1.0]),
        ..DecodeOptions::default()
    };
    let image = develop(&decoder.image().unwrap(), &options).unwrap();
    assert_eq!(image.pixel(0, 0)[0], 1.0);
    assert!(image.pixel(0, 0)[1] < 1.0);
}

#[test]
fn test_develop_unclip_keeps_highlight_ratios() {
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 4, 4).with_levels([3000.0; 4]);
    let options = DecodeOptions {
        user_mul: Some([4.0, 1.0, 1.0, 1.0]),
        highlight_mode: HighlightMode::Unclip,
        ..DecodeOptions::default()
    };
    let image = develop(&decoder.image().unwrap(), &options).unwrap();

    // Normalised by the largest multiplier, so red is not clipped.
    let [r, g, b] = image.pixel(1, 1);
    assert!(approx(r, normalised(3000.0)), "{r}");
    assert!(approx(g, normalised(3000.0) / 4.0), "{g}");
    assert!(approx(b, g));
    assert!(approx(r / g, 4.0));
}

#[test]
fn test_develop_grey_box_limits_white_balance_region() {
    // Left half is grey under a warm light, right half is a different colour.
    let raw = bayer_raw(8, 4, |x, y| {
        let colour = CfaPattern::bayer("RGGB").unwrap().color_at(y, x);
        let left = [0.2, 0.4, 0.5, 0.4];
        let right = [0.4, 0.4, 0.1, 0.4];
        if x < 4 { left[colour] } else { right[colour] }
    });
    let options = DecodeOptions {
        grey_box: Some(PixelBox::new(0, 0, 4, 4)),
        ..DecodeOptions::default()
    };
    let image = develop(&raw, &options).unwrap();

    let [r, g, b] = image.pixel(1, 1);
    assert!(approx(r, 0.5) && approx(g, 0.5) && approx(b, 0.5), "{r} {g} {b}");
    let [r, g, b] = image.pixel(5, 1);
    assert!(approx(r, 1.0) && approx(g, 0.5) && approx(b, 0.1), "{r} {g} {b}");
}

#[test]
fn test_develop_nearest_demosaic_stays_in_block() {
    let raw = bayer_raw(4, 4, |x, y| (x + 4 * y) as f32 / 100.0);
    let nearest = DecodeOptions {
        demosaic: DemosaicAlgorithm::Nearest,
        ..neutral_options()
    };
    let image = develop(&raw, &nearest).unwrap();

    // Blue site at (1, 1) takes red and green from its own 2x2 block.
    assert_eq!(image.pixel(1, 1), [0.0, 0.01, 0.05]);
    // Green site at (3, 2): red at (2, 2), blue at (3, 3).
    let [r, g, b] = image.pixel(3, 2);
    assert!(approx(r, 0.10) && approx(g, 0.11) && approx(b, 0.15), "{r} {g} {b}");

    // Linear averages the blue samples above and below instead.
    let linear = develop(&raw, &neutral_options()).unwrap();
    assert!(approx(linear.pixel(3, 2)[2], 0.11));
}

#[test]
fn test_develop_chromatic_aberration_scales_red_only() {
    let options = DecodeOptions {
        chromatic_aberration: Some([2.0, 1.0]),
        ..neutral_options()
    };
    let image = develop(&rgb_raw(3, 3), &options).unwrap();

    // Red is enlarged about the centre; the corner now samples halfway in.
    let [r, g, b] = image.pixel(0, 0);
    assert!(approx(r, 0.2), "{r}");
    assert_eq!((g, b), (0.0, 0.0));
    assert!(approx(image.pixel(1, 1)[0], 0.4));
    assert!(approx(image.pixel(2, 2)[0], 0.6));
    assert!(approx(image.pixel(2, 2)[1], 0.8));
}

#[test]
fn test_develop_aberration_on_degenerate_image() {
    // One sample wide, so half size leaves no columns at all.
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 1, 4);
    let options = DecodeOptions {
        half_size: true,
        chromatic_aberration: Some([1.01, 0.99]),
        ..neutral_options()
    };
    let image = develop(&decoder.image().unwrap(), &options).unwrap();
    assert!(image.is_empty());
    assert_eq!(image.height(), 2);
}

#[test]
fn test_develop_auto_bright_lifts_peak_to_one() {
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 8, 6);
    let options = DecodeOptions {
        auto_bright: true,
        ..neutral_options()
    };
    let image = develop(&decoder.image().unwrap(), &options).unwrap();

    let [r, g, b] = image.pixel(4, 3);
    assert!(approx(g, 1.0), "{g}");
    assert!(approx(r, normalised(1000.0) / normalised(1800.0)));
    assert!(approx(b, normalised(1200.0) / normalised(1800.0)));
}

#[test]
fn test_develop_half_size() {
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 8, 6);
    let options = DecodeOptions {
        half_size: true,
        ..neutral_options()
    };
    let image = develop(&decoder.image().unwrap(), &options).unwrap();

    assert_eq!((image.width(), image.height()), (4, 3));
    assert_eq!(image.display_window, PixelBox::new(0, 0, 3, 2));
    assert!(approx(image.pixel(1, 1)[2], normalised(1200.0)));
}

#[test]
fn test_develop_xyz_output_maps_neutral_to_d65() {
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 8, 6);
    let options = DecodeOptions {
        use_auto_wb: true,
        output_colour: OutputColour::Xyz,
        ..DecodeOptions::default()
    };
    let image = develop(&decoder.image().unwrap(), &options).unwrap();

    let [x, y, z] = image.pixel(4, 2);
    assert!((x / y - 0.9505).abs() < 2e-3, "x/y = {}", x / y);
    assert!((z / y - 1.089).abs() < 2e-3, "z/y = {}", z / y);
}

#[test]
fn test_develop_rotates_by_orientation() {
    let raw = rgb_raw(3, 2);

    let upright = develop(&raw, &neutral_options()).unwrap();
    assert!(approx(upright.pixel(2, 1)[0], 0.5));

    let options = DecodeOptions {
        user_flip: Some(3),
        ..neutral_options()
    };
    let rotated = develop(&raw, &options).unwrap();
    assert_eq!((rotated.width(), rotated.height()), (3, 2));
    assert!(approx(rotated.pixel(0, 0)[0], 0.5));

    let options = DecodeOptions {
        user_flip: Some(6),
        ..neutral_options()
    };
    let clockwise = develop(&raw, &options).unwrap();
    assert_eq!((clockwise.width(), clockwise.height()), (2, 3));
    // The bottom-left corner ends up top-left.
    assert!(approx(clockwise.pixel(0, 0)[0], 0.3));
    assert!(approx(clockwise.pixel(1, 0)[0], 0.0));

    let options = DecodeOptions {
        user_flip: Some(5),
        ..neutral_options()
    };
    let counter = develop(&raw, &options).unwrap();
    assert_eq!((counter.width(), counter.height()), (2, 3));
    // The top-right corner ends up top-left.
    assert!(approx(counter.pixel(0, 0)[0], 0.2));
}

#[test]
fn test_develop_orientation_from_metadata_and_override() {
    let decoder = SyntheticDecoder::new("Canon", "EOS_R6", 8, 6).with_orientation(6);
    let raw = decoder.image().unwrap();

    let image = develop(&raw, &neutral_options()).unwrap();
    assert_eq!((image.width(), image.height()), (6, 8));
    assert_eq!(image.display_window, PixelBox::new(1, 1, 4, 6));

    let options = DecodeOptions {
        user_flip: Some(0),
        ..neutral_options()
    };
    let image = develop(&raw, &options).unwrap();
    assert_eq!((image.width(), image.height()), (8, 6));
}

#[test]
fn test_develop_rejects_mismatched_sensor_data() {
    let mut raw = rgb_raw(3, 2);
    raw.metadata.width = 4;
    assert!(develop(&raw, &neutral_options()).is_err());

    let mut raw = rgb_raw(3, 2);
    raw.metadata.white_level = 0.0;
    assert!(develop(&raw, &neutral_options()).is_err());
}

fn converter_with_crop(mode: CropMode) -> ImageConverter {
    ImageConverter::new(SettingsBuilder::new().data_dir("/data").crop_mode(mode).build())
}

fn image_with_display_window() -> ImageBuf {
    let mut image = ImageBuf::new(8, 6);
    image.display_window = PixelBox::new(1, 1, 6, 4);
    image
}

#[test]
fn test_crop_modes() {
    let off = converter_with_crop(CropMode::Off)
        .apply_crop(image_with_display_window())
        .unwrap();
    assert_eq!(off.display_window, PixelBox::new(0, 0, 8, 6));

    let soft = converter_with_crop(CropMode::Soft)
        .apply_crop(image_with_display_window())
        .unwrap();
    assert_eq!((soft.width(), soft.height()), (8, 6));
    assert_eq!(soft.display_window, PixelBox::new(1, 1, 6, 4));

    let hard = converter_with_crop(CropMode::Hard)
        .apply_crop(image_with_display_window())
        .unwrap();
    assert_eq!((hard.width(), hard.height()), (6, 4));
    assert_eq!(hard.display_window, hard.data_window);
}

/// Little-endian TIFF with a single IFD0.
struct TiffBuilder {
    entries: Vec<(u16, u16, u32, Vec<u8>)>,
}

impl TiffBuilder {
    fn new() -> Self {
        Self { entries: Vec::new() }
    }

    fn entry(mut self, tag: u16, field_type: u16, count: u32, payload: Vec<u8>) -> Self {
        self.entries.push((tag, field_type, count, payload));
        self
    }

    fn srationals(self, tag: u16, values: &[(i32, i32)]) -> Self {
        let payload = values
            .iter()
            .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
            .collect();
        self.entry(tag, 10, values.len() as u32, payload)
    }

    fn rationals(self, tag: u16, values: &[(u32, u32)]) -> Self {
        let payload = values
            .iter()
            .flat_map(|(n, d)| n.to_le_bytes().into_iter().chain(d.to_le_bytes()))
            .collect();
        self.entry(tag, 5, values.len() as u32, payload)
    }

    fn build(self) -> Vec<u8> {
        let ifd_offset = 8usize;
        let mut data_offset = ifd_offset + 2 + 12 * self.entries.len() + 4;

        let mut bytes = b"II".to_vec();
        bytes.extend_from_slice(&42u16.to_le_bytes());
        bytes.extend_from_slice(&(ifd_offset as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.entries.len() as u16).to_le_bytes());

        let mut data = Vec::new();
        for (tag, field_type, count, payload) in &self.entries {
            bytes.extend_from_slice(&tag.to_le_bytes());
            bytes.extend_from_slice(&field_type.to_le_bytes());
            bytes.extend_from_slice(&count.to_le_bytes());
            if payload.len() <= 4 {
                let mut inline = payload.clone();
                inline.resize(4, 0);
                bytes.extend_from_slice(&inline);
            } else {
                bytes.extend_from_slice(&(data_offset as u32).to_le_bytes());
                data.extend_from_slice(payload);
                data_offset += payload.len();
            }
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&data);
        bytes
    }
}

#[test]
fn test_dng_colour_tags_are_parsed() {
    let colour_matrix: Vec<(i32, i32)> = [6461, -907, -882, -4300, 12184, 2378, -819, 1944, 5931]
        .into_iter()
        .map(|n| (n, 10000))
        .collect();
    let bytes = TiffBuilder::new()
        .entry(50706, 1, 4, vec![1, 4, 0, 0])
        .srationals(50721, &colour_matrix)
        .entry(50778, 3, 1, 21u16.to_le_bytes().to_vec())
        .rationals(50728, &[(1, 2), (1, 1), (2, 3)])
        .srationals(50730, &[(-1, 4)])
        .build();

    let dng = read_dng_metadata(&bytes).unwrap();
    assert_eq!(dng.version, 0x0104_0000);
    assert_eq!(dng.calibrations[0].illuminant, 21);
    assert!((dng.calibrations[0].xyz_to_rgb[0] - 0.6461).abs() < 1e-12);
    assert!((dng.calibrations[0].xyz_to_rgb[1] + 0.0907).abs() < 1e-12);
    assert_eq!(dng.calibrations[1].illuminant, 0);

    let [r, g, b] = dng.as_shot_neutral.unwrap();
    assert_eq!((r, g), (0.5, 1.0));
    assert!((b - 2.0 / 3.0).abs() < 1e-12);
    assert_eq!(dng.baseline_exposure, -0.25);
}

#[test]
fn test_non_dng_files_have_no_dng_metadata() {
    assert_eq!(read_dng_metadata(b"not a tiff file"), None);
    assert_eq!(read_dng_metadata(&[]), None);

    // A plain TIFF without DNGVersion.
    let bytes = TiffBuilder::new()
        .entry(50778, 3, 1, 17u16.to_le_bytes().to_vec())
        .build();
    assert_eq!(read_dng_metadata(&bytes), None);
}
