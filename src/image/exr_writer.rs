// src/image/exr_writer.rs

//! ACES Image Container output: half-float RGB OpenEXR, uncompressed, with
//! AP0 chromaticities and `acesImageContainerFlag = 1`. Camera make and
//! model travel along as `cameraMake`/`cameraModel` text attributes.

use std::path::Path;

use exr::meta::attribute::{AttributeValue, Chromaticities, IntegerBounds, Text};
use exr::prelude::*;
use tracing::{debug, warn};

use crate::colour::constants::ACES_CHROMATICITIES;
use crate::errors::Result;
use crate::image::buffer::ImageBuf;
use crate::image::raw::RawMetadata;

pub const CAMERA_MAKE_ATTR: &str = "cameraMake";
pub const CAMERA_MODEL_ATTR: &str = "cameraModel";
pub const ORIENTATION_ATTR: &str = "orientation";
pub const BASELINE_EXPOSURE_ATTR: &str = "dngBaselineExposure";

/// Source details written next to the pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExrMetadata {
    pub camera_make: String,
    pub camera_model: String,
    /// Flip code the pixels were rotated by.
    pub orientation: i32,
    pub baseline_exposure: Option<f64>,
}

impl ExrMetadata {
    pub fn from_raw(metadata: &RawMetadata) -> Self {
        Self {
            camera_make: metadata.make.clone(),
            camera_model: metadata.model.clone(),
            orientation: metadata.orientation,
            baseline_exposure: metadata.dng.as_ref().map(|d| d.baseline_exposure),
        }
    }

    fn attributes(&self) -> Vec<(Text, AttributeValue)> {
        let mut attrs = Vec::new();
        for (name, value) in [
            (CAMERA_MAKE_ATTR, &self.camera_make),
            (CAMERA_MODEL_ATTR, &self.camera_model),
        ] {
            if value.is_empty() {
                continue;
            }
            // EXR text is single-byte; names outside that range are dropped.
            match Text::new_or_none(value) {
                Some(text) => attrs.push((Text::from(name), AttributeValue::Text(text))),
                None => warn!("Skipping the {name} attribute: '{value}' is not representable."),
            }
        }
        attrs.push((
            Text::from(ORIENTATION_ATTR),
            AttributeValue::I32(self.orientation),
        ));
        if let Some(exposure) = self.baseline_exposure {
            attrs.push((
                Text::from(BASELINE_EXPOSURE_ATTR),
                AttributeValue::F32(exposure as f32),
            ));
        }
        attrs
    }
}

fn vec2(xy: [f64; 2]) -> Vec2<f32> {
    Vec2(xy[0] as f32, xy[1] as f32)
}

pub fn aces_chromaticities() -> Chromaticities {
    Chromaticities {
        red: vec2(ACES_CHROMATICITIES[0]),
        green: vec2(ACES_CHROMATICITIES[1]),
        blue: vec2(ACES_CHROMATICITIES[2]),
        white: vec2(ACES_CHROMATICITIES[3]),
    }
}

pub fn write_aces_exr(path: &Path, image: &ImageBuf, metadata: &ExrMetadata) -> Result<()> {
    let width = image.width();
    let pixels = image.pixels();

    let channels = SpecificChannels::rgb(|Vec2(x, y): Vec2<usize>| {
        let [r, g, b] = pixels[y * width + x];
        (f16::from_f32(r), f16::from_f32(g), f16::from_f32(b))
    });

    let mut layer = Layer::new(
        (width, image.height()),
        LayerAttributes::default(),
        Encoding::UNCOMPRESSED,
        channels,
    );
    layer.attributes.layer_position = Vec2(image.data_window.x, image.data_window.y);

    let mut exr_image = Image::from_layer(layer);
    let display = image.display_window;
    exr_image.attributes.display_window = IntegerBounds::new(
        Vec2(display.x, display.y),
        Vec2(display.width.max(0) as usize, display.height.max(0) as usize),
    );
    exr_image.attributes.chromaticities = Some(aces_chromaticities());
    exr_image
        .attributes
        .other
        .insert(Text::from("acesImageContainerFlag"), AttributeValue::I32(1));
    exr_image.attributes.other.extend(metadata.attributes());

    exr_image.write().to_file(path)?;
    debug!(path = %path.display(), "wrote ACES container");
    Ok(())
}
