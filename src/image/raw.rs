// src/image/raw.rs

//! Raw file decoding: sensor samples plus the metadata the colour pipeline
//! needs.

use std::fmt::Debug;
use std::path::Path;

use tracing::{debug, warn};

use crate::colour::math::camera_to_xyz_from_colour_matrix;
use crate::errors::{RawToAcesError, Result};
use crate::image::dng::{DngMetadata, read_dng_metadata};
use crate::types::{Matrix3, PixelBox};

/// Metadata of a raw file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMetadata {
    pub make: String,
    pub model: String,
    /// Sensor size in samples.
    pub width: usize,
    pub height: usize,
    /// As-shot white balance multipliers (R, G, B, G2); all zero if unknown.
    pub cam_mul: [f64; 4],
    /// Daylight multipliers derived from the colour matrix.
    pub pre_mul: [f64; 4],
    /// XYZ to camera RGB.
    pub xyz_to_cam: Matrix3,
    /// Black level per CFA colour.
    pub black_levels: [f64; 4],
    pub white_level: f64,
    /// Area of the sensor meant to be displayed.
    pub default_crop: PixelBox,
    /// Flip code: 0 none, 3 rotate 180, 5 rotate 90 counter-clockwise,
    /// 6 rotate 90 clockwise.
    pub orientation: i32,
    pub dng: Option<DngMetadata>,
}

impl RawMetadata {
    pub fn dng_version(&self) -> u32 {
        self.dng.as_ref().map_or(0, |d| d.version)
    }

    pub fn is_dng(&self) -> bool {
        self.dng_version() > 0
    }
}

/// Colour filter array layout; colour 0 is red, 1 and 3 green, 2 blue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfaPattern {
    pub width: usize,
    pub height: usize,
    colours: Vec<u8>,
}

impl CfaPattern {
    pub fn new(width: usize, height: usize, colours: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || colours.len() != width * height {
            return Err(RawToAcesError::Image(format!(
                "invalid {width}x{height} CFA pattern with {} entries",
                colours.len()
            )));
        }
        Ok(Self {
            width,
            height,
            colours,
        })
    }

    /// 2x2 Bayer pattern from a name such as `RGGB`.
    pub fn bayer(name: &str) -> Result<Self> {
        let mut greens = 0;
        let colours = name
            .chars()
            .map(|c| match c.to_ascii_uppercase() {
                'R' => Ok(0),
                'G' => {
                    greens += 1;
                    Ok(if greens == 1 { 1 } else { 3 })
                }
                'B' => Ok(2),
                other => Err(RawToAcesError::Image(format!(
                    "unknown CFA colour '{other}' in '{name}'"
                ))),
            })
            .collect::<Result<Vec<u8>>>()?;
        Self::new(2, 2, colours)
    }

    pub fn color_at(&self, row: usize, col: usize) -> usize {
        usize::from(self.colours[(row % self.height) * self.width + col % self.width])
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SensorData {
    /// One sample per pixel behind a colour filter array.
    Cfa { pattern: CfaPattern, values: Vec<f32> },
    /// Three interleaved samples per pixel (linear DNG and similar).
    Rgb { values: Vec<f32> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub metadata: RawMetadata,
    pub sensor: SensorData,
}

/// Source of raw images.
pub trait RawDecoder: Send + Sync + Debug {
    fn decode(&self, path: &Path) -> Result<RawImage>;
}

/// Decoder backed by `rawloader`, with DNG colour tags read separately.
#[derive(Debug, Clone, Default)]
pub struct RawloaderDecoder;

fn orientation_code(orientation: rawloader::Orientation) -> i32 {
    match orientation {
        rawloader::Orientation::Rotate180 => 3,
        rawloader::Orientation::Rotate270 => 5,
        rawloader::Orientation::Rotate90 => 6,
        _ => 0,
    }
}

impl RawDecoder for RawloaderDecoder {
    fn decode(&self, path: &Path) -> Result<RawImage> {
        let image = rawloader::decode_file(path).map_err(|e| {
            RawToAcesError::Image(format!("failed to decode {}: {e:?}", path.display()))
        })?;

        let xyz_to_cam: Matrix3 =
            std::array::from_fn(|r| std::array::from_fn(|c| f64::from(image.xyz_to_cam[r][c])));
        let pre_mul = match camera_to_xyz_from_colour_matrix(&xyz_to_cam) {
            Some((_, [r, g, b])) => [r / g, 1.0, b / g, 1.0],
            None => [1.0; 4],
        };
        let cam_mul = image
            .wb_coeffs
            .map(|v| if v.is_finite() { f64::from(v) } else { 0.0 });

        let [top, right, bottom, left] = image.crops;
        let default_crop = PixelBox::new(
            left as i32,
            top as i32,
            image.width.saturating_sub(left + right) as i32,
            image.height.saturating_sub(top + bottom) as i32,
        );

        let dng = std::fs::read(path)
            .ok()
            .and_then(|bytes| read_dng_metadata(&bytes));

        let metadata = RawMetadata {
            make: image.clean_make.clone(),
            model: image.clean_model.clone(),
            width: image.width,
            height: image.height,
            cam_mul,
            pre_mul,
            xyz_to_cam,
            black_levels: image.blacklevels.map(f64::from),
            white_level: f64::from(image.whitelevels[0]),
            default_crop,
            orientation: orientation_code(image.orientation),
            dng,
        };

        let values: Vec<f32> = match &image.data {
            rawloader::RawImageData::Integer(data) => data.iter().map(|&v| f32::from(v)).collect(),
            rawloader::RawImageData::Float(data) => data.clone(),
        };

        let sensor = if image.cpp == 1 {
            let cfa = &image.cfa;
            let colours = (0..cfa.height)
                .flat_map(|row| (0..cfa.width).map(move |col| (row, col)))
                .map(|(row, col)| cfa.color_at(row, col) as u8)
                .collect();
            SensorData::Cfa {
                pattern: CfaPattern::new(cfa.width, cfa.height, colours)?,
                values,
            }
        } else if image.cpp == 3 {
            SensorData::Rgb { values }
        } else {
            return Err(RawToAcesError::Image(format!(
                "unsupported number of components per pixel ({}) in {}",
                image.cpp,
                path.display()
            )));
        };

        debug!(
            path = %path.display(),
            make = %metadata.make,
            model = %metadata.model,
            width = metadata.width,
            height = metadata.height,
            dng = metadata.is_dng(),
            "decoded raw file"
        );
        Ok(RawImage { metadata, sensor })
    }
}

/// Apply user supplied camera make/model, which take precedence over the
/// file's values, and warn about whatever is still missing.
pub fn fix_metadata(metadata: &mut RawMetadata, custom_make: &str, custom_model: &str) {
    if !custom_make.is_empty() {
        metadata.make = custom_make.to_string();
    }
    if !custom_model.is_empty() {
        metadata.model = custom_model.to_string();
    }

    if metadata.make.is_empty() {
        warn!(
            "Missing the camera manufacturer name in the file metadata. You can provide a camera make using the --custom-camera-make parameter"
        );
    }
    if metadata.model.is_empty() {
        warn!(
            "Missing the camera model name in the file metadata. You can provide a camera model using the --custom-camera-model parameter"
        );
    }
}
