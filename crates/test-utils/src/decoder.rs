#![allow(dead_code)]

use std::path::Path;

use rawtoaces::colour::math::camera_to_xyz_from_colour_matrix;
use rawtoaces::errors::Result;
use rawtoaces::image::{CfaPattern, RawDecoder, RawImage, RawMetadata, SensorData};
use rawtoaces::types::{Matrix3, PixelBox};

/// XYZ to camera matrix of a typical DSLR.
pub const DSLR_XYZ_TO_CAM: Matrix3 = [
    [0.6461, -0.0907, -0.0882],
    [-0.4300, 1.2184, 0.2378],
    [-0.0819, 0.1944, 0.5931],
];

/// Decoder that ignores the file contents and returns a flat RGGB frame.
#[derive(Debug, Clone)]
pub struct SyntheticDecoder {
    pub metadata: RawMetadata,
    /// Sensor value per CFA colour (R, G, B, G2).
    pub levels: [f32; 4],
}

impl SyntheticDecoder {
    pub fn new(make: &str, model: &str, width: usize, height: usize) -> Self {
        let pre_mul = match camera_to_xyz_from_colour_matrix(&DSLR_XYZ_TO_CAM) {
            Some((_, [r, g, b])) => [r / g, 1.0, b / g, 1.0],
            None => [1.0; 4],
        };
        Self {
            metadata: RawMetadata {
                make: make.to_string(),
                model: model.to_string(),
                width,
                height,
                cam_mul: [2.0, 1.0, 1.5, 1.0],
                pre_mul,
                xyz_to_cam: DSLR_XYZ_TO_CAM,
                black_levels: [64.0; 4],
                white_level: 4095.0,
                default_crop: PixelBox::new(1, 1, width as i32 - 2, height as i32 - 2),
                orientation: 0,
                dng: None,
            },
            levels: [1000.0, 1800.0, 1200.0, 1800.0],
        }
    }

    pub fn with_orientation(mut self, orientation: i32) -> Self {
        self.metadata.orientation = orientation;
        self
    }

    pub fn with_levels(mut self, levels: [f32; 4]) -> Self {
        self.levels = levels;
        self
    }

    pub fn image(&self) -> Result<RawImage> {
        let pattern = CfaPattern::bayer("RGGB")?;
        let (w, h) = (self.metadata.width, self.metadata.height);
        let values = (0..h)
            .flat_map(|row| (0..w).map(move |col| (row, col)))
            .map(|(row, col)| self.levels[pattern.color_at(row, col)])
            .collect();
        Ok(RawImage {
            metadata: self.metadata.clone(),
            sensor: SensorData::Cfa { pattern, values },
        })
    }
}

impl RawDecoder for SyntheticDecoder {
    fn decode(&self, _path: &Path) -> Result<RawImage> {
        self.image()
    }
}
