// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{
    CropMode, DemosaicAlgorithm, IDENTITY3, Matrix3, MatrixMethod, PixelBox, WbMethod,
};

/// Top-level layout of a settings file.
///
/// ```toml
/// [settings]
/// wb_method = "illuminant"
/// illuminant = "D55"
/// mat_method = "spectral"
/// headroom = 6.0
/// output_dir = "aces"
/// create_dirs = true
/// ```
///
/// Every key is optional; command-line flags override the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub settings: RawSettings,
}

/// Unvalidated settings: what the user asked for, from the file or the
/// command line. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSettings {
    pub wb_method: Option<WbMethod>,
    pub mat_method: Option<MatrixMethod>,
    pub illuminant: Option<String>,
    pub wb_box: Option<Vec<i32>>,
    pub custom_wb: Option<Vec<f64>>,
    pub custom_mat: Option<Vec<f64>>,
    pub custom_camera_make: Option<String>,
    pub custom_camera_model: Option<String>,
    pub headroom: Option<f64>,
    pub scale: Option<f64>,
    pub overwrite: Option<bool>,
    pub data_dir: Option<String>,
    pub output_dir: Option<String>,
    pub create_dirs: Option<bool>,
    pub auto_bright: Option<bool>,
    pub adjust_maximum_threshold: Option<f64>,
    pub black_level: Option<i32>,
    pub saturation_level: Option<i32>,
    pub chromatic_aberration: Option<Vec<f64>>,
    pub half_size: Option<bool>,
    pub highlight_mode: Option<i32>,
    pub crop_box: Option<Vec<i32>>,
    pub crop_mode: Option<CropMode>,
    pub flip: Option<i32>,
    pub denoise_threshold: Option<f64>,
    pub demosaic: Option<DemosaicAlgorithm>,
    pub use_timing: Option<bool>,
    pub verbosity: Option<u8>,
}

macro_rules! overlay {
    ($high:ident, $low:ident, $($field:ident),+ $(,)?) => {
        RawSettings {
            $($field: $high.$field.or($low.$field),)+
        }
    };
}

impl RawSettings {
    /// Values of `self` where given, `lower` otherwise.
    pub fn or(self, lower: RawSettings) -> RawSettings {
        let high = self;
        overlay!(
            high,
            lower,
            wb_method,
            mat_method,
            illuminant,
            wb_box,
            custom_wb,
            custom_mat,
            custom_camera_make,
            custom_camera_model,
            headroom,
            scale,
            overwrite,
            data_dir,
            output_dir,
            create_dirs,
            auto_bright,
            adjust_maximum_threshold,
            black_level,
            saturation_level,
            chromatic_aberration,
            half_size,
            highlight_mode,
            crop_box,
            crop_mode,
            flip,
            denoise_threshold,
            demosaic,
            use_timing,
            verbosity,
        )
    }
}

/// Validated conversion settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub wb_method: WbMethod,
    pub matrix_method: MatrixMethod,
    /// Only meaningful with `WbMethod::Illuminant`.
    pub illuminant: String,
    /// Region used by `WbMethod::Box`; empty means the whole image.
    pub wb_box: PixelBox,
    pub custom_wb: [f64; 4],
    pub custom_matrix: Matrix3,
    pub custom_camera_make: String,
    pub custom_camera_model: String,

    pub headroom: f64,
    pub scale: f64,

    pub overwrite: bool,
    pub create_dirs: bool,
    /// Output directory, relative to each input file's directory unless
    /// absolute. Empty writes next to the input.
    pub output_dir: String,
    pub database_directories: Vec<PathBuf>,

    pub auto_bright: bool,
    pub adjust_maximum_threshold: f64,
    /// Negative means "use the file's black level".
    pub black_level: i32,
    /// Zero or negative means "use the file's white level".
    pub saturation_level: i32,
    pub chromatic_aberration: [f64; 2],
    pub half_size: bool,
    pub highlight_mode: i32,
    pub crop_box: PixelBox,
    pub crop_mode: CropMode,
    pub flip: i32,
    pub denoise_threshold: f64,
    pub demosaic: DemosaicAlgorithm,

    pub use_timing: bool,
    pub verbosity: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wb_method: WbMethod::Metadata,
            matrix_method: MatrixMethod::Auto,
            illuminant: String::new(),
            wb_box: PixelBox::default(),
            custom_wb: [1.0; 4],
            custom_matrix: IDENTITY3,
            custom_camera_make: String::new(),
            custom_camera_model: String::new(),
            headroom: 6.0,
            scale: 1.0,
            overwrite: false,
            create_dirs: false,
            output_dir: String::new(),
            database_directories: Vec::new(),
            auto_bright: false,
            adjust_maximum_threshold: 0.75,
            black_level: -1,
            saturation_level: 0,
            chromatic_aberration: [1.0, 1.0],
            half_size: false,
            highlight_mode: 0,
            crop_box: PixelBox::default(),
            crop_mode: CropMode::Soft,
            flip: 0,
            denoise_threshold: 0.0,
            demosaic: DemosaicAlgorithm::Linear,
            use_timing: false,
            verbosity: 0,
        }
    }
}
