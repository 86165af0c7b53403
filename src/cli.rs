// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Every conversion option is optional here; values left out fall back to
//! the settings file (if any) and then to the built-in defaults. See
//! [`CliArgs::to_raw_settings`].

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::config::RawSettings;
use crate::types::{CropMode, DemosaicAlgorithm, MatrixMethod, WbMethod};

/// Command-line arguments for `rawtoaces`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rawtoaces",
    version,
    about = "Convert camera RAW files to ACES container OpenEXR files.",
    long_about = None
)]
pub struct CliArgs {
    /// Input files or directories. Directories are scanned (not recursively)
    /// for images.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Settings file (TOML). Falls back to `RAWTOACES_CONFIG`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// White balance method. Supported options: metadata, illuminant, box,
    /// custom. [default: metadata]
    #[arg(long, value_name = "STR")]
    pub wb_method: Option<WbMethod>,

    /// IDT matrix calculation method. Supported options: auto, spectral,
    /// metadata, Adobe, custom. [default: auto]
    #[arg(long, value_name = "STR")]
    pub mat_method: Option<MatrixMethod>,

    /// Illuminant for white balancing. (default = D55)
    #[arg(long, value_name = "STR")]
    pub illuminant: Option<String>,

    /// Box to use for white balancing. (default = (0,0,0,0) - full image)
    #[arg(long, num_args = 4, value_names = ["X", "Y", "W", "H"], allow_negative_numbers = true)]
    pub wb_box: Option<Vec<i32>>,

    /// Custom white balance multipliers.
    #[arg(long, num_args = 4, value_names = ["R", "G", "B", "G"])]
    pub custom_wb: Option<Vec<f64>>,

    /// Custom camera RGB to XYZ matrix.
    #[arg(
        long,
        num_args = 9,
        value_names = ["Rr", "Rg", "Rb", "Gr", "Gg", "Gb", "Br", "Bg", "Bb"],
        allow_negative_numbers = true
    )]
    pub custom_mat: Option<Vec<f64>>,

    /// Camera manufacturer name to be used for spectral sensitivity curves
    /// lookup. If present, overrides the value stored in the file metadata.
    #[arg(long, value_name = "STR")]
    pub custom_camera_make: Option<String>,

    /// Camera model name to be used for spectral sensitivity curves lookup.
    /// If present, overrides the value stored in the file metadata.
    #[arg(long, value_name = "STR")]
    pub custom_camera_model: Option<String>,

    /// Highlight headroom factor. [default: 6.0]
    #[arg(long, value_name = "VAL")]
    pub headroom: Option<f64>,

    /// Additional scaling factor to apply to the pixel values. [default: 1.0]
    #[arg(long, value_name = "VAL")]
    pub scale: Option<f64>,

    /// Allows overwriting existing files. If not set, trying to write to an
    /// existing file will generate an error.
    #[arg(long)]
    pub overwrite: bool,

    /// Directory containing rawtoaces spectral sensitivity and illuminant
    /// data files. Overrides the default search path and the
    /// RAWTOACES_DATA_PATH environment variable.
    #[arg(long, value_name = "STR")]
    pub data_dir: Option<String>,

    /// The directory to write the output files to. This gets applied to
    /// every input directory, so it is better to be used with a single input
    /// directory.
    #[arg(long, value_name = "STR")]
    pub output_dir: Option<String>,

    /// Create output directories if they don't exist.
    #[arg(long)]
    pub create_dirs: bool,

    /// Enable automatic exposure adjustment.
    #[arg(long)]
    pub auto_bright: bool,

    /// Automatically lower the linearity threshold provided in the metadata
    /// by this scaling factor. [default: 0.75]
    #[arg(long, value_name = "VAL")]
    pub adjust_maximum_threshold: Option<f64>,

    /// If >= 0, override the black level. [default: -1]
    #[arg(long, value_name = "VAL", allow_negative_numbers = true)]
    pub black_level: Option<i32>,

    /// If not 0, override the level which appears to be saturated after
    /// normalisation. [default: 0]
    #[arg(long, value_name = "VAL")]
    pub saturation_level: Option<i32>,

    /// Red and blue scale factors for chromatic aberration correction. The
    /// value of 1 means no correction.
    #[arg(long, num_args = 2, value_names = ["R", "B"])]
    pub chromatic_aberration: Option<Vec<f64>>,

    /// If present, decode image at half size resolution.
    #[arg(long)]
    pub half_size: bool,

    /// 0 = clip, 1 = unclip, 2 = blend, 3..9 = rebuild. [default: 0]
    #[arg(long, value_name = "VAL")]
    pub highlight_mode: Option<i32>,

    /// Apply custom crop. If not present, the default crop is applied, which
    /// should match the crop of the in-camera JPEG.
    #[arg(long, num_args = 4, value_names = ["X", "Y", "W", "H"], allow_negative_numbers = true)]
    pub crop_box: Option<Vec<i32>>,

    /// Cropping mode. Supported options: 'off' (write out the full sensor
    /// area), 'soft' (write out full image, mark the crop as the display
    /// window), 'hard' (write out only the crop area). [default: soft]
    #[arg(long, value_name = "STR")]
    pub crop_mode: Option<CropMode>,

    /// If not 0, override the orientation specified in the metadata.
    /// 3 = 180 deg, 5 = 90 deg CCW, 6 = 90 deg CW. [default: 0]
    #[arg(long, value_name = "VAL")]
    pub flip: Option<i32>,

    /// Wavelet denoising threshold
    #[arg(long, value_name = "VAL")]
    pub denoise_threshold: Option<f64>,

    /// Demosaicing algorithm. Supported options: linear, nearest.
    /// [default: linear]
    #[arg(long, value_name = "STR")]
    pub demosaic: Option<DemosaicAlgorithm>,

    /// Shows the list of cameras supported in spectral mode.
    #[arg(long)]
    pub list_cameras: bool,

    /// Shows the list of illuminants supported in spectral mode.
    #[arg(long)]
    pub list_illuminants: bool,

    /// Log the execution time of each step of image processing.
    #[arg(long)]
    pub use_timing: bool,

    /// Print progress messages. Repeat to increase verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// Takes precedence over `-v` and `RAWTOACES_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn flag(value: bool) -> Option<bool> {
    value.then_some(true)
}

impl CliArgs {
    /// The conversion options given on the command line. Switches that were
    /// not passed stay `None` so a settings file can still turn them on.
    pub fn to_raw_settings(&self) -> RawSettings {
        RawSettings {
            wb_method: self.wb_method,
            mat_method: self.mat_method,
            illuminant: self.illuminant.clone(),
            wb_box: self.wb_box.clone(),
            custom_wb: self.custom_wb.clone(),
            custom_mat: self.custom_mat.clone(),
            custom_camera_make: self.custom_camera_make.clone(),
            custom_camera_model: self.custom_camera_model.clone(),
            headroom: self.headroom,
            scale: self.scale,
            overwrite: flag(self.overwrite),
            data_dir: self.data_dir.clone(),
            output_dir: self.output_dir.clone(),
            create_dirs: flag(self.create_dirs),
            auto_bright: flag(self.auto_bright),
            adjust_maximum_threshold: self.adjust_maximum_threshold,
            black_level: self.black_level,
            saturation_level: self.saturation_level,
            chromatic_aberration: self.chromatic_aberration.clone(),
            half_size: flag(self.half_size),
            highlight_mode: self.highlight_mode,
            crop_box: self.crop_box.clone(),
            crop_mode: self.crop_mode,
            flip: self.flip,
            denoise_threshold: self.denoise_threshold,
            demosaic: self.demosaic,
            use_timing: flag(self.use_timing),
            verbosity: (self.verbose > 0).then_some(self.verbose),
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
