// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How white balancing multipliers are obtained.
///
/// - `Metadata`: use the as-shot multipliers stored in the file.
/// - `Illuminant`: balance to a named illuminant; needs spectral sensitivity
///   data for the camera.
/// - `Box`: average a region of the image (the whole image for an empty box).
/// - `Custom`: user supplied multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WbMethod {
    Metadata,
    Illuminant,
    Box,
    Custom,
}

impl Default for WbMethod {
    fn default() -> Self {
        WbMethod::Metadata
    }
}

impl FromStr for WbMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "metadata" => Ok(WbMethod::Metadata),
            "illuminant" => Ok(WbMethod::Illuminant),
            "box" => Ok(WbMethod::Box),
            "custom" => Ok(WbMethod::Custom),
            other => Err(format!(
                "Unsupported white balancing method: '{other}'. The following methods are supported: metadata, illuminant, box, custom."
            )),
        }
    }
}

impl fmt::Display for WbMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WbMethod::Metadata => "metadata",
            WbMethod::Illuminant => "illuminant",
            WbMethod::Box => "box",
            WbMethod::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// How the camera to ACES matrix is obtained.
///
/// `Auto` picks `Spectral` when sensitivity data for the camera exists in the
/// data base and falls back to `Metadata` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum MatrixMethod {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "spectral")]
    Spectral,
    #[serde(rename = "metadata")]
    Metadata,
    #[serde(rename = "Adobe")]
    Adobe,
    #[serde(rename = "custom")]
    Custom,
}

impl Default for MatrixMethod {
    fn default() -> Self {
        MatrixMethod::Auto
    }
}

impl FromStr for MatrixMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(MatrixMethod::Auto),
            "spectral" => Ok(MatrixMethod::Spectral),
            "metadata" => Ok(MatrixMethod::Metadata),
            "Adobe" => Ok(MatrixMethod::Adobe),
            "custom" => Ok(MatrixMethod::Custom),
            other => Err(format!(
                "Unsupported matrix method: '{other}'. The following methods are supported: auto, spectral, metadata, Adobe, custom."
            )),
        }
    }
}

impl fmt::Display for MatrixMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatrixMethod::Auto => "auto",
            MatrixMethod::Spectral => "spectral",
            MatrixMethod::Metadata => "metadata",
            MatrixMethod::Adobe => "Adobe",
            MatrixMethod::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Cropping mode applied before writing.
///
/// - `Off`: write the full sensor area.
/// - `Soft`: write the full sensor area, mark the crop as the display window.
/// - `Hard`: write only the crop area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropMode {
    Off,
    Soft,
    Hard,
}

impl Default for CropMode {
    fn default() -> Self {
        CropMode::Soft
    }
}

impl FromStr for CropMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "off" => Ok(CropMode::Off),
            "soft" => Ok(CropMode::Soft),
            "hard" => Ok(CropMode::Hard),
            other => Err(format!(
                "Unsupported cropping mode: '{other}'. The following modes are supported: off, soft, hard."
            )),
        }
    }
}

impl fmt::Display for CropMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CropMode::Off => "off",
            CropMode::Soft => "soft",
            CropMode::Hard => "hard",
        };
        f.write_str(s)
    }
}

/// Demosaicing algorithm used when developing CFA data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemosaicAlgorithm {
    /// Bilinear interpolation of the missing colour samples.
    Linear,
    /// Nearest same-colour sample within the 2x2 neighbourhood.
    Nearest,
}

impl Default for DemosaicAlgorithm {
    fn default() -> Self {
        DemosaicAlgorithm::Linear
    }
}

impl FromStr for DemosaicAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(DemosaicAlgorithm::Linear),
            "nearest" => Ok(DemosaicAlgorithm::Nearest),
            other => Err(format!(
                "Unsupported demosaicing algorithm: '{other}'. The following algorithms are supported: linear, nearest."
            )),
        }
    }
}

impl fmt::Display for DemosaicAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemosaicAlgorithm::Linear => f.write_str("linear"),
            DemosaicAlgorithm::Nearest => f.write_str("nearest"),
        }
    }
}

/// Highlight handling after white balancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightMode {
    /// Clip every channel at the saturation level.
    Clip,
    /// Keep values above the saturation level.
    Unclip,
}

impl HighlightMode {
    /// Map the numeric LibRaw-style code. Reconstruction modes (2..9) are not
    /// implemented and behave like `Unclip`.
    pub fn from_code(code: i32) -> Self {
        if code == 0 {
            HighlightMode::Clip
        } else {
            HighlightMode::Unclip
        }
    }
}

/// Pixel box given as origin and size, used for white-balance regions and
/// crops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct PixelBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_slice(values: &[i32]) -> Option<Self> {
        match values {
            [x, y, w, h] => Some(Self::new(*x, *y, *w, *h)),
            _ => None,
        }
    }

    /// A box with zero width or height stands for "not set".
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for PixelBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x, self.y, self.width, self.height)
    }
}

/// Generic 3x3 matrix in row-major order.
pub type Matrix3 = [[f64; 3]; 3];

/// Identity matrix.
pub const IDENTITY3: Matrix3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
