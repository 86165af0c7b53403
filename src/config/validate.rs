// src/config/validate.rs

//! Turning `RawSettings` into `Settings`.
//!
//! Mode-specific parameters that don't fit the chosen mode are not errors:
//! they produce a warning and fall back to their defaults.

use tracing::warn;

use crate::config::model::{RawSettings, Settings};
use crate::convert::batch::database_paths;
use crate::errors::{RawToAcesError, Result};
use crate::types::{IDENTITY3, MatrixMethod, PixelBox, WbMethod};

/// Illuminant used when `wb_method = "illuminant"` names none.
pub const DEFAULT_ILLUMINANT: &str = "D55";

/// Flip codes understood by the raw developer.
const FLIP_CODES: [i32; 4] = [0, 3, 5, 6];

/// Outcome of a mode/parameter consistency check.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamCheck<T> {
    /// The parameter values, when they should be used.
    pub value: Option<Vec<T>>,
    pub warning: Option<String>,
}

/// Check a parameter that only makes sense in one mode.
///
/// In the matching mode the parameter must have exactly `correct_size`
/// values; outside it, it must be absent. A single zero counts as absent.
pub fn check_param<T>(
    mode_name: &str,
    mode_value: &str,
    param_name: &str,
    param_value: Option<&[T]>,
    correct_size: usize,
    default_value_message: &str,
    is_correct_mode: bool,
) -> ParamCheck<T>
where
    T: Copy + PartialEq + Default,
{
    let values = param_value.unwrap_or(&[]);
    let zero = T::default();
    let absent = values.is_empty() || (values.len() == 1 && values[0] == zero);

    if is_correct_mode {
        if values.len() == correct_size {
            return ParamCheck {
                value: Some(values.to_vec()),
                warning: None,
            };
        }
        let warning = if absent {
            format!(
                "Warning: {mode_name} was set to \"{mode_value}\", but no \"--{param_name}\" parameter provided. {default_value_message}"
            )
        } else {
            format!(
                "Warning: The parameter \"{param_name}\" must have {correct_size} values. {default_value_message}"
            )
        };
        return ParamCheck {
            value: None,
            warning: Some(warning),
        };
    }

    let warning = (!absent).then(|| {
        format!(
            "Warning: the \"--{param_name}\" parameter provided, but the {mode_name} is different from \"{mode_value}\". {default_value_message}"
        )
    });
    ParamCheck {
        value: None,
        warning,
    }
}

/// Validate and apply defaults; returns the settings and any warnings.
pub fn validate_settings(raw: RawSettings) -> Result<(Settings, Vec<String>)> {
    let defaults = Settings::default();
    let mut warnings = Vec::new();

    let wb_method = raw.wb_method.unwrap_or(defaults.wb_method);
    let matrix_method = raw.mat_method.unwrap_or(defaults.matrix_method);

    let mut illuminant = raw.illuminant.unwrap_or_default().trim().to_string();
    let is_wb_illuminant = wb_method == WbMethod::Illuminant;
    if is_wb_illuminant && illuminant.is_empty() {
        warnings.push(format!(
            "Warning: the white balancing method was set to \"illuminant\", but no \"--illuminant\" parameter provided. {DEFAULT_ILLUMINANT} will be used as default."
        ));
        illuminant = DEFAULT_ILLUMINANT.to_string();
    } else if !is_wb_illuminant && !illuminant.is_empty() {
        warnings.push(
            "Warning: the \"--illuminant\" parameter provided but the white balancing mode different from \"illuminant\" requested. The custom illuminant will be ignored."
                .to_string(),
        );
        illuminant.clear();
    }

    let wb_box = check_param(
        "white balancing mode",
        "box",
        "wb-box",
        raw.wb_box.as_deref(),
        4,
        "The box will be ignored.",
        wb_method == WbMethod::Box,
    );
    warnings.extend(wb_box.warning);
    let wb_box = wb_box
        .value
        .and_then(|v| PixelBox::from_slice(&v))
        .unwrap_or_default();

    let custom_wb = check_param(
        "white balancing mode",
        "custom",
        "custom-wb",
        raw.custom_wb.as_deref(),
        4,
        "The scalers will be ignored. The default values of (1, 1, 1, 1) will be used",
        wb_method == WbMethod::Custom,
    );
    warnings.extend(custom_wb.warning);
    let custom_wb = custom_wb
        .value
        .and_then(|v| <[f64; 4]>::try_from(v).ok())
        .unwrap_or(defaults.custom_wb);

    let custom_mat = check_param(
        "matrix mode",
        "custom",
        "custom-mat",
        raw.custom_mat.as_deref(),
        9,
        "Identity matrix will be used",
        matrix_method == MatrixMethod::Custom,
    );
    warnings.extend(custom_mat.warning);
    let custom_matrix = custom_mat
        .value
        .map(|v| std::array::from_fn(|i| std::array::from_fn(|j| v[i * 3 + j])))
        .unwrap_or(IDENTITY3);

    let crop_box = raw
        .crop_box
        .as_deref()
        .and_then(PixelBox::from_slice)
        .unwrap_or(defaults.crop_box);

    let chromatic_aberration = match raw.chromatic_aberration.as_deref() {
        Some(&[red, blue]) => [red, blue],
        _ => defaults.chromatic_aberration,
    };

    let flip = raw.flip.unwrap_or(defaults.flip);
    if !FLIP_CODES.contains(&flip) {
        return Err(RawToAcesError::ConfigError(format!(
            "Unsupported flip value: {flip}. The following values are supported: 0, 3, 5, 6."
        )));
    }

    let headroom = raw.headroom.unwrap_or(defaults.headroom);
    let scale = raw.scale.unwrap_or(defaults.scale);
    for (name, value) in [("headroom", headroom), ("scale", scale)] {
        if !value.is_finite() || value <= 0.0 {
            return Err(RawToAcesError::ConfigError(format!(
                "The {name} must be a positive number (got {value})."
            )));
        }
    }

    let settings = Settings {
        wb_method,
        matrix_method,
        illuminant,
        wb_box,
        custom_wb,
        custom_matrix,
        custom_camera_make: raw.custom_camera_make.unwrap_or_default(),
        custom_camera_model: raw.custom_camera_model.unwrap_or_default(),
        headroom,
        scale,
        overwrite: raw.overwrite.unwrap_or(defaults.overwrite),
        create_dirs: raw.create_dirs.unwrap_or(defaults.create_dirs),
        output_dir: raw.output_dir.unwrap_or_default(),
        database_directories: database_paths(raw.data_dir.as_deref()),
        auto_bright: raw.auto_bright.unwrap_or(defaults.auto_bright),
        adjust_maximum_threshold: raw
            .adjust_maximum_threshold
            .unwrap_or(defaults.adjust_maximum_threshold),
        black_level: raw.black_level.unwrap_or(defaults.black_level),
        saturation_level: raw.saturation_level.unwrap_or(defaults.saturation_level),
        chromatic_aberration,
        half_size: raw.half_size.unwrap_or(defaults.half_size),
        highlight_mode: raw.highlight_mode.unwrap_or(defaults.highlight_mode),
        crop_box,
        crop_mode: raw.crop_mode.unwrap_or(defaults.crop_mode),
        flip,
        denoise_threshold: raw.denoise_threshold.unwrap_or(defaults.denoise_threshold),
        demosaic: raw.demosaic.unwrap_or(defaults.demosaic),
        use_timing: raw.use_timing.unwrap_or(defaults.use_timing),
        verbosity: raw.verbosity.unwrap_or(defaults.verbosity),
    };

    Ok((settings, warnings))
}

impl TryFrom<RawSettings> for Settings {
    type Error = RawToAcesError;

    fn try_from(raw: RawSettings) -> std::result::Result<Self, Self::Error> {
        let (settings, warnings) = validate_settings(raw)?;
        for warning in warnings {
            warn!("{warning}");
        }
        Ok(settings)
    }
}
