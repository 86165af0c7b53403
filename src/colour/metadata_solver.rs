// src/colour/metadata_solver.rs

//! IDT solving from DNG colour metadata.
//!
//! DNG files carry two calibrated XYZ→camera matrices, each measured under
//! a known illuminant, and the as-shot neutral. The solver finds the colour
//! temperature at which the interpolated matrix maps the neutral onto the
//! Planckian locus, then adapts the resulting camera white to ACES.

use tracing::warn;

use crate::colour::constants::{EXIF_LIGHT_SOURCE_CCT, ROBERTSON_MIRED, ROBERTSON_UVT};
use crate::colour::math::{
    aces_to_xyz, chromatic_adaptation, from_flat, invert, mat_mul, mat_vec, scale, sum, uv_to_xyz,
    xyz_d65_to_aces, xyz_to_uv,
};
use crate::errors::{RawToAcesError, Result};
use crate::types::Matrix3;

/// One DNG colour calibration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Calibration {
    /// EXIF LightSource code of the calibration illuminant.
    pub illuminant: u16,
    /// ColorMatrix: XYZ to camera, row-major.
    pub xyz_to_rgb: [f64; 9],
    /// CameraCalibration, row-major.
    pub camera_calibration: [f64; 9],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub calibration: [Calibration; 2],
    /// AsShotNeutral, camera RGB of a neutral surface.
    pub neutral_rgb: Option<[f64; 3]>,
    pub baseline_exposure: f64,
}

pub fn cct_to_mired(cct: f64) -> f64 {
    1.0e6 / cct
}

pub fn mired_to_cct(mired: f64) -> f64 {
    1.0e6 / mired
}

/// Colour temperature of an EXIF LightSource code; codes from 32768 up
/// carry the temperature directly.
pub fn light_source_to_color_temp(tag: u16) -> f64 {
    if tag >= 32768 {
        return f64::from(tag) - 32768.0;
    }
    EXIF_LIGHT_SOURCE_CCT
        .iter()
        .find(|(code, _)| *code == tag)
        .map_or(5500.0, |(_, cct)| *cct)
}

/// Signed distance of `uv` from a Robertson isotemperature line.
pub fn robertson_length(uv: &[f64; 2], uvt: &[f64; 3]) -> f64 {
    let t = uvt[2];
    let sign = if t < 0.0 {
        -1.0
    } else if t > 0.0 {
        1.0
    } else {
        0.0
    };
    let slope = [-sign / (1.0 + t * t).sqrt(), t * (-sign / (1.0 + t * t).sqrt())];
    let d = [uv[0] - uvt[0], uv[1] - uvt[1]];
    slope[0] * d[1] - slope[1] * d[0]
}

/// Correlated colour temperature of an XYZ colour (Robertson's method),
/// clamped to 2000–50000 K.
pub fn xyz_to_color_temperature(xyz: &[f64; 3]) -> f64 {
    let uv = xyz_to_uv(xyz);
    let n = ROBERTSON_UVT.len();

    let mut distance_this = 0.0;
    let mut distance_prev = 0.0;
    let mut i = 0;
    while i < n {
        distance_this = robertson_length(&uv, &ROBERTSON_UVT[i]);
        if distance_this <= 0.0 {
            break;
        }
        distance_prev = distance_this;
        i += 1;
    }

    let mired = if i == 0 {
        ROBERTSON_MIRED[0]
    } else if i >= n {
        ROBERTSON_MIRED[n - 1]
    } else {
        ROBERTSON_MIRED[i - 1]
            + distance_prev * (ROBERTSON_MIRED[i] - ROBERTSON_MIRED[i - 1])
                / (distance_prev - distance_this)
    };

    mired_to_cct(mired).clamp(2000.0, 50000.0)
}

/// XYZ (unnormalised) of the Planckian locus point at `cct`.
pub fn color_temperature_to_xyz(cct: f64) -> [f64; 3] {
    let mired = cct_to_mired(cct);
    let n = ROBERTSON_UVT.len();
    let i = ROBERTSON_MIRED
        .iter()
        .position(|&m| m >= mired)
        .unwrap_or(n);

    let uv = if i == 0 {
        [ROBERTSON_UVT[0][0], ROBERTSON_UVT[0][1]]
    } else if i >= n {
        [ROBERTSON_UVT[n - 1][0], ROBERTSON_UVT[n - 1][1]]
    } else {
        let weight = (mired - ROBERTSON_MIRED[i - 1]) / (ROBERTSON_MIRED[i] - ROBERTSON_MIRED[i - 1]);
        [
            ROBERTSON_UVT[i][0] * weight + ROBERTSON_UVT[i - 1][0] * (1.0 - weight),
            ROBERTSON_UVT[i][1] * weight + ROBERTSON_UVT[i - 1][1] * (1.0 - weight),
        ]
    };
    uv_to_xyz(&uv)
}

/// Interpolate between two calibration matrices by mired.
pub fn xyz_to_camera_weighted_matrix(
    mired_target: f64,
    mired_start: f64,
    mired_end: f64,
    matrix_start: &[f64; 9],
    matrix_end: &[f64; 9],
) -> [f64; 9] {
    let weight = ((mired_start - mired_target) / (mired_start - mired_end)).clamp(0.0, 1.0);
    let weight = if weight.is_nan() { 0.0 } else { weight };
    let mut out = [0.0; 9];
    for k in 0..9 {
        out[k] = matrix_start[k] + (matrix_end[k] - matrix_start[k]) * weight;
    }
    out
}

/// XYZ→camera matrix matching `neutral_rgb`, searched along the mired range
/// spanned by the two calibrations.
pub fn find_xyz_to_camera_matrix(metadata: &Metadata, neutral_rgb: Option<&[f64; 3]>) -> [f64; 9] {
    if metadata.calibration[0].illuminant == 0 {
        warn!("No calibration illuminants were found.");
        return metadata.calibration[0].xyz_to_rgb;
    }
    let Some(neutral) = neutral_rgb else {
        warn!("No neutral RGB values were found.");
        return metadata.calibration[0].xyz_to_rgb;
    };

    let mir1 = cct_to_mired(light_source_to_color_temp(metadata.calibration[0].illuminant));
    let mir2 = cct_to_mired(light_source_to_color_temp(metadata.calibration[1].illuminant));

    let max_mired = cct_to_mired(2000.0);
    let min_mired = cct_to_mired(50000.0);

    let matrix_start = &metadata.calibration[0].xyz_to_rgb;
    let matrix_end = &metadata.calibration[1].xyz_to_rgb;

    let low_mired = mir1.min(mir2).clamp(min_mired, max_mired);
    let high_mired = mir1.max(mir2).clamp(min_mired, max_mired);
    let mired_step = ((high_mired - low_mired) / 50.0).max(5.0);

    let mut last_mired = 0.0;
    let mut estimated_mired = 0.0;
    let mut last_error = 0.0;
    let mut smallest_error: f64 = 0.0;

    let mut current_mired = low_mired;
    while current_mired < high_mired {
        let weighted =
            xyz_to_camera_weighted_matrix(current_mired, mir1, mir2, matrix_start, matrix_end);
        let camera_to_xyz = invert(&from_flat(&weighted)).unwrap_or([[0.0; 3]; 3]);
        let cct = xyz_to_color_temperature(&mat_vec(&camera_to_xyz, neutral));
        let current_error = current_mired - cct_to_mired(cct);

        if current_error.abs() <= 1e-9 {
            estimated_mired = current_mired;
            break;
        }
        if (current_mired - low_mired).abs() > 1e-9 && current_error * last_error <= 0.0 {
            estimated_mired = current_mired
                + current_error / (current_error - last_error) * (current_mired - last_mired);
            break;
        }
        if (current_mired - low_mired).abs() <= 1e-9 || current_error.abs() < smallest_error.abs()
        {
            estimated_mired = current_mired;
            smallest_error = current_error;
        }

        last_error = current_error;
        last_mired = current_mired;
        current_mired += mired_step;
    }

    xyz_to_camera_weighted_matrix(estimated_mired, mir1, mir2, matrix_start, matrix_end)
}

/// Camera→XYZ matrix (with baseline exposure applied) and the camera white
/// point in XYZ normalised to Y = 1.
pub fn camera_xyz_matrix_and_white_point(metadata: &Metadata) -> Result<(Matrix3, [f64; 3])> {
    let xyz_to_camera = find_xyz_to_camera_matrix(metadata, metadata.neutral_rgb.as_ref());
    let camera_to_xyz = invert(&from_flat(&xyz_to_camera)).ok_or_else(|| {
        RawToAcesError::Solver("the XYZ to camera matrix is not invertible".to_string())
    })?;
    let camera_to_xyz = scale(&camera_to_xyz, 2f64.powf(metadata.baseline_exposure));

    let mut white = match &metadata.neutral_rgb {
        Some(neutral) => mat_vec(&camera_to_xyz, neutral),
        None => color_temperature_to_xyz(light_source_to_color_temp(
            metadata.calibration[0].illuminant,
        )),
    };

    let y = white[1];
    if y == 0.0 || !y.is_finite() {
        return Err(RawToAcesError::Solver(
            "the camera white point has no luminance".to_string(),
        ));
    }
    for v in white.iter_mut() {
        *v /= y;
    }
    Ok((camera_to_xyz, white))
}

#[derive(Debug, Clone)]
pub struct MetadataSolver {
    metadata: Metadata,
}

impl MetadataSolver {
    pub fn new(metadata: Metadata) -> Self {
        Self { metadata }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Adaptation from the camera white point to the ACES white point.
    pub fn calculate_cat_matrix(&self) -> Result<Matrix3> {
        let (_, camera_white) = camera_xyz_matrix_and_white_point(&self.metadata)?;
        let aces_white = mat_vec(&aces_to_xyz(), &[1.0, 1.0, 1.0]);
        Ok(chromatic_adaptation(&camera_white, &aces_white))
    }

    /// XYZ(D65)→ACES combined with the camera white adaptation.
    pub fn calculate_idt_matrix(&self) -> Result<Matrix3> {
        let cat = self.calculate_cat_matrix()?;
        let idt = mat_mul(&xyz_d65_to_aces(), &cat);
        if sum(&idt).abs() <= 1e-9 {
            return Err(RawToAcesError::Solver("degenerate DNG IDT matrix".to_string()));
        }
        Ok(idt)
    }
}
