// src/colour/illuminant.rs

//! Synthetic illuminants: CIE daylight and Planckian black-body spectra.

use std::sync::OnceLock;

use regex::Regex;

use crate::colour::constants::{BOLTZMANN, DAYLIGHT_COMPONENTS, LIGHT_SPEED, PLANCK};
use crate::colour::spectral_data::SpectralData;
use crate::colour::spectrum::{REFERENCE_SHAPE, Spectrum};
use crate::errors::{RawToAcesError, Result};

/// How an illuminant name should be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IlluminantName {
    /// `D<cct>`, e.g. `D55` (shorthand, hundreds of kelvin) or `D6500`.
    Daylight(u32),
    /// `<cct>K`, e.g. `3200K`.
    Blackbody(u32),
    /// Anything else; matched against the `type` of data-base illuminants.
    Named(String),
}

fn daylight_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[dD](\d+)$").ok()).as_ref()
}

fn blackbody_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)[kK]$").ok()).as_ref()
}

fn leading_number(re: Option<&Regex>, name: &str) -> Option<u32> {
    re?.captures(name)?.get(1)?.as_str().parse().ok()
}

impl IlluminantName {
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if let Some(cct) = leading_number(daylight_pattern(), name) {
            return IlluminantName::Daylight(cct);
        }
        if let Some(cct) = leading_number(blackbody_pattern(), name) {
            return IlluminantName::Blackbody(cct);
        }
        IlluminantName::Named(name.to_string())
    }

    /// Canonical lower-case type string, e.g. `d55` or `3200k`.
    pub fn type_name(&self) -> String {
        match self {
            IlluminantName::Daylight(cct) => format!("d{cct}"),
            IlluminantName::Blackbody(cct) => format!("{cct}k"),
            IlluminantName::Named(name) => name.clone(),
        }
    }
}

/// Chromaticity of the CIE daylight locus at `cct` kelvin.
pub fn cct_to_xy(cct: f64) -> [f64; 2] {
    let x = if (4002.15..=7003.77).contains(&cct) {
        0.244063 + 99.11 / cct + 2.9678e6 / cct.powi(2) - 4.6070e9 / cct.powi(3)
    } else {
        0.237040 + 247.48 / cct + 1.9018e6 / cct.powi(2) - 2.0064e9 / cct.powi(3)
    };
    let y = -3.0 * x.powi(2) + 2.87 * x - 0.275;
    [x, y]
}

/// Linear interpolation of `(xs, ys)` at `x`; clamps outside the range.
fn interpolate(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    match xs.iter().position(|&v| v >= x) {
        Some(0) => ys[0],
        Some(i) => {
            let t = (x - xs[i - 1]) / (xs[i] - xs[i - 1]);
            ys[i - 1] + t * (ys[i] - ys[i - 1])
        }
        None => ys[ys.len() - 1],
    }
}

/// CIE daylight spectrum sampled on the reference shape.
///
/// `cct` is either in kelvin (4000–25000) or in hundreds of kelvin (40–250),
/// the latter corrected for the revised second radiation constant.
pub fn daylight_spd(cct: u32) -> Result<Spectrum> {
    let cct = match cct {
        40..=250 => f64::from(cct) * 100.0 * 1.438_775_2 / 1.438,
        4000..=25000 => f64::from(cct),
        _ => {
            return Err(RawToAcesError::SpectralData(
                "The range of Correlated Color Temperature for Day Light should be from 4000 to 25000."
                    .to_string(),
            ));
        }
    };

    let [x, y] = cct_to_xy(cct);
    let m0 = 0.0241 + 0.2562 * x - 0.7341 * y;
    let m1 = (-1.3515 - 1.7703 * x + 5.9114 * y) / m0;
    let m2 = (0.03 - 31.4424 * x + 30.0717 * y) / m0;

    let wavelengths: Vec<f64> = DAYLIGHT_COMPONENTS
        .iter()
        .map(|c| f64::from(c.wavelength))
        .collect();
    let s0: Vec<f64> = DAYLIGHT_COMPONENTS.iter().map(|c| c.s0).collect();
    let s1: Vec<f64> = DAYLIGHT_COMPONENTS.iter().map(|c| c.s1).collect();
    let s2: Vec<f64> = DAYLIGHT_COMPONENTS.iter().map(|c| c.s2).collect();

    let values = reference_wavelengths()
        .map(|wl| {
            interpolate(&wavelengths, &s0, wl)
                + m1 * interpolate(&wavelengths, &s1, wl)
                + m2 * interpolate(&wavelengths, &s2, wl)
        })
        .collect();

    Ok(Spectrum::from_values(REFERENCE_SHAPE, values))
}

/// Planckian radiator spectrum sampled on the reference shape, valid for
/// 1500 ≤ `cct` < 4000 kelvin.
pub fn blackbody_spd(cct: u32) -> Result<Spectrum> {
    if !(1500..4000).contains(&cct) {
        return Err(RawToAcesError::SpectralData(
            "The range of Color Temperature for BlackBody should be from 1500 to 3999.".to_string(),
        ));
    }
    let cct = f64::from(cct);
    let c1 = 2.0 * PLANCK * LIGHT_SPEED.powi(2);

    let values = reference_wavelengths()
        .map(|wl| {
            let lambda = wl / 1e9;
            let c2 = (PLANCK * LIGHT_SPEED) / (BOLTZMANN * lambda * cct);
            c1 * std::f64::consts::PI / (lambda.powi(5) * (c2.exp() - 1.0))
        })
        .collect();

    Ok(Spectrum::from_values(REFERENCE_SHAPE, values))
}

fn reference_wavelengths() -> impl Iterator<Item = f64> {
    let first = f64::from(REFERENCE_SHAPE.first);
    let step = f64::from(REFERENCE_SHAPE.step);
    (0..REFERENCE_SHAPE.sample_count()).map(move |i| first + step * i as f64)
}

/// Build an illuminant with a single `main/power` channel.
pub fn generate_illuminant(cct: u32, type_name: &str, is_daylight: bool) -> Result<SpectralData> {
    let power = if is_daylight {
        daylight_spd(cct)?
    } else {
        blackbody_spd(cct)?
    };

    let mut illuminant = SpectralData {
        r#type: type_name.to_string(),
        ..SpectralData::default()
    };
    illuminant
        .data
        .insert("main".to_string(), vec![("power".to_string(), power)]);
    Ok(illuminant)
}
