// src/colour/spectral_data.rs

//! Spectral data files: camera sensitivities, illuminants, observers and
//! training reflectances, all sharing one JSON layout.
//!
//! ```json
//! {
//!   "header": { "manufacturer": "...", "model": "...", "type": "..." },
//!   "spectral_data": {
//!     "units": "relative",
//!     "index": { "main": ["R", "G", "B"] },
//!     "data": { "main": { "380": [0.1, 0.2, 0.3], "385": [ ... ] } }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::colour::spectrum::{EMPTY_SHAPE, Shape, Spectrum};
use crate::errors::{RawToAcesError, Result};
use crate::fs::{FileSystem, RealFileSystem};

/// A named channel of a set, e.g. `("R", spectrum)`.
pub type SpectralChannel = (String, Spectrum);

/// Channels of one set, in index order.
pub type SpectralSet = Vec<SpectralChannel>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralData {
    pub manufacturer: String,
    pub model: String,
    /// Illuminant name for illuminant files, e.g. `d55` or `iso7589`.
    pub r#type: String,
    pub description: String,
    pub document_creator: String,
    pub unique_identifier: String,
    pub measurement_equipment: String,
    pub laboratory: String,
    pub creation_date: String,
    pub comments: String,
    pub license: String,

    pub units: String,
    pub reflection_geometry: String,
    pub transmission_geometry: String,
    pub bandwidth_fwhm: String,
    pub bandwidth_corrected: String,

    pub data: BTreeMap<String, SpectralSet>,
}

fn string_field(object: &Value, key: &str) -> String {
    match object.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

impl SpectralData {
    /// Read a file into a fresh object.
    pub fn from_file(path: impl AsRef<Path>, reshape: bool) -> Result<Self> {
        Self::from_fs(&RealFileSystem, path, reshape)
    }

    /// Read a file through `fs` into a fresh object.
    pub fn from_fs(fs: &dyn FileSystem, path: impl AsRef<Path>, reshape: bool) -> Result<Self> {
        let mut data = Self::default();
        data.load_from(fs, path, reshape)?;
        Ok(data)
    }

    /// Reset this object and load `path` into it. With `reshape` every
    /// channel is resampled to the reference shape.
    pub fn load_from(&mut self, fs: &dyn FileSystem, path: impl AsRef<Path>, reshape: bool) -> Result<()> {
        let path = path.as_ref();
        *self = Self::default();

        let text = fs.read_to_string(path).map_err(|e| {
            RawToAcesError::SpectralData(format!("Failed to open file {}: {e:#}", path.display()))
        })?;
        let root: Value = serde_json::from_str(&text).map_err(|e| {
            RawToAcesError::SpectralData(format!(
                "JSON parsing of {} failed with error: {e}",
                path.display()
            ))
        })?;

        self.parse(&root)
            .map_err(|e| RawToAcesError::SpectralData(format!("{}: {e}", path.display())))?;

        if reshape {
            for set in self.data.values_mut() {
                for (_, spectrum) in set.iter_mut() {
                    spectrum.reshape();
                }
            }
        }

        debug!(path = %path.display(), sets = self.data.len(), "loaded spectral data");
        Ok(())
    }

    fn parse(&mut self, root: &Value) -> std::result::Result<(), String> {
        let null = Value::Null;
        let header = root.get("header").unwrap_or(&null);
        self.manufacturer = string_field(header, "manufacturer");
        self.model = string_field(header, "model");
        self.r#type = string_field(header, "type");
        self.description = string_field(header, "description");
        self.document_creator = string_field(header, "document_creator");
        self.unique_identifier = string_field(header, "unique_identifier");
        self.measurement_equipment = string_field(header, "measurement_equipment");
        self.laboratory = string_field(header, "laboratory");
        self.creation_date = string_field(header, "document_creation_date");
        self.comments = string_field(header, "comments");
        self.license = string_field(header, "license");

        if self.r#type.is_empty() && string_field(header, "schema_version") == "0.1.0" {
            self.r#type = string_field(header, "illuminant");
        }

        let spectral = root.get("spectral_data").unwrap_or(&null);
        self.units = string_field(spectral, "units");
        self.reflection_geometry = string_field(spectral, "reflection_geometry");
        self.transmission_geometry = string_field(spectral, "transmission_geometry");
        self.bandwidth_fwhm = string_field(spectral, "bandwidth_FWHM");
        self.bandwidth_corrected = string_field(spectral, "bandwidth_corrected");

        if let Some(Value::Object(index)) = spectral.get("index") {
            for (set_name, channels) in index {
                let names = channels
                    .as_array()
                    .ok_or_else(|| format!("index entry '{set_name}' is not an array"))?;
                let set = names
                    .iter()
                    .map(|n| {
                        let name = n.as_str().map(str::to_string).unwrap_or_else(|| n.to_string());
                        (name, Spectrum::new(0.0, EMPTY_SHAPE))
                    })
                    .collect();
                self.data.insert(set_name.clone(), set);
            }
        }

        let mut shape = Shape::default();
        let mut prev_wavelength: Option<f32> = None;

        if let Some(Value::Object(sets)) = spectral.get("data") {
            for (set_name, bins) in sets {
                let bins = bins
                    .as_object()
                    .ok_or_else(|| format!("data entry '{set_name}' is not an object"))?;

                let mut sorted = Vec::with_capacity(bins.len());
                for (wavelength, values) in bins {
                    let wl: f32 = wavelength
                        .trim()
                        .parse()
                        .map_err(|_| format!("invalid wavelength '{wavelength}'"))?;
                    sorted.push((wl, values));
                }
                sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

                let set = self.data.entry(set_name.clone()).or_default();
                for (wl, values) in sorted {
                    match prev_wavelength {
                        Some(prev) => {
                            let new_step = wl - prev;
                            if shape.step != 0.0 && new_step != shape.step {
                                return Err(format!(
                                    "Inconsistent wavelength step. Expected: {}, got: {}.",
                                    shape.step, new_step
                                ));
                            }
                            shape.step = new_step;
                        }
                        None => shape.first = wl,
                    }
                    prev_wavelength = Some(wl);

                    let values = values
                        .as_array()
                        .ok_or_else(|| format!("values at wavelength {wl} are not an array"))?;
                    for (j, (_, spectrum)) in set.iter_mut().enumerate() {
                        let v = values
                            .get(j)
                            .and_then(Value::as_f64)
                            .ok_or_else(|| format!("missing value {j} at wavelength {wl}"))?;
                        spectrum.values.push(v);
                    }
                }
            }
        }

        shape.last = prev_wavelength.unwrap_or(0.0);
        for set in self.data.values_mut() {
            for (_, spectrum) in set.iter_mut() {
                spectrum.shape = shape;
            }
        }
        Ok(())
    }

    /// Channel `channel_name` of set `set_name`.
    pub fn get(&self, set_name: &str, channel_name: &str) -> Result<&Spectrum> {
        let set = self.data.get(set_name).ok_or_else(|| {
            RawToAcesError::SpectralData(format!(
                "The requested data set '{set_name}' not found in spectral data."
            ))
        })?;
        set.iter()
            .find(|(name, _)| name == channel_name)
            .map(|(_, s)| s)
            .ok_or_else(|| {
                RawToAcesError::SpectralData(format!(
                    "The requested channel '{channel_name}' not found in the data set '{set_name}' of spectral data."
                ))
            })
    }

    pub fn get_mut(&mut self, set_name: &str, channel_name: &str) -> Result<&mut Spectrum> {
        let set = self.data.get_mut(set_name).ok_or_else(|| {
            RawToAcesError::SpectralData(format!(
                "The requested data set '{set_name}' not found in spectral data."
            ))
        })?;
        set.iter_mut()
            .find(|(name, _)| name == channel_name)
            .map(|(_, s)| s)
            .ok_or_else(|| {
                RawToAcesError::SpectralData(format!(
                    "The requested channel '{channel_name}' not found in the data set '{set_name}' of spectral data."
                ))
            })
    }

    /// Channel of the `main` set.
    pub fn channel(&self, name: &str) -> Result<&Spectrum> {
        self.get("main", name)
    }

    pub fn channel_mut(&mut self, name: &str) -> Result<&mut Spectrum> {
        self.get_mut("main", name)
    }

    /// Number of channels in the `main` set, zero when absent.
    pub fn main_channel_count(&self) -> usize {
        self.data.get("main").map_or(0, Vec::len)
    }
}
