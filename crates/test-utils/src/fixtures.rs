#![allow(dead_code)]

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tempfile::TempDir;

/// Wavelengths every fixture is sampled at.
pub fn wavelengths() -> impl Iterator<Item = u32> {
    (380..=780).step_by(5)
}

/// Asymmetric gaussian lobe.
fn lobe(wl: f64, mean: f64, sigma_low: f64, sigma_high: f64) -> f64 {
    let sigma = if wl < mean { sigma_low } else { sigma_high };
    (-0.5 * ((wl - mean) / sigma).powi(2)).exp()
}

/// Smooth stand-ins for the CIE 1931 colour matching functions.
pub fn observer_xyz(wl: f64) -> [f64; 3] {
    let x = 1.056 * lobe(wl, 599.8, 37.9, 31.0) + 0.362 * lobe(wl, 442.0, 16.0, 26.7)
        - 0.065 * lobe(wl, 501.1, 20.4, 26.2);
    let y = 0.821 * lobe(wl, 568.8, 46.9, 40.5) + 0.286 * lobe(wl, 530.9, 16.3, 31.1);
    let z = 1.217 * lobe(wl, 437.0, 11.8, 36.0) + 0.681 * lobe(wl, 459.0, 26.0, 13.8);
    [x.max(0.0), y, z]
}

/// Camera sensitivities peaking in the red, green and blue.
pub fn camera_rgb(wl: f64) -> [f64; 3] {
    [
        lobe(wl, 600.0, 35.0, 40.0),
        lobe(wl, 540.0, 40.0, 40.0),
        lobe(wl, 455.0, 30.0, 35.0),
    ]
}

/// A reflectance between 0.05 and 0.95.
pub fn patch_reflectance(index: usize, wl: f64) -> f64 {
    let phase = index as f64 * 0.7;
    let frequency = 0.5 + (index % 4) as f64 * 0.5;
    0.5 + 0.45 * (2.0 * PI * frequency * (wl - 380.0) / 400.0 + phase).sin()
}

fn spectral_file(header: Value, channels: &[&str], value: impl Fn(f64) -> Vec<f64>) -> Value {
    let mut data = Map::new();
    for wl in wavelengths() {
        data.insert(wl.to_string(), json!(value(f64::from(wl))));
    }
    json!({
        "header": header,
        "spectral_data": {
            "units": "relative",
            "index": { "main": channels },
            "data": { "main": data }
        }
    })
}

/// Throwaway spectral data base laid out as `<root>/<kind>/<file>.json`.
pub struct TestDatabase {
    dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// Camera, training data and observer; enough for the spectral method.
    pub fn with_camera(make: &str, model: &str) -> Self {
        let db = Self::new();
        db.add_camera(make, model);
        db.add_training_data();
        db.add_observer();
        db
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_string(&self) -> String {
        self.dir.path().display().to_string()
    }

    pub fn write(&self, kind: &str, file_name: &str, contents: &Value) -> PathBuf {
        let dir = self.dir.path().join(kind);
        fs::create_dir_all(&dir).expect("failed to create fixture directory");
        let path = dir.join(file_name);
        let text = serde_json::to_string_pretty(contents).expect("fixture serialises");
        fs::write(&path, text).expect("failed to write fixture");
        path
    }

    pub fn add_camera(&self, make: &str, model: &str) -> PathBuf {
        let contents = spectral_file(
            json!({ "manufacturer": make, "model": model, "schema_version": "1.0.0" }),
            &["R", "G", "B"],
            |wl| camera_rgb(wl).to_vec(),
        );
        let file_name = format!("{}_{}.json", make, model).replace(' ', "_");
        self.write("camera", &file_name, &contents)
    }

    /// Illuminant with a power rising linearly towards the red.
    pub fn add_illuminant(&self, type_name: &str) -> PathBuf {
        let contents = spectral_file(
            json!({ "type": type_name, "schema_version": "1.0.0" }),
            &["power"],
            |wl| vec![1.0 + (wl - 380.0) * 0.01],
        );
        self.write("illuminant", &format!("{type_name}.json"), &contents)
    }

    pub fn add_training_data(&self) -> PathBuf {
        let names: Vec<String> = (0..24).map(|i| format!("patch{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let contents = spectral_file(json!({ "schema_version": "1.0.0" }), &refs, |wl| {
            (0..names.len()).map(|i| patch_reflectance(i, wl)).collect()
        });
        self.write("training", "training_spectral.json", &contents)
    }

    pub fn add_observer(&self) -> PathBuf {
        let contents = spectral_file(
            json!({ "schema_version": "1.0.0" }),
            &["X", "Y", "Z"],
            |wl| observer_xyz(wl).to_vec(),
        );
        self.write("cmf", "cmf_1931.json", &contents)
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}
