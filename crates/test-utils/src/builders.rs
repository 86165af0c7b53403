#![allow(dead_code)]

use rawtoaces::config::{RawSettings, Settings};
use rawtoaces::types::{CropMode, MatrixMethod, WbMethod};

/// Builder for `Settings`, going through the same validation as the CLI.
pub struct SettingsBuilder {
    raw: RawSettings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawSettings::default(),
        }
    }

    pub fn wb_method(mut self, method: WbMethod) -> Self {
        self.raw.wb_method = Some(method);
        self
    }

    pub fn mat_method(mut self, method: MatrixMethod) -> Self {
        self.raw.mat_method = Some(method);
        self
    }

    pub fn illuminant(mut self, name: &str) -> Self {
        self.raw.illuminant = Some(name.to_string());
        self
    }

    pub fn custom_wb(mut self, values: &[f64]) -> Self {
        self.raw.custom_wb = Some(values.to_vec());
        self
    }

    pub fn custom_mat(mut self, values: &[f64]) -> Self {
        self.raw.custom_mat = Some(values.to_vec());
        self
    }

    pub fn wb_box(mut self, values: &[i32]) -> Self {
        self.raw.wb_box = Some(values.to_vec());
        self
    }

    pub fn crop_box(mut self, values: &[i32]) -> Self {
        self.raw.crop_box = Some(values.to_vec());
        self
    }

    pub fn crop_mode(mut self, mode: CropMode) -> Self {
        self.raw.crop_mode = Some(mode);
        self
    }

    pub fn headroom(mut self, value: f64) -> Self {
        self.raw.headroom = Some(value);
        self
    }

    pub fn scale(mut self, value: f64) -> Self {
        self.raw.scale = Some(value);
        self
    }

    pub fn data_dir(mut self, dir: &str) -> Self {
        self.raw.data_dir = Some(dir.to_string());
        self
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.raw.output_dir = Some(dir.to_string());
        self
    }

    pub fn create_dirs(mut self, value: bool) -> Self {
        self.raw.create_dirs = Some(value);
        self
    }

    pub fn overwrite(mut self, value: bool) -> Self {
        self.raw.overwrite = Some(value);
        self
    }

    pub fn half_size(mut self, value: bool) -> Self {
        self.raw.half_size = Some(value);
        self
    }

    pub fn use_timing(mut self, value: bool) -> Self {
        self.raw.use_timing = Some(value);
        self
    }

    pub fn raw(self) -> RawSettings {
        self.raw
    }

    pub fn build(self) -> Settings {
        Settings::try_from(self.raw).expect("Failed to build valid settings from builder")
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
