// src/config/mod.rs

//! Conversion settings.
//!
//! - The TOML-backed model and the validated `Settings` (`model.rs`).
//! - Loading a settings file and layering the command line over it
//!   (`loader.rs`).
//! - Validation with mode/parameter consistency warnings (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_path, load_from_path, resolve_settings};
pub use model::{RawConfigFile, RawSettings, Settings};
pub use validate::{ParamCheck, check_param, validate_settings};
