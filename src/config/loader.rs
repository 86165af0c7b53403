// src/config/loader.rs

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawConfigFile, RawSettings, Settings};
use crate::errors::{RawToAcesError, Result};
use crate::fs::FileSystem;

/// Environment variable naming a settings file when `--config` is absent.
pub const CONFIG_ENV_VAR: &str = "RAWTOACES_CONFIG";

/// Read and deserialize a settings file. No validation happens here; see
/// [`resolve_settings`].
pub fn load_from_path(fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs
        .read_to_string(path)
        .map_err(|e| RawToAcesError::ConfigError(format!("{e:#}")))?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// The settings file to use: the explicit path, else `RAWTOACES_CONFIG`.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(CONFIG_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

/// Merge command-line values over the optional settings file, then validate.
pub fn resolve_settings(
    fs: &dyn FileSystem,
    cli: RawSettings,
    config_file: Option<&Path>,
) -> Result<Settings> {
    let file = match config_file {
        Some(path) => {
            debug!(path = %path.display(), "loading settings file");
            load_from_path(fs, path)?.settings
        }
        None => RawSettings::default(),
    };
    Settings::try_from(cli.or(file))
}
