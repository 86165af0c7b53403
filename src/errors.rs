// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RawToAcesError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Spectral data error: {0}")]
    SpectralData(String),

    #[error("Failed to find {0}. Please check the database search path in RAWTOACES_DATA_PATH")]
    DataNotFound(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Output path error: {0}")]
    OutputPath(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<exr::error::Error> for RawToAcesError {
    fn from(err: exr::error::Error) -> Self {
        RawToAcesError::Image(format!("OpenEXR: {err}"))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RawToAcesError>;
