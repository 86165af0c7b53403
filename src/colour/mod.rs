// src/colour/mod.rs

//! Colour science: spectra, illuminants and the two IDT solvers.

pub mod constants;
pub mod illuminant;
pub mod math;
pub mod metadata_solver;
pub mod optimize;
pub mod spectral_data;
pub mod spectral_solver;
pub mod spectrum;

pub use metadata_solver::{Calibration, Metadata, MetadataSolver};
pub use spectral_data::SpectralData;
pub use spectral_solver::SpectralSolver;
pub use spectrum::{Shape, Spectrum};
