// src/image/mod.rs

//! Image side of the pipeline: raw decoding, development and EXR output.

pub mod buffer;
pub mod develop;
pub mod dng;
pub mod exr_writer;
pub mod raw;

pub use buffer::ImageBuf;
pub use develop::{DecodeOptions, OutputColour, develop};
pub use dng::{DngMetadata, read_dng_metadata};
pub use exr_writer::{ExrMetadata, write_aces_exr};
pub use raw::{CfaPattern, RawDecoder, RawImage, RawMetadata, RawloaderDecoder, SensorData, fix_metadata};
