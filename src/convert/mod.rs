// src/convert/mod.rs

//! Conversion driver: per-file pipeline, input batching and timing.

pub mod batch;
pub mod converter;
pub mod timer;

pub use batch::{collect_image_files, database_paths, database_paths_with_env};
pub use converter::ImageConverter;
pub use timer::UsageTimer;
