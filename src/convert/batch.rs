// src/convert/batch.rs

//! Input discovery: turning command-line paths into batches of raw files,
//! and locating the spectral data base.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::fs::FileSystem;

/// File names never treated as raw input.
const IGNORED_FILE_PATTERNS: &[&str] = &[".DS_Store", "*.exr", "*.jpg", "*.jpeg"];

#[cfg(windows)]
const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
const PATH_SEPARATOR: char = ':';

#[cfg(windows)]
const DEFAULT_DATA_PATH: &str = ".";
#[cfg(not(windows))]
const DEFAULT_DATA_PATH: &str = "/usr/local/share/rawtoaces/data:/usr/local/include/rawtoaces/data";

fn ignored_files() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in IGNORED_FILE_PATTERNS {
        if let Ok(glob) = GlobBuilder::new(pattern).case_insensitive(true).build() {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
}

fn check_and_add_file(fs: &dyn FileSystem, ignored: &GlobSet, path: &Path, batch: &mut Vec<PathBuf>) {
    if !fs.is_file(path) {
        warn!("Not a regular file: {}", path.display());
        return;
    }
    let Some(name) = path.file_name() else {
        return;
    };
    if ignored.is_match(Path::new(name)) {
        debug!(path = %path.display(), "skipping ignored file");
        return;
    }
    batch.push(path.to_path_buf());
}

/// Group the input paths into batches.
///
/// Batch 0 holds the paths given as files; every directory adds a batch of
/// its own with the files directly inside it, sorted by name. Missing paths
/// and non-files are reported and skipped.
pub fn collect_image_files(fs: &dyn FileSystem, paths: &[PathBuf]) -> Vec<Vec<PathBuf>> {
    let ignored = ignored_files();
    let mut batches: Vec<Vec<PathBuf>> = vec![Vec::new()];

    for path in paths {
        if !fs.exists(path) {
            warn!("File or directory not found: {}", path.display());
            continue;
        }

        if fs.is_dir(path) {
            let mut entries = match fs.read_dir(path) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!("Failed to read directory {}: {err:#}", path.display());
                    continue;
                }
            };
            entries.sort();

            let mut batch = Vec::new();
            for entry in &entries {
                check_and_add_file(fs, &ignored, entry, &mut batch);
            }
            batches.push(batch);
        } else {
            check_and_add_file(fs, &ignored, path, &mut batches[0]);
        }
    }

    batches
}

/// Data base search directories with an explicit environment lookup.
///
/// Priority: `override_path`, `RAWTOACES_DATA_PATH`, the deprecated
/// `AMPAS_DATA_PATH`, then the platform default. The chosen value is split
/// on the platform path separator; empty and repeated entries are dropped.
pub fn database_paths_with_env<F>(override_path: Option<&str>, env: F) -> Vec<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    let path = match override_path.filter(|p| !p.is_empty()) {
        Some(p) => p.to_string(),
        None => match env("RAWTOACES_DATA_PATH") {
            Some(p) => p,
            None => match env("AMPAS_DATA_PATH") {
                Some(p) => {
                    warn!(
                        "The environment variable AMPAS_DATA_PATH is now deprecated. Please use RAWTOACES_DATA_PATH instead."
                    );
                    p
                }
                None => DEFAULT_DATA_PATH.to_string(),
            },
        },
    };

    let mut result: Vec<PathBuf> = Vec::new();
    for part in path.split(PATH_SEPARATOR).filter(|p| !p.is_empty()) {
        let dir = PathBuf::from(part);
        if !result.contains(&dir) {
            result.push(dir);
        }
    }
    result
}

pub fn database_paths(override_path: Option<&str>) -> Vec<PathBuf> {
    database_paths_with_env(override_path, |name| std::env::var(name).ok())
}
