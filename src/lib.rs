// src/lib.rs

pub mod cli;
pub mod colour;
pub mod config;
pub mod convert;
pub mod docs;
pub mod errors;
pub mod fs;
pub mod image;
pub mod logging;
pub mod types;

use std::io::Write;

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info};

use crate::cli::CliArgs;
use crate::config::{config_path, resolve_settings};
use crate::convert::{ImageConverter, collect_image_files};
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings resolution (command line over settings file over defaults)
/// - the camera / illuminant listings
/// - input collection and the per-file conversion
pub fn run(args: CliArgs) -> Result<()> {
    let fs = RealFileSystem;
    let settings_file = config_path(args.config.as_deref());
    let settings = resolve_settings(&fs, args.to_raw_settings(), settings_file.as_deref())
        .context("invalid settings")?;
    debug!(?settings, "resolved settings");

    let mut converter = ImageConverter::new(settings);

    if args.list_cameras {
        let cameras = converter.supported_cameras();
        print_listing(
            "Spectral sensitivity data is available for the following cameras:",
            &cameras,
        )?;
        return Ok(());
    }

    if args.list_illuminants {
        let illuminants = converter.supported_illuminants();
        print_listing("The following illuminants are supported:", &illuminants)?;
        return Ok(());
    }

    converter.check_illuminant()?;

    let batches = collect_image_files(&fs, &args.paths);
    let total: usize = batches.iter().map(Vec::len).sum();
    if total == 0 {
        bail!("no input images; pass one or more RAW files or directories");
    }
    info!(files = total, batches = batches.len(), "converting");

    let mut failed = 0usize;
    for file in batches.iter().flatten() {
        match converter.process_image(file) {
            Ok(output) => info!("wrote {}", output.display()),
            Err(e) => {
                error!("failed to convert {}: {e}", file.display());
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {total} file(s) failed to convert");
    }
    Ok(())
}

fn print_listing(header: &str, entries: &[String]) -> Result<()> {
    let mut out = std::io::stdout().lock();
    writeln!(out)?;
    writeln!(out, "{header}")?;
    writeln!(out, "{}", entries.join("\n"))?;
    Ok(())
}
