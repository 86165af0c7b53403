use std::io::Write;
use std::sync::{Arc, Mutex};

use clap::Parser;
use rawtoaces::cli::{CliArgs, LogLevel};
use rawtoaces::convert::UsageTimer;
use rawtoaces::logging::{build_filter, parse_level_str, resolve_level};
use rawtoaces::types::{CropMode, MatrixMethod, WbMethod};
use tracing::Level;
use tracing_subscriber::prelude::*;

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_parse_full_command_line() {
    let args = CliArgs::try_parse_from([
        "rawtoaces",
        "--wb-method",
        "box",
        "--wb-box",
        "10",
        "20",
        "300",
        "200",
        "--mat-method",
        "Adobe",
        "--crop-mode",
        "hard",
        "--black-level",
        "-1",
        "--overwrite",
        "-vv",
        "a.cr2",
        "shots",
    ])
    .unwrap();

    assert_eq!(args.paths.len(), 2);
    assert_eq!(args.wb_method, Some(WbMethod::Box));
    assert_eq!(args.wb_box, Some(vec![10, 20, 300, 200]));
    assert_eq!(args.mat_method, Some(MatrixMethod::Adobe));
    assert_eq!(args.crop_mode, Some(CropMode::Hard));
    assert_eq!(args.black_level, Some(-1));
    assert_eq!(args.verbose, 2);

    let raw = args.to_raw_settings();
    assert_eq!(raw.overwrite, Some(true));
    assert_eq!(raw.create_dirs, None);
    assert_eq!(raw.verbosity, Some(2));
}

#[test]
fn test_custom_matrix_takes_nine_values() {
    let args = CliArgs::try_parse_from([
        "rawtoaces",
        "--custom-mat",
        "1",
        "0",
        "0",
        "0",
        "1",
        "0",
        "0",
        "0",
        "-1",
    ])
    .unwrap();
    assert_eq!(args.custom_mat.unwrap()[8], -1.0);

    assert!(CliArgs::try_parse_from(["rawtoaces", "--custom-wb", "1", "2"]).is_err());
}

#[test]
fn test_unknown_method_is_rejected() {
    let err = CliArgs::try_parse_from(["rawtoaces", "--wb-method", "grey"]).unwrap_err();
    assert!(err.to_string().contains("Unsupported white balancing method"));
}

#[test]
fn test_switches_left_out_stay_unset() {
    let raw = CliArgs::try_parse_from(["rawtoaces"]).unwrap().to_raw_settings();
    assert_eq!(raw.overwrite, None);
    assert_eq!(raw.half_size, None);
    assert_eq!(raw.verbosity, None);
    assert_eq!(raw.headroom, None);
}

#[test]
fn test_log_level_priority() {
    assert_eq!(resolve_level(Some(LogLevel::Error), Some(Level::DEBUG), 3), Level::ERROR);
    assert_eq!(resolve_level(None, Some(Level::DEBUG), 0), Level::DEBUG);
    assert_eq!(resolve_level(None, None, 0), Level::WARN);
    assert_eq!(resolve_level(None, None, 1), Level::INFO);
    assert_eq!(resolve_level(None, None, 2), Level::DEBUG);
    assert_eq!(resolve_level(None, None, 7), Level::TRACE);
}

#[test]
fn test_parse_level_strings() {
    assert_eq!(parse_level_str(" Warning "), Some(Level::WARN));
    assert_eq!(parse_level_str("TRACE"), Some(Level::TRACE));
    assert_eq!(parse_level_str("loud"), None);
}

#[test]
fn test_timing_lines_pass_the_default_filter() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::registry().with(build_filter(Level::WARN)).with(
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(move || writer.clone()),
    );

    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("Loading image");
        let mut timer = UsageTimer::new(true);
        timer.reset();
        timer.print("a.cr2", "reading image");
        UsageTimer::new(false).print("b.cr2", "reading image");
    });

    let text = captured.text();
    assert!(text.contains("Timing: a.cr2/reading image: "), "{text}");
    assert!(text.contains("rawtoaces::timing"), "{text}");
    assert!(!text.contains("b.cr2"), "{text}");
    assert!(!text.contains("Loading image"), "{text}");
}
