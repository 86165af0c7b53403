// src/bin/rawtoaces-docs.rs

use std::path::PathBuf;

use clap::Parser;
use rawtoaces::cli::LogLevel;
use rawtoaces::docs::{is_read_the_docs, load_docs_config, regenerate_xml};
use rawtoaces::fs::RealFileSystem;
use rawtoaces::logging;

/// Print the documentation build configuration and, on Read the Docs,
/// regenerate the Doxygen XML.
#[derive(Debug, Clone, Parser)]
#[command(name = "rawtoaces-docs", version, long_about = None)]
struct DocsArgs {
    /// TOML file overriding the built-in configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// The documentation directory; Doxygen runs from its parent.
    #[arg(long, value_name = "DIR", default_value = "docs")]
    docs_dir: PathBuf,

    /// Run Doxygen when `READTHEDOCS=True`.
    #[arg(long)]
    regenerate: bool,

    #[arg(long, value_enum, value_name = "LEVEL")]
    log_level: Option<LogLevel>,
}

fn main() {
    if let Err(err) = run_main() {
        eprintln!("rawtoaces-docs error: {err:?}");
        std::process::exit(1);
    }
}

fn run_main() -> anyhow::Result<()> {
    let args = DocsArgs::parse();
    logging::init_logging(args.log_level, 0)?;

    let read_the_docs = is_read_the_docs();
    if args.regenerate && read_the_docs {
        regenerate_xml(&args.docs_dir);
    }

    let config = load_docs_config(&RealFileSystem, args.config.as_deref(), read_the_docs)?;
    print!("{}", config.to_toml()?);
    Ok(())
}
