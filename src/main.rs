//! API doc generator - Command-line tool for compiling source comments into API documents.
//!
//! This binary walks a source tree, reads the `@` annotations in the doc comments of its
//! functions and methods, expands the types those annotations reference into parameter tables
//! and example JSON, and prints the resulting list of API documents.
//!
//! # Usage
//!
//! ```bash
//! apidoc-from-source [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate JSON documents for the handlers of a crate:
//! ```bash
//! apidoc-from-source ./my-api/src/handler -o apidoc.json
//! ```
//!
//! Generate YAML, resolving types from a sibling crate:
//! ```bash
//! apidoc-from-source ./my-api/src/handler -f yaml -e common=./common
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! apidoc-from-source ./my-api -v
//! ```

use anyhow::Result;
use apidoc_from_source::cli;
use clap::Parser;
use log::info;

fn main() -> Result<()> {
    let args_for_verbose = cli::CliArgs::parse();

    let log_level = if args_for_verbose.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    info!("API doc generator starting...");

    let args = cli::parse_args_from_parsed(args_for_verbose)?;

    cli::run(args)?;

    info!("API document generation completed successfully");

    Ok(())
}
