use crate::assembler::{generate, ScanConfig};
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};
use std::path::PathBuf;

/// API doc generator - Compile annotated source comments into API documents
#[derive(Parser, Debug)]
#[command(name = "apidoc-from-source")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Directory whose source files carry the API annotations
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Source directory of another crate whose types may be referenced, as NAME=DIR
    #[arg(short = 'e', long = "extern", value_name = "NAME=DIR", value_parser = parse_extern)]
    pub externs: Vec<(String, PathBuf)>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

impl CliArgs {
    /// Builds the scan configuration from the parsed arguments.
    pub fn to_config(&self) -> ScanConfig {
        self.externs
            .iter()
            .fold(ScanConfig::new(&self.project_path), |config, (name, dir)| {
                config.with_extern(name, dir)
            })
    }
}

fn parse_extern(value: &str) -> std::result::Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((name, dir)) if !name.trim().is_empty() && !dir.trim().is_empty() => {
            Ok((name.trim().to_string(), PathBuf::from(dir.trim())))
        }
        _ => Err(format!("expected NAME=DIR, got `{}`", value)),
    }
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    for (name, dir) in &args.externs {
        if !dir.is_dir() {
            anyhow::bail!("Extern crate `{}` is not a directory: {}", name, dir.display());
        }
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }
    for (name, dir) in &args.externs {
        info!("Extern crate: {} = {}", name, dir.display());
    }

    Ok(args)
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    info!("Starting API document generation...");

    let docs = generate(&args.to_config())
        .with_context(|| format!("Failed to generate documents for {}", args.project_path.display()))?;

    if docs.is_empty() {
        log::warn!("No annotated operations found in the project");
    }

    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&docs)?,
        OutputFormat::Json => serialize_json(&docs)?,
    };

    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote API documents to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    let mut catalogs: Vec<&str> = docs.iter().map(|doc| doc.catalog.as_str()).collect();
    catalogs.sort_unstable();
    catalogs.dedup();

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Documents: {}", docs.len());
    info!("  - Catalogs: {:?}", catalogs);

    Ok(())
}
