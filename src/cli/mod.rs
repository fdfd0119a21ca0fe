//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{DockerfileImagesCommand, RunCommand};
use std::convert::Infallible;
use std::ffi::OsString;

/// Prefetches the container images of a pipeline's stages
///
/// Without a subcommand the stages and credentials injected by the CI
/// server are read from the environment and prefetched.
#[derive(Debug, Parser, Clone)]
#[command(name = "prefetch")]
#[command(version)]
#[command(about = "Prefetches the container images of a pipeline's stages", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunCommand,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format: plaintext, console or json
    #[arg(
        long,
        global = true,
        env = "ESTAFETTE_LOG_FORMAT",
        default_value = "plaintext",
        value_parser = parse_log_format
    )]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List the non-official base images of a Dockerfile
    DockerfileImages(DockerfileImagesCommand),
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, no colors
    Plaintext,
    /// Human-readable with colors
    Console,
    /// One JSON object per line
    Json,
}

impl From<&str> for LogFormat {
    /// Formats this binary can't produce, such as `stackdriver`, fall back to plaintext
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "console" => LogFormat::Console,
            "json" => LogFormat::Json,
            _ => LogFormat::Plaintext,
        }
    }
}

fn parse_log_format(value: &str) -> Result<LogFormat, Infallible> {
    Ok(LogFormat::from(value))
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
