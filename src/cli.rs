/*!
Command-line arguments for the `metrix` binary.
*/

use std::path::PathBuf;

use clap::Parser;

use crate::config::{Format, Overrides};

/// A lightweight host telemetry agent that ships system metrics over OTLP.
#[derive(Debug, Parser)]
#[command(name = "metrix", about, version)]
pub struct Cli {
    /// Collection interval in seconds
    #[arg(short, long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: Option<u64>,

    /// OTLP endpoint URL
    #[arg(short, long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Add a header to every export request (can be repeated)
    #[arg(short = 'H', long = "header", value_name = "KEY=VALUE", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Path to the config file [default: ~/.config/metrix/config.json]
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Wire format for exported metrics
    #[arg(short, long, value_enum)]
    pub format: Option<Format>,

    /// Print metrics to stdout instead of exporting them
    #[arg(short, long)]
    pub dry_run: bool,

    /// Write a curl script reproducing every export request
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /**
    The values that override the configuration file.
    */
    pub fn overrides(&self) -> Overrides {
        Overrides {
            interval: self.interval,
            endpoint: self.endpoint.clone(),
            headers: self.headers.clone(),
            format: self.format,
        }
    }
}

/**
Parse a `key=value` header.

The value may itself contain `=`. The key must not be empty.
*/
fn parse_header(header: &str) -> Result<(String, String), String> {
    match header.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!(
            "invalid header format {header:?}, expected \"Key=Value\""
        )),
    }
}
