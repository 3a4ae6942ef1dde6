//! Command-line interface definitions for dupewalk.
//!
//! # Example
//!
//! ```bash
//! # Group files by name and size (fast)
//! dupewalk ~/Downloads
//!
//! # Group by content, only PDFs over 1 MB, as JSON
//! dupewalk ~/Downloads --strategy content --ext pdf --min-size 1MB --output json
//!
//! # Also walk node_modules and friends, but never `target`
//! dupewalk ~/src --no-default-skip --skip target -v
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::scanner::{DigestAlgorithm, Strategy};

/// Concurrent directory walker that groups files by fingerprint.
///
/// Files sharing a fingerprint are reported together; with the content
/// strategy these groups are duplicate files.
#[derive(Debug, Parser)]
#[command(name = "dupewalk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to walk
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Increase verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Number of concurrent walk tasks (default: twice the CPU count)
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Directory name to prune (can be specified multiple times)
    #[arg(long = "skip", value_name = "NAME")]
    pub skip_dirs: Vec<String>,

    /// Walk into the built-in skip list (node_modules, venv, ...)
    #[arg(long)]
    pub no_default_skip: bool,

    /// Fingerprint strategy
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Digest used by the content strategy
    #[arg(long, value_enum)]
    pub digest: Option<DigestAlgorithm>,

    /// Only report files larger than this (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Only report files with this extension (can be specified multiple times)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Include groups with a single file in the report
    #[arg(long)]
    pub all: bool,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Configuration file (default: platform config dir)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Show a progress spinner on stderr
    #[arg(long)]
    pub progress: bool,
}

/// Output format for walk results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable groups with sizes
    #[default]
    Text,
    /// JSON document for scripting
    Json,
    /// One path per line
    Paths,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Paths => write!(f, "paths"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use dupewalk::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
