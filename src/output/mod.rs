//! Report formatters for walk results.
//!
//! This module provides the formats selectable with `--output`:
//! - [`text`]: groups with human-readable sizes and a summary line
//! - [`json`]: machine-readable document for scripting
//! - paths: one path per line
//!
//! All formats list groups sorted by fingerprint and files sorted by path,
//! so reports are stable even though walk order is not.
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::cli::OutputFormat;
//! use dupewalk::output::write_report;
//! use dupewalk::scanner::{Walker, WalkConfig};
//! use std::path::Path;
//!
//! let results = Walker::new(WalkConfig::default()).walk(Path::new("/data")).unwrap();
//! write_report(&results, OutputFormat::Text, false, &mut std::io::stdout()).unwrap();
//! ```

pub mod json;
pub mod text;

use std::io::Write;

use crate::cli::OutputFormat;
use crate::duplicates::ResultMap;
use crate::scanner::{File, Fingerprint};

pub use json::JsonOutput;
pub use text::TextOutput;

/// One group prepared for output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportGroup<'a> {
    /// Shared fingerprint
    pub fingerprint: &'a Fingerprint,
    /// Files sorted by path
    pub files: Vec<&'a File>,
}

/// Groups in report order.
///
/// Only duplicate groups are returned unless `include_unique` is set.
#[must_use]
pub fn report_groups(map: &ResultMap, include_unique: bool) -> Vec<ReportGroup<'_>> {
    let mut groups: Vec<_> = map
        .iter()
        .filter(|(_, files)| include_unique || files.len() > 1)
        .map(|(fingerprint, files)| {
            let mut files: Vec<&File> = files.iter().collect();
            files.sort_by(|a, b| a.path.cmp(&b.path));
            ReportGroup { fingerprint, files }
        })
        .collect();
    groups.sort_by(|a, b| a.fingerprint.cmp(b.fingerprint));
    groups
}

/// Write `map` to `writer` in the requested format.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_report<W: Write>(
    map: &ResultMap,
    format: OutputFormat,
    include_unique: bool,
    writer: &mut W,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Text => TextOutput::new(map, include_unique).write_to(writer)?,
        OutputFormat::Json => JsonOutput::new(map, include_unique).write_to(writer, true)?,
        OutputFormat::Paths => {
            for group in report_groups(map, include_unique) {
                for file in group.files {
                    writeln!(writer, "{}", file.path.display())?;
                }
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// Errors that can occur while writing a report.
#[derive(thiserror::Error, Debug)]
pub enum OutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error while writing report: {0}")]
    Io(#[from] std::io::Error),
}
