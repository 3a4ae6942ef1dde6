//! dupewalk - concurrent directory walker and duplicate finder
//!
//! Walks a directory tree with a bounded pool of tasks, fingerprints every
//! non-empty regular file, and groups files that share a fingerprint.
//!
//! The library entry point is [`scanner::Walker`]; the binary is a thin layer
//! over [`run_app`].

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use cli::Cli;
use config::{Config, Overrides};
use duplicates::{has_extension, size_greater_than, ResultMap};
use error::ExitCode;
use progress::Progress;
use scanner::{File, Walker};

/// Run the command line application.
///
/// Returns [`ExitCode::Success`] when at least one duplicate group survives
/// filtering and [`ExitCode::NoDuplicates`] otherwise.
///
/// # Errors
///
/// Returns an error if configuration, the walk, or writing the report fails.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref(), &Overrides::from(&cli))?;
    logging::init_logging(config.log_verbosity(cli.verbose), cli.quiet);
    let root = absolute_root(&cli.path)?;

    let mut walk_config = config.to_walk_config();
    if cli.progress && !cli.quiet {
        walk_config = walk_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    log::info!(
        "Walking {} with {} workers ({} fingerprints)",
        root.display(),
        walk_config.workers,
        walk_config.fingerprinter.name()
    );

    let start = Instant::now();
    let results = Walker::new(walk_config)
        .walk(&root)
        .with_context(|| format!("Failed to walk {}", root.display()))?;
    log::info!(
        "Collected {} files in {} groups in {:.2?}",
        results.total_files(),
        results.len(),
        start.elapsed()
    );

    let results = apply_filters(&results, cli.min_size, &cli.extensions);

    match &cli.report {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("Failed to create report {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            output::write_report(&results, cli.output, cli.all, &mut writer)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            log::info!("Report written to {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            output::write_report(&results, cli.output, cli.all, &mut writer)
                .context("Failed to write report")?;
            writer.flush().ok();
        }
    }

    if results.duplicates().next().is_some() {
        Ok(ExitCode::Success)
    } else {
        Ok(ExitCode::NoDuplicates)
    }
}

/// Make `path` absolute against the current directory.
fn absolute_root(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Invalid path {}", path.display()))
}

/// Apply `--min-size` and `--ext`. Several extensions match any of them.
fn apply_filters(results: &ResultMap, min_size: Option<u64>, extensions: &[String]) -> ResultMap {
    let size_filter = min_size.map(size_greater_than);
    let ext_filters: Vec<_> = extensions.iter().map(|e| has_extension(e)).collect();
    let any_ext = |file: &File| ext_filters.iter().any(|keep| keep(file));

    let mut predicates: Vec<&dyn Fn(&File) -> bool> = Vec::new();
    if let Some(filter) = &size_filter {
        predicates.push(filter);
    }
    if !ext_filters.is_empty() {
        predicates.push(&any_ext);
    }

    if predicates.is_empty() {
        return results.clone();
    }
    results.filter(&predicates)
}
