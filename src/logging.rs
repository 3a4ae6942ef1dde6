//! Logging setup for the `dupewalk` binary.
//!
//! Library code only uses the `log` macros. The binary installs `env_logger`
//! through [`init_logging`]. The level comes from (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. `--quiet` (error only)
//! 3. `--verbose` count: `-v` info, `-vv` debug, `-vvv` trace. A config
//!    file or `DUPEWALK_VERBOSE` setting `verbose` counts as `-v`.
//! 4. Default: warn
//!
//! Walker notices such as skipped directories are logged at info when
//! `verbose` is set on the walk, so a single `-v` makes them visible.
//!
//! # Example
//!
//! ```rust,no_run
//! use dupewalk::logging::init_logging;
//!
//! init_logging(1, false);
//! log::info!("walk started");
//! ```

use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::io::Write;

/// Initialize the logging subsystem from CLI verbosity flags.
///
/// Safe to call more than once: later calls leave the first logger in place.
pub fn init_logging(verbose: u8, quiet: bool) {
    let use_env = env::var("RUST_LOG").is_ok();
    let level = determine_level(verbose, quiet);

    let mut builder = Builder::new();
    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level);
    }
    configure_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        return;
    }

    if use_env {
        log::debug!(
            "Logging initialized from RUST_LOG: {:?}",
            env::var("RUST_LOG").ok()
        );
    } else {
        log::debug!("Logging initialized at level: {:?}", level);
    }
}

/// Map CLI flags to a level filter.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Module paths are shown from `-vv` upward, where they help tell walker
/// threads apart from the aggregator.
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if verbose >= 2 {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        }
    });
}
