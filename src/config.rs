//! Layered application configuration.
//!
//! Sources, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config FILE`, or `config.toml` in the platform config dir)
//! 3. `DUPEWALK_*` environment variables (e.g. `DUPEWALK_WORKERS=4`)
//! 4. Command-line flags
//!
//! Skip lists from the command line are appended to the ones from lower
//! layers rather than replacing them.
//!
//! ```toml
//! workers = 8
//! skip_dirs = ["target", "dist"]
//! no_default_skip = false
//! strategy = "content"
//! digest = "blake3"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::scanner::{default_workers, DigestAlgorithm, Strategy, WalkConfig};

/// Prefix for configuration environment variables.
pub const ENV_PREFIX: &str = "DUPEWALK_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Concurrent walk tasks
    pub workers: usize,
    /// Extra directory names to prune
    pub skip_dirs: Vec<String>,
    /// Walk into the built-in skip list
    pub no_default_skip: bool,
    /// Fingerprint strategy
    pub strategy: Strategy,
    /// Digest for the content strategy
    pub digest: DigestAlgorithm,
    /// Log walker notices at info instead of trace, and raise the log
    /// level to at least info
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            skip_dirs: Vec::new(),
            no_default_skip: false,
            strategy: Strategy::default(),
            digest: DigestAlgorithm::default(),
            verbose: false,
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skip_dirs: Vec<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_default_skip: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<DigestAlgorithm>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub verbose: bool,
}

impl From<&Cli> for Overrides {
    fn from(cli: &Cli) -> Self {
        Self {
            workers: cli.workers,
            skip_dirs: cli.skip_dirs.clone(),
            no_default_skip: cli.no_default_skip,
            strategy: cli.strategy,
            digest: cli.digest,
            verbose: cli.verbose > 0,
        }
    }
}

impl Config {
    /// Load all layers.
    ///
    /// An explicit `path` must exist. Without one, the platform config file is
    /// used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any layer fails to
    /// parse.
    pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let file = match path {
            Some(path) => {
                if !path.is_file() {
                    bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|p| p.is_file()),
        };

        match &file {
            Some(path) => log::debug!("Loading config from {}", path.display()),
            None => log::debug!("No config file, using defaults and environment"),
        }

        Self::figment(file.as_deref(), overrides)
            .extract()
            .context("Invalid configuration")
    }

    /// Build the provider stack without extracting it.
    #[must_use]
    pub fn figment(file: Option<&Path>, overrides: &Overrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .admerge(Serialized::defaults(overrides))
    }

    /// Log verbosity from the `-v` count, raised to one when `verbose` is
    /// set by any config layer.
    #[must_use]
    pub fn log_verbosity(&self, cli_count: u8) -> u8 {
        if self.verbose {
            cli_count.max(1)
        } else {
            cli_count
        }
    }

    /// Build the immutable walk configuration.
    #[must_use]
    pub fn to_walk_config(&self) -> WalkConfig {
        let config = WalkConfig::default()
            .with_workers(self.workers)
            .with_verbose(self.verbose)
            .with_skip_dirs(self.skip_dirs.iter().cloned())
            .with_fingerprinter(self.strategy.fingerprinter(self.digest));
        if self.no_default_skip {
            config.no_default_skip()
        } else {
            config
        }
    }
}

/// `config.toml` in the platform config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "dupewalk").map(|dirs| dirs.config_dir().join("config.toml"))
}
