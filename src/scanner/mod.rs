//! Scanner module for concurrent directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Concurrent directory descent, one task per subdirectory
//! - Pluggable file fingerprinting (name+size or content digest)
//! - Bounding in-flight work with a counting gate
//! - Collecting fingerprints into a single [`ResultMap`](crate::duplicates::ResultMap)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Tree walker and the `walk` entry point
//! - [`fingerprint`]: Fingerprint strategies
//! - [`gate`]: Counting semaphore that bounds concurrent tasks
//! - [`coordinator`]: Wait-group that tracks dynamically spawned tasks
//! - [`aggregator`]: Single consumer that owns the result map
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::scanner::{Walker, WalkConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(WalkConfig::default().with_workers(8));
//! let results = walker.walk(Path::new("/home/user/Downloads")).unwrap();
//! for file in results.flatten() {
//!     println!("{}: {} bytes", file.path.display(), file.stats.size);
//! }
//! ```

pub mod aggregator;
pub mod coordinator;
pub mod fingerprint;
pub mod gate;
pub mod walker;

use std::collections::BTreeSet;
use std::fs::Metadata;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::progress::ProgressCallback;

// Re-export main types
pub use aggregator::Aggregator;
pub use coordinator::{TaskCoordinator, TaskGuard};
pub use fingerprint::{
    ContentDigest, DigestAlgorithm, Fingerprint, Fingerprinter, NameSize, Strategy,
};
pub use gate::{ConcurrencyGate, GatePermit};
pub use walker::Walker;

/// Very large directories you may not control, pruned unless
/// [`WalkConfig::no_default_skip`] is set.
///
/// Mostly relevant when walking a home directory.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    "AndroidStudioProjects",
    "Android",
    "NetBeansProjects",
    "node_modules",
    "Qt",
    "VirtualBoxVMs",
    "vmime",
    "venv",
    "env",
    "RUST",
    "nltk_data",
    "qt5",
    "qt6",
    "wasm32-unknown-unknown",
];

/// Number of workers used when none is configured: twice the available
/// parallelism.
#[must_use]
pub fn default_workers() -> usize {
    2 * std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

/// Metadata snapshot taken when a file is collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStats {
    /// File size in bytes
    pub size: u64,
    /// Permission bits (unix mode; synthesized elsewhere)
    pub mode: u32,
    /// Whether the entry is a regular file
    pub is_file: bool,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Last modification time, if the platform reports one
    pub modified: Option<SystemTime>,
}

impl FileStats {
    /// Build a snapshot from filesystem metadata.
    #[must_use]
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            size: metadata.len(),
            mode: mode_bits(metadata),
            is_file: metadata.is_file(),
            is_dir: metadata.is_dir(),
            modified: metadata.modified().ok(),
        }
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

/// A collected file: its absolute path and a metadata snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct File {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Metadata captured when the file was collected
    pub stats: FileStats,
}

impl File {
    /// Create a new File record.
    #[must_use]
    pub fn new(path: PathBuf, stats: FileStats) -> Self {
        Self { path, stats }
    }

    /// Stat `path` (following symlinks) and build a record from it.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the path cannot be stat'ed.
    pub fn stat(path: PathBuf) -> io::Result<Self> {
        let metadata = std::fs::metadata(&path)?;
        Ok(Self::new(path, FileStats::from_metadata(&metadata)))
    }

    /// Final component of the path, lossily converted.
    #[must_use]
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Message sent from a file task to the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// Fingerprint computed by the active strategy
    pub fingerprint: Fingerprint,
    /// Path the fingerprint was computed for
    pub path: PathBuf,
}

/// Counters collected over one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WalkStats {
    /// Directories listed, the root included
    pub directories: usize,
    /// Files fingerprinted and handed to the aggregator
    pub files: usize,
    /// Highest number of tasks holding a gate permit at once
    pub peak_in_flight: usize,
}

/// Configuration for a walk.
///
/// Built once and read-only for the lifetime of a [`Walker`].
#[derive(Clone)]
pub struct WalkConfig {
    /// Capacity of the concurrency gate, the bound on in-flight tasks. Must be > 0.
    pub workers: usize,

    /// Emit skip/visit notices at info level instead of trace.
    pub verbose: bool,

    /// Directory names pruned in addition to hidden directories.
    pub skip_dirs: BTreeSet<String>,

    /// Do not prune [`DEFAULT_SKIP_DIRS`].
    pub no_default_skip: bool,

    /// Strategy used to fingerprint each file.
    pub fingerprinter: Arc<dyn Fingerprinter>,

    /// Optional progress callback, driven by the aggregator.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for WalkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalkConfig")
            .field("workers", &self.workers)
            .field("verbose", &self.verbose)
            .field("skip_dirs", &self.skip_dirs)
            .field("no_default_skip", &self.no_default_skip)
            .field("fingerprinter", &self.fingerprinter.name())
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            verbose: false,
            skip_dirs: BTreeSet::new(),
            no_default_skip: false,
            fingerprinter: Arc::new(NameSize),
            progress_callback: None,
        }
    }
}

impl WalkConfig {
    /// Set the worker count.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Turn verbose notices on or off.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Add directory names to prune.
    #[must_use]
    pub fn with_skip_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip_dirs.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Stop pruning the built-in skip list. Explicit skip dirs still apply.
    #[must_use]
    pub fn no_default_skip(mut self) -> Self {
        self.no_default_skip = true;
        self
    }

    /// Set the fingerprint strategy.
    #[must_use]
    pub fn with_fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Whether a directory with this name is pruned.
    ///
    /// Hidden directories are always pruned.
    #[must_use]
    pub fn is_skipped(&self, name: &str) -> bool {
        name.starts_with('.')
            || self.skip_dirs.contains(name)
            || (!self.no_default_skip && DEFAULT_SKIP_DIRS.contains(&name))
    }

    /// Check the configuration before any task is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::InvalidWorkers`] when `workers` is zero.
    pub fn validate(&self) -> Result<(), WalkError> {
        if self.workers == 0 {
            return Err(WalkError::InvalidWorkers);
        }
        Ok(())
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file or directory.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    /// Classify an I/O error raised while accessing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Errors that can occur during file fingerprinting.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Errors that abort a whole walk.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// The worker count was zero.
    #[error("Worker count must be greater than zero")]
    InvalidWorkers,

    /// The root passed to `walk` was relative.
    #[error("Root path must be absolute: {0}")]
    RelativeRoot(PathBuf),

    /// A directory could not be listed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// A file could not be fingerprinted.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// The worker pool could not be started.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// The aggregator thread could not be started.
    #[error("Failed to start aggregator: {0}")]
    Spawn(#[source] io::Error),

    /// The aggregator went away before delivering its result.
    #[error("Aggregator stopped before the walk finished")]
    AggregatorLost,

    /// A traversal or fingerprint task panicked.
    #[error("Walk task panicked: {0}")]
    TaskPanicked(String),
}
