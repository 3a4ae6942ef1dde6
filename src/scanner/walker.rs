//! Concurrent tree walker.
//!
//! # Overview
//!
//! [`Walker::walk`] runs a depth-first, breadth-concurrent traversal on a
//! fixed-size rayon pool:
//!
//! - Each directory task lists exactly one level of its directory. Every
//!   subdirectory that is not pruned becomes its own task, so no task ever
//!   recurses on its own stack.
//! - Each regular, non-empty file becomes a fingerprint task that sends one
//!   [`Pair`] to the aggregator.
//! - Every task holds a [`ConcurrencyGate`] permit while it works and is
//!   tracked by the [`TaskCoordinator`].
//!
//! The gate is what bounds concurrency. The pool has
//! [`POOL_OVERSUBSCRIPTION`] times as many threads as the gate has permits,
//! so spare threads park on the gate instead of the thread count capping
//! in-flight work. A permit holder never waits on another task, only on the
//! aggregator, which drains on its own thread.
//!
//! Once the coordinator drains, the pair channel is closed and the aggregator
//! hands back the finished map.
//!
//! # Errors
//!
//! Entries that disappear mid-walk are skipped. Any other listing error, and
//! any read error while fingerprinting, fails the whole walk: the first error
//! is kept, remaining tasks stop doing work, and `walk` returns that error
//! with no partial map.
//!
//! # Example
//!
//! ```no_run
//! use dupewalk::scanner::{ContentDigest, WalkConfig, Walker};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let config = WalkConfig::default()
//!     .with_workers(16)
//!     .with_skip_dirs(["target"])
//!     .with_fingerprinter(Arc::new(ContentDigest::default()));
//!
//! let results = Walker::new(config).walk(Path::new("/srv/media")).unwrap();
//! for (fingerprint, files) in results.duplicates() {
//!     println!("{fingerprint}: {} copies", files.len());
//! }
//! ```

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crossbeam_channel::{bounded, Sender};
use log::Level;
use walkdir::WalkDir;

use super::aggregator::Aggregator;
use super::coordinator::{TaskCoordinator, TaskGuard};
use super::gate::ConcurrencyGate;
use super::{HashError, Pair, ScanError, WalkConfig, WalkError, WalkStats};
use crate::duplicates::ResultMap;

/// Progress phase name reported while walking.
pub const WALK_PHASE: &str = "walking";

/// Pool threads per gate permit.
pub const POOL_OVERSUBSCRIPTION: usize = 2;

/// Concurrent directory walker.
#[derive(Debug, Clone, Default)]
pub struct Walker {
    config: WalkConfig,
}

impl Walker {
    /// Create a walker with the given configuration.
    #[must_use]
    pub fn new(config: WalkConfig) -> Self {
        Self { config }
    }

    /// The walker's configuration.
    #[must_use]
    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    /// Walk `root` and group every regular, non-empty file by fingerprint.
    ///
    /// Blocks until the whole tree has been traversed and aggregated.
    ///
    /// # Errors
    ///
    /// - [`WalkError::InvalidWorkers`] if the worker count is zero
    /// - [`WalkError::RelativeRoot`] if `root` is not absolute
    /// - [`WalkError::Scan`] if `root` is missing, not a directory or
    ///   unreadable, or if a directory cannot be listed mid-walk
    /// - [`WalkError::Hash`] if a file cannot be fingerprinted
    pub fn walk(&self, root: &Path) -> Result<ResultMap, WalkError> {
        self.walk_with_stats(root).map(|(map, _)| map)
    }

    /// Like [`Walker::walk`], also returning the walk's [`WalkStats`].
    ///
    /// # Errors
    ///
    /// Same as [`Walker::walk`].
    pub fn walk_with_stats(&self, root: &Path) -> Result<(ResultMap, WalkStats), WalkError> {
        self.config.validate()?;
        check_root(root)?;

        let workers = self.config.workers;
        log::debug!(
            "Walking {} with {} workers ({})",
            root.display(),
            workers,
            self.config.fingerprinter.name()
        );

        let state = Arc::new(WalkState::new(self.config.clone(), workers));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.saturating_mul(POOL_OVERSUBSCRIPTION))
            .thread_name(|i| format!("dupewalk-{i}"))
            .build()?;

        let (pairs_tx, pairs_rx) = bounded::<Pair>(workers);
        state.open_pairs(pairs_tx);

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start(WALK_PHASE, 0);
        }

        let progress = self.config.progress_callback.clone();
        let aggregator = match Aggregator::spawn(pairs_rx, progress) {
            Ok(aggregator) => aggregator,
            Err(e) => {
                state.close_pairs();
                return Err(e);
            }
        };

        // The root is the only directory task spawned from outside the pool.
        let guard = state.coordinator.register();
        let root_state = Arc::clone(&state);
        let root_dir = root.to_path_buf();
        pool.spawn(move || {
            WalkState::execute(root_state, guard, move |state| {
                state.search_tree(&root_dir)
            });
        });

        state.coordinator.join();
        state.close_pairs();
        let map = aggregator.finish();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(WALK_PHASE);
        }

        let stats = state.stats();
        log::debug!(
            "Walked {} directories, {} files, peak in-flight tasks: {}",
            stats.directories,
            stats.files,
            stats.peak_in_flight
        );

        if let Some(err) = state.take_failure() {
            return Err(err);
        }
        Ok((map?, stats))
    }
}

/// Reject roots that cannot be walked before any task is spawned.
fn check_root(root: &Path) -> Result<(), WalkError> {
    if !root.is_absolute() {
        return Err(WalkError::RelativeRoot(root.to_path_buf()));
    }
    let metadata = std::fs::metadata(root).map_err(|e| ScanError::from_io(root, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()).into());
    }
    std::fs::read_dir(root).map_err(|e| ScanError::from_io(root, e))?;
    Ok(())
}

/// State shared by every task of one walk.
struct WalkState {
    config: WalkConfig,
    gate: ConcurrencyGate,
    coordinator: Arc<TaskCoordinator>,
    pairs: RwLock<Option<Sender<Pair>>>,
    failure: Mutex<Option<WalkError>>,
    aborted: AtomicBool,
    directories: AtomicUsize,
    files: AtomicUsize,
}

impl WalkState {
    fn new(config: WalkConfig, workers: usize) -> Self {
        Self {
            config,
            gate: ConcurrencyGate::new(workers),
            coordinator: TaskCoordinator::new(),
            pairs: RwLock::new(None),
            failure: Mutex::new(None),
            aborted: AtomicBool::new(false),
            directories: AtomicUsize::new(0),
            files: AtomicUsize::new(0),
        }
    }

    fn stats(&self) -> WalkStats {
        WalkStats {
            directories: self.directories.load(Ordering::SeqCst),
            files: self.files.load(Ordering::SeqCst),
            peak_in_flight: self.gate.peak(),
        }
    }

    fn open_pairs(&self, sender: Sender<Pair>) {
        *self.pairs.write().unwrap_or_else(PoisonError::into_inner) = Some(sender);
    }

    /// Drop the last sender so the aggregator sees the channel close.
    fn close_pairs(&self) {
        self.pairs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Record a fatal error. Only the first one is kept.
    fn fail(&self, err: WalkError) {
        self.aborted.store(true, Ordering::SeqCst);
        let mut failure = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if failure.is_none() {
            log::error!("Aborting walk: {}", err);
            *failure = Some(err);
        } else {
            log::debug!("Additional walk error: {}", err);
        }
    }

    fn take_failure(&self) -> Option<WalkError> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Skip/visit notice: info when verbose, trace otherwise.
    fn notice(&self, args: fmt::Arguments<'_>) {
        let level = if self.config.verbose {
            Level::Info
        } else {
            Level::Trace
        };
        log::log!(level, "{}", args);
    }

    /// Register a task and run it on the current pool.
    fn spawn_task<F>(self: &Arc<Self>, task: F)
    where
        F: FnOnce(&Arc<Self>) -> Result<(), WalkError> + Send + 'static,
    {
        let guard = self.coordinator.register();
        let state = Arc::clone(self);
        rayon::spawn(move || Self::execute(state, guard, task));
    }

    /// Run a task body, recording its error or panic before the guard is
    /// released so `join` never returns ahead of a failure.
    fn execute<F>(state: Arc<Self>, guard: TaskGuard, task: F)
    where
        F: FnOnce(&Arc<Self>) -> Result<(), WalkError>,
    {
        match panic::catch_unwind(AssertUnwindSafe(|| task(&state))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => state.fail(err),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                state.fail(WalkError::TaskPanicked(message));
            }
        }
        drop(guard);
    }

    /// List one level of `dir`, spawning a task per subdirectory and per
    /// regular, non-empty file.
    fn search_tree(self: &Arc<Self>, dir: &Path) -> Result<(), WalkError> {
        if self.is_aborted() {
            return Ok(());
        }
        let _permit = self.gate.acquire();
        self.directories.fetch_add(1, Ordering::SeqCst);

        let listing = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false);

        for entry in listing {
            if self.is_aborted() {
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_not_found(&err) => {
                    log::debug!("Entry vanished while listing {}: {}", dir.display(), err);
                    continue;
                }
                Err(err) => return Err(listing_error(dir, err).into()),
            };

            let file_type = entry.file_type();
            let name = entry.file_name().to_string_lossy().into_owned();

            if file_type.is_dir() {
                if self.config.is_skipped(&name) {
                    self.notice(format_args!("Skipping directory {:?}", name));
                    continue;
                }
                self.notice(format_args!("Processing subdirectory: {:?}", name));
                let subdir = entry.into_path();
                self.spawn_task(move |state| state.search_tree(&subdir));
            } else if file_type.is_file() {
                let metadata = match entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(err) if is_not_found(&err) => {
                        log::debug!("File vanished: {}", entry.path().display());
                        continue;
                    }
                    Err(err) => return Err(listing_error(entry.path(), err).into()),
                };
                if metadata.len() == 0 {
                    log::trace!("Skipping empty file: {}", entry.path().display());
                    continue;
                }
                self.notice(format_args!("Processing file: {:?}", entry.path()));
                let path = entry.into_path();
                self.spawn_task(move |state| state.process_file(path));
            } else {
                log::trace!("Skipping special file: {}", entry.path().display());
            }
        }

        Ok(())
    }

    /// Fingerprint one file and hand the pair to the aggregator.
    fn process_file(&self, path: PathBuf) -> Result<(), WalkError> {
        if self.is_aborted() {
            return Ok(());
        }
        let _permit = self.gate.acquire();

        let fingerprint = match self.config.fingerprinter.fingerprint(&path) {
            Ok(fingerprint) => fingerprint,
            Err(HashError::NotFound(_)) => {
                log::debug!("File vanished before hashing: {}", path.display());
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let pairs = self.pairs.read().unwrap_or_else(PoisonError::into_inner);
        let sender = pairs.as_ref().ok_or(WalkError::AggregatorLost)?;
        sender
            .send(Pair { fingerprint, path })
            .map_err(|_| WalkError::AggregatorLost)?;
        self.files.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn is_not_found(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// Convert a walkdir error into a [`ScanError`] for `fallback` when walkdir
/// does not report a path of its own.
fn listing_error(fallback: &Path, err: walkdir::Error) -> ScanError {
    let path = err.path().unwrap_or(fallback).to_path_buf();
    match err.into_io_error() {
        Some(source) => ScanError::from_io(&path, source),
        None => ScanError::Io {
            path,
            source: io::Error::other("directory listing failed"),
        },
    }
}
