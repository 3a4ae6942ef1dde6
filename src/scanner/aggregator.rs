//! Single consumer of the pair stream.
//!
//! The aggregator is the only code that touches the [`ResultMap`] while a walk
//! runs. Producers only send [`Pair`] messages, so the map needs no locking.
//! The map is delivered once, over a one-shot channel, after the pair channel
//! closes.

use std::fs;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};

use super::{File, FileStats, Pair, WalkError};
use crate::duplicates::ResultMap;
use crate::progress::ProgressCallback;

/// Handle to a running aggregator thread.
#[derive(Debug)]
pub struct Aggregator {
    result_rx: Receiver<ResultMap>,
    handle: JoinHandle<()>,
}

impl Aggregator {
    /// Start consuming `pairs` on a dedicated thread.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::Spawn`] if the thread cannot be started.
    pub fn spawn(
        pairs: Receiver<Pair>,
        progress: Option<Arc<dyn ProgressCallback>>,
    ) -> Result<Self, WalkError> {
        let (result_tx, result_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("dupewalk-aggregator".to_string())
            .spawn(move || {
                let map = collect(&pairs, progress.as_deref());
                // The receiver only disappears if the walk itself was dropped.
                let _ = result_tx.send(map);
            })
            .map_err(WalkError::Spawn)?;

        Ok(Self { result_rx, handle })
    }

    /// Wait for the pair channel to close and take the finished map.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::AggregatorLost`] if the thread ended without
    /// delivering a map.
    pub fn finish(self) -> Result<ResultMap, WalkError> {
        let map = self.result_rx.recv().map_err(|_| WalkError::AggregatorLost);
        if self.handle.join().is_err() {
            log::error!("Aggregator thread panicked");
        }
        map
    }
}

/// Drain `pairs` into a map, re-stating every file as it arrives.
///
/// Files that can no longer be stat'ed are dropped.
pub fn collect(pairs: &Receiver<Pair>, progress: Option<&dyn ProgressCallback>) -> ResultMap {
    let mut map = ResultMap::new();
    let mut consumed = 0usize;

    for Pair { fingerprint, path } in pairs.iter() {
        match fs::metadata(&path) {
            Ok(metadata) => {
                consumed += 1;
                if let Some(callback) = progress {
                    callback.on_progress(consumed, path.to_string_lossy().as_ref());
                }
                map.push(fingerprint, File::new(path, FileStats::from_metadata(&metadata)));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("File vanished before collection: {}", path.display());
            }
            Err(e) => {
                log::warn!("Dropping {}: {}", path.display(), e);
            }
        }
    }

    log::debug!(
        "Aggregator finished: {} files in {} groups",
        map.total_files(),
        map.len()
    );
    map
}
