//! Wait-group for a task graph that grows while it runs.
//!
//! Directory tasks register their children before they finish, so the
//! outstanding count can only reach zero once every task spawned anywhere in
//! the tree has completed. Completion is signalled by dropping the
//! [`TaskGuard`] returned from [`TaskCoordinator::register`], which also
//! happens on error returns and during unwinding.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Tracks outstanding tasks and lets one caller wait for all of them.
#[derive(Debug, Default)]
pub struct TaskCoordinator {
    outstanding: AtomicUsize,
    lock: Mutex<()>,
    all_done: Condvar,
}

impl TaskCoordinator {
    /// Create a coordinator with no outstanding tasks.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one more task. Call before spawning it.
    pub fn register(self: &Arc<Self>) -> TaskGuard {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        TaskGuard {
            coordinator: Arc::clone(self),
        }
    }

    fn done(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.all_done.notify_all();
        }
    }

    /// Block until the outstanding count returns to zero.
    pub fn join(&self) {
        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while self.outstanding.load(Ordering::Acquire) != 0 {
            guard = self
                .all_done
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Number of tasks registered and not yet done.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }
}

/// Registration of one task; dropping it marks the task done.
#[derive(Debug)]
#[must_use = "the task is marked done as soon as the guard is dropped"]
pub struct TaskGuard {
    coordinator: Arc<TaskCoordinator>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.coordinator.done();
    }
}
