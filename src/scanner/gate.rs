//! Counting semaphore bounding the number of in-flight walk tasks.
//!
//! The gate is a bounded channel used as a token bucket: acquiring sends a
//! token (blocking while the channel is full), releasing receives one. The
//! gate also tracks how many permits are held and the highest count seen,
//! which makes the bound observable.
//!
//! Fairness is not guaranteed.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender};

/// Bounded counting semaphore.
#[derive(Debug)]
pub struct ConcurrencyGate {
    tokens_tx: Sender<()>,
    tokens_rx: Receiver<()>,
    capacity: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGate {
    /// Create a gate admitting at most `capacity` holders.
    ///
    /// A capacity of zero is clamped to one so that `acquire` can never
    /// block forever.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tokens_tx, tokens_rx) = bounded(capacity);
        Self {
            tokens_tx,
            tokens_rx,
            capacity,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Block until a slot is free, then hold it until the permit drops.
    pub fn acquire(&self) -> GatePermit<'_> {
        // Both channel ends live in `self`, so the send cannot disconnect.
        let _ = self.tokens_tx.send(());
        self.admit()
    }

    /// Take a slot if one is free right now.
    pub fn try_acquire(&self) -> Option<GatePermit<'_>> {
        self.tokens_tx.try_send(()).ok().map(|()| self.admit())
    }

    fn admit(&self) -> GatePermit<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GatePermit { gate: self }
    }

    fn release(&self) {
        // Decrement before freeing the token so `in_flight` never exceeds
        // the number of tokens in the channel.
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.tokens_rx.try_recv();
    }

    /// Maximum number of simultaneous holders.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently held.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits held at once since creation.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Slot in a [`ConcurrencyGate`], released on drop.
#[derive(Debug)]
#[must_use = "the slot is released as soon as the permit is dropped"]
pub struct GatePermit<'a> {
    gate: &'a ConcurrencyGate,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
