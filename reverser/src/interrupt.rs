//! External cancellation of pending blocking reads
//!
//! An `Interrupt` is a latch: once raised it stays pending until a read
//! acknowledges it or someone clears it. Clones share the same latch, so the
//! party that owns the reader can hand a clone to whoever delivers the signal.
//!
//! Raises are counted. A read that gives up acknowledges only the raises it
//! observed, so a raise that lands while the read is returning stays pending
//! for the next one. A raise while data is available is not consumed by the
//! read that returns the data: it interrupts the next read that has to wait.

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, Default)]
struct Latch {
    /// Number of `raise()` calls so far
    raised: u64,
    /// Highest raise count that has been delivered or cleared
    acknowledged: u64,
}

impl Latch {
    fn is_pending(&self) -> bool {
        self.raised > self.acknowledged
    }
}

#[derive(Clone)]
pub struct Interrupt {
    tx: Arc<watch::Sender<Latch>>,
}

impl Interrupt {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Latch::default());
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal and wake everybody waiting in `raised()`
    pub fn raise(&self) {
        self.tx.send_modify(|latch| latch.raised += 1);
    }

    /// Drop every pending raise
    pub fn clear(&self) {
        self.tx.send_modify(|latch| latch.acknowledged = latch.raised);
    }

    /// Mark the raises up to `generation` (as returned by `raised()`) as delivered
    ///
    /// Raises that happened after `generation` stay pending.
    pub fn acknowledge(&self, generation: u64) {
        self.tx.send_modify(|latch| {
            latch.acknowledged = latch.acknowledged.max(generation.min(latch.raised));
        });
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.tx.borrow().is_pending()
    }

    /// Resolve once a raise is pending, returning the raise count seen
    pub async fn raised(&self) -> u64 {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here
        let seen = rx.wait_for(Latch::is_pending).await.map(|latch| latch.raised);
        seen.unwrap_or_else(|_| self.tx.borrow().raised)
    }
}

impl Default for Interrupt {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupt(raised={})", self.is_raised())
    }
}
