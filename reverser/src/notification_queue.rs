//! Notification Queue
//!
//! Wakes readers blocked on a session when its writer makes progress or the
//! session closes.
//!
//! # Waiting for a handle
//!
//! In the first approximation, the workflow is as follows:
//!
//! 10. Reader: check "is data available"
//! 20. Reader: call `wait_async`
//! 30. Queue-for-reader: add reader to the waiting list
//! 40. Queue-for-reader: wait for handle notification
//!
//! 50. Writer: update cursors, call `notify`
//! 60. Queue-for-writer: extract the reader(s) from the waiting list
//! 70. Queue-for-writer: wake the reader(s)
//!
//! 80. Queue-for-reader: awake and exit from `wait_async`
//!
//! The writer runs concurrently, so step 60 can happen between steps 10
//! and 30. The reader would then miss the notification and wait forever.
//!
//! To avoid this, the reader acquires the queue lock to make steps 10-30
//! atomic. The writer updates the cursors before step 60, and step 60 needs
//! the same lock, so a reader that saw "no data" is registered before the
//! writer looks for waiters:
//!
//! ```ignore
//! let lock = queue.get_lock();
//! if should_wait() {
//!     queue.wait_async(handle, debug_hint, lock).await;
//!     // Note: lock is consumed by wait_async and released before awaiting
//! }
//! ```
//!
//! After waking, the reader must check the condition again: a wakeup only
//! means "something changed".

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::idgen::Handle;

/// Value sent to waiters when a handle is unlisted
pub const UNLISTED: i64 = -1;

/// Represents a reader waiting for a handle notification
struct WaitingClient {
    sender: tokio::sync::oneshot::Sender<i64>,
    debug_hint: String,
}

impl std::fmt::Debug for WaitingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitingClient")
            .field("debug_hint", &self.debug_hint)
            .finish_non_exhaustive()
    }
}

pub struct InnerState {
    whitelist: HashMap<Handle, String>,
    waiting_clients: HashMap<Handle, Vec<WaitingClient>>,
}

impl InnerState {
    fn new() -> Self {
        Self {
            whitelist: HashMap::new(),
            waiting_clients: HashMap::new(),
        }
    }
}

/// Thread-safe queue for handle notifications
#[derive(Clone)]
pub struct NotificationQueueArc {
    inner: Arc<Mutex<InnerState>>,
}

impl NotificationQueueArc {
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(InnerState::new())),
        }
    }

    /// Get the lock for atomic condition-check + register operations
    pub fn get_lock(&self) -> parking_lot::MutexGuard<'_, InnerState> {
        self.inner.lock()
    }

    /// Register a handle in the whitelist
    pub fn whitelist(&self, handle: Handle, debug_hint: &str) {
        let mut state = self.inner.lock();
        if let Some(old_hint) = state.whitelist.insert(handle, debug_hint.to_string()) {
            log::warn!(
                "queue.whitelist: handle {handle:?} already in whitelist (was: '{old_hint}')",
            );
        }
    }

    /// Check whether a handle is registered
    #[must_use]
    pub fn is_whitelisted(&self, handle: Handle) -> bool {
        self.inner.lock().whitelist.contains_key(&handle)
    }

    /// Number of readers currently waiting on a handle
    #[must_use]
    pub fn waiter_count(&self, handle: Handle) -> usize {
        self.inner
            .lock()
            .waiting_clients
            .get(&handle)
            .map_or(0, Vec::len)
    }

    /// Unregister a handle from the whitelist
    ///
    /// Wakes all waiting clients with the value `UNLISTED`. Later waits on
    /// the handle resolve immediately.
    pub fn unlist(&self, handle: Handle) {
        let mut state = self.inner.lock();
        if state.whitelist.remove(&handle).is_none() {
            log::warn!("queue.unlist: handle {handle:?} not in whitelist");
        }
        drop(state);

        self.notify(handle, UNLISTED);
    }

    /// Wake all clients waiting for a handle
    pub fn notify(&self, handle: Handle, arg: i64) {
        let mut state = self.inner.lock();
        let waiters = state.waiting_clients.remove(&handle).unwrap_or_default();
        drop(state);

        log::debug!(
            "queue.notify: handle {:?}, arg={}, waiters: {}",
            handle,
            arg,
            waiters.len()
        );

        for waiter in waiters {
            if waiter.sender.send(arg).is_err() {
                // The waiting future was dropped, e.g. an interrupted read
                log::debug!(
                    "queue.notify: receiver dropped for handle {:?} (hint: {})",
                    handle,
                    waiter.debug_hint
                );
            }
        }
    }

    /// Forget waiters on `handle` whose future has been dropped
    ///
    /// A reader that stops waiting before it is notified (for example, an
    /// interrupted read) leaves its registration behind; `notify` would only
    /// discard it on the next write.
    pub fn remove_dropped(&self, handle: Handle) {
        let mut state = self.inner.lock();
        let Some(waiters) = state.waiting_clients.get_mut(&handle) else {
            return;
        };
        let before = waiters.len();
        waiters.retain(|waiter| !waiter.sender.is_closed());
        let removed = before - waiters.len();
        if waiters.is_empty() {
            state.waiting_clients.remove(&handle);
        }
        drop(state);

        if removed > 0 {
            log::debug!("queue.remove_dropped: handle {handle:?}, removed {removed}");
        }
    }

    /// Wait for the handle notification
    ///
    /// Precondition: The caller should acquire the lock before calling this method.
    /// Post-condition: The lock is released after the method returns.
    ///
    /// The waiter is registered when this method is called, not when the
    /// returned future is first polled.
    ///
    /// See the module documentation for more details about the lock acquisition pattern.
    pub fn wait_async(
        &self,
        handle: Handle,
        debug_hint: &str,
        mut lock: parking_lot::MutexGuard<'_, InnerState>,
    ) -> impl Future<Output = ()> + Send {
        let (tx, rx) = tokio::sync::oneshot::channel();

        if lock.whitelist.contains_key(&handle) {
            let client = WaitingClient {
                sender: tx,
                debug_hint: debug_hint.to_string(),
            };
            lock.waiting_clients.entry(handle).or_default().push(client);
            drop(lock);
        } else {
            // Not whitelisted (or already unlisted): nothing will ever
            // notify, so resolve immediately
            drop(lock);
            let _ = tx.send(UNLISTED);
        }

        // The sender is dropped without sending only if the whole queue
        // is dropped; treat that as a wakeup too
        async move {
            let _ = rx.await;
        }
    }
}

impl std::fmt::Debug for NotificationQueueArc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("NotificationQueueArc")
            .field("whitelist", &state.whitelist)
            .field("waiting_clients", &state.waiting_clients)
            .finish()
    }
}
