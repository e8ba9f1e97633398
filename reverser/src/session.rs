//! Reversing session with blocking reads
//!
//! A session owns one `Buffer`:
//! - The writer appends to the buffer; every write reverses the pending bytes
//! - Readers drain the reversed bytes, waiting when nothing is available
//! - Coordination via notification queue (wait when no data available)

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;

use crate::buffer::Buffer;
use crate::error::{Result, SessionError};
use crate::idgen::Handle;
use crate::interrupt::Interrupt;
use crate::notification_queue::NotificationQueueArc;

/// Session lifecycle
///
/// `Empty` and `Readable` alternate as data is written and drained.
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Readable,
    Closed,
}

/// What a read does when no data is available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Wait for a write, close, or interrupt
    Blocking,
    /// Fail with `WouldBlock`
    NonBlocking,
}

/// State guarded by the session lock
struct Shared {
    /// `None` once the session is closed
    buffer: Option<Buffer>,
    state: SessionState,
}

/// One open use of the device
///
/// # Thread Safety
///
/// Session is thread-safe and can be shared between threads (via Arc or references).
/// The buffer cursors and the state are protected by one `parking_lot::Mutex`.
///
/// - **One writer**: `write()` may be called from any thread, but the
///   reversal semantics assume writes are not interleaved by several producers.
/// - **Readers**: any number of tasks may call `read()`; each byte is
///   delivered to exactly one of them.
/// - **Notification after update**: `write()` and `close()` release the
///   session lock before notifying, and readers re-check the buffer after
///   every wakeup.
pub struct Session {
    shared: Mutex<Shared>,
    capacity: usize,
    handle: Handle,
    queue: NotificationQueueArc,
}

impl Session {
    /// Open a session with a buffer of `capacity` bytes
    ///
    /// # Errors
    ///
    /// - `InvalidCapacity` if `capacity` is zero
    /// - `OutOfMemory` if the buffer cannot be allocated; no session is created
    pub fn open(capacity: usize, handle: Handle, queue: NotificationQueueArc) -> Result<Self> {
        if capacity == 0 {
            return Err(SessionError::InvalidCapacity);
        }
        let buffer = Buffer::allocate(capacity).inspect_err(|e| {
            log::warn!("Session::open({handle:?}): {e}");
        })?;

        queue.whitelist(handle, &format!("session capacity={capacity}"));

        Ok(Self {
            shared: Mutex::new(Shared {
                buffer: Some(buffer),
                state: SessionState::Empty,
            }),
            capacity,
            handle,
            queue,
        })
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Number of bytes ready for reading (0 after close)
    #[must_use]
    pub fn available(&self) -> usize {
        self.shared.lock().buffer.as_ref().map_or(0, Buffer::available)
    }

    /// Write bytes and make them readable in reversed order
    ///
    /// Returns the number of bytes accepted, which is short when the buffer
    /// fills up, and 0 when it is full. Space drained by readers is reused.
    /// The unread bytes and the new ones are reversed together, so readers
    /// always see the reverse of everything written but not yet read.
    ///
    /// An empty write returns 0 without waking readers.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the session is closed.
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        let written = {
            let mut guard = self.shared.lock();
            let shared = &mut *guard;
            let Some(buffer) = shared.buffer.as_mut() else {
                return Err(SessionError::InvalidState);
            };

            if bytes.is_empty() {
                return Ok(0);
            }

            buffer.reclaim();
            if buffer.remaining() == 0 {
                return Ok(0);
            }

            // Undo the previous commit so the unread bytes are back in written order
            if !buffer.is_empty() {
                buffer.reverse_commit();
            }
            let written = buffer.append(bytes);
            buffer.reverse_commit();

            shared.state = SessionState::Readable;
            written
        };

        // Notify outside lock
        #[allow(clippy::cast_possible_wrap)]
        let arg = written as i64;
        self.queue.notify(self.handle, arg);
        Ok(written)
    }

    /// Read up to `max_len` reversed bytes
    ///
    /// Returns as soon as any data is available, possibly fewer bytes than
    /// requested. A zero-length read follows the same rules: it returns an
    /// empty result only when data is available.
    ///
    /// # Errors
    ///
    /// - `WouldBlock` for a non-blocking read with no data available
    /// - `Closed` if the session was closed while the read was waiting
    /// - `InvalidState` if the session was already closed
    pub async fn read(&self, max_len: usize, mode: ReadMode) -> Result<Vec<u8>> {
        self.read_inner(max_len, mode, None).await
    }

    /// Like `read()`, but a waiting read gives up when `interrupt` is raised
    ///
    /// Data that is already available is returned even if the interrupt is
    /// raised; the raise then stays pending for the next read that has to
    /// wait. An interrupted read consumes no data, and acknowledges the
    /// raises it observed. A raise that arrives after that is kept.
    ///
    /// # Errors
    ///
    /// As `read()`, plus `Interrupted`.
    pub async fn read_interruptible(
        &self,
        max_len: usize,
        mode: ReadMode,
        interrupt: &Interrupt,
    ) -> Result<Vec<u8>> {
        self.read_inner(max_len, mode, Some(interrupt)).await
    }

    async fn read_inner(
        &self,
        max_len: usize,
        mode: ReadMode,
        interrupt: Option<&Interrupt>,
    ) -> Result<Vec<u8>> {
        let mut waited = false;
        loop {
            if let Some(bytes) = self.try_read(max_len, waited)? {
                return Ok(bytes);
            }
            if mode == ReadMode::NonBlocking {
                return Err(SessionError::WouldBlock);
            }

            if let Some(wakeup) = self.register_wait() {
                match interrupt {
                    Some(interrupt) => {
                        let raised = tokio::select! {
                            biased;
                            () = wakeup => None,
                            generation = interrupt.raised() => Some(generation),
                        };
                        if let Some(generation) = raised {
                            interrupt.acknowledge(generation);
                            // The dropped wakeup left its registration behind
                            self.queue.remove_dropped(self.handle);
                            return Err(SessionError::Interrupted);
                        }
                    }
                    None => wakeup.await,
                }
            }
            // From now on a close means "closed while we were waiting"
            waited = true;
        }
    }

    /// Drain available data under the session lock
    ///
    /// `Ok(None)` means "nothing to read yet".
    fn try_read(&self, max_len: usize, waited: bool) -> Result<Option<Vec<u8>>> {
        let mut guard = self.shared.lock();
        let shared = &mut *guard;
        let Some(buffer) = shared.buffer.as_mut() else {
            return Err(if waited {
                SessionError::Closed
            } else {
                SessionError::InvalidState
            });
        };

        if buffer.is_empty() {
            return Ok(None);
        }

        let bytes = buffer.drain(max_len);
        if buffer.is_empty() {
            shared.state = SessionState::Empty;
        }
        Ok(Some(bytes))
    }

    /// Register as a waiter if there is still nothing to read
    ///
    /// See the `crate::notification_queue` documentation for the workflow explanation
    /// (check (in `try_read`) - lock (here) - check again (here))
    fn register_wait(&self) -> Option<impl Future<Output = ()> + Send> {
        let queue_lock = self.queue.get_lock();

        let should_wait = {
            let shared = self.shared.lock();
            shared.buffer.as_ref().is_some_and(Buffer::is_empty)
        };

        if should_wait {
            Some(self.queue.wait_async(self.handle, "reader", queue_lock))
        } else {
            drop(queue_lock);
            None
        }
    }

    /// Close the session, release the buffer and wake all readers
    ///
    /// Waiting readers observe `Closed`.
    ///
    /// # Errors
    ///
    /// `InvalidState` if the session is already closed.
    pub fn close(&self) -> Result<()> {
        {
            let mut shared = self.shared.lock();
            if shared.state == SessionState::Closed {
                return Err(SessionError::InvalidState);
            }
            shared.state = SessionState::Closed;
            shared.buffer = None;
        }
        // Unregister handle from queue
        // This will notify with -1 and wake all waiters
        self.queue.unlist(self.handle);
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.lock();
        write!(
            f,
            "Session(handle={:?}, state={:?}, buffer={:?})",
            self.handle, shared.state, shared.buffer
        )
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.is_closed() {
            let _ = self.close();
        }
    }
}
