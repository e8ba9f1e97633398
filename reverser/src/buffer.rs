//! Fixed-capacity reversing buffer
//!
//! Bytes are appended at `write_end` and consumed from `read_ptr`.
//! `reverse_commit()` turns the written range into its readable, reversed form.
//!
//! ```text
//!  0          read_ptr          write_end        capacity
//!  ├──consumed──┼────available────┼──────free──────┤
//! ```
//!
//! The buffer itself is not synchronized; the owning `Session` keeps it
//! behind its lock.

use std::fmt;

use crate::error::{Result, SessionError};

/// Fixed-capacity byte store with independent write and read cursors
///
/// # Example
///
/// ```
/// use reverser::Buffer;
///
/// let mut buffer = Buffer::allocate(8).unwrap();
/// assert_eq!(buffer.append(b"hello"), 5);
/// buffer.reverse_commit();
/// assert_eq!(buffer.drain(10), b"olleh");
/// ```
pub struct Buffer {
    store: Vec<u8>,
    write_end: usize,
    read_ptr: usize,
}

impl Buffer {
    /// Reserve `capacity` bytes of storage
    ///
    /// Zero capacity is accepted here; rejecting it is the job of the
    /// session that owns the buffer.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if the storage cannot be reserved.
    pub fn allocate(capacity: usize) -> Result<Self> {
        let mut store = Vec::new();
        store
            .try_reserve_exact(capacity)
            .map_err(|_| SessionError::OutOfMemory {
                requested: capacity,
            })?;
        store.resize(capacity, 0);

        Ok(Self {
            store,
            write_end: 0,
            read_ptr: 0,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.store.len()
    }

    /// Number of unread bytes
    #[must_use]
    pub fn available(&self) -> usize {
        self.write_end - self.read_ptr
    }

    /// Number of bytes that can still be appended
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.write_end
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Copy as many bytes as fit into the free space
    ///
    /// Returns the number of bytes actually copied, which is less than
    /// `bytes.len()` when the buffer fills up. Never blocks.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(self.remaining());
        let end = self.write_end + count;

        #[allow(clippy::indexing_slicing)]
        {
            self.store[self.write_end..end].copy_from_slice(&bytes[..count]);
        }
        self.write_end = end;

        self.check_invariants();
        count
    }

    /// Reverse `[0, write_end)` in place and rewind the reader to 0
    ///
    /// Committing twice without an append in between reverses the same
    /// range twice, which restores the original order.
    pub fn reverse_commit(&mut self) {
        #[allow(clippy::indexing_slicing)]
        {
            self.store[..self.write_end].reverse();
        }
        self.read_ptr = 0;

        self.check_invariants();
    }

    /// Copy up to `buf.len()` unread bytes into `buf` and advance the reader
    ///
    /// Returns 0 (not an error) when nothing is available.
    pub fn drain_into(&mut self, buf: &mut [u8]) -> usize {
        let count = self.available().min(buf.len());
        let end = self.read_ptr + count;

        // to_read <= available, so end <= write_end <= store.len()
        #[allow(clippy::indexing_slicing)]
        {
            buf[..count].copy_from_slice(&self.store[self.read_ptr..end]);
        }
        self.read_ptr = end;

        self.check_invariants();
        count
    }

    /// Take up to `max_len` unread bytes
    pub fn drain(&mut self, max_len: usize) -> Vec<u8> {
        let mut out = vec![0; max_len.min(self.available())];
        let n = self.drain_into(&mut out);
        out.truncate(n);
        out
    }

    /// Move the unread range to the front of the store
    ///
    /// Space already consumed by readers becomes writable again.
    pub fn reclaim(&mut self) {
        if self.read_ptr == 0 {
            return;
        }
        let unread = self.available();
        self.store.copy_within(self.read_ptr..self.write_end, 0);
        self.read_ptr = 0;
        self.write_end = unread;

        self.check_invariants();
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.read_ptr <= self.write_end && self.write_end <= self.store.len(),
            "buffer cursors out of order: {self:?}"
        );
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Buffer(capacity={}, read_ptr={}, write_end={})",
            self.store.len(),
            self.read_ptr,
            self.write_end
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = Buffer::allocate(16).unwrap();
        assert!(buffer.is_empty());
        assert_eq!(buffer.available(), 0);
        assert_eq!(buffer.remaining(), 16);
    }

    #[test]
    fn test_allocate_zero_capacity() {
        let mut buffer = Buffer::allocate(0).unwrap();
        assert_eq!(buffer.capacity(), 0);
        assert_eq!(buffer.append(b"x"), 0);
    }

    #[test]
    fn test_allocate_impossible_size() {
        let err = Buffer::allocate(usize::MAX).unwrap_err();
        assert_eq!(
            err,
            SessionError::OutOfMemory {
                requested: usize::MAX
            }
        );
    }

    #[test]
    fn test_append_short_write() {
        let mut buffer = Buffer::allocate(4).unwrap();
        assert_eq!(buffer.append(b"hello"), 4);
        assert_eq!(buffer.append(b"o"), 0);
        assert_eq!(buffer.available(), 4);
    }

    #[test]
    fn test_drain_before_commit_keeps_written_order() {
        let mut buffer = Buffer::allocate(8).unwrap();
        buffer.append(b"abc");
        assert_eq!(buffer.drain(8), b"abc");
    }

    #[test]
    fn test_reclaim_moves_unread_to_front() {
        let mut buffer = Buffer::allocate(4).unwrap();
        buffer.append(b"abcd");
        assert_eq!(buffer.drain(3), b"abc");
        assert_eq!(buffer.remaining(), 0);

        buffer.reclaim();
        assert_eq!(buffer.available(), 1);
        assert_eq!(buffer.remaining(), 3);
        assert_eq!(buffer.append(b"xyz"), 3);
        assert_eq!(buffer.drain(4), b"dxyz");
    }

    #[test]
    fn test_debug_format() {
        let mut buffer = Buffer::allocate(8).unwrap();
        buffer.append(b"ab");
        assert_eq!(
            format!("{buffer:?}"),
            "Buffer(capacity=8, read_ptr=0, write_end=2)"
        );
    }
}
