//! Open device file: the transport between callers and a session
//!
//! Moves bytes between an external caller and its `Session`, passing the
//! session's errors through unchanged. The file is not seekable.

use crate::error::{Result, SessionError};
use crate::interrupt::Interrupt;
use crate::session::{ReadMode, Session};

/// Flags given at open time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Reads fail with `WouldBlock` instead of waiting (`O_NONBLOCK`)
    pub nonblock: bool,
}

impl OpenFlags {
    #[must_use]
    pub fn nonblocking() -> Self {
        Self { nonblock: true }
    }

    fn read_mode(self) -> ReadMode {
        if self.nonblock {
            ReadMode::NonBlocking
        } else {
            ReadMode::Blocking
        }
    }
}

/// Convert a transfer result to a syscall-style return value
///
/// Byte counts stay positive, errors become `-errno`.
#[must_use]
pub fn syscall_ret(result: Result<usize>) -> isize {
    match result {
        Ok(n) => n.cast_signed(),
        Err(e) => -(e.errno() as isize),
    }
}

/// An open handle on the reverse device
///
/// Dropping the file closes its session if `release()` was not called.
pub struct DeviceFile {
    session: Session,
    flags: OpenFlags,
    interrupt: Interrupt,
}

impl DeviceFile {
    pub(crate) fn new(session: Session, flags: OpenFlags) -> Self {
        Self {
            session,
            flags,
            interrupt: Interrupt::new(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    /// Signal used to cancel a pending blocking read on this file
    #[must_use]
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt.clone()
    }

    /// Write bytes; returns how many were accepted
    ///
    /// # Errors
    ///
    /// `InvalidState` after `release()`.
    pub fn write(&self, src: &[u8]) -> Result<usize> {
        self.session.write(src)
    }

    /// Write the first `count` bytes of `src`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `count` exceeds `src.len()`, otherwise as `write()`.
    pub fn write_user(&self, src: &[u8], count: usize) -> Result<usize> {
        let src = src.get(..count).ok_or(SessionError::InvalidArgument)?;
        self.write(src)
    }

    /// Read reversed bytes into `dst`
    ///
    /// Waits for data unless the file was opened non-blocking. An
    /// interrupt that cancels the read is consumed, so the caller may retry;
    /// one raised while data is available stays pending for the next read
    /// that has to wait.
    ///
    /// # Errors
    ///
    /// `WouldBlock`, `Interrupted`, `Closed` or `InvalidState`, see
    /// `Session::read_interruptible`.
    pub async fn read(&self, dst: &mut [u8]) -> Result<usize> {
        let bytes = self
            .session
            .read_interruptible(dst.len(), self.flags.read_mode(), &self.interrupt)
            .await?;

        #[allow(clippy::indexing_slicing)]
        dst[..bytes.len()].copy_from_slice(&bytes);
        Ok(bytes.len())
    }

    /// Read into the first `count` bytes of `dst`
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `count` exceeds `dst.len()`, otherwise as `read()`.
    pub async fn read_user(&self, dst: &mut [u8], count: usize) -> Result<usize> {
        let dst = dst.get_mut(..count).ok_or(SessionError::InvalidArgument)?;
        self.read(dst).await
    }

    /// Read from a plain thread, parking it while the read waits
    ///
    /// # Errors
    ///
    /// As `read()`.
    pub fn read_blocking(&self, dst: &mut [u8]) -> Result<usize> {
        futures::executor::block_on(self.read(dst))
    }

    /// Close the session; call once when the caller disconnects
    ///
    /// # Errors
    ///
    /// `InvalidState` if the file was already released.
    pub fn release(&self) -> Result<()> {
        self.session.close()
    }
}

impl std::fmt::Debug for DeviceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DeviceFile(flags={:?}, session={:?})",
            self.flags, self.session
        )
    }
}

// Implement embedded_io traits
impl embedded_io::ErrorType for DeviceFile {
    type Error = SessionError;
}

// The trait contract wants an empty read to return at once, even on an
// empty session
impl embedded_io::Read for DeviceFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        DeviceFile::read_blocking(self, buf)
    }
}

impl embedded_io::Write for DeviceFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        DeviceFile::write(self, buf)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl embedded_io_async::Read for DeviceFile {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        DeviceFile::read(self, buf).await
    }
}

impl embedded_io_async::Write for DeviceFile {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        DeviceFile::write(self, buf)
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syscall_ret() {
        assert_eq!(syscall_ret(Ok(5)), 5);
        assert_eq!(syscall_ret(Err(SessionError::WouldBlock)), -11);
        assert_eq!(syscall_ret(Err(SessionError::InvalidState)), -9);
    }

    #[test]
    fn test_trait_read_into_empty_buffer_returns_at_once() {
        let queue = crate::NotificationQueueArc::new();
        let session = Session::open(8, crate::Handle::new(1), queue).unwrap();
        let mut file = DeviceFile::new(session, OpenFlags::default());

        assert_eq!(embedded_io::Read::read(&mut file, &mut []), Ok(0));
        let pending = embedded_io_async::Read::read(&mut file, &mut []);
        assert_eq!(futures::executor::block_on(pending), Ok(0));
    }

    #[test]
    fn test_read_mode_from_flags() {
        assert_eq!(OpenFlags::default().read_mode(), ReadMode::Blocking);
        assert_eq!(OpenFlags::nonblocking().read_mode(), ReadMode::NonBlocking);
    }
}
