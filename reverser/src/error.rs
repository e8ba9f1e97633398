//! Error types for the reverser device
//!
//! Every failed call reports exactly one `SessionError`. The transport maps
//! them further to errno values (POSIX-style callers) or to
//! `embedded_io::ErrorKind` (trait-based callers).

/// Result alias for session and buffer operations
pub type Result<T> = std::result::Result<T, SessionError>;

pub const EINTR: i32 = 4;
pub const EBADF: i32 = 9;
pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const EINVAL: i32 = 22;
pub const EPIPE: i32 = 32;

/// Errors reported by a session and its buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Malformed call parameters, e.g. a count larger than the passed buffer
    #[error("invalid argument")]
    InvalidArgument,

    /// Capacity of zero requested at session open
    #[error("invalid capacity: buffer size must be greater than zero")]
    InvalidCapacity,

    /// Buffer storage could not be reserved
    #[error("out of memory: cannot reserve {requested} bytes")]
    OutOfMemory { requested: usize },

    /// Non-blocking read with no data available
    #[error("operation would block")]
    WouldBlock,

    /// Blocking read cancelled before data arrived
    #[error("interrupted")]
    Interrupted,

    /// Blocking read woken by session teardown
    #[error("session closed")]
    Closed,

    /// Operation attempted after `close()`
    #[error("invalid state: session is closed")]
    InvalidState,
}

impl SessionError {
    /// POSIX errno for this error (positive value)
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument | Self::InvalidCapacity => EINVAL,
            Self::OutOfMemory { .. } => ENOMEM,
            Self::WouldBlock => EAGAIN,
            Self::Interrupted => EINTR,
            Self::Closed => EPIPE,
            Self::InvalidState => EBADF,
        }
    }
}

impl embedded_io::Error for SessionError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Self::InvalidArgument | Self::InvalidCapacity => embedded_io::ErrorKind::InvalidInput,
            Self::OutOfMemory { .. } => embedded_io::ErrorKind::OutOfMemory,
            Self::Interrupted => embedded_io::ErrorKind::Interrupted,
            Self::Closed => embedded_io::ErrorKind::BrokenPipe,
            Self::InvalidState => embedded_io::ErrorKind::NotConnected,
            // embedded-io has no "would block" kind
            Self::WouldBlock => embedded_io::ErrorKind::Other,
        }
    }
}

/// Errors reported by the device host
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::Error as _;

    #[test]
    fn test_errno_mapping() {
        assert_eq!(SessionError::WouldBlock.errno(), EAGAIN);
        assert_eq!(SessionError::Interrupted.errno(), EINTR);
        assert_eq!(SessionError::Closed.errno(), EPIPE);
        assert_eq!(SessionError::InvalidState.errno(), EBADF);
        assert_eq!(SessionError::InvalidArgument.errno(), EINVAL);
        assert_eq!(SessionError::OutOfMemory { requested: 1 }.errno(), ENOMEM);
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            SessionError::Interrupted.kind(),
            embedded_io::ErrorKind::Interrupted
        );
        assert_eq!(
            SessionError::Closed.kind(),
            embedded_io::ErrorKind::BrokenPipe
        );
        assert_eq!(
            SessionError::InvalidArgument.kind(),
            embedded_io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_device_error_wraps_session_error() {
        let err = DeviceError::from(SessionError::InvalidCapacity);
        assert_eq!(
            err.to_string(),
            "invalid capacity: buffer size must be greater than zero"
        );
    }
}
