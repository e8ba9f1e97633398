//! Device host: configuration, registration, and opening sessions

use crate::error::DeviceError;
use crate::file::{DeviceFile, OpenFlags};
use crate::idgen::IdGen;
use crate::notification_queue::NotificationQueueArc;
use crate::session::Session;

/// Environment variable with the per-session buffer size in bytes
pub const BUFFER_SIZE_ENV: &str = "REVERSE_BUFFER_SIZE";

pub const DEFAULT_BUFFER_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Internal buffer size of every session
    pub buffer_size: usize,
}

impl DeviceConfig {
    /// Read the configuration from `REVERSE_BUFFER_SIZE`
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the variable is set but is not an unsigned integer.
    pub fn from_env() -> Result<Self, DeviceError> {
        Self::from_value(std::env::var(BUFFER_SIZE_ENV).ok().as_deref())
    }

    /// Build the configuration from an optional textual buffer size
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the value is not an unsigned integer.
    pub fn from_value(value: Option<&str>) -> Result<Self, DeviceError> {
        let Some(value) = value else {
            return Ok(Self::default());
        };
        let buffer_size = value.trim().parse::<usize>().map_err(|e| {
            DeviceError::InvalidConfig(format!("{BUFFER_SIZE_ENV}={value:?}: {e}"))
        })?;
        Ok(Self { buffer_size })
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// A registered reverse device
///
/// Each `open()` creates an independent session with its own buffer.
/// Unregisters (logs) on drop.
pub struct ReverseDevice {
    config: DeviceConfig,
    queue: NotificationQueueArc,
    idgen: IdGen,
}

impl ReverseDevice {
    /// Register the device
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the buffer size is zero.
    pub fn register(config: DeviceConfig) -> Result<Self, DeviceError> {
        if config.buffer_size == 0 {
            return Err(DeviceError::InvalidConfig(
                "buffer size must be greater than zero".to_string(),
            ));
        }
        log::info!(
            "reverse device has been registered, buffer size is {} bytes",
            config.buffer_size
        );
        Ok(Self {
            config,
            queue: NotificationQueueArc::new(),
            idgen: IdGen::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Open a new session on the device
    ///
    /// # Errors
    ///
    /// `Session(OutOfMemory)` if the session buffer cannot be allocated.
    pub fn open(&self, flags: OpenFlags) -> Result<DeviceFile, DeviceError> {
        let handle = self.idgen.next_handle();
        let session = Session::open(self.config.buffer_size, handle, self.queue.clone())?;
        Ok(DeviceFile::new(session, flags))
    }
}

impl std::fmt::Debug for ReverseDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReverseDevice(buffer_size={})", self.config.buffer_size)
    }
}

impl Drop for ReverseDevice {
    fn drop(&mut self) {
        log::info!("reverse device has been unregistered");
    }
}
