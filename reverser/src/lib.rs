//! In-memory phrase reverser device
//!
//! Bytes written to a session are stored in a bounded buffer and handed to
//! readers in reverse order. Readers wait until data is available.
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  ReverseDevice (host)               │
//! │  - buffer size configuration        │
//! │  - opens DeviceFile per caller      │
//! └─────────────────────────────────────┘
//!          │ one Session per open
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Session (coordination layer)       │
//! │  - notification queue               │
//! │  - async readers waiting for writer │
//! └─────────────────────────────────────┘
//!          │ owns exactly one
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  Buffer (storage)                   │
//! │  - append() / drain()               │
//! │  - reverse_commit()                 │
//! └─────────────────────────────────────┘
//! ```

pub mod buffer;
pub mod device;
pub mod error;
pub mod file;
pub mod idgen;
pub mod interrupt;
pub mod notification_queue;
pub mod session;

pub use buffer::Buffer;
pub use device::{DeviceConfig, ReverseDevice};
pub use error::{DeviceError, SessionError};
pub use file::{DeviceFile, OpenFlags};
pub use idgen::{Handle, IdGen};
pub use interrupt::Interrupt;
pub use notification_queue::NotificationQueueArc;
pub use session::{ReadMode, Session, SessionState};
