//! Transport abstraction over the serial link.
//!
//! The controller speaks over RS-232/USB-CDC or a serial-over-TCP
//! bridge. The protocol layer only needs two primitives: write a request
//! frame, and read bytes up to and including the `\r` delimiter. How the
//! link is opened (port path, baud rate, network address) is the
//! transport's business, configured through [`crate::config`].
//!
//! `read_until` returns an *empty* buffer when no data arrives within
//! the transport's timeout. For ordinary exchanges the caller treats
//! that as a malformed (or, mid-sequence, fatal) condition; for the
//! ad-hoc drain it is the regular termination signal.

use async_trait::async_trait;

use crate::error::Result;

#[cfg(feature = "serial")]
mod serial;
mod tcp;

pub mod mock;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use mock::MockTransport;

/// Reply delimiter on the wire.
pub const DELIMITER: u8 = b'\r';

/// Byte-level access to the device link.
///
/// Exclusively owned by one session; the protocol is strictly
/// half-duplex with one outstanding request, so implementations need no
/// internal locking.
#[async_trait]
pub trait Transport: Send {
    /// Write the whole buffer to the link.
    async fn write_all(&mut self, buf: &[u8]) -> Result<()>;

    /// Read bytes up to and including `delimiter`.
    ///
    /// Returns an empty buffer when no data is currently available
    /// (i.e. nothing arrived within the configured timeout before the
    /// first byte).
    async fn read_until(&mut self, delimiter: u8) -> Result<Vec<u8>>;
}
