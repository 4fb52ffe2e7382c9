//! Error types for failover operations.
//!
//! This module defines the [`Error`] enum. The coordination loop itself never
//! fails: transport noise is discarded and peer silence is handled by the role
//! state machine. Errors only arise when a node is configured or when a
//! hardware capability reports a failure.
//!
//! # Example
//!
//! ```
//! use bus_failover::{Error, FailoverConfig, NodeId};
//!
//! let config = FailoverConfig::new(NodeId::B).with_send_period_ms(0);
//! match config.validate() {
//!     Err(Error::ZeroSendPeriod) => {}
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use core::fmt;

#[cfg(feature = "alloc")]
use alloc::string::String;

/// Errors that can occur while configuring or driving a failover node.
#[derive(Debug)]
pub enum Error {
    /// The outbound heartbeat period is zero.
    ZeroSendPeriod,

    /// The peer timeout does not exceed the heartbeat period.
    ///
    /// With such a window a healthy peer would be declared dead between two
    /// consecutive heartbeats.
    TimeoutTooShort {
        /// Configured peer timeout in milliseconds
        timeout_ms: u32,
        /// Configured heartbeat period in milliseconds
        send_period_ms: u32,
    },

    /// The post-takeover settle delay is zero.
    ZeroTakeoverSettle,

    /// Bytes arriving during one break-before-make stall would overflow the
    /// serial receive buffer.
    ReceiveBufferOverrun {
        /// Worst-case number of bytes received while the loop is stalled
        incoming_bytes: u32,
        /// Capacity of the receive buffer in bytes
        capacity: u32,
    },

    /// A byte on the wire does not name a known node identity.
    UnknownNodeId(u8),

    /// The serial transport refused an outbound write.
    SerialWrite {
        /// Number of bytes the caller attempted to write
        attempted: usize,
    },

    /// Failed to render a status snapshot.
    #[cfg(feature = "alloc")]
    SerializationError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroSendPeriod => write!(f, "Heartbeat send period must be non-zero"),
            Error::TimeoutTooShort {
                timeout_ms,
                send_period_ms,
            } => write!(
                f,
                "Peer timeout of {timeout_ms} ms must exceed the heartbeat period of {send_period_ms} ms"
            ),
            Error::ZeroTakeoverSettle => write!(f, "Takeover settle delay must be non-zero"),
            Error::ReceiveBufferOverrun {
                incoming_bytes,
                capacity,
            } => write!(
                f,
                "Receive buffer overrun: {incoming_bytes} bytes may arrive during break-before-make, buffer holds {capacity}"
            ),
            Error::UnknownNodeId(b) => write!(f, "Unknown node identity byte {b:#04x}"),
            Error::SerialWrite { attempted } => {
                write!(f, "Serial write of {attempted} bytes failed")
            }
            #[cfg(feature = "alloc")]
            Error::SerializationError(s) => write!(f, "Status serialization error: {s}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// A specialized Result type for failover operations.
pub type Result<T> = core::result::Result<T, Error>;
