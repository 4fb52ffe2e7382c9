//! Heartbeat wire protocol.
//!
//! Each node transmits a fixed 5-byte frame on a point-to-point UART at a
//! fixed period and listens for its peer's frames on the same link.
//!
//! # Frame Layout
//!
//! | Byte | Content |
//! |------|---------|
//! | 0 | sync `0xAA` |
//! | 1 | sync `0x55` |
//! | 2 | sender identity (`b'A'` or `b'B'`) |
//! | 3 | sequence counter (wraps, not validated) |
//! | 4 | CRC-8 (poly `0x07`, init `0`) over bytes 2..4 |
//!
//! There is no length field and no escaping: a receiver hunting through noise
//! resynchronizes on the two sync bytes alone and relies on the CRC to reject
//! false matches.
//!
//! # Example
//!
//! ```
//! use bus_failover::NodeId;
//! use bus_failover::heartbeat::{HeartbeatFrame, HeartbeatLink};
//! use bus_failover::sim::MemorySerial;
//!
//! let mut link = HeartbeatLink::new(MemorySerial::new());
//! for b in HeartbeatFrame::from_node(NodeId::A, 7).to_bytes() {
//!     link.consume_byte(b, 1_000);
//! }
//! assert_eq!(link.peer_id(), Some(b'A'));
//! assert!(link.is_peer_alive(2_000, 2_000));
//! ```

pub mod frame;
mod link;

pub use frame::{CRC8_POLY, FRAME_LEN, HeartbeatFrame, SYNC_A, SYNC_B, crc8, encode};
pub use link::{HeartbeatLink, LinkStats};
