#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

//! # bus-failover
//!
//! Failover coordination for two redundant controllers sharing one bus.
//!
//! Two identically programmed nodes, `A` and `B`, are wired to a shared bus
//! through one relay each; only one relay may ever be closed. The nodes
//! exchange heartbeat frames over a dedicated point-to-point UART. Node `A`
//! owns the bus from boot. If node `B` stops hearing `A` for longer than the
//! peer timeout it takes the bus over, and it keeps the bus even if `A`
//! comes back, so ownership never flaps.
//!
//! ## Features
//!
//! - **Heartbeat protocol**: 5-byte frames with two sync bytes and a CRC-8,
//!   parsed from an unframed byte stream with automatic resynchronization
//! - **Liveness**: wraparound-safe timeouts on a `u32` millisecond clock
//! - **Break-before-make**: both relays are released and the bus is given
//!   time to settle before the new owner's relay closes
//! - **Deterministic roles**: static primary/secondary precedence, no
//!   election protocol
//! - **Hardware-agnostic**: written against small capability traits in
//!   [`hal`], with in-memory implementations in [`sim`]
//! - **`no_std`**: the core needs neither `std` nor an allocator
//!
//! ## Quick Start
//!
//! ```
//! use bus_failover::{BusOwner, FailoverConfig, Node, NodeId, Result};
//! use bus_failover::sim::{ManualClock, MemorySerial, RecordingLines};
//!
//! fn main() -> Result<()> {
//!     let (wire_a, wire_b) = MemorySerial::pair();
//!     let clock = ManualClock::new(0);
//!
//!     let mut a = Node::boot(
//!         FailoverConfig::new(NodeId::A),
//!         wire_a,
//!         RecordingLines::new(),
//!         clock.clone(),
//!         clock.clone(),
//!     )?;
//!     let mut b = Node::boot(
//!         FailoverConfig::new(NodeId::B),
//!         wire_b,
//!         RecordingLines::new(),
//!         clock.clone(),
//!         clock.clone(),
//!     )?;
//!
//!     for _ in 0..100 {
//!         a.tick();
//!         b.tick();
//!         clock.advance(10);
//!     }
//!     assert_eq!(a.owner(), BusOwner::A);
//!     assert_eq!(b.owner(), BusOwner::Unowned);
//!     assert!(b.peer_alive());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`heartbeat`] | Frame codec and streaming link |
//! | [`arbitrator`] | Exclusive bus ownership with break-before-make |
//! | [`controller`] | Role state machine |
//! | [`node`] | Top-level per-node context |
//! | [`config`] | Static configuration and validation |
//! | [`hal`] | Hardware capability traits |
//! | [`sim`] | In-memory hardware (requires `alloc`) |
//! | [`time`] | Wraparound-safe clock arithmetic |
//! | [`error`] | Error types and [`Result`] alias |
//!
//! ## Operator Preconditions
//!
//! The two nodes must be configured with different identities. A node that
//! receives a heartbeat carrying its own identity latches an identity
//! conflict and, while standing by, refuses to take the bus over.

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod arbitrator;
pub mod config;
pub mod controller;
pub mod error;
pub mod hal;
pub mod heartbeat;
pub mod node;
#[cfg(feature = "alloc")]
pub mod sim;
pub mod time;

mod types;

// Re-export commonly used types at the crate root
pub use arbitrator::BusArbitrator;
pub use config::FailoverConfig;
pub use controller::{FailoverController, FailoverEvent};
pub use error::{Error, Result};
pub use heartbeat::{HeartbeatFrame, HeartbeatLink, LinkStats};
pub use node::{Node, NodeStatus};
pub use types::{BusOwner, Line, NodeId, RoleState};
