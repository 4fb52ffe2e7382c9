//! Static node configuration.
//!
//! A [`FailoverConfig`] is fixed at build or boot time and never changes while
//! the node runs. The defaults match the timing used on the reference
//! hardware: a 250 ms heartbeat, a 2 s peer timeout and a 30 ms relay
//! break-before-make interval on a 115200 baud link, with active-low relay
//! inputs.
//!
//! # Example
//!
//! ```
//! use bus_failover::{FailoverConfig, NodeId};
//!
//! let config = FailoverConfig::new(NodeId::B)
//!     .with_send_period_ms(100)
//!     .with_peer_timeout_ms(800);
//! config.validate()?;
//! # Ok::<(), bus_failover::Error>(())
//! ```

use crate::hal::RelayPolarity;
use crate::heartbeat::FRAME_LEN;
use crate::{Error, NodeId, Result};

/// Default outbound heartbeat period.
pub const DEFAULT_SEND_PERIOD_MS: u32 = 250;
/// Default peer timeout.
pub const DEFAULT_PEER_TIMEOUT_MS: u32 = 2000;
/// Default bus settle delay after a takeover claim.
pub const DEFAULT_TAKEOVER_SETTLE_MS: u32 = 200;
/// Default hold duration after a takeover.
pub const DEFAULT_TAKEOVER_HOLD_MS: u32 = 5000;
/// Default relay break-before-make interval.
pub const DEFAULT_BREAK_BEFORE_MAKE_MS: u32 = 30;
/// Default heartbeat link baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Default serial receive buffer size.
pub const DEFAULT_RX_BUFFER_BYTES: u32 = 512;

/// Bits on the wire per byte for an 8N1 UART (start + 8 data + stop).
const BITS_PER_BYTE: u64 = 10;

/// Configuration of one failover node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailoverConfig {
    /// Identity of this node.
    pub node_id: NodeId,
    /// Interval between outbound heartbeats.
    pub send_period_ms: u32,
    /// Silence after which the peer is considered dead.
    pub peer_timeout_ms: u32,
    /// Time spent in `TakingOver` before becoming `ActiveAfterTakeover`.
    pub takeover_settle_ms: u32,
    /// Hold time after a takeover before the reintegration decision point.
    pub takeover_hold_ms: u32,
    /// Interval with both lines released during an ownership change.
    pub break_before_make_ms: u32,
    /// Heartbeat link baud rate.
    pub baud_rate: u32,
    /// Capacity of the serial receive buffer in bytes.
    pub rx_buffer_bytes: u32,
    /// Pin level that closes a bus relay, for boards driven through
    /// [`crate::hal::RelayDriver`].
    pub relay_polarity: RelayPolarity,
}

impl FailoverConfig {
    /// Create a configuration with default timing for the given identity.
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            send_period_ms: DEFAULT_SEND_PERIOD_MS,
            peer_timeout_ms: DEFAULT_PEER_TIMEOUT_MS,
            takeover_settle_ms: DEFAULT_TAKEOVER_SETTLE_MS,
            takeover_hold_ms: DEFAULT_TAKEOVER_HOLD_MS,
            break_before_make_ms: DEFAULT_BREAK_BEFORE_MAKE_MS,
            baud_rate: DEFAULT_BAUD_RATE,
            rx_buffer_bytes: DEFAULT_RX_BUFFER_BYTES,
            relay_polarity: RelayPolarity::ActiveLow,
        }
    }

    /// Set the outbound heartbeat period.
    pub fn with_send_period_ms(mut self, ms: u32) -> Self {
        self.send_period_ms = ms;
        self
    }

    /// Set the peer timeout.
    pub fn with_peer_timeout_ms(mut self, ms: u32) -> Self {
        self.peer_timeout_ms = ms;
        self
    }

    /// Set the post-takeover settle delay.
    pub fn with_takeover_settle_ms(mut self, ms: u32) -> Self {
        self.takeover_settle_ms = ms;
        self
    }

    /// Set the post-takeover hold duration.
    pub fn with_takeover_hold_ms(mut self, ms: u32) -> Self {
        self.takeover_hold_ms = ms;
        self
    }

    /// Set the break-before-make interval.
    pub fn with_break_before_make_ms(mut self, ms: u32) -> Self {
        self.break_before_make_ms = ms;
        self
    }

    /// Set the link baud rate and receive buffer size.
    pub fn with_serial(mut self, baud_rate: u32, rx_buffer_bytes: u32) -> Self {
        self.baud_rate = baud_rate;
        self.rx_buffer_bytes = rx_buffer_bytes;
        self
    }

    /// Set the relay polarity.
    pub fn with_relay_polarity(mut self, polarity: RelayPolarity) -> Self {
        self.relay_polarity = polarity;
        self
    }

    /// Worst-case number of bytes that can arrive while the control loop is
    /// stalled in a break-before-make interval.
    ///
    /// Assumes the line is saturated, so noise bursts are covered as well as
    /// heartbeat traffic. Never less than one full frame.
    pub fn bytes_during_stall(&self) -> u32 {
        let bytes_per_stall = (self.baud_rate as u64 * self.break_before_make_ms as u64)
            .div_ceil(BITS_PER_BYTE * 1000);
        bytes_per_stall.max(FRAME_LEN as u64).min(u32::MAX as u64) as u32
    }

    /// Check the configuration for values that would break the protocol.
    ///
    /// Identity clashes between the two nodes cannot be seen from one side;
    /// they are caught at runtime by the controller's identity self-check.
    pub fn validate(&self) -> Result<()> {
        if self.send_period_ms == 0 {
            return Err(Error::ZeroSendPeriod);
        }
        if self.peer_timeout_ms <= self.send_period_ms {
            return Err(Error::TimeoutTooShort {
                timeout_ms: self.peer_timeout_ms,
                send_period_ms: self.send_period_ms,
            });
        }
        if self.takeover_settle_ms == 0 {
            return Err(Error::ZeroTakeoverSettle);
        }
        let incoming_bytes = self.bytes_during_stall();
        if incoming_bytes > self.rx_buffer_bytes {
            return Err(Error::ReceiveBufferOverrun {
                incoming_bytes,
                capacity: self.rx_buffer_bytes,
            });
        }
        Ok(())
    }
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self::new(NodeId::A)
    }
}
