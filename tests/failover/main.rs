//! Failover integration test module
//!
//! This module contains end-to-end tests driving whole nodes through
//! simulated hardware:
//! - `end_to_end`: a standby node watching a scripted primary
//! - `two_nodes`: two real nodes cross-wired through an in-memory UART
//! - `board`: relay polarity and receive-buffer sizing

mod board;
mod two_nodes;

use bus_failover::hal::Clock;
use bus_failover::heartbeat::encode;
use bus_failover::sim::{ManualClock, MemorySerial, RecordingLines};
use bus_failover::{FailoverConfig, Node, NodeId, Result};

pub type SimNode = Node<MemorySerial, RecordingLines, ManualClock, ManualClock>;

/// Route library logs to the test harness output.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Boot a node on simulated hardware sharing `clock`.
pub fn boot_node(config: FailoverConfig, serial: MemorySerial, clock: &ManualClock) -> Result<SimNode> {
    Node::boot(
        config,
        serial,
        RecordingLines::with_clock(clock.clone()),
        clock.clone(),
        clock.clone(),
    )
}

/// A scripted peer that injects heartbeats into a node's receive buffer.
pub struct FakePeer {
    pub id: u8,
    pub period_ms: u32,
    next_at: u32,
    sequence: u8,
    silent: bool,
    pub frames_sent: usize,
}

impl FakePeer {
    pub fn new(id: NodeId, period_ms: u32, first_at: u32) -> Self {
        Self {
            id: id.to_byte(),
            period_ms,
            next_at: first_at,
            sequence: 0,
            silent: false,
            frames_sent: 0,
        }
    }

    /// Stop sending, as if the peer lost power.
    pub fn go_silent(&mut self) {
        self.silent = true;
    }

    /// Resume sending from `now`.
    pub fn resume(&mut self, now: u32) {
        self.silent = false;
        self.next_at = now;
    }

    /// Emit every frame due at or before `now`.
    pub fn step(&mut self, now: u32, wire: &MemorySerial) {
        if self.silent {
            return;
        }
        while now.wrapping_sub(self.next_at) < u32::MAX / 2 {
            wire.inject(&encode(self.id, self.sequence));
            self.sequence = self.sequence.wrapping_add(1);
            self.frames_sent += 1;
            self.next_at = self.next_at.wrapping_add(self.period_ms);
        }
    }
}

/// Tick `node` every millisecond until the clock reaches `until`, letting
/// `peer` inject its frames before each tick.
pub fn run_until(
    node: &mut SimNode,
    clock: &ManualClock,
    wire: &MemorySerial,
    peer: &mut FakePeer,
    until: u32,
) {
    while clock.now_ms() < until {
        peer.step(clock.now_ms(), wire);
        node.tick();
        clock.advance(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_peer_schedule() {
        let wire = MemorySerial::new();
        let mut peer = FakePeer::new(NodeId::A, 500, 1000);

        peer.step(999, &wire);
        assert_eq!(peer.frames_sent, 0);
        peer.step(1000, &wire);
        assert_eq!(peer.frames_sent, 1);
        // A jump catches up on every missed period
        peer.step(2600, &wire);
        assert_eq!(peer.frames_sent, 4);
        assert_eq!(wire.pending_rx(), 20);

        peer.go_silent();
        peer.step(10_000, &wire);
        assert_eq!(peer.frames_sent, 4);
        peer.resume(10_000);
        peer.step(10_000, &wire);
        assert_eq!(peer.frames_sent, 5);
    }
}
