//! Heartbeat frame layout and checksum.

use crate::{NodeId, Result};

/// First sync byte.
pub const SYNC_A: u8 = 0xAA;

/// Second sync byte.
pub const SYNC_B: u8 = 0x55;

/// Encoded frame size in bytes.
pub const FRAME_LEN: usize = 5;

/// CRC-8 generator polynomial (x^8 + x^2 + x + 1).
pub const CRC8_POLY: u8 = 0x07;

/// Bit-at-a-time CRC-8, MSB first, initial value zero, no final XOR.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Encode a heartbeat frame.
///
/// Layout: `[0xAA, 0x55, sender_id, sequence, crc8(sender_id, sequence)]`.
#[inline]
pub fn encode(sender_id: u8, sequence: u8) -> [u8; FRAME_LEN] {
    [
        SYNC_A,
        SYNC_B,
        sender_id,
        sequence,
        crc8(&[sender_id, sequence]),
    ]
}

/// A validated heartbeat frame.
///
/// Frames are only materialized on the receive side once their checksum has
/// matched; the sync bytes and checksum are implied by the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatFrame {
    /// Raw sender identity byte.
    pub sender: u8,
    /// Sender's free-running sequence counter.
    pub sequence: u8,
}

impl HeartbeatFrame {
    /// Create a frame from a raw sender byte.
    pub fn new(sender: u8, sequence: u8) -> Self {
        Self { sender, sequence }
    }

    /// Create a frame sent by a known node.
    pub fn from_node(node: NodeId, sequence: u8) -> Self {
        Self::new(node.to_byte(), sequence)
    }

    /// The sender as a node identity.
    pub fn sender_node(&self) -> Result<NodeId> {
        NodeId::from_byte(self.sender)
    }

    /// Checksum carried in byte 4.
    pub fn checksum(&self) -> u8 {
        crc8(&[self.sender, self.sequence])
    }

    /// Serialize to the 5-byte wire format.
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        encode(self.sender, self.sequence)
    }
}
