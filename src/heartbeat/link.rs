//! Streaming heartbeat receiver and sender.

use super::frame::{FRAME_LEN, HeartbeatFrame, SYNC_A, SYNC_B, crc8, encode};
use crate::hal::SerialLink;
use crate::time::age_ms;
use crate::{NodeId, Result};

/// Outcome of feeding one byte to the frame assembler.
enum Advance {
    /// The byte was absorbed; the frame is incomplete.
    Pending,
    /// The byte completed a frame with a matching checksum.
    Accepted(HeartbeatFrame),
    /// The current candidate is not a frame.
    Rejected,
}

/// Counters describing link quality.
///
/// These are diagnostics only; liveness is decided solely by the timestamp of
/// the last accepted frame. All counters wrap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkStats {
    /// Frames that passed the CRC check.
    pub frames_accepted: u32,
    /// Complete frames discarded because of a CRC mismatch.
    pub crc_errors: u32,
    /// Bytes thrown away while hunting for the sync sequence.
    pub discarded_bytes: u32,
    /// Frames handed to the transport.
    pub frames_sent: u32,
    /// Frames the transport refused.
    pub send_errors: u32,
}

/// Heartbeat link state for one node.
///
/// Owns the serial transport, turns its unframed byte stream into validated
/// frames and tracks when and from whom the last one arrived.
///
/// The receive side is a five-step assembler keyed on how many bytes of the
/// current candidate have been captured:
///
/// | Captured | Waiting for |
/// |----------|-------------|
/// | 0 | sync `0xAA` |
/// | 1 | sync `0x55` |
/// | 2 | sender id |
/// | 3 | sequence |
/// | 4 | checksum |
///
/// When a candidate is rejected (wrong second sync byte or CRC mismatch) the
/// assembler re-arms and rescans the bytes that followed the false `0xAA`, so
/// a real frame overlapping a false start is not lost.
pub struct HeartbeatLink<S: SerialLink> {
    serial: S,
    capture: [u8; FRAME_LEN],
    captured: usize,
    peer_id: Option<u8>,
    last_valid_rx_ms: Option<u32>,
    tx_sequence: u8,
    stats: LinkStats,
}

impl<S: SerialLink> HeartbeatLink<S> {
    /// Create a link over the given transport. No peer has been seen yet.
    pub fn new(serial: S) -> Self {
        Self {
            serial,
            capture: [0; FRAME_LEN],
            captured: 0,
            peer_id: None,
            last_valid_rx_ms: None,
            tx_sequence: 0,
            stats: LinkStats::default(),
        }
    }

    /// Feed one received byte to the parser.
    ///
    /// Returns the frame if this byte completed a frame whose checksum
    /// matched. Mismatching frames are dropped without a report.
    pub fn consume_byte(&mut self, b: u8, now_ms: u32) -> Option<HeartbeatFrame> {
        match self.advance(b) {
            Advance::Pending => None,
            Advance::Accepted(frame) => {
                self.peer_id = Some(frame.sender);
                self.last_valid_rx_ms = Some(now_ms);
                self.stats.frames_accepted = self.stats.frames_accepted.wrapping_add(1);
                log::trace!(
                    "heartbeat rx id={:#04x} seq={} at {now_ms}",
                    frame.sender,
                    frame.sequence
                );
                Some(frame)
            }
            Advance::Rejected => {
                self.resync(b);
                None
            }
        }
    }

    fn advance(&mut self, b: u8) -> Advance {
        match self.captured {
            0 => {
                if b == SYNC_A {
                    self.push(b);
                } else {
                    self.stats.discarded_bytes = self.stats.discarded_bytes.wrapping_add(1);
                }
                Advance::Pending
            }
            1 => {
                if b == SYNC_B {
                    self.push(b);
                    Advance::Pending
                } else {
                    Advance::Rejected
                }
            }
            2 | 3 => {
                self.push(b);
                Advance::Pending
            }
            _ => {
                let (id, seq) = (self.capture[2], self.capture[3]);
                if b == crc8(&[id, seq]) {
                    self.captured = 0;
                    Advance::Accepted(HeartbeatFrame::new(id, seq))
                } else {
                    self.stats.crc_errors = self.stats.crc_errors.wrapping_add(1);
                    log::trace!("heartbeat crc mismatch id={id:#04x} seq={seq}");
                    Advance::Rejected
                }
            }
        }
    }

    #[inline]
    fn push(&mut self, b: u8) {
        self.capture[self.captured] = b;
        self.captured += 1;
    }

    /// Drop the false sync byte and rescan everything captured after it,
    /// followed by the byte that caused the rejection.
    fn resync(&mut self, last: u8) {
        let mut tail = [0u8; FRAME_LEN];
        let n = self.captured - 1;
        tail[..n].copy_from_slice(&self.capture[1..self.captured]);
        tail[n] = last;

        self.captured = 0;
        self.stats.discarded_bytes = self.stats.discarded_bytes.wrapping_add(1);

        // At most four bytes are rescanned, so no frame can complete here.
        for &b in &tail[..=n] {
            if matches!(self.advance(b), Advance::Rejected) {
                self.captured = 0;
                self.stats.discarded_bytes = self.stats.discarded_bytes.wrapping_add(1);
                self.advance(b);
            }
        }
    }

    /// Drain every byte currently buffered by the transport.
    ///
    /// Returns the number of frames accepted.
    pub fn poll(&mut self, now_ms: u32) -> usize {
        self.poll_with(now_ms, |_| {})
    }

    /// Like [`Self::poll`], but calls `on_frame` for every accepted frame.
    pub fn poll_with<F>(&mut self, now_ms: u32, mut on_frame: F) -> usize
    where
        F: FnMut(&HeartbeatFrame),
    {
        let mut accepted = 0;
        while let Some(b) = self.serial.read_byte() {
            if let Some(frame) = self.consume_byte(b, now_ms) {
                on_frame(&frame);
                accepted += 1;
            }
        }
        accepted
    }

    /// Transmit one heartbeat carrying the next sequence number.
    ///
    /// The sequence advances even if the transport refuses the write, so a
    /// receiver logging sequences sees the gap.
    pub fn send(&mut self, own_id: NodeId, now_ms: u32) -> Result<()> {
        let sequence = self.tx_sequence;
        let frame = encode(own_id.to_byte(), sequence);
        self.tx_sequence = self.tx_sequence.wrapping_add(1);

        match self.serial.write_all(&frame) {
            Ok(()) => {
                self.stats.frames_sent = self.stats.frames_sent.wrapping_add(1);
                log::trace!("heartbeat tx id={own_id} seq={sequence} at {now_ms}");
                Ok(())
            }
            Err(e) => {
                self.stats.send_errors = self.stats.send_errors.wrapping_add(1);
                Err(e)
            }
        }
    }

    /// Whether the peer has been heard from within `timeout_ms` of `now_ms`.
    ///
    /// False until the first valid frame arrives.
    pub fn is_peer_alive(&self, now_ms: u32, timeout_ms: u32) -> bool {
        match self.last_valid_rx_ms {
            Some(last) => age_ms(now_ms, last) <= timeout_ms,
            None => false,
        }
    }

    /// Identity byte of the last validated frame, if any.
    pub fn peer_id(&self) -> Option<u8> {
        self.peer_id
    }

    /// Identity of the last validated sender, if it names a known node.
    pub fn peer_node(&self) -> Option<NodeId> {
        self.peer_id.and_then(|b| NodeId::from_byte(b).ok())
    }

    /// Timestamp of the last validated frame, if any.
    pub fn last_valid_rx_ms(&self) -> Option<u32> {
        self.last_valid_rx_ms
    }

    /// Milliseconds since the last validated frame.
    pub fn peer_age_ms(&self, now_ms: u32) -> Option<u32> {
        self.last_valid_rx_ms.map(|last| age_ms(now_ms, last))
    }

    /// Sequence number the next outbound frame will carry.
    pub fn next_sequence(&self) -> u8 {
        self.tx_sequence
    }

    /// Link quality counters.
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Returns true if the parser is waiting for the first sync byte.
    pub fn is_idle(&self) -> bool {
        self.captured == 0
    }

    /// Shared access to the transport.
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Consume the link and return the transport.
    pub fn into_serial(self) -> S {
        self.serial
    }
}
