//! In-memory hardware for tests, simulations and host-side tooling.
//!
//! These types implement the [`crate::hal`] traits without touching real
//! hardware. They are single-threaded: handles share state through `Rc`, so a
//! test can keep a clone of a [`MemorySerial`] or [`ManualClock`] after moving
//! the original into a node.
//!
//! # Example
//!
//! ```
//! use bus_failover::hal::{Clock, Delay};
//! use bus_failover::sim::ManualClock;
//!
//! let clock = ManualClock::new(0);
//! let mut delay = clock.clone();
//! delay.delay_ms(30);
//! assert_eq!(clock.now_ms(), 30);
//! ```

use alloc::collections::VecDeque;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};

use crate::hal::{BusLines, Clock, Delay, OutputPins, SerialLink};
use crate::{Error, Line, Result};

/// A manually advanced millisecond clock.
///
/// Clones share the same time. As a [`Delay`], blocking advances the shared
/// time, which models a busy-wait on real hardware.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u32>>,
    delayed: Rc<Cell<u64>>,
    delays: Rc<Cell<u32>>,
}

impl ManualClock {
    /// Create a clock reading `start_ms`.
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
            delayed: Rc::new(Cell::new(0)),
            delays: Rc::new(Cell::new(0)),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    /// Move time forward, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    /// Total milliseconds spent in [`Delay::delay_ms`] across all clones.
    pub fn total_delayed_ms(&self) -> u64 {
        self.delayed.get()
    }

    /// Number of [`Delay::delay_ms`] calls across all clones.
    pub fn delay_count(&self) -> u32 {
        self.delays.get()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

impl Delay for ManualClock {
    fn delay_ms(&mut self, ms: u32) {
        self.advance(ms);
        self.delayed.set(self.delayed.get() + ms as u64);
        self.delays.set(self.delays.get().wrapping_add(1));
    }
}

#[derive(Debug, Default)]
struct RxBuffer {
    bytes: VecDeque<u8>,
    capacity: Option<usize>,
    overflowed: usize,
}

impl RxBuffer {
    fn push(&mut self, data: &[u8]) {
        for &b in data {
            match self.capacity {
                Some(cap) if self.bytes.len() >= cap => self.overflowed += 1,
                _ => self.bytes.push_back(b),
            }
        }
    }
}

/// An in-memory serial port.
///
/// Received bytes are injected by the test (or delivered by a connected
/// peer, see [`MemorySerial::pair`]); written bytes are kept in a transcript.
/// An optional receive capacity models a UART FIFO that drops bytes when the
/// control loop is stalled for too long.
#[derive(Debug, Clone)]
pub struct MemorySerial {
    rx: Rc<RefCell<RxBuffer>>,
    tx: Rc<RefCell<Vec<u8>>>,
    peer_rx: Option<Rc<RefCell<RxBuffer>>>,
    connected: Rc<Cell<bool>>,
    tx_fault: Rc<Cell<bool>>,
}

impl MemorySerial {
    /// Create an unconnected port with an unbounded receive buffer.
    pub fn new() -> Self {
        Self {
            rx: Rc::new(RefCell::new(RxBuffer::default())),
            tx: Rc::new(RefCell::new(Vec::new())),
            peer_rx: None,
            connected: Rc::new(Cell::new(true)),
            tx_fault: Rc::new(Cell::new(false)),
        }
    }

    /// Create an unconnected port whose receive buffer holds `capacity` bytes.
    pub fn with_rx_capacity(capacity: usize) -> Self {
        let port = Self::new();
        port.rx.borrow_mut().capacity = Some(capacity);
        port
    }

    /// Create two cross-connected ports: bytes written to one are received
    /// by the other.
    ///
    /// The pair shares one connection flag; see [`Self::set_connected`].
    pub fn pair() -> (Self, Self) {
        let mut a = Self::new();
        let mut b = Self::new();
        b.connected = a.connected.clone();
        a.peer_rx = Some(b.rx.clone());
        b.peer_rx = Some(a.rx.clone());
        (a, b)
    }

    /// Simulate bytes arriving from the wire.
    pub fn inject(&self, bytes: &[u8]) {
        self.rx.borrow_mut().push(bytes);
    }

    /// Number of received bytes not yet read.
    pub fn pending_rx(&self) -> usize {
        self.rx.borrow().bytes.len()
    }

    /// Number of received bytes dropped because the buffer was full.
    pub fn rx_overflows(&self) -> usize {
        self.rx.borrow().overflowed
    }

    /// Take the transcript of everything written so far.
    pub fn take_tx(&self) -> Vec<u8> {
        core::mem::take(&mut *self.tx.borrow_mut())
    }

    /// Number of bytes written and not yet taken.
    pub fn tx_len(&self) -> usize {
        self.tx.borrow().len()
    }

    /// Make subsequent writes fail.
    pub fn set_tx_fault(&self, fault: bool) {
        self.tx_fault.set(fault);
    }

    /// Cut or restore the wire between a pair. While cut, writes succeed
    /// locally but nothing reaches the peer.
    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }
}

impl Default for MemorySerial {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialLink for MemorySerial {
    fn read_byte(&mut self) -> Option<u8> {
        self.rx.borrow_mut().bytes.pop_front()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        if self.tx_fault.get() {
            return Err(Error::SerialWrite {
                attempted: bytes.len(),
            });
        }
        self.tx.borrow_mut().extend_from_slice(bytes);
        if let Some(peer) = &self.peer_rx {
            if self.connected.get() {
                peer.borrow_mut().push(bytes);
            }
        }
        Ok(())
    }
}

/// One recorded output change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEvent {
    /// Which output changed.
    pub line: Line,
    /// New output state.
    pub energized: bool,
    /// Clock reading at the change, if a clock was attached.
    pub at_ms: Option<u32>,
}

/// Output lines that record every change and check exclusivity.
///
/// After each change the recorder samples both outputs; any instant with both
/// energized is counted as a violation.
#[derive(Debug, Clone, Default)]
pub struct RecordingLines {
    energized: [bool; 2],
    history: Vec<LineEvent>,
    violations: usize,
    clock: Option<ManualClock>,
}

impl RecordingLines {
    /// Create a recorder with both outputs released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a recorder that timestamps events from `clock`.
    pub fn with_clock(clock: ManualClock) -> Self {
        Self {
            clock: Some(clock),
            ..Self::default()
        }
    }

    /// Whether an output is currently energized.
    pub fn is_energized(&self, line: Line) -> bool {
        self.energized[line.index()]
    }

    /// Number of outputs currently energized.
    pub fn energized_count(&self) -> usize {
        self.energized.iter().filter(|&&on| on).count()
    }

    /// Every change in order.
    pub fn history(&self) -> &[LineEvent] {
        &self.history
    }

    /// Number of sampled instants with both outputs energized.
    pub fn violations(&self) -> usize {
        self.violations
    }
}

impl BusLines for RecordingLines {
    fn set_line(&mut self, line: Line, energized: bool) {
        self.energized[line.index()] = energized;
        self.history.push(LineEvent {
            line,
            energized,
            at_ms: self.clock.as_ref().map(|c| c.now_ms()),
        });
        if self.energized_count() > 1 {
            self.violations += 1;
        }
    }
}

/// Level-driven output pins that remember the last level written.
///
/// Stands in for GPIO behind a [`crate::hal::RelayDriver`].
#[derive(Debug, Clone, Default)]
pub struct RecordingPins {
    levels: [Option<bool>; 2],
    writes: usize,
}

impl RecordingPins {
    /// Create pins that have never been driven.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last level driven on the pin for `line` (`true` = high), or `None` if
    /// it was never driven.
    pub fn level(&self, line: Line) -> Option<bool> {
        self.levels[line.index()]
    }

    /// Total number of pin writes.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl OutputPins for RecordingPins {
    fn set_high(&mut self, line: Line, high: bool) {
        self.levels[line.index()] = Some(high);
        self.writes += 1;
    }
}
