//! Exclusive bus ownership.
//!
//! [`BusArbitrator`] is the only component that drives the two relay
//! outputs. It holds one authoritative [`BusOwner`] value and changes it with
//! a break-before-make sequence:
//!
//! 1. release both outputs (ownership is transiently `Unowned`)
//! 2. block for the break-before-make interval
//! 3. energize the new owner's output, if any
//!
//! At no instant are both outputs energized. Claiming the current owner again
//! is a no-op and does not touch the hardware or wait.

use crate::hal::{BusLines, Delay};
use crate::{BusOwner, Line};

/// Owner of the shared bus outputs.
pub struct BusArbitrator<L: BusLines, D: Delay> {
    lines: L,
    delay: D,
    break_before_make_ms: u32,
    owner: BusOwner,
    transitions: u32,
}

impl<L: BusLines, D: Delay> BusArbitrator<L, D> {
    /// Create an arbitrator and release both outputs.
    pub fn new(lines: L, delay: D, break_before_make_ms: u32) -> Self {
        let mut arbitrator = Self {
            lines,
            delay,
            break_before_make_ms,
            owner: BusOwner::Unowned,
            transitions: 0,
        };
        arbitrator.initialize();
        arbitrator
    }

    /// Release both outputs and forget the current owner.
    pub fn initialize(&mut self) {
        self.release_all();
        self.owner = BusOwner::Unowned;
    }

    fn release_all(&mut self) {
        for line in Line::ALL {
            self.lines.set_line(line, false);
        }
    }

    /// Hand the bus to `new_owner`.
    ///
    /// Returns `false` without side effects if `new_owner` already owns the
    /// bus. Otherwise blocks for the break-before-make interval and returns
    /// `true` once the new owner's output is energized.
    pub fn claim(&mut self, new_owner: BusOwner) -> bool {
        if new_owner == self.owner {
            return false;
        }

        let previous = self.owner;
        self.release_all();
        self.owner = BusOwner::Unowned;
        self.delay.delay_ms(self.break_before_make_ms);

        if let Some(line) = new_owner.line() {
            self.lines.set_line(line, true);
        }
        self.owner = new_owner;
        self.transitions = self.transitions.wrapping_add(1);

        log::info!("bus owner {previous} -> {new_owner}");
        true
    }

    /// Current owner.
    pub fn owner(&self) -> BusOwner {
        self.owner
    }

    /// Number of completed ownership changes.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Configured break-before-make interval.
    pub fn break_before_make_ms(&self) -> u32 {
        self.break_before_make_ms
    }

    /// Shared access to the outputs.
    pub fn lines(&self) -> &L {
        &self.lines
    }

    /// Consume the arbitrator and return the outputs and delay.
    pub fn into_parts(self) -> (L, D) {
        (self.lines, self.delay)
    }
}
