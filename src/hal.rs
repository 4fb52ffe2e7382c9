//! Hardware capability traits.
//!
//! The coordination core never touches registers or pins directly. It is
//! written against four small traits so it runs unchanged on a
//! microcontroller HAL, on a host with std, or against the in-memory fakes in
//! [`crate::sim`].
//!
//! | Trait | Provides |
//! |-------|----------|
//! | [`Clock`] | monotonic `u32` millisecond counter (may wrap) |
//! | [`Delay`] | blocking delay used for break-before-make |
//! | [`SerialLink`] | non-blocking byte source and blocking byte sink |
//! | [`BusLines`] | the two discrete outputs connecting each node to the bus |
//! | [`OutputPins`] | raw level-driven GPIO behind a [`RelayDriver`] |
//!
//! # Relay Polarity
//!
//! Most relay boards are active-low: pulling the input low closes the relay.
//! [`RelayDriver`] maps the arbitrator's energize/release requests onto pin
//! levels for either polarity, so board differences stay out of the core.
//!
//! ```
//! use bus_failover::Line;
//! use bus_failover::hal::{BusLines, OutputPins, RelayDriver, RelayPolarity};
//!
//! #[derive(Default)]
//! struct Pins([bool; 2]);
//!
//! impl OutputPins for Pins {
//!     fn set_high(&mut self, line: Line, high: bool) {
//!         self.0[line.index()] = high;
//!     }
//! }
//!
//! let mut relays = RelayDriver::new(Pins::default(), RelayPolarity::ActiveLow);
//! relays.set_line(Line::A, false);
//! relays.set_line(Line::B, true);
//! assert_eq!(relays.pins().0, [true, false]);
//! ```

use crate::{Line, Result};

/// Monotonic millisecond clock shared read-only by all components.
pub trait Clock {
    /// Current time in milliseconds. Allowed to wrap around at `u32::MAX`.
    fn now_ms(&self) -> u32;
}

/// Blocking delay.
pub trait Delay {
    /// Block the caller for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

/// Duplex byte stream carrying heartbeat frames.
pub trait SerialLink {
    /// Take the next received byte, or `None` if the receive buffer is empty.
    ///
    /// Must not block.
    fn read_byte(&mut self) -> Option<u8>;

    /// Queue all bytes for transmission.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;
}

/// The two discrete hardware outputs driving the bus relays.
///
/// `energized` means the relay connecting that node to the bus is closed.
/// Boards whose relays are driven by a plain GPIO level use [`RelayDriver`].
pub trait BusLines {
    /// Energize or release one output.
    fn set_line(&mut self, line: Line, energized: bool);
}

/// Two digital output pins, one per relay input.
pub trait OutputPins {
    /// Drive the pin for `line` high or low.
    fn set_high(&mut self, line: Line, high: bool);
}

/// Which pin level closes a relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RelayPolarity {
    /// High closes the relay.
    ActiveHigh,
    /// Low closes the relay. Common on opto-isolated relay modules.
    #[default]
    ActiveLow,
}

impl RelayPolarity {
    /// Pin level (`true` = high) that puts a relay in the `energized` state.
    #[inline]
    pub const fn level(self, energized: bool) -> bool {
        match self {
            RelayPolarity::ActiveHigh => energized,
            RelayPolarity::ActiveLow => !energized,
        }
    }
}

/// [`BusLines`] over level-driven pins with a configured polarity.
#[derive(Debug, Clone)]
pub struct RelayDriver<P: OutputPins> {
    pins: P,
    polarity: RelayPolarity,
}

impl<P: OutputPins> RelayDriver<P> {
    /// Wrap `pins`. Nothing is driven until the first [`BusLines::set_line`].
    pub fn new(pins: P, polarity: RelayPolarity) -> Self {
        Self { pins, polarity }
    }

    /// Configured polarity.
    pub fn polarity(&self) -> RelayPolarity {
        self.polarity
    }

    /// Shared access to the pins.
    pub fn pins(&self) -> &P {
        &self.pins
    }

    /// Consume the driver and return the pins.
    pub fn into_pins(self) -> P {
        self.pins
    }
}

impl<P: OutputPins> BusLines for RelayDriver<P> {
    fn set_line(&mut self, line: Line, energized: bool) {
        self.pins.set_high(line, self.polarity.level(energized));
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }
}

impl<T: SerialLink + ?Sized> SerialLink for &mut T {
    fn read_byte(&mut self) -> Option<u8> {
        (**self).read_byte()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }
}

impl<T: BusLines + ?Sized> BusLines for &mut T {
    fn set_line(&mut self, line: Line, energized: bool) {
        (**self).set_line(line, energized)
    }
}

#[cfg(feature = "std")]
mod std_impl {
    use super::{Clock, Delay};
    use std::time::{Duration, Instant};

    /// A [`Clock`] backed by [`std::time::Instant`], counting from creation.
    ///
    /// The value wraps like a microcontroller tick counter.
    #[derive(Debug, Clone, Copy)]
    pub struct StdClock {
        origin: Instant,
    }

    impl StdClock {
        /// Start a clock reading zero now.
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
            }
        }
    }

    impl Default for StdClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for StdClock {
        fn now_ms(&self) -> u32 {
            // Truncation is the wrap.
            self.origin.elapsed().as_millis() as u32
        }
    }

    /// A [`Delay`] that sleeps the current thread.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ThreadDelay;

    impl Delay for ThreadDelay {
        fn delay_ms(&mut self, ms: u32) {
            std::thread::sleep(Duration::from_millis(ms as u64));
        }
    }
}

#[cfg(feature = "std")]
pub use std_impl::{StdClock, ThreadDelay};
