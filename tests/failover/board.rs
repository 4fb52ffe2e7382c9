//! Board-level constraints: relay polarity and the UART receive buffer.

use bus_failover::hal::{Clock, Delay, RelayDriver, RelayPolarity};
use bus_failover::sim::{ManualClock, MemorySerial, RecordingLines, RecordingPins};
use bus_failover::{BusOwner, FailoverConfig, Line, Node, NodeId, Result, RoleState};

use super::init_logging;

/// Delay that models a saturated 8N1 line: every stalled millisecond
/// delivers a millisecond's worth of noise into the receive buffer.
struct SaturatedLine {
    clock: ManualClock,
    wire: MemorySerial,
    baud_rate: u32,
}

impl Delay for SaturatedLine {
    fn delay_ms(&mut self, ms: u32) {
        let bytes = (self.baud_rate as u64 * ms as u64).div_ceil(10_000) as usize;
        self.wire.inject(&vec![0x00; bytes]);
        self.clock.delay_ms(ms);
    }
}

/// Take over with a receive buffer of `rx_capacity` bytes while the line is
/// saturated. Returns the number of bytes the buffer dropped.
fn takeover_with_rx_capacity(rx_capacity: usize) -> Result<usize> {
    let config = FailoverConfig::new(NodeId::B);
    let clock = ManualClock::new(0);
    let wire = MemorySerial::with_rx_capacity(rx_capacity);
    let delay = SaturatedLine {
        clock: clock.clone(),
        wire: wire.clone(),
        baud_rate: config.baud_rate,
    };
    let stall_bytes = config.bytes_during_stall() as usize;
    let timeout = config.peer_timeout_ms;
    let mut node = Node::boot(
        config,
        wire.clone(),
        RecordingLines::with_clock(clock.clone()),
        clock.clone(),
        delay,
    )?;

    // Peer never heard; the first tick past the boot grace claims the bus
    clock.set(timeout + 1);
    node.tick();
    assert_eq!(node.role(), RoleState::TakingOver);
    assert_eq!(wire.pending_rx(), stall_bytes.min(rx_capacity));

    // The next tick drains what piled up during the stall
    node.tick();
    assert_eq!(wire.pending_rx(), 0);
    assert_eq!(
        node.status().link.discarded_bytes as usize,
        stall_bytes.min(rx_capacity)
    );
    Ok(wire.rx_overflows())
}

#[test]
fn default_buffer_absorbs_takeover_stall() -> Result<()> {
    init_logging();
    let config = FailoverConfig::default();
    assert!(config.validate().is_ok());

    let dropped = takeover_with_rx_capacity(config.rx_buffer_bytes as usize)?;
    assert_eq!(dropped, 0);
    Ok(())
}

#[test]
fn undersized_buffer_overflows_during_stall() -> Result<()> {
    let config = FailoverConfig::default();
    let stall_bytes = config.bytes_during_stall() as usize;
    assert!(config.clone().with_serial(config.baud_rate, 128).validate().is_err());

    // The same stall against a 128-byte FIFO loses data
    let dropped = takeover_with_rx_capacity(128)?;
    assert_eq!(dropped, stall_bytes - 128);
    Ok(())
}

#[test]
fn active_low_relays_follow_takeover() -> Result<()> {
    init_logging();
    let config = FailoverConfig::new(NodeId::B);
    assert_eq!(config.relay_polarity, RelayPolarity::ActiveLow);

    let clock = ManualClock::new(0);
    let relays = RelayDriver::new(RecordingPins::new(), config.relay_polarity);
    let timeout = config.peer_timeout_ms;
    let mut node = Node::boot(config, MemorySerial::new(), relays, clock.clone(), clock.clone())?;

    // Released relays sit high on an active-low board
    let pins = node.arbitrator().lines().pins();
    assert_eq!(pins.level(Line::A), Some(true));
    assert_eq!(pins.level(Line::B), Some(true));

    clock.set(timeout + 1);
    node.tick();
    assert_eq!(node.owner(), BusOwner::B);

    let pins = node.arbitrator().lines().pins();
    assert_eq!(pins.level(Line::A), Some(true));
    assert_eq!(pins.level(Line::B), Some(false));
    // Two releases at boot, two releases and one close for the claim
    assert_eq!(pins.writes(), 5);
    assert!(clock.now_ms() > timeout + 1);
    Ok(())
}
