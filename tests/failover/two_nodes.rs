//! Two real nodes cross-wired through an in-memory UART, sharing one clock.

use bus_failover::hal::Clock;
use bus_failover::sim::{ManualClock, MemorySerial};
use bus_failover::{BusOwner, FailoverConfig, NodeId, Result, RoleState};

use super::{SimNode, boot_node, init_logging};

fn boot_pair(id_a: NodeId, id_b: NodeId) -> Result<(SimNode, SimNode, MemorySerial, ManualClock)> {
    let clock = ManualClock::new(0);
    let (wire_a, wire_b) = MemorySerial::pair();
    let cable = wire_a.clone();
    let a = boot_node(FailoverConfig::new(id_a), wire_a, &clock)?;
    let b = boot_node(FailoverConfig::new(id_b), wire_b, &clock)?;
    Ok((a, b, cable, clock))
}

/// Last heartbeat node A sent strictly before `until`.
///
/// A's boot claim stalls the shared clock for one break-before-make
/// interval, so its heartbeats run on a grid offset by that stall.
fn last_heartbeat_before(until: u32) -> u32 {
    let config = FailoverConfig::new(NodeId::A);
    let first = config.break_before_make_ms;
    first + (until - 1 - first) / config.send_period_ms * config.send_period_ms
}

/// Clock reading of the first tick that sees the peer as dead.
fn takeover_after(last_heartbeat: u32) -> u32 {
    last_heartbeat + FailoverConfig::new(NodeId::B).peer_timeout_ms + 1
}

fn tick_both(a: &mut SimNode, b: &mut SimNode, clock: &ManualClock, until: u32) {
    while clock.now_ms() < until {
        a.tick();
        b.tick();
        clock.advance(1);
    }
}

fn tick_one(node: &mut SimNode, clock: &ManualClock, until: u32) {
    while clock.now_ms() < until {
        node.tick();
        clock.advance(1);
    }
}

#[test]
fn healthy_pair_is_stable() -> Result<()> {
    init_logging();
    let (mut a, mut b, _cable, clock) = boot_pair(NodeId::A, NodeId::B)?;

    tick_both(&mut a, &mut b, &clock, 30_000);

    assert_eq!(a.role(), RoleState::PrimaryActive);
    assert_eq!(a.owner(), BusOwner::A);
    assert_eq!(b.role(), RoleState::StandbyPassive);
    assert_eq!(b.owner(), BusOwner::Unowned);
    assert!(a.peer_alive());
    assert!(b.peer_alive());
    assert_eq!(a.link().peer_node(), Some(NodeId::B));
    assert_eq!(b.link().peer_node(), Some(NodeId::A));
    assert!(a.take_failover_event().is_none());
    assert!(b.take_failover_event().is_none());

    for node in [&a, &b] {
        let status = node.status();
        assert!(!status.identity_conflict);
        assert_eq!(status.link.crc_errors, 0);
        assert_eq!(status.link.discarded_bytes, 0);
        assert_eq!(status.link.send_errors, 0);
    }
    assert_eq!(b.arbitrator().lines().energized_count(), 0);
    Ok(())
}

#[test]
fn standby_takes_over_when_primary_stops() -> Result<()> {
    init_logging();
    let (mut a, mut b, _cable, clock) = boot_pair(NodeId::A, NodeId::B)?;

    tick_both(&mut a, &mut b, &clock, 10_000);
    let last = last_heartbeat_before(10_000);
    assert_eq!(last, 9_780);
    assert_eq!(b.link().last_valid_rx_ms(), Some(last));

    let takeover_at = takeover_after(last);
    tick_one(&mut b, &clock, takeover_at);
    assert_eq!(b.role(), RoleState::StandbyPassive);

    tick_one(&mut b, &clock, takeover_at + 1);
    assert_eq!(b.role(), RoleState::TakingOver);
    assert_eq!(b.owner(), BusOwner::B);
    let event = b.take_failover_event().expect("takeover recorded");
    assert_eq!(event.at_ms, takeover_at);
    assert_eq!(event.lost_peer, Some(b'A'));
    assert_eq!(event.silence_ms, 2_001);

    tick_one(&mut b, &clock, 12_000);
    assert_eq!(b.role(), RoleState::ActiveAfterTakeover);
    assert_eq!(b.arbitrator().transitions(), 1);
    assert_eq!(b.arbitrator().lines().violations(), 0);
    Ok(())
}

#[test]
fn cut_cable_then_reconnect_does_not_flap() -> Result<()> {
    init_logging();
    let (mut a, mut b, cable, clock) = boot_pair(NodeId::A, NodeId::B)?;

    tick_both(&mut a, &mut b, &clock, 5_000);
    cable.set_connected(false);

    let last = last_heartbeat_before(5_000);
    assert_eq!(b.link().last_valid_rx_ms(), Some(last));

    let takeover_at = takeover_after(last);
    tick_both(&mut a, &mut b, &clock, takeover_at);
    assert_eq!(b.role(), RoleState::StandbyPassive);
    tick_both(&mut a, &mut b, &clock, takeover_at + 1);
    assert_eq!(b.role(), RoleState::TakingOver);
    assert_eq!(b.owner(), BusOwner::B);

    cable.set_connected(true);
    tick_both(&mut a, &mut b, &clock, 20_000);

    assert!(a.peer_alive());
    assert!(b.peer_alive());
    assert_eq!(a.role(), RoleState::PrimaryActive);
    assert_eq!(b.role(), RoleState::ActiveAfterTakeover);
    assert_eq!(b.arbitrator().transitions(), 1);
    assert!(b.controller().takeover_hold_elapsed());
    Ok(())
}

#[test]
fn two_secondaries_flag_conflict_and_hold_back() -> Result<()> {
    init_logging();
    let (mut a, mut b, _cable, clock) = boot_pair(NodeId::B, NodeId::B)?;

    tick_both(&mut a, &mut b, &clock, 10_000);

    for node in [&a, &b] {
        let status = node.status();
        assert!(status.identity_conflict);
        assert_eq!(status.role, RoleState::StandbyPassive);
        assert_eq!(status.owner, BusOwner::Unowned);
    }
    assert!(a.take_failover_event().is_none());
    assert!(b.take_failover_event().is_none());
    Ok(())
}

#[test]
fn two_primaries_flag_conflict() -> Result<()> {
    init_logging();
    let (mut a, mut b, _cable, clock) = boot_pair(NodeId::A, NodeId::A)?;

    tick_both(&mut a, &mut b, &clock, 1_000);

    for node in [&a, &b] {
        let status = node.status();
        assert!(status.identity_conflict);
        assert_eq!(status.role, RoleState::PrimaryActive);
        assert_eq!(status.peer_id, Some('A'));
    }
    Ok(())
}
