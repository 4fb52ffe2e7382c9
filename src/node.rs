//! Top-level node context.
//!
//! A [`Node`] owns every piece of per-node state: the heartbeat link, the bus
//! arbitrator, the role controller and the clock. The firmware main loop
//! constructs one at boot and calls [`Node::tick`] forever; nothing lives in
//! statics.
//!
//! # Example
//!
//! ```
//! use bus_failover::{BusOwner, FailoverConfig, Node, NodeId, RoleState};
//! use bus_failover::sim::{ManualClock, MemorySerial, RecordingLines};
//!
//! let clock = ManualClock::new(0);
//! let mut node = Node::boot(
//!     FailoverConfig::new(NodeId::B),
//!     MemorySerial::new(),
//!     RecordingLines::new(),
//!     clock.clone(),
//!     clock.clone(),
//! )?;
//! assert_eq!(node.role(), RoleState::StandbyPassive);
//!
//! // Nobody is heard from for longer than the timeout.
//! clock.set(2_500);
//! node.tick();
//! assert_eq!(node.owner(), BusOwner::B);
//! assert!(node.take_failover_event().is_some());
//! # Ok::<(), bus_failover::Error>(())
//! ```

use crate::arbitrator::BusArbitrator;
use crate::controller::{FailoverController, FailoverEvent};
use crate::hal::{BusLines, Clock, Delay, SerialLink};
use crate::heartbeat::{HeartbeatLink, LinkStats};
use crate::{BusOwner, FailoverConfig, NodeId, Result, RoleState};

/// Snapshot of a node's externally visible state.
///
/// Intended to be embedded into the telemetry payload.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeStatus {
    /// This node's identity.
    pub node_id: NodeId,
    /// Current role.
    pub role: RoleState,
    /// Current bus owner.
    pub owner: BusOwner,
    /// Identity of the last validated peer frame, if any.
    pub peer_id: Option<char>,
    /// Whether the peer is within its heartbeat timeout.
    pub peer_alive: bool,
    /// Milliseconds since the last validated peer frame.
    pub peer_age_ms: Option<u32>,
    /// Whether a frame carrying this node's own identity was received.
    pub identity_conflict: bool,
    /// Whether the post-takeover hold has run out.
    pub takeover_hold_elapsed: bool,
    /// Link quality counters.
    pub link: LinkStats,
}

#[cfg(feature = "serde_json")]
impl NodeStatus {
    /// Render the snapshot as a compact JSON object.
    pub fn to_json(&self) -> Result<alloc::string::String> {
        use alloc::string::ToString;

        serde_json::to_string(self).map_err(|e| crate::Error::SerializationError(e.to_string()))
    }
}

/// One failover node: link, arbitrator, controller and clock.
pub struct Node<S, L, C, D>
where
    S: SerialLink,
    L: BusLines,
    C: Clock,
    D: Delay,
{
    clock: C,
    link: HeartbeatLink<S>,
    arbitrator: BusArbitrator<L, D>,
    controller: FailoverController,
}

impl<S, L, C, D> Node<S, L, C, D>
where
    S: SerialLink,
    L: BusLines,
    C: Clock,
    D: Delay,
{
    /// Validate `config`, release the bus outputs and enter the configured
    /// initial role.
    pub fn boot(config: FailoverConfig, serial: S, lines: L, clock: C, delay: D) -> Result<Self> {
        config.validate()?;
        let mut arbitrator = BusArbitrator::new(lines, delay, config.break_before_make_ms);
        let controller = FailoverController::boot(config, clock.now_ms(), &mut arbitrator);
        Ok(Self {
            clock,
            link: HeartbeatLink::new(serial),
            arbitrator,
            controller,
        })
    }

    /// Run one control-loop iteration.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        self.controller
            .tick(now, &mut self.link, &mut self.arbitrator);
    }

    /// Current role.
    pub fn role(&self) -> RoleState {
        self.controller.state()
    }

    /// Current bus owner.
    pub fn owner(&self) -> BusOwner {
        self.arbitrator.owner()
    }

    /// This node's identity.
    pub fn node_id(&self) -> NodeId {
        self.controller.node_id()
    }

    /// Whether the peer is within its heartbeat timeout right now.
    pub fn peer_alive(&self) -> bool {
        self.link.is_peer_alive(
            self.clock.now_ms(),
            self.controller.config().peer_timeout_ms,
        )
    }

    /// Snapshot of the externally visible state.
    pub fn status(&self) -> NodeStatus {
        let now = self.clock.now_ms();
        NodeStatus {
            node_id: self.controller.node_id(),
            role: self.controller.state(),
            owner: self.arbitrator.owner(),
            peer_id: self.link.peer_id().map(char::from),
            peer_alive: self
                .link
                .is_peer_alive(now, self.controller.config().peer_timeout_ms),
            peer_age_ms: self.link.peer_age_ms(now),
            identity_conflict: self.controller.identity_conflict(),
            takeover_hold_elapsed: self.controller.takeover_hold_elapsed(),
            link: self.link.stats(),
        }
    }

    /// Collect the takeover record, if one is pending.
    pub fn take_failover_event(&mut self) -> Option<FailoverEvent> {
        self.controller.take_failover_event()
    }

    /// The heartbeat link.
    pub fn link(&self) -> &HeartbeatLink<S> {
        &self.link
    }

    /// The bus arbitrator.
    pub fn arbitrator(&self) -> &BusArbitrator<L, D> {
        &self.arbitrator
    }

    /// The role controller.
    pub fn controller(&self) -> &FailoverController {
        &self.controller
    }

    /// Take the node apart, returning the hardware capabilities.
    pub fn into_parts(self) -> (S, L, C, D) {
        let (lines, delay) = self.arbitrator.into_parts();
        (self.link.into_serial(), lines, self.clock, delay)
    }
}
