//! Role state machine.
//!
//! ```text
//!   node A                         node B
//!     |                              |
//!     v                              v
//! PrimaryActive                StandbyPassive
//!  (owns bus)                   (bus released)
//!                                    | peer silent > timeout
//!                                    | (claims bus immediately)
//!                                    v
//!                               TakingOver
//!                                    | settle delay
//!                                    v
//!                           ActiveAfterTakeover
//!                          (owns bus, terminal)
//! ```
//!
//! Precedence is static: the primary never yields and a node that took over
//! never hands the bus back, so a peer that reappears cannot cause
//! flapping. What should happen when the original primary returns after a
//! takeover is deliberately left undecided; the hold timer only marks the
//! point where such a policy would apply.
//!
//! Every tick first drains the heartbeat receiver and sends a heartbeat if
//! one is due, so the state machine always evaluates the freshest liveness.

use core::fmt;

use crate::arbitrator::BusArbitrator;
use crate::hal::{BusLines, Delay, SerialLink};
use crate::heartbeat::HeartbeatLink;
use crate::time::{age_ms, elapsed};
use crate::{BusOwner, FailoverConfig, NodeId, RoleState};

/// A one-shot record of a takeover, for telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FailoverEvent {
    /// Clock reading when the takeover started.
    pub at_ms: u32,
    /// Identity byte of the peer that went silent, if it was ever heard.
    pub lost_peer: Option<u8>,
    /// Silence that triggered the takeover, measured from the last valid
    /// frame or, if the peer was never heard, from boot.
    pub silence_ms: u32,
    /// Short human-readable description.
    pub detail: &'static str,
}

impl fmt::Display for FailoverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lost_peer {
            Some(peer) => write!(
                f,
                "{} (peer {} silent for {} ms)",
                self.detail, peer as char, self.silence_ms
            ),
            None => write!(
                f,
                "{} (peer never heard, {} ms since boot)",
                self.detail, self.silence_ms
            ),
        }
    }
}

/// Failover role state machine for one node.
#[derive(Debug, Clone)]
pub struct FailoverController {
    config: FailoverConfig,
    state: RoleState,
    boot_ms: u32,
    state_entered_ms: u32,
    last_send_ms: Option<u32>,
    hold_elapsed: bool,
    identity_conflict: bool,
    pending_event: Option<FailoverEvent>,
}

impl FailoverController {
    /// Create a controller in its configured initial role without touching
    /// the bus. Use [`Self::boot`] to also perform the entry action.
    pub fn new(config: FailoverConfig, now_ms: u32) -> Self {
        let state = if config.node_id.is_primary() {
            RoleState::PrimaryActive
        } else {
            RoleState::StandbyPassive
        };
        Self {
            config,
            state,
            boot_ms: now_ms,
            state_entered_ms: now_ms,
            last_send_ms: None,
            hold_elapsed: false,
            identity_conflict: false,
            pending_event: None,
        }
    }

    /// Create a controller and apply its initial role to the bus: the primary
    /// claims the bus for itself, the secondary releases it.
    pub fn boot<L: BusLines, D: Delay>(
        config: FailoverConfig,
        now_ms: u32,
        arbitrator: &mut BusArbitrator<L, D>,
    ) -> Self {
        let controller = Self::new(config, now_ms);
        let owner = match controller.state {
            RoleState::PrimaryActive => controller.own_owner(),
            _ => BusOwner::Unowned,
        };
        arbitrator.claim(owner);
        log::info!(
            "node {} booted as {}, bus owner {}",
            controller.config.node_id,
            controller.state,
            arbitrator.owner()
        );
        controller
    }

    /// Run one control-loop iteration at `now_ms`.
    pub fn tick<S, L, D>(
        &mut self,
        now_ms: u32,
        link: &mut HeartbeatLink<S>,
        arbitrator: &mut BusArbitrator<L, D>,
    ) where
        S: SerialLink,
        L: BusLines,
        D: Delay,
    {
        self.service_link(now_ms, link);

        match self.state {
            RoleState::PrimaryActive => {}
            RoleState::StandbyPassive => {
                if let Some(silence_ms) = self.peer_silence(now_ms, link) {
                    if self.identity_conflict {
                        log::trace!("takeover suppressed by identity conflict");
                    } else {
                        self.begin_takeover(now_ms, silence_ms, link.peer_id(), arbitrator);
                    }
                }
            }
            RoleState::TakingOver => {
                if elapsed(now_ms, self.state_entered_ms, self.config.takeover_settle_ms) {
                    self.enter(RoleState::ActiveAfterTakeover, now_ms);
                }
            }
            RoleState::ActiveAfterTakeover => {
                if !self.hold_elapsed
                    && elapsed(now_ms, self.state_entered_ms, self.config.takeover_hold_ms)
                {
                    self.hold_elapsed = true;
                    log::info!(
                        "takeover hold of {} ms elapsed; keeping the bus",
                        self.config.takeover_hold_ms
                    );
                }
            }
        }
    }

    fn service_link<S: SerialLink>(&mut self, now_ms: u32, link: &mut HeartbeatLink<S>) {
        let own = self.config.node_id.to_byte();
        let mut echoed_own_id = false;
        link.poll_with(now_ms, |frame| {
            if frame.sender == own {
                echoed_own_id = true;
            }
        });
        if echoed_own_id && !self.identity_conflict {
            self.identity_conflict = true;
            log::error!(
                "peer reports identity {} which is ours; check node configuration",
                self.config.node_id
            );
        }

        let due = self
            .last_send_ms
            .is_none_or(|last| elapsed(now_ms, last, self.config.send_period_ms));
        if due {
            self.last_send_ms = Some(now_ms);
            if let Err(e) = link.send(self.config.node_id, now_ms) {
                log::warn!("heartbeat send failed: {e}");
            }
        }
    }

    /// Length of the peer's silence if it exceeds the timeout.
    ///
    /// A peer that was never heard is measured from boot, so two nodes
    /// powering up together do not both claim the bus.
    fn peer_silence<S: SerialLink>(&self, now_ms: u32, link: &HeartbeatLink<S>) -> Option<u32> {
        let silence_ms = match link.last_valid_rx_ms() {
            Some(last) => age_ms(now_ms, last),
            None => age_ms(now_ms, self.boot_ms),
        };
        (silence_ms > self.config.peer_timeout_ms).then_some(silence_ms)
    }

    fn begin_takeover<L: BusLines, D: Delay>(
        &mut self,
        now_ms: u32,
        silence_ms: u32,
        lost_peer: Option<u8>,
        arbitrator: &mut BusArbitrator<L, D>,
    ) {
        log::warn!(
            "peer silent for {silence_ms} ms (timeout {} ms); taking over the bus",
            self.config.peer_timeout_ms
        );
        self.enter(RoleState::TakingOver, now_ms);
        arbitrator.claim(self.own_owner());
        self.pending_event = Some(FailoverEvent {
            at_ms: now_ms,
            lost_peer,
            silence_ms,
            detail: "peer heartbeat lost, bus taken over",
        });
    }

    fn enter(&mut self, state: RoleState, now_ms: u32) {
        log::info!("role {} -> {} at {now_ms}", self.state, state);
        self.state = state;
        self.state_entered_ms = now_ms;
    }

    fn own_owner(&self) -> BusOwner {
        self.config.node_id.as_owner()
    }

    /// Current role.
    pub fn state(&self) -> RoleState {
        self.state
    }

    /// This node's identity.
    pub fn node_id(&self) -> NodeId {
        self.config.node_id
    }

    /// Configuration the controller runs with.
    pub fn config(&self) -> &FailoverConfig {
        &self.config
    }

    /// Clock reading when the current role was entered.
    pub fn state_entered_ms(&self) -> u32 {
        self.state_entered_ms
    }

    /// Whether the post-takeover hold has run out.
    pub fn takeover_hold_elapsed(&self) -> bool {
        self.hold_elapsed
    }

    /// Whether a frame carrying this node's own identity has been received.
    ///
    /// Latched: stays set for the lifetime of the controller.
    pub fn identity_conflict(&self) -> bool {
        self.identity_conflict
    }

    /// The takeover record not yet collected, if any.
    pub fn pending_event(&self) -> Option<&FailoverEvent> {
        self.pending_event.as_ref()
    }

    /// Collect the takeover record. Subsequent calls return `None` until the
    /// next takeover.
    pub fn take_failover_event(&mut self) -> Option<FailoverEvent> {
        self.pending_event.take()
    }
}
