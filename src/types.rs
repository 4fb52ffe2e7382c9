//! Shared types used across the library.
//!
//! These types are plain `Copy` values usable in `no_std` environments. With
//! the `serde` feature they can be serialized into telemetry payloads.

use core::fmt;

use crate::{Error, Result};

/// Identity of one of the two redundant controllers.
///
/// Node `A` is the configured primary and owns the bus at boot; node `B` is
/// the configured secondary. On the wire an identity is its ASCII letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeId {
    /// Configured primary.
    A,
    /// Configured secondary.
    B,
}

impl NodeId {
    /// Wire byte for this identity.
    #[inline]
    pub const fn to_byte(self) -> u8 {
        match self {
            NodeId::A => b'A',
            NodeId::B => b'B',
        }
    }

    /// Parse an identity from its wire byte.
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            b'A' => Ok(NodeId::A),
            b'B' => Ok(NodeId::B),
            other => Err(Error::UnknownNodeId(other)),
        }
    }

    /// The other node of the pair.
    #[inline]
    pub const fn peer(self) -> Self {
        match self {
            NodeId::A => NodeId::B,
            NodeId::B => NodeId::A,
        }
    }

    /// Whether this identity holds primary precedence.
    #[inline]
    pub const fn is_primary(self) -> bool {
        matches!(self, NodeId::A)
    }

    /// The bus ownership value naming this node.
    #[inline]
    pub const fn as_owner(self) -> BusOwner {
        match self {
            NodeId::A => BusOwner::A,
            NodeId::B => BusOwner::B,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::A => write!(f, "A"),
            NodeId::B => write!(f, "B"),
        }
    }
}

impl TryFrom<u8> for NodeId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_byte(value)
    }
}

/// Which node currently drives the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusOwner {
    /// No line is energized.
    #[default]
    Unowned,
    /// Node A's line is energized.
    A,
    /// Node B's line is energized.
    B,
}

impl BusOwner {
    /// The line energized for this owner, if any.
    #[inline]
    pub const fn line(self) -> Option<Line> {
        match self {
            BusOwner::Unowned => None,
            BusOwner::A => Some(Line::A),
            BusOwner::B => Some(Line::B),
        }
    }

    /// Returns true if some node owns the bus.
    #[inline]
    pub const fn is_owned(self) -> bool {
        !matches!(self, BusOwner::Unowned)
    }
}

impl From<NodeId> for BusOwner {
    fn from(id: NodeId) -> Self {
        id.as_owner()
    }
}

impl fmt::Display for BusOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusOwner::Unowned => write!(f, "none"),
            BusOwner::A => write!(f, "A"),
            BusOwner::B => write!(f, "B"),
        }
    }
}

/// One of the two discrete hardware outputs (relay coils) connecting a node
/// to the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Output connecting node A.
    A,
    /// Output connecting node B.
    B,
}

impl Line {
    /// Both lines, in the order they are released.
    pub const ALL: [Line; 2] = [Line::A, Line::B];

    /// Index of the line, usable for fixed-size state arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Line::A => 0,
            Line::B => 1,
        }
    }
}

/// Role of a node in the failover state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RoleState {
    /// Configured primary holding the bus since boot.
    PrimaryActive,
    /// Configured secondary with the bus released, watching the peer.
    StandbyPassive,
    /// Bus claimed after peer loss; waiting for the bus to settle.
    TakingOver,
    /// Owner after a completed takeover.
    ActiveAfterTakeover,
}

impl RoleState {
    /// Returns true if this role drives the bus.
    #[inline]
    pub const fn is_active(self) -> bool {
        !matches!(self, RoleState::StandbyPassive)
    }

    /// Short lowercase name, as used in log lines and telemetry.
    pub const fn as_str(self) -> &'static str {
        match self {
            RoleState::PrimaryActive => "primary_active",
            RoleState::StandbyPassive => "standby_passive",
            RoleState::TakingOver => "taking_over",
            RoleState::ActiveAfterTakeover => "active_after_takeover",
        }
    }
}

impl fmt::Display for RoleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
