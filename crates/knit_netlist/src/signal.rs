//! Signal-graph nodes.
//!
//! A [`Signal`] is either a primary port of a module, an internal wire, or one of
//! the structural pass-through nodes ([`SignalKind::Concat`],
//! [`SignalKind::Subset`]) and constants that sources are built from.

use crate::ids::{ModuleId, SignalId};
use crate::shape::{BitRange, Shape};
use knit_common::{Ident, LogicVec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The direction of a port on a module boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Data flows into the module.
    Input,
    /// Data flows out of the module.
    Output,
    /// A bidirectional net with no fixed driver.
    Net,
}

impl Direction {
    /// Returns `true` for [`Direction::Net`].
    pub fn is_net(self) -> bool {
        self == Direction::Net
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
            Direction::Net => write!(f, "net"),
        }
    }
}

/// What a signal node is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SignalKind {
    /// A primary port of a module.
    Port {
        /// The owning module.
        module: ModuleId,
        /// The port name.
        name: Ident,
        /// The port direction.
        direction: Direction,
    },
    /// An internal signal of a module.
    Wire {
        /// The owning module.
        module: ModuleId,
        /// The wire name.
        name: Ident,
    },
    /// Bit concatenation of full nodes, least significant segment first.
    Concat(Vec<SignalId>),
    /// A contiguous bit range of another node.
    Subset {
        /// The node being read.
        source: SignalId,
        /// The bits of `source` this node exposes.
        range: BitRange,
    },
    /// A constant value.
    Const(LogicVec),
}

/// An assignment of a full source node onto part of a drivable signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Driver {
    /// The destination bits.
    pub range: BitRange,
    /// The node supplying them; its width equals `range.width`.
    pub source: SignalId,
}

/// A node of the signal graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// The ID of this node.
    pub id: SignalId,
    /// What the node is.
    pub kind: SignalKind,
    /// The node's shape; pass-through nodes are plain vectors.
    pub shape: Shape,
    /// Assignments onto this node. Only ports and wires carry drivers.
    pub drivers: Vec<Driver>,
}

impl Signal {
    /// Width in bits.
    pub fn width(&self) -> u32 {
        self.shape.bits()
    }

    /// The owning module of a port or wire.
    pub fn module(&self) -> Option<ModuleId> {
        match self.kind {
            SignalKind::Port { module, .. } | SignalKind::Wire { module, .. } => Some(module),
            _ => None,
        }
    }

    /// The direction if this node is a port.
    pub fn direction(&self) -> Option<Direction> {
        match self.kind {
            SignalKind::Port { direction, .. } => Some(direction),
            _ => None,
        }
    }

    /// Returns `true` for ports and wires, the only nodes that accept drivers.
    pub fn is_drivable(&self) -> bool {
        matches!(self.kind, SignalKind::Port { .. } | SignalKind::Wire { .. })
    }

    /// Returns `true` for a port declared as a net.
    pub fn is_net(&self) -> bool {
        self.direction() == Some(Direction::Net)
    }

    /// Drivers whose destination bits overlap `range`.
    pub fn drivers_overlapping(&self, range: BitRange) -> impl Iterator<Item = &Driver> {
        self.drivers
            .iter()
            .filter(move |d| d.range.intersect(range).is_some())
    }
}
