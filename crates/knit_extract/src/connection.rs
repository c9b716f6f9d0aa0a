//! Extracted connections.
//!
//! Both connection kinds compare as unordered pairs: `(a, b)` equals `(b, a)`
//! and hashes the same.

use knit_hier::{Hierarchy, PortRef};
use knit_netlist::BundleId;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A point-to-point connection between two port references.
///
/// `point1` is the feeding side and `point2` the fed side. Between two net
/// ports the order carries no meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdHocConnection {
    /// The feeding side.
    pub point1: PortRef,
    /// The fed side.
    pub point2: PortRef,
}

impl AdHocConnection {
    /// Connects `point1` to `point2`.
    pub fn new(point1: PortRef, point2: PortRef) -> Self {
        Self { point1, point2 }
    }

    fn ordered(&self) -> (&PortRef, &PortRef) {
        if self.point1 <= self.point2 {
            (&self.point1, &self.point2)
        } else {
            (&self.point2, &self.point1)
        }
    }

    /// Renders the connection with hierarchical names.
    pub fn describe(&self, hier: &Hierarchy) -> String {
        format!(
            "{} -> {}",
            hier.display_port(&self.point1),
            hier.display_port(&self.point2)
        )
    }
}

impl PartialEq for AdHocConnection {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for AdHocConnection {}

impl Hash for AdHocConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

/// Two fully mapped bundles connected logical port for logical port.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InterfaceConnection {
    /// One bundle.
    pub bundle1: BundleId,
    /// The other bundle.
    pub bundle2: BundleId,
}

impl InterfaceConnection {
    /// Connects two bundles.
    pub fn new(bundle1: BundleId, bundle2: BundleId) -> Self {
        Self { bundle1, bundle2 }
    }

    fn ordered(&self) -> (BundleId, BundleId) {
        (
            self.bundle1.min(self.bundle2),
            self.bundle1.max(self.bundle2),
        )
    }

    /// Returns `true` if `bundle` is one of the two ends.
    pub fn involves(&self, bundle: BundleId) -> bool {
        self.bundle1 == bundle || self.bundle2 == bundle
    }

    /// Renders the connection with hierarchical names.
    pub fn describe(&self, hier: &Hierarchy) -> String {
        format!(
            "{} <-> {}",
            hier.bundle_path(self.bundle1),
            hier.bundle_path(self.bundle2)
        )
    }
}

impl PartialEq for InterfaceConnection {
    fn eq(&self, other: &Self) -> bool {
        self.ordered() == other.ordered()
    }
}

impl Eq for InterfaceConnection {}

impl Hash for InterfaceConnection {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordered().hash(state);
    }
}

/// Either kind of extracted connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connection {
    /// A bundle-to-bundle connection.
    Interface(InterfaceConnection),
    /// A port-to-port connection.
    AdHoc(AdHocConnection),
}

impl Connection {
    /// Renders the connection with hierarchical names.
    pub fn describe(&self, hier: &Hierarchy) -> String {
        match self {
            Connection::Interface(c) => c.describe(hier),
            Connection::AdHoc(c) => c.describe(hier),
        }
    }
}

impl From<AdHocConnection> for Connection {
    fn from(c: AdHocConnection) -> Self {
        Connection::AdHoc(c)
    }
}

impl From<InterfaceConnection> for Connection {
    fn from(c: InterfaceConnection) -> Self {
        Connection::Interface(c)
    }
}

/// The result of one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connections {
    /// Bundle-to-bundle connections, in discovery order.
    pub interfaces: Vec<InterfaceConnection>,
    /// Port-to-port connections not covered by an interface connection.
    pub adhoc: Vec<AdHocConnection>,
}

impl Connections {
    /// Total number of connections.
    pub fn len(&self) -> usize {
        self.interfaces.len() + self.adhoc.len()
    }

    /// Returns `true` if nothing was found.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `connection` was found, in either orientation.
    pub fn contains(&self, connection: &Connection) -> bool {
        match connection {
            Connection::Interface(c) => self.interfaces.contains(c),
            Connection::AdHoc(c) => self.adhoc.contains(c),
        }
    }

    /// Iterates over interface connections first, then ad-hoc ones.
    pub fn iter(&self) -> impl Iterator<Item = Connection> + '_ {
        self.interfaces
            .iter()
            .copied()
            .map(Connection::Interface)
            .chain(self.adhoc.iter().cloned().map(Connection::AdHoc))
    }
}
