//! Modules and the ports declared on them.

use crate::reference::PortRef;
use crate::uniquify::Uniquifier;
use knit_common::Ident;
use knit_netlist::{BitRange, BundleId, Direction, ModuleId, Shape, SignalId};
use std::collections::HashMap;

/// A primary port of a module.
#[derive(Debug, Clone)]
pub struct Port {
    /// The port name, unique within its module.
    pub name: Ident,
    /// The port direction.
    pub direction: Direction,
    /// The port shape.
    pub shape: Shape,
    /// The signal-graph node backing the port.
    pub signal: SignalId,
    /// Named bit fields of a composite port, as flat ranges of the port.
    pub fields: Vec<(Ident, BitRange)>,
}

impl Port {
    /// Looks up a named field.
    pub fn field(&self, name: Ident) -> Option<BitRange> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, range)| *range)
    }
}

/// A node of the module tree.
///
/// Module identity is its [`ModuleId`]; sibling modules may share a name. All
/// fields are read-only outside the crate; mutation goes through
/// [`Hierarchy`](crate::Hierarchy) so that freezing and naming are enforced.
#[derive(Debug)]
pub struct Module {
    /// The module's ID.
    pub id: ModuleId,
    /// The module's name (not necessarily unique).
    pub name: Ident,
    /// The parent module, if any.
    pub parent: Option<ModuleId>,
    /// Child modules in insertion order.
    pub children: Vec<ModuleId>,
    /// Primary ports in declaration order.
    pub ports: Vec<Port>,
    /// Internal wires.
    pub wires: Vec<SignalId>,
    /// Interface bundles attached to the module.
    pub bundles: Vec<BundleId>,
    /// Set once wiring is final; no structural change is allowed afterwards.
    pub frozen: bool,
    pub(crate) signal_names: Uniquifier,
    pub(crate) bundle_names: Uniquifier,
    /// Source reference -> port of this module that carries it.
    pub(crate) upstream: HashMap<PortRef, PortRef>,
    /// Bundle on a child -> bundle on this module it was pulled up into.
    pub(crate) pulled: HashMap<BundleId, BundleId>,
}

impl Module {
    pub(crate) fn new(id: ModuleId, name: Ident) -> Self {
        Self {
            id,
            name,
            parent: None,
            children: Vec::new(),
            ports: Vec::new(),
            wires: Vec::new(),
            bundles: Vec::new(),
            frozen: false,
            signal_names: Uniquifier::new(),
            bundle_names: Uniquifier::new(),
            upstream: HashMap::new(),
            pulled: HashMap::new(),
        }
    }

    /// Looks up a port by name.
    pub fn port(&self, name: Ident) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub(crate) fn port_mut(&mut self, name: Ident) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    /// Ports of this module that were created to carry a reference from
    /// elsewhere, keyed by that source.
    pub fn upstream(&self) -> impl Iterator<Item = (&PortRef, &PortRef)> {
        self.upstream.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_lookup_and_fields() {
        let mut m = Module::new(ModuleId::from_raw(0), Ident::from_raw(0));
        m.ports.push(Port {
            name: Ident::from_raw(1),
            direction: Direction::Input,
            shape: Shape::scalar(16),
            signal: SignalId::from_raw(0),
            fields: vec![(Ident::from_raw(2), BitRange::new(8, 8))],
        });
        let port = m.port(Ident::from_raw(1)).unwrap();
        assert_eq!(port.field(Ident::from_raw(2)), Some(BitRange::new(8, 8)));
        assert_eq!(port.field(Ident::from_raw(3)), None);
        assert!(m.port(Ident::from_raw(9)).is_none());
        assert!(!m.frozen);
        assert_eq!(m.upstream().count(), 0);
    }
}
