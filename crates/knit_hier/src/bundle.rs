//! Interface bundles: role-tagged groups of logical ports mapped onto the
//! physical ports of a module.
//!
//! A [`BundleDef`] declares the logical ports of an interface and which
//! [`Group`] each belongs to. A [`Bundle`] instantiates a definition on one
//! module with a [`Role`]; its [`PortMap`]s tie logical bits to physical port
//! bits. The external view of a bundle is its port maps; the internal view is a
//! lazily created set of wires, one per logical port, that the module's own
//! logic can use.

use crate::error::{AddressError, HierError};
use crate::hierarchy::{Hierarchy, PortNaming};
use crate::reference::{BundleRef, PortRef, Ref};
use knit_common::Ident;
use knit_netlist::{BundleDefId, BundleId, Direction, ModuleId, Shape, SigRange, SignalId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which way a logical port flows relative to the bundle role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Output at a provider, input at a consumer.
    Forward,
    /// Input at a provider, output at a consumer.
    Backward,
    /// Input at both roles.
    Shared,
    /// A directionless net.
    Net,
}

impl Group {
    /// The physical direction a port of this group has on a bundle of `role`.
    pub fn direction(self, role: Role) -> Direction {
        match (self, role) {
            (Group::Forward, Role::Provider) | (Group::Backward, Role::Consumer) => {
                Direction::Output
            }
            (Group::Forward, Role::Consumer)
            | (Group::Backward, Role::Provider)
            | (Group::Shared, _) => Direction::Input,
            (Group::Net, _) => Direction::Net,
        }
    }
}

/// The side of an interface a bundle plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Drives the forward group.
    Provider,
    /// Receives the forward group.
    Consumer,
}

impl Role {
    /// The opposite role.
    pub fn flipped(self) -> Role {
        match self {
            Role::Provider => Role::Consumer,
            Role::Consumer => Role::Provider,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Provider => write!(f, "provider"),
            Role::Consumer => write!(f, "consumer"),
        }
    }
}

/// One logical port of a bundle definition.
#[derive(Debug, Clone)]
pub struct LogicalPort {
    /// The port name.
    pub name: Ident,
    /// The port shape.
    pub shape: Shape,
    /// How the port flows.
    pub group: Group,
}

/// The declaration of an interface.
#[derive(Debug, Clone)]
pub struct BundleDef {
    /// The definition's ID.
    pub id: BundleDefId,
    /// The interface name.
    pub name: Ident,
    /// Logical ports in declaration order.
    pub ports: Vec<LogicalPort>,
}

impl BundleDef {
    /// Looks up a logical port by name.
    pub fn port(&self, name: Ident) -> Option<&LogicalPort> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Returns `true` if any logical port is [`Group::Shared`].
    pub fn has_shared(&self) -> bool {
        self.ports.iter().any(|p| p.group == Group::Shared)
    }
}

/// Ties bits of a logical port to bits of a physical port of the same module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortMap {
    /// The physical side.
    pub physical: PortRef,
    /// The logical side.
    pub logical: BundleRef,
    /// Set once the mapping has been wired.
    pub connected: bool,
}

/// An interface instance on a module.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// The bundle's ID.
    pub id: BundleId,
    /// The instance name, unique among the module's bundles.
    pub name: Ident,
    /// The owning module.
    pub module: ModuleId,
    /// The interface it instantiates.
    pub def: BundleDefId,
    /// The role it plays.
    pub role: Role,
    /// Mappings of logical onto physical bits.
    pub maps: Vec<PortMap>,
    /// Internal wires, one per logical port in definition order, once created.
    pub internal: Option<Vec<SignalId>>,
}

impl Hierarchy {
    /// Declares an interface from `(name, shape, group)` triples.
    pub fn add_bundle_def<'a>(
        &mut self,
        name: &str,
        ports: impl IntoIterator<Item = (&'a str, Shape, Group)>,
    ) -> Result<BundleDefId, HierError> {
        let mut logical: Vec<LogicalPort> = Vec::new();
        for (port, shape, group) in ports {
            let port_name = self.interner.get_or_intern(port);
            if logical.iter().any(|p| p.name == port_name) {
                return Err(HierError::DuplicateName {
                    module: name.to_string(),
                    name: port.to_string(),
                });
            }
            if shape.checked_bits().is_none() {
                return Err(AddressError::TooWide {
                    target: format!("{name}.{port}"),
                    shape,
                }
                .into());
            }
            logical.push(LogicalPort {
                name: port_name,
                shape,
                group,
            });
        }
        let name = self.interner.get_or_intern(name);
        Ok(self.defs.alloc_with(|id| BundleDef {
            id,
            name,
            ports: logical,
        }))
    }

    /// Looks up a bundle definition by name.
    pub fn find_bundle_def(&self, name: &str) -> Option<BundleDefId> {
        let name = self.interner.get(name)?;
        self.defs
            .iter()
            .find(|(_, d)| d.name == name)
            .map(|(id, _)| id)
    }

    /// Instantiates `def` on `module` with the given role.
    pub fn add_bundle(
        &mut self,
        module: ModuleId,
        name: &str,
        def: BundleDefId,
        role: Role,
        naming: PortNaming,
    ) -> Result<BundleId, HierError> {
        self.check_mutable(module)?;
        let names = &mut self.modules[module].bundle_names;
        let claimed = match naming {
            PortNaming::Exact => {
                if !names.reserve(name) {
                    return Err(HierError::DuplicateName {
                        module: self.path(module),
                        name: name.to_string(),
                    });
                }
                name.to_string()
            }
            PortNaming::Uniquify => names.uniquify(name),
        };
        let name = self.interner.get_or_intern(&claimed);
        let id = self.bundles.alloc_with(|id| Bundle {
            id,
            name,
            module,
            def,
            role,
            maps: Vec::new(),
            internal: None,
        });
        self.modules[module].bundles.push(id);
        Ok(id)
    }

    /// Looks up a bundle of `module` by name.
    pub fn find_bundle(&self, module: ModuleId, name: &str) -> Result<BundleId, HierError> {
        self.interner
            .get(name)
            .and_then(|n| {
                self.modules[module]
                    .bundles
                    .iter()
                    .copied()
                    .find(|&b| self.bundles[b].name == n)
            })
            .ok_or_else(|| HierError::UnknownBundle {
                module: self.path(module),
                bundle: name.to_string(),
            })
    }

    /// The physical direction a logical port has on `bundle`.
    pub fn logical_direction(&self, bundle: BundleId, port: Ident) -> Option<Direction> {
        let b = &self.bundles[bundle];
        let group = self.defs[b.def].port(port)?.group;
        Some(group.direction(b.role))
    }

    /// Maps logical bits of a bundle onto physical bits of its module.
    pub fn map_port(&mut self, physical: &PortRef, logical: &BundleRef) -> Result<(), HierError> {
        let bundle = &self.bundles[logical.bundle];
        self.check_mutable(bundle.module)?;
        if physical.module != bundle.module {
            return Err(HierError::MapModule {
                physical: self.display_port(physical),
                module: self.path(bundle.module),
                bundle: self.bundle_path(bundle.id),
            });
        }
        if bundle.internal.is_some() {
            return Err(HierError::AliasesInternal {
                bundle: self.bundle_path(bundle.id),
                physical: self.display_port(physical),
            });
        }
        let phys_ref = Ref::Port(physical.clone());
        let log_ref = Ref::Bundle(logical.clone());
        let phys_shape = self.shape_of(&phys_ref)?;
        let log_shape = self.shape_of(&log_ref)?;
        if phys_shape.bits() != log_shape.bits() {
            return Err(AddressError::ShapeMismatch {
                left: self.display_ref(&phys_ref),
                left_shape: phys_shape,
                right: self.display_ref(&log_ref),
                right_shape: log_shape,
            }
            .into());
        }
        let physical_dir = self.port(physical)?.direction;
        let logical_dir = self
            .logical_direction(logical.bundle, logical.port)
            .ok_or_else(|| HierError::UnknownLogicalPort {
                def: self.resolve(self.defs[bundle.def].name).to_string(),
                port: self.resolve(logical.port).to_string(),
            })?;
        if !logical_dir.is_net() && physical_dir != logical_dir {
            return Err(HierError::MapDirection {
                physical: self.display_ref(&phys_ref),
                physical_dir,
                logical: self.display_ref(&log_ref),
                logical_dir,
            });
        }
        if bundle
            .maps
            .iter()
            .any(|m| m.physical == *physical && m.logical == *logical)
        {
            return Err(HierError::DuplicatePortMap {
                bundle: self.bundle_path(bundle.id),
                physical: self.display_ref(&phys_ref),
                logical: self.display_ref(&log_ref),
            });
        }
        self.bundles[logical.bundle].maps.push(PortMap {
            physical: physical.clone(),
            logical: logical.clone(),
            connected: false,
        });
        Ok(())
    }

    /// Logical ports of `bundle` with at least one unmapped bit, skipping the
    /// names in `excluded`.
    pub fn missing_ports(&self, bundle: BundleId, excluded: &[&str]) -> Vec<Ident> {
        let b = &self.bundles[bundle];
        let mut missing = Vec::new();
        for lp in &self.defs[b.def].ports {
            if excluded.contains(&self.resolve(lp.name)) {
                continue;
            }
            let mut covered = vec![false; lp.shape.bits() as usize];
            for map in b.maps.iter().filter(|m| m.logical.port == lp.name) {
                if let Ok(sel) = self.selection(&Ref::Bundle(map.logical.clone())) {
                    for bit in sel.range.lo..sel.range.end() {
                        covered[bit as usize] = true;
                    }
                }
            }
            if covered.iter().any(|c| !c) {
                missing.push(lp.name);
            }
        }
        missing
    }

    /// Returns `true` when every logical bit of `bundle` is mapped.
    pub fn is_fully_mapped(&self, bundle: BundleId) -> bool {
        self.missing_ports(bundle, &[]).is_empty()
    }

    /// The internal wires of `bundle`, creating and wiring them on first use.
    ///
    /// Once the internal view exists every port map is marked connected and no
    /// further mapping is accepted.
    pub fn bundle_internal(&mut self, bundle: BundleId) -> Result<Vec<SignalId>, HierError> {
        if let Some(wires) = &self.bundles[bundle].internal {
            return Ok(wires.clone());
        }
        let b = self.bundles[bundle].clone();
        self.check_mutable(b.module)?;
        let prefix = format!("{}{}", self.resolve(b.name), self.options.separator);
        let ports = self.defs[b.def].ports.clone();
        let mut wires = Vec::with_capacity(ports.len());
        for lp in &ports {
            let name = format!("{prefix}{}", self.resolve(lp.name));
            wires.push(self.add_wire(b.module, &name, lp.shape.clone())?);
        }
        for map in &b.maps {
            let Some(slot) = ports.iter().position(|p| p.name == map.logical.port) else {
                continue;
            };
            let range = self.selection(&Ref::Bundle(map.logical.clone()))?.range;
            let inner = SigRange::new(wires[slot], range);
            let outer = self.sig_range(&map.physical)?;
            if ports[slot].group.direction(b.role) == Direction::Output {
                self.netlist.drive(inner, outer, range.width)?;
            } else {
                self.netlist.drive(outer, inner, range.width)?;
            }
        }
        let entry = &mut self.bundles[bundle];
        for map in &mut entry.maps {
            map.connected = true;
        }
        entry.internal = Some(wires.clone());
        log::debug!("created internal view of {}", self.bundle_path(bundle));
        Ok(wires)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knit_common::LogicVec;

    struct Fixture {
        h: Hierarchy,
        m: ModuleId,
        def: BundleDefId,
    }

    fn fixture() -> Fixture {
        let mut h = Hierarchy::new();
        let m = h.add_module("dev");
        let def = h
            .add_bundle_def(
                "stream",
                [
                    ("data", Shape::scalar(8), Group::Forward),
                    ("ready", Shape::scalar(1), Group::Backward),
                    ("clk", Shape::scalar(1), Group::Shared),
                    ("io", Shape::scalar(2), Group::Net),
                ],
            )
            .unwrap();
        Fixture { h, m, def }
    }

    fn port(h: &mut Hierarchy, m: ModuleId, name: &str, dir: Direction, w: u32) -> PortRef {
        h.add_port(m, name, dir, Shape::scalar(w), PortNaming::Exact)
            .unwrap()
    }

    #[test]
    fn group_directions_swap_with_role() {
        assert_eq!(Group::Forward.direction(Role::Provider), Direction::Output);
        assert_eq!(Group::Forward.direction(Role::Consumer), Direction::Input);
        assert_eq!(Group::Backward.direction(Role::Provider), Direction::Input);
        assert_eq!(Group::Backward.direction(Role::Consumer), Direction::Output);
        assert_eq!(Group::Shared.direction(Role::Provider), Direction::Input);
        assert_eq!(Group::Shared.direction(Role::Consumer), Direction::Input);
        assert_eq!(Group::Net.direction(Role::Consumer), Direction::Net);
        assert_eq!(Role::Provider.flipped(), Role::Consumer);
    }

    #[test]
    fn duplicate_logical_ports_rejected() {
        let mut h = Hierarchy::new();
        let err = h
            .add_bundle_def(
                "bad",
                [
                    ("a", Shape::scalar(1), Group::Forward),
                    ("a", Shape::scalar(1), Group::Backward),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, HierError::DuplicateName { .. }));
    }

    #[test]
    fn map_and_find() {
        let Fixture { mut h, m, def } = fixture();
        let b = h.add_bundle(m, "s", def, Role::Provider, PortNaming::Exact).unwrap();
        assert_eq!(h.find_bundle(m, "s").unwrap(), b);
        assert_eq!(h.find_bundle_def("stream"), Some(def));
        assert!(matches!(
            h.find_bundle(m, "t"),
            Err(HierError::UnknownBundle { .. })
        ));
        let lo = port(&mut h, m, "d_lo", Direction::Output, 4);
        let hi = port(&mut h, m, "d_hi", Direction::Output, 4);
        let data_lo = h.bundle_ref(b, "data[3:0]").unwrap();
        let data_hi = h.bundle_ref(b, "data[7:4]").unwrap();
        h.map_port(&lo, &data_lo).unwrap();
        assert_eq!(h.missing_ports(b, &["ready", "clk", "io"]).len(), 1);
        h.map_port(&hi, &data_hi).unwrap();
        assert!(h.missing_ports(b, &["ready", "clk", "io"]).is_empty());
        assert!(!h.is_fully_mapped(b));
        let physical = h.physical(&h.bundle_ref(b, "data[5]").unwrap().into()).unwrap();
        assert_eq!(physical, h.port_ref(m, "d_hi[1]").unwrap());
    }

    #[test]
    fn map_checks() {
        let Fixture { mut h, m, def } = fixture();
        let b = h.add_bundle(m, "s", def, Role::Consumer, PortNaming::Exact).unwrap();
        let data_in = port(&mut h, m, "data_in", Direction::Input, 8);
        let wrong = port(&mut h, m, "wrong", Direction::Output, 8);
        let narrow = port(&mut h, m, "narrow", Direction::Input, 4);
        let pad = port(&mut h, m, "pad", Direction::Output, 2);
        let data = h.bundle_ref(b, "data").unwrap();
        let io = h.bundle_ref(b, "io").unwrap();

        assert!(matches!(
            h.map_port(&wrong, &data),
            Err(HierError::MapDirection {
                physical_dir: Direction::Output,
                logical_dir: Direction::Input,
                ..
            })
        ));
        assert!(matches!(
            h.map_port(&narrow, &data),
            Err(HierError::Address(AddressError::ShapeMismatch { .. }))
        ));
        // Net logical ports accept any physical direction.
        h.map_port(&pad, &io).unwrap();
        h.map_port(&data_in, &data).unwrap();
        assert!(matches!(
            h.map_port(&data_in, &data),
            Err(HierError::DuplicatePortMap { .. })
        ));

        let other = h.add_module("other");
        let foreign = port(&mut h, other, "x", Direction::Input, 8);
        assert!(matches!(
            h.map_port(&foreign, &data),
            Err(HierError::MapModule { .. })
        ));
    }

    #[test]
    fn incomplete_bundle_not_resolvable() {
        let Fixture { mut h, m, def } = fixture();
        let b = h.add_bundle(m, "s", def, Role::Provider, PortNaming::Exact).unwrap();
        let r: Ref = h.bundle_ref(b, "ready").unwrap().into();
        assert!(matches!(
            h.physical(&r),
            Err(HierError::UnmappedBundlePort { .. })
        ));
        let missing: Vec<&str> = h
            .missing_ports(b, &[])
            .into_iter()
            .map(|n| h.resolve(n))
            .collect();
        assert_eq!(missing, vec!["data", "ready", "clk", "io"]);
    }

    #[test]
    fn internal_view_wires_and_locks_mapping() {
        let Fixture { mut h, m, def } = fixture();
        let b = h.add_bundle(m, "s", def, Role::Provider, PortNaming::Exact).unwrap();
        let data = port(&mut h, m, "data", Direction::Output, 8);
        let ready = port(&mut h, m, "ready", Direction::Input, 1);
        h.map_port(&data, &h.bundle_ref(b, "data").unwrap()).unwrap();
        h.map_port(&ready, &h.bundle_ref(b, "ready").unwrap()).unwrap();

        let wires = h.bundle_internal(b).unwrap();
        assert_eq!(wires.len(), 4);
        assert!(h.bundle(b).maps.iter().all(|m| m.connected));
        assert_eq!(h.bundle_internal(b).unwrap(), wires);

        // Logic driving the internal data wire reaches the physical output.
        let konst = h.netlist.constant(LogicVec::from_u64(0x5A, 8));
        h.netlist
            .drive_from(konst, SigRange::full(wires[0], 8))
            .unwrap();
        assert_eq!(h.value(&data.into()).unwrap().to_u64(), Some(0x5A));

        // A value arriving on the physical input reaches the internal wire.
        h.assign(&ready.into(), LogicVec::from_u64(1, 1)).unwrap();
        assert_eq!(h.netlist.value(SigRange::full(wires[1], 1)).to_u64(), Some(1));

        let late = port(&mut h, m, "clk", Direction::Input, 1);
        let clk = h.bundle_ref(b, "clk").unwrap();
        assert!(matches!(
            h.map_port(&late, &clk),
            Err(HierError::AliasesInternal { .. })
        ));
    }

    #[test]
    fn frozen_bundle_rejects_mapping() {
        let Fixture { mut h, m, def } = fixture();
        let b = h.add_bundle(m, "s", def, Role::Provider, PortNaming::Exact).unwrap();
        let data = port(&mut h, m, "data", Direction::Output, 8);
        h.freeze(m);
        let logical = h.bundle_ref(b, "data").unwrap();
        assert!(matches!(
            h.map_port(&data, &logical),
            Err(HierError::Frozen { .. })
        ));
    }
}
