//! Wiring whole interface bundles.
//!
//! Two bundles of the same definition are joined logical port by logical port.
//! Bundles that are not adjacent to the join level are first pulled up: a
//! bundle of the same role is created on each intermediate module, mapped onto
//! ports punched for every port map of the bundle below. Pull-ups are
//! remembered per module, so connecting the same bundle again reuses them.
//!
//! Lateral joins pair a provider with a consumer. Vertical joins (one bundle's
//! module above the other's) pair bundles of the same role: the outer bundle
//! exposes what the inner one provides or consumes.

use crate::bundle::{Group, PortMap};
use crate::error::HierError;
use crate::hierarchy::{Hierarchy, PortNaming};
use crate::reference::{BundleRef, PortRef, Ref};
use crate::wire::Placement;
use knit_common::Ident;
use knit_netlist::{BitRange, BundleId, Direction, ModuleId};

impl Hierarchy {
    /// Connects two bundles of the same definition.
    ///
    /// Logical ports named in `excluded` may stay unmapped and are not wired.
    /// All checks run before anything is created.
    pub fn connect_bundles(
        &mut self,
        first: BundleId,
        second: BundleId,
        excluded: &[&str],
    ) -> Result<(), HierError> {
        let b1 = self.bundles[first].clone();
        let b2 = self.bundles[second].clone();
        if b1.def != b2.def {
            return Err(HierError::BundleDefMismatch {
                first: self.bundle_path(first),
                first_def: self.resolve(self.defs[b1.def].name).to_string(),
                second: self.bundle_path(second),
                second_def: self.resolve(self.defs[b2.def].name).to_string(),
            });
        }
        let first_missing = self.missing_names(first, excluded);
        let second_missing = self.missing_names(second, excluded);
        if !first_missing.is_empty() || !second_missing.is_empty() {
            return Err(HierError::IncompleteBundles {
                first: self.bundle_path(first),
                first_missing,
                second: self.bundle_path(second),
                second_missing,
            });
        }
        let placement = self.placement(b1.module, b2.module)?;
        let role_error = |kind, expected| HierError::RoleMismatch {
            kind,
            first: self.bundle_path(first),
            first_role: b1.role,
            second: self.bundle_path(second),
            second_role: b2.role,
            expected,
        };
        match placement {
            Placement::Same => {
                return Err(HierError::BundleLoopback {
                    first: self.bundle_path(first),
                    second: self.bundle_path(second),
                    module: self.path(b1.module),
                });
            }
            Placement::Lateral { .. } if b1.role == b2.role => {
                return Err(role_error("horizontal", "different"));
            }
            Placement::FirstAbove | Placement::SecondAbove if b1.role != b2.role => {
                return Err(role_error("vertical", "equal"));
            }
            _ => {}
        }
        self.check_bundle_route(b1.module, b2.module, placement)?;

        match placement {
            Placement::Lateral { join } => {
                let top1 = self.child_toward(join, b1.module).unwrap_or(b1.module);
                let top2 = self.child_toward(join, b2.module).unwrap_or(b2.module);
                let p1 = self.pull_up(first, top1)?;
                let p2 = self.pull_up(second, top2)?;
                self.join_lateral(p1, p2, excluded)?;
            }
            Placement::FirstAbove => {
                let top = self.child_toward(b1.module, b2.module).unwrap_or(b2.module);
                let inner = self.pull_up(second, top)?;
                self.join_vertical(first, inner, excluded)?;
            }
            Placement::SecondAbove => {
                let top = self.child_toward(b2.module, b1.module).unwrap_or(b1.module);
                let inner = self.pull_up(first, top)?;
                self.join_vertical(second, inner, excluded)?;
            }
            Placement::Same => {}
        }
        log::debug!(
            "connected bundles {} and {}",
            self.bundle_path(first),
            self.bundle_path(second)
        );
        Ok(())
    }

    fn missing_names(&self, bundle: BundleId, excluded: &[&str]) -> Vec<String> {
        self.missing_ports(bundle, excluded)
            .into_iter()
            .map(|n| self.resolve(n).to_string())
            .collect()
    }

    fn check_bundle_route(
        &self,
        m1: ModuleId,
        m2: ModuleId,
        placement: Placement,
    ) -> Result<(), HierError> {
        let mut touched = vec![m1, m2];
        match placement {
            Placement::Lateral { join } => {
                touched.extend(self.path_between(join, m1));
                touched.extend(self.path_between(join, m2));
            }
            Placement::FirstAbove => touched.extend(self.path_between(m1, m2)),
            Placement::SecondAbove => touched.extend(self.path_between(m2, m1)),
            Placement::Same => {}
        }
        touched.into_iter().try_for_each(|m| self.check_mutable(m))
    }

    /// Carries `bundle` up to the module `top`, one same-role bundle per level.
    pub(crate) fn pull_up(&mut self, bundle: BundleId, top: ModuleId) -> Result<BundleId, HierError> {
        let origin = self.bundles[bundle].module;
        if origin == top {
            return Ok(bundle);
        }
        let sep = self.options.separator.clone();
        let origin_name = self.name(origin).to_string();
        let bundle_name = self.resolve(self.bundles[bundle].name).to_string();
        let mut levels = self.path_between(top, origin);
        levels.push(top);
        let mut cur = bundle;
        for m in levels {
            if let Some(&hit) = self.modules[m].pulled.get(&cur) {
                log::trace!("reusing pulled bundle {}", self.bundle_path(hit));
                cur = hit;
                continue;
            }
            let below = self.bundles[cur].clone();
            let name = format!("{origin_name}{sep}{bundle_name}");
            let pulled = self.add_bundle(m, &name, below.def, below.role, PortNaming::Uniquify)?;
            for map in &below.maps {
                let direction = self.port(&map.physical)?.direction;
                let shape = self.shape_of(&Ref::Port(map.physical.clone()))?;
                let base = format!("{origin_name}{sep}{}", self.resolve(map.physical.port));
                let port = self.add_port(m, &base, direction, shape, PortNaming::Uniquify)?;
                if direction == Direction::Input {
                    self.bind(&port, &map.physical)?;
                    self.modules[below.module]
                        .upstream
                        .insert(port.clone(), map.physical.clone());
                } else {
                    self.bind(&map.physical, &port)?;
                    self.modules[m]
                        .upstream
                        .insert(map.physical.clone(), port.clone());
                }
                self.bundles[pulled].maps.push(PortMap {
                    physical: port,
                    logical: BundleRef {
                        bundle: pulled,
                        ..map.logical.clone()
                    },
                    connected: true,
                });
            }
            for map in &mut self.bundles[cur].maps {
                map.connected = true;
            }
            self.modules[m].pulled.insert(cur, pulled);
            log::debug!(
                "pulled {} up to {}",
                self.bundle_path(cur),
                self.bundle_path(pulled)
            );
            cur = pulled;
        }
        Ok(cur)
    }

    fn join_lateral(
        &mut self,
        first: BundleId,
        second: BundleId,
        excluded: &[&str],
    ) -> Result<(), HierError> {
        let role = self.bundles[first].role;
        for lp in self.joined_ports(first, excluded) {
            match (lp.1, lp.1.direction(role)) {
                (Group::Shared, _) => log::warn!(
                    "not joining shared port `{}` between {} and {}",
                    self.resolve(lp.0),
                    self.bundle_path(first),
                    self.bundle_path(second)
                ),
                (_, Direction::Input) => self.join_port(second, first, lp.0)?,
                _ => self.join_port(first, second, lp.0)?,
            }
        }
        Ok(())
    }

    fn join_vertical(
        &mut self,
        outer: BundleId,
        inner: BundleId,
        excluded: &[&str],
    ) -> Result<(), HierError> {
        let role = self.bundles[outer].role;
        for lp in self.joined_ports(outer, excluded) {
            if lp.1.direction(role) == Direction::Input {
                self.join_port(outer, inner, lp.0)?;
            } else {
                self.join_port(inner, outer, lp.0)?;
            }
        }
        Ok(())
    }

    fn joined_ports(&self, bundle: BundleId, excluded: &[&str]) -> Vec<(Ident, Group)> {
        self.defs[self.bundles[bundle].def]
            .ports
            .iter()
            .filter(|lp| !excluded.contains(&self.resolve(lp.name)))
            .map(|lp| (lp.name, lp.group))
            .collect()
    }

    /// Wires every overlap of the two bundles' maps of one logical port.
    fn join_port(
        &mut self,
        driver: BundleId,
        receiver: BundleId,
        port: Ident,
    ) -> Result<(), HierError> {
        let dmaps = self.maps_of(driver, port);
        let rmaps = self.maps_of(receiver, port);
        for rm in &rmaps {
            let rl = self.selection(&Ref::Bundle(rm.logical.clone()))?.range;
            for dm in &dmaps {
                let dl = self.selection(&Ref::Bundle(dm.logical.clone()))?.range;
                let Some(overlap) = rl.intersect(dl) else {
                    continue;
                };
                let d = self.mapped_bits(dm, overlap)?;
                let r = self.mapped_bits(rm, overlap)?;
                self.connect(&Ref::Port(d), &Ref::Port(r))?;
            }
        }
        for b in [driver, receiver] {
            for map in self.bundles[b].maps.iter_mut().filter(|m| m.logical.port == port) {
                map.connected = true;
            }
        }
        Ok(())
    }

    fn maps_of(&self, bundle: BundleId, port: Ident) -> Vec<PortMap> {
        self.bundles[bundle]
            .maps
            .iter()
            .filter(|m| m.logical.port == port)
            .cloned()
            .collect()
    }

    /// The physical bits behind logical bits `logical` of one port map.
    fn mapped_bits(&self, map: &PortMap, logical: BitRange) -> Result<PortRef, HierError> {
        let have = self.selection(&Ref::Bundle(map.logical.clone()))?.range;
        let phys = self.selection(&Ref::Port(map.physical.clone()))?.range;
        let range = BitRange::new(phys.lo + (logical.lo - have.lo), logical.width);
        self.port_ref_in(map.physical.module, map.physical.port, range)
    }
}
