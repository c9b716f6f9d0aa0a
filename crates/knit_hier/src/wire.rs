//! Hierarchical auto-wiring.
//!
//! [`Hierarchy::connect`] wires a driver reference to a receiver reference
//! anywhere in the same tree. Endpoints on modules that are not adjacent are
//! joined by punching intermediate ports: output ports on each module from the
//! driver up to just below the join level, input ports on each module from the
//! join level down to just above the receiver. Punched ports are remembered per
//! module (source reference -> local port) so later connections from the same
//! source reuse them instead of punching a second path.
//!
//! Legality, with `D` the driver on module `md` and `R` the receiver on `mr`
//! (a net on either side is always legal):
//!
//! | placement              | driver          | receiver |
//! |------------------------|-----------------|----------|
//! | same module            | input or output | output   |
//! | lateral                | output          | input    |
//! | `md` above `mr`        | input           | input    |
//! | `mr` above `md`        | input or output | output   |

use crate::error::{AddressError, HierError};
use crate::hierarchy::{Hierarchy, PortNaming};
use crate::reference::{PortRef, Ref};
use knit_netlist::{Direction, ModuleId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Options that shape the names and structure of punched ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireOptions {
    /// Joins the origin module name and the port name of a punched port.
    pub separator: String,
    /// Keep the base name on vertical punches whose endpoints share it.
    pub keep_vertical_names: bool,
}

impl Default for WireOptions {
    fn default() -> Self {
        Self {
            separator: "_".to_string(),
            keep_vertical_names: true,
        }
    }
}

/// Where two modules sit relative to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Both references are on one module.
    Same,
    /// Neither module is above the other; `join` is their nearest common ancestor.
    Lateral {
        /// The nearest common ancestor.
        join: ModuleId,
    },
    /// The first module is a strict ancestor of the second.
    FirstAbove,
    /// The second module is a strict ancestor of the first.
    SecondAbove,
}

impl Placement {
    /// Returns `true` for an ancestor/descendant pair.
    pub fn is_vertical(self) -> bool {
        matches!(self, Placement::FirstAbove | Placement::SecondAbove)
    }
}

/// What a call to [`Hierarchy::connect`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePath {
    /// The physical driver bits.
    pub driver: PortRef,
    /// The physical receiver bits.
    pub receiver: PortRef,
    /// Intermediate ports created by this call, in the order they were wired.
    pub created: Vec<PortRef>,
    /// Intermediate ports from earlier calls that this call reused.
    pub reused: Vec<PortRef>,
}

impl WirePath {
    fn new(driver: PortRef, receiver: PortRef) -> Self {
        Self {
            driver,
            receiver,
            created: Vec::new(),
            reused: Vec::new(),
        }
    }
}

impl Hierarchy {
    /// Classifies the relative position of two modules.
    pub fn placement(&self, first: ModuleId, second: ModuleId) -> Result<Placement, HierError> {
        if first == second {
            return Ok(Placement::Same);
        }
        if self.is_ancestor(first, second) {
            return Ok(Placement::FirstAbove);
        }
        if self.is_ancestor(second, first) {
            return Ok(Placement::SecondAbove);
        }
        match self.common_ancestor(first, second) {
            Some(join) => Ok(Placement::Lateral { join }),
            None => Err(HierError::NoCommonAncestor {
                first: self.path(first),
                second: self.path(second),
            }),
        }
    }

    /// Wires `driver` to `receiver`, punching through the hierarchy as needed.
    ///
    /// Bundle references are resolved to their physical ports first. Every
    /// check (freezing, legality, shapes) runs before anything is created.
    pub fn connect(&mut self, driver: &Ref, receiver: &Ref) -> Result<WirePath, HierError> {
        let d = self.physical(driver)?;
        let r = self.physical(receiver)?;
        let placement = self.placement(d.module, r.module)?;
        self.check_route(d.module, r.module, placement)?;
        self.check_legal(&d, &r, placement)?;
        self.fan_out(&d, &r)?;

        let base = self.punch_base(&d, &r, placement);
        let driver_net = self.port(&d)?.direction.is_net();
        let receiver_net = self.port(&r)?.direction.is_net();
        let mut path = WirePath::new(d.clone(), r.clone());
        match placement {
            Placement::Same => self.bind(&d, &r)?,
            Placement::Lateral { join } => {
                let top = self.below(join, d.module)?;
                let src = self.punch_up(&d, top, &base, driver_net, &mut path)?;
                self.punch_down(src, &r, join, &base, receiver_net, &mut path)?;
            }
            Placement::FirstAbove => {
                self.punch_down(d.clone(), &r, d.module, &base, receiver_net, &mut path)?;
            }
            Placement::SecondAbove => {
                let top = self.below(r.module, d.module)?;
                let src = self.punch_up(&d, top, &base, driver_net, &mut path)?;
                self.bind(&src, &r)?;
            }
        }
        log::debug!(
            "connected {} -> {} ({} created, {} reused)",
            self.display_port(&d),
            self.display_port(&r),
            path.created.len(),
            path.reused.len()
        );
        Ok(path)
    }

    /// Exports `r` to the boundary of `ancestor`, returning the port there.
    ///
    /// Outputs and nets travel up through output (or net) ports, reusing any
    /// already punched. An input is fed from a new input port on `ancestor`.
    pub fn punch(&mut self, r: &Ref, ancestor: ModuleId) -> Result<PortRef, HierError> {
        let p = self.physical(r)?;
        if !self.is_ancestor(ancestor, p.module) {
            return Err(HierError::NotAncestor {
                module: self.path(p.module),
                ancestor: self.path(ancestor),
            });
        }
        self.check_mutable(ancestor)?;
        self.check_mutable(p.module)?;
        for m in self.path_between(ancestor, p.module) {
            self.check_mutable(m)?;
        }
        let direction = self.port(&p)?.direction;
        let base = format!(
            "{}{}{}",
            self.name(p.module),
            self.options.separator,
            self.resolve(p.port)
        );
        let mut path = WirePath::new(p.clone(), p.clone());
        match direction {
            Direction::Output | Direction::Net => {
                self.punch_up(&p, ancestor, &base, direction.is_net(), &mut path)
            }
            Direction::Input => {
                let shape = self.shape_of(&Ref::Port(p.clone()))?;
                let top =
                    self.add_port(ancestor, &base, Direction::Input, shape, PortNaming::Uniquify)?;
                log::debug!(
                    "punched {} for {}",
                    self.display_port(&top),
                    self.display_port(&p)
                );
                self.punch_down(top.clone(), &p, ancestor, &base, false, &mut path)?;
                Ok(top)
            }
        }
    }

    fn below(&self, ancestor: ModuleId, id: ModuleId) -> Result<ModuleId, HierError> {
        self.child_toward(ancestor, id)
            .ok_or_else(|| HierError::NotAncestor {
                module: self.path(id),
                ancestor: self.path(ancestor),
            })
    }

    fn check_route(
        &self,
        md: ModuleId,
        mr: ModuleId,
        placement: Placement,
    ) -> Result<(), HierError> {
        let mut touched = vec![md, mr];
        match placement {
            Placement::Same => {}
            Placement::Lateral { join } => {
                touched.extend(self.path_between(join, md));
                touched.extend(self.path_between(join, mr));
            }
            Placement::FirstAbove => touched.extend(self.path_between(md, mr)),
            Placement::SecondAbove => touched.extend(self.path_between(mr, md)),
        }
        touched.into_iter().try_for_each(|m| self.check_mutable(m))
    }

    fn check_legal(&self, d: &PortRef, r: &PortRef, placement: Placement) -> Result<(), HierError> {
        let dd = self.port(d)?.direction;
        let rd = self.port(r)?.direction;
        if dd.is_net() || rd.is_net() {
            return Ok(());
        }
        let vertical = || HierError::VerticalDirection {
            driver: self.display_port(d),
            driver_dir: dd,
            receiver: self.display_port(r),
            receiver_dir: rd,
        };
        match placement {
            Placement::Same if rd != Direction::Output => Err(HierError::IllegalReceiver {
                receiver: self.display_port(r),
                receiver_dir: rd,
                module: self.path(r.module),
            }),
            Placement::Lateral { .. } if dd != Direction::Output || rd != Direction::Input => {
                Err(HierError::FeedThrough {
                    driver: self.display_port(d),
                    driver_dir: dd,
                    receiver: self.display_port(r),
                    receiver_dir: rd,
                })
            }
            Placement::FirstAbove if dd != Direction::Input || rd != Direction::Input => {
                Err(vertical())
            }
            Placement::SecondAbove if rd != Direction::Output => Err(vertical()),
            _ => Ok(()),
        }
    }

    /// The element width a drive from `d` to `r` fans out in.
    fn fan_out(&self, d: &PortRef, r: &PortRef) -> Result<u32, HierError> {
        let (dr, rr) = (Ref::Port(d.clone()), Ref::Port(r.clone()));
        let ds = self.shape_of(&dr)?;
        let rs = self.shape_of(&rr)?;
        let same_elements = !(ds.is_array() && rs.is_array()) || ds.width == rs.width;
        if ds.bits() != rs.bits() || !same_elements {
            return Err(AddressError::ShapeMismatch {
                left: self.display_ref(&dr),
                left_shape: ds,
                right: self.display_ref(&rr),
                right_shape: rs,
            }
            .into());
        }
        Ok(match (ds.is_array(), rs.is_array()) {
            (true, _) => ds.width,
            (false, true) => rs.width,
            (false, false) => ds.bits(),
        })
    }

    /// Records the drive between two adjacent references.
    pub(crate) fn bind(&mut self, d: &PortRef, r: &PortRef) -> Result<(), HierError> {
        let chunk = self.fan_out(d, r)?;
        let src = self.sig_range(d)?;
        let dst = self.sig_range(r)?;
        self.netlist.drive(src, dst, chunk)?;
        log::trace!("bound {} -> {}", self.display_port(d), self.display_port(r));
        Ok(())
    }

    fn punch_base(&self, d: &PortRef, r: &PortRef, placement: Placement) -> String {
        if placement.is_vertical() && self.options.keep_vertical_names && d.port == r.port {
            return self.resolve(d.port).to_string();
        }
        format!(
            "{}{}{}",
            self.name(d.module),
            self.options.separator,
            self.resolve(d.port)
        )
    }

    /// Carries `from` up to the module `top`, creating or reusing one port per
    /// level, and returns the reference on `top`.
    fn punch_up(
        &mut self,
        from: &PortRef,
        top: ModuleId,
        base: &str,
        net: bool,
        path: &mut WirePath,
    ) -> Result<PortRef, HierError> {
        let mut cur = from.clone();
        if from.module == top {
            return Ok(cur);
        }
        let mut levels = self.path_between(top, from.module);
        levels.push(top);
        for m in levels {
            if let Some(hit) = self.modules[m].upstream.get(&cur).cloned() {
                log::trace!("reusing {} for {}", self.display_port(&hit), self.display_port(&cur));
                path.reused.push(hit.clone());
                cur = hit;
                continue;
            }
            let direction = if net { Direction::Net } else { Direction::Output };
            let shape = self.shape_of(&Ref::Port(cur.clone()))?;
            let port = self.add_port(m, base, direction, shape, PortNaming::Uniquify)?;
            self.bind(&cur, &port)?;
            log::debug!(
                "punched {} up from {}",
                self.display_port(&port),
                self.display_port(&cur)
            );
            self.modules[m].upstream.insert(cur, port.clone());
            path.created.push(port.clone());
            cur = port;
        }
        Ok(cur)
    }

    /// Carries `src`, visible inside `join`, down to the receiver `r`.
    ///
    /// Before creating anything the receiver's chain of ancestors is searched
    /// bottom-up for a port that already carries `src`, directly or through
    /// earlier punched paths; ports are only created below the lowest such hit.
    fn punch_down(
        &mut self,
        src: PortRef,
        r: &PortRef,
        join: ModuleId,
        base: &str,
        net: bool,
        path: &mut WirePath,
    ) -> Result<(), HierError> {
        let chain = self.path_between(join, r.module);
        let carriers = self.carriers(&src);
        let mut cur = src;
        let mut fresh = chain.len();
        for (i, &m) in chain.iter().enumerate() {
            let hit = self.modules[m]
                .upstream
                .iter()
                .filter(|(k, v)| carriers.contains(*k) && self.is_downstream_port(v))
                .map(|(_, v)| v)
                .min()
                .cloned();
            if let Some(hit) = hit {
                log::trace!("reusing {} for {}", self.display_port(&hit), self.display_port(r));
                path.reused.push(hit.clone());
                cur = hit;
                fresh = i;
                break;
            }
        }
        for &m in chain[..fresh].iter().rev() {
            let direction = if net { Direction::Net } else { Direction::Input };
            let shape = self.shape_of(&Ref::Port(cur.clone()))?;
            let port = self.add_port(m, base, direction, shape, PortNaming::Uniquify)?;
            self.bind(&cur, &port)?;
            log::debug!(
                "punched {} down from {}",
                self.display_port(&port),
                self.display_port(&cur)
            );
            self.modules[m].upstream.insert(cur, port.clone());
            path.created.push(port.clone());
            cur = port;
        }
        self.bind(&cur, r)
    }

    fn is_downstream_port(&self, r: &PortRef) -> bool {
        self.port(r)
            .map(|p| p.direction != Direction::Output)
            .unwrap_or(false)
    }

    /// Every reference known to carry the same bits as `src`, following the
    /// recorded punches of all modules transitively.
    fn carriers(&self, src: &PortRef) -> HashSet<PortRef> {
        let mut edges: HashMap<&PortRef, Vec<&PortRef>> = HashMap::new();
        for m in self.modules() {
            for (k, v) in m.upstream() {
                edges.entry(k).or_default().push(v);
            }
        }
        let mut seen = HashSet::from([src.clone()]);
        let mut queue = VecDeque::from([src]);
        while let Some(cur) = queue.pop_front() {
            for &next in edges.get(cur).into_iter().flatten() {
                if seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knit_common::LogicVec;
    use knit_netlist::Shape;

    fn port(h: &mut Hierarchy, m: ModuleId, name: &str, dir: Direction, w: u32) -> Ref {
        h.add_port(m, name, dir, Shape::scalar(w), PortNaming::Exact)
            .unwrap()
            .into()
    }

    fn names(h: &Hierarchy, refs: &[PortRef]) -> Vec<String> {
        refs.iter().map(|r| h.display_port(r)).collect()
    }

    #[test]
    fn siblings_wire_directly() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let a = h.add_submodule(top, "a").unwrap();
        let b = h.add_submodule(top, "b").unwrap();
        let x = port(&mut h, a, "x", Direction::Output, 8);
        let y = port(&mut h, b, "y", Direction::Input, 8);
        let path = h.connect(&x, &y).unwrap();
        assert!(path.created.is_empty());
        assert_eq!(h.module(a).ports.len(), 1);
        assert_eq!(h.module(b).ports.len(), 1);
        h.assign(&x, LogicVec::from_u64(0x3C, 8)).unwrap();
        assert_eq!(h.value(&y).unwrap().to_u64(), Some(0x3C));
    }

    #[test]
    fn lateral_punches_both_sides() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let l = h.add_submodule(top, "l").unwrap();
        let src = h.add_submodule(l, "src").unwrap();
        let r = h.add_submodule(top, "r").unwrap();
        let dst = h.add_submodule(r, "dst").unwrap();
        let x = port(&mut h, src, "x", Direction::Output, 4);
        let y = port(&mut h, dst, "y", Direction::Input, 4);
        let path = h.connect(&x, &y).unwrap();
        assert_eq!(names(&h, &path.created), vec!["top.l.src_x", "top.r.src_x"]);
        assert_eq!(h.port(&path.created[0]).unwrap().direction, Direction::Output);
        assert_eq!(h.port(&path.created[1]).unwrap().direction, Direction::Input);
        h.assign(&x, LogicVec::from_u64(0xA, 4)).unwrap();
        assert_eq!(h.value(&y).unwrap().to_u64(), Some(0xA));
    }

    #[test]
    fn fan_out_reuses_shared_levels() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let a = h.add_submodule(top, "a").unwrap();
        let deep = h.add_submodule(a, "deep").unwrap();
        let b = h.add_submodule(top, "b").unwrap();
        let b1 = h.add_submodule(b, "b1").unwrap();
        let b2 = h.add_submodule(b, "b2").unwrap();
        let d = port(&mut h, deep, "d", Direction::Output, 2);
        let r1 = port(&mut h, b1, "r", Direction::Input, 2);
        let r2 = port(&mut h, b2, "r", Direction::Input, 2);

        let first = h.connect(&d, &r1).unwrap();
        assert_eq!(first.created.len(), 2);
        let second = h.connect(&d, &r2).unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.reused.len(), 2);
        // One intermediate port on each of `a` and `b`.
        assert_eq!(h.module(a).ports.len(), 1);
        assert_eq!(h.module(b).ports.len(), 1);
    }

    #[test]
    fn reuse_follows_earlier_paths_transitively() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let src = h.add_submodule(top, "src").unwrap();
        let b = h.add_submodule(top, "b").unwrap();
        let c = h.add_submodule(b, "c").unwrap();
        let d1 = h.add_submodule(c, "d1").unwrap();
        let d2 = h.add_submodule(c, "d2").unwrap();
        let x = port(&mut h, src, "x", Direction::Output, 1);
        let y1 = port(&mut h, d1, "y", Direction::Input, 1);
        let y2 = port(&mut h, d2, "y", Direction::Input, 1);
        h.connect(&x, &y1).unwrap();
        let second = h.connect(&x, &y2).unwrap();
        // The port on `c` is only reachable from `x` through the one on `b`.
        assert_eq!(names(&h, &second.reused), vec!["top.b.c.src_x"]);
        assert!(second.created.is_empty());
    }

    #[test]
    fn vertical_down_keeps_shared_name() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let mid = h.add_submodule(top, "mid").unwrap();
        let leaf = h.add_submodule(mid, "leaf").unwrap();
        let clk = port(&mut h, top, "clk", Direction::Input, 1);
        let leaf_clk = port(&mut h, leaf, "clk", Direction::Input, 1);
        let path = h.connect(&clk, &leaf_clk).unwrap();
        assert_eq!(names(&h, &path.created), vec!["top.mid.clk"]);
        h.assign(&clk, LogicVec::from_u64(1, 1)).unwrap();
        assert_eq!(h.value(&leaf_clk).unwrap().to_u64(), Some(1));
    }

    #[test]
    fn vertical_name_prefix_when_configured() {
        let mut h = Hierarchy::with_options(WireOptions {
            separator: "__".into(),
            keep_vertical_names: false,
        });
        let top = h.add_module("top");
        let mid = h.add_submodule(top, "mid").unwrap();
        let leaf = h.add_submodule(mid, "leaf").unwrap();
        let q = port(&mut h, leaf, "q", Direction::Output, 1);
        let out = port(&mut h, top, "q", Direction::Output, 1);
        let path = h.connect(&q, &out).unwrap();
        assert_eq!(names(&h, &path.created), vec!["top.mid.leaf__q"]);
    }

    #[test]
    fn child_input_drives_parent_output() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let child = h.add_submodule(top, "child").unwrap();
        let i = port(&mut h, child, "i", Direction::Input, 1);
        let o = port(&mut h, top, "o", Direction::Output, 1);
        h.connect(&i, &o).unwrap();
    }

    #[test]
    fn direction_rejections() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let a = h.add_submodule(top, "a").unwrap();
        let b = h.add_submodule(top, "b").unwrap();
        let ao = port(&mut h, a, "o", Direction::Output, 1);
        let bo = port(&mut h, b, "o", Direction::Output, 1);
        let ai = port(&mut h, a, "i", Direction::Input, 1);
        let bi = port(&mut h, b, "i", Direction::Input, 1);
        let ti = port(&mut h, top, "ti", Direction::Input, 1);
        let to = port(&mut h, top, "to", Direction::Output, 1);

        assert!(matches!(h.connect(&ao, &bo), Err(HierError::FeedThrough { .. })));
        assert!(matches!(h.connect(&ai, &bi), Err(HierError::FeedThrough { .. })));
        // Child input driving a parent input.
        assert!(matches!(h.connect(&ai, &ti), Err(HierError::VerticalDirection { .. })));
        // Parent output driving a child input.
        assert!(matches!(h.connect(&to, &ai), Err(HierError::VerticalDirection { .. })));
        // Loop-back into an input of the same module.
        assert!(matches!(h.connect(&ao, &ai), Err(HierError::IllegalReceiver { .. })));
        // Nothing was created along the way.
        assert_eq!(h.module(top).ports.len(), 2);
        h.connect(&ti, &ai).unwrap();
        h.connect(&ai, &ao).unwrap();
    }

    #[test]
    fn nets_are_always_legal() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let a = h.add_submodule(top, "a").unwrap();
        let b = h.add_submodule(top, "b").unwrap();
        let na = port(&mut h, a, "n", Direction::Net, 1);
        let nb = port(&mut h, b, "n", Direction::Net, 1);
        let ai = port(&mut h, a, "i", Direction::Input, 1);
        h.connect(&na, &nb).unwrap();
        h.connect(&nb, &na).unwrap();
        h.connect(&ai, &nb).unwrap();
    }

    #[test]
    fn unrelated_trees_rejected() {
        let mut h = Hierarchy::new();
        let t1 = h.add_module("t1");
        let t2 = h.add_module("t2");
        let x = port(&mut h, t1, "x", Direction::Output, 1);
        let y = port(&mut h, t2, "y", Direction::Input, 1);
        assert_eq!(
            h.connect(&x, &y).unwrap_err(),
            HierError::NoCommonAncestor {
                first: "t1".into(),
                second: "t2".into()
            }
        );
    }

    #[test]
    fn frozen_route_rejected_before_mutation() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let mid = h.add_submodule(top, "mid").unwrap();
        let leaf = h.add_submodule(mid, "leaf").unwrap();
        let other = h.add_submodule(top, "other").unwrap();
        let x = port(&mut h, leaf, "x", Direction::Output, 1);
        let y = port(&mut h, other, "y", Direction::Input, 1);
        h.freeze(mid);
        let err = h.connect(&x, &y).unwrap_err();
        assert!(matches!(err, HierError::Frozen { .. }));
        assert!(h.module(other).ports.len() == 1);
        assert!(h.netlist().signal(h.port(y.as_port().unwrap()).unwrap().signal).drivers.is_empty());
    }

    #[test]
    fn shape_checks() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let a = h.add_submodule(top, "a").unwrap();
        let b = h.add_submodule(top, "b").unwrap();
        let x = port(&mut h, a, "x", Direction::Output, 8);
        let y = port(&mut h, b, "y", Direction::Input, 4);
        assert!(matches!(
            h.connect(&x, &y),
            Err(HierError::Address(AddressError::ShapeMismatch { .. }))
        ));
        let arr4 = h
            .add_port(a, "a4", Direction::Output, Shape::array([2], 4), PortNaming::Exact)
            .unwrap()
            .into();
        let arr2 = h
            .add_port(b, "a2", Direction::Input, Shape::array([4], 2), PortNaming::Exact)
            .unwrap()
            .into();
        assert!(matches!(
            h.connect(&arr4, &arr2),
            Err(HierError::Address(AddressError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn arrays_fan_out_per_element() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let a = h.add_submodule(top, "a").unwrap();
        let b = h.add_submodule(top, "b").unwrap();
        h.add_port(a, "src", Direction::Output, Shape::array([4, 3], 8), PortNaming::Exact)
            .unwrap();
        let dst = h
            .add_port(b, "dst", Direction::Input, Shape::array([5, 3], 8), PortNaming::Exact)
            .unwrap();
        let row = h.port_ref(a, "src[2]").unwrap().into();
        let dst_row = h.port_ref(b, "dst[3]").unwrap().into();
        h.connect(&row, &dst_row).unwrap();
        let signal = h.port(&dst).unwrap().signal;
        assert_eq!(h.netlist().signal(signal).drivers.len(), 3);
    }

    #[test]
    fn punch_output_to_ancestor() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let mid = h.add_submodule(top, "mid").unwrap();
        let leaf = h.add_submodule(mid, "leaf").unwrap();
        let x = port(&mut h, leaf, "x", Direction::Output, 8);
        let at_top = h.punch(&x, top).unwrap();
        assert_eq!(h.display_port(&at_top), "top.leaf_x");
        assert_eq!(h.module(mid).ports.len(), 1);
        // Punching again reuses the same path.
        assert_eq!(h.punch(&x, top).unwrap(), at_top);
        assert_eq!(h.module(top).ports.len(), 1);
        h.assign(&x, LogicVec::from_u64(7, 8)).unwrap();
        assert_eq!(h.value(&at_top.into()).unwrap().to_u64(), Some(7));
    }

    #[test]
    fn punch_input_from_ancestor() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let mid = h.add_submodule(top, "mid").unwrap();
        let leaf = h.add_submodule(mid, "leaf").unwrap();
        let i = port(&mut h, leaf, "i", Direction::Input, 2);
        let at_top = h.punch(&i, top).unwrap();
        assert_eq!(h.port(&at_top).unwrap().direction, Direction::Input);
        h.assign(&at_top.into(), LogicVec::from_u64(2, 2)).unwrap();
        assert_eq!(h.value(&i).unwrap().to_u64(), Some(2));
        assert!(matches!(
            h.punch(&i, leaf),
            Err(HierError::NotAncestor { .. })
        ));
    }

    #[test]
    fn sliced_drivers_punch_sliced_ports() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let mid = h.add_submodule(top, "mid").unwrap();
        let leaf = h.add_submodule(mid, "leaf").unwrap();
        let sink = h.add_submodule(top, "sink").unwrap();
        let x = port(&mut h, leaf, "x", Direction::Output, 8);
        let lo = port(&mut h, sink, "lo", Direction::Input, 4);
        let hi = port(&mut h, sink, "hi", Direction::Input, 4);
        let x_lo = h.slice(&x, 3, 0).unwrap();
        let x_hi = h.slice(&x, 7, 4).unwrap();
        h.connect(&x_lo, &lo).unwrap();
        h.connect(&x_hi, &hi).unwrap();
        let widths: Vec<u32> = h.module(mid).ports.iter().map(|p| p.shape.bits()).collect();
        assert_eq!(widths, vec![4, 4]);
        h.assign(&x, LogicVec::from_u64(0x96, 8)).unwrap();
        assert_eq!(h.value(&lo).unwrap().to_u64(), Some(0x6));
        assert_eq!(h.value(&hi).unwrap().to_u64(), Some(0x9));
    }

    #[test]
    fn placement_classification() {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        let a = h.add_submodule(top, "a").unwrap();
        let b = h.add_submodule(top, "b").unwrap();
        assert_eq!(h.placement(a, a).unwrap(), Placement::Same);
        assert_eq!(h.placement(top, a).unwrap(), Placement::FirstAbove);
        assert_eq!(h.placement(a, top).unwrap(), Placement::SecondAbove);
        assert_eq!(h.placement(a, b).unwrap(), Placement::Lateral { join: top });
        assert!(Placement::FirstAbove.is_vertical());
    }
}
