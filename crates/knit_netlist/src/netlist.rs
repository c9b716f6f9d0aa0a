//! The signal graph: node storage, drives, and value read-back.

use crate::arena::Arena;
use crate::error::NetlistError;
use crate::ids::{ModuleId, SignalId};
use crate::loads::LoadIndex;
use crate::shape::{BitRange, Shape};
use crate::signal::{Direction, Driver, Signal, SignalKind};
use knit_common::{Ident, LogicVec};
use std::collections::{HashMap, HashSet};

/// A contiguous part of one signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SigRange {
    /// The signal being addressed.
    pub signal: SignalId,
    /// The selected bits.
    pub range: BitRange,
}

impl SigRange {
    /// Selects `range` of `signal`.
    pub fn new(signal: SignalId, range: BitRange) -> Self {
        Self { signal, range }
    }

    /// Selects all `width` bits of `signal`.
    pub fn full(signal: SignalId, width: u32) -> Self {
        Self::new(signal, BitRange::full(width))
    }
}

/// The signal graph shared by every module of a hierarchy.
///
/// Nodes are only ever appended. Sub-range reads are materialized as
/// [`SignalKind::Subset`] nodes, memoized per `(signal, range)` so the same
/// slice read twice is one node.
#[derive(Debug, Default)]
pub struct Netlist {
    signals: Arena<SignalId, Signal>,
    subsets: HashMap<(SignalId, BitRange), SignalId>,
}

impl Netlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node with the given ID.
    pub fn signal(&self, id: SignalId) -> &Signal {
        &self.signals[id]
    }

    /// Iterates over all nodes in creation order.
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter().map(|(_, s)| s)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns `true` if no node has been created.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Declares a primary port of `module`.
    pub fn add_port(
        &mut self,
        module: ModuleId,
        name: Ident,
        direction: Direction,
        shape: Shape,
    ) -> SignalId {
        self.push(
            SignalKind::Port {
                module,
                name,
                direction,
            },
            shape,
        )
    }

    /// Declares an internal wire of `module`.
    pub fn add_wire(&mut self, module: ModuleId, name: Ident, shape: Shape) -> SignalId {
        self.push(SignalKind::Wire { module, name }, shape)
    }

    /// Creates a constant node.
    pub fn constant(&mut self, value: LogicVec) -> SignalId {
        let shape = Shape::scalar(value.width());
        self.push(SignalKind::Const(value), shape)
    }

    /// Returns a node carrying exactly the selected bits.
    ///
    /// A full-width selection is the signal itself; anything narrower becomes a
    /// memoized subset node.
    pub fn subset(&mut self, sel: SigRange) -> Result<SignalId, NetlistError> {
        self.check_range(sel)?;
        if sel.range == BitRange::full(self.signal(sel.signal).width()) {
            return Ok(sel.signal);
        }
        if let Some(&id) = self.subsets.get(&(sel.signal, sel.range)) {
            return Ok(id);
        }
        let id = self.push(
            SignalKind::Subset {
                source: sel.signal,
                range: sel.range,
            },
            Shape::scalar(sel.range.width),
        );
        self.subsets.insert((sel.signal, sel.range), id);
        Ok(id)
    }

    /// Looks up an existing subset node without creating one.
    pub fn find_subset(&self, signal: SignalId, range: BitRange) -> Option<SignalId> {
        self.subsets.get(&(signal, range)).copied()
    }

    /// Concatenates selections, the first one landing in the lowest bits.
    pub fn concat(&mut self, parts: &[SigRange]) -> Result<SignalId, NetlistError> {
        let mut segments = Vec::with_capacity(parts.len());
        let mut width = 0;
        for part in parts {
            segments.push(self.subset(*part)?);
            width += part.range.width;
        }
        Ok(self.push(SignalKind::Concat(segments), Shape::scalar(width)))
    }

    /// Drives `dst` from `src`, one driver per `chunk` bits.
    ///
    /// Arrays are wired element for element by passing the element width as
    /// `chunk`; plain vectors pass their full width. Nothing is recorded unless
    /// every chunk can be attached.
    pub fn drive(&mut self, src: SigRange, dst: SigRange, chunk: u32) -> Result<(), NetlistError> {
        self.check_range(src)?;
        self.check_range(dst)?;
        let width = dst.range.width;
        if src.range.width != width {
            return Err(NetlistError::WidthMismatch {
                src_width: src.range.width,
                dst_width: width,
            });
        }
        if chunk == 0 || width % chunk != 0 {
            return Err(NetlistError::BadChunk { chunk, width });
        }
        self.check_attach(dst)?;
        for k in 0..width / chunk {
            let step = k * chunk;
            let source = self.subset(SigRange::new(
                src.signal,
                BitRange::new(src.range.lo + step, chunk),
            ))?;
            self.signals[dst.signal].drivers.push(Driver {
                range: BitRange::new(dst.range.lo + step, chunk),
                source,
            });
        }
        Ok(())
    }

    /// Drives `dst` from the whole of an existing node.
    pub fn drive_from(&mut self, node: SignalId, dst: SigRange) -> Result<(), NetlistError> {
        self.drive(
            SigRange::full(node, self.signal(node).width()),
            dst,
            dst.range.width.max(1),
        )
    }

    /// Reads back the value currently carried by the selected bits.
    ///
    /// Values flow along recorded drivers and through pass-through nodes. Bits
    /// with no driver read `Z`; bits with conflicting drivers read `X`.
    pub fn value(&self, sel: SigRange) -> LogicVec {
        let mut visiting = HashSet::new();
        self.eval(sel.signal, sel.range, &mut visiting)
    }

    /// Builds the reverse (reader) index of the current graph.
    pub fn loads(&self) -> LoadIndex {
        LoadIndex::build(self)
    }

    fn eval(&self, id: SignalId, range: BitRange, visiting: &mut HashSet<SignalId>) -> LogicVec {
        let sig = self.signal(id);
        match &sig.kind {
            SignalKind::Const(v) => v.slice(range.lo, range.width),
            SignalKind::Subset { source, range: r } => {
                self.eval(*source, range.offset(r.lo), visiting)
            }
            SignalKind::Concat(segments) => {
                let mut out = LogicVec::all_z(range.width);
                let mut offset = 0;
                for seg in segments {
                    let seg_width = self.signal(*seg).width();
                    let seg_range = BitRange::new(offset, seg_width);
                    if let Some(ov) = seg_range.intersect(range) {
                        let part = self.eval(*seg, ov.rebase(offset), visiting);
                        out.resolve_at(ov.lo - range.lo, &part);
                    }
                    offset += seg_width;
                }
                out
            }
            SignalKind::Port { .. } | SignalKind::Wire { .. } => {
                let mut out = LogicVec::all_z(range.width);
                if !visiting.insert(id) {
                    return out;
                }
                for d in sig.drivers_overlapping(range) {
                    if let Some(ov) = d.range.intersect(range) {
                        let part = self.eval(d.source, ov.rebase(d.range.lo), visiting);
                        out.resolve_at(ov.lo - range.lo, &part);
                    }
                }
                visiting.remove(&id);
                out
            }
        }
    }

    fn push(&mut self, kind: SignalKind, shape: Shape) -> SignalId {
        self.signals.alloc_with(|id| Signal {
            id,
            kind,
            shape,
            drivers: Vec::new(),
        })
    }

    fn check_range(&self, sel: SigRange) -> Result<(), NetlistError> {
        let width = self
            .signals
            .try_get(sel.signal)
            .map(Signal::width)
            .unwrap_or(0);
        if sel.range.width == 0 || sel.range.end() > width {
            return Err(NetlistError::OutOfRange {
                signal: sel.signal,
                range: sel.range,
                width,
            });
        }
        Ok(())
    }

    fn check_attach(&self, dst: SigRange) -> Result<(), NetlistError> {
        let sig = self.signal(dst.signal);
        if !sig.is_drivable() {
            return Err(NetlistError::NotDrivable { signal: dst.signal });
        }
        if !sig.is_net() && sig.drivers_overlapping(dst.range).next().is_some() {
            return Err(NetlistError::MultipleDrivers {
                signal: dst.signal,
                range: dst.range,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knit_common::Logic;

    fn module() -> ModuleId {
        ModuleId::from_raw(0)
    }

    fn port(nl: &mut Netlist, n: u32, dir: Direction, shape: Shape) -> SignalId {
        nl.add_port(module(), Ident::from_raw(n), dir, shape)
    }

    #[test]
    fn full_subset_is_identity() {
        let mut nl = Netlist::new();
        let a = port(&mut nl, 0, Direction::Output, Shape::scalar(8));
        assert_eq!(nl.subset(SigRange::full(a, 8)).unwrap(), a);
    }

    #[test]
    fn subsets_are_memoized() {
        let mut nl = Netlist::new();
        let a = port(&mut nl, 0, Direction::Output, Shape::scalar(8));
        let s1 = nl.subset(SigRange::new(a, BitRange::new(2, 3))).unwrap();
        let s2 = nl.subset(SigRange::new(a, BitRange::new(2, 3))).unwrap();
        assert_eq!(s1, s2);
        assert_eq!(nl.len(), 2);
    }

    #[test]
    fn drive_and_read_back_constant() {
        let mut nl = Netlist::new();
        let y = port(&mut nl, 0, Direction::Input, Shape::scalar(8));
        let c = nl.constant(LogicVec::from_u64(0xA5, 8));
        nl.drive_from(c, SigRange::full(y, 8)).unwrap();
        assert_eq!(nl.value(SigRange::full(y, 8)).to_u64(), Some(0xA5));
        assert_eq!(
            nl.value(SigRange::new(y, BitRange::new(4, 4))).to_u64(),
            Some(0xA)
        );
    }

    #[test]
    fn undriven_bits_read_z() {
        let mut nl = Netlist::new();
        let y = port(&mut nl, 0, Direction::Input, Shape::scalar(4));
        let c = nl.constant(LogicVec::from_u64(0b11, 2));
        nl.drive_from(c, SigRange::new(y, BitRange::new(0, 2)))
            .unwrap();
        assert_eq!(nl.value(SigRange::full(y, 4)).to_string(), "ZZ11");
    }

    #[test]
    fn array_drive_fans_out_per_element() {
        let mut nl = Netlist::new();
        let src = port(&mut nl, 0, Direction::Output, Shape::array([3], 8));
        let dst = port(&mut nl, 1, Direction::Input, Shape::array([3], 8));
        nl.drive(SigRange::full(src, 24), SigRange::full(dst, 24), 8)
            .unwrap();
        assert_eq!(nl.signal(dst).drivers.len(), 3);
        assert_eq!(nl.signal(dst).drivers[1].range, BitRange::new(8, 8));
    }

    #[test]
    fn second_driver_rejected_unless_net() {
        let mut nl = Netlist::new();
        let a = port(&mut nl, 0, Direction::Output, Shape::scalar(4));
        let b = port(&mut nl, 1, Direction::Output, Shape::scalar(4));
        let y = port(&mut nl, 2, Direction::Input, Shape::scalar(4));
        nl.drive(SigRange::full(a, 4), SigRange::full(y, 4), 4)
            .unwrap();
        let err = nl
            .drive(SigRange::full(b, 4), SigRange::full(y, 4), 4)
            .unwrap_err();
        assert!(matches!(err, NetlistError::MultipleDrivers { .. }));

        let n = port(&mut nl, 3, Direction::Net, Shape::scalar(4));
        nl.drive(SigRange::full(a, 4), SigRange::full(n, 4), 4)
            .unwrap();
        nl.drive(SigRange::full(b, 4), SigRange::full(n, 4), 4)
            .unwrap();
        assert_eq!(nl.signal(n).drivers.len(), 2);
    }

    #[test]
    fn conflicting_net_drivers_read_x() {
        let mut nl = Netlist::new();
        let n = port(&mut nl, 0, Direction::Net, Shape::scalar(1));
        let one = nl.constant(LogicVec::from_u64(1, 1));
        let zero = nl.constant(LogicVec::from_u64(0, 1));
        nl.drive_from(one, SigRange::full(n, 1)).unwrap();
        nl.drive_from(zero, SigRange::full(n, 1)).unwrap();
        assert_eq!(nl.value(SigRange::full(n, 1)).get(0), Logic::X);
    }

    #[test]
    fn concat_orders_lsb_first() {
        let mut nl = Netlist::new();
        let lo = nl.constant(LogicVec::from_u64(0x3, 4));
        let hi = nl.constant(LogicVec::from_u64(0xC, 4));
        let y = port(&mut nl, 0, Direction::Input, Shape::scalar(8));
        let cat = nl
            .concat(&[SigRange::full(lo, 4), SigRange::full(hi, 4)])
            .unwrap();
        nl.drive_from(cat, SigRange::full(y, 8)).unwrap();
        assert_eq!(nl.value(SigRange::full(y, 8)).to_u64(), Some(0xC3));
    }

    #[test]
    fn cyclic_nets_terminate() {
        let mut nl = Netlist::new();
        let a = port(&mut nl, 0, Direction::Net, Shape::scalar(2));
        let b = port(&mut nl, 1, Direction::Net, Shape::scalar(2));
        nl.drive(SigRange::full(a, 2), SigRange::full(b, 2), 2)
            .unwrap();
        nl.drive(SigRange::full(b, 2), SigRange::full(a, 2), 2)
            .unwrap();
        assert_eq!(nl.value(SigRange::full(a, 2)).to_string(), "ZZ");
    }

    #[test]
    fn width_and_range_checks() {
        let mut nl = Netlist::new();
        let a = port(&mut nl, 0, Direction::Output, Shape::scalar(8));
        let y = port(&mut nl, 1, Direction::Input, Shape::scalar(4));
        assert!(matches!(
            nl.drive(SigRange::full(a, 8), SigRange::full(y, 4), 4),
            Err(NetlistError::WidthMismatch { .. })
        ));
        assert!(matches!(
            nl.subset(SigRange::new(a, BitRange::new(6, 4))),
            Err(NetlistError::OutOfRange { .. })
        ));
        let c = nl.constant(LogicVec::from_u64(0, 4));
        assert!(matches!(
            nl.drive_from(a, SigRange::new(c, BitRange::full(4))),
            Err(NetlistError::WidthMismatch { .. })
        ));
    }
}
