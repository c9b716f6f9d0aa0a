//! The memoized backward trace.
//!
//! A trace starts from bits of a tracked port and walks the signal graph
//! towards whatever feeds them. Wires are transparent; subset nodes translate
//! the bits into their source; concatenations split them across segments.
//! Reaching a port of a tracked module records a [`TrackingUnit`] and ends that
//! branch. Ports of modules outside the tracked set and constants are dead
//! ends.
//!
//! Nets have no polarity, so a trace that starts on a net walks readers as
//! well as drivers, and passes through every tracked net port it records. That
//! walk runs off a worklist: a net may tie any number of ports together, so
//! its length is not bounded by how deeply the graph nests.
//!
//! Backward steps are memoized by `(walk, unit)`. A step found in progress
//! yields nothing, which ends cycles.

use crate::error::ExtractError;
use crate::extractor::Extractor;
use crate::unit::TrackingUnit;
use knit_netlist::{BitRange, Reader, SigRange, SignalKind};
use std::collections::{HashSet, VecDeque};

/// Which edges a trace follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Walk {
    /// Drivers only.
    Backward,
    /// Drivers and readers.
    Net,
}

/// State of one memoized step.
#[derive(Debug, Clone)]
pub(crate) enum Memo {
    InProgress,
    Resolved(Vec<TrackingUnit>),
}

/// One edge out of a node: the bits reached, the traced bits they carry, and
/// whether the edge was taken from a node to one of its readers.
#[derive(Debug, Clone, Copy)]
struct Hop {
    at: SigRange,
    origin: SigRange,
    downstream: bool,
}

/// Bits `lo..lo + width` of `sel`.
fn narrow(sel: SigRange, lo: u32, width: u32) -> SigRange {
    SigRange::new(sel.signal, BitRange::new(sel.range.lo + lo, width))
}

impl Extractor<'_> {
    /// Every tracked port range carrying the same bits as `port`.
    pub(crate) fn trace_port(&mut self, port: SigRange) -> Result<Vec<TrackingUnit>, ExtractError> {
        let walk = if self.hier.netlist().signal(port.signal).is_net() {
            Walk::Net
        } else {
            Walk::Backward
        };
        let key = (walk, TrackingUnit::new(port, port));
        if let Some(done) = self.recall(&key) {
            return Ok(done);
        }
        self.memo.insert(key, Memo::InProgress);
        let mut units = match walk {
            Walk::Net => self.walk_net(port),
            Walk::Backward => {
                let mut units = Vec::new();
                self.expand(port, port, 0, &mut units)?;
                units
            }
        };
        units.retain(|u| !u.is_self());
        self.memo.insert(key, Memo::Resolved(units.clone()));
        Ok(units)
    }

    fn recall(&self, key: &(Walk, TrackingUnit)) -> Option<Vec<TrackingUnit>> {
        match self.memo.get(key)? {
            Memo::InProgress => {
                log::trace!("{} already in progress", key.1);
                Some(Vec::new())
            }
            Memo::Resolved(units) => {
                log::trace!("memo hit for {}", key.1);
                Some(units.clone())
            }
        }
    }

    /// Arrives at bits `at` carrying bits `origin` of the traced port.
    fn step(
        &mut self,
        at: SigRange,
        origin: SigRange,
        depth: usize,
    ) -> Result<Vec<TrackingUnit>, ExtractError> {
        if depth > self.options.max_trace_depth {
            return Err(ExtractError::DepthExceeded {
                signal: origin.signal,
                limit: self.options.max_trace_depth,
            });
        }
        let key = (Walk::Backward, TrackingUnit::new(at, origin));
        if let Some(done) = self.recall(&key) {
            return Ok(done);
        }
        self.memo.insert(key, Memo::InProgress);

        let hier = self.hier;
        let netlist = hier.netlist();
        let mut units = Vec::new();
        match &netlist.signal(at.signal).kind {
            SignalKind::Port { module, .. } => {
                if self.tracked.contains(module) {
                    let unit = TrackingUnit::new(at, origin);
                    if !unit.is_self() {
                        log::debug!("tracking unit {unit}");
                        units.push(unit);
                    }
                    // A loop-back inside one module: keep going to what feeds it.
                    if netlist.signal(origin.signal).module() == Some(*module) {
                        units.extend(self.trace_port(at)?);
                    }
                }
            }
            SignalKind::Const(_) => {}
            _ => self.expand(at, origin, depth, &mut units)?,
        }

        self.memo.insert(key, Memo::Resolved(units.clone()));
        Ok(units)
    }

    /// Follows every driver edge out of `at`.
    fn expand(
        &mut self,
        at: SigRange,
        origin: SigRange,
        depth: usize,
        out: &mut Vec<TrackingUnit>,
    ) -> Result<(), ExtractError> {
        let mut next = Vec::new();
        self.hops(at, origin, false, &mut next);
        for hop in next {
            out.extend(self.step(hop.at, hop.origin, depth + 1)?);
        }
        Ok(())
    }

    /// Visits everything tied to the net port `port`.
    ///
    /// A port reached over a reader edge is fed by the net; one reached over a
    /// driver edge feeds it. Units are oriented to match.
    fn walk_net(&self, port: SigRange) -> Vec<TrackingUnit> {
        let netlist = self.hier.netlist();
        let mut units = Vec::new();
        let mut seen = HashSet::from([(port, port)]);
        let mut queue = Vec::new();
        self.hops(port, port, true, &mut queue);
        let mut queue = VecDeque::from(queue);
        while let Some(hop) = queue.pop_front() {
            if !seen.insert((hop.at, hop.origin)) {
                continue;
            }
            let pass_through = match &netlist.signal(hop.at.signal).kind {
                SignalKind::Port {
                    module, direction, ..
                } => {
                    if !self.tracked.contains(module) {
                        continue;
                    }
                    let unit = if hop.downstream {
                        TrackingUnit::new(hop.origin, hop.at)
                    } else {
                        TrackingUnit::new(hop.at, hop.origin)
                    };
                    if !unit.is_self() {
                        log::debug!("tracking unit {unit}");
                        units.push(unit);
                    }
                    direction.is_net()
                }
                SignalKind::Const(_) => false,
                _ => true,
            };
            if pass_through {
                let mut next = Vec::new();
                self.hops(hop.at, hop.origin, true, &mut next);
                queue.extend(next);
            }
        }
        units
    }

    /// Collects the edges out of `at`: drivers always, readers when asked.
    fn hops(&self, at: SigRange, origin: SigRange, readers: bool, out: &mut Vec<Hop>) {
        let netlist = self.hier.netlist();
        let sig = netlist.signal(at.signal);
        let upstream = |at, origin| Hop {
            at,
            origin,
            downstream: false,
        };
        match &sig.kind {
            SignalKind::Subset { source, range } => {
                out.push(upstream(
                    SigRange::new(*source, at.range.offset(range.lo)),
                    origin,
                ));
            }
            SignalKind::Concat(segments) => {
                let mut offset = 0;
                for &seg in segments {
                    let span = BitRange::new(offset, netlist.signal(seg).width());
                    if let Some(o) = at.range.intersect(span) {
                        out.push(upstream(
                            SigRange::new(seg, o.rebase(offset)),
                            narrow(origin, o.lo - at.range.lo, o.width),
                        ));
                    }
                    offset = span.end();
                }
            }
            _ => {
                for d in sig.drivers_overlapping(at.range) {
                    if let Some(o) = d.range.intersect(at.range) {
                        out.push(upstream(
                            SigRange::new(d.source, o.rebase(d.range.lo)),
                            narrow(origin, o.lo - at.range.lo, o.width),
                        ));
                    }
                }
            }
        }
        if !readers {
            return;
        }
        let downstream = |at, origin| Hop {
            at,
            origin,
            downstream: true,
        };
        for reader in self.loads.readers(at.signal) {
            match *reader {
                Reader::Driven { target, range } => {
                    out.push(downstream(
                        SigRange::new(target, at.range.offset(range.lo)),
                        origin,
                    ));
                }
                Reader::Subset { node, range } => {
                    if let Some(o) = at.range.intersect(range) {
                        out.push(downstream(
                            SigRange::new(node, o.rebase(range.lo)),
                            narrow(origin, o.lo - at.range.lo, o.width),
                        ));
                    }
                }
                Reader::Concat { node, offset } => {
                    out.push(downstream(
                        SigRange::new(node, at.range.offset(offset)),
                        origin,
                    ));
                }
            }
        }
    }
}
