//! Recovering connections among a set of modules.
//!
//! Every port of every tracked module is traced back to the tracked ports
//! feeding it. The resulting tracking units are then read twice:
//!
//! 1. Bundle pass: units that join the same logical bits of two fully mapped
//!    bundles are collected per bundle pair. A pair whose every logical port is
//!    covered this way becomes an [`InterfaceConnection`].
//! 2. Ad-hoc pass: whatever bits of each unit are not covered by an accepted
//!    interface connection become [`AdHocConnection`]s.

use crate::coalesce::coalesce;
use crate::connection::{AdHocConnection, Connections, InterfaceConnection};
use crate::error::ExtractError;
use crate::trace::{Memo, Walk};
use crate::unit::TrackingUnit;
use knit_common::Ident;
use knit_hier::{Hierarchy, Placement, Ref};
use knit_netlist::{BitRange, BundleId, LoadIndex, ModuleId, SigRange, SignalId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Knobs for one extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Merge adjacent connections between the same two ports.
    pub coalesce: bool,
    /// Deepest nesting a backward trace may reach. Net walks do not count
    /// against it.
    pub max_trace_depth: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            coalesce: false,
            max_trace_depth: 256,
        }
    }
}

/// A snapshot extractor over one hierarchy.
///
/// The memo table belongs to the instance. Build a new extractor after the
/// hierarchy changes.
pub struct Extractor<'h> {
    pub(crate) hier: &'h Hierarchy,
    pub(crate) modules: Vec<ModuleId>,
    pub(crate) tracked: HashSet<ModuleId>,
    pub(crate) options: ExtractOptions,
    pub(crate) loads: LoadIndex,
    pub(crate) memo: HashMap<(Walk, TrackingUnit), Memo>,
}

/// Bits of a physical port mapped into a logical port of a bundle.
#[derive(Debug, Clone, Copy)]
struct MappedBits {
    bundle: BundleId,
    port: Ident,
    phys: BitRange,
    logical: BitRange,
}

/// Logical bits of each logical port seen joined between two bundles.
#[derive(Debug, Default)]
struct Coverage {
    ports: HashMap<Ident, Vec<bool>>,
}

impl Coverage {
    fn mark(&mut self, port: Ident, width: u32, bits: BitRange) {
        let seen = self
            .ports
            .entry(port)
            .or_insert_with(|| vec![false; width as usize]);
        for b in bits.lo..bits.end().min(width) {
            seen[b as usize] = true;
        }
    }

    fn is_full(&self, port: Ident) -> bool {
        self.ports
            .get(&port)
            .is_some_and(|bits| bits.iter().all(|&b| b))
    }
}

impl<'h> Extractor<'h> {
    /// Prepares an extraction over `modules`.
    ///
    /// Duplicates are ignored; the order given is the order ports are traced
    /// and connections reported in.
    pub fn new(
        hier: &'h Hierarchy,
        modules: impl IntoIterator<Item = ModuleId>,
        options: ExtractOptions,
    ) -> Result<Self, ExtractError> {
        let mut list = Vec::new();
        let mut tracked = HashSet::new();
        for module in modules {
            if !hier.modules().any(|m| m.id == module) {
                return Err(ExtractError::UnknownModule { module });
            }
            if tracked.insert(module) {
                list.push(module);
            }
        }
        Ok(Self {
            hier,
            modules: list,
            tracked,
            options,
            loads: hier.netlist().loads(),
            memo: HashMap::new(),
        })
    }

    /// The modules being extracted over.
    pub fn modules(&self) -> &[ModuleId] {
        &self.modules
    }

    /// Runs both passes and returns every connection found.
    pub fn extract(&mut self) -> Result<Connections, ExtractError> {
        let units = self.trace_all()?;
        let (interfaces, covered) = self.bundle_pass(&units)?;
        let adhoc = self.adhoc_pass(&units, &covered)?;
        log::debug!(
            "extracted {} interface and {} ad-hoc connections from {} units",
            interfaces.len(),
            adhoc.len(),
            units.len()
        );
        Ok(Connections { interfaces, adhoc })
    }

    fn trace_all(&mut self) -> Result<Vec<TrackingUnit>, ExtractError> {
        let hier = self.hier;
        let mut units = Vec::new();
        let mut seen = HashSet::new();
        for m in self.modules.clone() {
            for port in &hier.module(m).ports {
                let whole = SigRange::full(port.signal, port.shape.bits());
                for unit in self.trace_port(whole)? {
                    if seen.insert(unit.canonical()) {
                        units.push(unit);
                    }
                }
            }
        }
        Ok(units)
    }

    fn eligible(&self, bundle: BundleId) -> bool {
        let b = self.hier.bundle(bundle);
        self.hier.is_fully_mapped(bundle) && !self.hier.bundle_def(b.def).has_shared()
    }

    /// Finds interface connections and, per unit, the unit bits they cover.
    fn bundle_pass(
        &self,
        units: &[TrackingUnit],
    ) -> Result<(Vec<InterfaceConnection>, Vec<Vec<BitRange>>), ExtractError> {
        let hier = self.hier;
        let mut index: HashMap<SignalId, Vec<MappedBits>> = HashMap::new();
        for &m in &self.modules {
            for &b in &hier.module(m).bundles {
                if !self.eligible(b) {
                    continue;
                }
                for map in &hier.bundle(b).maps {
                    let phys = hier.sig_range(&map.physical)?;
                    let logical = hier.selection(&Ref::Bundle(map.logical.clone()))?.range;
                    index.entry(phys.signal).or_default().push(MappedBits {
                        bundle: b,
                        port: map.logical.port,
                        phys: phys.range,
                        logical,
                    });
                }
            }
        }

        let mut pairs: BTreeMap<(BundleId, BundleId), Coverage> = BTreeMap::new();
        let mut hits: Vec<Vec<((BundleId, BundleId), BitRange)>> = vec![Vec::new(); units.len()];
        for (i, u) in units.iter().enumerate() {
            let (Some(srcs), Some(dsts)) = (index.get(&u.src), index.get(&u.dst)) else {
                continue;
            };
            for s in srcs {
                for d in dsts {
                    if s.bundle == d.bundle || s.port != d.port {
                        continue;
                    }
                    let Some(span) = joined_span(u, s, d) else {
                        continue;
                    };
                    let key = (s.bundle.min(d.bundle), s.bundle.max(d.bundle));
                    let logical = BitRange::new(
                        s.logical.lo + (u.src_range.lo + span.lo - s.phys.lo),
                        span.width,
                    );
                    let def = hier.bundle_def(hier.bundle(s.bundle).def);
                    let width = def.port(s.port).map_or(0, |lp| lp.shape.bits());
                    pairs.entry(key).or_default().mark(s.port, width, logical);
                    hits[i].push((key, span));
                }
            }
        }

        let accepted: Vec<(BundleId, BundleId)> = pairs
            .iter()
            .filter(|(key, coverage)| self.is_interface(key.0, key.1, coverage))
            .map(|(&key, _)| key)
            .collect();
        for &(a, b) in &accepted {
            log::debug!(
                "interface connection {} <-> {}",
                hier.bundle_path(a),
                hier.bundle_path(b)
            );
        }
        let covered = hits
            .into_iter()
            .map(|h| {
                h.into_iter()
                    .filter(|(key, _)| accepted.contains(key))
                    .map(|(_, span)| span)
                    .collect()
            })
            .collect();
        let interfaces = accepted
            .into_iter()
            .map(|(a, b)| InterfaceConnection::new(a, b))
            .collect();
        Ok((interfaces, covered))
    }

    /// Two bundles form an interface connection when they instantiate the same
    /// definition, sit where their roles allow them to be joined, and every
    /// logical port is covered.
    fn is_interface(&self, a: BundleId, b: BundleId, coverage: &Coverage) -> bool {
        let hier = self.hier;
        let (ba, bb) = (hier.bundle(a), hier.bundle(b));
        if ba.def != bb.def {
            return false;
        }
        let roles_fit = match hier.placement(ba.module, bb.module) {
            Ok(Placement::Lateral { .. }) => ba.role != bb.role,
            Ok(Placement::FirstAbove | Placement::SecondAbove) => ba.role == bb.role,
            Ok(Placement::Same) | Err(_) => false,
        };
        roles_fit
            && hier
                .bundle_def(ba.def)
                .ports
                .iter()
                .all(|lp| coverage.is_full(lp.name))
    }

    fn adhoc_pass(
        &self,
        units: &[TrackingUnit],
        covered: &[Vec<BitRange>],
    ) -> Result<Vec<AdHocConnection>, ExtractError> {
        let mut links = Vec::new();
        for (u, spans) in units.iter().zip(covered) {
            for gap in uncovered(u.width(), spans) {
                links.push(u.narrow(gap.lo, gap.width));
            }
        }
        let mut links = self.addressable(links);
        if self.options.coalesce {
            links = coalesce(self.hier, links);
        }
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for link in links {
            let connection = self.connection(&link)?;
            if seen.insert(connection.clone()) {
                out.push(connection);
            }
        }
        Ok(out)
    }

    /// Splits links no single pair of references can express into single bits.
    fn addressable(&self, links: Vec<TrackingUnit>) -> Vec<TrackingUnit> {
        let hier = self.hier;
        let mut out = Vec::with_capacity(links.len());
        for link in links {
            let nameable = hier.port_ref_at(link.src, link.src_range).is_some()
                && hier.port_ref_at(link.dst, link.dst_range).is_some();
            if nameable {
                out.push(link);
            } else {
                log::debug!("splitting {link} into single bits");
                out.extend((0..link.width()).map(|i| link.narrow(i, 1)));
            }
        }
        out
    }

    fn connection(&self, link: &TrackingUnit) -> Result<AdHocConnection, ExtractError> {
        let name = |signal, range| {
            self.hier
                .port_ref_at(signal, range)
                .ok_or(ExtractError::NotAddressable { signal, range })
        };
        Ok(AdHocConnection::new(
            name(link.src, link.src_range)?,
            name(link.dst, link.dst_range)?,
        ))
    }
}

/// The offsets within `u` at which map `s` on the source side and map `d` on
/// the destination side see the same logical bits.
fn joined_span(u: &TrackingUnit, s: &MappedBits, d: &MappedBits) -> Option<BitRange> {
    let shift = |m: &MappedBits, lo: u32| {
        i64::from(m.logical.lo) - i64::from(m.phys.lo) + i64::from(lo)
    };
    if shift(s, u.src_range.lo) != shift(d, u.dst_range.lo) {
        return None;
    }
    let from_src = s.phys.intersect(u.src_range)?.rebase(u.src_range.lo);
    let from_dst = d.phys.intersect(u.dst_range)?.rebase(u.dst_range.lo);
    from_src.intersect(from_dst)
}

/// The parts of `0..width` not covered by any of `spans`.
fn uncovered(width: u32, spans: &[BitRange]) -> Vec<BitRange> {
    let mut spans = spans.to_vec();
    spans.sort();
    let mut gaps = Vec::new();
    let mut next = 0;
    for span in spans {
        if span.lo > next {
            gaps.push(BitRange::new(next, span.lo - next));
        }
        next = next.max(span.end());
    }
    if next < width {
        gaps.push(BitRange::new(next, width - next));
    }
    gaps
}
