//! Merging adjacent connections between the same two ports.

use crate::unit::TrackingUnit;
use knit_hier::Hierarchy;
use knit_netlist::{BitRange, SignalId};
use std::collections::HashMap;

/// Merges runs of links whose source and destination bits both continue where
/// the previous link ended, as long as the merged ranges can still be named by
/// single references.
///
/// Groups come out in the order their first link went in.
pub(crate) fn coalesce(hier: &Hierarchy, links: Vec<TrackingUnit>) -> Vec<TrackingUnit> {
    let mut order = Vec::new();
    let mut groups: HashMap<(SignalId, SignalId), Vec<TrackingUnit>> = HashMap::new();
    for link in links {
        let key = (link.src, link.dst);
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(link);
    }

    let mut out = Vec::new();
    for key in order {
        let Some(mut group) = groups.remove(&key) else {
            continue;
        };
        group.sort();
        let mut run: Option<TrackingUnit> = None;
        for link in group {
            run = Some(match run {
                Some(cur) => match extend(hier, &cur, &link) {
                    Some(merged) => merged,
                    None => {
                        out.push(cur);
                        link
                    }
                },
                None => link,
            });
        }
        out.extend(run);
    }
    out
}

fn extend(hier: &Hierarchy, cur: &TrackingUnit, next: &TrackingUnit) -> Option<TrackingUnit> {
    if next.src_range.lo != cur.src_range.end() || next.dst_range.lo != cur.dst_range.end() {
        return None;
    }
    let width = cur.width() + next.width();
    let merged = TrackingUnit {
        src_range: BitRange::new(cur.src_range.lo, width),
        dst_range: BitRange::new(cur.dst_range.lo, width),
        ..*cur
    };
    hier.port_ref_at(merged.src, merged.src_range)?;
    hier.port_ref_at(merged.dst, merged.dst_range)?;
    log::trace!("coalesced {cur} and {next}");
    Some(merged)
}
