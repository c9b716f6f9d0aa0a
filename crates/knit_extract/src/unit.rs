//! Tracking units: candidate source/destination bit pairs found by a trace.

use knit_netlist::{BitRange, SigRange, SignalId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `src_range` of `src` carries the same bits as `dst_range` of `dst`.
///
/// Both ranges have the same width. For a unit produced by a backward trace,
/// `dst` is the traced port and `src` the tracked port feeding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackingUnit {
    /// The feeding node.
    pub src: SignalId,
    /// Bits of `src`.
    pub src_range: BitRange,
    /// The fed node.
    pub dst: SignalId,
    /// Bits of `dst`.
    pub dst_range: BitRange,
}

impl TrackingUnit {
    /// Pairs two selections of equal width.
    pub fn new(src: SigRange, dst: SigRange) -> Self {
        Self {
            src: src.signal,
            src_range: src.range,
            dst: dst.signal,
            dst_range: dst.range,
        }
    }

    /// The source side as a selection.
    pub fn source(&self) -> SigRange {
        SigRange::new(self.src, self.src_range)
    }

    /// The destination side as a selection.
    pub fn destination(&self) -> SigRange {
        SigRange::new(self.dst, self.dst_range)
    }

    /// Width in bits.
    pub fn width(&self) -> u32 {
        self.dst_range.width
    }

    /// Returns `true` if both sides are the same bits of the same node.
    pub fn is_self(&self) -> bool {
        self.src == self.dst && self.src_range == self.dst_range
    }

    /// The sub-unit covering bits `lo..lo + width` of this unit.
    pub fn narrow(&self, lo: u32, width: u32) -> Self {
        Self {
            src: self.src,
            src_range: BitRange::new(self.src_range.lo + lo, width),
            dst: self.dst,
            dst_range: BitRange::new(self.dst_range.lo + lo, width),
        }
    }

    /// The same unit with its sides swapped.
    pub fn flipped(&self) -> Self {
        Self {
            src: self.dst,
            src_range: self.dst_range,
            dst: self.src,
            dst_range: self.src_range,
        }
    }

    /// The unit and its flip ordered the same way, for symmetric comparison.
    pub fn canonical(&self) -> Self {
        let flipped = self.flipped();
        if (flipped.src, flipped.src_range) < (self.src, self.src_range) {
            flipped
        } else {
            *self
        }
    }
}

impl fmt::Display for TrackingUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} -> {}{}",
            self.src, self.src_range, self.dst, self.dst_range
        )
    }
}
