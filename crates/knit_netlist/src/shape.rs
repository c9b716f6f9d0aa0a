//! Signal shapes, flat bit ranges, and the arithmetic between them.
//!
//! A [`Shape`] is a (possibly multi-dimensional) array of fixed-width elements.
//! Signals are stored flat: element 0 occupies the lowest bits, and within an
//! element bit 0 is the least significant. Any index path followed by at most
//! one slice selects a contiguous [`BitRange`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open interval of flat bit positions `[lo, lo + width)`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct BitRange {
    /// The lowest bit position.
    pub lo: u32,
    /// The number of bits.
    pub width: u32,
}

impl BitRange {
    /// Creates a range of `width` bits starting at `lo`.
    pub fn new(lo: u32, width: u32) -> Self {
        Self { lo, width }
    }

    /// A range covering bits `0..width`.
    pub fn full(width: u32) -> Self {
        Self { lo: 0, width }
    }

    /// The highest bit position (inclusive).
    pub fn hi(self) -> u32 {
        self.lo + self.width - 1
    }

    /// One past the highest bit position.
    pub fn end(self) -> u32 {
        self.lo + self.width
    }

    /// Returns `true` if `other` lies entirely within `self`.
    pub fn contains(self, other: BitRange) -> bool {
        other.lo >= self.lo && other.end() <= self.end()
    }

    /// Returns the overlap of two ranges, if any.
    pub fn intersect(self, other: BitRange) -> Option<BitRange> {
        let lo = self.lo.max(other.lo);
        let end = self.end().min(other.end());
        (lo < end).then(|| BitRange::new(lo, end - lo))
    }

    /// Moves the range up by `delta` bits.
    pub fn offset(self, delta: u32) -> BitRange {
        BitRange::new(self.lo + delta, self.width)
    }

    /// Re-expresses the range relative to a frame starting at `base`.
    ///
    /// `base` must not exceed `self.lo`.
    pub fn rebase(self, base: u32) -> BitRange {
        BitRange::new(self.lo - base, self.width)
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.hi(), self.lo)
    }
}

/// The shape of a signal: outer-to-inner array dimensions over an element width.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Shape {
    /// Array dimensions, outermost first. Empty for a plain vector.
    pub dims: Vec<u32>,
    /// The width of one element in bits.
    pub width: u32,
}

/// Why an index path or slice could not be applied to a shape.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SelectError {
    /// An index or slice bound lies outside its dimension.
    #[error("index {index} is out of bounds for extent {extent}")]
    OutOfBounds {
        /// The offending index.
        index: u32,
        /// The size of the dimension being indexed.
        extent: u32,
    },
    /// A slice whose high bound is below its low bound.
    #[error("empty range [{hi}:{lo}]")]
    EmptyRange {
        /// The high bound.
        hi: u32,
        /// The low bound.
        lo: u32,
    },
}

/// A contiguous part of a signal, together with the shape it has on its own.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Selection {
    /// The flat bits selected.
    pub range: BitRange,
    /// The shape of the selected bits.
    pub shape: Shape,
}

/// Index path and optional trailing `(hi, lo)` slice locating a flat range.
pub type Coordinates = (Vec<u32>, Option<(u32, u32)>);

impl Shape {
    /// A plain vector of `width` bits.
    pub fn scalar(width: u32) -> Self {
        Self {
            dims: Vec::new(),
            width,
        }
    }

    /// An array with the given dimensions of `width`-bit elements.
    pub fn array(dims: impl Into<Vec<u32>>, width: u32) -> Self {
        Self {
            dims: dims.into(),
            width,
        }
    }

    /// Total number of bits.
    ///
    /// Saturates at `u32::MAX`; shapes are checked with
    /// [`checked_bits`](Self::checked_bits) when a signal is declared.
    pub fn bits(&self) -> u32 {
        self.leaf_count().saturating_mul(self.width)
    }

    /// Total number of bits, or `None` if it does not fit in a `u32`.
    pub fn checked_bits(&self) -> Option<u32> {
        self.dims
            .iter()
            .try_fold(self.width, |acc, &d| acc.checked_mul(d))
    }

    /// Number of elements (1 for a plain vector).
    pub fn leaf_count(&self) -> u32 {
        self.dims.iter().fold(1, |acc, &d| acc.saturating_mul(d))
    }

    /// Returns `true` if the shape has at least one array dimension.
    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    /// Applies an index path and an optional slice on the next level.
    ///
    /// Indices consume array dimensions first, then address single element bits.
    /// The slice applies to whatever level the indices stop at.
    pub fn select(
        &self,
        index: &[u32],
        slice: Option<(u32, u32)>,
    ) -> Result<Selection, SelectError> {
        let mut offset = 0;
        let mut dims: &[u32] = &self.dims;
        let mut width = self.width;
        for &i in index {
            match dims.split_first() {
                Some((&extent, rest)) => {
                    if i >= extent {
                        return Err(SelectError::OutOfBounds { index: i, extent });
                    }
                    offset += i * stride(rest, width);
                    dims = rest;
                }
                None => {
                    if i >= width {
                        return Err(SelectError::OutOfBounds {
                            index: i,
                            extent: width,
                        });
                    }
                    offset += i;
                    width = 1;
                }
            }
        }
        let mut dims = dims.to_vec();
        if let Some((hi, lo)) = slice {
            if hi < lo {
                return Err(SelectError::EmptyRange { hi, lo });
            }
            match dims.first().copied() {
                Some(extent) => {
                    if hi >= extent {
                        return Err(SelectError::OutOfBounds { index: hi, extent });
                    }
                    offset += lo * stride(&dims[1..], width);
                    dims[0] = hi - lo + 1;
                }
                None => {
                    if hi >= width {
                        return Err(SelectError::OutOfBounds {
                            index: hi,
                            extent: width,
                        });
                    }
                    offset += lo;
                    width = hi - lo + 1;
                }
            }
        }
        let shape = Shape { dims, width };
        Ok(Selection {
            range: BitRange::new(offset, shape.bits()),
            shape,
        })
    }

    /// Converts a flat range back into normalized coordinates.
    ///
    /// The result never carries a single-element slice (it becomes an index) nor
    /// a slice spanning its whole level (it is dropped), and the full range maps
    /// to empty coordinates. Returns `None` when the range straddles element
    /// boundaries in a way no single index path and slice can express.
    pub fn locate(&self, range: BitRange) -> Option<Coordinates> {
        if range.width == 0 || range.end() > self.bits() {
            return None;
        }
        let mut index = Vec::new();
        let mut dims: &[u32] = &self.dims;
        let mut off = range.lo;
        loop {
            match dims.split_first() {
                Some((&extent, rest)) => {
                    let step = stride(rest, self.width);
                    let first = off / step;
                    let last = (off + range.width - 1) / step;
                    if first == last {
                        index.push(first);
                        if off % step == 0 && range.width == step {
                            return Some((index, None));
                        }
                        off -= first * step;
                        dims = rest;
                        continue;
                    }
                    if off % step != 0 || range.width % step != 0 {
                        return None;
                    }
                    let count = range.width / step;
                    if count == extent {
                        return Some((index, None));
                    }
                    return Some((index, Some((first + count - 1, first))));
                }
                None => {
                    if off == 0 && range.width == self.width {
                        return Some((index, None));
                    }
                    if range.width == 1 {
                        index.push(off);
                        return Some((index, None));
                    }
                    return Some((index, Some((off + range.width - 1, off))));
                }
            }
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.dims {
            write!(f, "[{d}]")?;
        }
        write!(f, "{}b", self.width)
    }
}

fn stride(rest: &[u32], width: u32) -> u32 {
    rest.iter().fold(width, |acc, &d| acc.saturating_mul(d))
}
