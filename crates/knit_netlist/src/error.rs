//! Error types for signal-graph construction.

use crate::ids::SignalId;
use crate::shape::BitRange;

/// Errors raised while building or driving signals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetlistError {
    /// Source and destination of a drive differ in width.
    #[error("cannot drive {dst_width} bits from a {src_width}-bit source")]
    WidthMismatch {
        /// Width of the source bits.
        src_width: u32,
        /// Width of the destination bits.
        dst_width: u32,
    },

    /// The destination is a pass-through or constant node.
    #[error("signal {signal} is not a port or wire and cannot be driven")]
    NotDrivable {
        /// The offending node.
        signal: SignalId,
    },

    /// A non-net destination already has a driver on some of the bits.
    #[error("bits {range} of signal {signal} already have a driver")]
    MultipleDrivers {
        /// The destination node.
        signal: SignalId,
        /// The requested destination bits.
        range: BitRange,
    },

    /// A range reaches past the end of its signal.
    #[error("range {range} lies outside signal {signal} of width {width}")]
    OutOfRange {
        /// The node being addressed.
        signal: SignalId,
        /// The requested bits.
        range: BitRange,
        /// The node's width.
        width: u32,
    },

    /// The element size used to fan a drive out does not divide its width.
    #[error("element width {chunk} does not divide a {width}-bit drive")]
    BadChunk {
        /// Requested element width.
        chunk: u32,
        /// Total width of the drive.
        width: u32,
    },
}
