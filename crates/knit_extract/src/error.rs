//! Error types for connection extraction.

use knit_hier::HierError;
use knit_netlist::{BitRange, ModuleId, SignalId};

/// Errors raised while extracting connections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// A module handed to the extractor does not exist in the hierarchy.
    #[error("module {module} is not part of the hierarchy")]
    UnknownModule {
        /// The unknown ID.
        module: ModuleId,
    },

    /// A backward trace nested deeper than the configured limit.
    #[error("trace from signal {signal} exceeded the depth limit of {limit}")]
    DepthExceeded {
        /// The signal the trace started from.
        signal: SignalId,
        /// The configured limit.
        limit: usize,
    },

    /// Not even a single bit of a traced port could be named.
    #[error("bits {range} of signal {signal} cannot be addressed")]
    NotAddressable {
        /// The port signal.
        signal: SignalId,
        /// The bits that were traced.
        range: BitRange,
    },

    /// Resolving a bundle or port reference failed.
    #[error(transparent)]
    Hier(#[from] HierError),
}
