//! Opaque ID newtypes for hierarchy and signal-graph entities.
//!
//! Each ID is a thin `u32` wrapper that is `Copy`, `Hash`, `Ord` and
//! `Serialize`/`Deserialize`. IDs are handed out by an
//! [`Arena`](crate::arena::Arena) and used for O(1) lookup.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a module in the hierarchy.
    ModuleId,
    "m"
);

define_id!(
    /// Opaque, copyable ID for a node of the signal graph.
    SignalId,
    "s"
);

define_id!(
    /// Opaque, copyable ID for an interface bundle attached to a module.
    BundleId,
    "b"
);

define_id!(
    /// Opaque, copyable ID for an interface bundle definition.
    BundleDefId,
    "d"
);
