//! The signal graph underneath a module hierarchy.
//!
//! This crate stores primary ports, internal wires, and the structural
//! pass-through nodes (concatenation and bit subsets) that connections are made
//! of. It knows nothing about hierarchy or legality; it only records which bits
//! drive which, and can read values back along those drivers.

#![warn(missing_docs)]

pub mod arena;
pub mod error;
pub mod ids;
pub mod loads;
pub mod netlist;
pub mod shape;
pub mod signal;

pub use arena::{Arena, ArenaId};
pub use error::NetlistError;
pub use ids::{BundleDefId, BundleId, ModuleId, SignalId};
pub use loads::{LoadIndex, Reader};
pub use netlist::{Netlist, SigRange};
pub use shape::{BitRange, Coordinates, SelectError, Selection, Shape};
pub use signal::{Direction, Driver, Signal, SignalKind};
