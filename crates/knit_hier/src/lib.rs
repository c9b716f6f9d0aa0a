//! Module hierarchy, interface bundles, and hierarchical auto-wiring.
//!
//! A [`Hierarchy`] owns a tree of modules, their ports and bundles, and the
//! [`knit_netlist::Netlist`] the connections are recorded in. Ports and bundle
//! ports are addressed with [`Ref`]s, which may select array elements and bit
//! slices. [`Hierarchy::connect`] wires any two references in the same tree,
//! punching intermediate ports where the endpoints are not adjacent, and
//! [`Hierarchy::connect_bundles`] does the same for whole bundles.

#![warn(missing_docs)]

pub mod bundle;
pub mod error;
pub mod hierarchy;
pub mod module;
pub mod reference;
pub mod uniquify;
pub mod wire;
mod wire_bundle;

pub use bundle::{Bundle, BundleDef, Group, LogicalPort, PortMap, Role};
pub use error::{AddressError, HierError};
pub use hierarchy::{Hierarchy, PortNaming};
pub use module::{Module, Port};
pub use reference::{Access, BundleRef, PortRef, Ref};
pub use uniquify::Uniquifier;
pub use wire::{Placement, WireOptions, WirePath};
