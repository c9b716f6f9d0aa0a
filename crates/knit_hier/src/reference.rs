//! Addressable references and the slice arithmetic over them.
//!
//! A reference names a whole port, an array element (possibly nested), or a
//! contiguous bit slice, either of a module's physical port ([`PortRef`]) or of
//! a logical port of an interface bundle ([`BundleRef`]). References are always
//! stored normalized, so two references to the same bits compare equal:
//!
//! - a single-element slice `[n:n]` becomes the index `[n]`;
//! - a slice spanning a whole dimension is dropped;
//! - a reference covering every bit of its port is the bare port name.

use crate::error::{AddressError, HierError};
use crate::hierarchy::{Hierarchy, PortNaming};
use knit_common::Ident;
use knit_netlist::{
    BitRange, BundleId, Coordinates, Direction, ModuleId, Selection, Shape, SignalId, SignalKind,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index path and optional trailing `[hi:lo]` slice into a port.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Access {
    /// Indices, outermost dimension first.
    pub index: Vec<u32>,
    /// Inclusive `(hi, lo)` range on the level the indices stop at.
    pub slice: Option<(u32, u32)>,
}

impl Access {
    /// Returns `true` when the access selects the whole port.
    pub fn is_whole(&self) -> bool {
        self.index.is_empty() && self.slice.is_none()
    }

    /// Splits `name([idx])*([hi:lo])?` into the name and its access.
    ///
    /// Only the grammar is checked here; bounds are checked against the port
    /// shape when the reference is built.
    pub fn parse(text: &str) -> Result<(&str, Access), AddressError> {
        let malformed = |reason| AddressError::Malformed {
            text: text.to_string(),
            reason,
        };
        let split = text.find('[').unwrap_or(text.len());
        let (name, mut rest) = text.split_at(split);
        if !is_identifier(name) {
            return Err(malformed("expected a port name"));
        }
        let mut access = Access::default();
        while !rest.is_empty() {
            let Some(body) = rest.strip_prefix('[') else {
                return Err(malformed("expected `[` after `]`"));
            };
            let Some(close) = body.find(']') else {
                return Err(malformed("unclosed `[`"));
            };
            let token = &body[..close];
            rest = &body[close + 1..];
            let number = |s: &str| {
                s.trim()
                    .parse::<u32>()
                    .map_err(|_| malformed("expected a non-negative integer"))
            };
            match token.split_once(':') {
                Some((hi, lo)) => {
                    if access.slice.is_some() {
                        return Err(AddressError::MultipleRanges {
                            text: text.to_string(),
                        });
                    }
                    access.slice = Some((number(hi)?, number(lo)?));
                }
                None => {
                    if access.slice.is_some() {
                        return Err(AddressError::SliceBeforeIndex {
                            text: text.to_string(),
                        });
                    }
                    access.index.push(number(token)?);
                }
            }
        }
        Ok((name, access))
    }
}

impl From<Coordinates> for Access {
    fn from((index, slice): Coordinates) -> Self {
        Self { index, slice }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in &self.index {
            write!(f, "[{i}]")?;
        }
        if let Some((hi, lo)) = self.slice {
            write!(f, "[{hi}:{lo}]")?;
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// A reference into a physical port of a module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortRef {
    /// The owning module.
    pub module: ModuleId,
    /// The port name.
    pub port: Ident,
    /// The normalized access.
    pub access: Access,
}

/// A reference into a logical port of an interface bundle.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BundleRef {
    /// The bundle.
    pub bundle: BundleId,
    /// The logical port name from the bundle definition.
    pub port: Ident,
    /// The normalized access into the logical port.
    pub access: Access,
}

/// Any addressable reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ref {
    /// A physical port reference.
    Port(PortRef),
    /// A bundle logical port reference.
    Bundle(BundleRef),
}

impl Ref {
    /// The access of either variant.
    pub fn access(&self) -> &Access {
        match self {
            Ref::Port(p) => &p.access,
            Ref::Bundle(b) => &b.access,
        }
    }

    /// The port name (physical or logical).
    pub fn name(&self) -> Ident {
        match self {
            Ref::Port(p) => p.port,
            Ref::Bundle(b) => b.port,
        }
    }

    /// The physical reference, if this is one.
    pub fn as_port(&self) -> Option<&PortRef> {
        match self {
            Ref::Port(p) => Some(p),
            Ref::Bundle(_) => None,
        }
    }

    fn with_access(&self, access: Access) -> Ref {
        match self {
            Ref::Port(p) => Ref::Port(PortRef {
                access,
                ..p.clone()
            }),
            Ref::Bundle(b) => Ref::Bundle(BundleRef {
                access,
                ..b.clone()
            }),
        }
    }
}

impl From<PortRef> for Ref {
    fn from(r: PortRef) -> Self {
        Ref::Port(r)
    }
}

impl From<BundleRef> for Ref {
    fn from(r: BundleRef) -> Self {
        Ref::Bundle(r)
    }
}

impl Hierarchy {
    /// Parses `text` as a reference to a port of `module`, checks it against
    /// the port's shape and normalizes it.
    pub fn port_ref(&self, module: ModuleId, text: &str) -> Result<PortRef, HierError> {
        let (name, access) = Access::parse(text)?;
        let port = self.find_port(module, name)?;
        let access = normalize(&port.shape, &access, || {
            format!("{}.{}", self.path(module), text)
        })?;
        Ok(PortRef {
            module,
            port: port.name,
            access,
        })
    }

    /// Parses `text` as a reference to a logical port of `bundle`.
    pub fn bundle_ref(&self, bundle: BundleId, text: &str) -> Result<BundleRef, HierError> {
        let (name, access) = Access::parse(text)?;
        let def = self.bundle_def(self.bundle(bundle).def);
        let logical = self
            .interner
            .get(name)
            .and_then(|id| def.port(id))
            .ok_or_else(|| HierError::UnknownLogicalPort {
                def: self.interner.resolve(def.name).to_string(),
                port: name.to_string(),
            })?;
        let access = normalize(&logical.shape, &access, || {
            format!("{}.{}", self.bundle_path(bundle), text)
        })?;
        Ok(BundleRef {
            bundle,
            port: logical.name,
            access,
        })
    }

    /// The shape of the whole port (physical or logical) a reference points into.
    pub fn base_shape(&self, r: &Ref) -> Result<&Shape, HierError> {
        match r {
            Ref::Port(p) => Ok(&self.port(p)?.shape),
            Ref::Bundle(b) => {
                let def = self.bundle_def(self.bundle(b.bundle).def);
                def.port(b.port)
                    .map(|lp| &lp.shape)
                    .ok_or_else(|| HierError::UnknownLogicalPort {
                        def: self.interner.resolve(def.name).to_string(),
                        port: self.interner.resolve(b.port).to_string(),
                    })
            }
        }
    }

    /// The flat bits a reference selects within its port, and their shape.
    pub fn selection(&self, r: &Ref) -> Result<Selection, HierError> {
        let access = r.access();
        self.base_shape(r)?
            .select(&access.index, access.slice)
            .map_err(|cause| {
                AddressError::Select {
                    target: self.display_ref(r),
                    cause,
                }
                .into()
            })
    }

    /// The width of a reference in bits.
    pub fn width(&self, r: &Ref) -> Result<u32, HierError> {
        Ok(self.selection(r)?.range.width)
    }

    /// The shape of the selected bits on their own.
    pub fn shape_of(&self, r: &Ref) -> Result<Shape, HierError> {
        Ok(self.selection(r)?.shape)
    }

    /// Derives a sub-reference, with `hi`/`lo` counted in `r`'s own coordinates.
    ///
    /// On an array reference the bounds select elements of its outermost
    /// remaining dimension; on a vector they select bits.
    pub fn slice(&self, r: &Ref, hi: u32, lo: u32) -> Result<Ref, HierError> {
        let sel = self.selection(r)?;
        let sub = sel
            .shape
            .select(&[], Some((hi, lo)))
            .map_err(|cause| AddressError::Select {
                target: self.display_ref(r),
                cause,
            })?;
        let range = sub.range.offset(sel.range.lo);
        let access = self
            .base_shape(r)?
            .locate(range)
            .map(Access::from)
            .ok_or_else(|| AddressError::NotAddressable {
                target: format!("{}{}", self.display_ref(r), range),
            })?;
        Ok(r.with_access(access))
    }

    /// Shorthand for `slice(r, i, i)`.
    pub fn bit(&self, r: &Ref, i: u32) -> Result<Ref, HierError> {
        self.slice(r, i, i)
    }

    /// Creates a port on `module` shaped like the bits `r` selects.
    ///
    /// The new port takes `r`'s port name, uniquified within `module`.
    pub fn replicate_to(
        &mut self,
        r: &Ref,
        module: ModuleId,
        direction: Direction,
    ) -> Result<PortRef, HierError> {
        let shape = self.shape_of(r)?;
        let name = self.interner.resolve(r.name()).to_string();
        self.add_port(module, &name, direction, shape, PortNaming::Uniquify)
    }

    /// Human-readable form: the module path, then the port and its access.
    pub fn display_ref(&self, r: &Ref) -> String {
        match r {
            Ref::Port(p) => self.display_port(p),
            Ref::Bundle(b) => format!(
                "{}.{}{}",
                self.bundle_path(b.bundle),
                self.interner.resolve(b.port),
                b.access
            ),
        }
    }

    /// [`display_ref`](Self::display_ref) for a physical reference.
    pub fn display_port(&self, p: &PortRef) -> String {
        format!(
            "{}.{}{}",
            self.path(p.module),
            self.interner.resolve(p.port),
            p.access
        )
    }

    /// Resolves a reference to the physical port bits behind it.
    ///
    /// A bundle reference is translated through the port map whose logical
    /// side covers all of the requested bits.
    pub fn physical(&self, r: &Ref) -> Result<PortRef, HierError> {
        let b = match r {
            Ref::Port(p) => return Ok(p.clone()),
            Ref::Bundle(b) => b,
        };
        let want = self.selection(r)?.range;
        let bundle = self.bundle(b.bundle);
        for map in bundle.maps.iter().filter(|m| m.logical.port == b.port) {
            let have = self.selection(&Ref::Bundle(map.logical.clone()))?.range;
            if !have.contains(want) {
                continue;
            }
            let phys = self.selection(&Ref::Port(map.physical.clone()))?.range;
            let range = BitRange::new(phys.lo + (want.lo - have.lo), want.width);
            return self.port_ref_in(bundle.module, map.physical.port, range);
        }
        Err(HierError::UnmappedBundlePort {
            logical: self.display_ref(r),
        })
    }

    /// The port reference for a flat `range` of the port backed by `signal`.
    ///
    /// Returns `None` for nodes that are not ports, and for ranges no single
    /// reference can express.
    pub fn port_ref_at(&self, signal: SignalId, range: BitRange) -> Option<PortRef> {
        match self.netlist.signal(signal).kind {
            SignalKind::Port { module, name, .. } => self.port_ref_in(module, name, range).ok(),
            _ => None,
        }
    }

    pub(crate) fn port_ref_in(
        &self,
        module: ModuleId,
        port: Ident,
        range: BitRange,
    ) -> Result<PortRef, HierError> {
        let whole = PortRef {
            module,
            port,
            access: Access::default(),
        };
        let access = self
            .port(&whole)?
            .shape
            .locate(range)
            .map(Access::from)
            .ok_or_else(|| AddressError::NotAddressable {
                target: format!("{}{}", self.display_port(&whole), range),
            })?;
        Ok(PortRef { access, ..whole })
    }
}

fn normalize(
    shape: &Shape,
    access: &Access,
    target: impl Fn() -> String,
) -> Result<Access, AddressError> {
    let sel = shape
        .select(&access.index, access.slice)
        .map_err(|cause| AddressError::Select {
            target: target(),
            cause,
        })?;
    shape
        .locate(sel.range)
        .map(Access::from)
        .ok_or_else(|| AddressError::NotAddressable { target: target() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use knit_netlist::SelectError;

    fn setup() -> (Hierarchy, ModuleId) {
        let mut h = Hierarchy::new();
        let top = h.add_module("top");
        h.add_port(top, "grid", Direction::Output, Shape::array([5, 3], 8), PortNaming::Exact)
            .unwrap();
        h.add_port(top, "bus", Direction::Input, Shape::scalar(16), PortNaming::Exact)
            .unwrap();
        (h, top)
    }

    #[test]
    fn parse_grammar() {
        let (name, access) = Access::parse("x[2][1][7:4]").unwrap();
        assert_eq!(name, "x");
        assert_eq!(access.index, vec![2, 1]);
        assert_eq!(access.slice, Some((7, 4)));
        let (name, access) = Access::parse("clk").unwrap();
        assert_eq!(name, "clk");
        assert!(access.is_whole());
    }

    #[test]
    fn parse_rejects_bad_grammar() {
        assert!(matches!(
            Access::parse("x[3:0][1:0]"),
            Err(AddressError::MultipleRanges { .. })
        ));
        assert!(matches!(
            Access::parse("x[3:0][1]"),
            Err(AddressError::SliceBeforeIndex { .. })
        ));
        assert!(matches!(Access::parse("x[3"), Err(AddressError::Malformed { .. })));
        assert!(matches!(Access::parse("x[-1]"), Err(AddressError::Malformed { .. })));
        assert!(matches!(Access::parse("[1]"), Err(AddressError::Malformed { .. })));
        assert!(matches!(Access::parse("x[1]y"), Err(AddressError::Malformed { .. })));
    }

    #[test]
    fn construction_normalizes() {
        let (h, top) = setup();
        assert_eq!(h.port_ref(top, "bus[3:3]").unwrap(), h.port_ref(top, "bus[3]").unwrap());
        assert_eq!(h.port_ref(top, "bus[15:0]").unwrap(), h.port_ref(top, "bus").unwrap());
        assert_eq!(
            h.port_ref(top, "grid[2][2:0]").unwrap(),
            h.port_ref(top, "grid[2]").unwrap()
        );
        assert_eq!(
            h.port_ref(top, "grid[2][1][7:0]").unwrap(),
            h.port_ref(top, "grid[2][1]").unwrap()
        );
        assert!(h.port_ref(top, "grid[4:0]").unwrap().access.is_whole());
    }

    #[test]
    fn construction_checks_bounds() {
        let (h, top) = setup();
        let err = h.port_ref(top, "grid[5]").unwrap_err();
        assert!(matches!(
            err,
            HierError::Address(AddressError::Select {
                cause: SelectError::OutOfBounds { index: 5, extent: 5 },
                ..
            })
        ));
        assert!(matches!(
            h.port_ref(top, "bus[1:4]"),
            Err(HierError::Address(AddressError::Select {
                cause: SelectError::EmptyRange { .. },
                ..
            }))
        ));
        assert!(matches!(
            h.port_ref(top, "nope"),
            Err(HierError::UnknownPort { .. })
        ));
    }

    #[test]
    fn slice_is_relative_to_reference() {
        let (h, top) = setup();
        let row: Ref = h.port_ref(top, "grid[2]").unwrap().into();
        let sub = h.slice(&row, 1, 0).unwrap();
        assert_eq!(sub, h.port_ref(top, "grid[2][1:0]").unwrap().into());
        let elem = h.bit(&sub, 1).unwrap();
        assert_eq!(elem, h.port_ref(top, "grid[2][1]").unwrap().into());
        let nibble = h.slice(&elem, 7, 4).unwrap();
        assert_eq!(nibble, h.port_ref(top, "grid[2][1][7:4]").unwrap().into());
        assert_eq!(h.width(&nibble).unwrap(), 4);
    }

    #[test]
    fn slice_round_trips_through_text() {
        let (h, top) = setup();
        let bus: Ref = h.port_ref(top, "bus[11:4]").unwrap().into();
        let sub = h.slice(&bus, 5, 2).unwrap();
        let text = h.display_ref(&sub);
        assert_eq!(text, "top.bus[9:6]");
        let reparsed = h.port_ref(top, text.trim_start_matches("top.")).unwrap();
        assert_eq!(sub, reparsed.into());
    }

    #[test]
    fn full_slice_collapses() {
        let (h, top) = setup();
        let bus: Ref = h.port_ref(top, "bus").unwrap().into();
        assert_eq!(h.slice(&bus, 15, 0).unwrap(), bus);
        let grid: Ref = h.port_ref(top, "grid").unwrap().into();
        assert_eq!(h.slice(&grid, 4, 0).unwrap(), grid);
    }

    #[test]
    fn slice_out_of_bounds() {
        let (h, top) = setup();
        let elem: Ref = h.port_ref(top, "grid[0][0]").unwrap().into();
        assert!(matches!(
            h.slice(&elem, 8, 0),
            Err(HierError::Address(AddressError::Select { .. }))
        ));
    }

    #[test]
    fn shape_and_width_of_sub_array() {
        let (h, top) = setup();
        let row: Ref = h.port_ref(top, "grid[3]").unwrap().into();
        assert_eq!(h.shape_of(&row).unwrap(), Shape::array([3], 8));
        assert_eq!(h.width(&row).unwrap(), 24);
        let rows: Ref = h.port_ref(top, "grid[3:1]").unwrap().into();
        assert_eq!(h.shape_of(&rows).unwrap(), Shape::array([3, 3], 8));
    }

    #[test]
    fn replicate_uses_resolved_subset_shape() {
        let (mut h, top) = setup();
        let other = h.add_module("other");
        let row: Ref = h.port_ref(top, "grid[3]").unwrap().into();
        let copy = h.replicate_to(&row, other, Direction::Input).unwrap();
        let port = h.port(&copy).unwrap();
        assert_eq!(port.shape, Shape::array([3], 8));
        assert_eq!(port.direction, Direction::Input);
        assert_eq!(h.display_port(&copy), "other.grid");
        let again = h.replicate_to(&row, other, Direction::Input).unwrap();
        assert_eq!(h.display_port(&again), "other.grid_1");
    }

    #[test]
    fn port_ref_at_locates_ranges() {
        let (h, top) = setup();
        let grid = h.port_ref(top, "grid").unwrap();
        let sig = h.port(&grid).unwrap().signal;
        let r = h.port_ref_at(sig, BitRange::new(56, 8)).unwrap();
        assert_eq!(r, h.port_ref(top, "grid[2][1]").unwrap());
        assert!(h.port_ref_at(sig, BitRange::new(4, 8)).is_none());
    }
}
