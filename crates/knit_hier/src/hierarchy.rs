//! The module tree and the ports and wires declared on it.

use crate::bundle::{Bundle, BundleDef};
use crate::error::{AddressError, HierError};
use crate::module::{Module, Port};
use crate::reference::{Access, PortRef, Ref};
use crate::wire::WireOptions;
use knit_common::{Ident, Interner, LogicVec};
use knit_netlist::{
    Arena, BitRange, BundleDefId, BundleId, Direction, ModuleId, Netlist, SelectError, Shape,
    SigRange, SignalId,
};

/// How a requested name is claimed in a module's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortNaming {
    /// Use the name as given; a collision is an error.
    Exact,
    /// Derive a free name from the given one.
    Uniquify,
}

/// A tree (or forest) of modules over one shared signal graph.
///
/// The hierarchy owns every module, bundle and bundle definition, the signal
/// graph the ports live in, and the interner for all names. Modules are built
/// up, wired, and finally frozen; after [`freeze`](Self::freeze) no structural
/// change to the frozen subtree is accepted.
#[derive(Debug, Default)]
pub struct Hierarchy {
    pub(crate) interner: Interner,
    pub(crate) netlist: Netlist,
    pub(crate) modules: Arena<ModuleId, Module>,
    pub(crate) defs: Arena<BundleDefId, BundleDef>,
    pub(crate) bundles: Arena<BundleId, Bundle>,
    pub(crate) options: WireOptions,
}

impl Hierarchy {
    /// Creates an empty hierarchy with default wiring options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty hierarchy with the given wiring options.
    pub fn with_options(options: WireOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// The wiring options in effect.
    pub fn options(&self) -> &WireOptions {
        &self.options
    }

    /// The interner holding every name in the hierarchy.
    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    /// The underlying signal graph.
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Mutable access to the signal graph for module-local logic.
    ///
    /// Nothing done through it is checked against freezing or the wiring rules.
    pub fn netlist_mut(&mut self) -> &mut Netlist {
        &mut self.netlist
    }

    /// Returns the module with the given ID.
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id]
    }

    /// Iterates over all modules in creation order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter().map(|(_, m)| m)
    }

    /// Returns the bundle with the given ID.
    pub fn bundle(&self, id: BundleId) -> &Bundle {
        &self.bundles[id]
    }

    /// Returns the bundle definition with the given ID.
    pub fn bundle_def(&self, id: BundleDefId) -> &BundleDef {
        &self.defs[id]
    }

    /// Resolves an interned name.
    pub fn resolve(&self, name: Ident) -> &str {
        self.interner.resolve(name)
    }

    /// The module's own name.
    pub fn name(&self, id: ModuleId) -> &str {
        self.interner.resolve(self.modules[id].name)
    }

    /// The dotted path of module names from the root down to `id`.
    pub fn path(&self, id: ModuleId) -> String {
        let mut names: Vec<&str> = self.ancestors(id).iter().map(|&a| self.name(a)).collect();
        names.reverse();
        names.push(self.name(id));
        names.join(".")
    }

    /// The module path followed by the bundle name.
    pub fn bundle_path(&self, id: BundleId) -> String {
        let bundle = &self.bundles[id];
        format!("{}.{}", self.path(bundle.module), self.resolve(bundle.name))
    }

    // --- Tree structure ---

    /// Creates a parentless module.
    pub fn add_module(&mut self, name: &str) -> ModuleId {
        let name = self.interner.get_or_intern(name);
        self.modules.alloc_with(|id| Module::new(id, name))
    }

    /// Makes `child` a child of `parent`.
    pub fn add_child(&mut self, parent: ModuleId, child: ModuleId) -> Result<(), HierError> {
        self.check_mutable(parent)?;
        self.check_mutable(child)?;
        if let Some(existing) = self.modules[child].parent {
            return Err(HierError::AlreadyParented {
                child: self.path(child),
                parent: self.path(existing),
            });
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(HierError::HierarchyCycle {
                parent: self.path(parent),
                child: self.path(child),
            });
        }
        self.modules[child].parent = Some(parent);
        self.modules[parent].children.push(child);
        Ok(())
    }

    /// Creates a module directly under `parent`.
    pub fn add_submodule(&mut self, parent: ModuleId, name: &str) -> Result<ModuleId, HierError> {
        self.check_mutable(parent)?;
        let child = self.add_module(name);
        self.add_child(parent, child)?;
        Ok(child)
    }

    /// The parent of `id`.
    pub fn parent(&self, id: ModuleId) -> Option<ModuleId> {
        self.modules[id].parent
    }

    /// The children of `id` in insertion order.
    pub fn children(&self, id: ModuleId) -> &[ModuleId] {
        &self.modules[id].children
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: ModuleId) -> Vec<ModuleId> {
        let mut out = Vec::new();
        let mut cur = self.modules[id].parent;
        while let Some(m) = cur {
            out.push(m);
            cur = self.modules[m].parent;
        }
        out
    }

    /// Returns `true` if `ancestor` lies strictly above `id`.
    pub fn is_ancestor(&self, ancestor: ModuleId, id: ModuleId) -> bool {
        let mut cur = self.modules[id].parent;
        while let Some(m) = cur {
            if m == ancestor {
                return true;
            }
            cur = self.modules[m].parent;
        }
        false
    }

    /// The nearest module that is `a` or above `a`, and `b` or above `b`.
    pub fn common_ancestor(&self, a: ModuleId, b: ModuleId) -> Option<ModuleId> {
        let mut above_b = vec![b];
        above_b.extend(self.ancestors(b));
        std::iter::once(a)
            .chain(self.ancestors(a))
            .find(|m| above_b.contains(m))
    }

    /// The module on the path from `ancestor` down to `id` that is a direct
    /// child of `ancestor`.
    pub fn child_toward(&self, ancestor: ModuleId, id: ModuleId) -> Option<ModuleId> {
        let mut cur = id;
        while let Some(parent) = self.modules[cur].parent {
            if parent == ancestor {
                return Some(cur);
            }
            cur = parent;
        }
        None
    }

    /// Modules strictly between `id` and its ancestor `above`, nearest to `id`
    /// first. Empty when `above` is not an ancestor of `id`.
    pub fn path_between(&self, above: ModuleId, id: ModuleId) -> Vec<ModuleId> {
        let ancestors = self.ancestors(id);
        match ancestors.iter().position(|&m| m == above) {
            Some(n) => ancestors[..n].to_vec(),
            None => Vec::new(),
        }
    }

    /// Number of strict ancestors of `id`.
    pub fn depth(&self, id: ModuleId) -> usize {
        self.ancestors(id).len()
    }

    /// Freezes `id` and its whole subtree.
    pub fn freeze(&mut self, id: ModuleId) {
        let mut stack = vec![id];
        while let Some(m) = stack.pop() {
            self.modules[m].frozen = true;
            stack.extend(self.modules[m].children.iter().copied());
        }
        log::debug!("froze subtree at {}", self.path(id));
    }

    /// Returns `true` once `id` has been frozen.
    pub fn is_frozen(&self, id: ModuleId) -> bool {
        self.modules[id].frozen
    }

    pub(crate) fn check_mutable(&self, id: ModuleId) -> Result<(), HierError> {
        if self.modules[id].frozen {
            return Err(HierError::Frozen {
                module: self.path(id),
            });
        }
        Ok(())
    }

    // --- Ports and wires ---

    /// Declares a primary port on `module` and returns a reference to all of it.
    pub fn add_port(
        &mut self,
        module: ModuleId,
        name: &str,
        direction: Direction,
        shape: Shape,
        naming: PortNaming,
    ) -> Result<PortRef, HierError> {
        self.check_mutable(module)?;
        self.check_width(module, name, &shape)?;
        let name = self.claim_signal_name(module, name, naming)?;
        let signal = self.netlist.add_port(module, name, direction, shape.clone());
        self.modules[module].ports.push(Port {
            name,
            direction,
            shape,
            signal,
            fields: Vec::new(),
        });
        Ok(PortRef {
            module,
            port: name,
            access: Access::default(),
        })
    }

    /// Declares an internal wire on `module`, uniquifying its name.
    pub fn add_wire(
        &mut self,
        module: ModuleId,
        name: &str,
        shape: Shape,
    ) -> Result<SignalId, HierError> {
        self.check_mutable(module)?;
        self.check_width(module, name, &shape)?;
        let name = self.claim_signal_name(module, name, PortNaming::Uniquify)?;
        let signal = self.netlist.add_wire(module, name, shape);
        self.modules[module].wires.push(signal);
        Ok(signal)
    }

    fn check_width(&self, module: ModuleId, name: &str, shape: &Shape) -> Result<(), HierError> {
        match shape.checked_bits() {
            None => Err(AddressError::TooWide {
                target: format!("{}.{name}", self.path(module)),
                shape: shape.clone(),
            }
            .into()),
            Some(0) => Err(AddressError::Malformed {
                text: name.to_string(),
                reason: "a signal must have at least one bit",
            }
            .into()),
            Some(_) => Ok(()),
        }
    }

    fn claim_signal_name(
        &mut self,
        module: ModuleId,
        name: &str,
        naming: PortNaming,
    ) -> Result<Ident, HierError> {
        let names = &mut self.modules[module].signal_names;
        let claimed = match naming {
            PortNaming::Exact => {
                if !names.reserve(name) {
                    return Err(HierError::DuplicateName {
                        module: self.path(module),
                        name: name.to_string(),
                    });
                }
                name.to_string()
            }
            PortNaming::Uniquify => names.uniquify(name),
        };
        Ok(self.interner.get_or_intern(&claimed))
    }

    /// Looks up a port of `module` by name.
    pub fn find_port(&self, module: ModuleId, name: &str) -> Result<&Port, HierError> {
        self.interner
            .get(name)
            .and_then(|id| self.modules[module].port(id))
            .ok_or_else(|| HierError::UnknownPort {
                module: self.path(module),
                port: name.to_string(),
            })
    }

    /// The port a physical reference points into.
    pub fn port(&self, r: &PortRef) -> Result<&Port, HierError> {
        self.modules[r.module]
            .port(r.port)
            .ok_or_else(|| HierError::UnknownPort {
                module: self.path(r.module),
                port: self.resolve(r.port).to_string(),
            })
    }

    /// Declares a named field covering flat bits `[hi:lo]` of a port.
    pub fn add_field(
        &mut self,
        port: &PortRef,
        field: &str,
        hi: u32,
        lo: u32,
    ) -> Result<(), HierError> {
        self.check_mutable(port.module)?;
        let width = self.port(port)?.shape.bits();
        let select_err = |cause| AddressError::Select {
            target: format!("{}.{}", self.display_port(port), field),
            cause,
        };
        if hi < lo {
            return Err(select_err(SelectError::EmptyRange { hi, lo }).into());
        }
        if hi >= width {
            return Err(select_err(SelectError::OutOfBounds {
                index: hi,
                extent: width,
            })
            .into());
        }
        let field = self.interner.get_or_intern(field);
        if let Some(p) = self.modules[port.module].port_mut(port.port) {
            p.fields.retain(|(n, _)| *n != field);
            p.fields.push((field, BitRange::new(lo, hi - lo + 1)));
        }
        Ok(())
    }

    /// Resolves a named field of a composite port to a reference.
    pub fn field_ref(
        &self,
        module: ModuleId,
        port: &str,
        field: &str,
    ) -> Result<PortRef, HierError> {
        let p = self.find_port(module, port)?;
        let range = self
            .interner
            .get(field)
            .and_then(|f| p.field(f))
            .ok_or_else(|| HierError::UnmappedField {
                port: format!("{}.{}", self.path(module), port),
                field: field.to_string(),
            })?;
        self.port_ref_in(module, p.name, range)
    }

    // --- Values ---

    /// Drives the bits of `r` from a constant.
    pub fn assign(&mut self, r: &Ref, value: LogicVec) -> Result<(), HierError> {
        let target = self.physical(r)?;
        self.check_mutable(target.module)?;
        let dst = self.sig_range(&target)?;
        let node = self.netlist.constant(value);
        self.netlist.drive_from(node, dst)?;
        Ok(())
    }

    /// Reads back the value the bits of `r` currently carry.
    pub fn value(&self, r: &Ref) -> Result<LogicVec, HierError> {
        let target = self.physical(r)?;
        Ok(self.netlist.value(self.sig_range(&target)?))
    }

    /// Drives the bits of `receiver` from a concatenation of `parts`, the first
    /// part landing in the lowest bits.
    pub fn assign_concat(&mut self, receiver: &Ref, parts: &[Ref]) -> Result<(), HierError> {
        let target = self.physical(receiver)?;
        self.check_mutable(target.module)?;
        let dst = self.sig_range(&target)?;
        let mut sources = Vec::with_capacity(parts.len());
        for part in parts {
            sources.push(self.sig_range(&self.physical(part)?)?);
        }
        let width: u32 = sources.iter().map(|s| s.range.width).sum();
        if width != dst.range.width {
            return Err(AddressError::ShapeMismatch {
                left: self.display_port(&target),
                left_shape: self.shape_of(receiver)?,
                right: format!("{{{} parts}}", parts.len()),
                right_shape: Shape::scalar(width),
            }
            .into());
        }
        let node = self.netlist.concat(&sources)?;
        self.netlist.drive_from(node, dst)?;
        Ok(())
    }

    /// The signal bits behind a port reference.
    pub fn sig_range(&self, r: &PortRef) -> Result<SigRange, HierError> {
        let signal = self.port(r)?.signal;
        let range = self.selection(&Ref::Port(r.clone()))?.range;
        Ok(SigRange::new(signal, range))
    }
}
