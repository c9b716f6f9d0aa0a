//! Scenario helpers shared by the end-to-end tests.
//!
//! Builds small hierarchies, runs the extractor over them and renders the
//! results as hierarchical names for assertion.

#![warn(missing_docs)]

use knit_config::{load_design_from_str, Design};
use knit_extract::{Connections, ExtractOptions, Extractor};
use knit_hier::{Hierarchy, PortNaming, Ref, WireOptions};
use knit_netlist::{Direction, ModuleId, Shape};

/// Adds a scalar port named exactly `name`.
pub fn port(h: &mut Hierarchy, m: ModuleId, name: &str, dir: Direction, width: u32) -> Ref {
    h.add_port(m, name, dir, Shape::scalar(width), PortNaming::Exact)
        .unwrap()
        .into()
}

/// Adds an array port with `dims` outermost first.
pub fn array_port(
    h: &mut Hierarchy,
    m: ModuleId,
    name: &str,
    dir: Direction,
    dims: &[u32],
    width: u32,
) -> Ref {
    h.add_port(m, name, dir, Shape::array(dims.to_vec(), width), PortNaming::Exact)
        .unwrap()
        .into()
}

/// Parses a reference to a port of `m`.
pub fn at(h: &Hierarchy, m: ModuleId, text: &str) -> Ref {
    h.port_ref(m, text).unwrap().into()
}

/// `top` with the named children.
pub fn siblings(names: &[&str]) -> (Hierarchy, ModuleId, Vec<ModuleId>) {
    let mut h = Hierarchy::new();
    let top = h.add_module("top");
    let children = names
        .iter()
        .map(|n| h.add_submodule(top, n).unwrap())
        .collect();
    (h, top, children)
}

/// Extracts with default options.
pub fn extract(h: &Hierarchy, modules: &[ModuleId]) -> Connections {
    extract_with(h, modules, ExtractOptions::default())
}

/// Extracts with explicit options.
pub fn extract_with(h: &Hierarchy, modules: &[ModuleId], options: ExtractOptions) -> Connections {
    Extractor::new(h, modules.iter().copied(), options)
        .unwrap()
        .extract()
        .unwrap()
}

/// Every connection rendered with hierarchical names, sorted.
pub fn described(h: &Hierarchy, connections: &Connections) -> Vec<String> {
    let mut out: Vec<String> = connections.iter().map(|c| c.describe(h)).collect();
    out.sort();
    out
}

/// Names of every port on `m`, in declaration order.
pub fn port_names(h: &Hierarchy, m: ModuleId) -> Vec<String> {
    h.module(m)
        .ports
        .iter()
        .map(|p| h.resolve(p.name).to_string())
        .collect()
}

/// Builds and wires a design description with default naming.
pub fn design(src: &str) -> Design {
    load_design_from_str(src)
        .unwrap()
        .build_wired(WireOptions::default())
        .unwrap()
}
