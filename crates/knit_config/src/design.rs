//! Declarative design descriptions.
//!
//! A design file declares bundle definitions, a module tree with ports and
//! bundles, and the connections to make between them:
//!
//! ```toml
//! [[bundle_def]]
//! name = "link"
//! port = [
//!     { name = "data", width = 8, group = "forward" },
//!     { name = "ready", width = 1, group = "backward" },
//! ]
//!
//! [[module]]
//! name = "top"
//!
//! [[module]]
//! name = "cpu"
//! parent = "top"
//! port = [{ name = "x", dir = "output", width = 8 }]
//!
//! [[connect]]
//! from = "top.cpu.x"
//! to = "top.mem.y"
//! ```
//!
//! References are written as a module path followed by a port reference
//! (`top.cpu.x[3:0]`), or by a bundle name and a logical port reference
//! (`top.cpu.bus.data`).

use crate::error::ConfigError;
use knit_hier::{Group, Hierarchy, PortNaming, Ref, Role, WireOptions};
use knit_netlist::{BundleId, Direction, ModuleId, Shape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A whole design file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignDesc {
    /// Interface declarations.
    #[serde(rename = "bundle_def")]
    pub bundle_defs: Vec<BundleDefDesc>,
    /// Modules, each after its parent.
    #[serde(rename = "module")]
    pub modules: Vec<ModuleDesc>,
    /// Port-level connections, made in order.
    #[serde(rename = "connect")]
    pub connects: Vec<ConnectDesc>,
    /// Bundle-level connections, made after the port-level ones.
    pub connect_bundles: Vec<ConnectBundlesDesc>,
}

/// An interface declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleDefDesc {
    /// The interface name.
    pub name: String,
    /// Logical ports in order.
    #[serde(default, rename = "port")]
    pub ports: Vec<LogicalPortDesc>,
}

/// One logical port of an interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogicalPortDesc {
    /// The port name.
    pub name: String,
    /// Element width in bits.
    pub width: u32,
    /// Array dimensions, outermost first.
    #[serde(default)]
    pub dims: Vec<u32>,
    /// How the port flows.
    pub group: Group,
}

/// A module and what it declares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDesc {
    /// The module name.
    pub name: String,
    /// Dotted path of the parent module, absent for a root.
    #[serde(default)]
    pub parent: Option<String>,
    /// Primary ports.
    #[serde(default, rename = "port")]
    pub ports: Vec<PortDesc>,
    /// Interface instances.
    #[serde(default, rename = "bundle")]
    pub bundles: Vec<BundleDesc>,
}

/// A primary port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDesc {
    /// The port name.
    pub name: String,
    /// The port direction.
    pub dir: Direction,
    /// Element width in bits.
    pub width: u32,
    /// Array dimensions, outermost first.
    #[serde(default)]
    pub dims: Vec<u32>,
    /// Named composite fields as `[hi, lo]` flat bit ranges.
    #[serde(default)]
    pub fields: BTreeMap<String, [u32; 2]>,
}

/// An interface instance and its port maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleDesc {
    /// The instance name.
    pub name: String,
    /// The interface it instantiates.
    pub def: String,
    /// The role it plays.
    pub role: Role,
    /// Logical port reference to physical port reference on the same module.
    #[serde(default)]
    pub maps: BTreeMap<String, String>,
}

/// A port-level connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectDesc {
    /// The driving reference.
    pub from: String,
    /// The receiving reference.
    pub to: String,
}

/// A bundle-level connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectBundlesDesc {
    /// Dotted path of one bundle.
    pub first: String,
    /// Dotted path of the other bundle.
    pub second: String,
    /// Logical ports left unconnected.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn shape(dims: &[u32], width: u32) -> Shape {
    if dims.is_empty() {
        Shape::scalar(width)
    } else {
        Shape::array(dims.to_vec(), width)
    }
}

/// A hierarchy built from a [`DesignDesc`].
#[derive(Debug)]
pub struct Design {
    /// The built hierarchy.
    pub hier: Hierarchy,
    modules: Vec<(String, ModuleId)>,
}

impl DesignDesc {
    /// Declares everything the description names, without making connections.
    pub fn build(&self, options: WireOptions) -> Result<Design, ConfigError> {
        let mut design = Design {
            hier: Hierarchy::with_options(options),
            modules: Vec::new(),
        };
        let hier = &mut design.hier;
        for def in &self.bundle_defs {
            hier.add_bundle_def(
                &def.name,
                def.ports
                    .iter()
                    .map(|p| (p.name.as_str(), shape(&p.dims, p.width), p.group)),
            )?;
        }

        let mut ids = Vec::with_capacity(self.modules.len());
        for m in &self.modules {
            let id = match &m.parent {
                None => design.hier.add_module(&m.name),
                Some(parent) => {
                    let parent = design.module(parent)?;
                    design.hier.add_submodule(parent, &m.name)?
                }
            };
            let path = design.hier.path(id);
            if design.modules.iter().any(|(p, _)| *p == path) {
                return Err(ConfigError::ValidationError(format!(
                    "module '{path}' is declared twice"
                )));
            }
            design.modules.push((path, id));
            for p in &m.ports {
                let port = design.hier.add_port(
                    id,
                    &p.name,
                    p.dir,
                    shape(&p.dims, p.width),
                    PortNaming::Exact,
                )?;
                for (field, [hi, lo]) in &p.fields {
                    design.hier.add_field(&port, field, *hi, *lo)?;
                }
            }
            ids.push(id);
        }

        for (m, &id) in self.modules.iter().zip(&ids) {
            for b in &m.bundles {
                let hier = &mut design.hier;
                let def = hier
                    .find_bundle_def(&b.def)
                    .ok_or_else(|| ConfigError::UnknownBundleDef(b.def.clone()))?;
                let bundle = hier.add_bundle(id, &b.name, def, b.role, PortNaming::Exact)?;
                for (logical, physical) in &b.maps {
                    let logical = hier.bundle_ref(bundle, logical)?;
                    let physical = hier.port_ref(id, physical)?;
                    hier.map_port(&physical, &logical)?;
                }
            }
        }
        log::debug!(
            "built {} modules and {} bundle definitions",
            design.modules.len(),
            self.bundle_defs.len()
        );
        Ok(design)
    }

    /// Builds the design and makes every connection it describes.
    pub fn build_wired(&self, options: WireOptions) -> Result<Design, ConfigError> {
        let mut design = self.build(options)?;
        design.wire(self)?;
        Ok(design)
    }
}

impl Design {
    /// Every module path with its ID, in declaration order.
    pub fn modules(&self) -> &[(String, ModuleId)] {
        &self.modules
    }

    /// Looks up a module by dotted path.
    pub fn module(&self, path: &str) -> Result<ModuleId, ConfigError> {
        self.modules
            .iter()
            .find(|(p, _)| p == path)
            .map(|&(_, id)| id)
            .ok_or_else(|| ConfigError::UnknownModule(path.to_string()))
    }

    /// Looks up a bundle by dotted path (`top.cpu.bus`).
    pub fn bundle(&self, path: &str) -> Result<BundleId, ConfigError> {
        let (module, name) = path
            .rsplit_once('.')
            .ok_or_else(|| ConfigError::UnknownModule(path.to_string()))?;
        Ok(self.hier.find_bundle(self.module(module)?, name)?)
    }

    /// Parses a port reference (`top.cpu.x[3:0]`) or a bundle port reference
    /// (`top.cpu.bus.data`).
    pub fn reference(&self, text: &str) -> Result<Ref, ConfigError> {
        let head_end = text.find('[').unwrap_or(text.len());
        let (module, port) = text[..head_end]
            .rsplit_once('.')
            .ok_or_else(|| ConfigError::UnknownModule(text.to_string()))?;
        let port_text = &text[module.len() + 1..];
        let port_name = &port[..];
        if let Ok(id) = self.module(module) {
            if self.hier.find_port(id, port_name).is_ok() {
                return Ok(self.hier.port_ref(id, port_text)?.into());
            }
        }
        let bundle = self.bundle(module)?;
        Ok(self.hier.bundle_ref(bundle, port_text)?.into())
    }

    /// Makes every connection of `desc`, port-level first.
    pub fn wire(&mut self, desc: &DesignDesc) -> Result<(), ConfigError> {
        for c in &desc.connects {
            let from = self.reference(&c.from)?;
            let to = self.reference(&c.to)?;
            let path = self.hier.connect(&from, &to)?;
            log::info!(
                "connected {} -> {} ({} ports punched, {} reused)",
                c.from,
                c.to,
                path.created.len(),
                path.reused.len()
            );
        }
        for c in &desc.connect_bundles {
            let first = self.bundle(&c.first)?;
            let second = self.bundle(&c.second)?;
            let exclude: Vec<&str> = c.exclude.iter().map(String::as_str).collect();
            self.hier.connect_bundles(first, second, &exclude)?;
            log::info!("connected bundles {} and {}", c.first, c.second);
        }
        Ok(())
    }
}
