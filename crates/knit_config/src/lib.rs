//! Parsing and validation of `knit.toml` settings and design descriptions.
//!
//! [`KnitConfig`] carries the wiring and extraction options. A
//! [`DesignDesc`] describes a module tree declaratively (bundle definitions,
//! modules with their ports and bundles, and the connections to make) and can
//! be built into a wired [`knit_hier::Hierarchy`].

#![warn(missing_docs)]

pub mod design;
pub mod error;
pub mod loader;
pub mod types;

pub use design::{Design, DesignDesc};
pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, load_design, load_design_from_str};
pub use types::KnitConfig;
