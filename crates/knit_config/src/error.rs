//! Error types for configuration and design loading.

use knit_hier::HierError;

/// Errors that can occur when loading a configuration or building a design.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading a file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A design names a module path that was never declared.
    #[error("unknown module '{0}'")]
    UnknownModule(String),

    /// A design names a bundle definition that was never declared.
    #[error("unknown bundle definition '{0}'")]
    UnknownBundleDef(String),

    /// Building or wiring the described hierarchy failed.
    #[error("{0}")]
    Design(#[from] HierError),
}
