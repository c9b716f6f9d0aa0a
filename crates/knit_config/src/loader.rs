//! Configuration and design file loading.

use crate::design::DesignDesc;
use crate::error::ConfigError;
use crate::types::KnitConfig;
use std::path::Path;

/// Loads and validates `knit.toml` from a project directory.
///
/// A directory without a `knit.toml` yields the defaults.
pub fn load_config(project_dir: &Path) -> Result<KnitConfig, ConfigError> {
    let config_path = project_dir.join("knit.toml");
    if !config_path.exists() {
        log::debug!("no {} found, using defaults", config_path.display());
        return Ok(KnitConfig::default());
    }
    load_config_file(&config_path)
}

/// Loads and validates a configuration from an explicit file.
pub fn load_config_file(path: &Path) -> Result<KnitConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<KnitConfig, ConfigError> {
    let config: KnitConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks the values serde cannot.
fn validate_config(config: &KnitConfig) -> Result<(), ConfigError> {
    let sep = &config.naming.separator;
    if sep.is_empty() {
        return Err(ConfigError::ValidationError(
            "naming.separator is empty".to_string(),
        ));
    }
    if !sep.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return Err(ConfigError::ValidationError(format!(
            "naming.separator '{sep}' would not form identifiers"
        )));
    }
    if config.extract.max_trace_depth == 0 {
        return Err(ConfigError::ValidationError(
            "extract.max_trace_depth must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Loads a design description file.
pub fn load_design(path: &Path) -> Result<DesignDesc, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_design_from_str(&content)
}

/// Parses a design description from a string.
pub fn load_design_from_str(content: &str) -> Result<DesignDesc, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}
