//! Shared helpers for CLI commands: logging setup, configuration lookup and
//! design building.

use std::path::{Path, PathBuf};

use knit_config::{Design, KnitConfig};

use crate::GlobalArgs;

/// Installs the logger. `RUST_LOG` wins over the flags.
pub fn init_logging(global: &GlobalArgs) {
    let level = if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Loads the configuration for a design file.
///
/// `--config` names the file explicitly; otherwise `knit.toml` is looked up
/// next to the design, and defaults are used when there is none.
pub fn resolve_config(
    design: &Path,
    global: &GlobalArgs,
) -> Result<KnitConfig, Box<dyn std::error::Error>> {
    if let Some(ref path) = global.config {
        return Ok(knit_config::load_config_file(Path::new(path))?);
    }
    let dir = design
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(knit_config::load_config(&dir)?)
}

/// Reads, builds and wires a design file.
pub fn build_design(
    path: &Path,
    config: &KnitConfig,
) -> Result<Design, Box<dyn std::error::Error>> {
    let desc = knit_config::load_design(path)?;
    log::debug!(
        "{}: {} modules, {} connects, {} bundle connects",
        path.display(),
        desc.modules.len(),
        desc.connects.len(),
        desc.connect_bundles.len()
    );
    Ok(desc.build_wired(config.naming.clone())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            config,
        }
    }

    #[test]
    fn config_next_to_design() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("knit.toml"), "[naming]\nseparator = \"__\"\n").unwrap();
        let config = resolve_config(&tmp.path().join("design.toml"), &global(None)).unwrap();
        assert_eq!(config.naming.separator, "__");
    }

    #[test]
    fn missing_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = resolve_config(&tmp.path().join("design.toml"), &global(None)).unwrap();
        assert_eq!(config, KnitConfig::default());
    }

    #[test]
    fn explicit_config_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("other.toml");
        std::fs::write(&path, "[extract]\ncoalesce = true\n").unwrap();
        let config = resolve_config(
            Path::new("design.toml"),
            &global(Some(path.to_str().unwrap().to_string())),
        )
        .unwrap();
        assert!(config.extract.coalesce);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        let result = resolve_config(
            Path::new("design.toml"),
            &global(Some(path.to_str().unwrap().to_string())),
        );
        assert!(result.is_err());
    }

    #[test]
    fn build_reports_bad_design() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("design.toml");
        std::fs::write(&path, "[[module]]\nname = \"a\"\nparent = \"nowhere\"\n").unwrap();
        let err = build_design(&path, &KnitConfig::default()).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }
}
