//! `knit check`: build and wire a design without extracting.

use std::path::Path;

use crate::pipeline::{build_design, resolve_config};
use crate::{CheckArgs, GlobalArgs};

/// Runs the `knit check` command. Any build or wiring error is returned.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let path = Path::new(&args.design);
    let config = resolve_config(path, global)?;
    let design = build_design(path, &config)?;
    if !global.quiet {
        eprintln!(
            "   Checked {} ({} modules)",
            path.display(),
            design.modules().len()
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn check(design: &str) -> Result<i32, Box<dyn std::error::Error>> {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("design.toml");
        std::fs::write(&path, design).unwrap();
        let args = CheckArgs {
            design: path.to_str().unwrap().to_string(),
        };
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        };
        run(&args, &global)
    }

    #[test]
    fn legal_design_passes() {
        let design = r#"
[[module]]
name = "top"

[[module]]
name = "a"
parent = "top"
port = [{ name = "x", dir = "output", width = 4 }]

[[module]]
name = "b"
parent = "top"
port = [{ name = "y", dir = "input", width = 4 }]

[[connect]]
from = "top.a.x"
to = "top.b.y"
"#;
        assert_eq!(check(design).unwrap(), 0);
    }

    #[test]
    fn feed_through_is_reported() {
        let design = r#"
[[module]]
name = "top"

[[module]]
name = "a"
parent = "top"
port = [{ name = "x", dir = "input", width = 4 }]

[[module]]
name = "b"
parent = "top"
port = [{ name = "y", dir = "input", width = 4 }]

[[connect]]
from = "top.a.x"
to = "top.b.y"
"#;
        assert!(check(design).is_err());
    }

    #[test]
    fn missing_design_file() {
        let args = CheckArgs {
            design: "/nonexistent/design.toml".to_string(),
        };
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        };
        assert!(run(&args, &global).is_err());
    }
}
