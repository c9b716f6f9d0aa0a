//! `knit extract`: build, wire, then list connections.
//!
//! 1. Load config (`--config` or `knit.toml` beside the design)
//! 2. Build and wire the design
//! 3. Resolve `--modules` (default: every declared module)
//! 4. Extract and print connections

use std::path::Path;

use knit_config::Design;
use knit_extract::{Connection, Extractor};
use serde::Serialize;

use crate::pipeline::{build_design, resolve_config};
use crate::{ExtractArgs, GlobalArgs, ReportFormat};

/// One extracted connection, rendered with hierarchical names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionRecord {
    /// `"interface"` or `"adhoc"`.
    pub kind: &'static str,
    /// The feeding side, or the first bundle.
    pub from: String,
    /// The fed side, or the second bundle.
    pub to: String,
}

impl ConnectionRecord {
    fn new(design: &Design, connection: &Connection) -> Self {
        let hier = &design.hier;
        match connection {
            Connection::Interface(c) => Self {
                kind: "interface",
                from: hier.bundle_path(c.bundle1),
                to: hier.bundle_path(c.bundle2),
            },
            Connection::AdHoc(c) => Self {
                kind: "adhoc",
                from: hier.display_port(&c.point1),
                to: hier.display_port(&c.point2),
            },
        }
    }
}

/// Runs the `knit extract` command.
pub fn run(args: &ExtractArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let records = collect(args, global)?;

    let format = if args.json {
        ReportFormat::Json
    } else {
        args.format
    };
    match format {
        ReportFormat::Text => {
            for r in &records {
                let arrow = if r.kind == "interface" { "<->" } else { "->" };
                println!("{} {arrow} {}", r.from, r.to);
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
    }

    if !global.quiet && format == ReportFormat::Text {
        let interfaces = records.iter().filter(|r| r.kind == "interface").count();
        eprintln!(
            "   Result: {} interface, {} ad-hoc connection(s)",
            interfaces,
            records.len() - interfaces
        );
    }
    Ok(0)
}

/// Everything `run` prints, as records.
pub fn collect(
    args: &ExtractArgs,
    global: &GlobalArgs,
) -> Result<Vec<ConnectionRecord>, Box<dyn std::error::Error>> {
    let path = Path::new(&args.design);
    let mut config = resolve_config(path, global)?;
    if args.coalesce {
        config.extract.coalesce = true;
    }
    let design = build_design(path, &config)?;

    let modules = if args.modules.is_empty() {
        design.modules().iter().map(|&(_, id)| id).collect()
    } else {
        args.modules
            .iter()
            .map(|m| design.module(m))
            .collect::<Result<Vec<_>, _>>()?
    };
    log::info!("extracting between {} modules", modules.len());

    let mut extractor = Extractor::new(&design.hier, modules, config.extract.clone())?;
    let connections = extractor.extract()?;
    Ok(connections
        .iter()
        .map(|c| ConnectionRecord::new(&design, &c))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DESIGN: &str = r#"
[[bundle_def]]
name = "link"
port = [
    { name = "data", width = 8, group = "forward" },
    { name = "ready", width = 1, group = "backward" },
]

[[module]]
name = "top"

[[module]]
name = "cpu"
parent = "top"
port = [
    { name = "d", dir = "output", width = 8 },
    { name = "r", dir = "input", width = 1 },
    { name = "irq", dir = "output", width = 4 },
]
bundle = [{ name = "bus", def = "link", role = "provider", maps = { data = "d", ready = "r" } }]

[[module]]
name = "mem"
parent = "top"
port = [
    { name = "d", dir = "input", width = 8 },
    { name = "r", dir = "output", width = 1 },
    { name = "irq", dir = "input", width = 2 },
]
bundle = [{ name = "bus", def = "link", role = "consumer", maps = { data = "d", ready = "r" } }]

[[connect]]
from = "top.cpu.irq[1:0]"
to = "top.mem.irq"

[[connect_bundles]]
first = "top.cpu.bus"
second = "top.mem.bus"
"#;

    fn setup(design: &str) -> (TempDir, ExtractArgs, GlobalArgs) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("design.toml");
        std::fs::write(&path, design).unwrap();
        let args = ExtractArgs {
            design: path.to_str().unwrap().to_string(),
            modules: Vec::new(),
            coalesce: false,
            format: ReportFormat::Text,
            json: false,
        };
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            config: None,
        };
        (tmp, args, global)
    }

    #[test]
    fn extracts_interface_and_adhoc() {
        let (_tmp, args, global) = setup(DESIGN);
        let records = collect(&args, &global).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            ConnectionRecord {
                kind: "interface",
                from: "top.cpu.bus".to_string(),
                to: "top.mem.bus".to_string(),
            }
        );
        assert_eq!(records[1].kind, "adhoc");
        assert_eq!(records[1].from, "top.cpu.irq[1:0]");
        assert_eq!(records[1].to, "top.mem.irq");
    }

    #[test]
    fn module_selection_limits_extraction() {
        let (_tmp, mut args, global) = setup(DESIGN);
        args.modules = vec!["top.cpu".to_string()];
        assert!(collect(&args, &global).unwrap().is_empty());
    }

    #[test]
    fn unknown_module_selection() {
        let (_tmp, mut args, global) = setup(DESIGN);
        args.modules = vec!["top.gpu".to_string()];
        let err = collect(&args, &global).unwrap_err();
        assert_eq!(err.to_string(), "unknown module 'top.gpu'");
    }

    #[test]
    fn records_serialize_as_json() {
        let record = ConnectionRecord {
            kind: "adhoc",
            from: "top.a.x".to_string(),
            to: "top.b.y".to_string(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "adhoc", "from": "top.a.x", "to": "top.b.y" })
        );
    }
}
