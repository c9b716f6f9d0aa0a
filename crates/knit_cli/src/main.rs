//! Knit CLI: builds a design description, wires it and extracts its
//! connections.
//!
//! `knit check` stops after wiring; `knit extract` also runs the connection
//! extractor over the selected modules and prints what it finds.

#![warn(missing_docs)]

mod check;
mod extract;
mod pipeline;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Knit, a hierarchical auto-wiring tool.
#[derive(Parser, Debug)]
#[command(name = "knit", version, about = "Knit hierarchical wiring")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a custom `knit.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build and wire a design, then list its connections.
    Extract(ExtractArgs),
    /// Build and wire a design, reporting the first error.
    Check(CheckArgs),
}

/// Arguments for the `knit extract` subcommand.
#[derive(Parser, Debug)]
pub struct ExtractArgs {
    /// Design description file.
    pub design: String,

    /// Module paths to extract between (default: every module).
    #[arg(long, value_delimiter = ',')]
    pub modules: Vec<String>,

    /// Merge adjacent single-bit connections.
    #[arg(long)]
    pub coalesce: bool,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Shorthand for `--format json`.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `knit check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Design description file.
    pub design: String,
}

/// Connection output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One connection per line.
    Text,
    /// A JSON array of connection records.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        config: cli.config,
    };
    pipeline::init_logging(&global);

    let result = match cli.command {
        Command::Extract(ref args) => extract::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}
