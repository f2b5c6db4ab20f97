//! CLI argument parsing for the simulacat binary.
//!
//! Each subcommand maps onto one library entry point; the binary adds file
//! loading and printing, nothing else.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "simulacat",
    version,
    about = "Validate GitHub API simulator scenarios and run the simulator",
    after_help = "Examples:\n  simulacat validate scenario.json\n  simulacat render scenario.json --out github-sim-config.json\n  simulacat serve scenario.json --startup-timeout 10\n  simulacat serve --raw base.json --raw overrides.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Validate(ValidateArgs),
    Render(RenderArgs),
    ResolveToken(ResolveTokenArgs),
    Serve(ServeArgs),
    /// Print the simulator package root
    JsRoot,
}

#[derive(Parser, Debug)]
#[command(about = "Validate a scenario file and print a summary")]
pub struct ValidateArgs {
    /// Scenario JSON file
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Emit the summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Print the simulator configuration for a scenario")]
pub struct RenderArgs {
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Include issues and pull requests
    #[arg(long)]
    pub include_unsupported: bool,

    /// Write to a file instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(about = "Print the token a scenario authenticates with")]
pub struct ResolveTokenArgs {
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,
}

/// Start a simulator and keep it running until stdin yields a line or closes.
#[derive(Parser, Debug)]
#[command(about = "Run the simulator for a scenario or raw configuration")]
pub struct ServeArgs {
    #[arg(
        value_name = "SCENARIO",
        required_unless_present = "raw",
        conflicts_with = "raw"
    )]
    pub scenario: Option<PathBuf>,

    /// Raw simulator configuration; repeat to layer files, later keys win
    #[arg(long, value_name = "CONFIG")]
    pub raw: Vec<PathBuf>,

    #[command(flatten)]
    pub process: ProcessArgs,
}

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Bun executable (defaults to $BUN or `bun`)
    #[arg(long, value_name = "EXE")]
    pub bun: Option<String>,

    /// Simulator entry point (defaults to the package's github-sim-server.ts)
    #[arg(long, value_name = "PATH")]
    pub entrypoint: Option<PathBuf>,

    /// Seconds to wait for the listening event
    #[arg(long, value_name = "SECS", default_value_t = 30.0)]
    pub startup_timeout: f64,
}
