use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wasconf")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative WebSphere configuration through wsadmin", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest file (default: ~/.config/wasconf/manifest.toml)
    #[arg(short, long, global = true, env = "WASCONF_MANIFEST")]
    pub manifest: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show every declared resource and whether it is in sync
    Status(TargetArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Make the cell configuration match the manifest
    Apply(ApplyArgs),

    /// Check the manifest without reading any configuration
    Validate,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct TargetArgs {
    /// Resource type or type.name (e.g. jdbc, variable.LOG_ROOT)
    pub target: Option<String>,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Resource type or type.name (e.g. jdbc, variable.LOG_ROOT)
    pub target: Option<String>,

    /// Also print the Jython each change would run
    #[arg(short, long)]
    pub script: bool,

    /// Print the diff as JSON
    #[arg(long, conflicts_with = "script")]
    pub json: bool,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Resource type or type.name (e.g. jdbc, variable.LOG_ROOT)
    pub target: Option<String>,

    /// Print the scripts instead of running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Don't ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Write a JSON report of every pass to this file
    #[arg(long)]
    pub report: Option<PathBuf>,
}
