use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bridgeward")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative reconciler for EventBridge resources", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Manifest of desired resources (defaults to the configured one)
    #[arg(short, long, global = true, env = "BRIDGEWARD_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Sandbox state file (defaults to the configured one)
    #[arg(long, global = true, env = "BRIDGEWARD_STATE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check the manifest without contacting the remote
    Validate,

    /// Show field-level differences between the manifest and the remote
    Diff(TargetArgs),

    /// Show what apply would do for each resource
    Plan(TargetArgs),

    /// Run one reconcile pass for each resource
    Apply(ApplyArgs),

    /// Show observed resources and their recorded conditions
    Status(TargetArgs),

    /// Finish pending transitions in the sandbox
    Settle,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Parser)]
pub struct TargetArgs {
    /// Only resources of a kind (`rules`) or one resource (`rules.ship`)
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Only resources of a kind (`rules`) or one resource (`rules.ship`)
    pub target: Option<String>,

    /// Show the plan without making changes
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Resources reconciled in parallel within a stage
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Delete recorded resources that are no longer declared
    #[arg(long)]
    pub prune: bool,
}
