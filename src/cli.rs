use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use pipeline::LifecycleAction;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Pipeline engine for declarative deployment templates", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Resolve a lifecycle pipeline into an execution plan without dispatching
    Plan(PlanArgs),

    /// Plan and execute a lifecycle pipeline against the local state snapshot
    Apply(ApplyArgs),

    /// Check template documents for malformed pipeline definitions
    Validate(ValidateArgs),

    /// Show resources recorded in the state snapshot
    Status(StatusArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared arguments
// ============================================================================

/// Lifecycle action selector
#[derive(Clone, Copy, ValueEnum)]
pub enum ActionArg {
    Install,
    Upgrade,
    Uninstall,
}

impl From<ActionArg> for LifecycleAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Install => Self::Install,
            ActionArg::Upgrade => Self::Upgrade,
            ActionArg::Uninstall => Self::Uninstall,
        }
    }
}

// ============================================================================
// Plan / Apply
// ============================================================================

#[derive(Parser)]
pub struct PlanArgs {
    /// Template document containing the pipeline block
    #[arg(short, long)]
    pub template: PathBuf,

    /// Trigger resource snapshot (JSON)
    #[arg(long)]
    pub trigger: PathBuf,

    /// Lifecycle action to plan for
    #[arg(short, long, value_enum)]
    pub action: ActionArg,

    /// Emit the plan as JSON for audit tooling
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Template document containing the pipeline block
    #[arg(short, long)]
    pub template: PathBuf,

    /// Trigger resource snapshot (JSON)
    #[arg(long)]
    pub trigger: PathBuf,

    /// Lifecycle action to apply
    #[arg(short, long, value_enum)]
    pub action: ActionArg,

    /// State snapshot file (defaults to the user state directory)
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Show the plan without dispatching any step
    #[arg(short, long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

// ============================================================================
// Validate / Status
// ============================================================================

#[derive(Parser)]
pub struct ValidateArgs {
    /// Template documents to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Parser)]
pub struct StatusArgs {
    /// State snapshot file (defaults to the user state directory)
    #[arg(short, long)]
    pub state: Option<PathBuf>,
}
