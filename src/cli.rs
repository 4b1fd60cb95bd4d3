use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fargate-otel")]
#[command(version)]
#[command(
    about = "Declare a Fargate API service with an OpenTelemetry collector sidecar",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: <config dir>/config.toml)
    #[arg(long, global = true, env = "FARGATE_OTEL_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Synthesize the stack template
    Synth(SynthArgs),

    /// List the declared resources grouped by type
    Show(ShowArgs),

    /// Compose and synthesize without writing anything
    Validate(ValidateArgs),

    /// Inspect or scaffold the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser)]
pub struct SynthArgs {
    /// Write the template here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Fail when a network lookup has no recorded result
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser)]
pub struct ShowArgs {
    /// Filter: "type" or "type.name" (e.g. "ecs", "logs", "iam.role")
    pub target: Option<String>,
}

#[derive(Parser)]
pub struct ValidateArgs {
    /// Fail when a network lookup has no recorded result
    #[arg(long)]
    pub strict: bool,
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Write a starter config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
