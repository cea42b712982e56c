use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "blox")]
#[command(about = "Compile block programs and drive agent editing sessions")]
pub struct Cli {
    /// Runner config (YAML or JSON).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level regardless of BLOX_LOG.
    #[arg(long, global = true, default_value_t = false)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Generate(GenerateCommand),
    Kinds(KindsCommand),
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum SessionCommand {
    New(SessionNewCommand),
    Apply(SessionApplyCommand),
    Checkpoint(SessionCheckpointCommand),
    Rollback(SessionRollbackCommand),
    Show(SessionShowCommand),
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModeArg {
    Graph,
    Text,
}

#[derive(Debug, Clone, clap::Args)]
pub struct GenerateCommand {
    #[arg(long)]
    pub graph: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct KindsCommand {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SessionNewCommand {
    #[arg(long, value_enum)]
    pub mode: ModeArg,
    #[arg(long)]
    pub out: PathBuf,
    /// Session id; a random UUID when omitted.
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SessionApplyCommand {
    #[arg(long)]
    pub session: PathBuf,
    /// File holding one command object or an array of them.
    #[arg(long, conflicts_with = "commands_stdin_jsonl", required_unless_present = "commands_stdin_jsonl")]
    pub command: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    pub commands_stdin_jsonl: bool,
    /// Record a user message before the commands run.
    #[arg(long)]
    pub user_message: Option<String>,
    /// Append engine events here; `-` prints them instead of the summary.
    #[arg(long)]
    pub events_jsonl: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SessionCheckpointCommand {
    #[arg(long)]
    pub session: PathBuf,
    #[arg(long)]
    pub message: String,
    #[arg(long)]
    pub summary: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SessionRollbackCommand {
    #[arg(long)]
    pub session: PathBuf,
    #[arg(long)]
    pub checkpoint: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, clap::Args)]
pub struct SessionShowCommand {
    #[arg(long)]
    pub session: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
