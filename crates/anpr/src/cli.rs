//! Clap derive structures for the `anpr-alerts` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// anpr-alerts -- alert on trusted number plates seen by Hikvision cameras
#[derive(Debug, Parser)]
#[command(
    name = "anpr-alerts",
    version,
    about = "Stream ANPR events from Hikvision cameras and alert on trusted plates",
    long_about = "Opens one ISAPI alert stream per camera registered in the console's\n\
        database, matches every recognised plate against the trusted-plate list,\n\
        and sends a notification (SMTP and/or webhook) on a match.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (default: $ANPR_CONFIG, then the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format for listing commands
    #[arg(long, short = 'o', default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream events from every registered camera until interrupted
    Run(RunArgs),

    /// List the cameras registered in the database
    #[command(alias = "cams")]
    Cameras,

    /// Look a plate up in the trusted-plate list
    Check(CheckArgs),

    /// Show the effective configuration (secrets redacted)
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Override stream.shutdown_timeout_secs
    #[arg(long, value_name = "SECS")]
    pub shutdown_timeout: Option<u64>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Plate text as a camera would report it
    pub plate: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML (default)
    Show,
    /// Print the config file path
    Path,
}
