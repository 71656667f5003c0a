//! `config` subcommand: show what the daemon would run with.

use std::path::Path;

use anpr_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

pub fn handle(
    args: &ConfigArgs,
    config: &Config,
    path: &Path,
    format: OutputFormat,
) -> Result<(), CliError> {
    match args.command.unwrap_or(ConfigCommand::Show) {
        ConfigCommand::Path => output::print_output(&path.display().to_string()),
        ConfigCommand::Show => {
            let redacted = config.redacted();
            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&redacted)?,
                OutputFormat::Table | OutputFormat::Plain => redacted.to_toml()?,
            };
            if !path.exists() {
                eprintln!("# {} not found; showing defaults and environment", path.display());
            }
            output::print_output(rendered.trim_end());
        }
    }
    Ok(())
}
