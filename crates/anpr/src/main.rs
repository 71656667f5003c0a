mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, GlobalOpts, LogFormat};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(global: &GlobalOpts) {
    let filter = if global.quiet {
        "warn"
    } else {
        match global.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match global.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let (config, path) = anpr_config::load(cli.global.config.as_deref())?;
    tracing::debug!(path = %path.display(), "configuration loaded");

    match cli.command {
        Command::Config(ref args) => {
            commands::config_cmd::handle(args, &config, &path, cli.global.output)
        }
        Command::Cameras => commands::cameras::handle(&config, &cli.global).await,
        Command::Check(ref args) => commands::check::handle(args, &config, &cli.global).await,
        Command::Run(ref args) => commands::run::handle(args, &config).await,
    }
}
