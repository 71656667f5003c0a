//! Subcommand handlers.

pub mod cameras;
pub mod check;
pub mod config_cmd;
pub mod run;

use std::sync::Arc;

use anpr_config::Config;
use anpr_core::SqliteRegistry;

use crate::error::CliError;

/// Open the console database named in `config`.
pub(crate) async fn open_registry(config: &Config) -> Result<Arc<SqliteRegistry>, CliError> {
    let path = &config.database.path;
    SqliteRegistry::open(path)
        .await
        .map(Arc::new)
        .map_err(|source| CliError::Registry {
            path: path.display().to_string(),
            source,
        })
}

/// Wrap a registry query failure with the database path.
pub(crate) fn registry_error(config: &Config, source: anpr_core::CoreError) -> CliError {
    match source {
        anpr_core::CoreError::Registry { .. } => CliError::Registry {
            path: config.database.path.display().to_string(),
            source,
        },
        other => CliError::from(other),
    }
}
