//! `run`: the daemon.

use std::sync::Arc;
use std::time::Duration;

use anpr_config::Config;
use anpr_core::{
    AlertDispatcher, AlertPipeline, CameraRegistry, IsapiEventParser, PlateMatcher, Supervisor,
};

use super::{open_registry, registry_error};
use crate::cli::RunArgs;
use crate::error::CliError;

pub async fn handle(args: &RunArgs, config: &Config) -> Result<(), CliError> {
    let mut settings = config.stream_settings();
    if let Some(secs) = args.shutdown_timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "--shutdown-timeout".into(),
                reason: "must be at least 1".into(),
            });
        }
        settings.shutdown_timeout = Duration::from_secs(secs);
    }
    let grace = settings.shutdown_timeout;

    let alerts = config.alert_settings()?;
    let registry = open_registry(config).await?;
    let cameras = registry
        .cameras()
        .await
        .map_err(|e| registry_error(config, e))?;

    let dispatcher = AlertDispatcher::from_settings(&alerts)?.with_cameras(&cameras);
    if dispatcher.is_enabled() {
        tracing::info!(transports = ?dispatcher.transport_names(), "alert transports ready");
    } else {
        tracing::warn!("no alert transport configured, matches will only be logged");
    }

    if settings.reconnect.is_enabled() {
        tracing::info!(max_retries = ?settings.reconnect.max_retries, "stream reconnects enabled");
    }

    let pipeline = AlertPipeline::new(PlateMatcher::new(registry.clone()), dispatcher);
    let supervisor = Supervisor::new(Arc::new(IsapiEventParser), Arc::new(pipeline), settings);

    if cameras.is_empty() {
        tracing::warn!(
            database = %config.database.path.display(),
            "no cameras registered"
        );
    }
    let handle = supervisor.start(cameras);

    let result = handle.shutdown_on_signal(grace).await;
    registry.close().await;
    result.map_err(|e| CliError::shutdown_timeout(e, grace.as_secs()))
}
