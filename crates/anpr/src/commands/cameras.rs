use serde::Serialize;
use tabled::Tabled;

use anpr_config::Config;
use anpr_core::{CameraEndpoint, CameraRegistry};

use super::{open_registry, registry_error};
use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Camera as shown to the operator. The secret is never included.
#[derive(Debug, Serialize)]
struct CameraView {
    id: i64,
    name: String,
    address: String,
    username: String,
}

impl From<&CameraEndpoint> for CameraView {
    fn from(camera: &CameraEndpoint) -> Self {
        Self {
            id: camera.id.0,
            name: camera.name.clone(),
            address: camera.address.clone(),
            username: camera.username.clone(),
        }
    }
}

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Username")]
    username: String,
}

pub async fn handle(config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let registry = open_registry(config).await?;
    let cameras = registry
        .cameras()
        .await
        .map_err(|e| registry_error(config, e))?;
    registry.close().await;

    let views: Vec<CameraView> = cameras.iter().map(CameraView::from).collect();
    let rendered = output::render_list(
        global.output,
        &views,
        |c| CameraRow {
            id: c.id,
            name: c.name.clone(),
            address: c.address.clone(),
            username: c.username.clone(),
        },
        |c| c.address.clone(),
    )?;

    if views.is_empty() && matches!(global.output, crate::cli::OutputFormat::Table) {
        eprintln!("No cameras registered in {}", config.database.path.display());
    }
    output::print_output(&rendered);
    Ok(())
}
