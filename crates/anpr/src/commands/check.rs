use anpr_config::Config;
use anpr_core::{PlateMatcher, TrustedPlate, normalize_plate};

use super::{open_registry, registry_error};
use crate::cli::{CheckArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Run the matcher exactly as the daemon would for a detection.
pub async fn handle(args: &CheckArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let registry = open_registry(config).await?;
    let matcher = PlateMatcher::new(registry.clone());
    let found = matcher
        .match_plate(&args.plate)
        .await
        .map_err(|e| registry_error(config, e));
    registry.close().await;

    let Some(plate) = found? else {
        return Err(CliError::NotTrusted {
            plate: normalize_plate(&args.plate),
        });
    };

    let rendered = output::render_single(global.output, &plate, detail, |p| p.plate.clone())?;
    output::print_output(&rendered);
    Ok(())
}

fn detail(plate: &TrustedPlate) -> String {
    if plate.name.is_empty() {
        format!("{} is trusted", plate.plate)
    } else {
        format!("{} is trusted ({})", plate.plate, plate.name)
    }
}
