// ── Plate matching ──

use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{TrustedPlate, normalize_plate};
use crate::registry::PlateRegistry;

/// Exact, case-normalized lookup against the trusted-plate registry.
///
/// Cheap to clone; every camera worker holds one.
#[derive(Clone)]
pub struct PlateMatcher {
    registry: Arc<dyn PlateRegistry>,
}

impl PlateMatcher {
    pub fn new(registry: Arc<dyn PlateRegistry>) -> Self {
        Self { registry }
    }

    /// `Ok(None)` means no match. `Err` only when the registry itself
    /// is unavailable.
    pub async fn match_plate(&self, plate: &str) -> Result<Option<TrustedPlate>, CoreError> {
        let normalized = normalize_plate(plate);
        if normalized.is_empty() {
            return Ok(None);
        }
        self.registry.find_plate(&normalized).await
    }
}

impl std::fmt::Debug for PlateMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlateMatcher").finish_non_exhaustive()
    }
}
