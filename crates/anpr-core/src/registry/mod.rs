// ── Registry ports ──
//
// The console owns cameras and trusted plates; this crate only reads
// them. Both traits are `Send + Sync` so one registry can serve every
// camera worker at once.

mod memory;
mod sqlite;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{CameraEndpoint, TrustedPlate};

pub use memory::MemoryRegistry;
pub use sqlite::SqliteRegistry;

/// Source of registered cameras, read once at startup.
#[async_trait]
pub trait CameraRegistry: Send + Sync {
    async fn cameras(&self) -> Result<Vec<CameraEndpoint>, CoreError>;
}

/// Lookup of trusted plates.
#[async_trait]
pub trait PlateRegistry: Send + Sync {
    /// Find the plate whose normalized form equals `normalized`.
    ///
    /// `Ok(None)` is the ordinary no-match outcome.
    async fn find_plate(&self, normalized: &str) -> Result<Option<TrustedPlate>, CoreError>;
}
