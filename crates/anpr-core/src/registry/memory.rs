use std::collections::HashMap;

use async_trait::async_trait;

use super::{CameraRegistry, PlateRegistry};
use crate::error::CoreError;
use crate::model::{CameraEndpoint, TrustedPlate, normalize_plate};

/// Fixed in-memory registry, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    cameras: Vec<CameraEndpoint>,
    plates: HashMap<String, TrustedPlate>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_camera(mut self, camera: CameraEndpoint) -> Self {
        self.cameras.push(camera);
        self
    }

    #[must_use]
    pub fn with_plate(mut self, plate: TrustedPlate) -> Self {
        self.plates.insert(normalize_plate(&plate.plate), plate);
        self
    }
}

#[async_trait]
impl CameraRegistry for MemoryRegistry {
    async fn cameras(&self) -> Result<Vec<CameraEndpoint>, CoreError> {
        Ok(self.cameras.clone())
    }
}

#[async_trait]
impl PlateRegistry for MemoryRegistry {
    async fn find_plate(&self, normalized: &str) -> Result<Option<TrustedPlate>, CoreError> {
        Ok(self.plates.get(normalized).cloned())
    }
}
