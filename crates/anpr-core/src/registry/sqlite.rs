//! SQLite registry shared with the web console.
//!
//! The database is opened read-only and never migrated: the console
//! creates and manages the schema.

use std::path::Path;

use async_trait::async_trait;
use secrecy::SecretString;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};

use super::{CameraRegistry, PlateRegistry};
use crate::error::CoreError;
use crate::model::{CameraEndpoint, CameraId, TrustedPlate};

const MAX_CONNECTIONS: u32 = 4;

const SELECT_CAMERAS: &str = "
    SELECT id, name, ip_address, username, password
    FROM cameras
    ORDER BY name, ip_address";

const SELECT_PLATE: &str = "
    SELECT plate, name
    FROM number_plates
    WHERE UPPER(TRIM(plate)) = ?
    LIMIT 1";

/// Camera and plate registry backed by the console's SQLite file.
#[derive(Debug, Clone)]
pub struct SqliteRegistry {
    pool: SqlitePool,
}

impl SqliteRegistry {
    /// Open `path` read-only. Fails if the file does not exist.
    pub async fn open(path: &Path) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| CoreError::Registry {
                message: format!("cannot open {}: {e}", path.display()),
            })?;

        tracing::debug!(path = %path.display(), "registry opened");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl CameraRegistry for SqliteRegistry {
    async fn cameras(&self) -> Result<Vec<CameraEndpoint>, CoreError> {
        let rows = sqlx::query(SELECT_CAMERAS).fetch_all(&self.pool).await?;
        rows.iter()
            .map(camera_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(CoreError::from)
    }
}

#[async_trait]
impl PlateRegistry for SqliteRegistry {
    async fn find_plate(&self, normalized: &str) -> Result<Option<TrustedPlate>, CoreError> {
        let row = sqlx::query(SELECT_PLATE)
            .bind(normalized)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref()
            .map(plate_from_row)
            .transpose()
            .map_err(CoreError::from)
    }
}

fn camera_from_row(row: &SqliteRow) -> Result<CameraEndpoint, sqlx::Error> {
    let password: Option<String> = row.try_get("password")?;
    Ok(CameraEndpoint {
        id: CameraId(row.try_get("id")?),
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
        address: row
            .try_get::<Option<String>, _>("ip_address")?
            .unwrap_or_default(),
        username: row.try_get::<Option<String>, _>("username")?.unwrap_or_default(),
        secret: SecretString::from(password.unwrap_or_default()),
    })
}

fn plate_from_row(row: &SqliteRow) -> Result<TrustedPlate, sqlx::Error> {
    Ok(TrustedPlate {
        plate: row.try_get("plate")?,
        name: row.try_get::<Option<String>, _>("name")?.unwrap_or_default(),
    })
}
