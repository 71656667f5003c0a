use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::CameraId;

/// A parsed vehicle detection from one camera's stream.
///
/// Produced by the event parser, consumed by the matcher, then dropped.
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    pub camera_id: CameraId,
    /// The document the detection was parsed from.
    pub raw: Bytes,
    /// Recognised plate text as reported by the camera.
    pub plate: Option<String>,
    /// Camera-reported event time, or receipt time when absent.
    pub timestamp: DateTime<Utc>,
    /// Recognition confidence (0-100) when the camera reports it.
    pub confidence: Option<u8>,
    /// Address the device reports for itself.
    pub device_address: Option<String>,
}
