use serde::Serialize;

use super::CameraId;

/// A rendered alert, handed to each configured transport once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertNotification {
    pub recipient: Option<String>,
    pub subject: String,
    pub body: String,
    pub camera_id: CameraId,
    pub plate: String,
}
