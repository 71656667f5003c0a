// ── Domain model ──
//
// Types shared by every stage of the ingestion pipeline. Cameras and
// trusted plates are read-only snapshots of the console's storage;
// detections and notifications are ephemeral and never persisted here.

mod alert;
mod camera;
mod detection;
mod plate;

pub use alert::AlertNotification;
pub use camera::{CameraEndpoint, CameraId};
pub use detection::DetectionEvent;
pub use plate::{TrustedPlate, normalize_plate};
