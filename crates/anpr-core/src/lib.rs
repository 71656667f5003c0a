// anpr-core: Camera event ingestion, plate matching and alert dispatch.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod matcher;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod supervisor;
pub mod worker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{
    AlertSettings, ReconnectPolicy, SmtpAuth, SmtpSettings, SmtpTls, StreamSettings,
    WebhookSettings,
};
pub use dispatch::{AlertDispatcher, AlertTransport};
pub use error::CoreError;
pub use matcher::PlateMatcher;
pub use parser::{EventParser, IsapiEventParser, ParseFailure};
pub use pipeline::{AlertPipeline, EventHandler};
pub use registry::{CameraRegistry, MemoryRegistry, PlateRegistry, SqliteRegistry};
pub use supervisor::{Supervisor, SupervisorHandle, termination_signal};
pub use worker::{StreamClient, WorkerState};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AlertNotification, CameraEndpoint, CameraId, DetectionEvent, TrustedPlate, normalize_plate,
};
