// ── Core error types ──
//
// Errors surfaced by anpr-core. Transport failures from anpr-api are
// translated by the `From<anpr_api::Error>` impl so callers deal in
// camera- and alert-level terms. None of these is process-fatal: each
// is logged where it happens and scoped to one camera or one detection.

use thiserror::Error;

use crate::model::CameraId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Stream errors ────────────────────────────────────────────────
    #[error("Cannot connect to camera at {address}: {reason}")]
    ConnectionFailed { address: String, reason: String },

    #[error("Camera rejected credentials: {message}")]
    AuthenticationFailed { message: String },

    #[error("Camera stream closed: {reason}")]
    StreamClosed { reason: String },

    // ── Collaborator errors ──────────────────────────────────────────
    #[error("Registry unavailable: {message}")]
    Registry { message: String },

    #[error("Alert dispatch via {transport} failed: {message}")]
    Dispatch {
        transport: &'static str,
        message: String,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("{} camera worker(s) did not stop in time: {}", .cameras.len(), join_ids(.cameras))]
    ShutdownTimeout { cameras: Vec<CameraId> },
}

impl CoreError {
    /// Returns `true` if reconnecting might resolve this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::StreamClosed { .. })
    }
}

fn join_ids(ids: &[CameraId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<anpr_api::Error> for CoreError {
    fn from(err: anpr_api::Error) -> Self {
        match err {
            anpr_api::Error::AuthenticationRejected { status } => CoreError::AuthenticationFailed {
                message: format!("HTTP {status}"),
            },
            anpr_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid camera URL: {e}"),
            },
            anpr_api::Error::InvalidAddress { address, reason } => CoreError::Config {
                message: format!("Invalid camera address '{address}': {reason}"),
            },
            anpr_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                address: String::new(),
                reason,
            },
            anpr_api::Error::ConnectTimeout { timeout_secs } => CoreError::ConnectionFailed {
                address: String::new(),
                reason: format!("timed out after {timeout_secs}s"),
            },
            anpr_api::Error::Read(reason) => CoreError::StreamClosed { reason },
            anpr_api::Error::WebSocketClosed { code, reason } => CoreError::StreamClosed {
                reason: format!("close code {code}: {reason}"),
            },
            anpr_api::Error::InvalidPayload(message) => CoreError::StreamClosed {
                reason: format!("invalid payload: {message}"),
            },
        }
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Registry {
            message: err.to_string(),
        }
    }
}
