//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into operator-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use anpr_config::ConfigError;
use anpr_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const STORAGE: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const SHUTDOWN_TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration")]
    #[diagnostic(
        code(anpr::config),
        help(
            "Check the config file and ANPR_* / SMTP_* environment variables.\n\
             Inspect the effective settings with: anpr-alerts config"
        )
    )]
    Config(#[source] ConfigError),

    #[error("Invalid alert or stream settings")]
    #[diagnostic(
        code(anpr::settings),
        help("Check the [alerts] section, or SMTP_FROM / SMTP_HOST in the environment.")
    )]
    Settings(#[source] CoreError),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(anpr::validation))]
    Validation { field: String, reason: String },

    // ── Storage ──────────────────────────────────────────────────────
    #[error("Cannot read the camera/plate registry")]
    #[diagnostic(
        code(anpr::registry),
        help(
            "The database is shared with the web console and opened read-only.\n\
             Point DB_FILE (or [database] path) at it. Current: {path}"
        )
    )]
    Registry {
        path: String,
        #[source]
        source: CoreError,
    },

    // ── Streams ──────────────────────────────────────────────────────
    #[error("Camera connection failed")]
    #[diagnostic(code(anpr::connection))]
    Connection(#[source] CoreError),

    #[error("{count} camera worker(s) did not stop within {seconds}s")]
    #[diagnostic(
        code(anpr::shutdown_timeout),
        help("Cameras still open at the deadline: {cameras}")
    )]
    ShutdownTimeout {
        count: usize,
        seconds: u64,
        cameras: String,
    },

    // ── Lookups ──────────────────────────────────────────────────────
    #[error("Plate '{plate}' is not in the trusted list")]
    #[diagnostic(code(anpr::not_trusted))]
    NotTrusted { plate: String },

    #[error(transparent)]
    #[diagnostic(code(anpr::core))]
    Core(CoreError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(anpr::json))]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { .. } | CoreError::AuthenticationFailed { .. } => {
                Self::Connection(err)
            }
            CoreError::Config { .. } => Self::Settings(err),
            other => Self::Core(other),
        }
    }
}

impl CliError {
    /// Construct the shutdown diagnostic from the core error.
    pub fn shutdown_timeout(err: CoreError, seconds: u64) -> Self {
        match err {
            CoreError::ShutdownTimeout { cameras } => Self::ShutdownTimeout {
                count: cameras.len(),
                seconds,
                cameras: cameras
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            },
            other => Self::from(other),
        }
    }

    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Settings(_) => exit_code::CONFIG,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Registry { .. } | Self::Core(CoreError::Registry { .. }) => exit_code::STORAGE,
            Self::Connection(_) => exit_code::CONNECTION,
            Self::ShutdownTimeout { .. } | Self::Core(CoreError::ShutdownTimeout { .. }) => {
                exit_code::SHUTDOWN_TIMEOUT
            }
            Self::NotTrusted { .. } | Self::Core(_) | Self::Io(_) | Self::Json(_) => {
                exit_code::GENERAL
            }
        }
    }
}
