use thiserror::Error;

/// Top-level error type for the `anpr-api` crate.
///
/// Covers every failure mode of a camera's alert stream: target
/// construction, the upgrade handshake, and the read loop.
/// `anpr-core` maps these into per-camera diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Target ──────────────────────────────────────────────────────
    /// The camera address could not be turned into a stream URL.
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The address parsed, but is not usable as a WebSocket target.
    #[error("Invalid camera address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    // ── Handshake ───────────────────────────────────────────────────
    /// The camera rejected the supplied credentials (HTTP 401/403).
    #[error("Camera rejected credentials (HTTP {status})")]
    AuthenticationRejected { status: u16 },

    /// TCP connect or upgrade handshake failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),

    /// The upgrade handshake did not finish in time.
    #[error("Connection timed out after {timeout_secs}s")]
    ConnectTimeout { timeout_secs: u64 },

    // ── Streaming ───────────────────────────────────────────────────
    /// Reading from an established stream failed.
    #[error("WebSocket read failed: {0}")]
    Read(String),

    /// The camera sent a close frame.
    #[error("WebSocket closed (code {code}): {reason}")]
    WebSocketClosed { code: u16, reason: String },

    // ── Payload ─────────────────────────────────────────────────────
    /// A payload did not contain an ISAPI event document.
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth reconnecting for.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::WebSocketConnect(_)
                | Self::ConnectTimeout { .. }
                | Self::Read(_)
                | Self::WebSocketClosed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_rejection_is_not_transient() {
        let err = Error::AuthenticationRejected { status: 401 };
        assert!(!err.is_transient());
    }

    #[test]
    fn dropped_stream_is_transient() {
        assert!(Error::Read("connection reset".into()).is_transient());
        assert!(
            Error::WebSocketClosed {
                code: 1006,
                reason: String::new()
            }
            .is_transient()
        );
        assert!(!Error::InvalidPayload("empty".into()).is_transient());
    }
}
