//! ISAPI alert stream over WebSocket.
//!
//! Connects to a camera's alert-stream endpoint with HTTP basic auth on the
//! upgrade request and yields reassembled event payloads one at a time.
//! The connection is owned by exactly one [`AlertStream`]; it is closed on
//! [`close`](AlertStream::close) or when the value is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use anpr_api::stream::{AlertStream, StreamOptions, StreamTarget};
//! use secrecy::SecretString;
//!
//! let target = StreamTarget::new(
//!     "192.168.1.64",
//!     anpr_api::isapi::ALERT_STREAM_PATH,
//!     "admin",
//!     SecretString::from("secret"),
//! )?;
//! let mut stream = AlertStream::connect(&target, &StreamOptions::default()).await?;
//!
//! while let Some(item) = stream.next_payload().await? {
//!     println!("{item:?}");
//! }
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use crate::assembler::{Assembled, PayloadAssembler};
use crate::error::Error;

/// Upper bound on the close handshake when shutting a stream down.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

// ── StreamTarget ─────────────────────────────────────────────────────

/// Where and how to connect: URL plus basic-auth credentials.
#[derive(Clone)]
pub struct StreamTarget {
    url: Url,
    username: String,
    password: SecretString,
}

impl std::fmt::Debug for StreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTarget")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl StreamTarget {
    /// Build a target from a camera address (`host` or `host:port`, or a
    /// full `ws://`/`wss://` URL) and the subscription path.
    pub fn new(
        address: &str,
        path: &str,
        username: impl Into<String>,
        password: SecretString,
    ) -> Result<Self, Error> {
        let address = address.trim().trim_end_matches('/');
        if address.is_empty() {
            return Err(Error::InvalidAddress {
                address: address.into(),
                reason: "address is empty".into(),
            });
        }

        let base = if address.contains("://") {
            address.to_string()
        } else {
            format!("ws://{address}")
        };
        let mut url = Url::parse(&base)?;

        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(Error::InvalidAddress {
                    address: address.into(),
                    reason: format!("unsupported scheme '{other}'"),
                });
            }
        }
        if url.host_str().is_none() {
            return Err(Error::InvalidAddress {
                address: address.into(),
                reason: "no host".into(),
            });
        }

        url.set_path(path);
        Ok(Self {
            url,
            username: username.into(),
            password,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `Authorization` header value for the upgrade request.
    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        format!("Basic {}", BASE64.encode(raw))
    }
}

// ── StreamOptions ────────────────────────────────────────────────────

/// Connection tuning for a single stream.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Bound on TCP connect + upgrade handshake. Default: 10s.
    pub connect_timeout: Duration,
    /// Largest message, and largest partial document. Default: 64 KiB.
    pub max_payload_bytes: usize,
    /// How long a partial document may wait for its remainder. Default: 5s.
    pub reassembly_window: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_payload_bytes: 64 * 1024,
            reassembly_window: Duration::from_secs(5),
        }
    }
}

// ── AlertStream ──────────────────────────────────────────────────────

/// A live alert-stream connection to one camera.
pub struct AlertStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    assembler: PayloadAssembler,
    ready: VecDeque<Assembled>,
}

impl AlertStream {
    /// Open the stream: TCP connect, then the authenticated upgrade.
    pub async fn connect(target: &StreamTarget, options: &StreamOptions) -> Result<Self, Error> {
        tracing::debug!(url = %target.url, "connecting to alert stream");

        let uri: tungstenite::http::Uri = target
            .url
            .as_str()
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

        let request =
            ClientRequestBuilder::new(uri).with_header("Authorization", target.basic_auth());

        let config = WebSocketConfig::default()
            .max_message_size(Some(options.max_payload_bytes))
            .max_frame_size(Some(options.max_payload_bytes));

        let handshake = tokio_tungstenite::connect_async_with_config(request, Some(config), false);
        let (ws, _response) = tokio::time::timeout(options.connect_timeout, handshake)
            .await
            .map_err(|_| Error::ConnectTimeout {
                timeout_secs: options.connect_timeout.as_secs(),
            })?
            .map_err(map_handshake_error)?;

        tracing::debug!(url = %target.url, "alert stream connected");

        Ok(Self {
            ws,
            assembler: PayloadAssembler::new(options.max_payload_bytes, options.reassembly_window),
            ready: VecDeque::new(),
        })
    }

    /// Wait for the next payload.
    ///
    /// Returns `Ok(None)` when the camera ends the stream (close frame or
    /// EOF). Cancel-safe: the only suspension point is the frame read, and
    /// assembled payloads are queued before they are handed out.
    pub async fn next_payload(&mut self) -> Result<Option<Assembled>, Error> {
        loop {
            if let Some(item) = self.ready.pop_front() {
                return Ok(Some(item));
            }

            let frame = match self.ws.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(Error::Read(e.to_string())),
                None => {
                    tracing::debug!("alert stream ended without close frame");
                    return Ok(None);
                }
            };

            match frame {
                tungstenite::Message::Text(text) => {
                    self.ready
                        .extend(self.assembler.push(text.as_str(), Instant::now()));
                }
                tungstenite::Message::Binary(data) => match std::str::from_utf8(&data) {
                    Ok(text) => self.ready.extend(self.assembler.push(text, Instant::now())),
                    // Image parts of multipart ANPR uploads
                    Err(_) => tracing::trace!(bytes = data.len(), "skipping binary message"),
                },
                tungstenite::Message::Ping(_) => {
                    // tungstenite queues the pong reply itself
                    tracing::trace!("alert stream ping");
                }
                tungstenite::Message::Close(frame) => {
                    if let Some(ref cf) = frame {
                        tracing::debug!(code = %cf.code, reason = %cf.reason, "close frame received");
                    } else {
                        tracing::debug!("close frame received (no payload)");
                    }
                    return Ok(None);
                }
                _ => {
                    // Pong, raw Frame -- ignore
                }
            }
        }
    }

    /// Close the connection, sending a close frame first.
    ///
    /// The close handshake is bounded; the socket is dropped regardless.
    pub async fn close(mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.ws.close(None)).await {
            Ok(Ok(())) => tracing::trace!("alert stream closed"),
            Ok(Err(e)) => tracing::trace!(error = %e, "close handshake failed"),
            Err(_) => tracing::trace!("close handshake timed out"),
        }
    }
}

fn map_handshake_error(err: tungstenite::Error) -> Error {
    match err {
        tungstenite::Error::Http(ref response)
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            Error::AuthenticationRejected {
                status: response.status().as_u16(),
            }
        }
        other => Error::WebSocketConnect(other.to_string()),
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::isapi::ALERT_STREAM_PATH;
    use pretty_assertions::assert_eq;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn target_from_bare_address() {
        let target =
            StreamTarget::new("192.168.1.64", ALERT_STREAM_PATH, "admin", secret("pw")).unwrap();
        assert_eq!(
            target.url().as_str(),
            "ws://192.168.1.64/ISAPI/Event/notification/alertStream"
        );
    }

    #[test]
    fn target_keeps_port_and_scheme() {
        let target =
            StreamTarget::new("wss://cam.local:8443/", ALERT_STREAM_PATH, "admin", secret("pw"))
                .unwrap();
        assert_eq!(
            target.url().as_str(),
            "wss://cam.local:8443/ISAPI/Event/notification/alertStream"
        );
    }

    #[test]
    fn target_rejects_empty_and_http_addresses() {
        assert!(matches!(
            StreamTarget::new("  ", ALERT_STREAM_PATH, "a", secret("b")),
            Err(Error::InvalidAddress { .. })
        ));
        assert!(matches!(
            StreamTarget::new("http://cam.local", ALERT_STREAM_PATH, "a", secret("b")),
            Err(Error::InvalidAddress { .. })
        ));
    }

    #[test]
    fn basic_auth_header() {
        let target =
            StreamTarget::new("10.0.0.5", ALERT_STREAM_PATH, "user", secret("pass")).unwrap();
        assert_eq!(target.basic_auth(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn debug_output_hides_password() {
        let target =
            StreamTarget::new("10.0.0.5", ALERT_STREAM_PATH, "user", secret("hunter2")).unwrap();
        let debug = format!("{target:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn default_options() {
        let options = StreamOptions::default();
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
        assert_eq!(options.max_payload_bytes, 65_536);
        assert_eq!(options.reassembly_window, Duration::from_secs(5));
    }
}
