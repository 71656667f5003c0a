// ── Stream client ──
//
// One camera's lifecycle: connect, read, parse, hand off, close. The
// connection is owned by a single `run` call and closed on every exit
// path. A worker only ever touches its own camera.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use anpr_api::{AlertStream, Assembled, StreamTarget};

use crate::config::StreamSettings;
use crate::error::CoreError;
use crate::model::CameraEndpoint;
use crate::parser::{EventParser, ParseFailure};
use crate::pipeline::EventHandler;

/// Observable lifecycle of a camera worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Streaming,
    /// Waiting before reconnection attempt `attempt` (1-based).
    Reconnecting { attempt: u32 },
    Closed,
}

impl WorkerState {
    pub fn is_closed(self) -> bool {
        self == Self::Closed
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Streaming => f.write_str("streaming"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// How a single connection ended.
enum Session {
    /// The stop signal fired.
    Stopped,
    /// The connection failed; `streamed` says whether it got that far.
    Failed { error: CoreError, streamed: bool },
}

/// Drives one camera's alert stream.
pub struct StreamClient {
    endpoint: CameraEndpoint,
    parser: Arc<dyn EventParser>,
    handler: Arc<dyn EventHandler>,
    settings: StreamSettings,
}

impl StreamClient {
    pub fn new(
        endpoint: CameraEndpoint,
        parser: Arc<dyn EventParser>,
        handler: Arc<dyn EventHandler>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            endpoint,
            parser,
            handler,
            settings,
        }
    }

    /// Run until the stop signal fires or the stream fails for good.
    ///
    /// `Ok(())` only for a stop-signal exit. With reconnects disabled,
    /// the first connect or read failure ends the worker.
    pub async fn run(
        self,
        cancel: CancellationToken,
        state: &watch::Sender<WorkerState>,
    ) -> Result<(), CoreError> {
        let policy = &self.settings.reconnect;
        let mut attempt: u32 = 0;

        loop {
            state.send_replace(WorkerState::Connecting);

            let (error, streamed) = match self.session(&cancel, state).await {
                Session::Stopped => return Ok(()),
                Session::Failed { error, streamed } => (error, streamed),
            };
            if streamed {
                attempt = 0;
            }

            if !(error.is_transient() && policy.allows(attempt)) {
                return Err(error);
            }

            let delay = policy.delay_for(attempt);
            attempt += 1;
            tracing::warn!(
                error = %error,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "stream lost, reconnecting"
            );
            state.send_replace(WorkerState::Reconnecting { attempt });

            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn session(
        &self,
        cancel: &CancellationToken,
        state: &watch::Sender<WorkerState>,
    ) -> Session {
        let target = match StreamTarget::new(
            &self.endpoint.address,
            &self.settings.subscription_path,
            self.endpoint.username.clone(),
            self.endpoint.secret.clone(),
        ) {
            Ok(target) => target,
            Err(e) => return self.failed(e, false),
        };

        let options = self.settings.stream_options();
        let connect = AlertStream::connect(&target, &options);
        let mut stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Session::Stopped,
            result = connect => match result {
                Ok(stream) => stream,
                Err(e) => return self.failed(e, false),
            },
        };

        state.send_replace(WorkerState::Streaming);
        tracing::info!(url = %target.url(), "alert stream open");

        let outcome = loop {
            let item = tokio::select! {
                biased;
                () = cancel.cancelled() => break Session::Stopped,
                item = stream.next_payload() => item,
            };

            match item {
                Ok(Some(Assembled::Payload(doc))) => self.handle(doc.as_bytes()).await,
                Ok(Some(Assembled::Discarded(reason))) => {
                    log_parse_failure(&ParseFailure::Incomplete(reason.to_string()));
                }
                Ok(None) => {
                    break failed_with(
                        CoreError::StreamClosed {
                            reason: "closed by camera".into(),
                        },
                        true,
                    );
                }
                Err(e) => break self.failed(e, true),
            }
        };

        stream.close().await;
        tracing::debug!("alert stream closed");
        outcome
    }

    /// Parse → hand off, in arrival order.
    async fn handle(&self, raw: &[u8]) {
        match self.parser.parse(raw, self.endpoint.id) {
            Ok(event) => self.handler.on_event(event).await,
            Err(failure) => {
                log_parse_failure(&failure);
                if failure.is_malformed() {
                    tracing::debug!(preview = %preview(raw), "unparseable payload");
                }
            }
        }
    }

    fn failed(&self, err: anpr_api::Error, streamed: bool) -> Session {
        let error = match CoreError::from(err) {
            CoreError::ConnectionFailed { reason, .. } => CoreError::ConnectionFailed {
                address: self.endpoint.address.clone(),
                reason,
            },
            other => other,
        };
        failed_with(error, streamed)
    }
}

fn failed_with(error: CoreError, streamed: bool) -> Session {
    tracing::warn!(error = %error, "camera stream failed");
    Session::Failed { error, streamed }
}

fn log_parse_failure(failure: &ParseFailure) {
    if failure.is_malformed() {
        tracing::warn!(reason = %failure, "discarding unparseable event");
    } else {
        tracing::debug!(reason = %failure, "ignoring event");
    }
}

/// First few hundred characters of a payload, lossily decoded.
fn preview(raw: &[u8]) -> String {
    const PREVIEW_CHARS: usize = 200;
    let text = String::from_utf8_lossy(raw);
    let mut out: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_payloads() {
        assert_eq!(preview(b"<ResponseStatus/>"), "<ResponseStatus/>");
        let long = preview("x".repeat(500).as_bytes());
        assert_eq!(long.len(), 203);
        assert!(long.ends_with("..."));
    }

    #[test]
    fn state_display() {
        assert_eq!(WorkerState::Streaming.to_string(), "streaming");
        assert_eq!(
            WorkerState::Reconnecting { attempt: 2 }.to_string(),
            "reconnecting (attempt 2)"
        );
        assert!(WorkerState::Closed.is_closed());
    }
}
