// ── Alert dispatch ──
//
// Renders one notification per matched detection and hands it to each
// configured transport exactly once. Nothing is retried or queued; the
// caller logs failures and moves on to the next event.

mod smtp;
mod webhook;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AlertSettings;
use crate::error::CoreError;
use crate::model::{AlertNotification, CameraEndpoint, CameraId, DetectionEvent, TrustedPlate};

pub use smtp::SmtpTransport;
pub use webhook::WebhookTransport;

pub const ALERT_SUBJECT: &str = "ANPR Alert";

/// A notification channel. Implementations must be safe to share
/// between camera workers.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    /// Short name for logs and errors (`smtp`, `webhook`).
    fn name(&self) -> &'static str;

    async fn send(&self, notification: &AlertNotification) -> Result<(), CoreError>;
}

/// Formats alerts and fans them out to the configured transports.
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    transports: Vec<Arc<dyn AlertTransport>>,
    recipient: Option<String>,
    external_url: Option<String>,
    camera_names: HashMap<CameraId, String>,
}

impl AlertDispatcher {
    /// Dispatcher with no transports: every dispatch is a no-op.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build the transports named in `settings`.
    pub fn from_settings(settings: &AlertSettings) -> Result<Self, CoreError> {
        let mut dispatcher = Self {
            recipient: settings.effective_recipient().map(String::from),
            external_url: settings.external_url.clone(),
            ..Self::default()
        };
        if let Some(ref smtp) = settings.smtp {
            dispatcher.transports.push(Arc::new(SmtpTransport::new(smtp)?));
        }
        if let Some(ref webhook) = settings.webhook {
            dispatcher
                .transports
                .push(Arc::new(WebhookTransport::new(webhook)?));
        }
        Ok(dispatcher)
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn AlertTransport>) -> Self {
        self.transports.push(transport);
        self
    }

    #[must_use]
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    /// Remember display names so alert bodies can name the camera.
    #[must_use]
    pub fn with_cameras<'a>(mut self, cameras: impl IntoIterator<Item = &'a CameraEndpoint>) -> Self {
        self.camera_names.extend(
            cameras
                .into_iter()
                .filter(|c| !c.name.trim().is_empty())
                .map(|c| (c.id, c.name.clone())),
        );
        self
    }

    pub fn is_enabled(&self) -> bool {
        !self.transports.is_empty()
    }

    pub fn transport_names(&self) -> Vec<&'static str> {
        self.transports.iter().map(|t| t.name()).collect()
    }

    /// Send one alert for `event`, matched to `matched`.
    ///
    /// Every transport is attempted once even if an earlier one fails.
    pub async fn dispatch(
        &self,
        event: &DetectionEvent,
        matched: &TrustedPlate,
    ) -> Result<(), CoreError> {
        if self.transports.is_empty() {
            tracing::debug!(plate = %matched.plate, "no alert transport configured");
            return Ok(());
        }

        let notification = self.render(event, matched);
        let mut failures = Vec::new();
        for transport in &self.transports {
            match transport.send(&notification).await {
                Ok(()) => tracing::debug!(transport = transport.name(), "alert sent"),
                Err(e) => failures.push((transport.name(), e)),
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0).1),
            _ => Err(CoreError::Dispatch {
                transport: "all",
                message: failures
                    .iter()
                    .map(|(name, e)| format!("{name}: {e}"))
                    .collect::<Vec<_>>()
                    .join("; "),
            }),
        }
    }

    /// Build the notification without sending it.
    pub fn render(&self, event: &DetectionEvent, matched: &TrustedPlate) -> AlertNotification {
        let plate = event.plate.clone().unwrap_or_else(|| matched.plate.clone());

        let mut camera = match self.camera_names.get(&event.camera_id) {
            Some(name) => format!("camera \"{name}\" (id {}", event.camera_id),
            None => format!("camera {}", event.camera_id),
        };
        match (&event.device_address, self.camera_names.contains_key(&event.camera_id)) {
            (Some(addr), true) => camera.push_str(&format!(", {addr})")),
            (None, true) => camera.push(')'),
            (Some(addr), false) => camera.push_str(&format!(" ({addr})")),
            (None, false) => {}
        }

        let who = if matched.name.trim().is_empty() {
            String::new()
        } else {
            format!(" ({})", matched.name)
        };

        let mut body = format!(
            "Trusted plate {plate}{who} was detected by {camera} at {}.\n",
            event.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );
        if let Some(confidence) = event.confidence {
            body.push_str(&format!("Recognition confidence: {confidence}%\n"));
        }
        if let Some(ref url) = self.external_url {
            body.push_str(&format!("\nManage plates and cameras at {url}\n"));
        }

        AlertNotification {
            recipient: self.recipient.clone(),
            subject: ALERT_SUBJECT.into(),
            body,
            camera_id: event.camera_id,
            plate,
        }
    }
}

impl std::fmt::Debug for AlertDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertDispatcher")
            .field("transports", &self.transport_names())
            .field("recipient", &self.recipient)
            .finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
