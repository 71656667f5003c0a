// ── Match → dispatch pipeline ──

use async_trait::async_trait;

use crate::dispatch::AlertDispatcher;
use crate::matcher::PlateMatcher;
use crate::model::DetectionEvent;

/// Receives every parsed detection from a camera worker.
///
/// Called inline from the read loop: the next message is not read until
/// `on_event` returns.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn on_event(&self, event: DetectionEvent);
}

/// Standard handler: match the plate, and alert on a hit.
///
/// Failures are logged and the detection is dropped; they never reach
/// the stream.
#[derive(Debug, Clone)]
pub struct AlertPipeline {
    matcher: PlateMatcher,
    dispatcher: AlertDispatcher,
}

impl AlertPipeline {
    pub fn new(matcher: PlateMatcher, dispatcher: AlertDispatcher) -> Self {
        Self {
            matcher,
            dispatcher,
        }
    }
}

#[async_trait]
impl EventHandler for AlertPipeline {
    async fn on_event(&self, event: DetectionEvent) {
        let Some(plate) = event.plate.as_deref() else {
            return;
        };

        let matched = match self.matcher.match_plate(plate).await {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                tracing::debug!(plate, "plate not trusted");
                return;
            }
            Err(e) => {
                tracing::error!(plate, error = %e, "plate lookup failed, detection dropped");
                return;
            }
        };

        match self.dispatcher.dispatch(&event, &matched).await {
            Ok(()) if self.dispatcher.is_enabled() => {
                tracing::info!(plate, name = %matched.name, "trusted plate detected, alert sent");
            }
            Ok(()) => tracing::info!(plate, name = %matched.name, "trusted plate detected"),
            Err(e) => tracing::error!(plate, error = %e, "alert dispatch failed"),
        }
    }
}
