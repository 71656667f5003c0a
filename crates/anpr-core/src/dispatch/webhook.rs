use async_trait::async_trait;
use url::Url;

use super::AlertTransport;
use crate::config::WebhookSettings;
use crate::error::CoreError;
use crate::model::AlertNotification;

/// Posts each notification as JSON to a fixed URL.
#[derive(Debug, Clone)]
pub struct WebhookTransport {
    http: reqwest::Client,
    url: Url,
}

impl WebhookTransport {
    pub fn new(settings: &WebhookSettings) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("anpr-alerts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CoreError::Config {
                message: format!("webhook client: {e}"),
            })?;
        Ok(Self {
            http,
            url: settings.url.clone(),
        })
    }
}

#[async_trait]
impl AlertTransport for WebhookTransport {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, notification: &AlertNotification) -> Result<(), CoreError> {
        self.http
            .post(self.url.clone())
            .json(notification)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map(|_| ())
            .map_err(|e| CoreError::Dispatch {
                transport: "webhook",
                message: e.to_string(),
            })
    }
}
