// ── Runtime configuration ──
//
// These types describe *how* the supervisor connects to cameras and
// where alerts go. They carry credential data and tuning, but never
// touch disk. The binary builds them (via anpr-config) and hands them in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use anpr_api::StreamOptions;
use anpr_api::isapi::ALERT_STREAM_PATH;

// ── Streams ──────────────────────────────────────────────────────────

/// Exponential backoff for re-opening a dropped stream.
///
/// The default is [`disabled`](Self::disabled): a worker ends when its
/// connection closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
    /// Maximum reconnection attempts. `Some(0)` disables reconnects,
    /// `None` retries forever.
    pub max_retries: Option<u32>,
}

impl ReconnectPolicy {
    pub fn disabled() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: Some(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries != Some(0)
    }

    /// Whether another attempt is allowed after `attempt` failures.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_retries.is_none_or(|max| attempt < max)
    }

    /// Exponential backoff with jitter.
    ///
    /// `delay = min(initial * 2^attempt, max) * (1 ± 0.25)`
    ///
    /// Jitter is derived from the attempt number, so it is deterministic.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.min(30)).unwrap_or(30);
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
        Duration::from_secs_f64((capped * jitter_factor).max(0.0))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Tuning shared by every camera worker.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Event-subscription path appended to each camera address.
    pub subscription_path: String,
    pub connect_timeout: Duration,
    /// Largest accepted message and partial document.
    pub max_payload_bytes: usize,
    /// How long a partial document may wait for its remainder.
    pub reassembly_window: Duration,
    /// How long `shutdown` waits for workers to close.
    pub shutdown_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for StreamSettings {
    fn default() -> Self {
        let options = StreamOptions::default();
        Self {
            subscription_path: ALERT_STREAM_PATH.into(),
            connect_timeout: options.connect_timeout,
            max_payload_bytes: options.max_payload_bytes,
            reassembly_window: options.reassembly_window,
            shutdown_timeout: crate::supervisor::DEFAULT_SHUTDOWN_TIMEOUT,
            reconnect: ReconnectPolicy::disabled(),
        }
    }
}

impl StreamSettings {
    pub(crate) fn stream_options(&self) -> StreamOptions {
        StreamOptions {
            connect_timeout: self.connect_timeout,
            max_payload_bytes: self.max_payload_bytes,
            reassembly_window: self.reassembly_window,
        }
    }
}

// ── Alerts ───────────────────────────────────────────────────────────

/// SMTP authentication mechanism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmtpAuth {
    /// Let the transport negotiate (PLAIN or LOGIN).
    #[default]
    Auto,
    Plain,
    Login,
    /// Never authenticate, even when credentials are set.
    None,
}

/// SMTP transport security.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmtpTls {
    /// Plaintext only.
    None,
    /// STARTTLS when the server offers it.
    #[default]
    Opportunistic,
    /// Require STARTTLS.
    StartTls,
    /// Implicit TLS (SMTPS).
    Tls,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub auth: SmtpAuth,
    pub tls: SmtpTls,
    /// Sender address; also the default recipient.
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: Url,
    pub timeout: Duration,
}

/// Where alerts go. With no transport configured, dispatch is a no-op.
#[derive(Debug, Clone, Default)]
pub struct AlertSettings {
    /// Operator address. Falls back to the SMTP sender when unset.
    pub recipient: Option<String>,
    /// Console URL included in alert bodies.
    pub external_url: Option<String>,
    pub smtp: Option<SmtpSettings>,
    pub webhook: Option<WebhookSettings>,
}

impl AlertSettings {
    /// Configured recipient, or the SMTP sender address.
    pub fn effective_recipient(&self) -> Option<&str> {
        self.recipient
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.smtp.as_ref().map(|s| s.from.as_str()))
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_disabled_by_default() {
        let policy = ReconnectPolicy::default();
        assert!(!policy.is_enabled());
        assert!(!policy.allows(0));
    }

    #[test]
    fn reconnect_retry_cap() {
        let policy = ReconnectPolicy {
            max_retries: Some(2),
            ..ReconnectPolicy::disabled()
        };
        assert!(policy.is_enabled());
        assert!(policy.allows(0));
        assert!(policy.allows(1));
        assert!(!policy.allows(2));

        let forever = ReconnectPolicy {
            max_retries: None,
            ..ReconnectPolicy::disabled()
        };
        assert!(forever.allows(10_000));
    }

    #[test]
    fn backoff_increases_exponentially() {
        let policy = ReconnectPolicy::disabled();

        let d0 = policy.delay_for(0);
        let d1 = policy.delay_for(1);
        let d2 = policy.delay_for(2);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_retries: None,
        };

        // Jitter can add up to 25% on top of the cap.
        let d10 = policy.delay_for(10);
        assert!(d10 <= Duration::from_millis(12_500), "{d10:?}");
        assert!(policy.delay_for(u32::MAX) <= Duration::from_millis(12_500));
    }

    #[test]
    fn default_stream_settings() {
        let settings = StreamSettings::default();
        assert_eq!(settings.subscription_path, "/ISAPI/Event/notification/alertStream");
        assert_eq!(settings.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(settings.stream_options().max_payload_bytes, 65_536);
    }

    #[test]
    fn recipient_falls_back_to_sender() {
        let mut alerts = AlertSettings {
            smtp: Some(SmtpSettings {
                host: "smtp.example.com".into(),
                port: 25,
                username: None,
                password: None,
                auth: SmtpAuth::Auto,
                tls: SmtpTls::Opportunistic,
                from: "alerts@example.com".into(),
            }),
            ..AlertSettings::default()
        };
        assert_eq!(alerts.effective_recipient(), Some("alerts@example.com"));

        alerts.recipient = Some("ops@example.com".into());
        assert_eq!(alerts.effective_recipient(), Some("ops@example.com"));
    }
}
